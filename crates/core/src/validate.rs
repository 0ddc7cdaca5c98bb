use std::collections::BTreeMap;
use std::fmt;

use thiserror::Error;

use crate::types::FormFields;

/// Validation failure kind for a single form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldError {
    Required,
    Pattern,
    Email,
}

impl FieldError {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Required => "required",
            Self::Pattern => "pattern",
            Self::Email => "email",
        }
    }
}

/// Aggregated validation failure, one entry per invalid field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ValidationError {
    pub fields: BTreeMap<&'static str, FieldError>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        write!(f, "invalid form fields: ")?;
        for (field, kind) in &self.fields {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{field} ({})", kind.as_str())?;
            first = false;
        }
        Ok(())
    }
}

/// Validates the onboarding form fields.
///
/// Returns an empty map when the form is valid. Field names in the map use
/// the document naming (`slNo`, `mobileNumber`, `emailId`) so clients can
/// attach messages to the right inputs.
pub fn validate_form(form: &FormFields) -> BTreeMap<&'static str, FieldError> {
    let mut errors = BTreeMap::new();

    if form.name.trim().is_empty() {
        errors.insert("name", FieldError::Required);
    }
    if form.sl_no.trim().is_empty() {
        errors.insert("slNo", FieldError::Required);
    }
    if form.address.trim().is_empty() {
        errors.insert("address", FieldError::Required);
    }
    if form.mobile_number.trim().is_empty() {
        errors.insert("mobileNumber", FieldError::Required);
    } else if !mobile_number_is_valid(&form.mobile_number) {
        errors.insert("mobileNumber", FieldError::Pattern);
    }
    if form.email_id.trim().is_empty() {
        errors.insert("emailId", FieldError::Required);
    } else if !email_is_valid(&form.email_id) {
        errors.insert("emailId", FieldError::Email);
    }

    errors
}

/// Runs [`validate_form`] and converts a non-empty result into an error.
pub fn check_form(form: &FormFields) -> Result<(), ValidationError> {
    let fields = validate_form(form);
    if fields.is_empty() {
        Ok(())
    } else {
        Err(ValidationError { fields })
    }
}

/// Accepts an optional leading `+` followed by digits, spaces, dashes and
/// parentheses, with at least one digit overall.
pub fn mobile_number_is_valid(value: &str) -> bool {
    let rest = value.strip_prefix('+').unwrap_or(value);
    if rest.is_empty() {
        return false;
    }
    let allowed = rest
        .chars()
        .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')'));
    allowed && rest.chars().any(|c| c.is_ascii_digit())
}

/// Syntactic email check: one `@`, non-empty local part, dotted domain.
pub fn email_is_valid(value: &str) -> bool {
    let Some((local, domain)) = value.split_once('@') else {
        return false;
    };
    if local.is_empty() || domain.is_empty() || value.contains(char::is_whitespace) {
        return false;
    }
    let Some((host, tld)) = domain.rsplit_once('.') else {
        return false;
    };
    !host.is_empty() && !tld.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> FormFields {
        FormFields {
            name: "Jane Doe".to_string(),
            sl_no: "SL-001".to_string(),
            address: "123 Main St, Springfield".to_string(),
            mobile_number: "+1 (555) 123-4567".to_string(),
            email_id: "jane@example.com".to_string(),
        }
    }

    #[test]
    fn valid_form_produces_no_errors() {
        assert!(validate_form(&valid_form()).is_empty());
        assert!(check_form(&valid_form()).is_ok());
    }

    #[test]
    fn missing_required_fields_are_reported() {
        let errors = validate_form(&FormFields::default());
        assert_eq!(errors.len(), 5);
        assert_eq!(errors.get("name"), Some(&FieldError::Required));
        assert_eq!(errors.get("slNo"), Some(&FieldError::Required));
        assert_eq!(errors.get("address"), Some(&FieldError::Required));
        assert_eq!(errors.get("mobileNumber"), Some(&FieldError::Required));
        assert_eq!(errors.get("emailId"), Some(&FieldError::Required));
    }

    #[test]
    fn whitespace_only_fields_count_as_missing() {
        let mut form = valid_form();
        form.address = "   ".to_string();
        let errors = validate_form(&form);
        assert_eq!(errors.get("address"), Some(&FieldError::Required));
    }

    #[test]
    fn mobile_number_rejects_letters() {
        let mut form = valid_form();
        form.mobile_number = "555-CALL-NOW".to_string();
        let errors = validate_form(&form);
        assert_eq!(errors.get("mobileNumber"), Some(&FieldError::Pattern));
    }

    #[test]
    fn mobile_number_requires_a_digit() {
        assert!(!mobile_number_is_valid("+"));
        assert!(!mobile_number_is_valid("()- "));
        assert!(mobile_number_is_valid("+15551234567"));
        assert!(mobile_number_is_valid("(555) 123-4567"));
    }

    #[test]
    fn email_rejects_obviously_broken_values() {
        assert!(!email_is_valid("jane"));
        assert!(!email_is_valid("jane@"));
        assert!(!email_is_valid("@example.com"));
        assert!(!email_is_valid("jane@example"));
        assert!(!email_is_valid("jane doe@example.com"));
        assert!(email_is_valid("jane@example.com"));
    }

    #[test]
    fn validation_error_lists_field_names() {
        let err = check_form(&FormFields::default()).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("mobileNumber"));
        assert!(message.contains("required"));
    }
}
