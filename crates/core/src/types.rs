use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role assigned to an authenticated account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    User,
}

impl UserRole {
    /// Returns the canonical database representation for the role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::User => "user",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

/// Authenticated session user as seen by the submission pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub email: String,
    pub role: UserRole,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Raw form fields entered on the onboarding screen, before validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormFields {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sl_no: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub mobile_number: String,
    #[serde(default)]
    pub email_id: String,
}

/// A fully assembled onboarding record, immutable after assembly.
///
/// The three biometric fields always carry a marker string: the empty string
/// when nothing was captured, never an omitted field. This keeps the stored
/// document shape fixed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OnboardingRecord {
    pub name: String,
    pub sl_no: String,
    pub address: String,
    pub mobile_number: String,
    pub email_id: String,
    pub signature: String,
    pub fingerprint: String,
    pub photo: String,
    pub created_at: DateTime<Utc>,
    pub created_by: String,
    pub owner_id: String,
}

impl OnboardingRecord {
    /// A profile is complete when all three biometric markers are present.
    pub fn is_complete(&self) -> bool {
        !self.signature.trim().is_empty()
            && !self.photo.trim().is_empty()
            && !self.fingerprint.trim().is_empty()
    }
}

/// An onboarding record together with its store-assigned identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: String,
    #[serde(flatten)]
    pub record: OnboardingRecord,
}
