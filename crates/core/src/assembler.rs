use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::artifact::CaptureArtifact;
use crate::types::{FormFields, OnboardingRecord, User};
use crate::validate::{check_form, ValidationError};

/// Session-level failures surfaced by the assembler and the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no authenticated session")]
    NotAuthenticated,
}

/// Reasons assembling a record can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssembleError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
}

/// Merges validated form fields and the capture artifacts into one record.
///
/// Pure: deterministic for identical inputs and a fixed `now`, which is
/// injected so tests can pin the timestamp. Artifacts of kind `None`
/// normalize to the empty-string marker, never an omitted field.
pub fn assemble(
    form: &FormFields,
    signature: &CaptureArtifact,
    fingerprint: &CaptureArtifact,
    photo: &CaptureArtifact,
    current_user: Option<&User>,
    now: DateTime<Utc>,
) -> Result<OnboardingRecord, AssembleError> {
    check_form(form)?;
    let user = current_user.ok_or(AuthError::NotAuthenticated)?;

    Ok(OnboardingRecord {
        name: form.name.trim().to_string(),
        sl_no: form.sl_no.trim().to_string(),
        address: form.address.trim().to_string(),
        mobile_number: form.mobile_number.trim().to_string(),
        email_id: form.email_id.trim().to_string(),
        signature: signature.inline_marker(),
        fingerprint: fingerprint.inline_marker(),
        photo: photo.inline_marker(),
        created_at: now,
        created_by: user.id.clone(),
        owner_id: user.id.clone(),
    })
}
