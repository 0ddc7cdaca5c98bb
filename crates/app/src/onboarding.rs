use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use metrics::counter;
use serde::{Deserialize, Serialize};
use tracing::warn;

use onboard_capture::CaptureError;
use onboard_core::artifact::CaptureArtifact;
use onboard_core::types::FormFields;

use crate::auth::{authenticate, current_user};
use crate::pipeline::{SubmissionError, SubmissionInput, SubmissionOutcome};
use crate::problem::ProblemResponse;
use crate::router::AppState;

/// Body for `POST /api/onboarding`. Biometric fields carry the inline
/// markers produced by the capture components, empty string for skipped.
#[derive(Debug, Deserialize)]
pub struct SubmissionRequest {
    #[serde(flatten)]
    pub form: FormFields,
    #[serde(default)]
    pub signature: String,
    #[serde(default)]
    pub fingerprint: String,
    #[serde(default)]
    pub photo: String,
}

pub async fn submit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<SubmissionRequest>,
) -> Result<(StatusCode, Json<SubmissionOutcome>), ProblemResponse> {
    // Resolved here, enforced inside the pipeline so validation still
    // runs first for anonymous callers.
    let user = current_user(&state, &headers);

    let input = SubmissionInput {
        form: req.form,
        signature: decode_marker(&req.signature, "signature")?,
        fingerprint: decode_marker(&req.fingerprint, "fingerprint")?,
        photo: decode_marker(&req.photo, "photo")?,
    };

    let outcome = state
        .pipeline
        .submit(input, user.as_ref())
        .await
        .map_err(submission_problem)?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

fn decode_marker(marker: &str, field: &str) -> Result<CaptureArtifact, ProblemResponse> {
    CaptureArtifact::from_marker(marker).map_err(|err| {
        ProblemResponse::bad_request("invalid_artifact", format!("{field}: {err}"))
    })
}

fn submission_problem(err: SubmissionError) -> ProblemResponse {
    match err {
        SubmissionError::Busy => ProblemResponse::conflict(
            "submission_in_flight",
            "another submission is already being processed",
        ),
        SubmissionError::Validation(err) => {
            ProblemResponse::bad_request("validation_failed", err.to_string())
        }
        SubmissionError::Auth(_) => ProblemResponse::unauthorized("sign in to submit onboarding"),
        SubmissionError::Upload(err) => {
            warn!(error = %err, "artifact upload failed");
            ProblemResponse::bad_gateway("artifact_upload_failed", "could not store the artifacts")
        }
        SubmissionError::Storage(err) => {
            warn!(error = %err, "record store failed");
            ProblemResponse::bad_gateway("record_store_failed", "could not persist the record")
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScanResponse {
    pub token: String,
}

/// POST /api/capture/fingerprint. Runs one simulated scan and returns
/// the token to embed in the next submission.
pub async fn scan_fingerprint(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<ScanResponse>, ProblemResponse> {
    authenticate(&state, &headers)?;

    match state.fingerprint.capture().await {
        Ok(CaptureArtifact::Token(token)) => {
            counter!("fingerprint_scans_total", "result" => "ok").increment(1);
            Ok(Json(ScanResponse { token }))
        }
        Ok(other) => {
            warn!(kind = other.kind_str(), "scanner returned a non-token artifact");
            counter!("fingerprint_scans_total", "result" => "error").increment(1);
            Err(ProblemResponse::bad_gateway(
                "scan_failed",
                "scanner produced an unusable result",
            ))
        }
        Err(CaptureError::ScanInProgress) => {
            counter!("fingerprint_scans_total", "result" => "in_progress").increment(1);
            Err(ProblemResponse::conflict(
                "scan_in_progress",
                "a fingerprint scan is already running",
            ))
        }
        Err(err) => {
            counter!("fingerprint_scans_total", "result" => "failed").increment(1);
            Err(ProblemResponse::bad_gateway(
                "scan_failed",
                err.to_string(),
            ))
        }
    }
}
