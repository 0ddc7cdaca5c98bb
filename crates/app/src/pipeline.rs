use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Instant;

use metrics::{counter, histogram};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use onboard_core::artifact::CaptureArtifact;
use onboard_core::assembler::{assemble, AssembleError, AuthError};
use onboard_core::store::{BlobStore, RecordStore, StoreError, UploadError};
use onboard_core::types::{FormFields, User};
use onboard_core::validate::ValidationError;
use onboard_util::ArtifactPolicy;

use crate::session::Clock;

/// Form fields plus the decoded capture artifacts for one submission.
pub struct SubmissionInput {
    pub form: FormFields,
    pub signature: CaptureArtifact,
    pub fingerprint: CaptureArtifact,
    pub photo: CaptureArtifact,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct IncludedArtifacts {
    pub signature: bool,
    pub fingerprint: bool,
    pub photo: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmissionOutcome {
    pub id: String,
    pub included: IncludedArtifacts,
}

#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error("another submission is already in flight")]
    Busy,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("artifact upload failed: {0}")]
    Upload(#[from] UploadError),
    #[error("record store failed: {0}")]
    Storage(#[from] StoreError),
}

impl From<AssembleError> for SubmissionError {
    fn from(value: AssembleError) -> Self {
        match value {
            AssembleError::Validation(err) => Self::Validation(err),
            AssembleError::Auth(err) => Self::Auth(err),
        }
    }
}

impl SubmissionError {
    fn outcome_label(&self) -> &'static str {
        match self {
            Self::Busy => "busy",
            Self::Validation(_) => "validation",
            Self::Auth(_) => "auth",
            Self::Upload(_) => "upload",
            Self::Storage(_) => "storage",
        }
    }
}

/// Drives a submission through validate, assemble, optional upload, and
/// persist. A single in-flight guard rejects overlapping submissions so
/// a double-tap never creates two records.
#[derive(Clone)]
pub struct SubmissionPipeline {
    records: Arc<dyn RecordStore>,
    blobs: Option<Arc<dyn BlobStore>>,
    policy: ArtifactPolicy,
    clock: Clock,
    busy: Arc<AtomicBool>,
}

struct BusyGuard {
    flag: Arc<AtomicBool>,
}

impl BusyGuard {
    fn acquire(flag: &Arc<AtomicBool>) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { flag: flag.clone() })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

impl SubmissionPipeline {
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Option<Arc<dyn BlobStore>>,
        policy: ArtifactPolicy,
        clock: Clock,
    ) -> Self {
        Self {
            records,
            blobs,
            policy,
            clock,
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub async fn submit(
        &self,
        input: SubmissionInput,
        current_user: Option<&User>,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let started = Instant::now();
        let result = self.run(input, current_user).await;

        histogram!("submission_duration_seconds").record(started.elapsed().as_secs_f64());
        match &result {
            Ok(outcome) => {
                counter!("submissions_total", "outcome" => "accepted").increment(1);
                info!(record_id = %outcome.id, "submission accepted");
            }
            Err(err) => {
                counter!("submissions_total", "outcome" => err.outcome_label()).increment(1);
                warn!(outcome = err.outcome_label(), error = %err, "submission rejected");
            }
        }
        result
    }

    async fn run(
        &self,
        input: SubmissionInput,
        current_user: Option<&User>,
    ) -> Result<SubmissionOutcome, SubmissionError> {
        let _guard = BusyGuard::acquire(&self.busy).ok_or(SubmissionError::Busy)?;
        let now = (self.clock)();

        debug!(stage = "validating", "assembling submission");
        let mut record = assemble(
            &input.form,
            &input.signature,
            &input.fingerprint,
            &input.photo,
            current_user,
            now,
        )?;

        let included = IncludedArtifacts {
            signature: !input.signature.is_none(),
            fingerprint: !input.fingerprint.is_none(),
            photo: !input.photo.is_none(),
        };

        if self.policy == ArtifactPolicy::Upload {
            debug!(stage = "uploading", "pushing artifacts to the blob store");
            let submission_id = Uuid::new_v4();
            let targets = [
                (&input.signature, "signature", &mut record.signature),
                (&input.fingerprint, "fingerprint", &mut record.fingerprint),
                (&input.photo, "photo", &mut record.photo),
            ];
            for (artifact, kind, marker) in targets {
                if let CaptureArtifact::Image { bytes, mime_type } = artifact {
                    let blobs = self
                        .blobs
                        .as_ref()
                        .ok_or_else(|| UploadError::Failed("blob store not configured".into()))?;
                    let ext = extension_for(mime_type);
                    let path = format!("onboarding/{submission_id}/{kind}.{ext}");
                    let url = blobs.upload(bytes, &path).await?;
                    counter!("artifact_uploads_total", "kind" => kind).increment(1);
                    *marker = url;
                }
            }
        }

        debug!(stage = "persisting", "writing record");
        let id = self.records.create(&record).await?;

        Ok(SubmissionOutcome { id, included })
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        _ => "bin",
    }
}
