use async_trait::async_trait;
use thiserror::Error;

use crate::types::{OnboardingRecord, StoredRecord};

/// Failures surfaced by the record store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("record store rejected the write: {0}")]
    Rejected(String),
    #[error("record store unavailable: {0}")]
    Unavailable(String),
}

/// Failures surfaced by the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UploadError {
    #[error("blob upload failed: {0}")]
    Failed(String),
}

/// Document persistence collaborator for onboarding records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persists the record and returns its store-assigned identifier.
    async fn create(&self, record: &OnboardingRecord) -> Result<String, StoreError>;

    /// Returns all records, newest first.
    async fn list_all(&self) -> Result<Vec<StoredRecord>, StoreError>;
}

/// Out-of-line artifact storage, used under the upload persistence policy.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Stores `bytes` under `path` and returns a stable reference URL.
    async fn upload(&self, bytes: &[u8], path: &str) -> Result<String, UploadError>;
}
