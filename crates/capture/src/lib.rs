//! Device-facing capture components.
//!
//! The camera and fingerprint subsystems live behind capability traits so
//! that tests and headless deployments can substitute fakes for real
//! hardware. Each component produces a [`onboard_core::artifact::CaptureArtifact`].

pub mod camera;
pub mod fingerprint;

use thiserror::Error;

/// Transient capture failures. Recoverable: the user retries the specific
/// capture that failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("camera has not produced a frame with non-zero dimensions")]
    NoFrame,
    #[error("fingerprint scan failed")]
    ScanFailed,
    #[error("a fingerprint scan is already in progress")]
    ScanInProgress,
    #[error("failed to encode captured frame: {0}")]
    Encode(String),
}
