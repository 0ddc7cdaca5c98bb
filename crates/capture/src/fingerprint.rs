use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use tracing::debug;
use uuid::Uuid;

use onboard_core::artifact::CaptureArtifact;

use crate::CaptureError;

/// Fingerprint acquisition capability.
///
/// The shipped implementation is a simulation; real scanner hardware slots
/// in behind this same contract.
#[async_trait]
pub trait FingerprintScanner: Send + Sync {
    async fn scan(&self) -> Result<CaptureArtifact, CaptureError>;
}

/// Simulated scanner: fixed latency, randomized success.
pub struct SimulatedScanner {
    latency: Duration,
    failure_rate: f64,
}

impl SimulatedScanner {
    pub fn new(latency: Duration, failure_rate: f64) -> Self {
        Self {
            latency,
            failure_rate,
        }
    }
}

impl Default for SimulatedScanner {
    fn default() -> Self {
        Self::new(Duration::from_secs(2), 0.1)
    }
}

#[async_trait]
impl FingerprintScanner for SimulatedScanner {
    async fn scan(&self) -> Result<CaptureArtifact, CaptureError> {
        tokio::time::sleep(self.latency).await;
        if rand::thread_rng().gen::<f64>() < self.failure_rate {
            return Err(CaptureError::ScanFailed);
        }
        Ok(CaptureArtifact::Token(format!("scan-{}", Uuid::new_v4())))
    }
}

/// Fingerprint capture component with a single-in-flight guard.
///
/// Re-entrant `capture` calls while a scan is pending are rejected, the
/// equivalent of disabling the trigger button. Failures are not sticky: a
/// later independent call can still succeed.
pub struct FingerprintCapture {
    scanner: Arc<dyn FingerprintScanner>,
    pending: AtomicBool,
    captured: Mutex<CaptureArtifact>,
}

impl FingerprintCapture {
    pub fn new(scanner: Arc<dyn FingerprintScanner>) -> Self {
        Self {
            scanner,
            pending: AtomicBool::new(false),
            captured: Mutex::new(CaptureArtifact::None),
        }
    }

    /// Runs one scan. Rejects the call when another scan is pending.
    pub async fn capture(&self) -> Result<CaptureArtifact, CaptureError> {
        if self
            .pending
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(CaptureError::ScanInProgress);
        }

        let result = self.scanner.scan().await;
        self.pending.store(false, Ordering::Release);

        match result {
            Ok(artifact) => {
                debug!(component = "fingerprint", "scan completed");
                *self.captured.lock().expect("fingerprint state poisoned") = artifact.clone();
                Ok(artifact)
            }
            Err(err) => Err(err),
        }
    }

    /// Discards the captured token.
    pub fn clear(&self) {
        *self.captured.lock().expect("fingerprint state poisoned") = CaptureArtifact::None;
    }

    pub fn is_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    /// Returns the captured token, or `None` when no scan has succeeded.
    pub fn to_artifact(&self) -> CaptureArtifact {
        self.captured
            .lock()
            .expect("fingerprint state poisoned")
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;

    struct ScriptedScanner {
        results: Mutex<VecDeque<Result<CaptureArtifact, CaptureError>>>,
    }

    impl ScriptedScanner {
        fn new(results: Vec<Result<CaptureArtifact, CaptureError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
            }
        }
    }

    #[async_trait]
    impl FingerprintScanner for ScriptedScanner {
        async fn scan(&self) -> Result<CaptureArtifact, CaptureError> {
            self.results
                .lock()
                .expect("script poisoned")
                .pop_front()
                .unwrap_or(Err(CaptureError::ScanFailed))
        }
    }

    #[tokio::test]
    async fn simulated_scanner_with_zero_failure_rate_yields_a_token() {
        let scanner = SimulatedScanner::new(Duration::ZERO, 0.0);
        let artifact = scanner.scan().await.expect("scan");
        let CaptureArtifact::Token(token) = artifact else {
            panic!("expected token artifact");
        };
        assert!(token.starts_with("scan-"));
    }

    #[tokio::test]
    async fn simulated_scanner_with_certain_failure_reports_scan_failed() {
        let scanner = SimulatedScanner::new(Duration::ZERO, 1.0);
        assert_eq!(scanner.scan().await, Err(CaptureError::ScanFailed));
    }

    #[tokio::test]
    async fn failures_are_not_sticky() {
        let scanner = Arc::new(ScriptedScanner::new(vec![
            Err(CaptureError::ScanFailed),
            Ok(CaptureArtifact::Token("scan-2".to_string())),
        ]));
        let capture = FingerprintCapture::new(scanner);

        assert_eq!(capture.capture().await, Err(CaptureError::ScanFailed));
        assert!(capture.to_artifact().is_none());

        let artifact = capture.capture().await.expect("second scan succeeds");
        assert_eq!(artifact, CaptureArtifact::Token("scan-2".to_string()));
        assert_eq!(capture.to_artifact(), artifact);
    }

    #[tokio::test]
    async fn pending_scan_rejects_re_entry() {
        let scanner = Arc::new(SimulatedScanner::new(Duration::from_millis(100), 0.0));
        let capture = Arc::new(FingerprintCapture::new(scanner));

        let first = {
            let capture = capture.clone();
            tokio::spawn(async move { capture.capture().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(capture.is_pending());
        assert_eq!(capture.capture().await, Err(CaptureError::ScanInProgress));

        let outcome = first.await.expect("task join").expect("first scan");
        assert!(matches!(outcome, CaptureArtifact::Token(_)));
        assert!(!capture.is_pending());
    }

    #[tokio::test]
    async fn clear_discards_the_token() {
        let capture = FingerprintCapture::new(Arc::new(ScriptedScanner::new(vec![Ok(
            CaptureArtifact::Token("scan-1".to_string()),
        )])));
        capture.capture().await.expect("scan");
        capture.clear();
        assert!(capture.to_artifact().is_none());
    }
}
