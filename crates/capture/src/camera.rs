use std::io::Cursor;
use std::sync::Arc;

use async_trait::async_trait;
use image::{codecs::jpeg::JpegEncoder, ExtendedColorType};
use thiserror::Error;
use tracing::debug;

use onboard_core::artifact::CaptureArtifact;

use crate::CaptureError;

/// JPEG quality used for captured photos.
const JPEG_QUALITY: u8 = 80;

/// Failures while acquiring a video input device.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("camera access denied")]
    AccessDenied,
    #[error("camera unavailable")]
    Unavailable,
}

/// Preferred resolution requested from the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub width: u32,
    pub height: u32,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Opaque handle to a live video stream, issued by a [`CameraDevice`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamHandle {
    id: u64,
}

impl StreamHandle {
    pub fn new(id: u64) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

/// A single raw video frame, RGB8 row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Abstract video input capability.
///
/// Real deployments wrap a platform camera; tests substitute a fake. The
/// device owns handle issuance so the session can prove it released what it
/// acquired.
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Requests exclusive access to the device at the preferred resolution.
    async fn acquire(&self, constraints: &StreamConstraints) -> Result<StreamHandle, CameraError>;

    /// Returns the most recent frame produced by the stream.
    async fn frame(&self, handle: &StreamHandle) -> Result<Frame, CaptureError>;

    /// Releases a previously acquired stream handle.
    async fn release(&self, handle: StreamHandle);
}

/// Stream state of the photo component.
///
/// Invariant: a non-none stream implies `is_active`, and at most one live
/// stream exists per component instance.
#[derive(Debug, Default)]
pub struct CameraSession {
    stream: Option<StreamHandle>,
    is_active: bool,
}

impl CameraSession {
    pub fn is_active(&self) -> bool {
        self.is_active
    }
}

/// Single-shot photo capture over an abstract camera device.
pub struct PhotoCapture {
    device: Arc<dyn CameraDevice>,
    constraints: StreamConstraints,
    session: CameraSession,
    captured: CaptureArtifact,
}

impl PhotoCapture {
    pub fn new(device: Arc<dyn CameraDevice>) -> Self {
        Self::with_constraints(device, StreamConstraints::default())
    }

    pub fn with_constraints(device: Arc<dyn CameraDevice>, constraints: StreamConstraints) -> Self {
        Self {
            device,
            constraints,
            session: CameraSession::default(),
            captured: CaptureArtifact::None,
        }
    }

    /// Acquires the device and activates the session.
    ///
    /// Any previously live stream is released first so the component never
    /// holds two handles.
    pub async fn start(&mut self) -> Result<(), CameraError> {
        self.stop().await;
        let handle = self.device.acquire(&self.constraints).await?;
        debug!(component = "photo", stream = handle.id(), "camera stream acquired");
        self.session.stream = Some(handle);
        self.session.is_active = true;
        Ok(())
    }

    /// Copies the current frame into a JPEG artifact and stops the stream.
    ///
    /// Capture is single-shot: a successful snapshot always releases the
    /// device. Fails with [`CaptureError::NoFrame`] when the stream has not
    /// produced a frame with non-zero dimensions, leaving the session active
    /// so the caller can try again.
    pub async fn snapshot(&mut self) -> Result<CaptureArtifact, CaptureError> {
        let Some(handle) = self.session.stream.as_ref() else {
            return Err(CaptureError::NoFrame);
        };
        let frame = self.device.frame(handle).await?;
        if frame.width == 0 || frame.height == 0 {
            return Err(CaptureError::NoFrame);
        }

        let artifact = encode_jpeg(&frame)?;
        self.captured = artifact.clone();
        self.stop().await;
        Ok(artifact)
    }

    /// Releases the device handle unconditionally. Safe to call when the
    /// session is already inactive, and required on teardown regardless of
    /// exit path.
    pub async fn stop(&mut self) {
        if let Some(handle) = self.session.stream.take() {
            debug!(component = "photo", stream = handle.id(), "camera stream released");
            self.device.release(handle).await;
        }
        self.session.is_active = false;
    }

    /// Discards the captured artifact, returning to the pre-capture state.
    pub fn retake(&mut self) {
        self.captured = CaptureArtifact::None;
    }

    pub fn session(&self) -> &CameraSession {
        &self.session
    }

    /// Returns the captured artifact, or `None` when nothing was captured.
    pub fn to_artifact(&self) -> CaptureArtifact {
        self.captured.clone()
    }
}

fn encode_jpeg(frame: &Frame) -> Result<CaptureArtifact, CaptureError> {
    let mut out = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut out, JPEG_QUALITY);
    encoder
        .encode(
            &frame.pixels,
            frame.width,
            frame.height,
            ExtendedColorType::Rgb8,
        )
        .map_err(|err| CaptureError::Encode(err.to_string()))?;
    Ok(CaptureArtifact::Image {
        bytes: out.into_inner(),
        mime_type: "image/jpeg".to_string(),
    })
}
