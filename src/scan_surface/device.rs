//! Camera capability
//!
//! Trait seam over the physical camera device. The surface strategies own
//! the stream for the lifetime of one activation and must release it on
//! every exit path.

use super::types::{Frame, StreamConstraints};
use async_trait::async_trait;

/// Device acquisition errors
#[derive(Debug, Clone)]
pub enum DeviceError {
    /// Camera access refused by the user/platform
    PermissionDenied(String),
    /// No usable device (missing, busy, disconnected)
    Unavailable(String),
}

impl std::fmt::Display for DeviceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeviceError::PermissionDenied(msg) => write!(f, "Camera permission denied: {}", msg),
            DeviceError::Unavailable(msg) => write!(f, "Camera unavailable: {}", msg),
        }
    }
}

impl std::error::Error for DeviceError {}

/// Camera device capability
#[async_trait]
pub trait CameraDevice: Send + Sync {
    /// Acquire a raw video stream
    async fn request_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn CameraStream>, DeviceError>;

    /// Torch capability probe; surfaces treat torch as best-effort
    fn has_torch(&self) -> bool {
        false
    }
}

/// One acquired video stream
#[async_trait]
pub trait CameraStream: Send {
    /// Sample the current frame into a pixel buffer
    ///
    /// `None` means no frame is ready this instant; the sampling loop just
    /// tries again on the next tick.
    async fn sample_frame(&mut self) -> Option<Frame>;

    /// Release the underlying device stream
    async fn stop(&mut self);
}

/// Single-frame decode pass
pub trait FrameDecoder: Send + Sync {
    /// Returns the decoded string when the frame contains a readable code
    fn decode(&self, frame: &Frame) -> Option<String>;
}
