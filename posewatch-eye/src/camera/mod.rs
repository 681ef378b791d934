//! Camera stream acquisition

pub mod frames;

use crate::config::DisplaySize;
use crate::error::VisionError;
use async_trait::async_trait;
use image::RgbaImage;
use std::sync::Arc;

pub use frames::FrameDirectoryCamera;

/// What to request from the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamConstraints {
    pub video: bool,
}

impl Default for StreamConstraints {
    fn default() -> Self {
        Self { video: true }
    }
}

/// Source of live camera streams
#[async_trait]
pub trait CameraBackend: Send + Sync {
    /// Whether camera access exists at all on this platform
    fn is_supported(&self) -> bool;

    /// Request a stream. Resolves once access is granted and the first frame is ready.
    ///
    /// A refused request fails with [`VisionError::StreamDenied`].
    async fn open_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn VideoStream>, VisionError>;
}

/// A playing video stream
pub trait VideoStream: Send + Sync {
    /// Presentation time of the current frame in seconds. Never decreases.
    fn current_time(&self) -> f64;

    /// Pixels of the current frame
    fn current_frame(&self) -> Arc<RgbaImage>;

    fn set_display_size(&mut self, size: DisplaySize);
}

/// Backend for hosts without any camera. Every stream request is refused.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoCamera;

#[async_trait]
impl CameraBackend for NoCamera {
    fn is_supported(&self) -> bool {
        false
    }

    async fn open_stream(
        &self,
        _constraints: &StreamConstraints,
    ) -> Result<Box<dyn VideoStream>, VisionError> {
        Err(VisionError::Unsupported("no camera on this host".to_string()))
    }
}
