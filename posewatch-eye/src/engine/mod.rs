//! Vision engine abstraction
//!
//! The pose landmarker itself is opaque: it is loaded once, switched between single-image
//! and streaming mode, and asked for landmark sets. Everything in this crate talks to it
//! through [`VisionEngine`].

pub mod replay;

use crate::error::VisionError;
use crate::landmarks::PoseLandmarkerResult;
use async_trait::async_trait;
use image::RgbaImage;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

pub use replay::{ReplayEngine, ReplayLoader};

/// Mode the engine is configured for. The engine accepts only one kind of detection call
/// at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunningMode {
    /// Single-shot detection on still images
    Image,
    /// Streaming detection on timestamped video frames
    Video,
}

/// Compute backend the engine runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Delegate {
    Cpu,
    Gpu,
}

/// Options the engine is created with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineOptions {
    /// Location of the model asset (path or URL, interpreted by the loader)
    pub model_asset_path: String,
    /// Compute backend
    pub delegate: Delegate,
    /// Mode the engine starts in
    pub running_mode: RunningMode,
    /// Maximum number of subjects returned per detection
    pub num_poses: usize,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            model_asset_path: "https://storage.googleapis.com/mediapipe-models/pose_landmarker/pose_landmarker_lite/float16/1/pose_landmarker_lite.task".to_string(),
            delegate: Delegate::Gpu,
            running_mode: RunningMode::Image,
            num_poses: 2,
        }
    }
}

/// An initialized pose landmarker.
#[async_trait]
pub trait VisionEngine: Send + Sync {
    /// Reconfigure the engine for `mode`. Must complete before the next detection call.
    async fn set_running_mode(&self, mode: RunningMode) -> Result<(), VisionError>;

    /// Detect poses in a still image. Requires [`RunningMode::Image`].
    async fn detect(&self, image: &RgbaImage) -> Result<PoseLandmarkerResult, VisionError>;

    /// Detect poses in a video frame. Requires [`RunningMode::Video`].
    async fn detect_for_video(
        &self,
        frame: &RgbaImage,
        timestamp_ms: f64,
    ) -> Result<PoseLandmarkerResult, VisionError>;
}

/// Creates engines. Loading is asynchronous and may take a while for large models.
#[async_trait]
pub trait EngineLoader: Send + Sync {
    async fn load(&self, options: &EngineOptions) -> Result<Arc<dyn VisionEngine>, VisionError>;
}
