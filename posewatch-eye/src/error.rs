//! Error types for posewatch-eye

use crate::engine::RunningMode;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum VisionError {
    #[error("Pose landmarker not ready: {0}")]
    NotReady(String),

    #[error("Unsupported capability: {0}")]
    Unsupported(String),

    #[error("Camera stream denied: {0}")]
    StreamDenied(String),

    #[error("Running mode mismatch: engine is in {actual:?}, call requires {expected:?}")]
    ModeMismatch {
        expected: RunningMode,
        actual: RunningMode,
    },

    #[error("Timestamp error: {0}")]
    Timestamp(String),

    #[error("Camera error: {0}")]
    Camera(String),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Processing error: {0}")]
    Processing(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Detection loop task failed: {0}")]
    Join(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
}

impl From<tokio::task::JoinError> for VisionError {
    fn from(err: tokio::task::JoinError) -> Self {
        VisionError::Join(err.to_string())
    }
}
