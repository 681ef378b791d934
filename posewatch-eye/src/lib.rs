//! posewatch-eye: pose landmark overlays for still images and live camera streams
//!
//! A pose landmarker is loaded once and shared by two controllers. Clicking a still image
//! runs a single detection and replaces the image's overlay layer; enabling the webcam
//! starts a per-refresh loop that detects on every new video frame and redraws the
//! overlay canvas. The landmarker supports one running mode at a time, and each
//! controller switches it to its own mode right before detecting.

pub mod camera;
pub mod click;
pub mod config;
pub mod demo;
pub mod drawing;
pub mod engine;
pub mod error;
pub mod landmarks;
pub mod overlay;
pub mod scheduler;
pub mod session;
pub mod webcam;

pub use click::{ClickController, ClickOutcome};
pub use config::{DisplaySize, PoseConfig};
pub use demo::PoseDemo;
pub use engine::{EngineLoader, EngineOptions, RunningMode, VisionEngine};
pub use error::VisionError;
pub use landmarks::{NormalizedLandmark, PoseLandmarkerResult, POSE_CONNECTIONS};
pub use session::Session;
pub use webcam::{LoopReport, WebcamController, WebcamState};
