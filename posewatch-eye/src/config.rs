//! Configuration for posewatch-eye

use crate::engine::{Delegate, EngineOptions, RunningMode};
use crate::error::VisionError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// CSS-style display size applied to the video element and overlay canvas
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySize {
    pub width: u32,
    pub height: u32,
}

impl Default for DisplaySize {
    fn default() -> Self {
        Self {
            width: 480,
            height: 360,
        }
    }
}

/// Engine section of the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Model asset to load
    pub model_asset_path: String,
    /// Compute backend
    pub delegate: Delegate,
    /// Maximum number of subjects per detection
    pub num_poses: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let options = EngineOptions::default();
        Self {
            model_asset_path: options.model_asset_path,
            delegate: options.delegate,
            num_poses: options.num_poses,
        }
    }
}

/// Landmark drawing style
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleConfig {
    /// Stroke color, RGBA
    pub color: [u8; 4],
    /// Point fill color, RGBA
    pub fill_color: [u8; 4],
    /// Stroke width in pixels
    pub line_width: f32,
    /// Depth at which points are drawn largest
    pub near_z: f32,
    /// Depth at which points are drawn smallest
    pub far_z: f32,
    /// Point radius at `near_z`
    pub near_radius: f32,
    /// Point radius at `far_z`
    pub far_radius: f32,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            color: [255, 255, 255, 255],
            fill_color: [255, 0, 0, 255],
            line_width: 4.0,
            near_z: -0.15,
            far_z: 0.1,
            near_radius: 5.0,
            far_radius: 1.0,
        }
    }
}

/// Pose demo configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PoseConfig {
    pub engine: EngineConfig,
    /// Display size of the webcam view
    pub display: DisplaySize,
    /// Display refresh rate driving the webcam loop
    pub refresh_rate_hz: u32,
    /// Frame rate of file-backed camera streams
    pub frames_per_second: u32,
    pub style: StyleConfig,
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            engine: EngineConfig::default(),
            display: DisplaySize::default(),
            refresh_rate_hz: 60,
            frames_per_second: 30,
            style: StyleConfig::default(),
        }
    }
}

impl PoseConfig {
    /// Load configuration from a TOML file. Missing fields take their defaults.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, VisionError> {
        let content = std::fs::read_to_string(path)?;
        let config: PoseConfig = toml::from_str(&content)?;
        config.validate().map_err(VisionError::Config)?;
        Ok(config)
    }

    /// Options the engine is created with. The engine always starts in image mode.
    pub fn engine_options(&self) -> EngineOptions {
        EngineOptions {
            model_asset_path: self.engine.model_asset_path.clone(),
            delegate: self.engine.delegate,
            running_mode: RunningMode::Image,
            num_poses: self.engine.num_poses,
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.engine.model_asset_path.trim().is_empty() {
            return Err("Model asset path must not be empty".to_string());
        }

        if self.engine.num_poses == 0 || self.engine.num_poses > 10 {
            return Err("num_poses must be between 1 and 10".to_string());
        }

        if self.display.width == 0 || self.display.height == 0 {
            return Err("Display size must be non-zero".to_string());
        }

        if self.display.width > 7680 || self.display.height > 4320 {
            return Err("Display size too large (max 8K)".to_string());
        }

        if self.refresh_rate_hz == 0 || self.refresh_rate_hz > 240 {
            return Err("Refresh rate must be between 1 and 240".to_string());
        }

        if self.frames_per_second == 0 || self.frames_per_second > 120 {
            return Err("Frame rate must be between 1 and 120".to_string());
        }

        if !(self.style.line_width > 0.0) {
            return Err("Line width must be positive".to_string());
        }

        if self.style.near_z == self.style.far_z {
            return Err("near_z and far_z must differ".to_string());
        }

        Ok(())
    }
}
