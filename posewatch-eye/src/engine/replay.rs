//! Engine that replays recorded landmark results

use super::{Delegate, EngineLoader, EngineOptions, RunningMode, VisionEngine};
use crate::error::VisionError;
use crate::landmarks::PoseLandmarkerResult;
use async_trait::async_trait;
use image::RgbaImage;
use parking_lot::{Mutex, RwLock};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Deserialize)]
#[serde(untagged)]
enum Recording {
    Many(Vec<PoseLandmarkerResult>),
    One(PoseLandmarkerResult),
}

/// A [`VisionEngine`] that serves pre-recorded results round-robin.
///
/// It behaves like a real landmarker with respect to running modes: detection calls issued
/// in the wrong mode fail, and video timestamps may never go backwards.
pub struct ReplayEngine {
    results: Vec<PoseLandmarkerResult>,
    cursor: Mutex<usize>,
    mode: RwLock<RunningMode>,
    last_timestamp_ms: Mutex<Option<f64>>,
    num_poses: usize,
    delegate: Delegate,
}

impl ReplayEngine {
    pub fn new(results: Vec<PoseLandmarkerResult>, options: &EngineOptions) -> Self {
        Self {
            results,
            cursor: Mutex::new(0),
            mode: RwLock::new(options.running_mode),
            last_timestamp_ms: Mutex::new(None),
            num_poses: options.num_poses,
            delegate: options.delegate,
        }
    }

    /// Parse a recording: either a JSON array of results or a single result object.
    pub fn from_json(json: &str, options: &EngineOptions) -> Result<Self, VisionError> {
        let results = match serde_json::from_str::<Recording>(json)? {
            Recording::Many(results) => results,
            Recording::One(result) => vec![result],
        };
        Ok(Self::new(results, options))
    }

    pub fn running_mode(&self) -> RunningMode {
        *self.mode.read()
    }

    pub fn delegate(&self) -> Delegate {
        self.delegate
    }

    fn require_mode(&self, expected: RunningMode) -> Result<(), VisionError> {
        let actual = *self.mode.read();
        if actual != expected {
            return Err(VisionError::ModeMismatch { expected, actual });
        }
        Ok(())
    }

    fn next_result(&self) -> PoseLandmarkerResult {
        if self.results.is_empty() {
            return PoseLandmarkerResult::default();
        }
        let mut cursor = self.cursor.lock();
        let mut result = self.results[*cursor % self.results.len()].clone();
        *cursor = cursor.wrapping_add(1);
        result.truncate(self.num_poses);
        result
    }
}

#[async_trait]
impl VisionEngine for ReplayEngine {
    async fn set_running_mode(&self, mode: RunningMode) -> Result<(), VisionError> {
        let mut current = self.mode.write();
        if *current != mode {
            debug!("Replay engine switching from {:?} to {:?}", *current, mode);
            *current = mode;
            // A new streaming session starts its own timeline
            *self.last_timestamp_ms.lock() = None;
        }
        Ok(())
    }

    async fn detect(&self, image: &RgbaImage) -> Result<PoseLandmarkerResult, VisionError> {
        self.require_mode(RunningMode::Image)?;
        let result = self.next_result();
        debug!(
            "Replayed {} poses for {}x{} image",
            result.subjects(),
            image.width(),
            image.height()
        );
        Ok(result)
    }

    async fn detect_for_video(
        &self,
        frame: &RgbaImage,
        timestamp_ms: f64,
    ) -> Result<PoseLandmarkerResult, VisionError> {
        self.require_mode(RunningMode::Video)?;
        if !timestamp_ms.is_finite() {
            return Err(VisionError::Timestamp(format!(
                "Timestamp must be finite, got {}",
                timestamp_ms
            )));
        }
        {
            let mut last = self.last_timestamp_ms.lock();
            if let Some(previous) = *last {
                if timestamp_ms < previous {
                    return Err(VisionError::Timestamp(format!(
                        "Timestamp {} ms precedes previous {} ms",
                        timestamp_ms, previous
                    )));
                }
            }
            *last = Some(timestamp_ms);
        }
        let result = self.next_result();
        debug!(
            "Replayed {} poses for {}x{} frame at {:.1} ms",
            result.subjects(),
            frame.width(),
            frame.height(),
            timestamp_ms
        );
        Ok(result)
    }
}

/// Loads a [`ReplayEngine`] from a JSON recording on disk.
pub struct ReplayLoader {
    recording: PathBuf,
}

impl ReplayLoader {
    pub fn new(recording: impl AsRef<Path>) -> Self {
        Self {
            recording: recording.as_ref().to_path_buf(),
        }
    }
}

#[async_trait]
impl EngineLoader for ReplayLoader {
    async fn load(&self, options: &EngineOptions) -> Result<Arc<dyn VisionEngine>, VisionError> {
        if options.num_poses == 0 {
            return Err(VisionError::Config("num_poses must be at least 1".to_string()));
        }
        let json = tokio::fs::read_to_string(&self.recording).await.map_err(|e| {
            VisionError::Model(format!(
                "Failed to read recording {:?}: {}",
                self.recording, e
            ))
        })?;
        let engine = ReplayEngine::from_json(&json, options)?;
        info!(
            "Pose landmarker ready ({} recorded results, model {}, {:?} delegate, {:?} mode)",
            engine.results.len(),
            options.model_asset_path,
            options.delegate,
            options.running_mode
        );
        Ok(Arc::new(engine))
    }
}
