//! State shared by the click and webcam controllers
//!
//! A [`Session`] is created once per demo and shared by `Arc`. It holds the engine handle,
//! the engine's current running mode, the timestamp of the last processed video frame and
//! the webcam running flag.

use crate::engine::{RunningMode, VisionEngine};
use crate::error::VisionError;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use tokio::sync::MutexGuard;
use tracing::{debug, info};

pub struct Session {
    engine: RwLock<Option<Arc<dyn VisionEngine>>>,
    // Held from the mode check through the detection call, so reconfiguration and
    // detection from the two controllers never interleave.
    running_mode: tokio::sync::Mutex<RunningMode>,
    last_video_time: Mutex<Option<f64>>,
    webcam_running: RwLock<bool>,
}

impl Session {
    pub fn new(initial_mode: RunningMode) -> Self {
        Self {
            engine: RwLock::new(None),
            running_mode: tokio::sync::Mutex::new(initial_mode),
            last_video_time: Mutex::new(None),
            webcam_running: RwLock::new(false),
        }
    }

    /// Install the engine once its asynchronous initialization has completed.
    pub async fn install_engine(&self, engine: Arc<dyn VisionEngine>, mode: RunningMode) {
        *self.running_mode.lock().await = mode;
        *self.engine.write() = Some(engine);
        info!("Pose landmarker installed in {:?} mode", mode);
    }

    pub fn engine(&self) -> Option<Arc<dyn VisionEngine>> {
        self.engine.read().clone()
    }

    pub fn is_ready(&self) -> bool {
        self.engine.read().is_some()
    }

    pub async fn running_mode(&self) -> RunningMode {
        *self.running_mode.lock().await
    }

    /// Put the engine into `mode`, reconfiguring it only when it is in the other mode.
    ///
    /// The returned guard must be held until the caller's detection call has completed.
    pub async fn acquire_mode(
        &self,
        engine: &dyn VisionEngine,
        mode: RunningMode,
    ) -> Result<MutexGuard<'_, RunningMode>, VisionError> {
        let mut current = self.running_mode.lock().await;
        if *current != mode {
            debug!("Reconfiguring pose landmarker from {:?} to {:?}", *current, mode);
            engine.set_running_mode(mode).await?;
            *current = mode;
        }
        Ok(current)
    }

    /// Record `timestamp` as processed. Returns `false` when it equals the last processed one.
    pub fn advance_video_time(&self, timestamp: f64) -> bool {
        let mut last = self.last_video_time.lock();
        if *last == Some(timestamp) {
            return false;
        }
        *last = Some(timestamp);
        true
    }

    pub fn last_video_time(&self) -> Option<f64> {
        *self.last_video_time.lock()
    }

    pub fn webcam_running(&self) -> bool {
        *self.webcam_running.read()
    }

    pub fn set_webcam_running(&self, running: bool) {
        *self.webcam_running.write() = running;
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new(RunningMode::Image)
    }
}
