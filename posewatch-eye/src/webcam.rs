//! Continuous detection on a live camera stream
//!
//! [`WebcamController::toggle`] drives a three-state machine:
//!
//! ```text
//! Stopped --toggle--> RequestingStream --granted--> Streaming --toggle--> Stopped
//! ```
//!
//! While streaming, a spawned task runs [`WebcamController::predict_frame`] once per display
//! refresh. The webcam running flag is checked after every frame and after every refresh
//! wait; an in-flight detection is never aborted, its result is still drawn, but nothing
//! is scheduled after it once the flag is cleared.

use crate::camera::{CameraBackend, StreamConstraints, VideoStream};
use crate::config::DisplaySize;
use crate::drawing::{draw_pose, Canvas, PoseStyle};
use crate::engine::RunningMode;
use crate::error::VisionError;
use crate::scheduler::FrameScheduler;
use crate::session::Session;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebcamState {
    Stopped,
    RequestingStream,
    Streaming,
}

/// Result of one loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The frame was new; detection ran and the overlay was redrawn
    Detected { subjects: usize },
    /// The stream had not advanced since the last processed frame
    Skipped,
}

/// Counters for one run of the detection loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LoopReport {
    pub iterations: u64,
    pub detections: u64,
    pub skipped_frames: u64,
    pub reschedules: u64,
}

type LoopTask = JoinHandle<Result<LoopReport, VisionError>>;

/// Everything the loop task needs, cloned into it when the stream starts.
struct DetectionLoop<C> {
    session: Arc<Session>,
    scheduler: Arc<dyn FrameScheduler>,
    canvas: Arc<Mutex<C>>,
    style: PoseStyle,
    display: DisplaySize,
    state: Arc<RwLock<WebcamState>>,
    origin: Instant,
}

impl<C> Clone for DetectionLoop<C> {
    fn clone(&self) -> Self {
        Self {
            session: self.session.clone(),
            scheduler: self.scheduler.clone(),
            canvas: self.canvas.clone(),
            style: self.style,
            display: self.display,
            state: self.state.clone(),
            origin: self.origin,
        }
    }
}

impl<C: Canvas + Send + 'static> DetectionLoop<C> {
    async fn predict_frame(&self, stream: &mut dyn VideoStream) -> Result<FrameOutcome, VisionError> {
        stream.set_display_size(self.display);
        self.canvas.lock().set_display_size(self.display);

        let engine = self
            .session
            .engine()
            .ok_or_else(|| VisionError::NotReady("pose landmarker not loaded".to_string()))?;
        let guard = self
            .session
            .acquire_mode(engine.as_ref(), RunningMode::Video)
            .await?;

        let start_time_ms = self.origin.elapsed().as_secs_f64() * 1000.0;
        let video_time = stream.current_time();
        if !self.session.advance_video_time(video_time) {
            return Ok(FrameOutcome::Skipped);
        }

        let frame = stream.current_frame();
        let result = engine.detect_for_video(&frame, start_time_ms).await;
        drop(guard);
        let result = result?;

        let subjects = {
            let mut canvas = self.canvas.lock();
            let (width, height) = (canvas.width(), canvas.height());
            canvas.save();
            canvas.clear_rect(0, 0, width, height);
            let subjects = draw_pose(&mut *canvas, &result, &self.style);
            canvas.restore();
            subjects
        };
        debug!(
            "Frame at {:.3}s: {} poses (detect issued at {:.1} ms)",
            video_time, subjects, start_time_ms
        );
        Ok(FrameOutcome::Detected { subjects })
    }

    async fn run(self, mut stream: Box<dyn VideoStream>) -> Result<LoopReport, VisionError> {
        let mut report = LoopReport::default();
        let outcome = loop {
            report.iterations += 1;
            match self.predict_frame(stream.as_mut()).await {
                Ok(FrameOutcome::Detected { .. }) => report.detections += 1,
                Ok(FrameOutcome::Skipped) => report.skipped_frames += 1,
                Err(e) => break Err(e),
            }

            if !self.session.webcam_running() {
                break Ok(report);
            }
            report.reschedules += 1;
            self.scheduler.next_refresh().await;
            if !self.session.webcam_running() {
                break Ok(report);
            }
        };

        self.session.set_webcam_running(false);
        *self.state.write() = WebcamState::Stopped;
        match &outcome {
            Ok(report) => info!(
                "Webcam loop stopped after {} iterations ({} detections, {} skipped)",
                report.iterations, report.detections, report.skipped_frames
            ),
            Err(e) => error!("Webcam loop failed after {} iterations: {}", report.iterations, e),
        }
        outcome
    }
}

/// Owns the webcam view: its stream, its overlay canvas and the detection loop.
pub struct WebcamController<C> {
    camera: Arc<dyn CameraBackend>,
    constraints: StreamConstraints,
    detection: DetectionLoop<C>,
    task: Mutex<Option<LoopTask>>,
}

impl<C: Canvas + Send + 'static> WebcamController<C> {
    pub fn new(
        session: Arc<Session>,
        camera: Arc<dyn CameraBackend>,
        scheduler: Arc<dyn FrameScheduler>,
        canvas: C,
        style: PoseStyle,
        display: DisplaySize,
    ) -> Self {
        Self {
            camera,
            constraints: StreamConstraints::default(),
            detection: DetectionLoop {
                session,
                scheduler,
                canvas: Arc::new(Mutex::new(canvas)),
                style,
                display,
                state: Arc::new(RwLock::new(WebcamState::Stopped)),
                origin: Instant::now(),
            },
            task: Mutex::new(None),
        }
    }

    pub fn state(&self) -> WebcamState {
        *self.detection.state.read()
    }

    /// The overlay canvas drawn by the loop
    pub fn canvas(&self) -> Arc<Mutex<C>> {
        self.detection.canvas.clone()
    }

    pub fn is_supported(&self) -> bool {
        self.camera.is_supported()
    }

    /// Flip the enable control.
    ///
    /// Returns the state the controller is in when this call completes. Turning on resolves
    /// once the stream is granted and the loop is running; turning off only clears the
    /// running flag and the loop winds down within one refresh.
    pub async fn toggle(&self) -> Result<WebcamState, VisionError> {
        let session = &self.detection.session;
        if !session.is_ready() {
            warn!("Wait! pose landmarker not loaded yet.");
            return Ok(self.state());
        }
        if !self.camera.is_supported() {
            warn!("Camera access is not supported on this platform");
            return Err(VisionError::Unsupported("camera stream".to_string()));
        }

        let state = self.state();
        match state {
            WebcamState::RequestingStream => {
                let running = !session.webcam_running();
                session.set_webcam_running(running);
                info!(
                    "Pending stream request {}",
                    if running { "resumed" } else { "cancelled" }
                );
                Ok(state)
            }
            WebcamState::Streaming if session.webcam_running() => {
                session.set_webcam_running(false);
                info!("Disabling webcam predictions");
                Ok(state)
            }
            _ => self.start().await,
        }
    }

    async fn start(&self) -> Result<WebcamState, VisionError> {
        // A previous loop may still be winding down; its outcome does not block a restart
        match self.join().await {
            Ok(Some(report)) => debug!("Previous webcam loop finished: {:?}", report),
            Ok(None) => {}
            Err(e) => warn!("Previous webcam loop ended with: {}", e),
        }

        let session = &self.detection.session;
        session.set_webcam_running(true);
        *self.detection.state.write() = WebcamState::RequestingStream;
        info!("Enabling webcam predictions, requesting camera stream");

        let stream = match self.camera.open_stream(&self.constraints).await {
            Ok(stream) => stream,
            Err(e) => {
                session.set_webcam_running(false);
                *self.detection.state.write() = WebcamState::Stopped;
                return Err(e);
            }
        };

        if !session.webcam_running() {
            *self.detection.state.write() = WebcamState::Stopped;
            info!("Camera stream granted after webcam was disabled, dropping it");
            return Ok(WebcamState::Stopped);
        }

        *self.detection.state.write() = WebcamState::Streaming;
        let handle = tokio::spawn(self.detection.clone().run(stream));
        *self.task.lock() = Some(handle);
        Ok(WebcamState::Streaming)
    }

    /// Run one loop iteration against `stream`.
    pub async fn predict_frame(&self, stream: &mut dyn VideoStream) -> Result<FrameOutcome, VisionError> {
        self.detection.predict_frame(stream).await
    }

    /// Wait for the detection loop to end. Returns `None` when no loop was started since the
    /// last join.
    pub async fn join(&self) -> Result<Option<LoopReport>, VisionError> {
        let handle = self.task.lock().take();
        match handle {
            Some(handle) => Ok(Some(handle.await??)),
            None => Ok(None),
        }
    }
}
