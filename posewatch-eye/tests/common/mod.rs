//! Test doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use image::RgbaImage;
use parking_lot::Mutex;
use posewatch_eye::camera::{CameraBackend, StreamConstraints, VideoStream};
use posewatch_eye::config::DisplaySize;
use posewatch_eye::drawing::{Canvas, DrawStyle};
use posewatch_eye::engine::{RunningMode, VisionEngine};
use posewatch_eye::error::VisionError;
use posewatch_eye::landmarks::{NormalizedLandmark, PoseLandmarkerResult};
use posewatch_eye::scheduler::FrameScheduler;
use posewatch_eye::session::Session;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

pub fn pose(subjects: usize) -> PoseLandmarkerResult {
    PoseLandmarkerResult::new(
        (0..subjects)
            .map(|s| {
                (0..33)
                    .map(|i| NormalizedLandmark::new(0.1 + i as f32 * 0.02, 0.2 + s as f32 * 0.3, 0.0))
                    .collect()
            })
            .collect(),
    )
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EngineCall {
    SetMode(RunningMode),
    Detect,
    DetectForVideo(f64),
}

/// Engine that records every call. Video detection can be held open with a gate.
pub struct FakeEngine {
    pub calls: Mutex<Vec<EngineCall>>,
    result: PoseLandmarkerResult,
    fail_video: bool,
    gated: bool,
    /// Signalled whenever a video detection starts
    pub entered: Notify,
    /// Releases one gated video detection
    pub gate: Notify,
}

impl FakeEngine {
    pub fn new(result: PoseLandmarkerResult) -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            result,
            fail_video: false,
            gated: false,
            entered: Notify::new(),
            gate: Notify::new(),
        }
    }

    pub fn gated(result: PoseLandmarkerResult) -> Self {
        Self {
            gated: true,
            ..Self::new(result)
        }
    }

    pub fn failing_video() -> Self {
        Self {
            fail_video: true,
            ..Self::new(PoseLandmarkerResult::default())
        }
    }

    pub fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().clone()
    }

    pub fn video_detections(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::DetectForVideo(_)))
            .count()
    }

    pub fn mode_switches(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, EngineCall::SetMode(_)))
            .count()
    }
}

#[async_trait]
impl VisionEngine for FakeEngine {
    async fn set_running_mode(&self, mode: RunningMode) -> Result<(), VisionError> {
        self.calls.lock().push(EngineCall::SetMode(mode));
        Ok(())
    }

    async fn detect(&self, _image: &RgbaImage) -> Result<PoseLandmarkerResult, VisionError> {
        self.calls.lock().push(EngineCall::Detect);
        Ok(self.result.clone())
    }

    async fn detect_for_video(
        &self,
        _frame: &RgbaImage,
        timestamp_ms: f64,
    ) -> Result<PoseLandmarkerResult, VisionError> {
        self.calls.lock().push(EngineCall::DetectForVideo(timestamp_ms));
        self.entered.notify_one();
        if self.gated {
            self.gate.notified().await;
        }
        if self.fail_video {
            return Err(VisionError::Processing("inference failed".to_string()));
        }
        Ok(self.result.clone())
    }
}

/// Stream whose clock follows a script; once the script runs out the last value repeats.
/// An empty script counts up by one second per read.
pub struct ScriptedStream {
    times: Vec<f64>,
    reads: AtomicUsize,
    frame: Arc<RgbaImage>,
    pub display: Option<DisplaySize>,
}

impl ScriptedStream {
    pub fn new(times: Vec<f64>) -> Self {
        Self {
            times,
            reads: AtomicUsize::new(0),
            frame: Arc::new(RgbaImage::new(8, 6)),
            display: None,
        }
    }
}

impl VideoStream for ScriptedStream {
    fn current_time(&self) -> f64 {
        let read = self.reads.fetch_add(1, Ordering::SeqCst);
        if self.times.is_empty() {
            return read as f64;
        }
        self.times[read.min(self.times.len() - 1)]
    }

    fn current_frame(&self) -> Arc<RgbaImage> {
        self.frame.clone()
    }

    fn set_display_size(&mut self, size: DisplaySize) {
        self.display = Some(size);
    }
}

pub struct FakeCamera {
    supported: bool,
    deny: bool,
    times: Vec<f64>,
    hold_grant: bool,
    pub opened: AtomicU64,
    /// Signalled when a stream request arrives
    pub requested: Notify,
    /// Releases a held grant
    pub grant: Notify,
}

impl FakeCamera {
    pub fn new(times: Vec<f64>) -> Self {
        Self {
            supported: true,
            deny: false,
            times,
            hold_grant: false,
            opened: AtomicU64::new(0),
            requested: Notify::new(),
            grant: Notify::new(),
        }
    }

    pub fn unsupported() -> Self {
        Self {
            supported: false,
            ..Self::new(Vec::new())
        }
    }

    pub fn denying() -> Self {
        Self {
            deny: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn holding_grant(times: Vec<f64>) -> Self {
        Self {
            hold_grant: true,
            ..Self::new(times)
        }
    }

    pub fn opened(&self) -> u64 {
        self.opened.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CameraBackend for FakeCamera {
    fn is_supported(&self) -> bool {
        self.supported
    }

    async fn open_stream(
        &self,
        _constraints: &StreamConstraints,
    ) -> Result<Box<dyn VideoStream>, VisionError> {
        self.opened.fetch_add(1, Ordering::SeqCst);
        self.requested.notify_one();
        if self.hold_grant {
            self.grant.notified().await;
        }
        if self.deny {
            return Err(VisionError::StreamDenied("permission refused".to_string()));
        }
        Ok(Box::new(ScriptedStream::new(self.times.clone())))
    }
}

/// Counts refreshes; optionally clears the webcam flag on the n-th refresh.
pub struct CountingScheduler {
    pub refreshes: AtomicU64,
    stop: Option<(Arc<Session>, u64)>,
    stopped: AtomicBool,
}

impl CountingScheduler {
    pub fn new() -> Self {
        Self {
            refreshes: AtomicU64::new(0),
            stop: None,
            stopped: AtomicBool::new(false),
        }
    }

    pub fn stop_after(session: Arc<Session>, refreshes: u64) -> Self {
        Self {
            stop: Some((session, refreshes)),
            ..Self::new()
        }
    }

    pub fn refreshes(&self) -> u64 {
        self.refreshes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl FrameScheduler for CountingScheduler {
    async fn next_refresh(&self) {
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some((session, limit)) = &self.stop {
            if n >= *limit && !self.stopped.swap(true, Ordering::SeqCst) {
                session.set_webcam_running(false);
            }
        }
        tokio::task::yield_now().await;
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasOp {
    Display(DisplaySize),
    Save,
    Restore,
    Style,
    Clear,
    Circle,
    Line,
}

/// Canvas that records the operations applied to it
pub struct RecordingCanvas {
    pub ops: Vec<CanvasOp>,
}

impl RecordingCanvas {
    pub fn new() -> Self {
        Self { ops: Vec::new() }
    }

    pub fn count(&self, op: CanvasOp) -> usize {
        self.ops.iter().filter(|o| **o == op).count()
    }

    pub fn position(&self, op: CanvasOp) -> Option<usize> {
        self.ops.iter().position(|o| *o == op)
    }
}

impl Canvas for RecordingCanvas {
    fn width(&self) -> u32 {
        480
    }

    fn height(&self) -> u32 {
        360
    }

    fn set_display_size(&mut self, size: DisplaySize) {
        self.ops.push(CanvasOp::Display(size));
    }

    fn save(&mut self) {
        self.ops.push(CanvasOp::Save);
    }

    fn restore(&mut self) {
        self.ops.push(CanvasOp::Restore);
    }

    fn set_style(&mut self, _style: DrawStyle) {
        self.ops.push(CanvasOp::Style);
    }

    fn clear_rect(&mut self, _x: u32, _y: u32, _width: u32, _height: u32) {
        self.ops.push(CanvasOp::Clear);
    }

    fn fill_circle(&mut self, _center: (f32, f32), _radius: f32) {
        self.ops.push(CanvasOp::Circle);
    }

    fn stroke_line(&mut self, _from: (f32, f32), _to: (f32, f32)) {
        self.ops.push(CanvasOp::Line);
    }
}
