//! Tests for the webcam detection loop and its state machine

mod common;

use common::*;
use posewatch_eye::config::DisplaySize;
use posewatch_eye::drawing::PoseStyle;
use posewatch_eye::engine::{EngineOptions, ReplayEngine, RunningMode};
use posewatch_eye::error::VisionError;
use posewatch_eye::session::Session;
use posewatch_eye::webcam::{FrameOutcome, LoopReport, WebcamController, WebcamState};
use std::sync::Arc;

async fn ready_session(engine: Arc<FakeEngine>) -> Arc<Session> {
    let session = Arc::new(Session::default());
    session.install_engine(engine, RunningMode::Image).await;
    session
}

fn controller(
    session: Arc<Session>,
    camera: Arc<FakeCamera>,
    scheduler: Arc<CountingScheduler>,
) -> WebcamController<RecordingCanvas> {
    WebcamController::new(
        session,
        camera,
        scheduler,
        RecordingCanvas::new(),
        PoseStyle::default(),
        DisplaySize::default(),
    )
}

#[tokio::test]
async fn test_unchanged_timestamp_detects_once() {
    let engine = Arc::new(FakeEngine::new(pose(1)));
    let session = ready_session(engine.clone()).await;
    let camera = Arc::new(FakeCamera::new(vec![1.0, 1.0, 2.0]));
    let scheduler = Arc::new(CountingScheduler::stop_after(session.clone(), 3));
    let webcam = controller(session.clone(), camera.clone(), scheduler.clone());

    assert_eq!(webcam.toggle().await.unwrap(), WebcamState::Streaming);
    let report = webcam.join().await.unwrap().unwrap();

    assert_eq!(
        report,
        LoopReport {
            iterations: 3,
            detections: 2,
            skipped_frames: 1,
            reschedules: 3,
        }
    );
    assert_eq!(engine.video_detections(), 2);
    assert_eq!(scheduler.refreshes(), 3);
    assert_eq!(webcam.state(), WebcamState::Stopped);
    assert!(!session.webcam_running());
}

#[tokio::test]
async fn test_skipped_frames_still_reschedule() {
    let engine = Arc::new(FakeEngine::new(pose(1)));
    let session = ready_session(engine.clone()).await;
    let camera = Arc::new(FakeCamera::new(vec![5.0]));
    let scheduler = Arc::new(CountingScheduler::stop_after(session.clone(), 4));
    let webcam = controller(session, camera, scheduler);

    webcam.toggle().await.unwrap();
    let report = webcam.join().await.unwrap().unwrap();
    assert_eq!(report.iterations, 4);
    assert_eq!(report.detections, 1);
    assert_eq!(report.skipped_frames, 3);
    assert_eq!(report.reschedules, 4);
    assert_eq!(engine.video_detections(), 1);
}

#[tokio::test]
async fn test_switches_to_video_mode_once() {
    let engine = Arc::new(FakeEngine::new(pose(1)));
    let session = ready_session(engine.clone()).await;
    let camera = Arc::new(FakeCamera::new(Vec::new()));
    let scheduler = Arc::new(CountingScheduler::stop_after(session.clone(), 5));
    let webcam = controller(session.clone(), camera, scheduler);

    webcam.toggle().await.unwrap();
    webcam.join().await.unwrap();

    let calls = engine.calls();
    assert_eq!(calls[0], EngineCall::SetMode(RunningMode::Video));
    assert_eq!(engine.mode_switches(), 1);
    assert_eq!(engine.video_detections(), 5);
    assert_eq!(session.running_mode().await, RunningMode::Video);

    // Timestamps handed to the engine never decrease
    let stamps: Vec<f64> = calls
        .iter()
        .filter_map(|c| match c {
            EngineCall::DetectForVideo(t) => Some(*t),
            _ => None,
        })
        .collect();
    assert!(stamps.windows(2).all(|w| w[0] <= w[1]));
}

#[tokio::test]
async fn test_overlay_cleared_before_drawing_inside_saved_state() {
    let engine = Arc::new(FakeEngine::new(pose(2)));
    let session = ready_session(engine).await;
    let camera = Arc::new(FakeCamera::new(vec![1.0]));
    let scheduler = Arc::new(CountingScheduler::stop_after(session.clone(), 1));
    let webcam = controller(session, camera, scheduler);

    webcam.toggle().await.unwrap();
    webcam.join().await.unwrap();

    let canvas = webcam.canvas();
    let canvas = canvas.lock();
    assert_eq!(canvas.ops[0], CanvasOp::Display(DisplaySize::default()));
    assert_eq!(canvas.ops[1], CanvasOp::Save);
    assert_eq!(canvas.ops[2], CanvasOp::Clear);
    assert_eq!(canvas.ops.last(), Some(&CanvasOp::Restore));
    assert!(canvas.position(CanvasOp::Clear) < canvas.position(CanvasOp::Circle));
    assert_eq!(canvas.count(CanvasOp::Save), canvas.count(CanvasOp::Restore));
    assert_eq!(canvas.count(CanvasOp::Circle), 66);
    assert_eq!(canvas.count(CanvasOp::Display(DisplaySize::default())), 1);
}

#[tokio::test]
async fn test_pending_detection_renders_after_disable() {
    let engine = Arc::new(FakeEngine::gated(pose(1)));
    let session = ready_session(engine.clone()).await;
    let camera = Arc::new(FakeCamera::new(vec![1.0, 2.0, 3.0]));
    let scheduler = Arc::new(CountingScheduler::new());
    let webcam = controller(session.clone(), camera, scheduler.clone());

    assert_eq!(webcam.toggle().await.unwrap(), WebcamState::Streaming);
    engine.entered.notified().await;

    // Disable while the first detection is still in flight
    assert_eq!(webcam.toggle().await.unwrap(), WebcamState::Streaming);
    assert!(!session.webcam_running());
    engine.gate.notify_one();

    let report = webcam.join().await.unwrap().unwrap();
    assert_eq!(report.iterations, 1);
    assert_eq!(report.detections, 1);
    assert_eq!(report.reschedules, 0);
    assert_eq!(scheduler.refreshes(), 0);
    assert_eq!(engine.video_detections(), 1);
    assert!(webcam.canvas().lock().count(CanvasOp::Circle) > 0);
    assert_eq!(webcam.state(), WebcamState::Stopped);
}

#[tokio::test]
async fn test_toggle_before_engine_ready_is_noop() {
    let session = Arc::new(Session::default());
    let camera = Arc::new(FakeCamera::new(vec![1.0]));
    let webcam = controller(session.clone(), camera.clone(), Arc::new(CountingScheduler::new()));

    assert_eq!(webcam.toggle().await.unwrap(), WebcamState::Stopped);
    assert_eq!(camera.opened(), 0);
    assert!(!session.webcam_running());
    assert!(webcam.join().await.unwrap().is_none());
}

#[tokio::test]
async fn test_unsupported_camera() {
    let session = ready_session(Arc::new(FakeEngine::new(pose(1)))).await;
    let webcam = controller(
        session,
        Arc::new(FakeCamera::unsupported()),
        Arc::new(CountingScheduler::new()),
    );
    assert!(!webcam.is_supported());
    assert!(matches!(webcam.toggle().await, Err(VisionError::Unsupported(_))));
    assert_eq!(webcam.state(), WebcamState::Stopped);
}

#[tokio::test]
async fn test_stream_denied_returns_to_stopped() {
    let session = ready_session(Arc::new(FakeEngine::new(pose(1)))).await;
    let webcam = controller(
        session.clone(),
        Arc::new(FakeCamera::denying()),
        Arc::new(CountingScheduler::new()),
    );
    assert!(matches!(webcam.toggle().await, Err(VisionError::StreamDenied(_))));
    assert_eq!(webcam.state(), WebcamState::Stopped);
    assert!(!session.webcam_running());
}

#[tokio::test]
async fn test_disable_while_requesting_drops_stream() {
    let engine = Arc::new(FakeEngine::new(pose(1)));
    let session = ready_session(engine.clone()).await;
    let camera = Arc::new(FakeCamera::holding_grant(vec![1.0]));
    let webcam = controller(session.clone(), camera.clone(), Arc::new(CountingScheduler::new()));

    let (enable, disable) = tokio::join!(webcam.toggle(), async {
        camera.requested.notified().await;
        assert_eq!(webcam.state(), WebcamState::RequestingStream);
        let state = webcam.toggle().await;
        camera.grant.notify_one();
        state
    });

    assert_eq!(disable.unwrap(), WebcamState::RequestingStream);
    assert_eq!(enable.unwrap(), WebcamState::Stopped);
    assert_eq!(webcam.state(), WebcamState::Stopped);
    assert_eq!(engine.video_detections(), 0);
    assert!(webcam.join().await.unwrap().is_none());
}

#[tokio::test]
async fn test_detection_failure_stops_loop() {
    let engine = Arc::new(FakeEngine::failing_video());
    let session = ready_session(engine).await;
    let webcam = controller(
        session.clone(),
        Arc::new(FakeCamera::new(vec![1.0, 2.0])),
        Arc::new(CountingScheduler::new()),
    );

    webcam.toggle().await.unwrap();
    assert!(matches!(webcam.join().await, Err(VisionError::Processing(_))));
    assert_eq!(webcam.state(), WebcamState::Stopped);
    assert!(!session.webcam_running());
}

#[tokio::test]
async fn test_toggle_restarts_after_failed_loop() {
    let engine = Arc::new(FakeEngine::failing_video());
    let session = ready_session(engine.clone()).await;
    let camera = Arc::new(FakeCamera::new(vec![1.0, 2.0, 3.0]));
    let webcam = controller(session.clone(), camera.clone(), Arc::new(CountingScheduler::new()));

    assert_eq!(webcam.toggle().await.unwrap(), WebcamState::Streaming);
    while webcam.state() != WebcamState::Stopped {
        tokio::task::yield_now().await;
    }

    // The failed loop is still unjoined; enabling again must open a fresh stream
    assert_eq!(webcam.toggle().await.unwrap(), WebcamState::Streaming);
    assert_eq!(camera.opened(), 2);
    assert!(matches!(webcam.join().await, Err(VisionError::Processing(_))));
    assert_eq!(engine.video_detections(), 2);
}

#[tokio::test]
async fn test_restart_after_stop() {
    let engine = Arc::new(FakeEngine::new(pose(1)));
    let session = ready_session(engine.clone()).await;
    let camera = Arc::new(FakeCamera::new(Vec::new()));
    let scheduler = Arc::new(CountingScheduler::new());
    let webcam = controller(session.clone(), camera.clone(), scheduler);

    assert_eq!(webcam.toggle().await.unwrap(), WebcamState::Streaming);
    webcam.toggle().await.unwrap();
    webcam.join().await.unwrap();
    assert_eq!(webcam.state(), WebcamState::Stopped);

    assert_eq!(webcam.toggle().await.unwrap(), WebcamState::Streaming);
    assert_eq!(camera.opened(), 2);
    session.set_webcam_running(false);
    webcam.join().await.unwrap();
}

#[tokio::test]
async fn test_predict_frame_directly() {
    let engine = Arc::new(FakeEngine::new(pose(1)));
    let session = ready_session(engine.clone()).await;
    let webcam = controller(
        session,
        Arc::new(FakeCamera::new(Vec::new())),
        Arc::new(CountingScheduler::new()),
    );
    let mut stream = ScriptedStream::new(vec![0.5, 0.5]);

    let first = webcam.predict_frame(&mut stream).await.unwrap();
    let second = webcam.predict_frame(&mut stream).await.unwrap();
    assert_eq!(first, FrameOutcome::Detected { subjects: 1 });
    assert_eq!(second, FrameOutcome::Skipped);
    assert_eq!(stream.display, Some(DisplaySize::default()));
}

#[tokio::test]
async fn test_clicks_interleaved_with_streaming_never_mix_modes() {
    use posewatch_eye::click::{ClickController, ClickOutcome};
    use posewatch_eye::overlay::ImageTarget;

    let options = EngineOptions::default();
    let engine = Arc::new(ReplayEngine::new(vec![pose(1)], &options));
    let session = Arc::new(Session::default());
    session.install_engine(engine.clone(), RunningMode::Image).await;

    let scheduler = Arc::new(CountingScheduler::stop_after(session.clone(), 50));
    let webcam = controller(session.clone(), Arc::new(FakeCamera::new(Vec::new())), scheduler);
    let click = ClickController::new(session.clone(), PoseStyle::default());
    let target = ImageTarget::new("still", image::RgbaImage::new(40, 30));

    webcam.toggle().await.unwrap();
    for _ in 0..5 {
        let outcome = click.on_image_clicked(&target).await.unwrap();
        assert!(matches!(outcome, ClickOutcome::Rendered { subjects: 1, .. }));
        tokio::task::yield_now().await;
    }

    // ReplayEngine rejects calls issued in the wrong mode, so a clean run means every
    // detection was preceded by the matching reconfiguration.
    let report = webcam.join().await.unwrap().unwrap();
    assert_eq!(report.iterations, 50);
    assert_eq!(target.container.len(), 1);
}
