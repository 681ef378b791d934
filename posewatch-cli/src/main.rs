// PoseWatch command line interface
// Runs the click and webcam demos headless against recorded landmarks

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use posewatch_eye::camera::{CameraBackend, FrameDirectoryCamera, NoCamera};
use posewatch_eye::click::ClickOutcome;
use posewatch_eye::config::PoseConfig;
use posewatch_eye::demo::PoseDemo;
use posewatch_eye::drawing::RasterCanvas;
use posewatch_eye::engine::ReplayLoader;
use posewatch_eye::overlay::ImageTarget;
use posewatch_eye::scheduler::IntervalScheduler;
use serde_json::json;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "posewatch")]
#[command(about = "Pose landmark overlays for still images and camera streams", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Configuration file path (TOML)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Maximum number of poses per detection
    #[arg(long, global = true)]
    num_poses: Option<usize>,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect poses in one image, as if it had been clicked
    Detect {
        /// Image to run detection on
        #[arg(long)]
        image: PathBuf,

        /// Recorded landmarker results (JSON)
        #[arg(long)]
        results: PathBuf,

        /// Where to write the image with its overlay
        #[arg(long, short)]
        out: PathBuf,
    },

    /// Stream a directory of frames through the webcam loop
    Webcam {
        /// Directory of png/jpg frames played back as the camera
        #[arg(long)]
        frames: PathBuf,

        /// Recorded landmarker results (JSON)
        #[arg(long)]
        results: PathBuf,

        /// How long to keep predictions enabled
        #[arg(long, default_value = "3")]
        seconds: u64,

        /// Playback rate of the frame directory
        #[arg(long)]
        fps: Option<u32>,

        /// Display refresh rate driving the loop
        #[arg(long)]
        refresh_rate: Option<u32>,

        /// Where to write the last overlay canvas
        #[arg(long, short)]
        out: PathBuf,
    },
}

fn init_logging(level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

fn load_config(cli: &Cli) -> anyhow::Result<PoseConfig> {
    let mut config = match &cli.config {
        Some(path) => PoseConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => PoseConfig::default(),
    };
    if let Some(num_poses) = cli.num_poses {
        config.engine.num_poses = num_poses;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.log_level, cli.json_logs);
    let mut config = load_config(&cli)?;

    match &cli.command {
        Commands::Detect { image, results, out } => {
            detect(config, image, results, out).await?;
        }
        Commands::Webcam {
            frames,
            results,
            seconds,
            fps,
            refresh_rate,
            out,
        } => {
            if let Some(fps) = fps {
                config.frames_per_second = *fps;
            }
            if let Some(hz) = refresh_rate {
                config.refresh_rate_hz = *hz;
            }
            webcam(config, frames, results, *seconds, out).await?;
        }
    }

    Ok(())
}

fn build_demo(
    config: PoseConfig,
    results: &Path,
    camera: Arc<dyn CameraBackend>,
) -> anyhow::Result<PoseDemo<RasterCanvas>> {
    let display = config.display;
    let scheduler = IntervalScheduler::new(config.refresh_rate_hz);
    let demo = PoseDemo::new(
        config,
        Arc::new(ReplayLoader::new(results)),
        camera,
        Arc::new(scheduler),
        RasterCanvas::new(display.width, display.height),
    )
    .context("Invalid configuration")?;
    Ok(demo)
}

async fn detect(config: PoseConfig, image: &Path, results: &Path, out: &Path) -> anyhow::Result<()> {
    let demo = build_demo(config, results, Arc::new(NoCamera))?;
    demo.initialize()
        .await
        .context("Failed to load pose landmarker")?;

    let pixels = image::open(image)
        .with_context(|| format!("Failed to read image {}", image.display()))?
        .to_rgba8();
    let name = image
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "image".to_string());
    let target = ImageTarget::new(name, pixels);

    match demo.click(&target).await? {
        ClickOutcome::NotReady => bail!("Pose landmarker is not ready"),
        ClickOutcome::Rendered { subjects, layer_id } => {
            info!("Rendered {} poses into layer {}", subjects, layer_id);
        }
    }

    let Some(layer) = target.container.latest() else {
        bail!("No overlay layer was attached");
    };
    layer
        .canvas
        .composite_over(&target.image)
        .save(out)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "{}",
        json!({ "image": image, "poses": layer.subjects, "out": out })
    );
    Ok(())
}

async fn webcam(
    config: PoseConfig,
    frames: &Path,
    results: &Path,
    seconds: u64,
    out: &Path,
) -> anyhow::Result<()> {
    let camera = FrameDirectoryCamera::new(frames, config.frames_per_second);
    let demo = build_demo(config, results, Arc::new(camera))?;
    demo.initialize()
        .await
        .context("Failed to load pose landmarker")?;
    if !demo.is_webcam_supported() {
        bail!("Frame directory {} is not available", frames.display());
    }

    let state = demo
        .toggle_webcam()
        .await
        .context("Failed to enable webcam predictions")?;
    info!("Webcam {:?}, button reads {:?}", state, demo.webcam_button_label());

    tokio::time::sleep(Duration::from_secs(seconds)).await;

    demo.toggle_webcam().await?;
    let report = demo.webcam().join().await.context("Webcam loop failed")?;
    let Some(report) = report else {
        warn!("Webcam loop never started");
        return Ok(());
    };

    demo.webcam()
        .canvas()
        .lock()
        .save_png(out)
        .with_context(|| format!("Failed to write {}", out.display()))?;

    println!(
        "{}",
        json!({
            "iterations": report.iterations,
            "detections": report.detections,
            "skipped_frames": report.skipped_frames,
            "reschedules": report.reschedules,
            "out": out,
        })
    );
    Ok(())
}
