//! Application controller wiring the engine, both demos and the shared session together

use crate::camera::CameraBackend;
use crate::click::{ClickController, ClickOutcome};
use crate::config::PoseConfig;
use crate::drawing::{Canvas, PoseStyle};
use crate::engine::EngineLoader;
use crate::error::VisionError;
use crate::overlay::ImageTarget;
use crate::scheduler::FrameScheduler;
use crate::session::Session;
use crate::webcam::{WebcamController, WebcamState};
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::{info, warn};

pub const ENABLE_LABEL: &str = "ENABLE PREDICTIONS";
pub const DISABLE_LABEL: &str = "DISABLE PREDICTIONS";

/// The pose demo: click-to-detect on still images plus live webcam detection.
pub struct PoseDemo<C> {
    config: PoseConfig,
    session: Arc<Session>,
    loader: Arc<dyn EngineLoader>,
    click: ClickController,
    webcam: WebcamController<C>,
    demos_visible: RwLock<bool>,
}

impl<C: Canvas + Send + 'static> PoseDemo<C> {
    pub fn new(
        config: PoseConfig,
        loader: Arc<dyn EngineLoader>,
        camera: Arc<dyn CameraBackend>,
        scheduler: Arc<dyn FrameScheduler>,
        canvas: C,
    ) -> Result<Self, VisionError> {
        config.validate().map_err(VisionError::Config)?;

        let options = config.engine_options();
        let session = Arc::new(Session::new(options.running_mode));
        let style = PoseStyle::from(&config.style);
        let click = ClickController::new(session.clone(), style);
        let webcam = WebcamController::new(
            session.clone(),
            camera,
            scheduler,
            canvas,
            style,
            config.display,
        );

        Ok(Self {
            config,
            session,
            loader,
            click,
            webcam,
            demos_visible: RwLock::new(false),
        })
    }

    /// Load the pose landmarker and reveal the demos once it is ready.
    pub async fn initialize(&self) -> Result<(), VisionError> {
        let options = self.config.engine_options();
        info!("Loading pose landmarker from {}", options.model_asset_path);
        let engine = self.loader.load(&options).await?;
        self.session.install_engine(engine, options.running_mode).await;
        *self.demos_visible.write() = true;
        Ok(())
    }

    pub fn is_ready(&self) -> bool {
        self.session.is_ready()
    }

    pub fn demos_visible(&self) -> bool {
        *self.demos_visible.read()
    }

    /// Whether the webcam demo can be enabled at all.
    pub fn is_webcam_supported(&self) -> bool {
        let supported = self.webcam.is_supported();
        if !supported {
            warn!("getUserMedia() is not supported by your browser");
        }
        supported
    }

    pub async fn click(&self, target: &ImageTarget) -> Result<ClickOutcome, VisionError> {
        self.click.on_image_clicked(target).await
    }

    pub async fn toggle_webcam(&self) -> Result<WebcamState, VisionError> {
        self.webcam.toggle().await
    }

    /// Label of the enable control
    pub fn webcam_button_label(&self) -> &'static str {
        if self.session.webcam_running() {
            DISABLE_LABEL
        } else {
            ENABLE_LABEL
        }
    }

    pub fn webcam(&self) -> &WebcamController<C> {
        &self.webcam
    }

    pub fn session(&self) -> &Arc<Session> {
        &self.session
    }

    pub fn config(&self) -> &PoseConfig {
        &self.config
    }
}
