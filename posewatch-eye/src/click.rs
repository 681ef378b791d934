//! Single-shot detection on clicked images

use crate::drawing::{draw_pose, PoseStyle};
use crate::engine::RunningMode;
use crate::error::VisionError;
use crate::overlay::{ImageTarget, OverlayLayer};
use crate::session::Session;
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// What a click produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    /// The engine has not finished loading; nothing was detected or drawn
    NotReady,
    /// A fresh overlay layer was attached to the target
    Rendered { subjects: usize, layer_id: Uuid },
}

/// Runs detection on a clicked image and replaces its overlay.
pub struct ClickController {
    session: Arc<Session>,
    style: PoseStyle,
}

impl ClickController {
    pub fn new(session: Arc<Session>, style: PoseStyle) -> Self {
        Self { session, style }
    }

    /// Detect poses in `target` and attach exactly one new overlay layer to its container.
    ///
    /// Switches the engine to image mode first if needed. Previous layers are removed
    /// before detection is issued. The mode is held until the new layer is attached.
    pub async fn on_image_clicked(&self, target: &ImageTarget) -> Result<ClickOutcome, VisionError> {
        let Some(engine) = self.session.engine() else {
            info!("Wait for the pose landmarker to load before clicking!");
            return Ok(ClickOutcome::NotReady);
        };

        let guard = self.session.acquire_mode(engine.as_ref(), RunningMode::Image).await?;

        let removed = target.container.clear();
        if removed > 0 {
            debug!("Removed {} overlay layers from {}", removed, target.name);
        }

        let result = engine.detect(&target.image).await?;

        let (width, height) = target.natural_size();
        let mut layer = OverlayLayer::new(width, height);
        layer.subjects = draw_pose(&mut layer.canvas, &result, &self.style);
        let outcome = ClickOutcome::Rendered {
            subjects: layer.subjects,
            layer_id: layer.id,
        };
        // Attach before releasing the mode so an overlapping click clears this layer
        target.container.attach(layer);
        drop(guard);

        info!("Detected {} poses in {}", result.subjects(), target.name);
        Ok(outcome)
    }
}
