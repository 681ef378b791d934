//! Overlay layers attached to clickable images

use crate::drawing::RasterCanvas;
use image::RgbaImage;
use parking_lot::RwLock;
use std::sync::Arc;
use uuid::Uuid;

/// One drawable layer produced by a single detection pass
#[derive(Debug, Clone)]
pub struct OverlayLayer {
    pub id: Uuid,
    pub canvas: RasterCanvas,
    /// Number of landmark sets rendered onto the layer
    pub subjects: usize,
}

impl OverlayLayer {
    /// Create an empty layer of `width` x `height` pixels.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            canvas: RasterCanvas::new(width, height),
            subjects: 0,
        }
    }
}

/// The element holding a clickable image together with any overlay layers drawn over it.
#[derive(Debug, Default)]
pub struct OverlayContainer {
    layers: RwLock<Vec<OverlayLayer>>,
}

impl OverlayContainer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every attached layer and return how many were removed.
    pub fn clear(&self) -> usize {
        let mut layers = self.layers.write();
        let removed = layers.len();
        layers.clear();
        removed
    }

    pub fn attach(&self, layer: OverlayLayer) {
        self.layers.write().push(layer);
    }

    pub fn len(&self) -> usize {
        self.layers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.read().is_empty()
    }

    /// Snapshot of the attached layers, oldest first
    pub fn layers(&self) -> Vec<OverlayLayer> {
        self.layers.read().clone()
    }

    pub fn latest(&self) -> Option<OverlayLayer> {
        self.layers.read().last().cloned()
    }
}

/// A still image that runs detection when clicked
#[derive(Debug)]
pub struct ImageTarget {
    pub name: String,
    pub image: Arc<RgbaImage>,
    pub container: OverlayContainer,
}

impl ImageTarget {
    pub fn new(name: impl Into<String>, image: RgbaImage) -> Self {
        Self {
            name: name.into(),
            image: Arc::new(image),
            container: OverlayContainer::new(),
        }
    }

    /// Intrinsic dimensions of the image, independent of how it is displayed
    pub fn natural_size(&self) -> (u32, u32) {
        self.image.dimensions()
    }
}
