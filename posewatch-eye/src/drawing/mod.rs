//! Landmark drawing
//!
//! [`DrawingUtils`] renders landmark sets as points and skeleton edges onto anything that
//! implements [`Canvas`]. The canvas keeps a stack of drawing state so that a pass can be
//! bracketed by [`Canvas::save`] and [`Canvas::restore`] without leaking style into the
//! next pass.

pub mod raster;

use crate::config::{DisplaySize, StyleConfig};
use crate::landmarks::{Connection, NormalizedLandmark, PoseLandmarkerResult, POSE_CONNECTIONS};
use image::Rgba;

pub use raster::RasterCanvas;

/// Stroke and fill state of a canvas
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawStyle {
    pub stroke: Rgba<u8>,
    pub fill: Rgba<u8>,
    pub line_width: f32,
}

impl Default for DrawStyle {
    fn default() -> Self {
        Self {
            stroke: Rgba([0, 0, 0, 255]),
            fill: Rgba([0, 0, 0, 255]),
            line_width: 1.0,
        }
    }
}

/// A 2D drawing surface.
pub trait Canvas {
    /// Backing width in pixels
    fn width(&self) -> u32;

    /// Backing height in pixels
    fn height(&self) -> u32;

    /// Apply the on-screen display size. Does not resize the backing store.
    fn set_display_size(&mut self, size: DisplaySize);

    /// Push the current drawing state.
    fn save(&mut self);

    /// Pop the most recently saved drawing state. No-op on an empty stack.
    fn restore(&mut self);

    fn set_style(&mut self, style: DrawStyle);

    /// Reset a rectangle to fully transparent pixels.
    fn clear_rect(&mut self, x: u32, y: u32, width: u32, height: u32);

    /// Fill a circle with the fill color and outline it with the stroke color.
    fn fill_circle(&mut self, center: (f32, f32), radius: f32);

    /// Stroke a line segment with the stroke color and line width.
    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32));
}

/// Linear interpolation of `value` from `[from_lo, from_hi]` onto `[to_lo, to_hi]`.
///
/// The interpolation parameter is clamped to `[0, 1]`, so the result always lies between
/// `to_lo` and `to_hi`.
pub fn lerp(value: f32, from_lo: f32, from_hi: f32, to_lo: f32, to_hi: f32) -> f32 {
    let t = ((value - from_lo) / (from_hi - from_lo)).clamp(0.0, 1.0);
    t * (to_hi - to_lo) + to_lo
}

/// Point radius of a landmark
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Radius {
    Fixed(f32),
    /// Interpolates the radius from the landmark depth
    Depth {
        near_z: f32,
        far_z: f32,
        near_radius: f32,
        far_radius: f32,
    },
}

impl Radius {
    pub fn for_landmark(&self, landmark: &NormalizedLandmark) -> f32 {
        match *self {
            Radius::Fixed(r) => r,
            Radius::Depth {
                near_z,
                far_z,
                near_radius,
                far_radius,
            } => lerp(landmark.z, near_z, far_z, near_radius, far_radius),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkOptions {
    pub color: Rgba<u8>,
    pub fill_color: Rgba<u8>,
    pub line_width: f32,
    pub radius: Radius,
}

impl Default for LandmarkOptions {
    fn default() -> Self {
        Self {
            color: Rgba([255, 255, 255, 255]),
            fill_color: Rgba([255, 0, 0, 255]),
            line_width: 4.0,
            radius: Radius::Fixed(6.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConnectorOptions {
    pub color: Rgba<u8>,
    pub line_width: f32,
}

impl Default for ConnectorOptions {
    fn default() -> Self {
        Self {
            color: Rgba([255, 255, 255, 255]),
            line_width: 4.0,
        }
    }
}

/// Options for a full pose pass
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PoseStyle {
    pub landmarks: LandmarkOptions,
    pub connectors: ConnectorOptions,
}

impl From<&StyleConfig> for PoseStyle {
    fn from(style: &StyleConfig) -> Self {
        Self {
            landmarks: LandmarkOptions {
                color: Rgba(style.color),
                fill_color: Rgba(style.fill_color),
                line_width: style.line_width,
                radius: Radius::Depth {
                    near_z: style.near_z,
                    far_z: style.far_z,
                    near_radius: style.near_radius,
                    far_radius: style.far_radius,
                },
            },
            connectors: ConnectorOptions {
                color: Rgba(style.color),
                line_width: style.line_width,
            },
        }
    }
}

/// Draws landmark sets onto a canvas.
pub struct DrawingUtils<'a, C: Canvas + ?Sized> {
    canvas: &'a mut C,
}

impl<'a, C: Canvas + ?Sized> DrawingUtils<'a, C> {
    pub fn new(canvas: &'a mut C) -> Self {
        Self { canvas }
    }

    /// Draw every landmark as a filled, outlined point.
    pub fn draw_landmarks(&mut self, landmarks: &[NormalizedLandmark], options: &LandmarkOptions) {
        let (width, height) = (self.canvas.width(), self.canvas.height());
        self.canvas.save();
        self.canvas.set_style(DrawStyle {
            stroke: options.color,
            fill: options.fill_color,
            line_width: options.line_width,
        });
        for landmark in landmarks {
            let radius = options.radius.for_landmark(landmark);
            self.canvas.fill_circle(landmark.to_pixel(width, height), radius);
        }
        self.canvas.restore();
    }

    /// Draw an edge for every connection whose endpoints are both present.
    pub fn draw_connectors(
        &mut self,
        landmarks: &[NormalizedLandmark],
        connections: &[Connection],
        options: &ConnectorOptions,
    ) {
        let (width, height) = (self.canvas.width(), self.canvas.height());
        self.canvas.save();
        self.canvas.set_style(DrawStyle {
            stroke: options.color,
            fill: options.color,
            line_width: options.line_width,
        });
        for &(a, b) in connections {
            if let (Some(from), Some(to)) = (landmarks.get(a), landmarks.get(b)) {
                self.canvas
                    .stroke_line(from.to_pixel(width, height), to.to_pixel(width, height));
            }
        }
        self.canvas.restore();
    }
}

/// Render every subject of `result`: points first, then the skeleton edges.
///
/// Returns the number of subjects drawn.
pub fn draw_pose<C: Canvas + ?Sized>(
    canvas: &mut C,
    result: &PoseLandmarkerResult,
    style: &PoseStyle,
) -> usize {
    let mut utils = DrawingUtils::new(canvas);
    for landmarks in &result.landmarks {
        utils.draw_landmarks(landmarks, &style.landmarks);
        utils.draw_connectors(landmarks, POSE_CONNECTIONS, &style.connectors);
    }
    result.subjects()
}
