//! RGBA raster canvas

use super::{Canvas, DrawStyle};
use crate::config::DisplaySize;
use crate::error::VisionError;
use image::{imageops, Rgba, RgbaImage};
use imageproc::drawing::{
    draw_filled_circle_mut, draw_hollow_circle_mut, draw_line_segment_mut, draw_polygon_mut,
};
use imageproc::point::Point;
use std::path::Path;

const TRANSPARENT: Rgba<u8> = Rgba([0, 0, 0, 0]);

/// Canvas backed by an in-memory RGBA image. Starts fully transparent.
#[derive(Debug, Clone)]
pub struct RasterCanvas {
    pixels: RgbaImage,
    style: DrawStyle,
    saved: Vec<DrawStyle>,
    display: Option<DisplaySize>,
}

impl RasterCanvas {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, TRANSPARENT),
            style: DrawStyle::default(),
            saved: Vec::new(),
            display: None,
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.pixels
    }

    pub fn into_image(self) -> RgbaImage {
        self.pixels
    }

    pub fn style(&self) -> DrawStyle {
        self.style
    }

    /// Number of saved states not yet restored
    pub fn saved_depth(&self) -> usize {
        self.saved.len()
    }

    pub fn display_size(&self) -> Option<DisplaySize> {
        self.display
    }

    /// Whether any pixel has been drawn since the last clear
    pub fn is_blank(&self) -> bool {
        self.pixels.pixels().all(|p| p[3] == 0)
    }

    /// Layer this canvas over `base`, anchored at the top-left corner.
    pub fn composite_over(&self, base: &RgbaImage) -> RgbaImage {
        let mut out = base.clone();
        imageops::overlay(&mut out, &self.pixels, 0, 0);
        out
    }

    pub fn save_png(&self, path: impl AsRef<Path>) -> Result<(), VisionError> {
        self.pixels.save(path)?;
        Ok(())
    }

    fn thick_line(&mut self, from: (f32, f32), to: (f32, f32), width: f32) {
        let (dx, dy) = (to.0 - from.0, to.1 - from.1);
        let len = (dx * dx + dy * dy).sqrt();
        let half = width / 2.0;
        if len > f32::EPSILON {
            let (nx, ny) = (-dy / len * half, dx / len * half);
            let corner = |x: f32, y: f32| Point::new(x.round() as i32, y.round() as i32);
            let quad = [
                corner(from.0 + nx, from.1 + ny),
                corner(to.0 + nx, to.1 + ny),
                corner(to.0 - nx, to.1 - ny),
                corner(from.0 - nx, from.1 - ny),
            ];
            // imageproc rejects polygons whose first and last points coincide
            if quad[0] != quad[3] {
                draw_polygon_mut(&mut self.pixels, &quad, self.style.stroke);
            } else {
                draw_line_segment_mut(&mut self.pixels, from, to, self.style.stroke);
            }
        }
        let cap = half.round() as i32;
        for end in [from, to] {
            draw_filled_circle_mut(
                &mut self.pixels,
                (end.0.round() as i32, end.1.round() as i32),
                cap,
                self.style.stroke,
            );
        }
    }
}

impl Canvas for RasterCanvas {
    fn width(&self) -> u32 {
        self.pixels.width()
    }

    fn height(&self) -> u32 {
        self.pixels.height()
    }

    fn set_display_size(&mut self, size: DisplaySize) {
        self.display = Some(size);
    }

    fn save(&mut self) {
        self.saved.push(self.style);
    }

    fn restore(&mut self) {
        if let Some(style) = self.saved.pop() {
            self.style = style;
        }
    }

    fn set_style(&mut self, style: DrawStyle) {
        self.style = style;
    }

    fn clear_rect(&mut self, x: u32, y: u32, width: u32, height: u32) {
        let (canvas_width, canvas_height) = self.pixels.dimensions();
        let x_end = x.saturating_add(width).min(canvas_width);
        let y_end = y.saturating_add(height).min(canvas_height);
        let samples: &mut [u8] = &mut self.pixels;
        if x == 0 && y == 0 && x_end == canvas_width && y_end == canvas_height {
            samples.fill(0);
            return;
        }
        if x >= x_end {
            return;
        }
        let row_len = (x_end - x) as usize * 4;
        for py in y..y_end {
            let start = (py as usize * canvas_width as usize + x as usize) * 4;
            samples[start..start + row_len].fill(0);
        }
    }

    fn fill_circle(&mut self, center: (f32, f32), radius: f32) {
        if !(radius > 0.0) || !center.0.is_finite() || !center.1.is_finite() {
            return;
        }
        let c = (center.0.round() as i32, center.1.round() as i32);
        let r = radius.round().max(1.0) as i32;
        draw_filled_circle_mut(&mut self.pixels, c, r, self.style.fill);
        draw_hollow_circle_mut(&mut self.pixels, c, r, self.style.stroke);
    }

    fn stroke_line(&mut self, from: (f32, f32), to: (f32, f32)) {
        if !(from.0.is_finite() && from.1.is_finite() && to.0.is_finite() && to.1.is_finite()) {
            return;
        }
        if self.style.line_width <= 1.5 {
            draw_line_segment_mut(&mut self.pixels, from, to, self.style.stroke);
        } else {
            self.thick_line(from, to, self.style.line_width);
        }
    }
}
