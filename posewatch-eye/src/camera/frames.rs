//! Camera backend that plays a directory of image files as a live stream

use super::{CameraBackend, StreamConstraints, VideoStream};
use crate::config::DisplaySize;
use crate::error::VisionError;
use async_trait::async_trait;
use image::RgbaImage;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

const FRAME_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Plays the images of a directory, in file name order, at a fixed frame rate.
///
/// The stream loops forever. Its clock follows wall time, so the current time only changes
/// at frame boundaries, the way a video element's current time does.
pub struct FrameDirectoryCamera {
    dir: PathBuf,
    frames_per_second: u32,
}

impl FrameDirectoryCamera {
    pub fn new(dir: impl AsRef<Path>, frames_per_second: u32) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            frames_per_second: frames_per_second.max(1),
        }
    }

    fn frame_paths(dir: &Path) -> Result<Vec<PathBuf>, VisionError> {
        let mut paths = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let path = entry?.path();
            let is_frame = path
                .extension()
                .and_then(|e| e.to_str())
                .map(|e| FRAME_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if path.is_file() && is_frame {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }
}

#[async_trait]
impl CameraBackend for FrameDirectoryCamera {
    fn is_supported(&self) -> bool {
        self.dir.is_dir()
    }

    async fn open_stream(
        &self,
        constraints: &StreamConstraints,
    ) -> Result<Box<dyn VideoStream>, VisionError> {
        if !constraints.video {
            return Err(VisionError::Camera("No video track requested".to_string()));
        }

        let dir = self.dir.clone();
        let frames = tokio::task::spawn_blocking(move || -> Result<Vec<Arc<RgbaImage>>, VisionError> {
            let mut frames = Vec::new();
            for path in FrameDirectoryCamera::frame_paths(&dir)? {
                match image::open(&path) {
                    Ok(img) => frames.push(Arc::new(img.to_rgba8())),
                    Err(e) => warn!("Skipping unreadable frame {:?}: {}", path, e),
                }
            }
            Ok(frames)
        })
        .await??;

        if frames.is_empty() {
            return Err(VisionError::StreamDenied(format!(
                "No readable frames in {:?}",
                self.dir
            )));
        }

        info!(
            "Camera stream opened: {} frames from {:?} at {} fps",
            frames.len(),
            self.dir,
            self.frames_per_second
        );
        Ok(Box::new(FrameDirectoryStream::new(frames, self.frames_per_second)))
    }
}

/// Stream over decoded frames
pub struct FrameDirectoryStream {
    frames: Vec<Arc<RgbaImage>>,
    frames_per_second: u32,
    started: Instant,
    display: Option<DisplaySize>,
}

impl FrameDirectoryStream {
    fn new(frames: Vec<Arc<RgbaImage>>, frames_per_second: u32) -> Self {
        Self {
            frames,
            frames_per_second,
            started: Instant::now(),
            display: None,
        }
    }

    fn frame_index(&self) -> u64 {
        (self.started.elapsed().as_secs_f64() * self.frames_per_second as f64).floor() as u64
    }

    pub fn display_size(&self) -> Option<DisplaySize> {
        self.display
    }
}

impl VideoStream for FrameDirectoryStream {
    fn current_time(&self) -> f64 {
        self.frame_index() as f64 / self.frames_per_second as f64
    }

    fn current_frame(&self) -> Arc<RgbaImage> {
        let index = (self.frame_index() % self.frames.len() as u64) as usize;
        self.frames[index].clone()
    }

    fn set_display_size(&mut self, size: DisplaySize) {
        self.display = Some(size);
    }
}
