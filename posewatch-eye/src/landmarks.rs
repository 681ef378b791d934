//! Pose landmark types returned by the vision engine

use serde::{Deserialize, Serialize};

/// Number of landmarks in one pose landmark set.
pub const POSE_LANDMARK_COUNT: usize = 33;

/// A single landmark in normalized image coordinates.
///
/// `x` and `y` are in `[0, 1]` relative to the image width and height. `z` is the depth
/// relative to the midpoint of the hips; smaller values are closer to the camera.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct NormalizedLandmark {
    pub x: f32,
    pub y: f32,
    pub z: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visibility: Option<f32>,
}

impl NormalizedLandmark {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x,
            y,
            z,
            visibility: None,
        }
    }

    /// Maps the landmark onto a surface of `width` x `height` pixels.
    pub fn to_pixel(&self, width: u32, height: u32) -> (f32, f32) {
        (self.x * width as f32, self.y * height as f32)
    }
}

/// Ordered landmarks of one detected subject.
pub type LandmarkSet = Vec<NormalizedLandmark>;

/// Result of one detection pass: one landmark set per detected subject.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseLandmarkerResult {
    #[serde(default)]
    pub landmarks: Vec<LandmarkSet>,
}

impl PoseLandmarkerResult {
    pub fn new(landmarks: Vec<LandmarkSet>) -> Self {
        Self { landmarks }
    }

    /// Number of detected subjects.
    pub fn subjects(&self) -> usize {
        self.landmarks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }

    /// Keeps at most `max` subjects, in engine order.
    pub fn truncate(&mut self, max: usize) {
        self.landmarks.truncate(max);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LandmarkIdx {
    Nose = 0,
    LeftEyeInner = 1,
    LeftEye = 2,
    LeftEyeOuter = 3,
    RightEyeInner = 4,
    RightEye = 5,
    RightEyeOuter = 6,
    LeftEar = 7,
    RightEar = 8,
    MouthLeft = 9,
    MouthRight = 10,
    LeftShoulder = 11,
    RightShoulder = 12,
    LeftElbow = 13,
    RightElbow = 14,
    LeftWrist = 15,
    RightWrist = 16,
    LeftPinky = 17,
    RightPinky = 18,
    LeftIndex = 19,
    RightIndex = 20,
    LeftThumb = 21,
    RightThumb = 22,
    LeftHip = 23,
    RightHip = 24,
    LeftKnee = 25,
    RightKnee = 26,
    LeftAnkle = 27,
    RightAnkle = 28,
    LeftHeel = 29,
    RightHeel = 30,
    LeftFootIndex = 31,
    RightFootIndex = 32,
}

/// A directed edge between two landmark indices.
pub type Connection = (usize, usize);

/// Skeleton edges of the pose model.
pub const POSE_CONNECTIONS: &[Connection] = &[
    (0, 1),
    (1, 2),
    (2, 3),
    (3, 7),
    (0, 4),
    (4, 5),
    (5, 6),
    (6, 8),
    (9, 10),
    (11, 12),
    (11, 13),
    (13, 15),
    (15, 17),
    (15, 19),
    (15, 21),
    (17, 19),
    (12, 14),
    (14, 16),
    (16, 18),
    (16, 20),
    (16, 22),
    (18, 20),
    (11, 23),
    (12, 24),
    (23, 24),
    (23, 25),
    (24, 26),
    (25, 27),
    (26, 28),
    (27, 29),
    (28, 30),
    (29, 31),
    (30, 32),
    (27, 31),
    (28, 32),
];
