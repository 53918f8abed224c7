// ABOUTME: Skeletal landmark value types and the 33-point anatomical index table
// ABOUTME: PoseFrame is the per-tick landmark set shared by every stream consumer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::detection::{LANDMARK_COUNT, MIN_VISIBILITY};
use serde::{Deserialize, Serialize};

/// A single tracked body point in normalized image coordinates
///
/// `x` and `y` are in `[0, 1]`; `z` is depth relative to the hips, negative
/// values are closer to the camera. `visibility` is the model confidence.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    /// Horizontal position
    pub x: f32,
    /// Vertical position
    pub y: f32,
    /// Depth relative to the hip midpoint
    pub z: f32,
    /// Detection confidence in `[0, 1]`
    pub visibility: f32,
}

impl Landmark {
    /// Create a landmark
    #[must_use]
    pub const fn new(x: f32, y: f32, z: f32, visibility: f32) -> Self {
        Self { x, y, z, visibility }
    }

    /// A landmark is usable when its visibility reaches the threshold
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.visibility >= MIN_VISIBILITY
    }
}

/// Anatomical index table of the 33-point pose model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
#[allow(missing_docs)]
pub enum BodyLandmark {
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

impl BodyLandmark {
    /// All landmarks in index order
    pub const ALL: [Self; LANDMARK_COUNT] = [
        Self::Nose,
        Self::LeftEyeInner,
        Self::LeftEye,
        Self::LeftEyeOuter,
        Self::RightEyeInner,
        Self::RightEye,
        Self::RightEyeOuter,
        Self::LeftEar,
        Self::RightEar,
        Self::MouthLeft,
        Self::MouthRight,
        Self::LeftShoulder,
        Self::RightShoulder,
        Self::LeftElbow,
        Self::RightElbow,
        Self::LeftWrist,
        Self::RightWrist,
        Self::LeftPinky,
        Self::RightPinky,
        Self::LeftIndex,
        Self::RightIndex,
        Self::LeftThumb,
        Self::RightThumb,
        Self::LeftHip,
        Self::RightHip,
        Self::LeftKnee,
        Self::RightKnee,
        Self::LeftAnkle,
        Self::RightAnkle,
        Self::LeftHeel,
        Self::RightHeel,
        Self::LeftFootIndex,
        Self::RightFootIndex,
    ];

    /// Position of this landmark in a model output
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Look up a landmark by model output position
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Body side an exercise or joint refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BodySide {
    /// Left side of the body
    Left,
    /// Right side of the body
    Right,
    /// Both sides together
    Both,
}

impl BodySide {
    /// The other side; `Both` stays `Both`
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
            Self::Both => Self::Both,
        }
    }
}

/// Joints whose flexion angle can drive rep counting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Joint {
    /// Shoulder-elbow-wrist
    Elbow,
    /// Hip-shoulder-elbow
    Shoulder,
    /// Shoulder-hip-knee
    Hip,
    /// Hip-knee-ankle
    Knee,
}

impl Joint {
    /// The three landmarks (outer, vertex, outer) of this joint on one side
    ///
    /// Returns `None` for [`BodySide::Both`]; callers resolve each side separately.
    #[must_use]
    pub const fn triple(self, side: BodySide) -> Option<[BodyLandmark; 3]> {
        use BodyLandmark as L;
        let triple = match (self, side) {
            (_, BodySide::Both) => return None,
            (Self::Elbow, BodySide::Left) => [L::LeftShoulder, L::LeftElbow, L::LeftWrist],
            (Self::Elbow, BodySide::Right) => [L::RightShoulder, L::RightElbow, L::RightWrist],
            (Self::Shoulder, BodySide::Left) => [L::LeftHip, L::LeftShoulder, L::LeftElbow],
            (Self::Shoulder, BodySide::Right) => [L::RightHip, L::RightShoulder, L::RightElbow],
            (Self::Hip, BodySide::Left) => [L::LeftShoulder, L::LeftHip, L::LeftKnee],
            (Self::Hip, BodySide::Right) => [L::RightShoulder, L::RightHip, L::RightKnee],
            (Self::Knee, BodySide::Left) => [L::LeftHip, L::LeftKnee, L::LeftAnkle],
            (Self::Knee, BodySide::Right) => [L::RightHip, L::RightKnee, L::RightAnkle],
        };
        Some(triple)
    }
}

/// The full landmark set produced by one inference pass over one camera frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    /// Landmarks indexed by [`BodyLandmark::index`]
    pub landmarks: Vec<Landmark>,
    /// Capture time in milliseconds on the camera's monotonic clock
    pub timestamp_ms: u64,
}

impl PoseFrame {
    /// Create a frame from model output
    #[must_use]
    pub const fn new(landmarks: Vec<Landmark>, timestamp_ms: u64) -> Self {
        Self {
            landmarks,
            timestamp_ms,
        }
    }

    /// Landmark at an anatomical position, if the model produced it
    #[must_use]
    pub fn landmark(&self, which: BodyLandmark) -> Option<&Landmark> {
        self.landmarks.get(which.index())
    }

    /// Landmark at an anatomical position only when it is valid
    #[must_use]
    pub fn valid_landmark(&self, which: BodyLandmark) -> Option<&Landmark> {
        self.landmark(which).filter(|lm| lm.is_valid())
    }

    /// Number of landmarks meeting the visibility threshold
    #[must_use]
    pub fn valid_count(&self) -> usize {
        self.landmarks.iter().filter(|lm| lm.is_valid()).count()
    }

    /// Whether the frame carries no landmarks at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.landmarks.is_empty()
    }
}
