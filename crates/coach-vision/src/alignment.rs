// ABOUTME: Silhouette alignment detection shared by onboarding and photo capture
// ABOUTME: Aligned when every required landmark is valid; confirmed after a latched hold
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::hold::HoldLatch;
use coach_core::models::{BodyLandmark, PhotoSide, PoseFrame};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Target body outline the user must fill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Silhouette {
    /// Whole body facing toward or away from the camera
    FullBody,
    /// Left side of the body toward the camera
    LeftProfile,
    /// Right side of the body toward the camera
    RightProfile,
}

const FULL_BODY: &[BodyLandmark] = &[
    BodyLandmark::LeftShoulder,
    BodyLandmark::RightShoulder,
    BodyLandmark::LeftHip,
    BodyLandmark::RightHip,
    BodyLandmark::LeftKnee,
    BodyLandmark::RightKnee,
    BodyLandmark::LeftAnkle,
    BodyLandmark::RightAnkle,
];

const LEFT_PROFILE: &[BodyLandmark] = &[
    BodyLandmark::LeftEar,
    BodyLandmark::LeftShoulder,
    BodyLandmark::LeftHip,
    BodyLandmark::LeftKnee,
    BodyLandmark::LeftAnkle,
];

const RIGHT_PROFILE: &[BodyLandmark] = &[
    BodyLandmark::RightEar,
    BodyLandmark::RightShoulder,
    BodyLandmark::RightHip,
    BodyLandmark::RightKnee,
    BodyLandmark::RightAnkle,
];

impl Silhouette {
    /// Landmarks that must all be valid for the silhouette to be filled
    #[must_use]
    pub const fn required_landmarks(self) -> &'static [BodyLandmark] {
        match self {
            Self::FullBody => FULL_BODY,
            Self::LeftProfile => LEFT_PROFILE,
            Self::RightProfile => RIGHT_PROFILE,
        }
    }

    /// Silhouette used when photographing a given side
    #[must_use]
    pub const fn for_photo_side(side: PhotoSide) -> Self {
        match side {
            PhotoSide::Front | PhotoSide::Back => Self::FullBody,
            PhotoSide::Left => Self::LeftProfile,
            PhotoSide::Right => Self::RightProfile,
        }
    }

    /// Whether every required landmark of the frame is valid
    #[must_use]
    pub fn is_filled_by(self, frame: &PoseFrame) -> bool {
        self.required_landmarks()
            .iter()
            .all(|which| frame.valid_landmark(*which).is_some())
    }
}

/// Result of feeding one frame to the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AlignmentUpdate {
    /// Silhouette filled on this frame
    pub aligned: bool,
    /// This frame confirmed the current aligned window
    pub confirmed: bool,
}

/// Alignment detector with hold-time confirmation
#[derive(Debug, Clone)]
pub struct AlignmentDetector {
    silhouette: Silhouette,
    latch: HoldLatch,
    aligned: bool,
}

impl AlignmentDetector {
    /// Create a detector for a silhouette
    #[must_use]
    pub const fn new(silhouette: Silhouette, hold_ms: u64) -> Self {
        Self {
            silhouette,
            latch: HoldLatch::new(hold_ms),
            aligned: false,
        }
    }

    /// Active silhouette
    #[must_use]
    pub const fn silhouette(&self) -> Silhouette {
        self.silhouette
    }

    /// Switch target silhouette; starts a new alignment session
    pub fn set_silhouette(&mut self, silhouette: Silhouette) {
        self.silhouette = silhouette;
        self.reset();
    }

    /// Forget any partial or confirmed alignment
    pub fn reset(&mut self) {
        self.latch.reset();
        self.aligned = false;
    }

    /// Aligned on the most recent frame
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.aligned
    }

    /// Current aligned window has been confirmed
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.latch.is_confirmed()
    }

    /// Feed one frame
    pub fn on_pose_frame(&mut self, frame: &PoseFrame) -> AlignmentUpdate {
        let aligned = self.silhouette.is_filled_by(frame);
        if aligned != self.aligned {
            debug!(silhouette = ?self.silhouette, aligned, "Alignment changed");
        }
        self.aligned = aligned;
        let confirmed = self.latch.update(aligned, frame.timestamp_ms);
        if confirmed {
            debug!(silhouette = ?self.silhouette, "Alignment confirmed");
        }
        AlignmentUpdate { aligned, confirmed }
    }
}
