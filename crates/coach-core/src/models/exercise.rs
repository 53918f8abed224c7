// ABOUTME: Exercise definitions as delivered by the training plan service
// ABOUTME: Targets, sides, orientation, and the joint motion profile used for rep counting
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::landmark::{BodySide, Joint};
use crate::errors::{AppError, AppResult};
use serde::{Deserialize, Serialize};

/// What completes one set of an exercise
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "value")]
pub enum ExerciseTarget {
    /// Count this many reps
    Reps(u32),
    /// Hold for this many seconds
    DurationSecs(u64),
}

/// Joint angle thresholds that define one rep
///
/// Angles at or below `contracted_deg` are the contracted phase, angles at or
/// above `extended_deg` the extended phase; the band in between never changes phase.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionProfile {
    /// Joint whose angle drives the count
    pub joint: Joint,
    /// Upper bound of the contracted phase
    pub contracted_deg: f32,
    /// Lower bound of the extended phase
    pub extended_deg: f32,
}

impl MotionProfile {
    /// Create a profile
    #[must_use]
    pub const fn new(joint: Joint, contracted_deg: f32, extended_deg: f32) -> Self {
        Self {
            joint,
            contracted_deg,
            extended_deg,
        }
    }

    /// Check that the thresholds leave a hysteresis band inside `[0, 180]`
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the band is empty or out of range
    pub fn validate(&self) -> AppResult<()> {
        if !(0.0..=180.0).contains(&self.contracted_deg)
            || !(0.0..=180.0).contains(&self.extended_deg)
        {
            return Err(AppError::invalid_input(
                "motion thresholds must be within 0-180 degrees",
            ));
        }
        if self.contracted_deg >= self.extended_deg {
            return Err(AppError::invalid_input(
                "contracted threshold must be below extended threshold",
            ));
        }
        Ok(())
    }
}

/// One exercise of a training plan; immutable once a session starts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    /// Plan-assigned identifier
    pub id: String,
    /// Display name
    pub name: String,
    /// Number of sets
    pub sets: u32,
    /// Reps or hold duration per set
    pub target: ExerciseTarget,
    /// Rest between sets in seconds
    pub rest_secs: u64,
    /// Performed lying down, needs the phone in landscape
    pub is_horizontal: bool,
    /// Side the exercise works; one-sided exercises alternate per set
    pub side: BodySide,
    /// Demonstration video
    pub video_url: Option<String>,
    /// Joint thresholds for automatic rep counting
    #[serde(default)]
    pub motion: Option<MotionProfile>,
}

impl Exercise {
    /// Target reps, when this is a rep-based exercise
    #[must_use]
    pub const fn target_reps(&self) -> Option<u32> {
        match self.target {
            ExerciseTarget::Reps(reps) => Some(reps),
            ExerciseTarget::DurationSecs(_) => None,
        }
    }

    /// Hold duration, when this is a duration-based exercise
    #[must_use]
    pub const fn duration_secs(&self) -> Option<u64> {
        match self.target {
            ExerciseTarget::Reps(_) => None,
            ExerciseTarget::DurationSecs(secs) => Some(secs),
        }
    }

    /// Validate the definition before a session uses it
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` for zero sets, a zero target, or a bad motion profile
    pub fn validate(&self) -> AppResult<()> {
        if self.sets == 0 {
            return Err(AppError::invalid_input(format!(
                "exercise {} has no sets",
                self.id
            )));
        }
        match self.target {
            ExerciseTarget::Reps(0) | ExerciseTarget::DurationSecs(0) => {
                return Err(AppError::invalid_input(format!(
                    "exercise {} has an empty target",
                    self.id
                )));
            }
            _ => {}
        }
        if let Some(motion) = &self.motion {
            motion.validate()?;
        }
        Ok(())
    }
}
