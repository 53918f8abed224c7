// ABOUTME: Nested onboarding sub-machine run before the first set and on orientation changes
// ABOUTME: Sound check, camera permission, rotation, position alignment, and level checks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::config::AnalysisConfig;
use crate::external::PermissionStatus;
use coach_core::errors::{AppError, AppResult};
use coach_core::models::{Exercise, OnboardingStep, PoseFrame};
use coach_vision::{
    AlignmentDetector, AlignmentUpdate, DeviceOrientation, GyroReading, LevelDetector, Silhouette,
};
use tracing::{debug, info};

/// Which steps the sub-machine runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingMode {
    /// Every step, starting at the sound check
    Full,
    /// Rotation, position, and level only; used when the next exercise changes orientation
    Reorientation,
}

/// Onboarding state for one exercise
#[derive(Debug, Clone)]
pub struct Onboarding {
    mode: OnboardingMode,
    step: OnboardingStep,
    orientation: DeviceOrientation,
    alignment: AlignmentDetector,
    level: LevelDetector,
}

impl Onboarding {
    fn build(
        mode: OnboardingMode,
        step: OnboardingStep,
        exercise: &Exercise,
        analysis: &AnalysisConfig,
    ) -> Self {
        let orientation = DeviceOrientation::for_exercise(exercise.is_horizontal);
        Self {
            mode,
            step,
            orientation,
            alignment: AlignmentDetector::new(Silhouette::FullBody, analysis.alignment_hold_ms),
            level: LevelDetector::new(
                orientation,
                analysis.level_tolerance_deg,
                analysis.level_hold_ms,
            ),
        }
    }

    /// Full onboarding for the first exercise
    #[must_use]
    pub fn full(exercise: &Exercise, analysis: &AnalysisConfig) -> Self {
        Self::build(
            OnboardingMode::Full,
            OnboardingStep::SoundCheck,
            exercise,
            analysis,
        )
    }

    /// Re-run the physical setup for an exercise with a different orientation
    #[must_use]
    pub fn reorientation(exercise: &Exercise, analysis: &AnalysisConfig) -> Self {
        Self::build(
            OnboardingMode::Reorientation,
            OnboardingStep::RotatePhone,
            exercise,
            analysis,
        )
    }

    /// Current step
    #[must_use]
    pub const fn step(&self) -> OnboardingStep {
        self.step
    }

    /// Which steps are run
    #[must_use]
    pub const fn mode(&self) -> OnboardingMode {
        self.mode
    }

    /// Orientation the exercise needs
    #[must_use]
    pub const fn orientation(&self) -> DeviceOrientation {
        self.orientation
    }

    /// Onboarding is over; the machine moves on to the countdown
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.step == OnboardingStep::ResumeToExercise
    }

    /// Only the position check consumes pose frames
    #[must_use]
    pub fn wants_frames(&self) -> bool {
        self.step == OnboardingStep::PhonePosition
    }

    /// Whether the user currently fills the silhouette
    #[must_use]
    pub const fn is_aligned(&self) -> bool {
        self.alignment.is_aligned()
    }

    fn advance_to(&mut self, step: OnboardingStep) -> OnboardingStep {
        info!(from = %self.step, to = %step, "Onboarding step changed");
        self.step = step;
        match step {
            OnboardingStep::PhonePosition => self.alignment.reset(),
            OnboardingStep::GyroscopeLevel => self.level.expect(self.orientation),
            _ => {}
        }
        step
    }

    fn expect_step(&self, expected: OnboardingStep, action: &str) -> AppResult<()> {
        if self.step == expected {
            Ok(())
        } else {
            Err(AppError::invalid_transition(action, self.step))
        }
    }

    /// The user heard the test sound
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside the sound check
    pub fn confirm_sound_check(&mut self) -> AppResult<OnboardingStep> {
        self.expect_step(OnboardingStep::SoundCheck, "confirm sound check")?;
        Ok(self.advance_to(OnboardingStep::CameraPermission))
    }

    /// Apply the camera permission result; a denial keeps the step
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside the permission step
    pub fn on_camera_permission(
        &mut self,
        status: PermissionStatus,
    ) -> AppResult<Option<OnboardingStep>> {
        self.expect_step(OnboardingStep::CameraPermission, "apply camera permission")?;
        if !status.is_granted() {
            debug!("Camera permission denied; staying on permission step");
            return Ok(None);
        }
        let next = if self.orientation == DeviceOrientation::Landscape {
            OnboardingStep::RotatePhone
        } else {
            OnboardingStep::PhonePosition
        };
        Ok(Some(self.advance_to(next)))
    }

    /// Feed a gyroscope reading to the rotation or level step
    pub fn on_gyro_reading(&mut self, reading: &GyroReading) -> Option<OnboardingStep> {
        match self.step {
            OnboardingStep::RotatePhone if reading.orientation() == self.orientation => {
                Some(self.advance_to(OnboardingStep::PhonePosition))
            }
            OnboardingStep::GyroscopeLevel if self.level.on_reading(reading) => {
                Some(self.advance_to(OnboardingStep::ResumeToExercise))
            }
            _ => None,
        }
    }

    /// Feed a pose frame to the position step
    pub fn on_pose_frame(&mut self, frame: &PoseFrame) -> (AlignmentUpdate, Option<OnboardingStep>) {
        if self.step != OnboardingStep::PhonePosition {
            return (AlignmentUpdate::default(), None);
        }
        let update = self.alignment.on_pose_frame(frame);
        let advanced = update
            .confirmed
            .then(|| self.advance_to(OnboardingStep::GyroscopeLevel));
        (update, advanced)
    }
}
