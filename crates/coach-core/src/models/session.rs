// ABOUTME: Training session aggregate, phase enums, and the end-of-session report
// ABOUTME: The session run state has exactly one writer: the session state machine
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::exercise::Exercise;
use super::landmark::BodySide;
use crate::errors::{AppError, AppResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Session definition returned by the training plan service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlan {
    /// Server-side session identifier used for result submission
    pub session_id: String,
    /// Exercises in execution order
    pub exercises: Vec<Exercise>,
}

/// Top-level phase of a training session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Plan overview before the session starts
    Info,
    /// Device and camera checks
    Onboarding,
    /// Countdown before a set
    ExerciseCountdown,
    /// A set is in progress
    ExerciseRunning,
    /// Rest between sets
    Rest,
    /// Switching to the other side of a one-sided exercise
    SideSwitch,
    /// Preview of the next exercise
    Transition,
    /// All exercises done
    Finished,
    /// Summary screen
    Report,
    /// Detailed analytics screen
    Analytics,
    /// Timers frozen, camera released
    Paused,
    /// Session torn down
    Stopped,
}

impl SessionStatus {
    /// Phases in which the user is actively training and may pause or stop
    #[must_use]
    pub const fn is_running_phase(self) -> bool {
        matches!(
            self,
            Self::Onboarding
                | Self::ExerciseCountdown
                | Self::ExerciseRunning
                | Self::Rest
                | Self::SideSwitch
                | Self::Transition
        )
    }

    /// Phases after which rep counting never resumes
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Finished | Self::Report | Self::Analytics | Self::Stopped
        )
    }

    /// Snake-case name used in logs and projections
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Onboarding => "onboarding",
            Self::ExerciseCountdown => "exercise_countdown",
            Self::ExerciseRunning => "exercise_running",
            Self::Rest => "rest",
            Self::SideSwitch => "side_switch",
            Self::Transition => "transition",
            Self::Finished => "finished",
            Self::Report => "report",
            Self::Analytics => "analytics",
            Self::Paused => "paused",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Step of the onboarding sub-machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStep {
    /// User confirms audio is audible
    SoundCheck,
    /// Camera permission request
    CameraPermission,
    /// Rotate to landscape for horizontal exercises
    RotatePhone,
    /// Place the phone so the whole body is in frame
    PhonePosition,
    /// Phone held upright and still
    GyroscopeLevel,
    /// Checks passed, returning to the exercise
    ResumeToExercise,
}

impl fmt::Display for OnboardingStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::SoundCheck => "sound_check",
            Self::CameraPermission => "camera_permission",
            Self::RotatePhone => "rotate_phone",
            Self::PhonePosition => "phone_position",
            Self::GyroscopeLevel => "gyroscope_level",
            Self::ResumeToExercise => "resume_to_exercise",
        };
        f.write_str(name)
    }
}

/// Recorded outcome of one exercise
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExerciseProgress {
    /// Reps achieved in each finished set
    pub reps_per_set: Vec<u32>,
    /// Form advisories raised while the exercise ran
    pub form_errors: u32,
    /// Every set finished
    pub completed: bool,
}

/// Where the session goes after a set finishes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetOutcome {
    /// More sets of the same exercise remain
    NextSet,
    /// The exercise is done and another follows
    NextExercise,
    /// The last set of the last exercise is done
    SessionComplete,
}

/// A training session: the plan plus its mutable run state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSession {
    /// Server-side session identifier
    pub session_id: String,
    /// User running the session
    pub user_id: String,
    /// Exercises in execution order
    exercises: Vec<Exercise>,
    /// Per-exercise results, parallel to `exercises`
    progress: Vec<ExerciseProgress>,
    current_exercise: usize,
    current_set: u32,
    current_reps: u32,
    active_side: BodySide,
    elapsed_ms: u64,
    active_ms: u64,
    calories: f64,
    /// When the session was created
    pub started_at: DateTime<Utc>,
}

impl TrainingSession {
    /// Create a session from a plan
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` when the plan is empty or an exercise is malformed
    pub fn new(plan: TrainingPlan, user_id: impl Into<String>) -> AppResult<Self> {
        if plan.exercises.is_empty() {
            return Err(AppError::invalid_input("training plan has no exercises"));
        }
        for exercise in &plan.exercises {
            exercise.validate()?;
        }
        let active_side = plan.exercises[0].side;
        let progress = vec![ExerciseProgress::default(); plan.exercises.len()];
        Ok(Self {
            session_id: plan.session_id,
            user_id: user_id.into(),
            exercises: plan.exercises,
            progress,
            current_exercise: 0,
            current_set: 1,
            current_reps: 0,
            active_side,
            elapsed_ms: 0,
            active_ms: 0,
            calories: 0.0,
            started_at: Utc::now(),
        })
    }

    /// All exercises of the plan
    #[must_use]
    pub fn exercises(&self) -> &[Exercise] {
        &self.exercises
    }

    /// The exercise currently in progress
    #[must_use]
    pub fn current_exercise(&self) -> &Exercise {
        &self.exercises[self.current_exercise]
    }

    /// The exercise after the current one
    #[must_use]
    pub fn next_exercise(&self) -> Option<&Exercise> {
        self.exercises.get(self.current_exercise + 1)
    }

    /// Zero-based index of the current exercise
    #[must_use]
    pub const fn current_exercise_index(&self) -> usize {
        self.current_exercise
    }

    /// One-based set number
    #[must_use]
    pub const fn current_set(&self) -> u32 {
        self.current_set
    }

    /// Reps counted in the current set
    #[must_use]
    pub const fn current_reps(&self) -> u32 {
        self.current_reps
    }

    /// Side currently being trained
    #[must_use]
    pub const fn active_side(&self) -> BodySide {
        self.active_side
    }

    /// Whole seconds since the workout began, excluding pauses
    #[must_use]
    pub const fn elapsed_secs(&self) -> u64 {
        self.elapsed_ms / 1000
    }

    /// Elapsed time in milliseconds
    #[must_use]
    pub const fn elapsed_ms(&self) -> u64 {
        self.elapsed_ms
    }

    /// Whole seconds spent in running sets
    #[must_use]
    pub const fn active_secs(&self) -> u64 {
        self.active_ms / 1000
    }

    /// Estimated calories burned
    #[must_use]
    pub const fn calories(&self) -> f64 {
        self.calories
    }

    /// Per-exercise results
    #[must_use]
    pub fn progress(&self) -> &[ExerciseProgress] {
        &self.progress
    }

    /// Share of exercises fully completed
    #[must_use]
    pub fn completion_ratio(&self) -> f64 {
        let completed = self.progress.iter().filter(|p| p.completed).count();
        completed as f64 / self.exercises.len() as f64
    }

    /// Set the rep count of the current set
    ///
    /// Counts never go down within a set.
    pub fn set_reps(&mut self, reps: u32) {
        self.current_reps = self.current_reps.max(reps);
    }

    /// Count a form advisory against the current exercise
    pub fn record_form_error(&mut self) {
        self.progress[self.current_exercise].form_errors += 1;
    }

    /// Add wall time to the elapsed clock
    pub fn add_elapsed(&mut self, millis: u64) {
        self.elapsed_ms += millis;
    }

    /// Add time spent in a running set and update the calorie estimate
    pub fn add_active(&mut self, millis: u64, kcal_per_minute: f64) {
        self.active_ms += millis;
        self.calories = self.active_ms as f64 / 60_000.0 * kcal_per_minute;
    }

    /// Record the finished set and report what follows
    pub fn complete_set(&mut self) -> SetOutcome {
        let sets = self.current_exercise().sets;
        let progress = &mut self.progress[self.current_exercise];
        progress.reps_per_set.push(self.current_reps);

        if self.current_set < sets {
            return SetOutcome::NextSet;
        }
        progress.completed = true;
        if self.current_exercise + 1 < self.exercises.len() {
            SetOutcome::NextExercise
        } else {
            SetOutcome::SessionComplete
        }
    }

    /// Move to the next set, switching sides for one-sided exercises
    pub fn advance_set(&mut self) {
        self.current_set += 1;
        self.current_reps = 0;
        self.active_side = self.active_side.opposite();
    }

    /// Move to the first set of the next exercise
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` when the current exercise is the last one
    pub fn advance_exercise(&mut self) -> AppResult<()> {
        if self.current_exercise + 1 >= self.exercises.len() {
            return Err(AppError::invalid_transition(
                "advance exercise",
                "last exercise",
            ));
        }
        self.current_exercise += 1;
        self.current_set = 1;
        self.current_reps = 0;
        self.active_side = self.exercises[self.current_exercise].side;
        Ok(())
    }

    /// Summarize the session
    #[must_use]
    pub fn report(&self) -> SessionReport {
        let exercises = self
            .exercises
            .iter()
            .zip(&self.progress)
            .map(|(exercise, progress)| ExerciseReport {
                exercise_id: exercise.id.clone(),
                name: exercise.name.clone(),
                reps_per_set: progress.reps_per_set.clone(),
                total_reps: progress.reps_per_set.iter().sum(),
                form_errors: progress.form_errors,
                completed: progress.completed,
            })
            .collect();
        SessionReport {
            session_id: self.session_id.clone(),
            exercises,
            elapsed_secs: self.elapsed_secs(),
            active_secs: self.active_secs(),
            calories: self.calories,
            completion_ratio: self.completion_ratio(),
        }
    }
}

/// Per-exercise line of a session report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseReport {
    /// Exercise identifier
    pub exercise_id: String,
    /// Exercise display name
    pub name: String,
    /// Reps achieved per set
    pub reps_per_set: Vec<u32>,
    /// Sum of reps over all sets
    pub total_reps: u32,
    /// Form advisories raised
    pub form_errors: u32,
    /// Every set finished
    pub completed: bool,
}

/// End-of-session summary handed to the report and analytics screens
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionReport {
    /// Server-side session identifier
    pub session_id: String,
    /// Per-exercise results in plan order
    pub exercises: Vec<ExerciseReport>,
    /// Wall time excluding pauses
    pub elapsed_secs: u64,
    /// Time spent in running sets
    pub active_secs: u64,
    /// Estimated calories burned
    pub calories: f64,
    /// Share of exercises completed
    pub completion_ratio: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::exercise::ExerciseTarget;

    fn exercise(id: &str, sets: u32, side: BodySide) -> Exercise {
        Exercise {
            id: id.into(),
            name: id.into(),
            sets,
            target: ExerciseTarget::Reps(10),
            rest_secs: 30,
            is_horizontal: false,
            side,
            video_url: None,
            motion: None,
        }
    }

    #[test]
    fn test_empty_plan_is_rejected() {
        let plan = TrainingPlan {
            session_id: "s".into(),
            exercises: vec![],
        };
        assert!(TrainingSession::new(plan, "u").is_err());
    }

    #[test]
    fn test_set_progression_and_side_flip() {
        let plan = TrainingPlan {
            session_id: "s".into(),
            exercises: vec![exercise("lunge", 2, BodySide::Left), exercise("squat", 1, BodySide::Both)],
        };
        let mut session = TrainingSession::new(plan, "u").unwrap();
        session.set_reps(10);
        assert_eq!(session.complete_set(), SetOutcome::NextSet);
        session.advance_set();
        assert_eq!(session.active_side(), BodySide::Right);
        assert_eq!(session.current_reps(), 0);

        session.set_reps(8);
        assert_eq!(session.complete_set(), SetOutcome::NextExercise);
        session.advance_exercise().unwrap();
        assert_eq!(session.active_side(), BodySide::Both);

        session.set_reps(10);
        assert_eq!(session.complete_set(), SetOutcome::SessionComplete);
        let report = session.report();
        assert_eq!(report.exercises[0].reps_per_set, vec![10, 8]);
        assert_eq!(report.exercises[0].total_reps, 18);
        assert!((report.completion_ratio - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_reps_never_decrease_within_a_set() {
        let plan = TrainingPlan {
            session_id: "s".into(),
            exercises: vec![exercise("squat", 1, BodySide::Both)],
        };
        let mut session = TrainingSession::new(plan, "u").unwrap();
        session.set_reps(4);
        session.set_reps(2);
        assert_eq!(session.current_reps(), 4);
    }
}
