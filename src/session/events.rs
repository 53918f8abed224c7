// ABOUTME: Events emitted by the session state machine and the read projection published to UIs
// ABOUTME: Events are drained after every transition; snapshots are plain serializable values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::feedback::OverlayState;
use crate::stream::FrameFailureAdvisory;
use coach_core::models::{BodySide, OnboardingStep, SessionReport, SessionStatus};
use serde::{Deserialize, Serialize};

/// Something that happened inside the state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum SessionEvent {
    /// The phase changed
    PhaseChanged {
        /// Phase left
        from: SessionStatus,
        /// Phase entered
        to: SessionStatus,
    },
    /// The onboarding sub-machine moved
    OnboardingStepChanged {
        /// Step entered
        step: OnboardingStep,
    },
    /// Play the test sound of the sound check
    PlaySoundCheck,
    /// The user refused camera access; onboarding waits for a retry
    CameraPermissionDenied,
    /// Whole seconds left on the pre-set countdown
    CountdownTick {
        /// Seconds remaining
        remaining_secs: u64,
    },
    /// A set began
    SetStarted {
        /// Zero-based exercise index
        exercise_index: usize,
        /// One-based set number
        set: u32,
        /// Side being trained
        side: BodySide,
        /// Rep target, for rep-based exercises
        target: Option<u32>,
    },
    /// A rep was counted
    RepCompleted {
        /// Reps in the current set
        count: u32,
        /// Rep target of the set
        target: Option<u32>,
    },
    /// Sustained low-confidence pose during a set
    FormError {
        /// Confidence of the frame that raised it
        confidence: f32,
        /// Hint for the user
        message: String,
    },
    /// The rep target was reached; the set completes after the confirmation delay
    TargetReached {
        /// Reps in the current set
        count: u32,
    },
    /// A set finished
    SetCompleted {
        /// Zero-based exercise index
        exercise_index: usize,
        /// One-based set number
        set: u32,
        /// Reps achieved
        reps: u32,
    },
    /// Every set of an exercise finished
    ExerciseCompleted {
        /// Zero-based exercise index
        exercise_index: usize,
        /// Exercise identifier
        exercise_id: String,
    },
    /// The last set of the last exercise finished
    SessionFinished {
        /// Final summary
        report: SessionReport,
    },
    /// The position check's silhouette fill changed
    AlignmentChanged {
        /// Silhouette filled
        aligned: bool,
    },
    /// Timers and frames were suspended
    Paused,
    /// Timers and frames resumed with their frozen values
    Resumed,
    /// The stop confirmation is showing
    StopRequested,
    /// The session was torn down
    Stopped,
}

/// Read-only projection of the session for UIs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Server-side session identifier
    pub session_id: String,
    /// Visible phase; `paused` while suspended
    pub status: SessionStatus,
    /// Onboarding step while onboarding
    pub onboarding_step: Option<OnboardingStep>,
    /// Zero-based exercise index
    pub exercise_index: usize,
    /// Current exercise identifier
    pub exercise_id: String,
    /// One-based set number
    pub set: u32,
    /// Sets of the current exercise
    pub total_sets: u32,
    /// Reps in the current set
    pub reps: u32,
    /// Rep target, for rep-based exercises
    pub target_reps: Option<u32>,
    /// Side being trained
    pub side: BodySide,
    /// Seconds left on the active phase timer
    pub phase_remaining_secs: Option<u64>,
    /// Wall time excluding pauses
    pub elapsed_secs: u64,
    /// Time in running sets
    pub active_secs: u64,
    /// Estimated calories
    pub calories: f64,
    /// Stop confirmation is showing
    pub confirming_stop: bool,
    /// Visual feedback state
    pub overlay: OverlayState,
    /// Training API calls waiting for a retry
    pub pending_submissions: usize,
    /// Camera trouble the user may fix with a restart
    pub frame_advisory: Option<FrameFailureAdvisory>,
}
