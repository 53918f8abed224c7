// ABOUTME: Detection thresholds and timing defaults for guided training
// ABOUTME: Organized by domain so every consumer shares the same tuning values
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Constants module
//!
//! Values here are the defaults; most of them can be overridden through the
//! environment-backed configuration in the root crate.

/// Pose detection thresholds
pub mod detection {
    /// Landmarks below this visibility are ignored
    pub const MIN_VISIBILITY: f32 = 0.5;

    /// Minimum share of valid landmarks for a frame to count
    pub const MIN_CONFIDENCE: f32 = 0.5;

    /// Number of landmarks produced by the pose model
    pub const LANDMARK_COUNT: usize = 33;

    /// Vectors shorter than this make an angle undefined
    pub const DEGENERATE_VECTOR_EPSILON: f32 = 1e-4;
}

/// Rep counting defaults
pub mod reps {
    /// Minimum time a joint phase must hold before the next transition counts
    pub const MIN_DWELL_MS: u64 = 200;

    /// Sustained low-confidence window before a form advisory is raised
    pub const LOW_CONFIDENCE_WINDOW_MS: u64 = 3_000;
}

/// Alignment and device orientation defaults
pub mod alignment {
    /// Time the user must stay aligned before alignment is confirmed
    pub const HOLD_MS: u64 = 2_000;

    /// Maximum tilt from vertical for the phone to count as level
    pub const LEVEL_TOLERANCE_DEG: f32 = 8.0;

    /// Time the phone must stay level before the check passes
    pub const LEVEL_HOLD_MS: u64 = 1_000;

    /// Roll below this magnitude means portrait orientation
    pub const PORTRAIT_ROLL_LIMIT_DEG: f32 = 45.0;
}

/// Session timing defaults
pub mod session {
    /// Countdown before every exercise set
    pub const COUNTDOWN_SECS: u64 = 5;

    /// Delay between reaching the target reps and completing the set
    pub const AUTO_COMPLETE_DELAY_MS: u64 = 1_500;

    /// Pause inserted between sides of a one-sided exercise
    pub const SIDE_SWITCH_SECS: u64 = 5;

    /// Preview shown between two exercises
    pub const TRANSITION_SECS: u64 = 10;

    /// Calories burned per minute of active exercise
    pub const KCAL_PER_ACTIVE_MINUTE: f64 = 6.0;

    /// Granularity of the session clock
    pub const TICK_INTERVAL_MS: u64 = 100;

    /// Clock refresh while frames drive the loop but none arrive
    pub const ATTACHED_WATCHDOG_MS: u64 = 1_000;
}

/// Audio feedback defaults
pub mod feedback {
    /// Minimum gap between two cues on the same channel
    pub const COOLDOWN_MS: u64 = 2_000;
}

/// Frame stream defaults
pub mod stream {
    /// Consecutive failed inference ticks before an advisory is raised
    pub const FAILURE_THRESHOLD: u32 = 15;
}

/// Pose model bootstrap defaults
pub mod bootstrap {
    /// Upper bound for pre-warm plus model load of one backend
    pub const LOAD_TIMEOUT_MS: u64 = 30_000;
}

/// Photo capture defaults
pub mod capture {
    /// Countdown before the shutter fires
    pub const COUNTDOWN_SECS: u64 = 5;

    /// File name of the per-user photo index
    pub const INDEX_FILE_NAME: &str = "index.json";
}

/// Service names for structured logging
pub mod service_names {
    /// Service name used in log output
    pub const GUIDED_TRAINING: &str = "guided-training";
}
