// ABOUTME: Rep counter and form analyzer driven by a primary joint angle
// ABOUTME: Two-threshold hysteresis with per-phase dwell; invalid frames freeze the count
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Rep Counter
//!
//! The primary joint angle is classified into a contracted phase (at or below
//! `contracted_deg`) and an extended phase (at or above `extended_deg`). Angles
//! in between keep the current phase. A new phase starts out pending and is
//! confirmed only once it has been observed for `min_dwell_ms`; returning to
//! the confirmed phase first drops it. A single noisy frame past a threshold
//! therefore never changes the phase.
//!
//! A rep is one contracted → extended → contracted cycle: entering the extended
//! phase from contracted arms the counter, re-entering contracted completes the rep.
//!
//! Frames that fail [`analyze_pose`] or lack the joint landmarks are ignored for
//! counting. Phase, arming and count survive such frames untouched, so counting
//! resumes mid-rep once the pose is visible again. A sustained run of such frames
//! raises one form advisory.

use crate::analysis::analyze_pose;
use crate::geometry::joint_angle;
use coach_core::constants::reps::{LOW_CONFIDENCE_WINDOW_MS, MIN_DWELL_MS};
use coach_core::models::{BodySide, MotionProfile, PoseFrame};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Tuning for rep detection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepCounterConfig {
    /// Time a new phase must be observed before it is confirmed
    pub min_dwell_ms: u64,
    /// Continuous invalid time before a form advisory is raised
    pub low_confidence_window_ms: u64,
}

impl Default for RepCounterConfig {
    fn default() -> Self {
        Self {
            min_dwell_ms: MIN_DWELL_MS,
            low_confidence_window_ms: LOW_CONFIDENCE_WINDOW_MS,
        }
    }
}

/// Confirmed phase of the tracked joint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointPhase {
    /// Angle at or below the contracted threshold
    Contracted,
    /// Angle at or above the extended threshold
    Extended,
}

/// Event produced by one frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum RepEvent {
    /// A full cycle finished
    RepCompleted {
        /// Reps counted in the current set
        count: u32,
    },
    /// The pose has been unusable for the advisory window
    FormError {
        /// Confidence of the frame that raised the advisory
        confidence: f32,
        /// Hint for the user
        message: String,
    },
}

/// Per-exercise rep counting state machine
#[derive(Debug, Clone)]
pub struct RepCounter {
    profile: MotionProfile,
    side: BodySide,
    config: RepCounterConfig,
    target: Option<u32>,
    phase: Option<JointPhase>,
    pending: Option<(JointPhase, u64)>,
    armed: bool,
    count: u32,
    invalid_since_ms: Option<u64>,
    advisory_raised: bool,
}

impl RepCounter {
    /// Create a counter for one exercise side
    #[must_use]
    pub const fn new(profile: MotionProfile, side: BodySide, config: RepCounterConfig) -> Self {
        Self {
            profile,
            side,
            config,
            target: None,
            phase: None,
            pending: None,
            armed: false,
            count: 0,
            invalid_since_ms: None,
            advisory_raised: false,
        }
    }

    /// Stop counting once `target` reps are reached
    #[must_use]
    pub const fn with_target(mut self, target: u32) -> Self {
        self.target = Some(target);
        self
    }

    /// Reps counted so far
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Current confirmed phase
    #[must_use]
    pub const fn phase(&self) -> Option<JointPhase> {
        self.phase
    }

    /// Side being tracked
    #[must_use]
    pub const fn side(&self) -> BodySide {
        self.side
    }

    /// Target reached; further frames are ignored
    #[must_use]
    pub fn target_reached(&self) -> bool {
        self.target.is_some_and(|target| self.count >= target)
    }

    /// Start a new set, optionally on another side
    pub fn reset_for_set(&mut self, side: BodySide) {
        self.side = side;
        self.phase = None;
        self.pending = None;
        self.armed = false;
        self.count = 0;
        self.invalid_since_ms = None;
        self.advisory_raised = false;
    }

    fn classify(&self, angle: f32) -> Option<JointPhase> {
        if angle <= self.profile.contracted_deg {
            Some(JointPhase::Contracted)
        } else if angle >= self.profile.extended_deg {
            Some(JointPhase::Extended)
        } else {
            None
        }
    }

    fn on_invalid_frame(&mut self, now_ms: u64, confidence: f32) -> Option<RepEvent> {
        let since = *self.invalid_since_ms.get_or_insert(now_ms);
        if self.advisory_raised
            || now_ms.saturating_sub(since) < self.config.low_confidence_window_ms
        {
            return None;
        }
        self.advisory_raised = true;
        warn!(
            confidence,
            window_ms = self.config.low_confidence_window_ms,
            "Sustained low-confidence pose"
        );
        Some(RepEvent::FormError {
            confidence,
            message: "Make sure your whole body stays in view".into(),
        })
    }

    /// Feed one pose frame
    pub fn on_pose_frame(&mut self, frame: &PoseFrame) -> Option<RepEvent> {
        let now_ms = frame.timestamp_ms;
        let analysis = analyze_pose(frame);
        let angle = if analysis.is_valid {
            joint_angle(frame, self.profile.joint, self.side)
        } else {
            None
        };
        let Some(angle) = angle else {
            return self.on_invalid_frame(now_ms, analysis.confidence);
        };
        self.invalid_since_ms = None;
        self.advisory_raised = false;

        if self.target_reached() {
            return None;
        }
        let observed = self.classify(angle)?;

        let Some(current) = self.phase else {
            self.phase = Some(observed);
            return None;
        };
        if current == observed {
            self.pending = None;
            return None;
        }

        let since = match self.pending {
            Some((phase, since)) if phase == observed => since,
            _ => {
                self.pending = Some((observed, now_ms));
                now_ms
            }
        };
        if now_ms.saturating_sub(since) < self.config.min_dwell_ms {
            return None;
        }
        self.pending = None;
        self.phase = Some(observed);

        match observed {
            JointPhase::Extended => {
                self.armed = true;
                None
            }
            JointPhase::Contracted if self.armed => {
                self.armed = false;
                self.count += 1;
                debug!(count = self.count, angle, "Rep completed");
                Some(RepEvent::RepCompleted { count: self.count })
            }
            JointPhase::Contracted => None,
        }
    }
}
