// ABOUTME: Per-frame pose validation with aggregate landmark confidence
// ABOUTME: A frame is valid when at least half of its landmarks are visible
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use coach_core::constants::detection::MIN_CONFIDENCE;
use coach_core::models::PoseFrame;
use serde::{Deserialize, Serialize};

/// Derived, per-tick view of a pose frame's usability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseAnalysis {
    /// Landmarks present and confidence at or above threshold
    pub is_valid: bool,
    /// Share of landmarks meeting the visibility threshold
    pub confidence: f32,
    /// Hint for the user when the frame is not usable
    pub message: Option<String>,
}

/// Analyze a frame: `confidence = valid / total`, valid iff `confidence >= 0.5`
#[must_use]
pub fn analyze_pose(frame: &PoseFrame) -> PoseAnalysis {
    if frame.is_empty() {
        return PoseAnalysis {
            is_valid: false,
            confidence: 0.0,
            message: Some("No pose detected".into()),
        };
    }

    let confidence = frame.valid_count() as f32 / frame.landmarks.len() as f32;
    let is_valid = confidence >= MIN_CONFIDENCE;
    PoseAnalysis {
        is_valid,
        confidence,
        message: (!is_valid).then(|| "Step back so your whole body is visible".into()),
    }
}
