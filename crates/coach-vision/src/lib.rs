// ABOUTME: Pose-stream analysis engine for guided training sessions
// ABOUTME: Pure, synchronous algorithms consumed once per camera frame
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Coach Vision
//!
//! Frame-level algorithms shared by the training session and the photo capture
//! flow. Nothing here performs I/O or keeps frames beyond the call that
//! consumes them; every detector is a small state machine advanced by
//! [`coach_core::models::PoseFrame`] timestamps.

/// Three-point angles and landmark distances
pub mod geometry;

/// Frame validity and aggregate confidence
pub mod analysis;

/// Hold-time debounce with a once-per-window latch
pub mod hold;

/// Silhouette alignment detection
pub mod alignment;

/// Joint-angle rep counting with hysteresis and dwell debounce
pub mod reps;

/// Phone orientation and level detection from gyroscope readings
pub mod orientation;

pub use alignment::{AlignmentDetector, AlignmentUpdate, Silhouette};
pub use analysis::{analyze_pose, PoseAnalysis};
pub use geometry::{calculate_angle, distance, joint_angle};
pub use hold::HoldLatch;
pub use orientation::{DeviceOrientation, GyroReading, LevelDetector};
pub use reps::{JointPhase, RepCounter, RepCounterConfig, RepEvent};
