// ABOUTME: Core data models for guided training and progress photos
// ABOUTME: Re-exports landmark, exercise, session, and photo types
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Data model shared by the vision algorithms and the session orchestrator.
//!
//! Exercises and plans are read-only inputs; `PoseFrame` values live for one
//! processing tick; `TrainingSession` is owned by the session state machine.

/// Exercise definitions and motion profiles
pub mod exercise;
/// Landmarks, anatomical indices, and pose frames
pub mod landmark;
/// Progress photo types
pub mod photo;
/// Training session aggregate and report
pub mod session;

pub use exercise::{Exercise, ExerciseTarget, MotionProfile};
pub use landmark::{BodyLandmark, BodySide, Joint, Landmark, PoseFrame};
pub use photo::{CapturedPhoto, PhotoSide, ProgressPhoto};
pub use session::{
    ExerciseProgress, ExerciseReport, OnboardingStep, SessionReport, SessionStatus, SetOutcome,
    TrainingPlan, TrainingSession,
};
