// ABOUTME: Core types and constants for the guided training platform
// ABOUTME: Foundation crate with error handling, constants, and the training data model
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Coach Core
//!
//! Foundation crate providing shared types and constants for guided training
//! sessions. This crate is designed to change infrequently, enabling
//! incremental compilation benefits in the workspace.
//!
//! ## Modules
//!
//! - **errors**: Unified error handling with `AppError` and `ErrorCode`
//! - **constants**: Detection thresholds and timing defaults
//! - **models**: Landmarks, pose frames, exercises, training sessions, progress photos

/// Unified error handling system with standard error codes
pub mod errors;

/// Detection thresholds and timing defaults organized by domain
pub mod constants;

/// Core data models (Landmark, `PoseFrame`, Exercise, `TrainingSession`, `ProgressPhoto`)
pub mod models;
