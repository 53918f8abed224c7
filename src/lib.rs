// ABOUTME: Main library entry point for the guided training orchestrator
// ABOUTME: Session state machine, pose stream processing, feedback, and pose-guided photo capture
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![deny(unsafe_code)]

//! # Guided Training
//!
//! Drives a camera-guided workout through onboarding, countdowns, sets, rests
//! and side switches while a pose detection model counts reps from a live
//! landmark stream. A sibling flow reuses the same alignment detection to take
//! a four-side body-progress photo batch.
//!
//! ## Architecture
//!
//! - **`coach_core`**: errors, constants and the data model
//! - **`coach_vision`**: pure per-frame algorithms (angles, reps, alignment, level)
//! - **Bootstrap**: picks the first working inference backend, once per process
//! - **Stream**: attaches the camera to the detector and fans frames out
//! - **Session**: the single-writer state machine and its async runner
//! - **Feedback**: audio cues and the visual overlay
//! - **Capture**: the photo capture flow, its stream-driven runner and the atomic batch commit
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use guided_training::config::TrainingConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     guided_training::logging::init_from_env()?;
//!     let config = TrainingConfig::from_env()?;
//!     println!("countdown: {}s", config.session.countdown_secs);
//!     Ok(())
//! }
//! ```

/// Pose model backend selection and memoized initialization
pub mod bootstrap;

/// Photo capture flow, runner, batch commit and filesystem store
pub mod capture;

/// Environment-driven configuration
pub mod config;

/// Interfaces implemented by platform code
pub mod external;

/// Audio and visual feedback dispatch
pub mod feedback;

/// Structured logging setup and domain log helpers
pub mod logging;

/// Media player registry
pub mod media;

/// Session state machine and runner
pub mod session;

/// Camera-to-detector pose stream
pub mod stream;

pub use coach_core::{constants, errors, models};
pub use coach_vision as vision;
