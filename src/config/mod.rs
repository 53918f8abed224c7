// ABOUTME: Configuration management module for training core settings
// ABOUTME: Environment-first configuration with validation for every section
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
//! Configuration module for the guided training core
//!
//! - **Session**: countdown, auto-complete delay, rest and transition timing
//! - **Analysis**: rep dwell, low-confidence window, alignment and level holds
//! - **Stream**: frame failure escalation threshold
//! - **Feedback**: audio cue cooldown
//! - **Bootstrap**: backend pre-warm

/// Configuration error types
pub mod error;
/// Environment-backed configuration sections
pub mod training;

pub use error::ConfigError;
pub use training::{
    AnalysisConfig, BootstrapConfig, FeedbackConfig, SessionConfig, StreamConfig, TrainingConfig,
};
