// ABOUTME: Configuration error types for training configuration validation
// ABOUTME: Defines error variants for invalid ranges, thresholds, and environment parsing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Configuration error types for training configuration validation.

use coach_core::errors::AppError;
use thiserror::Error;

/// Configuration-related errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Value outside acceptable range (e.g., a zero countdown)
    #[error("Invalid range: {0}")]
    InvalidRange(&'static str),

    /// Failed to parse configuration value
    #[error("Parse error for {key}: {value}")]
    Parse {
        /// Environment variable name
        key: &'static str,
        /// Raw value that failed to parse
        value: String,
    },

    /// Thresholds that must be ordered are not
    #[error("Invalid thresholds: {0}")]
    InvalidThresholds(&'static str),
}

impl From<ConfigError> for AppError {
    fn from(error: ConfigError) -> Self {
        Self::config(error.to_string()).with_source(error)
    }
}
