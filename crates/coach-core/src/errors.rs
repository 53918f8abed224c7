// ABOUTME: Unified error taxonomy for training sessions and photo capture
// ABOUTME: Error codes, the AppError type, and blocking/retryable classification
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Unified Error Handling System
//!
//! Every failure surfaced by the training core carries an [`ErrorCode`]. The code
//! decides how the failure propagates: most failures are absorbed at the boundary
//! where they occur, and only bootstrap and storage-commit failures block the user.

use serde::{Deserialize, Serialize};
use std::error::Error as StdError;
use std::fmt;
use thiserror::Error;

/// Standard error codes used throughout the training core
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Camera or gallery permission was denied
    PermissionDenied,
    /// No inference backend could load the pose model
    InitializationFailed,
    /// A single frame failed inference
    FrameInferenceFailed,
    /// Pose confidence stayed below threshold
    LowConfidence,
    /// Plan fetch or result submission failed
    NetworkSubmissionFailed,
    /// Photo move or index write failed
    StorageFailed,
    /// Caller supplied invalid input
    InvalidInput,
    /// Action not allowed in the current phase
    InvalidTransition,
    /// Configuration could not be loaded or validated
    ConfigInvalid,
    /// Unexpected internal failure
    InternalError,
}

impl ErrorCode {
    /// Errors that must be explicitly acknowledged by the user
    #[must_use]
    pub const fn is_blocking(self) -> bool {
        matches!(self, Self::InitializationFailed | Self::StorageFailed)
    }

    /// Errors the user can retry from the boundary where they occurred
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(
            self,
            Self::PermissionDenied | Self::NetworkSubmissionFailed | Self::StorageFailed
        )
    }

    /// Get a user-friendly description of this error
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::PermissionDenied => "Permission was denied",
            Self::InitializationFailed => "The pose model could not be initialized",
            Self::FrameInferenceFailed => "Pose detection failed for a frame",
            Self::LowConfidence => "The body is not clearly visible",
            Self::NetworkSubmissionFailed => "Could not reach the training service",
            Self::StorageFailed => "Could not save photos",
            Self::InvalidInput => "The provided input is invalid",
            Self::InvalidTransition => "This action is not available right now",
            Self::ConfigInvalid => "Configuration is invalid",
            Self::InternalError => "An internal error occurred",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Unified error type for the training core
#[derive(Debug, Error)]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Source error for error chaining
    #[source]
    pub source: Option<Box<dyn StdError + Send + Sync>>,
}

impl AppError {
    /// Create a new `AppError` with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
        }
    }

    /// Add a source error for error chaining
    #[must_use]
    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Whether the user must acknowledge this error before continuing
    #[must_use]
    pub const fn is_blocking(&self) -> bool {
        self.code.is_blocking()
    }

    /// Whether the failing operation can be retried as-is
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        self.code.is_retryable()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.description(), self.message)
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Convenience functions for creating common errors
impl AppError {
    /// Permission denied for a device capability
    pub fn permission_denied(capability: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::PermissionDenied,
            format!("{} permission denied", capability.into()),
        )
    }

    /// Pose model initialization failed
    pub fn initialization(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InitializationFailed, message)
    }

    /// Single-frame inference failure
    pub fn frame_inference(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::FrameInferenceFailed, message)
    }

    /// Network submission failure
    pub fn network(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::NetworkSubmissionFailed,
            format!("{}: {}", operation.into(), message.into()),
        )
    }

    /// Storage failure
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageFailed, message)
    }

    /// Invalid input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Action not valid for the current phase
    pub fn invalid_transition(action: &str, phase: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidTransition,
            format!("cannot {action} while in {phase}"),
        )
    }

    /// Configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigInvalid, message)
    }

    /// Internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::storage(error.to_string()).with_source(error)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::storage(format!("index serialization failed: {error}")).with_source(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blocking_classification() {
        assert!(ErrorCode::InitializationFailed.is_blocking());
        assert!(ErrorCode::StorageFailed.is_blocking());
        assert!(!ErrorCode::FrameInferenceFailed.is_blocking());
        assert!(!ErrorCode::NetworkSubmissionFailed.is_blocking());
        assert!(!ErrorCode::LowConfidence.is_blocking());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(AppError::permission_denied("camera").is_retryable());
        assert!(AppError::network("submit", "timeout").is_retryable());
        assert!(!AppError::initialization("no backend").is_retryable());
    }

    #[test]
    fn test_error_code_serialization() {
        let json = serde_json::to_string(&ErrorCode::NetworkSubmissionFailed).unwrap();
        assert_eq!(json, "\"NETWORK_SUBMISSION_FAILED\"");
    }

    #[test]
    fn test_display_includes_description() {
        let error = AppError::invalid_transition("pause", "finished");
        assert_eq!(
            error.to_string(),
            "This action is not available right now: cannot pause while in finished"
        );
    }
}
