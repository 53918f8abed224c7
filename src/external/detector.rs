// ABOUTME: Pose detector and inference backend interfaces
// ABOUTME: Backends are loaded once by the bootstrap; the detector is shared read-only
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use super::camera::CameraFrame;
use async_trait::async_trait;
use coach_core::errors::AppResult;
use coach_core::models::Landmark;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Single-frame pose estimation
#[async_trait]
pub trait PoseDetector: Send + Sync {
    /// Estimate landmarks for one frame; empty when no body was found
    ///
    /// # Errors
    ///
    /// Returns an error if inference fails for this frame
    async fn estimate(&self, frame: &CameraFrame) -> AppResult<Vec<Landmark>>;
}

/// Execution path for the pose model, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    /// Dedicated neural or DSP accelerator
    Accelerated,
    /// General-purpose GPU
    Gpu,
    /// CPU fallback, always available
    Cpu,
}

impl BackendKind {
    /// Selection priority; lower is tried first
    #[must_use]
    pub const fn priority(self) -> u8 {
        match self {
            Self::Accelerated => 0,
            Self::Gpu => 1,
            Self::Cpu => 2,
        }
    }

    /// Name used in logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Accelerated => "accelerated",
            Self::Gpu => "gpu",
            Self::Cpu => "cpu",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a backend could not be used
#[derive(Debug, Clone, Error)]
pub enum BackendError {
    /// The device lacks the hardware or driver
    #[error("backend unsupported on this device: {0}")]
    Unsupported(String),
    /// The rendering context could not be warmed up
    #[error("backend pre-warm failed: {0}")]
    Prewarm(String),
    /// Model assets failed to load
    #[error("model load failed: {0}")]
    Load(String),
}

/// One way of running the pose model
#[async_trait]
pub trait InferenceBackend: Send + Sync {
    /// Which execution path this is
    fn kind(&self) -> BackendKind;

    /// Warm up the rendering context to avoid first-frame latency
    ///
    /// # Errors
    ///
    /// Returns `BackendError::Prewarm` if the context cannot be created
    async fn prewarm(&self) -> Result<(), BackendError> {
        Ok(())
    }

    /// Load model assets and return a ready detector
    ///
    /// # Errors
    ///
    /// Returns a `BackendError` when this backend cannot run the model
    async fn load(&self) -> Result<Arc<dyn PoseDetector>, BackendError>;
}
