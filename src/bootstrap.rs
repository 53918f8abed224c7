// ABOUTME: Pose model bootstrap selecting the first working inference backend
// ABOUTME: Concurrent callers share one in-flight attempt; a success is memoized for the process
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Pose Model Bootstrap
//!
//! Backends are tried in priority order (accelerated, GPU, CPU), filtered once
//! by the device capabilities. Each attempt is independent: a failing backend is
//! logged and the next one is tried. When every candidate fails the bootstrap
//! reports an initialization error and caches nothing, so the next call starts a
//! fresh attempt. While an attempt is running, every caller awaits the same
//! shared future.

use crate::config::BootstrapConfig;
use crate::external::{BackendKind, InferenceBackend, PoseDetector};
use coach_core::errors::AppError;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

/// Hardware available on the device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceCapabilities {
    /// A neural or DSP accelerator is present
    pub has_accelerator: bool,
    /// A usable GPU is present
    pub has_gpu: bool,
}

impl DeviceCapabilities {
    /// Every backend may be tried
    #[must_use]
    pub const fn all() -> Self {
        Self {
            has_accelerator: true,
            has_gpu: true,
        }
    }

    /// Only the CPU fallback may be tried
    #[must_use]
    pub const fn cpu_only() -> Self {
        Self {
            has_accelerator: false,
            has_gpu: false,
        }
    }

    /// Whether a backend can run on this device
    #[must_use]
    pub const fn supports(self, kind: BackendKind) -> bool {
        match kind {
            BackendKind::Accelerated => self.has_accelerator,
            BackendKind::Gpu => self.has_gpu,
            BackendKind::Cpu => true,
        }
    }
}

/// Ready detector plus the backend that produced it
#[derive(Clone)]
pub struct DetectorHandle {
    /// Backend that loaded the model
    pub backend: BackendKind,
    /// Shared read-only detector
    pub detector: Arc<dyn PoseDetector>,
}

impl fmt::Debug for DetectorHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DetectorHandle")
            .field("backend", &self.backend)
            .finish_non_exhaustive()
    }
}

/// One failed backend attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendAttempt {
    /// Backend tried
    pub backend: BackendKind,
    /// Why it failed
    pub reason: String,
}

/// Every candidate backend failed
#[derive(Debug, Clone, Error)]
#[error("no working inference backend ({} tried)", .attempts.len())]
pub struct InitFailure {
    /// Failed attempts in the order they were tried
    pub attempts: Vec<BackendAttempt>,
}

impl From<InitFailure> for AppError {
    fn from(failure: InitFailure) -> Self {
        let tried = failure
            .attempts
            .iter()
            .map(|attempt| format!("{}: {}", attempt.backend, attempt.reason))
            .collect::<Vec<_>>()
            .join("; ");
        Self::initialization(format!("no working inference backend [{tried}]")).with_source(failure)
    }
}

type InitAttempt = Shared<BoxFuture<'static, Result<DetectorHandle, InitFailure>>>;

#[derive(Default)]
struct BootstrapState {
    ready: Option<DetectorHandle>,
    pending: Option<InitAttempt>,
}

/// Memoized pose model initializer
pub struct PoseModelBootstrap {
    candidates: Vec<Arc<dyn InferenceBackend>>,
    config: BootstrapConfig,
    state: Mutex<BootstrapState>,
}

impl PoseModelBootstrap {
    /// Build the strategy table: supported backends in priority order
    #[must_use]
    pub fn new(
        backends: Vec<Arc<dyn InferenceBackend>>,
        capabilities: DeviceCapabilities,
        config: BootstrapConfig,
    ) -> Self {
        let mut candidates: Vec<_> = backends
            .into_iter()
            .filter(|backend| {
                let supported = capabilities.supports(backend.kind());
                if !supported {
                    info!(backend = %backend.kind(), "Skipping backend unsupported by device");
                }
                supported
            })
            .collect();
        candidates.sort_by_key(|backend| backend.kind().priority());
        Self {
            candidates,
            config,
            state: Mutex::new(BootstrapState::default()),
        }
    }

    /// Backends that will be tried, in order
    #[must_use]
    pub fn candidates(&self) -> Vec<BackendKind> {
        self.candidates.iter().map(|backend| backend.kind()).collect()
    }

    /// The memoized handle, if initialization has succeeded
    #[must_use]
    pub fn handle(&self) -> Option<DetectorHandle> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .ready
            .clone()
    }

    /// Whether initialization has succeeded
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.handle().is_some()
    }

    /// Return the detector, initializing it on first use
    ///
    /// # Errors
    ///
    /// Returns an `InitializationFailed` error when every backend fails
    pub async fn initialize(&self) -> Result<DetectorHandle, AppError> {
        let attempt = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            if let Some(handle) = &state.ready {
                return Ok(handle.clone());
            }
            if let Some(pending) = &state.pending {
                pending.clone()
            } else {
                let attempt = select_backend(
                    self.candidates.clone(),
                    self.config.prewarm,
                    self.config.load_timeout(),
                )
                .boxed()
                .shared();
                state.pending = Some(attempt.clone());
                attempt
            }
        };

        let result = attempt.clone().await;

        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if state
            .pending
            .as_ref()
            .is_some_and(|pending| Shared::ptr_eq(pending, &attempt))
        {
            state.pending = None;
        }
        match result {
            Ok(handle) => {
                if state.ready.is_none() {
                    state.ready = Some(handle.clone());
                }
                Ok(handle)
            }
            Err(failure) => Err(failure.into()),
        }
    }
}

async fn select_backend(
    candidates: Vec<Arc<dyn InferenceBackend>>,
    prewarm: bool,
    timeout: Duration,
) -> Result<DetectorHandle, InitFailure> {
    let mut attempts = Vec::with_capacity(candidates.len());

    for backend in candidates {
        let kind = backend.kind();
        info!(backend = %kind, prewarm, "Trying inference backend");

        let loaded = tokio::time::timeout(timeout, async {
            if prewarm {
                backend.prewarm().await?;
            }
            backend.load().await
        })
        .await;

        match loaded {
            Ok(Ok(detector)) => {
                info!(backend = %kind, failed_before = attempts.len(), "Pose model ready");
                return Ok(DetectorHandle {
                    backend: kind,
                    detector,
                });
            }
            Ok(Err(error)) => {
                warn!(backend = %kind, error = %error, "Inference backend failed");
                attempts.push(BackendAttempt {
                    backend: kind,
                    reason: error.to_string(),
                });
            }
            Err(_) => {
                warn!(
                    backend = %kind,
                    timeout_ms = timeout.as_millis() as u64,
                    "Inference backend timed out"
                );
                attempts.push(BackendAttempt {
                    backend: kind,
                    reason: format!("timed out after {timeout:?}"),
                });
            }
        }
    }

    warn!(tried = attempts.len(), "All inference backends exhausted");
    Err(InitFailure { attempts })
}
