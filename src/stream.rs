// ABOUTME: Pose stream processor pulling camera frames through the detector one at a time
// ABOUTME: Emits pose frames to listeners, counts inference failures, and detaches on focus loss
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Pose Stream Processor
//!
//! The processor owns the camera while attached. Each [`PoseStreamProcessor::pump`]
//! call pulls exactly one frame, runs inference on it and, when at least one
//! landmark came back, hands a [`PoseFrame`] to every listener in registration
//! order. Frames are never queued: the next frame is only requested once the
//! previous one has been fully handled.
//!
//! Detaching releases the camera. It can be requested from another task through a
//! [`StreamControl`]; an inference that was already running when the request
//! arrived is discarded instead of being delivered.

use crate::config::StreamConfig;
use crate::external::{CameraSource, PoseDetector};
use coach_core::errors::{AppError, AppResult};
use coach_core::models::PoseFrame;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Frame listener registered with [`PoseStreamProcessor::subscribe`]
pub type FrameListener = Box<dyn FnMut(&PoseFrame) + Send>;

/// Identifier returned by [`PoseStreamProcessor::subscribe`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Why the processor let go of the camera
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetachReason {
    /// The camera view lost focus
    FocusLost,
    /// A [`StreamControl`] asked for it
    Requested,
}

/// Sustained inference failures; the UI may offer a camera restart
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameFailureAdvisory {
    /// Failed ticks in the current run
    pub consecutive: u32,
    /// Failed ticks since the processor was created
    pub total: u64,
}

/// Result of one [`PoseStreamProcessor::pump`]
#[derive(Debug, Clone, PartialEq)]
pub enum StreamTick {
    /// A pose was detected and delivered to listeners
    Frame(PoseFrame),
    /// Inference succeeded but found no body
    Empty,
    /// Inference failed for this frame; the tick was skipped
    Failed {
        /// Failed ticks in the current run
        consecutive: u32,
    },
    /// The failure run crossed the threshold
    Advisory(FrameFailureAdvisory),
    /// A detach was requested while inference was running; the result was dropped
    Discarded,
    /// The processor detached itself
    Detached(DetachReason),
    /// The camera feed ended; the processor detached
    Ended,
    /// Nothing is attached
    Idle,
}

/// Cross-task handle for detaching a processor
#[derive(Debug, Clone, Default)]
pub struct StreamControl {
    detach_requested: Arc<AtomicBool>,
    generation: Arc<AtomicU64>,
}

impl StreamControl {
    /// Ask the processor to detach before the next frame
    pub fn request_detach(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
        self.detach_requested.store(true, Ordering::Release);
    }

    /// Whether a detach request is outstanding
    #[must_use]
    pub fn is_detach_requested(&self) -> bool {
        self.detach_requested.load(Ordering::Acquire)
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn take_request(&self) -> bool {
        self.detach_requested.swap(false, Ordering::AcqRel)
    }
}

/// Per-frame camera → detector → listeners loop
pub struct PoseStreamProcessor {
    attached: Option<Attachment>,
    parked: Option<Box<dyn CameraSource>>,
    listeners: Vec<(ListenerId, FrameListener)>,
    next_listener: u64,
    control: StreamControl,
    failure_threshold: u32,
    consecutive_failures: u32,
    total_failures: u64,
    advisory_raised: bool,
}

struct Attachment {
    source: Box<dyn CameraSource>,
    detector: Arc<dyn PoseDetector>,
}

impl fmt::Debug for PoseStreamProcessor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoseStreamProcessor")
            .field("attached", &self.attached.is_some())
            .field("listeners", &self.listeners.len())
            .field("consecutive_failures", &self.consecutive_failures)
            .field("total_failures", &self.total_failures)
            .finish_non_exhaustive()
    }
}

impl PoseStreamProcessor {
    /// Create a detached processor
    #[must_use]
    pub fn new(config: &StreamConfig) -> Self {
        Self {
            attached: None,
            parked: None,
            listeners: Vec::new(),
            next_listener: 0,
            control: StreamControl::default(),
            failure_threshold: config.failure_threshold,
            consecutive_failures: 0,
            total_failures: 0,
            advisory_raised: false,
        }
    }

    /// Handle for detaching from another task
    #[must_use]
    pub fn control(&self) -> StreamControl {
        self.control.clone()
    }

    /// Whether frames are being consumed
    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Failed ticks in the current run
    #[must_use]
    pub const fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    /// Failed ticks since creation
    #[must_use]
    pub const fn total_failures(&self) -> u64 {
        self.total_failures
    }

    /// Register a frame listener; listeners run in registration order
    pub fn subscribe(&mut self, listener: impl FnMut(&PoseFrame) + Send + 'static) -> ListenerId {
        let id = ListenerId(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Remove a listener; returns whether it was registered
    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener, _)| *listener != id);
        self.listeners.len() != before
    }

    /// Start the camera and begin consuming frames
    ///
    /// An already attached source is detached first. When the camera fails to
    /// start it is kept, released, and handed back by the next [`Self::detach`].
    ///
    /// # Errors
    ///
    /// Returns the camera's start error
    pub async fn attach(
        &mut self,
        mut source: Box<dyn CameraSource>,
        detector: Arc<dyn PoseDetector>,
    ) -> AppResult<()> {
        if let Some(previous) = self.detach() {
            debug!("Replacing attached camera source");
            drop(previous);
        }
        if let Err(error) = source.start().await {
            warn!(error = %error, "Camera failed to start");
            source.release();
            self.parked = Some(source);
            return Err(error);
        }
        self.control.take_request();
        self.control.bump();
        self.attached = Some(Attachment { source, detector });
        info!("Pose stream attached");
        Ok(())
    }

    /// Stop consuming frames and return the released camera source
    ///
    /// Safe to call repeatedly; returns `None` once the source has been handed back.
    pub fn detach(&mut self) -> Option<Box<dyn CameraSource>> {
        self.release_attachment();
        self.parked.take()
    }

    /// Clear the failure run, e.g. after the camera was restarted
    pub fn reset_failures(&mut self) {
        self.consecutive_failures = 0;
        self.advisory_raised = false;
    }

    fn release_attachment(&mut self) -> bool {
        let Some(Attachment { mut source, .. }) = self.attached.take() else {
            return false;
        };
        source.release();
        self.control.bump();
        self.parked = Some(source);
        info!("Pose stream detached");
        true
    }

    /// Process one camera frame
    pub async fn pump(&mut self) -> StreamTick {
        if self.control.take_request() && self.release_attachment() {
            return StreamTick::Detached(DetachReason::Requested);
        }
        let Some(attachment) = self.attached.as_mut() else {
            return StreamTick::Idle;
        };
        if !attachment.source.is_focused() {
            self.release_attachment();
            return StreamTick::Detached(DetachReason::FocusLost);
        }

        let generation = self.control.generation();
        let Some(frame) = attachment.source.next_frame().await else {
            warn!("Camera feed ended");
            self.release_attachment();
            return StreamTick::Ended;
        };
        let estimate = attachment.detector.estimate(&frame).await;

        if self.control.generation() != generation {
            debug!(
                timestamp_ms = frame.timestamp_ms,
                "Discarding in-flight inference after detach request"
            );
            return StreamTick::Discarded;
        }

        match estimate {
            Ok(landmarks) => {
                self.consecutive_failures = 0;
                self.advisory_raised = false;
                if landmarks.is_empty() {
                    return StreamTick::Empty;
                }
                let pose = PoseFrame::new(landmarks, frame.timestamp_ms);
                for (_, listener) in &mut self.listeners {
                    listener(&pose);
                }
                StreamTick::Frame(pose)
            }
            Err(error) => self.record_failure(&error),
        }
    }

    fn record_failure(&mut self, error: &AppError) -> StreamTick {
        self.consecutive_failures += 1;
        self.total_failures += 1;
        debug!(
            consecutive = self.consecutive_failures,
            error = %error,
            "Frame inference failed; tick skipped"
        );
        if self.consecutive_failures >= self.failure_threshold && !self.advisory_raised {
            self.advisory_raised = true;
            warn!(
                consecutive = self.consecutive_failures,
                total = self.total_failures,
                "Sustained frame inference failures"
            );
            return StreamTick::Advisory(FrameFailureAdvisory {
                consecutive: self.consecutive_failures,
                total: self.total_failures,
            });
        }
        StreamTick::Failed {
            consecutive: self.consecutive_failures,
        }
    }
}
