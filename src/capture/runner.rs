// ABOUTME: Async driver feeding the photo capture flow from the pose stream and a clock
// ABOUTME: Attaches the preview camera only while alignment is checked and fires the shutter itself
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Photo Capture Runner
//!
//! The runner owns a [`PhotoCaptureFlow`] and is the only task that touches it.
//! The preview camera is attached to the pose stream while the flow wants
//! frames and released as soon as it stops wanting them, so the still camera
//! never competes with it. When the countdown reaches the capture step the
//! runner takes the photo on its own and moves to the preview.
//!
//! The shutter countdown only runs while the preview camera is attached.

use super::flow::{CaptureStep, PhotoCaptureFlow};
use crate::bootstrap::{DetectorHandle, PoseModelBootstrap};
use crate::config::TrainingConfig;
use crate::external::{CameraSource, MediaGallery, PhotoCamera, PhotoStore};
use crate::stream::{FrameFailureAdvisory, PoseStreamProcessor, StreamControl, StreamTick};
use chrono::NaiveDate;
use coach_core::constants::session::ATTACHED_WATCHDOG_MS;
use coach_core::errors::{AppError, AppResult};
use coach_core::models::{PhotoSide, ProgressPhoto};
use coach_vision::GyroReading;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

const COMMAND_BUFFER: usize = 16;

/// User action sent to a running capture
#[derive(Debug, Clone, PartialEq)]
pub enum CaptureCommand {
    /// Prompt for camera access
    RequestPermission,
    /// A gyroscope sample
    GyroReading(GyroReading),
    /// Take the current side again
    Retake,
    /// Take one side again from the preview or the final review
    RetakeSide(PhotoSide),
    /// Accept the preview
    NextSide,
    /// Fire the shutter again after a failed shot
    RetryShutter,
    /// Release and reopen the preview camera
    RestartCamera,
    /// Save the four photos under the given batch date
    Commit(NaiveDate),
}

/// What the capture screen renders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureSnapshot {
    /// Current step
    pub step: CaptureStep,
    /// Side being captured
    pub side: PhotoSide,
    /// Whether the user currently fills the silhouette
    pub aligned: bool,
    /// Whole seconds left on the shutter countdown
    pub countdown_secs: Option<u64>,
    /// Sides with a photo
    pub captured: Vec<PhotoSide>,
    /// Whether the preview camera is consuming frames
    pub camera_attached: bool,
    /// Last shutter or commit failure
    pub last_error: Option<String>,
    /// Set while frame inference keeps failing
    pub frame_advisory: Option<FrameFailureAdvisory>,
}

/// Collaborators a capture needs
pub struct CaptureDeps {
    /// Memoized pose model initializer
    pub bootstrap: Arc<PoseModelBootstrap>,
    /// Preview camera for the pose stream
    pub camera: Box<dyn CameraSource>,
    /// Still camera
    pub shutter: Box<dyn PhotoCamera>,
    /// Persistent photo storage
    pub store: Arc<dyn PhotoStore>,
    /// Optional gallery mirror
    pub gallery: Option<Arc<dyn MediaGallery>>,
}

/// UI side of a running capture
#[derive(Debug, Clone)]
pub struct CaptureHandle {
    commands: mpsc::Sender<CaptureCommand>,
    snapshots: watch::Receiver<CaptureSnapshot>,
    stream: StreamControl,
}

impl CaptureHandle {
    /// Send a user action
    ///
    /// # Errors
    ///
    /// Returns an internal error if the runner has exited
    pub async fn send(&self, command: CaptureCommand) -> AppResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| AppError::internal("capture runner has exited"))
    }

    /// Latest published snapshot
    #[must_use]
    pub fn snapshot(&self) -> CaptureSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CaptureSnapshot> {
        self.snapshots.clone()
    }

    /// Report that the camera view went to the background
    pub fn camera_backgrounded(&self) {
        self.stream.request_detach();
    }
}

/// Async owner of a running photo capture
pub struct PhotoCaptureRunner {
    flow: PhotoCaptureFlow,
    processor: PoseStreamProcessor,
    camera: Option<Box<dyn CameraSource>>,
    camera_blocked: bool,
    shutter: Box<dyn PhotoCamera>,
    shutter_failed: bool,
    detector: DetectorHandle,
    store: Arc<dyn PhotoStore>,
    gallery: Option<Arc<dyn MediaGallery>>,
    user_id: String,
    commands: mpsc::Receiver<CaptureCommand>,
    snapshots: watch::Sender<CaptureSnapshot>,
    committed: Vec<ProgressPhoto>,
    last_error: Option<String>,
    frame_advisory: Option<FrameFailureAdvisory>,
    tick: Duration,
    last_clock: Instant,
    closed: bool,
}

impl PhotoCaptureRunner {
    /// Initialize the detector, then create the capture
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` when no inference backend works
    pub async fn start(
        user_id: &str,
        deps: CaptureDeps,
        config: &TrainingConfig,
    ) -> AppResult<(Self, CaptureHandle)> {
        let flow = PhotoCaptureFlow::new(config.analysis.alignment_hold_ms);
        Self::start_with_flow(flow, user_id, deps, config).await
    }

    /// Start with a preconfigured flow, e.g. a custom countdown
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` when no inference backend works
    pub async fn start_with_flow(
        flow: PhotoCaptureFlow,
        user_id: &str,
        deps: CaptureDeps,
        config: &TrainingConfig,
    ) -> AppResult<(Self, CaptureHandle)> {
        let detector = deps.bootstrap.initialize().await?;
        info!(user.id = %user_id, backend = %detector.backend, "Photo capture created");

        let processor = PoseStreamProcessor::new(&config.stream);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(empty_snapshot());
        let handle = CaptureHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            stream: processor.control(),
        };
        let runner = Self {
            flow,
            processor,
            camera: Some(deps.camera),
            camera_blocked: false,
            shutter: deps.shutter,
            shutter_failed: false,
            detector,
            store: deps.store,
            gallery: deps.gallery,
            user_id: user_id.to_owned(),
            commands: command_rx,
            snapshots: snapshot_tx,
            committed: Vec::new(),
            last_error: None,
            frame_advisory: None,
            tick: config.session.tick_interval(),
            last_clock: Instant::now(),
            closed: false,
        };
        runner.publish();
        Ok((runner, handle))
    }

    /// The capture flow
    #[must_use]
    pub const fn flow(&self) -> &PhotoCaptureFlow {
        &self.flow
    }

    /// Whether the preview camera is consuming frames
    #[must_use]
    pub const fn is_stream_attached(&self) -> bool {
        self.processor.is_attached()
    }

    /// Entries written by a successful commit
    #[must_use]
    pub fn committed(&self) -> &[ProgressPhoto] {
        &self.committed
    }

    /// Current projection of the flow
    #[must_use]
    pub fn snapshot(&self) -> CaptureSnapshot {
        CaptureSnapshot {
            step: self.flow.step(),
            side: self.flow.side(),
            aligned: self.flow.is_aligned(),
            countdown_secs: self
                .flow
                .countdown_remaining()
                .map(|left| left.as_secs() + u64::from(left.subsec_nanos() > 0)),
            captured: self.flow.photos().keys().copied().collect(),
            camera_attached: self.processor.is_attached(),
            last_error: self.last_error.clone(),
            frame_advisory: self.frame_advisory,
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    /// Apply one user action
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` when the action does not fit the current step,
    /// `PermissionDenied` for a refused camera, or the commit's storage error
    pub async fn handle_command(&mut self, command: CaptureCommand) -> AppResult<()> {
        debug!(command = ?command, step = %self.flow.step(), "Capture command");
        let result = match command {
            CaptureCommand::RequestPermission => {
                self.flow.request_permission(&mut *self.shutter).await
            }
            CaptureCommand::GyroReading(reading) => {
                self.flow.on_gyro_reading(&reading);
                Ok(())
            }
            CaptureCommand::Retake => self.flow.retake(),
            CaptureCommand::RetakeSide(side) => self.flow.retake_side(side),
            CaptureCommand::NextSide => self.flow.next_side().map(|_| ()),
            CaptureCommand::RetryShutter => {
                self.shutter_failed = false;
                Ok(())
            }
            CaptureCommand::RestartCamera => {
                self.restart_camera();
                Ok(())
            }
            CaptureCommand::Commit(batch_date) => self.commit(batch_date).await,
        };
        self.after_transition().await;
        result
    }

    async fn commit(&mut self, batch_date: NaiveDate) -> AppResult<()> {
        let gallery = self.gallery.as_deref();
        match self
            .flow
            .commit(&*self.store, gallery, &self.user_id, batch_date)
            .await
        {
            Ok(committed) => {
                self.committed = committed;
                self.last_error = None;
                Ok(())
            }
            Err(error) => {
                self.last_error = Some(error.to_string());
                Err(error)
            }
        }
    }

    /// Let time pass on the shutter countdown
    pub async fn advance(&mut self, dt: Duration) {
        if self.processor.is_attached() {
            self.flow.advance(dt);
        }
        self.after_transition().await;
    }

    /// Pull and handle one frame from the pose stream
    pub async fn pump_frame(&mut self) -> StreamTick {
        let tick = self.processor.pump().await;
        self.handle_tick(tick.clone()).await;
        tick
    }

    async fn handle_tick(&mut self, tick: StreamTick) {
        match tick {
            StreamTick::Frame(frame) => {
                self.flow.on_pose_frame(&frame);
                self.after_transition().await;
            }
            StreamTick::Advisory(advisory) => {
                warn!(
                    consecutive = advisory.consecutive,
                    "Capture preview keeps failing inference"
                );
                self.frame_advisory = Some(advisory);
                self.publish();
            }
            StreamTick::Detached(reason) => {
                info!(reason = ?reason, "Capture preview detached");
                self.block_camera();
                self.publish();
            }
            StreamTick::Ended => {
                self.block_camera();
                self.publish();
            }
            StreamTick::Failed { .. }
            | StreamTick::Empty
            | StreamTick::Discarded
            | StreamTick::Idle => {}
        }
    }

    fn block_camera(&mut self) {
        self.park_camera();
        self.camera_blocked = true;
    }

    fn park_camera(&mut self) {
        if let Some(camera) = self.processor.detach() {
            self.camera = Some(camera);
        }
    }

    fn restart_camera(&mut self) {
        info!("Restarting capture preview");
        self.park_camera();
        self.processor.reset_failures();
        self.frame_advisory = None;
        self.camera_blocked = false;
    }

    async fn sync_stream(&mut self) {
        let wants = self.flow.wants_frames();
        if wants && !self.processor.is_attached() && !self.camera_blocked {
            let Some(camera) = self.camera.take() else {
                return;
            };
            let detector = Arc::clone(&self.detector.detector);
            if let Err(error) = self.processor.attach(camera, detector).await {
                warn!(error = %error, "Capture preview could not be attached");
                self.block_camera();
            }
        } else if !wants && self.processor.is_attached() {
            self.park_camera();
        }
    }

    async fn fire_shutter(&mut self) {
        if self.flow.step() != CaptureStep::Capture || self.shutter_failed {
            return;
        }
        let side = self.flow.side();
        match self.flow.capture(&mut *self.shutter).await {
            Ok(photo) => debug!(side = %side, uri = %photo.temp_uri, "Shutter fired"),
            Err(error) => {
                warn!(side = %side, error = %error, "Shutter failed");
                self.last_error = Some(error.to_string());
                self.shutter_failed = true;
            }
        }
    }

    async fn after_transition(&mut self) {
        // the preview camera is released before the still camera fires
        self.sync_stream().await;
        self.fire_shutter().await;
        self.sync_stream().await;
        self.publish();
    }

    fn advance_clock(&mut self) {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last_clock);
        self.last_clock = now;
        if self.processor.is_attached() {
            self.flow.advance(dt);
        }
    }

    /// Drive the capture until the batch is saved or every handle is dropped
    pub async fn run(mut self) -> Vec<ProgressPhoto> {
        let watchdog = Duration::from_millis(ATTACHED_WATCHDOG_MS).max(self.tick);
        self.last_clock = Instant::now();
        self.after_transition().await;

        loop {
            let attached = self.processor.is_attached();
            let wait = if attached { watchdog } else { self.tick };

            let event = tokio::select! {
                biased;
                command = self.commands.recv() => command.map_or(LoopEvent::Closed, LoopEvent::Command),
                frame = self.processor.pump(), if attached => LoopEvent::Stream(frame),
                () = tokio::time::sleep(wait) => LoopEvent::Tick,
            };

            self.advance_clock();
            match event {
                LoopEvent::Command(command) => {
                    if let Err(error) = self.handle_command(command).await {
                        warn!(error = %error, "Capture command rejected");
                    }
                }
                LoopEvent::Stream(frame) => self.handle_tick(frame).await,
                LoopEvent::Tick => self.after_transition().await,
                LoopEvent::Closed => break,
            }

            if self.flow.step() == CaptureStep::Saved {
                break;
            }
        }

        self.shutdown();
        self.committed
    }

    /// Release the preview camera; idempotent
    pub fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        self.park_camera();
        self.closed = true;
        self.publish();
        info!(
            user.id = %self.user_id,
            step = %self.flow.step(),
            committed = self.committed.len(),
            "Photo capture runner shut down"
        );
    }
}

fn empty_snapshot() -> CaptureSnapshot {
    CaptureSnapshot {
        step: CaptureStep::Permission,
        side: PhotoSide::Front,
        aligned: false,
        countdown_secs: None,
        captured: Vec::new(),
        camera_attached: false,
        last_error: None,
        frame_advisory: None,
    }
}

enum LoopEvent {
    Command(CaptureCommand),
    Stream(StreamTick),
    Tick,
    Closed,
}
