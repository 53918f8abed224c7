// ABOUTME: Async session runner wiring the state machine to camera, detector, feedback, and API
// ABOUTME: One task owns everything; commands, frames, and clock ticks are serialized by select
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Session Runner
//!
//! The runner owns the [`SessionMachine`] and is the only task that touches it.
//! Its loop waits on three sources, in priority order:
//!
//! 1. user commands from a [`SessionHandle`],
//! 2. the pose stream, only while the machine wants frames,
//! 3. a clock tick.
//!
//! Before each event is handled, the machine's clock is advanced by the real
//! time since the previous event. After each event the machine's events are
//! drained: feedback is dispatched, media players are paused or released, the
//! training API is called at exercise and session boundaries, the pose stream is
//! attached or detached to match the phase, and a new snapshot is published.

use super::events::{SessionEvent, SessionSnapshot};
use super::machine::SessionMachine;
use crate::bootstrap::{DetectorHandle, PoseModelBootstrap};
use crate::config::{SessionConfig, TrainingConfig};
use crate::external::{CameraSource, ExerciseResult, PermissionStatus, SpeechService, TrainingApi};
use crate::feedback::{FeedbackDispatcher, SpeechWarmUp, SPEECH_WARM_UP};
use crate::logging::SessionLogger;
use crate::media::MediaRegistry;
use crate::stream::{
    FrameFailureAdvisory, ListenerId, PoseStreamProcessor, StreamControl, StreamTick,
};
use coach_core::constants::session::ATTACHED_WATCHDOG_MS;
use coach_core::errors::{AppError, AppResult};
use coach_core::models::{PoseFrame, SessionReport, SessionStatus, TrainingPlan, TrainingSession};
use coach_vision::GyroReading;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

const COMMAND_BUFFER: usize = 32;

/// User action sent to a running session
#[derive(Debug, Clone, PartialEq)]
pub enum SessionCommand {
    /// Leave the info screen
    Start,
    /// The test sound was heard
    ConfirmSoundCheck,
    /// Prompt for camera access
    RequestCameraPermission,
    /// A gyroscope sample
    GyroReading(GyroReading),
    /// Count one rep by hand
    ManualRep,
    /// End rest, side switch, or the transition early
    Skip,
    /// Pause timers, frames, and media
    Pause,
    /// Resume from a pause
    Resume,
    /// Show the stop confirmation
    RequestStop,
    /// Confirm the stop and tear down
    ConfirmStop,
    /// Dismiss the stop confirmation
    CancelStop,
    /// Open the report
    ShowReport,
    /// Open analytics
    ShowAnalytics,
    /// Retry failed training API calls
    RetrySubmissions,
    /// Release and reopen the camera after a frame advisory
    RestartCamera,
}

/// Training API call that failed and waits for a retry
#[derive(Debug, Clone, PartialEq)]
pub enum PendingSubmission {
    /// Result of one exercise
    ExerciseResult(ExerciseResult),
    /// Final session metrics
    SessionCompletion(SessionReport),
}

impl PendingSubmission {
    /// Operation name used in logs
    #[must_use]
    pub const fn operation(&self) -> &'static str {
        match self {
            Self::ExerciseResult(_) => "submit_exercise_result",
            Self::SessionCompletion(_) => "complete_session",
        }
    }
}

/// Collaborators a session needs
pub struct SessionDeps {
    /// Memoized pose model initializer
    pub bootstrap: Arc<PoseModelBootstrap>,
    /// Live camera
    pub camera: Box<dyn CameraSource>,
    /// Speech engine
    pub speech: Arc<dyn SpeechService>,
    /// Training plan API
    pub api: Arc<dyn TrainingApi>,
    /// Media players to pause with the session
    pub media: MediaRegistry,
    /// Speech warm-up guard
    pub warm_up: &'static SpeechWarmUp,
}

impl SessionDeps {
    /// Bundle collaborators with a fresh media registry and the process-wide warm-up
    #[must_use]
    pub fn new(
        bootstrap: Arc<PoseModelBootstrap>,
        camera: Box<dyn CameraSource>,
        speech: Arc<dyn SpeechService>,
        api: Arc<dyn TrainingApi>,
    ) -> Self {
        Self {
            bootstrap,
            camera,
            speech,
            api,
            media: MediaRegistry::new(),
            warm_up: &SPEECH_WARM_UP,
        }
    }

    /// Use an existing media registry
    #[must_use]
    pub fn with_media(mut self, media: MediaRegistry) -> Self {
        self.media = media;
        self
    }

    /// Use a dedicated warm-up guard
    #[must_use]
    pub const fn with_warm_up(mut self, warm_up: &'static SpeechWarmUp) -> Self {
        self.warm_up = warm_up;
        self
    }
}

/// UI side of a running session
#[derive(Debug, Clone)]
pub struct SessionHandle {
    commands: mpsc::Sender<SessionCommand>,
    snapshots: watch::Receiver<SessionSnapshot>,
    stream: StreamControl,
}

impl SessionHandle {
    /// Send a user action
    ///
    /// # Errors
    ///
    /// Returns an internal error if the runner has exited
    pub async fn send(&self, command: SessionCommand) -> AppResult<()> {
        self.commands
            .send(command)
            .await
            .map_err(|_| AppError::internal("session runner has exited"))
    }

    /// Latest published snapshot
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshots.borrow().clone()
    }

    /// Receiver notified on every published snapshot
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshots.clone()
    }

    /// Report that the camera view went to the background
    pub fn camera_backgrounded(&self) {
        self.stream.request_detach();
    }
}

/// Async owner of a running session
pub struct SessionRunner {
    machine: SessionMachine,
    processor: PoseStreamProcessor,
    camera: Option<Box<dyn CameraSource>>,
    camera_failed: bool,
    detector: DetectorHandle,
    feedback: FeedbackDispatcher,
    api: Arc<dyn TrainingApi>,
    media: MediaRegistry,
    commands: mpsc::Receiver<SessionCommand>,
    snapshots: watch::Sender<SessionSnapshot>,
    pending: Vec<PendingSubmission>,
    frame_advisory: Option<FrameFailureAdvisory>,
    session_config: SessionConfig,
    last_clock: Instant,
    closed: bool,
}

impl SessionRunner {
    /// Fetch the user's plan, then start a session for it
    ///
    /// # Errors
    ///
    /// Returns the plan fetch error, or any error of [`Self::start`]
    pub async fn start_for_user(
        user_id: &str,
        deps: SessionDeps,
        config: TrainingConfig,
    ) -> AppResult<(Self, SessionHandle)> {
        let plan = deps.api.get_plan(user_id).await?;
        Self::start(plan, user_id, deps, config).await
    }

    /// Initialize the detector, then create the session
    ///
    /// No session exists unless the detector is ready.
    ///
    /// # Errors
    ///
    /// Returns `InitializationFailed` when no inference backend works, or
    /// `InvalidInput` for a malformed plan
    pub async fn start(
        plan: TrainingPlan,
        user_id: &str,
        deps: SessionDeps,
        config: TrainingConfig,
    ) -> AppResult<(Self, SessionHandle)> {
        let detector = deps.bootstrap.initialize().await?;
        let session = TrainingSession::new(plan, user_id)?;
        info!(
            session.id = %session.session_id,
            user.id = %user_id,
            exercises = session.exercises().len(),
            backend = %detector.backend,
            "Training session created"
        );

        let machine = SessionMachine::new(session, config.session.clone(), config.analysis.clone());
        let processor = PoseStreamProcessor::new(&config.stream);
        let feedback = FeedbackDispatcher::with_warm_up(deps.speech, &config.feedback, deps.warm_up);
        let (command_tx, command_rx) = mpsc::channel(COMMAND_BUFFER);
        let (snapshot_tx, snapshot_rx) = watch::channel(machine.snapshot());

        let handle = SessionHandle {
            commands: command_tx,
            snapshots: snapshot_rx,
            stream: processor.control(),
        };
        let runner = Self {
            machine,
            processor,
            camera: Some(deps.camera),
            camera_failed: false,
            detector,
            feedback,
            api: deps.api,
            media: deps.media,
            commands: command_rx,
            snapshots: snapshot_tx,
            pending: Vec::new(),
            frame_advisory: None,
            session_config: config.session,
            last_clock: Instant::now(),
            closed: false,
        };
        Ok((runner, handle))
    }

    /// The state machine
    #[must_use]
    pub const fn machine(&self) -> &SessionMachine {
        &self.machine
    }

    /// Training API calls waiting for a retry
    #[must_use]
    pub fn pending_submissions(&self) -> &[PendingSubmission] {
        &self.pending
    }

    /// Whether the pose stream is consuming frames
    #[must_use]
    pub const fn is_stream_attached(&self) -> bool {
        self.processor.is_attached()
    }

    /// Observe every delivered pose frame
    pub fn subscribe_frames(
        &mut self,
        listener: impl FnMut(&PoseFrame) + Send + 'static,
    ) -> ListenerId {
        self.processor.subscribe(listener)
    }

    /// Current projection, including feedback and submission state
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let mut snapshot = self.machine.snapshot();
        snapshot.overlay = self.feedback.overlay().clone();
        snapshot.pending_submissions = self.pending.len();
        snapshot.frame_advisory = self.frame_advisory;
        snapshot
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.snapshot());
    }

    /// Apply one user action
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` when the action does not fit the current phase
    pub async fn handle_command(&mut self, command: SessionCommand) -> AppResult<()> {
        debug!(command = ?command, phase = %self.machine.status(), "Session command");
        let result = match command {
            SessionCommand::Start => self.machine.start(),
            SessionCommand::ConfirmSoundCheck => self.machine.confirm_sound_check(),
            SessionCommand::RequestCameraPermission => {
                let status = match self.camera.as_mut() {
                    Some(camera) => camera.request_permission().await,
                    None => PermissionStatus::Granted,
                };
                self.machine.on_camera_permission(status)
            }
            SessionCommand::GyroReading(reading) => {
                self.machine.on_gyro_reading(&reading);
                Ok(())
            }
            SessionCommand::ManualRep => self.machine.add_manual_rep(),
            SessionCommand::Skip => self.machine.skip(),
            SessionCommand::Pause => self.machine.pause(),
            SessionCommand::Resume => self.machine.resume(),
            SessionCommand::RequestStop => self.machine.request_stop(),
            SessionCommand::ConfirmStop => {
                self.machine.confirm_stop();
                Ok(())
            }
            SessionCommand::CancelStop => self.machine.cancel_stop(),
            SessionCommand::ShowReport => self.machine.show_report(),
            SessionCommand::ShowAnalytics => self.machine.show_analytics(),
            SessionCommand::RetrySubmissions => {
                self.retry_submissions().await;
                Ok(())
            }
            SessionCommand::RestartCamera => {
                self.restart_camera();
                Ok(())
            }
        };
        self.after_transition().await;
        result
    }

    /// Let time pass on the session clock
    pub async fn advance(&mut self, dt: Duration) {
        self.machine.advance(dt);
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
                self.machine.handle_pose_frame(&frame);
                self.after_transition().await;
            }
            StreamTick::Advisory(advisory) => {
                self.frame_advisory = Some(advisory);
                SessionLogger::log_advisory(
                    &self.machine.session().session_id,
                    "frame_failures",
                    &format!("{} consecutive inference failures", advisory.consecutive),
                );
                self.feedback
                    .warn("Camera is having trouble; try restarting it")
                    .await;
                self.publish();
            }
            StreamTick::Detached(reason) => {
                info!(reason = ?reason, "Pose stream detached; pausing session");
                self.suspend_for_camera();
                self.after_transition().await;
            }
            StreamTick::Ended => {
                self.suspend_for_camera();
                self.after_transition().await;
            }
            StreamTick::Failed { .. }
            | StreamTick::Empty
            | StreamTick::Discarded
            | StreamTick::Idle => {}
        }
    }

    fn suspend_for_camera(&mut self) {
        self.park_camera();
        if self.machine.suspension().is_none() && self.machine.phase().is_running_phase() {
            if let Err(error) = self.machine.pause() {
                debug!(error = %error, "Could not pause after camera detach");
            }
        }
    }

    fn park_camera(&mut self) {
        if let Some(camera) = self.processor.detach() {
            self.camera = Some(camera);
        }
    }

    fn restart_camera(&mut self) {
        info!("Restarting camera");
        self.park_camera();
        self.processor.reset_failures();
        self.frame_advisory = None;
        self.camera_failed = false;
    }

    async fn sync_stream(&mut self) {
        let wants = self.machine.wants_frames();
        if wants && !self.processor.is_attached() && !self.camera_failed {
            let Some(camera) = self.camera.take() else {
                return;
            };
            let detector = Arc::clone(&self.detector.detector);
            if let Err(error) = self.processor.attach(camera, detector).await {
                warn!(error = %error, "Camera could not be attached");
                self.camera_failed = true;
                self.park_camera();
                self.feedback
                    .warn("Camera could not start; try restarting it")
                    .await;
            }
        } else if !wants && self.processor.is_attached() {
            self.park_camera();
        }
    }

    async fn after_transition(&mut self) {
        for event in self.machine.drain_events() {
            match &event {
                SessionEvent::ExerciseCompleted { exercise_index, .. } => {
                    if let Some(result) = self.machine.exercise_result(*exercise_index) {
                        self.submit(PendingSubmission::ExerciseResult(result)).await;
                    }
                }
                SessionEvent::SessionFinished { report } => {
                    self.submit(PendingSubmission::SessionCompletion(report.clone()))
                        .await;
                }
                SessionEvent::Paused | SessionEvent::StopRequested => self.media.pause_all(),
                SessionEvent::Resumed => self.media.resume_all(),
                SessionEvent::Stopped => self.media.release_all(),
                _ => {}
            }
            self.feedback.on_event(&event).await;
        }
        self.sync_stream().await;
        self.publish();
    }

    async fn submit(&mut self, submission: PendingSubmission) {
        let session_id = self.machine.session().session_id.clone();
        let result = match &submission {
            PendingSubmission::ExerciseResult(result) => {
                self.api.submit_exercise_result(&session_id, result).await
            }
            PendingSubmission::SessionCompletion(report) => {
                self.api.complete_session(&session_id, report).await
            }
        };
        if let Err(error) = result {
            SessionLogger::log_submission_failure(
                &session_id,
                submission.operation(),
                &error.to_string(),
            );
            self.pending.push(submission);
        }
    }

    /// Retry failed training API calls; returns how many still fail
    pub async fn retry_submissions(&mut self) -> usize {
        let pending = std::mem::take(&mut self.pending);
        for submission in pending {
            self.submit(submission).await;
        }
        self.pending.len()
    }

    fn advance_clock(&mut self) {
        let now = Instant::now();
        let dt = now.saturating_duration_since(self.last_clock);
        self.last_clock = now;
        self.machine.advance(dt);
    }

    /// Drive the session until it is stopped or every handle is dropped
    pub async fn run(mut self) -> Option<SessionReport> {
        let tick = self.session_config.tick_interval();
        let watchdog = Duration::from_millis(ATTACHED_WATCHDOG_MS).max(tick);
        self.last_clock = Instant::now();
        self.sync_stream().await;
        self.publish();

        loop {
            let attached = self.processor.is_attached();
            let wait = if attached { watchdog } else { tick };

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
                        warn!(error = %error, "Session command rejected");
                    }
                }
                LoopEvent::Stream(frame) => self.handle_tick(frame).await,
                LoopEvent::Tick => self.after_transition().await,
                LoopEvent::Closed => break,
            }

            if self.machine.phase() == SessionStatus::Stopped {
                break;
            }
        }

        self.shutdown().await;
        self.machine.report().cloned()
    }

    /// Stop the session if it is still running and release every resource; idempotent
    pub async fn shutdown(&mut self) {
        if self.closed {
            return;
        }
        if self.machine.phase().is_terminal() {
            self.machine.teardown();
        } else {
            self.machine.confirm_stop();
        }
        self.after_transition().await;
        self.park_camera();
        self.media.release_all();
        self.closed = true;
        info!(
            session.id = %self.machine.session().session_id,
            status = %self.machine.status(),
            pending = self.pending.len(),
            "Session runner shut down"
        );
    }
}

enum LoopEvent {
    Command(SessionCommand),
    Stream(StreamTick),
    Tick,
    Closed,
}
