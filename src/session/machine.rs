// ABOUTME: Single-writer session state machine driving phases, timers, and rep counting
// ABOUTME: Synchronous transitions; side effects are published as drained events
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Session State Machine
//!
//! `info → onboarding → exercise_countdown → exercise_running → rest | side_switch
//! → (next set | transition → next exercise) → finished → report → analytics`.
//!
//! Pausing and the stop confirmation are a suspension layered over the current
//! phase: the phase is kept, every timer is frozen and no frames are wanted.
//! Resuming lifts the suspension and time continues from the frozen values.
//!
//! Every phase timer is cancelled when its phase is left, and [`SessionMachine::teardown`]
//! cancels all of them regardless of the phase.

use super::events::{SessionEvent, SessionSnapshot};
use super::onboarding::Onboarding;
use super::timers::{TimerKind, Timers};
use crate::config::{AnalysisConfig, SessionConfig};
use crate::external::{ExerciseResult, PermissionStatus};
use crate::feedback::OverlayState;
use crate::logging::SessionLogger;
use coach_core::errors::{AppError, AppResult};
use coach_core::models::{
    BodySide, OnboardingStep, PoseFrame, SessionReport, SessionStatus, SetOutcome,
    TrainingSession,
};
use coach_vision::{GyroReading, RepCounter, RepEvent};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Why the session is suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Suspension {
    /// The user paused
    Paused,
    /// The stop confirmation is showing
    ConfirmingStop {
        /// The session was already paused when stop was requested
        was_paused: bool,
    },
}

const PHASE_TIMERS: [TimerKind; 6] = [
    TimerKind::Countdown,
    TimerKind::Rest,
    TimerKind::SideSwitch,
    TimerKind::Transition,
    TimerKind::AutoComplete,
    TimerKind::ExerciseDuration,
];

/// Orchestrator owning the training session
#[derive(Debug)]
pub struct SessionMachine {
    session: TrainingSession,
    config: SessionConfig,
    analysis: AnalysisConfig,
    status: SessionStatus,
    suspension: Option<Suspension>,
    onboarding: Option<Onboarding>,
    timers: Timers,
    rep_counter: Option<RepCounter>,
    target_reached: bool,
    last_countdown_secs: Option<u64>,
    form_messages: Vec<Vec<String>>,
    report: Option<SessionReport>,
    events: Vec<SessionEvent>,
}

impl SessionMachine {
    /// Wrap a freshly created session; the machine starts in `info`
    #[must_use]
    pub fn new(session: TrainingSession, config: SessionConfig, analysis: AnalysisConfig) -> Self {
        let form_messages = vec![Vec::new(); session.exercises().len()];
        Self {
            session,
            config,
            analysis,
            status: SessionStatus::Info,
            suspension: None,
            onboarding: None,
            timers: Timers::new(),
            rep_counter: None,
            target_reached: false,
            last_countdown_secs: None,
            form_messages,
            report: None,
            events: Vec::new(),
        }
    }

    /// Visible phase; `Paused` while suspended
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        if self.suspension.is_some() {
            SessionStatus::Paused
        } else {
            self.status
        }
    }

    /// Phase underneath any suspension
    #[must_use]
    pub const fn phase(&self) -> SessionStatus {
        self.status
    }

    /// Active suspension
    #[must_use]
    pub const fn suspension(&self) -> Option<Suspension> {
        self.suspension
    }

    /// Current onboarding step
    #[must_use]
    pub fn onboarding_step(&self) -> Option<OnboardingStep> {
        self.onboarding.as_ref().map(Onboarding::step)
    }

    /// Read access to the session aggregate
    #[must_use]
    pub const fn session(&self) -> &TrainingSession {
        &self.session
    }

    /// Read access to the timers
    #[must_use]
    pub const fn timers(&self) -> &Timers {
        &self.timers
    }

    /// Final report, once finished
    #[must_use]
    pub const fn report(&self) -> Option<&SessionReport> {
        self.report.as_ref()
    }

    /// Whether the pose stream should be attached
    #[must_use]
    pub fn wants_frames(&self) -> bool {
        if self.suspension.is_some() {
            return false;
        }
        match self.status {
            SessionStatus::ExerciseRunning => true,
            SessionStatus::Onboarding => self
                .onboarding
                .as_ref()
                .is_some_and(Onboarding::wants_frames),
            _ => false,
        }
    }

    /// Take the events produced since the last drain
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Result of one exercise for the training API
    #[must_use]
    pub fn exercise_result(&self, exercise_index: usize) -> Option<ExerciseResult> {
        let exercise = self.session.exercises().get(exercise_index)?;
        let progress = self.session.progress().get(exercise_index)?;
        Some(ExerciseResult {
            exercise_id: exercise.id.clone(),
            reps: progress.reps_per_set.iter().sum(),
            reps_per_set: progress.reps_per_set.clone(),
            errors: self
                .form_messages
                .get(exercise_index)
                .cloned()
                .unwrap_or_default(),
        })
    }

    /// Project the session for UIs
    #[must_use]
    pub fn snapshot(&self) -> SessionSnapshot {
        let exercise = self.session.current_exercise();
        let phase_remaining_secs = [
            TimerKind::Countdown,
            TimerKind::Rest,
            TimerKind::SideSwitch,
            TimerKind::Transition,
            TimerKind::ExerciseDuration,
        ]
        .into_iter()
        .find_map(|kind| self.timers.remaining(kind))
        .map(ceil_secs);
        SessionSnapshot {
            session_id: self.session.session_id.clone(),
            status: self.status(),
            onboarding_step: self.onboarding_step(),
            exercise_index: self.session.current_exercise_index(),
            exercise_id: exercise.id.clone(),
            set: self.session.current_set(),
            total_sets: exercise.sets,
            reps: self.session.current_reps(),
            target_reps: exercise.target_reps(),
            side: self.session.active_side(),
            phase_remaining_secs,
            elapsed_secs: self.session.elapsed_secs(),
            active_secs: self.session.active_secs(),
            calories: self.session.calories(),
            confirming_stop: matches!(self.suspension, Some(Suspension::ConfirmingStop { .. })),
            overlay: OverlayState::default(),
            pending_submissions: 0,
            frame_advisory: None,
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        self.events.push(event);
    }

    fn set_status(&mut self, to: SessionStatus) {
        let from = self.status;
        if from == to {
            return;
        }
        self.status = to;
        SessionLogger::log_phase_change(&self.session.session_id, from.as_str(), to.as_str());
        self.emit(SessionEvent::PhaseChanged { from, to });
    }

    fn ensure_active(&self, action: &str) -> AppResult<()> {
        if self.suspension.is_some() {
            return Err(AppError::invalid_transition(action, SessionStatus::Paused));
        }
        Ok(())
    }

    fn expect_phase(&self, expected: SessionStatus, action: &str) -> AppResult<()> {
        self.ensure_active(action)?;
        if self.status == expected {
            Ok(())
        } else {
            Err(AppError::invalid_transition(action, self.status))
        }
    }

    // ------------------------------------------------------------------
    // Onboarding
    // ------------------------------------------------------------------

    /// Leave the info screen and begin onboarding
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside `info`
    pub fn start(&mut self) -> AppResult<()> {
        self.expect_phase(SessionStatus::Info, "start session")?;
        let onboarding = Onboarding::full(self.session.current_exercise(), &self.analysis);
        let step = onboarding.step();
        self.onboarding = Some(onboarding);
        self.set_status(SessionStatus::Onboarding);
        self.emit(SessionEvent::OnboardingStepChanged { step });
        self.emit(SessionEvent::PlaySoundCheck);
        Ok(())
    }

    fn onboarding_mut(&mut self, action: &str) -> AppResult<&mut Onboarding> {
        self.expect_phase(SessionStatus::Onboarding, action)?;
        self.onboarding
            .as_mut()
            .ok_or_else(|| AppError::internal("onboarding phase without onboarding state"))
    }

    fn after_onboarding_step(&mut self, step: OnboardingStep) {
        self.emit(SessionEvent::OnboardingStepChanged { step });
        if step == OnboardingStep::ResumeToExercise {
            self.onboarding = None;
            self.enter_countdown();
        }
    }

    /// The user confirmed hearing the test sound
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside the sound check
    pub fn confirm_sound_check(&mut self) -> AppResult<()> {
        let step = self
            .onboarding_mut("confirm sound check")?
            .confirm_sound_check()?;
        self.after_onboarding_step(step);
        Ok(())
    }

    /// Apply the camera permission result
    ///
    /// A denial keeps onboarding on the permission step until a later grant.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside the permission step
    pub fn on_camera_permission(&mut self, status: PermissionStatus) -> AppResult<()> {
        match self
            .onboarding_mut("apply camera permission")?
            .on_camera_permission(status)?
        {
            Some(step) => self.after_onboarding_step(step),
            None => {
                SessionLogger::log_advisory(
                    &self.session.session_id,
                    "camera_permission_denied",
                    "waiting for the user to grant camera access",
                );
                self.emit(SessionEvent::CameraPermissionDenied);
            }
        }
        Ok(())
    }

    /// Feed a gyroscope reading to the rotation or level check
    pub fn on_gyro_reading(&mut self, reading: &GyroReading) {
        if self.suspension.is_some() || self.status != SessionStatus::Onboarding {
            return;
        }
        let advanced = self
            .onboarding
            .as_mut()
            .and_then(|onboarding| onboarding.on_gyro_reading(reading));
        if let Some(step) = advanced {
            self.after_onboarding_step(step);
        }
    }

    // ------------------------------------------------------------------
    // Frames and reps
    // ------------------------------------------------------------------

    /// Feed one pose frame to the position check or the rep counter
    pub fn handle_pose_frame(&mut self, frame: &PoseFrame) {
        if self.suspension.is_some() {
            return;
        }
        match self.status {
            SessionStatus::Onboarding => self.onboarding_frame(frame),
            SessionStatus::ExerciseRunning => self.running_frame(frame),
            _ => {}
        }
    }

    fn onboarding_frame(&mut self, frame: &PoseFrame) {
        let Some(onboarding) = self.onboarding.as_mut() else {
            return;
        };
        if !onboarding.wants_frames() {
            return;
        }
        let was_aligned = onboarding.is_aligned();
        let (update, advanced) = onboarding.on_pose_frame(frame);
        if update.aligned != was_aligned {
            self.emit(SessionEvent::AlignmentChanged {
                aligned: update.aligned,
            });
        }
        if let Some(step) = advanced {
            self.after_onboarding_step(step);
        }
    }

    fn running_frame(&mut self, frame: &PoseFrame) {
        let Some(counter) = self.rep_counter.as_mut() else {
            return;
        };
        match counter.on_pose_frame(frame) {
            Some(RepEvent::RepCompleted { count }) => self.record_reps(count),
            Some(RepEvent::FormError {
                confidence,
                message,
            }) => {
                let index = self.session.current_exercise_index();
                self.session.record_form_error();
                if let Some(messages) = self.form_messages.get_mut(index) {
                    messages.push(message.clone());
                }
                SessionLogger::log_advisory(&self.session.session_id, "form_error", &message);
                self.emit(SessionEvent::FormError {
                    confidence,
                    message,
                });
            }
            None => {}
        }
    }

    fn record_reps(&mut self, count: u32) {
        let exercise = self.session.current_exercise();
        let target = exercise.target_reps();
        SessionLogger::log_rep(&self.session.session_id, &exercise.id, count, target);
        self.session.set_reps(count);
        self.emit(SessionEvent::RepCompleted { count, target });

        if !self.target_reached && target.is_some_and(|target| count >= target) {
            self.target_reached = true;
            self.emit(SessionEvent::TargetReached { count });
            let delay = self.config.auto_complete_delay();
            if delay.is_zero() {
                self.finish_set();
            } else {
                self.timers.start_countdown(TimerKind::AutoComplete, delay);
            }
        }
    }

    /// Count one rep by hand, for exercises without automatic counting
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside a running set, or once the target is reached
    pub fn add_manual_rep(&mut self) -> AppResult<()> {
        self.expect_phase(SessionStatus::ExerciseRunning, "add rep")?;
        if self.target_reached {
            return Err(AppError::invalid_transition(
                "add rep",
                "target already reached",
            ));
        }
        let count = self.session.current_reps() + 1;
        self.record_reps(count);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Clock
    // ------------------------------------------------------------------

    /// Let time pass; countdown expiries are handled in order
    pub fn advance(&mut self, dt: Duration) {
        let mut left = dt;
        while !left.is_zero() {
            if self.suspension.is_some() || self.status.is_terminal() {
                return;
            }
            let step = self
                .timers
                .next_expiry()
                .map_or(left, |next| next.min(left));
            self.tick(step);
            left = left.saturating_sub(step);
        }
    }

    fn tick(&mut self, step: Duration) {
        let millis = u64::try_from(step.as_millis()).unwrap_or(u64::MAX);
        if self.timers.is_running(TimerKind::Elapsed) {
            self.session.add_elapsed(millis);
        }
        if self.timers.is_running(TimerKind::Active) {
            self.session
                .add_active(millis, self.config.kcal_per_active_minute);
        }

        let expired = self.timers.advance(step);
        self.announce_countdown();
        for kind in expired {
            self.on_timer_expired(kind);
        }
    }

    fn announce_countdown(&mut self) {
        if self.status != SessionStatus::ExerciseCountdown {
            return;
        }
        let Some(remaining) = self.timers.remaining(TimerKind::Countdown) else {
            return;
        };
        let secs = ceil_secs(remaining);
        if secs > 0 && self.last_countdown_secs != Some(secs) {
            self.last_countdown_secs = Some(secs);
            self.emit(SessionEvent::CountdownTick {
                remaining_secs: secs,
            });
        }
    }

    fn on_timer_expired(&mut self, kind: TimerKind) {
        debug!(timer = ?kind, phase = %self.status, "Timer expired");
        match (kind, self.status) {
            (TimerKind::Countdown, SessionStatus::ExerciseCountdown) => self.enter_running(),
            (
                TimerKind::AutoComplete | TimerKind::ExerciseDuration,
                SessionStatus::ExerciseRunning,
            ) => self.finish_set(),
            (TimerKind::Rest, SessionStatus::Rest)
            | (TimerKind::SideSwitch, SessionStatus::SideSwitch) => self.enter_countdown(),
            (TimerKind::Transition, SessionStatus::Transition) => self.begin_next_exercise(),
            _ => warn!(timer = ?kind, phase = %self.status, "Timer expired outside its phase"),
        }
    }

    // ------------------------------------------------------------------
    // Phases
    // ------------------------------------------------------------------

    fn cancel_phase_timers(&mut self) {
        for kind in PHASE_TIMERS {
            self.timers.cancel(kind);
        }
    }

    fn enter_countdown(&mut self) {
        self.cancel_phase_timers();
        if !self.timers.is_running(TimerKind::Elapsed) {
            self.timers.start_stopwatch(TimerKind::Elapsed);
        }
        self.timers
            .start_countdown(TimerKind::Countdown, self.config.countdown());
        self.last_countdown_secs = Some(self.config.countdown_secs);
        self.set_status(SessionStatus::ExerciseCountdown);
        self.emit(SessionEvent::CountdownTick {
            remaining_secs: self.config.countdown_secs,
        });
    }

    fn enter_running(&mut self) {
        self.cancel_phase_timers();
        let exercise = self.session.current_exercise();
        let side = self.session.active_side();
        let target = exercise.target_reps();
        let duration = exercise.duration_secs();

        self.rep_counter = match (exercise.motion, target) {
            (Some(profile), Some(target)) => {
                Some(RepCounter::new(profile, side, self.analysis.rep_counter()).with_target(target))
            }
            _ => None,
        };
        self.target_reached = false;
        self.last_countdown_secs = None;
        self.timers.start_stopwatch(TimerKind::Active);
        if let Some(secs) = duration {
            self.timers
                .start_countdown(TimerKind::ExerciseDuration, Duration::from_secs(secs));
        }

        self.set_status(SessionStatus::ExerciseRunning);
        self.emit(SessionEvent::SetStarted {
            exercise_index: self.session.current_exercise_index(),
            set: self.session.current_set(),
            side,
            target,
        });
    }

    fn finish_set(&mut self) {
        self.cancel_phase_timers();
        self.timers.cancel(TimerKind::Active);
        self.rep_counter = None;

        let exercise_index = self.session.current_exercise_index();
        let set = self.session.current_set();
        let reps = self.session.current_reps();
        let exercise = self.session.current_exercise().clone();
        let outcome = self.session.complete_set();
        info!(
            session.id = %self.session.session_id,
            exercise.id = %exercise.id,
            set,
            reps,
            outcome = ?outcome,
            "Set completed"
        );
        self.emit(SessionEvent::SetCompleted {
            exercise_index,
            set,
            reps,
        });

        match outcome {
            SetOutcome::NextSet => {
                self.session.advance_set();
                if exercise.side != BodySide::Both {
                    self.timers.start_countdown(
                        TimerKind::SideSwitch,
                        Duration::from_secs(self.config.side_switch_secs),
                    );
                    self.set_status(SessionStatus::SideSwitch);
                } else if exercise.rest_secs > 0 {
                    self.timers
                        .start_countdown(TimerKind::Rest, Duration::from_secs(exercise.rest_secs));
                    self.set_status(SessionStatus::Rest);
                } else {
                    self.enter_countdown();
                }
            }
            SetOutcome::NextExercise => {
                self.emit(SessionEvent::ExerciseCompleted {
                    exercise_index,
                    exercise_id: exercise.id,
                });
                self.timers.start_countdown(
                    TimerKind::Transition,
                    Duration::from_secs(self.config.transition_secs),
                );
                self.set_status(SessionStatus::Transition);
            }
            SetOutcome::SessionComplete => {
                self.emit(SessionEvent::ExerciseCompleted {
                    exercise_index,
                    exercise_id: exercise.id,
                });
                self.timers.cancel_all();
                let report = self.session.report();
                self.report = Some(report.clone());
                self.set_status(SessionStatus::Finished);
                self.emit(SessionEvent::SessionFinished { report });
            }
        }
    }

    fn begin_next_exercise(&mut self) {
        self.cancel_phase_timers();
        let was_horizontal = self.session.current_exercise().is_horizontal;
        if let Err(error) = self.session.advance_exercise() {
            warn!(error = %error, "No exercise to advance to; finishing session");
            self.timers.cancel_all();
            let report = self.session.report();
            self.report = Some(report.clone());
            self.set_status(SessionStatus::Finished);
            self.emit(SessionEvent::SessionFinished { report });
            return;
        }
        let exercise = self.session.current_exercise();
        if exercise.is_horizontal == was_horizontal {
            self.enter_countdown();
        } else {
            let onboarding = Onboarding::reorientation(exercise, &self.analysis);
            let step = onboarding.step();
            self.onboarding = Some(onboarding);
            self.set_status(SessionStatus::Onboarding);
            self.emit(SessionEvent::OnboardingStepChanged { step });
        }
    }

    /// End rest, side switch, or the transition preview early
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` in any other phase or while suspended
    pub fn skip(&mut self) -> AppResult<()> {
        self.ensure_active("skip")?;
        match self.status {
            SessionStatus::Rest | SessionStatus::SideSwitch => {
                self.enter_countdown();
                Ok(())
            }
            SessionStatus::Transition => {
                self.begin_next_exercise();
                Ok(())
            }
            other => Err(AppError::invalid_transition("skip", other)),
        }
    }

    // ------------------------------------------------------------------
    // Pause and stop
    // ------------------------------------------------------------------

    /// Freeze timers and stop wanting frames
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside a running phase or when already suspended
    pub fn pause(&mut self) -> AppResult<()> {
        self.ensure_active("pause")?;
        if !self.status.is_running_phase() {
            return Err(AppError::invalid_transition("pause", self.status));
        }
        self.suspension = Some(Suspension::Paused);
        self.timers.freeze();
        info!(session.id = %self.session.session_id, phase = %self.status, "Session paused");
        self.emit(SessionEvent::Paused);
        Ok(())
    }

    /// Lift a pause; timers continue from their frozen values
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` unless paused
    pub fn resume(&mut self) -> AppResult<()> {
        if self.suspension != Some(Suspension::Paused) {
            return Err(AppError::invalid_transition("resume", self.status()));
        }
        self.lift_suspension();
        Ok(())
    }

    fn lift_suspension(&mut self) {
        self.suspension = None;
        self.timers.unfreeze();
        info!(session.id = %self.session.session_id, phase = %self.status, "Session resumed");
        self.emit(SessionEvent::Resumed);
    }

    /// Show the stop confirmation; timers freeze while it is visible
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` once the session has ended
    pub fn request_stop(&mut self) -> AppResult<()> {
        if self.status.is_terminal() {
            return Err(AppError::invalid_transition("request stop", self.status));
        }
        match self.suspension {
            Some(Suspension::ConfirmingStop { .. }) => return Ok(()),
            Some(Suspension::Paused) => {
                self.suspension = Some(Suspension::ConfirmingStop { was_paused: true });
            }
            None => {
                self.suspension = Some(Suspension::ConfirmingStop { was_paused: false });
                self.timers.freeze();
            }
        }
        self.emit(SessionEvent::StopRequested);
        Ok(())
    }

    /// Dismiss the stop confirmation, returning to where the session was
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` when no confirmation is showing
    pub fn cancel_stop(&mut self) -> AppResult<()> {
        match self.suspension {
            Some(Suspension::ConfirmingStop { was_paused: true }) => {
                self.suspension = Some(Suspension::Paused);
                Ok(())
            }
            Some(Suspension::ConfirmingStop { was_paused: false }) => {
                self.lift_suspension();
                Ok(())
            }
            _ => Err(AppError::invalid_transition("cancel stop", self.status())),
        }
    }

    /// Tear the session down; calling it again is harmless
    pub fn confirm_stop(&mut self) {
        if self.status == SessionStatus::Stopped {
            return;
        }
        self.teardown();
        self.set_status(SessionStatus::Stopped);
        self.emit(SessionEvent::Stopped);
    }

    /// Cancel every timer and drop per-set state, whatever the phase
    pub fn teardown(&mut self) {
        self.timers.cancel_all();
        self.timers.unfreeze();
        self.rep_counter = None;
        self.onboarding = None;
        self.suspension = None;
    }

    // ------------------------------------------------------------------
    // After the workout
    // ------------------------------------------------------------------

    /// Move from `finished` to the report
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside `finished`
    pub fn show_report(&mut self) -> AppResult<()> {
        self.expect_phase(SessionStatus::Finished, "show report")?;
        self.set_status(SessionStatus::Report);
        Ok(())
    }

    /// Move from the report to analytics
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` outside `report`
    pub fn show_analytics(&mut self) -> AppResult<()> {
        self.expect_phase(SessionStatus::Report, "show analytics")?;
        self.set_status(SessionStatus::Analytics);
        Ok(())
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis())
        .unwrap_or(u64::MAX)
        .div_ceil(1_000)
}
