// ABOUTME: Throttled audio cues and overlay state driven by session events
// ABOUTME: Per-channel cooldown, drop-when-busy playback, and a once-per-process speech warm-up
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Feedback Dispatcher
//!
//! Each [`FeedbackKind`] is its own audio channel with a cooldown. A cue that
//! arrives while the speech engine is still talking is dropped, never queued, so
//! utterances cannot overlap or pile up behind a fast rep sequence.

use crate::config::FeedbackConfig;
use crate::external::SpeechService;
use crate::session::SessionEvent;
use coach_core::errors::AppResult;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Audio channel of a cue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedbackKind {
    /// A rep was counted
    Rep,
    /// Form or camera problem
    Warning,
    /// Progress praise
    Encouragement,
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Rep => "rep",
            Self::Warning => "warning",
            Self::Encouragement => "encouragement",
        })
    }
}

/// What happened to a cue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The cue started playing
    Played,
    /// The channel played a cue too recently
    CooldownActive,
    /// The speech engine was still talking; the cue was dropped
    ChannelBusy,
    /// Warm-up or playback failed
    Failed,
}

/// Visual feedback rendered over the camera preview
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlayState {
    /// Reps in the current set
    pub rep_count: u32,
    /// Rep target of the current set
    pub target: Option<u32>,
    /// Required silhouette filled
    pub aligned: bool,
    /// Active form or camera warning
    pub warning: Option<String>,
    /// Last cue that played
    pub last_cue: Option<FeedbackKind>,
}

/// One-time speech engine warm-up shared by every dispatcher using it
pub struct SpeechWarmUp {
    done: OnceCell<()>,
}

impl SpeechWarmUp {
    /// Create an unfired warm-up guard
    #[must_use]
    pub const fn new() -> Self {
        Self {
            done: OnceCell::const_new(),
        }
    }

    /// Whether warm-up has completed
    #[must_use]
    pub fn is_done(&self) -> bool {
        self.done.initialized()
    }

    /// Warm the engine up unless that already happened; failures are retried on the next call
    ///
    /// # Errors
    ///
    /// Returns the engine's warm-up error
    pub async fn ensure(&self, speech: &dyn SpeechService) -> AppResult<()> {
        self.done
            .get_or_try_init(|| async {
                debug!("Warming up speech engine");
                speech.warm_up().await
            })
            .await?;
        Ok(())
    }
}

impl Default for SpeechWarmUp {
    fn default() -> Self {
        Self::new()
    }
}

/// Process-wide speech warm-up
pub static SPEECH_WARM_UP: SpeechWarmUp = SpeechWarmUp::new();

/// Cue dispatcher with per-channel cooldowns
pub struct FeedbackDispatcher {
    speech: Arc<dyn SpeechService>,
    warm_up: &'static SpeechWarmUp,
    cooldown: Duration,
    announce_reps: bool,
    last_played: HashMap<FeedbackKind, Instant>,
    overlay: OverlayState,
}

impl FeedbackDispatcher {
    /// Create a dispatcher using the process-wide warm-up
    #[must_use]
    pub fn new(speech: Arc<dyn SpeechService>, config: &FeedbackConfig) -> Self {
        Self::with_warm_up(speech, config, &SPEECH_WARM_UP)
    }

    /// Create a dispatcher with its own warm-up guard
    #[must_use]
    pub fn with_warm_up(
        speech: Arc<dyn SpeechService>,
        config: &FeedbackConfig,
        warm_up: &'static SpeechWarmUp,
    ) -> Self {
        Self {
            speech,
            warm_up,
            cooldown: config.cooldown(),
            announce_reps: config.announce_reps,
            last_played: HashMap::new(),
            overlay: OverlayState::default(),
        }
    }

    /// Current overlay
    #[must_use]
    pub const fn overlay(&self) -> &OverlayState {
        &self.overlay
    }

    /// Play a cue, optionally followed by an utterance
    pub async fn notify(&mut self, kind: FeedbackKind, utterance: Option<&str>) -> DispatchOutcome {
        if let Err(error) = self.warm_up.ensure(self.speech.as_ref()).await {
            warn!(cue = %kind, error = %error, "Speech warm-up failed");
            return DispatchOutcome::Failed;
        }

        let now = Instant::now();
        if self
            .last_played
            .get(&kind)
            .is_some_and(|last| now.duration_since(*last) < self.cooldown)
        {
            debug!(cue = %kind, "Cue suppressed by cooldown");
            return DispatchOutcome::CooldownActive;
        }
        if self.speech.is_busy() {
            debug!(cue = %kind, "Cue dropped; speech channel busy");
            return DispatchOutcome::ChannelBusy;
        }

        if let Err(error) = self.speech.play_cue(kind).await {
            warn!(cue = %kind, error = %error, "Cue playback failed");
            return DispatchOutcome::Failed;
        }
        if let Some(text) = utterance {
            if let Err(error) = self.speech.speak(text).await {
                warn!(cue = %kind, error = %error, "Speech playback failed");
                return DispatchOutcome::Failed;
            }
        }
        self.last_played.insert(kind, now);
        self.overlay.last_cue = Some(kind);
        DispatchOutcome::Played
    }

    /// Update the overlay from a session event and play the matching cue, if any
    pub async fn on_event(&mut self, event: &SessionEvent) -> Option<DispatchOutcome> {
        match event {
            SessionEvent::RepCompleted { count, target } => {
                self.overlay.rep_count = *count;
                self.overlay.target = *target;
                let spoken = count.to_string();
                let utterance = self.announce_reps.then_some(spoken.as_str());
                Some(self.notify(FeedbackKind::Rep, utterance).await)
            }
            SessionEvent::FormError { message, .. } => {
                self.overlay.warning = Some(message.clone());
                Some(self.notify(FeedbackKind::Warning, Some(message)).await)
            }
            SessionEvent::TargetReached { .. } => {
                Some(self.notify(FeedbackKind::Encouragement, Some("Great job!")).await)
            }
            SessionEvent::SetStarted { target, .. } => {
                self.overlay.rep_count = 0;
                self.overlay.target = *target;
                self.overlay.warning = None;
                None
            }
            SessionEvent::AlignmentChanged { aligned } => {
                self.overlay.aligned = *aligned;
                None
            }
            SessionEvent::SessionFinished { .. } => Some(
                self.notify(FeedbackKind::Encouragement, Some("Workout complete"))
                    .await,
            ),
            _ => None,
        }
    }

    /// Surface a camera problem to the user
    pub async fn warn(&mut self, message: &str) -> DispatchOutcome {
        self.overlay.warning = Some(message.to_owned());
        self.notify(FeedbackKind::Warning, Some(message)).await
    }
}
