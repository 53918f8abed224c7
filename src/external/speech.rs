// ABOUTME: Audio cue and text-to-speech service used by the feedback dispatcher
// ABOUTME: A single channel; callers check busy state instead of queueing
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::feedback::FeedbackKind;
use async_trait::async_trait;
use coach_core::errors::AppResult;

/// Speech engine and cue player
#[async_trait]
pub trait SpeechService: Send + Sync {
    /// Load voices and audio assets; called once per process
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot start
    async fn warm_up(&self) -> AppResult<()>;

    /// Start speaking an utterance
    ///
    /// # Errors
    ///
    /// Returns an error if playback cannot start
    async fn speak(&self, text: &str) -> AppResult<()>;

    /// Whether an utterance or cue is still playing
    fn is_busy(&self) -> bool;

    /// Play the short sound associated with a cue kind
    ///
    /// # Errors
    ///
    /// Returns an error if playback cannot start
    async fn play_cue(&self, kind: FeedbackKind) -> AppResult<()>;
}
