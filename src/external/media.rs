// ABOUTME: Media player interface for demonstration videos and music
// ABOUTME: Players are paused, resumed, and released together through the media registry
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// A playing media element owned by the UI layer
pub trait MediaPlayer: Send + Sync {
    /// Pause playback
    fn pause(&self);
    /// Continue playback
    fn resume(&self);
    /// Stop playback and free the player
    fn release(&self);
}
