// ABOUTME: Hold-time debounce for boolean signals driven by frame timestamps
// ABOUTME: Confirms a rising edge once it has persisted, at most once per window
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

/// Debounces a boolean signal and latches its confirmation
///
/// A window opens on the first `true` sample and closes on the first `false`.
/// Within one window the confirmation fires exactly once, after the signal has
/// been continuously `true` for `hold_ms`.
#[derive(Debug, Clone)]
pub struct HoldLatch {
    hold_ms: u64,
    since_ms: Option<u64>,
    fired: bool,
}

impl HoldLatch {
    /// Create a latch requiring `hold_ms` of continuous signal
    #[must_use]
    pub const fn new(hold_ms: u64) -> Self {
        Self {
            hold_ms,
            since_ms: None,
            fired: false,
        }
    }

    /// Feed one sample; returns `true` only on the sample that confirms the window
    pub fn update(&mut self, active: bool, now_ms: u64) -> bool {
        if !active {
            self.reset();
            return false;
        }
        let since = *self.since_ms.get_or_insert(now_ms);
        if !self.fired && now_ms.saturating_sub(since) >= self.hold_ms {
            self.fired = true;
            return true;
        }
        false
    }

    /// Close the current window
    pub fn reset(&mut self) {
        self.since_ms = None;
        self.fired = false;
    }

    /// Whether a window is open
    #[must_use]
    pub const fn is_holding(&self) -> bool {
        self.since_ms.is_some()
    }

    /// Whether the current window has already been confirmed
    #[must_use]
    pub const fn is_confirmed(&self) -> bool {
        self.fired
    }

    /// Time held so far in the current window
    #[must_use]
    pub fn held_ms(&self, now_ms: u64) -> u64 {
        self.since_ms.map_or(0, |since| now_ms.saturating_sub(since))
    }
}
