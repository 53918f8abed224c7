// ABOUTME: Explicit timer handles owned by the session state machine
// ABOUTME: One timer per concern; freezing stops every timer without losing its value
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Concern a timer serves; at most one timer per kind exists
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimerKind {
    /// Workout wall time, excluding pauses
    Elapsed,
    /// Time inside running sets
    Active,
    /// Pre-set countdown
    Countdown,
    /// Rest between sets
    Rest,
    /// Pause between the sides of a one-sided exercise
    SideSwitch,
    /// Preview of the next exercise
    Transition,
    /// Confirmation delay after the rep target is reached
    AutoComplete,
    /// Length of a duration-based set
    ExerciseDuration,
}

/// Identity of one started timer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerHandle(u64);

#[derive(Debug, Clone)]
struct Timer {
    handle: TimerHandle,
    elapsed: Duration,
    limit: Option<Duration>,
}

/// The machine's timer set
#[derive(Debug, Clone, Default)]
pub struct Timers {
    timers: BTreeMap<TimerKind, Timer>,
    next_handle: u64,
    frozen: bool,
}

impl Timers {
    /// Create an empty, running timer set
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, kind: TimerKind, limit: Option<Duration>) -> TimerHandle {
        let handle = TimerHandle(self.next_handle);
        self.next_handle += 1;
        self.timers.insert(
            kind,
            Timer {
                handle,
                elapsed: Duration::ZERO,
                limit,
            },
        );
        handle
    }

    /// Start a countdown, replacing any timer of the same kind
    pub fn start_countdown(&mut self, kind: TimerKind, duration: Duration) -> TimerHandle {
        self.insert(kind, Some(duration))
    }

    /// Start a stopwatch, replacing any timer of the same kind
    pub fn start_stopwatch(&mut self, kind: TimerKind) -> TimerHandle {
        self.insert(kind, None)
    }

    /// Cancel one timer; returns whether it was running
    pub fn cancel(&mut self, kind: TimerKind) -> bool {
        self.timers.remove(&kind).is_some()
    }

    /// Cancel every timer
    pub fn cancel_all(&mut self) {
        self.timers.clear();
    }

    /// Whether a timer of this kind exists
    #[must_use]
    pub fn is_running(&self, kind: TimerKind) -> bool {
        self.timers.contains_key(&kind)
    }

    /// Handle of the current timer of this kind
    #[must_use]
    pub fn handle(&self, kind: TimerKind) -> Option<TimerHandle> {
        self.timers.get(&kind).map(|timer| timer.handle)
    }

    /// Time accumulated by a timer
    #[must_use]
    pub fn elapsed(&self, kind: TimerKind) -> Option<Duration> {
        self.timers.get(&kind).map(|timer| timer.elapsed)
    }

    /// Time left on a countdown
    #[must_use]
    pub fn remaining(&self, kind: TimerKind) -> Option<Duration> {
        let timer = self.timers.get(&kind)?;
        timer.limit.map(|limit| limit.saturating_sub(timer.elapsed))
    }

    /// Kinds currently running, in kind order
    #[must_use]
    pub fn active(&self) -> Vec<TimerKind> {
        self.timers.keys().copied().collect()
    }

    /// Soonest countdown expiry
    #[must_use]
    pub fn next_expiry(&self) -> Option<Duration> {
        self.timers
            .values()
            .filter_map(|timer| timer.limit.map(|limit| limit.saturating_sub(timer.elapsed)))
            .min()
    }

    /// Stop time for every timer
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    /// Let time run again
    pub fn unfreeze(&mut self) {
        self.frozen = false;
    }

    /// Whether time is stopped
    #[must_use]
    pub const fn is_frozen(&self) -> bool {
        self.frozen
    }

    /// Advance every timer; expired countdowns are removed and returned in kind order
    pub fn advance(&mut self, dt: Duration) -> Vec<TimerKind> {
        if self.frozen {
            return Vec::new();
        }
        let mut expired = Vec::new();
        for (kind, timer) in &mut self.timers {
            timer.elapsed += dt;
            if timer.limit.is_some_and(|limit| timer.elapsed >= limit) {
                expired.push(*kind);
            }
        }
        for kind in &expired {
            self.timers.remove(kind);
        }
        expired
    }
}
