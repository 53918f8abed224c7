// ABOUTME: Registry of live media players for pause, resume, and release broadcasting
// ABOUTME: Registration returns a disposer; dropping it unregisters the player
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::external::MediaPlayer;
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::debug;

#[derive(Default)]
struct Inner {
    next_id: u64,
    players: HashMap<u64, Arc<dyn MediaPlayer>>,
}

/// Owned set of media players, shared by cloning
#[derive(Clone, Default)]
pub struct MediaRegistry {
    inner: Arc<Mutex<Inner>>,
}

impl fmt::Debug for MediaRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaRegistry")
            .field("players", &self.len())
            .finish()
    }
}

impl MediaRegistry {
    /// Create an empty registry
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a player; it stays registered until the returned disposer is dropped
    #[must_use = "dropping the registration unregisters the player immediately"]
    pub fn register(&self, player: Arc<dyn MediaPlayer>) -> MediaRegistration {
        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        inner.players.insert(id, player);
        debug!(player_id = id, "Media player registered");
        MediaRegistration {
            id,
            registry: Arc::downgrade(&self.inner),
        }
    }

    /// Registered player count
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().players.len()
    }

    /// Whether no player is registered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // Players are called outside the lock so they may register or dispose in callbacks.
    fn snapshot(&self) -> Vec<Arc<dyn MediaPlayer>> {
        self.lock().players.values().cloned().collect()
    }

    /// Pause every player
    pub fn pause_all(&self) {
        let players = self.snapshot();
        debug!(count = players.len(), "Pausing media players");
        for player in players {
            player.pause();
        }
    }

    /// Resume every player
    pub fn resume_all(&self) {
        let players = self.snapshot();
        debug!(count = players.len(), "Resuming media players");
        for player in players {
            player.resume();
        }
    }

    /// Release every player and empty the registry
    pub fn release_all(&self) {
        let players: Vec<_> = self.lock().players.drain().map(|(_, player)| player).collect();
        debug!(count = players.len(), "Releasing media players");
        for player in players {
            player.release();
        }
    }
}

/// Disposer returned by [`MediaRegistry::register`]
#[derive(Debug)]
pub struct MediaRegistration {
    id: u64,
    registry: Weak<Mutex<Inner>>,
}

impl MediaRegistration {
    /// Unregister now
    pub fn dispose(self) {
        drop(self);
    }

    fn unregister(&self) {
        if let Some(inner) = self.registry.upgrade() {
            let removed = inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .players
                .remove(&self.id);
            if removed.is_some() {
                debug!(player_id = self.id, "Media player unregistered");
            }
        }
    }
}

impl Drop for MediaRegistration {
    fn drop(&mut self) {
        self.unregister();
    }
}
