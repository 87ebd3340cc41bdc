//! Per-key turn serialization.
//!
//! A turn is a read-modify-write of one session. `SessionLocks` hands out an
//! owned async mutex guard per key: turns on the same key queue behind each
//! other, turns on different keys proceed in parallel. An entry is dropped
//! from the table once nobody holds or waits on it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::model::SessionKey;

type Slot = Arc<AsyncMutex<()>>;

/// Table of per-key turn locks.
#[derive(Default)]
pub struct SessionLocks {
    slots: Mutex<HashMap<SessionKey, Slot>>,
}

/// Held for the duration of one turn. Releases the key on drop.
pub struct TurnGuard<'a> {
    // Field order matters: the mutex guard must be released before the
    // reservation checks whether the slot is still referenced.
    _guard: OwnedMutexGuard<()>,
    _reservation: Reservation<'a>,
}

/// Interest in one key, from the start of `lock` until the turn ends.
///
/// Dropping it removes the table entry when nothing else references the
/// slot. This also runs when a waiting `lock` future is cancelled.
struct Reservation<'a> {
    key: SessionKey,
    locks: &'a SessionLocks,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait until no other turn holds `key`, then hold it.
    pub async fn lock(&self, key: &SessionKey) -> TurnGuard<'_> {
        let reservation = Reservation {
            key: key.clone(),
            locks: self,
        };
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        let guard = slot.lock_owned().await;
        TurnGuard {
            _guard: guard,
            _reservation: reservation,
        }
    }

    /// Number of keys with an active or waiting turn.
    pub fn active(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

impl Drop for Reservation<'_> {
    fn drop(&mut self) {
        let mut slots = self.locks.slots.lock().unwrap_or_else(|e| e.into_inner());
        // Only the table references the slot: nobody holds or waits on it.
        if slots
            .get(&self.key)
            .is_some_and(|slot| Arc::strong_count(slot) == 1)
        {
            slots.remove(&self.key);
        }
    }
}
