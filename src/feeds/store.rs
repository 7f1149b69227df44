//! Keyed feed state with per-key atomic updates.

use crate::types::{FeedKey, FeedState};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

/// Map from feed key to feed state.
///
/// Each state sits behind its own mutex, so updates to different feeds do not
/// contend. The map lock is always taken before a slot lock. Mutators run with
/// the slot lock held and must not block.
pub struct FeedStore {
    slots: RwLock<HashMap<FeedKey, Mutex<FeedState>>>,
    /// Counter for state epochs.
    next_epoch: AtomicU64,
}

impl FeedStore {
    pub fn new() -> Self {
        Self {
            slots: RwLock::new(HashMap::new()),
            next_epoch: AtomicU64::new(1),
        }
    }

    /// Snapshot of a feed's state.
    pub fn get(&self, key: &FeedKey) -> Option<FeedState> {
        self.slots.read().get(key).map(|slot| slot.lock().clone())
    }

    /// Read a feed's state without cloning it.
    pub fn with<R>(&self, key: &FeedKey, f: impl FnOnce(&FeedState) -> R) -> Option<R> {
        self.slots.read().get(key).map(|slot| f(&slot.lock()))
    }

    /// Atomically modify a feed's state, creating it first if needed.
    pub fn upsert<R>(&self, key: &FeedKey, mutator: impl FnOnce(&mut FeedState) -> R) -> R {
        {
            let slots = self.slots.read();
            if let Some(slot) = slots.get(key) {
                return mutator(&mut slot.lock());
            }
        }

        let mut slots = self.slots.write();
        let slot = slots.entry(key.clone()).or_insert_with(|| {
            let epoch = self.next_epoch.fetch_add(1, Ordering::SeqCst);
            tracing::debug!(feed = %key, epoch, "created feed state");
            Mutex::new(FeedState::new(epoch))
        });
        let mut state = slot.lock();
        mutator(&mut state)
    }

    /// Atomically modify an existing feed's state. Returns `None` (and never
    /// runs the mutator) if the feed does not exist.
    pub fn update<R>(&self, key: &FeedKey, mutator: impl FnOnce(&mut FeedState) -> R) -> Option<R> {
        self.slots.read().get(key).map(|slot| mutator(&mut slot.lock()))
    }

    /// Remove a feed, returning its final state.
    pub fn remove(&self, key: &FeedKey) -> Option<FeedState> {
        self.slots
            .write()
            .remove(key)
            .map(|slot| slot.into_inner())
    }

    pub fn contains(&self, key: &FeedKey) -> bool {
        self.slots.read().contains_key(key)
    }

    /// Keys of all tracked feeds, sorted.
    pub fn keys(&self) -> Vec<FeedKey> {
        let mut keys: Vec<FeedKey> = self.slots.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    pub fn len(&self) -> usize {
        self.slots.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for FeedStore {
    fn default() -> Self {
        Self::new()
    }
}
