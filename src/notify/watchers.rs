//! Broadcasting feed changes to watchers.

use crossbeam_channel::{bounded, Sender};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{DropReason, FeedChange, FeedEvent, WatchConfig, WatchHandle, WatchId};
use crate::types::FeedKey;

/// Watch buffer size used when nothing else is configured.
pub const DEFAULT_BUFFER_SIZE: usize = 1000;

struct Watcher {
    config: WatchConfig,
    sender: Sender<FeedEvent>,
}

impl Watcher {
    /// Try to send an event. Returns false if the buffer is full or the
    /// receiver is gone.
    fn try_send(&self, event: FeedEvent) -> bool {
        self.sender.try_send(event).is_ok()
    }
}

/// Fans feed changes out to watchers.
pub struct Watchers {
    watchers: RwLock<HashMap<WatchId, Watcher>>,
    next_id: AtomicU64,
    default_buffer_size: usize,
}

impl Watchers {
    /// `default_buffer_size` applies to watches that do not set their own.
    pub fn new(default_buffer_size: usize) -> Self {
        Self {
            watchers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            default_buffer_size,
        }
    }

    pub fn watch(&self, config: WatchConfig) -> WatchHandle {
        let id = WatchId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let capacity = config.buffer_size.unwrap_or(self.default_buffer_size);
        let (sender, receiver) = bounded(capacity.max(1));

        self.watchers.write().insert(id, Watcher { config, sender });

        WatchHandle { id, receiver }
    }

    pub fn unwatch(&self, id: WatchId) {
        if let Some(watcher) = self.watchers.write().remove(&id) {
            let _ = watcher.sender.try_send(FeedEvent::Dropped {
                reason: DropReason::Unwatched,
            });
        }
    }

    pub fn watcher_count(&self) -> usize {
        self.watchers.read().len()
    }

    /// Send a change to every watcher interested in `key`. Watchers that
    /// cannot take it are dropped.
    pub fn broadcast(&self, key: &FeedKey, change: FeedChange) {
        let mut to_remove = Vec::new();

        {
            let watchers = self.watchers.read();
            if watchers.is_empty() {
                return;
            }
            let event = FeedEvent::Changed {
                key: key.clone(),
                change,
            };
            for (id, watcher) in watchers.iter() {
                if watcher.config.matches(key) && !watcher.try_send(event.clone()) {
                    to_remove.push(*id);
                }
            }
        }

        if !to_remove.is_empty() {
            let mut watchers = self.watchers.write();
            for id in to_remove {
                if let Some(watcher) = watchers.remove(&id) {
                    tracing::warn!(watch = id.0, "dropping slow watcher");
                    let _ = watcher.sender.try_send(FeedEvent::Dropped {
                        reason: DropReason::BufferOverflow,
                    });
                }
            }
        }
    }
}

impl Default for Watchers {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}
