//! Change notification types.

use crate::types::{FeedKey, FeedStatus};
use serde::{Deserialize, Serialize};

/// Configuration for a watch.
#[derive(Clone, Debug, Default)]
pub struct WatchConfig {
    /// Max buffered events before the watcher is dropped.
    /// Default: the coordinator's `watch_buffer_size`
    pub buffer_size: Option<usize>,

    /// Only report these feeds (None = all feeds).
    pub keys: Option<Vec<FeedKey>>,
}

impl WatchConfig {
    /// Watch a single feed.
    pub fn feed(key: FeedKey) -> Self {
        Self {
            keys: Some(vec![key]),
            ..Default::default()
        }
    }

    pub(crate) fn matches(&self, key: &FeedKey) -> bool {
        match &self.keys {
            Some(keys) => keys.contains(key),
            None => true,
        }
    }
}

/// What changed in a feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedChange {
    Status { status: FeedStatus },
    /// Entries were merged in.
    Entries { added: usize, total: usize },
    /// The push connection opened or went away.
    Connection { connected: bool },
    Disposed,
}

/// Events received by watchers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    Changed { key: FeedKey, change: FeedChange },

    /// The watch ended.
    Dropped { reason: DropReason },
}

/// Why a watch was ended.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unwatched.
    Unwatched,
}

/// Unique identifier for a watch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct WatchId(pub u64);

/// Handle to receive feed events.
pub struct WatchHandle {
    pub id: WatchId,
    pub receiver: crossbeam_channel::Receiver<FeedEvent>,
}

impl WatchHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<FeedEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<FeedEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Receive with timeout.
    pub fn recv_timeout(
        &self,
        timeout: std::time::Duration,
    ) -> Result<FeedEvent, crossbeam_channel::RecvTimeoutError> {
        self.receiver.recv_timeout(timeout)
    }

    /// Everything currently buffered.
    pub fn drain(&self) -> Vec<FeedEvent> {
        self.receiver.try_iter().collect()
    }
}
