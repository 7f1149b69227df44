//! Push subscription types.

use crate::types::{Entry, FeedKey};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Weak;

/// Unique identifier for a push subscription.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubscriptionId(pub u64);

impl fmt::Debug for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SubscriptionId({})", self.0)
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle returned by `subscribe`, used to close that subscription.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    pub key: FeedKey,
}

/// Parameters for the streaming collaborator, opaque to the core.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamParams {
    /// Stream name (e.g. `public:remote`).
    pub stream: String,
    pub params: BTreeMap<String, String>,
}

impl StreamParams {
    pub fn new(stream: impl Into<String>) -> Self {
        Self {
            stream: stream.into(),
            params: BTreeMap::new(),
        }
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(name.into(), value.into());
        self
    }

    /// Public timeline of a remote instance.
    pub fn remote(instance: &str, only_media: bool) -> Self {
        let stream = if only_media {
            "public:remote:media"
        } else {
            "public:remote"
        };
        Self::new(stream).with("instance", instance)
    }
}

/// Events a stream transport hands to its sink.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    /// A newly created entry.
    Entry { entry: Entry },

    // --- Lifecycle Events ---
    /// Connection (re)established.
    Opened,
    /// Connection lost or closed by the remote end.
    Closed,
    /// Transport error.
    Error { message: String },
}

/// Receives events on behalf of subscriptions.
pub trait DeliveryTarget: Send + Sync {
    /// Apply one event. Returns `false` if the subscription is no longer
    /// current and the event was dropped.
    fn deliver(&self, id: SubscriptionId, key: &FeedKey, event: StreamEvent) -> bool;
}

/// Where a stream transport pushes events for one subscription.
///
/// Holds only a weak reference to its target, so a transport that outlives
/// the coordinator keeps nothing alive and its events are dropped.
#[derive(Clone)]
pub struct StreamSink {
    id: SubscriptionId,
    key: FeedKey,
    target: Weak<dyn DeliveryTarget>,
}

impl StreamSink {
    pub fn new(id: SubscriptionId, key: FeedKey, target: Weak<dyn DeliveryTarget>) -> Self {
        Self { id, key, target }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn key(&self) -> &FeedKey {
        &self.key
    }

    /// Forward an event. Returns `false` once the subscription is closed; a
    /// transport may stop its receive loop then.
    pub fn push(&self, event: StreamEvent) -> bool {
        match self.target.upgrade() {
            Some(target) => target.deliver(self.id, &self.key, event),
            None => false,
        }
    }

    pub fn entry(&self, entry: Entry) -> bool {
        self.push(StreamEvent::Entry { entry })
    }

    pub fn opened(&self) -> bool {
        self.push(StreamEvent::Opened)
    }

    pub fn closed(&self) -> bool {
        self.push(StreamEvent::Closed)
    }

    pub fn error(&self, message: impl Into<String>) -> bool {
        self.push(StreamEvent::Error {
            message: message.into(),
        })
    }
}

impl fmt::Debug for StreamSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamSink")
            .field("id", &self.id)
            .field("key", &self.key)
            .finish()
    }
}
