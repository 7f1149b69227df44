//! Registry of live push connections, at most one per feed.

use crate::error::Result;
use crate::transport::{StreamConnection, StreamTransport};
use crate::types::FeedKey;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use super::types::{StreamParams, StreamSink, SubscriptionHandle, SubscriptionId};

/// Internal subscription state.
struct ActiveStream {
    id: SubscriptionId,
    params: StreamParams,
    connection: Box<dyn StreamConnection>,
}

/// Owns push connections by feed key.
///
/// Connections are always torn down outside the registry lock, since a
/// transport may wait for its receive loop to finish.
pub struct SubscriptionManager {
    streams: Mutex<HashMap<FeedKey, ActiveStream>>,
    /// Counter for generating subscription IDs.
    next_id: AtomicU64,
}

impl SubscriptionManager {
    pub fn new() -> Self {
        Self {
            streams: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    /// Reserve an id for a subscription about to be opened.
    pub fn allocate_id(&self) -> SubscriptionId {
        SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    /// Connect through `transport` and register the connection under the
    /// sink's key. Any connection already registered for that key is closed.
    pub fn open(
        &self,
        transport: &dyn StreamTransport,
        params: &StreamParams,
        sink: StreamSink,
    ) -> Result<SubscriptionHandle> {
        let id = sink.id();
        let key = sink.key().clone();

        let connection = transport.connect(&key, params, sink)?;

        let replaced = self.streams.lock().insert(
            key.clone(),
            ActiveStream {
                id,
                params: params.clone(),
                connection,
            },
        );

        if let Some(mut old) = replaced {
            tracing::debug!(feed = %key, old = %old.id, new = %id, "replacing subscription");
            old.connection.close();
        }

        tracing::debug!(feed = %key, subscription = %id, stream = %params.stream, "subscription opened");
        Ok(SubscriptionHandle { id, key })
    }

    /// Close whatever subscription is registered for `key`.
    pub fn close_key(&self, key: &FeedKey) -> Option<SubscriptionId> {
        let removed = self.streams.lock().remove(key);
        removed.map(|mut stream| {
            stream.connection.close();
            tracing::debug!(feed = %key, subscription = %stream.id, "subscription closed");
            stream.id
        })
    }

    /// Close the subscription named by `handle`, if it is still the one
    /// registered for its key. Returns whether anything was closed.
    pub fn close(&self, handle: &SubscriptionHandle) -> bool {
        let removed = {
            let mut streams = self.streams.lock();
            let current = streams.get(&handle.key).map(|s| s.id);
            if current == Some(handle.id) {
                streams.remove(&handle.key)
            } else {
                None
            }
        };

        match removed {
            Some(mut stream) => {
                stream.connection.close();
                tracing::debug!(feed = %handle.key, subscription = %handle.id, "subscription closed");
                true
            }
            None => false,
        }
    }

    /// Id of the subscription registered for `key`.
    pub fn active(&self, key: &FeedKey) -> Option<SubscriptionId> {
        self.streams.lock().get(key).map(|s| s.id)
    }

    /// Parameters the subscription for `key` was opened with.
    pub fn params(&self, key: &FeedKey) -> Option<StreamParams> {
        self.streams.lock().get(key).map(|s| s.params.clone())
    }

    pub fn subscription_count(&self) -> usize {
        self.streams.lock().len()
    }

    /// Close every connection.
    pub fn close_all(&self) {
        let drained: Vec<(FeedKey, ActiveStream)> = self.streams.lock().drain().collect();
        for (key, mut stream) in drained {
            stream.connection.close();
            tracing::debug!(feed = %key, subscription = %stream.id, "subscription closed");
        }
    }
}

impl Default for SubscriptionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.close_all();
    }
}
