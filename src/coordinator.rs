//! The public façade tying store, pagination, streams and merge together.

use crate::error::{FeedError, Result};
use crate::feeds::FeedStore;
use crate::merge::{merge_into, MergeMode};
use crate::notify::{FeedChange, WatchConfig, WatchHandle, WatchId, Watchers, DEFAULT_BUFFER_SIZE};
use crate::pagination::{CursorPaginator, FetchTicket};
use crate::subscriptions::{
    DeliveryTarget, StreamEvent, StreamParams, StreamSink, SubscriptionHandle, SubscriptionId,
    SubscriptionManager,
};
use crate::transport::{EntityImporter, HttpTransport, NoStreaming, NoopImporter, StreamTransport};
use crate::types::{
    Entry, EntryId, FeedKey, FeedState, FeedStatus, FeedUpdate, LoadOutcome, Page,
};
use std::sync::{Arc, Weak};

/// Coordinator configuration.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Instance API root (e.g. `https://soapbox.example`), used to derive
    /// resource URLs for well-known feed keys in [`Coordinator::load`].
    pub api_base: Option<String>,

    /// Buffer size for watches that do not set their own.
    /// Default: 1000
    pub watch_buffer_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            api_base: None,
            watch_buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }
}

/// What applying one update did to a feed.
#[derive(Debug)]
enum Applied {
    Merged {
        added: usize,
        total: usize,
        has_more: bool,
    },
    Failed(FeedError),
}

/// Builder for [`Coordinator`].
pub struct CoordinatorBuilder {
    config: SyncConfig,
    http: Arc<dyn HttpTransport>,
    streaming: Arc<dyn StreamTransport>,
    importer: Arc<dyn EntityImporter>,
}

impl CoordinatorBuilder {
    pub fn config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    pub fn api_base(mut self, api_base: impl Into<String>) -> Self {
        self.config.api_base = Some(api_base.into());
        self
    }

    pub fn streaming(mut self, streaming: Arc<dyn StreamTransport>) -> Self {
        self.streaming = streaming;
        self
    }

    pub fn importer(mut self, importer: Arc<dyn EntityImporter>) -> Self {
        self.importer = importer;
        self
    }

    pub fn build(self) -> Coordinator {
        let watchers = Watchers::new(self.config.watch_buffer_size);
        Coordinator {
            inner: Arc::new(Inner {
                config: self.config,
                store: FeedStore::new(),
                paginator: CursorPaginator::new(self.http),
                streams: SubscriptionManager::new(),
                streaming: self.streaming,
                importer: self.importer,
                watchers,
            }),
        }
    }
}

/// Keeps every tracked feed in sync.
///
/// Cheap to clone; clones share the same feeds. All methods take `&self` and
/// may be called from any thread. The coordinator spawns no threads of its
/// own: fetches run on the calling thread, pushes on the transport's.
///
/// Provides:
/// - `load` / `expand` for cursor-paginated pulls
/// - `subscribe` / `unsubscribe` / `close` for push streams
/// - `dispose` to forget a feed entirely
/// - `watch` for change notifications
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

struct Inner {
    config: SyncConfig,
    store: FeedStore,
    paginator: CursorPaginator,
    streams: SubscriptionManager,
    streaming: Arc<dyn StreamTransport>,
    importer: Arc<dyn EntityImporter>,
    watchers: Watchers,
}

impl Coordinator {
    /// Coordinator with no streaming backend and no entity importer.
    pub fn new(http: Arc<dyn HttpTransport>) -> Self {
        Self::builder(http).build()
    }

    pub fn builder(http: Arc<dyn HttpTransport>) -> CoordinatorBuilder {
        CoordinatorBuilder {
            config: SyncConfig::default(),
            http,
            streaming: Arc::new(NoStreaming),
            importer: Arc::new(NoopImporter),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.inner.config
    }

    // --- Pagination ---

    /// Load the newest page of a well-known feed (see [`FeedKind`]).
    ///
    /// [`FeedKind`]: crate::FeedKind
    pub fn load(&self, key: &FeedKey) -> Result<LoadOutcome> {
        let url = self.resource_url(key)?;
        self.load_from(key, &url)
    }

    /// Load the newest page of a feed from `url` and merge it at the top.
    ///
    /// Does nothing while a fetch for the feed is in flight.
    pub fn load_from(&self, key: &FeedKey, url: &str) -> Result<LoadOutcome> {
        match self.inner.paginator.begin_first(&self.inner.store, key, url) {
            Ok(ticket) => self.run(ticket),
            Err(reason) => Ok(LoadOutcome::Skipped(reason)),
        }
    }

    /// Load the next older page and merge it at the bottom.
    ///
    /// Does nothing when the feed has no cursor or a fetch is in flight.
    pub fn expand(&self, key: &FeedKey) -> Result<LoadOutcome> {
        match self.inner.paginator.begin_next(&self.inner.store, key) {
            Ok(ticket) => self.run(ticket),
            Err(reason) => Ok(LoadOutcome::Skipped(reason)),
        }
    }

    fn resource_url(&self, key: &FeedKey) -> Result<String> {
        let kind = key
            .kind()
            .ok_or_else(|| FeedError::UnknownFeed(key.to_string()))?;
        let api_base = self
            .inner
            .config
            .api_base
            .as_deref()
            .ok_or_else(|| FeedError::Config("api_base is not set".to_string()))?;
        kind.resource_url(api_base)
    }

    fn run(&self, ticket: FetchTicket) -> Result<LoadOutcome> {
        self.inner.watchers.broadcast(
            &ticket.key,
            FeedChange::Status {
                status: FeedStatus::Loading,
            },
        );

        let update = match self.inner.paginator.execute(&ticket) {
            Ok(page) => {
                self.inner.importer.import(&ticket.key, &page.entries);
                FeedUpdate::Loaded {
                    page,
                    mode: ticket.mode,
                }
            }
            Err(e) => FeedUpdate::Failed(e),
        };

        let failure = match &update {
            FeedUpdate::Failed(e) => Some(e.clone()),
            _ => None,
        };

        let applied = self
            .inner
            .store
            .update(&ticket.key, |state| {
                if state.epoch != ticket.epoch {
                    return None;
                }
                Some(apply_update(state, update))
            })
            .flatten();

        match applied {
            Some(Applied::Merged {
                added,
                total,
                has_more,
            }) => {
                tracing::debug!(feed = %ticket.key, added, total, has_more, "page applied");
                self.inner.notify_merge(&ticket.key, FeedStatus::Loaded, added, total);
                Ok(LoadOutcome::Applied { added, has_more })
            }
            Some(Applied::Failed(e)) => {
                tracing::warn!(feed = %ticket.key, error = %e, "fetch failed");
                self.inner.watchers.broadcast(
                    &ticket.key,
                    FeedChange::Status {
                        status: FeedStatus::Error,
                    },
                );
                Err(e)
            }
            None => {
                tracing::debug!(feed = %ticket.key, epoch = ticket.epoch, "feed disposed during fetch, result discarded");
                match failure {
                    Some(e) => Err(e),
                    None => Ok(LoadOutcome::Discarded),
                }
            }
        }
    }

    // --- Streaming ---

    /// Open a push subscription for a feed, replacing any existing one.
    ///
    /// Each pushed entry is merged at the top of the feed. Calls for one key
    /// are expected from one thread at a time: a `dispose` racing a
    /// `subscribe` still inside the transport's `connect` leaves that
    /// connection registered until the next `unsubscribe` or `dispose`.
    pub fn subscribe(&self, key: &FeedKey, params: StreamParams) -> Result<SubscriptionHandle> {
        self.unsubscribe(key);

        let id = self.inner.streams.allocate_id();
        self.inner.store.upsert(key, |state| {
            state.subscription = Some(id);
            state.connected = false;
            state.last_stream_error = None;
        });

        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        let target: Weak<dyn DeliveryTarget> = weak;
        let sink = StreamSink::new(id, key.clone(), target);

        match self
            .inner
            .streams
            .open(self.inner.streaming.as_ref(), &params, sink)
        {
            Ok(handle) => Ok(handle),
            Err(e) => {
                tracing::warn!(feed = %key, error = %e, "subscription failed");
                self.inner.store.update(key, |state| {
                    if state.subscription == Some(id) {
                        state.subscription = None;
                        state.last_stream_error = Some(e.to_string());
                    }
                });
                Err(e)
            }
        }
    }

    /// Close the feed's subscription, if any. Entries and cursor are kept.
    ///
    /// Returns whether a subscription was closed.
    pub fn unsubscribe(&self, key: &FeedKey) -> bool {
        let was_connected = self
            .inner
            .store
            .update(key, |state| {
                state.subscription = None;
                std::mem::replace(&mut state.connected, false)
            })
            .unwrap_or(false);

        if was_connected {
            self.inner
                .watchers
                .broadcast(key, FeedChange::Connection { connected: false });
        }

        self.inner.streams.close_key(key).is_some()
    }

    /// Close one subscription. Idempotent; a handle that was already
    /// replaced or closed is ignored.
    pub fn close(&self, handle: &SubscriptionHandle) -> bool {
        let was_connected = self
            .inner
            .store
            .update(&handle.key, |state| {
                if state.subscription != Some(handle.id) {
                    return false;
                }
                state.subscription = None;
                std::mem::replace(&mut state.connected, false)
            })
            .unwrap_or(false);

        if was_connected {
            self.inner
                .watchers
                .broadcast(&handle.key, FeedChange::Connection { connected: false });
        }

        self.inner.streams.close(handle)
    }

    // --- Lifecycle ---

    /// Unsubscribe and forget the feed. A fetch still in flight for it will
    /// complete but its result is dropped.
    pub fn dispose(&self, key: &FeedKey) -> bool {
        self.unsubscribe(key);

        match self.inner.store.remove(key) {
            Some(state) => {
                tracing::debug!(feed = %key, entries = state.entries.len(), "feed disposed");
                self.inner.watchers.broadcast(key, FeedChange::Disposed);
                true
            }
            None => false,
        }
    }

    // --- Inspection ---

    pub fn state(&self, key: &FeedKey) -> Option<FeedState> {
        self.inner.store.get(key)
    }

    /// Entry ids of a feed, newest first. Empty for unknown feeds.
    pub fn entries(&self, key: &FeedKey) -> Vec<EntryId> {
        self.inner
            .store
            .with(key, |state| state.entries.clone())
            .unwrap_or_default()
    }

    pub fn status(&self, key: &FeedKey) -> Option<FeedStatus> {
        self.inner.store.with(key, |state| state.status)
    }

    pub fn is_connected(&self, key: &FeedKey) -> bool {
        self.inner
            .store
            .with(key, |state| state.connected)
            .unwrap_or(false)
    }

    pub fn has_more(&self, key: &FeedKey) -> bool {
        self.inner
            .store
            .with(key, FeedState::has_more)
            .unwrap_or(false)
    }

    /// All tracked feeds, sorted.
    pub fn feeds(&self) -> Vec<FeedKey> {
        self.inner.store.keys()
    }

    pub fn subscription_count(&self) -> usize {
        self.inner.streams.subscription_count()
    }

    // --- Notifications ---

    /// Watch feed changes. Without an explicit `buffer_size` the watch uses
    /// [`SyncConfig::watch_buffer_size`].
    pub fn watch(&self, config: WatchConfig) -> WatchHandle {
        self.inner.watchers.watch(config)
    }

    pub fn unwatch(&self, id: WatchId) {
        self.inner.watchers.unwatch(id)
    }
}

impl Inner {
    fn notify_merge(&self, key: &FeedKey, status: FeedStatus, added: usize, total: usize) {
        self.watchers.broadcast(key, FeedChange::Status { status });
        if added > 0 {
            self.watchers
                .broadcast(key, FeedChange::Entries { added, total });
        }
    }

    fn is_current(&self, id: SubscriptionId, key: &FeedKey) -> bool {
        self.store
            .with(key, |state| state.subscription == Some(id))
            .unwrap_or(false)
    }

    fn push_entry(&self, id: SubscriptionId, key: &FeedKey, entry: Entry) -> bool {
        if !self.is_current(id, key) {
            return false;
        }
        self.importer.import(key, std::slice::from_ref(&entry));

        let entry_id = entry.id.clone();
        let applied = self
            .store
            .update(key, |state| {
                if state.subscription != Some(id) {
                    return None;
                }
                Some(apply_update(state, FeedUpdate::Pushed(entry)))
            })
            .flatten();

        match applied {
            Some(Applied::Merged { added, total, .. }) => {
                tracing::trace!(feed = %key, entry = %entry_id, added, "pushed entry");
                if added > 0 {
                    self.watchers
                        .broadcast(key, FeedChange::Entries { added, total });
                }
                true
            }
            _ => false,
        }
    }

    fn set_connection(&self, id: SubscriptionId, key: &FeedKey, connected: bool, error: Option<String>) -> bool {
        let changed = self.store.update(key, |state| {
            if state.subscription != Some(id) {
                return None;
            }
            if let Some(message) = &error {
                state.last_stream_error = Some(message.clone());
            }
            Some(std::mem::replace(&mut state.connected, connected) != connected)
        });

        match changed.flatten() {
            Some(changed) => {
                if changed {
                    tracing::debug!(feed = %key, connected, "stream connection changed");
                    self.watchers
                        .broadcast(key, FeedChange::Connection { connected });
                }
                true
            }
            None => false,
        }
    }
}

impl DeliveryTarget for Inner {
    fn deliver(&self, id: SubscriptionId, key: &FeedKey, event: StreamEvent) -> bool {
        match event {
            StreamEvent::Entry { entry } => self.push_entry(id, key, entry),
            StreamEvent::Opened => self.set_connection(id, key, true, None),
            StreamEvent::Closed => self.set_connection(id, key, false, None),
            StreamEvent::Error { message } => {
                tracing::warn!(feed = %key, subscription = %id, error = %message, "stream error");
                self.set_connection(id, key, false, Some(message))
            }
        }
    }
}

/// Apply one update to a feed. Runs under the feed's lock; either the whole
/// update lands or, for failures, only status and error change.
fn apply_update(state: &mut FeedState, update: FeedUpdate) -> Applied {
    match update {
        FeedUpdate::Loaded { page, mode } => {
            let Page {
                entries,
                next_cursor,
            } = page;
            let ids: Vec<EntryId> = entries.into_iter().map(|e| e.id).collect();
            let added = merge_into(&mut state.entries, &ids, mode);
            state.cursor = next_cursor;
            state.status = FeedStatus::Loaded;
            state.last_error = None;
            Applied::Merged {
                added,
                total: state.entries.len(),
                has_more: state.cursor.is_some(),
            }
        }
        FeedUpdate::Failed(e) => {
            state.status = FeedStatus::Error;
            state.last_error = Some(e.clone());
            Applied::Failed(e)
        }
        FeedUpdate::Pushed(entry) => {
            let added = merge_into(
                &mut state.entries,
                std::slice::from_ref(&entry.id),
                MergeMode::Prepend,
            );
            Applied::Merged {
                added,
                total: state.entries.len(),
                has_more: state.cursor.is_some(),
            }
        }
    }
}
