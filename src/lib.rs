//! # Feed Sync
//!
//! Keeps ordered, deduplicated lists of entries for named feeds (a status's
//! quotes, a remote instance's timeline, a search result set) in sync from two
//! independent sources: cursor-paginated fetches and a live push stream.
//!
//! ## Core Concepts
//!
//! - **Feeds**: Keyed, independent state records (status, entry ids, cursor)
//! - **Pagination**: First-page loads and `rel="next"` cursor expands
//! - **Subscriptions**: One push connection per feed, closed with a strict barrier
//! - **Merge**: Deterministic prepend/append that never duplicates an entry
//!
//! ## Example
//!
//! ```ignore
//! use feedsync::{Coordinator, FeedKey, StreamParams};
//!
//! let coordinator = Coordinator::builder(http)
//!     .api_base("https://soapbox.example")
//!     .streaming(streaming)
//!     .build();
//!
//! let key = FeedKey::remote("mastodon.example", false);
//! coordinator.load(&key)?;
//! coordinator.subscribe(&key, StreamParams::remote("mastodon.example", false))?;
//!
//! // Scrolled to the bottom
//! coordinator.expand(&key)?;
//!
//! // View closed
//! coordinator.dispose(&key);
//! ```

pub mod coordinator;
pub mod endpoints;
pub mod error;
pub mod feeds;
pub mod merge;
pub mod notify;
pub mod pagination;
pub mod subscriptions;
pub mod transport;
pub mod types;

// Re-exports
pub use coordinator::{Coordinator, CoordinatorBuilder, SyncConfig};
pub use endpoints::FeedKind;
pub use error::{FeedError, Result};
pub use feeds::FeedStore;
pub use merge::{merge, merge_into, MergeMode};
pub use notify::{DropReason, FeedChange, FeedEvent, WatchConfig, WatchHandle, WatchId};
pub use pagination::{CursorPaginator, Fetch, FetchTicket};
pub use subscriptions::{
    DeliveryTarget, StreamEvent, StreamParams, StreamSink, SubscriptionHandle, SubscriptionId,
    SubscriptionManager,
};
pub use transport::{
    EntityImporter, HttpResponse, HttpTransport, NoStreaming, NoopImporter, StreamConnection,
    StreamTransport,
};
#[cfg(feature = "http")]
pub use transport::{HttpConfig, ReqwestTransport};
pub use types::*;
