//! Push subscriptions.
//!
//! A subscription binds one feed to a long-lived connection opened through a
//! [`StreamTransport`](crate::StreamTransport). The transport pushes events
//! into a [`StreamSink`]; each new entry is merged at the top of the feed.
//!
//! Guarantees:
//! - At most one live subscription per feed; opening another closes the first
//! - Events are applied in the order the transport pushes them
//! - Once a subscription is closed, none of its events are applied
//!
//! # Example
//!
//! ```ignore
//! let handle = coordinator.subscribe(
//!     &FeedKey::remote("mastodon.example", false),
//!     StreamParams::remote("mastodon.example", false),
//! )?;
//!
//! // ... the transport calls sink.entry(..) as statuses arrive ...
//!
//! coordinator.close(&handle);
//! ```

mod manager;
mod types;

pub use manager::SubscriptionManager;
pub use types::{
    DeliveryTarget, StreamEvent, StreamParams, StreamSink, SubscriptionHandle, SubscriptionId,
};
