//! Change notifications for feed consumers.
//!
//! Views re-render when their feed changes. A watch delivers a
//! [`FeedEvent`] for every status transition, merge, connection change and
//! disposal of the feeds it selects. Buffers are bounded; a watcher that
//! falls behind is dropped rather than slowing down synchronization.
//!
//! # Example
//!
//! ```ignore
//! let watch = coordinator.watch(WatchConfig::feed(FeedKey::quotes("123")));
//!
//! loop {
//!     match watch.recv() {
//!         Ok(FeedEvent::Changed { key, change }) => println!("{}: {:?}", key, change),
//!         Ok(FeedEvent::Dropped { .. }) | Err(_) => break,
//!     }
//! }
//! ```

mod types;
mod watchers;

pub use types::{DropReason, FeedChange, FeedEvent, WatchConfig, WatchHandle, WatchId};
pub use watchers::{Watchers, DEFAULT_BUFFER_SIZE};
