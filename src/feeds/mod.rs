//! Per-feed state storage.
//!
//! The [`FeedStore`] is the only place feed state lives. Every change goes
//! through an atomic read-modify-write on one key, so a status transition and
//! the entry-list edit that goes with it are always observed together.

mod store;

pub use store::FeedStore;
