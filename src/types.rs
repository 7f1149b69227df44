//! Core types for feed synchronization.

use crate::error::{FeedError, Result};
use crate::merge::MergeMode;
use crate::subscriptions::SubscriptionId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque identifier of one feed instance (e.g. `quotes:123`).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedKey(pub String);

impl FeedKey {
    pub fn new(key: impl Into<String>) -> Self {
        FeedKey(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FeedKey({})", self.0)
    }
}

impl fmt::Display for FeedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for FeedKey {
    fn from(s: &str) -> Self {
        FeedKey(s.to_string())
    }
}

impl From<String> for FeedKey {
    fn from(s: String) -> Self {
        FeedKey(s)
    }
}

/// Identity of one entry within a feed.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub String);

impl EntryId {
    pub fn new(id: impl Into<String>) -> Self {
        EntryId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntryId({})", self.0)
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for EntryId {
    fn from(s: &str) -> Self {
        EntryId(s.to_string())
    }
}

/// An entry as delivered by a fetch or a push.
///
/// The payload is never interpreted here; it is handed to the
/// [`EntityImporter`](crate::EntityImporter) as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    pub payload: serde_json::Value,
}

impl Entry {
    /// Entry with an empty payload.
    pub fn bare(id: impl Into<String>) -> Self {
        Self {
            id: EntryId::new(id),
            payload: serde_json::Value::Null,
        }
    }

    /// Build an entry from a JSON object carrying an `id` field.
    ///
    /// String ids are taken verbatim, integer ids are rendered in decimal.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let id = match value.get("id") {
            Some(serde_json::Value::String(s)) if !s.is_empty() => s.clone(),
            Some(serde_json::Value::Number(n)) if n.is_u64() || n.is_i64() => n.to_string(),
            Some(other) => {
                return Err(FeedError::Decode(format!("unusable entry id: {}", other)));
            }
            None => return Err(FeedError::Decode("entry without id".to_string())),
        };

        Ok(Self {
            id: EntryId(id),
            payload: value,
        })
    }
}

/// Continuation token for the next (older) page. Holds the absolute URL
/// taken from the `rel="next"` link.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Cursor(pub String);

impl Cursor {
    pub fn new(url: impl Into<String>) -> Self {
        Cursor(url.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Cursor({})", self.0)
    }
}

/// One page of a cursor-paginated fetch.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Page {
    /// Entries in response order (newest first).
    pub entries: Vec<Entry>,
    /// Where the next older page starts, `None` at end of feed.
    pub next_cursor: Option<Cursor>,
}

impl Page {
    pub fn ids(&self) -> Vec<EntryId> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }
}

/// Lifecycle of a feed's fetch state.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    #[default]
    Idle,
    Loading,
    Loaded,
    Error,
}

/// Per-feed state.
#[derive(Clone, Debug, PartialEq)]
pub struct FeedState {
    pub status: FeedStatus,

    /// Entry ids, newest first, no duplicates.
    pub entries: Vec<EntryId>,

    /// Cursor for the next older page.
    pub cursor: Option<Cursor>,

    /// Last fetch failure, cleared by the next successful fetch.
    pub last_error: Option<FeedError>,

    /// Subscription currently allowed to deliver into this feed.
    pub subscription: Option<SubscriptionId>,

    /// Whether the push connection reported itself open. UI only.
    pub connected: bool,

    /// Last error reported by the push connection.
    pub last_stream_error: Option<String>,

    /// Generation assigned by the store when this state was created.
    pub epoch: u64,
}

impl FeedState {
    pub(crate) fn new(epoch: u64) -> Self {
        Self {
            status: FeedStatus::Idle,
            entries: Vec::new(),
            cursor: None,
            last_error: None,
            subscription: None,
            connected: false,
            last_stream_error: None,
            epoch,
        }
    }

    pub fn is_loading(&self) -> bool {
        self.status == FeedStatus::Loading
    }

    pub fn has_more(&self) -> bool {
        self.cursor.is_some()
    }
}

/// The closed set of results that may change a feed.
#[derive(Clone, Debug)]
pub enum FeedUpdate {
    /// A fetch completed; merge its page with the given mode.
    Loaded { page: Page, mode: MergeMode },
    /// A fetch failed.
    Failed(FeedError),
    /// The push stream delivered an entry.
    Pushed(Entry),
}

/// Why a `load`/`expand` call did nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SkipReason {
    /// A fetch for this feed is already in flight.
    AlreadyLoading,
    /// No cursor: nothing older to fetch.
    Exhausted,
}

/// Result of a successful `load`/`expand` call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoadOutcome {
    /// No request was sent.
    Skipped(SkipReason),
    /// The page was merged into the feed.
    Applied { added: usize, has_more: bool },
    /// The feed was disposed while the request was in flight.
    Discarded,
}

impl LoadOutcome {
    pub fn is_skipped(&self) -> bool {
        matches!(self, LoadOutcome::Skipped(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entry_from_string_id() {
        let entry = Entry::from_value(json!({"id": "abc", "content": "hi"})).unwrap();
        assert_eq!(entry.id, EntryId::from("abc"));
        assert_eq!(entry.payload["content"], "hi");
    }

    #[test]
    fn test_entry_from_integer_id() {
        let entry = Entry::from_value(json!({"id": 42})).unwrap();
        assert_eq!(entry.id.as_str(), "42");
    }

    #[test]
    fn test_entry_without_id() {
        let result = Entry::from_value(json!({"content": "hi"}));
        assert!(matches!(result, Err(FeedError::Decode(_))));

        let result = Entry::from_value(json!({"id": ""}));
        assert!(matches!(result, Err(FeedError::Decode(_))));

        let result = Entry::from_value(json!({"id": 1.5}));
        assert!(matches!(result, Err(FeedError::Decode(_))));
    }

    #[test]
    fn test_new_state_is_idle() {
        let state = FeedState::new(7);
        assert_eq!(state.status, FeedStatus::Idle);
        assert!(state.entries.is_empty());
        assert!(!state.has_more());
        assert_eq!(state.epoch, 7);
    }
}
