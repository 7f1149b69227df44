//! Issues first-page and next-page fetches for a feed.

use super::links::next_cursor;
use crate::error::{FeedError, Result};
use crate::feeds::FeedStore;
use crate::merge::MergeMode;
use crate::transport::{HttpResponse, HttpTransport};
use crate::types::{Entry, FeedKey, FeedStatus, Page, SkipReason};
use std::sync::Arc;

/// Longest response body quoted in a network error.
const MAX_ERROR_BODY: usize = 512;

/// An in-flight fetch: which feed generation asked, and how to merge.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchTicket {
    pub key: FeedKey,
    pub epoch: u64,
    pub url: String,
    pub mode: MergeMode,
}

/// What a fetch call did.
#[derive(Debug)]
pub enum Fetch {
    /// Nothing was requested.
    Skipped(SkipReason),
    /// A request was made; the feed was marked `Loading` for it.
    Completed {
        ticket: FetchTicket,
        result: Result<Page>,
    },
}

/// Issues fetches, guarding against concurrent ones per feed.
///
/// The guard check and the transition to `Loading` happen in a single store
/// update, so two racing callers can never both pass it. Applying the result
/// (and leaving `Loading`) is the caller's job.
pub struct CursorPaginator {
    http: Arc<dyn HttpTransport>,
}

impl CursorPaginator {
    pub fn new(http: Arc<dyn HttpTransport>) -> Self {
        Self { http }
    }

    /// Fetch the newest page from `base_url`.
    pub fn fetch_first(&self, store: &FeedStore, key: &FeedKey, base_url: &str) -> Fetch {
        match self.begin_first(store, key, base_url) {
            Ok(ticket) => self.complete(ticket),
            Err(reason) => Fetch::Skipped(reason),
        }
    }

    /// Fetch the page after the stored cursor.
    pub fn fetch_next(&self, store: &FeedStore, key: &FeedKey) -> Fetch {
        match self.begin_next(store, key) {
            Ok(ticket) => self.complete(ticket),
            Err(reason) => Fetch::Skipped(reason),
        }
    }

    /// Check the guard for a first-page fetch and mark the feed `Loading`.
    pub fn begin_first(
        &self,
        store: &FeedStore,
        key: &FeedKey,
        base_url: &str,
    ) -> std::result::Result<FetchTicket, SkipReason> {
        let begun = store.upsert(key, |state| {
            if state.is_loading() {
                return Err(SkipReason::AlreadyLoading);
            }
            state.status = FeedStatus::Loading;
            Ok(FetchTicket {
                key: key.clone(),
                epoch: state.epoch,
                url: base_url.to_string(),
                mode: MergeMode::Prepend,
            })
        });

        if let Err(reason) = &begun {
            tracing::debug!(feed = %key, ?reason, "load skipped");
        }
        begun
    }

    /// Check the guard for a next-page fetch and mark the feed `Loading`.
    /// Feeds that do not exist are treated as exhausted.
    pub fn begin_next(
        &self,
        store: &FeedStore,
        key: &FeedKey,
    ) -> std::result::Result<FetchTicket, SkipReason> {
        let begun = store
            .update(key, |state| {
                if state.is_loading() {
                    return Err(SkipReason::AlreadyLoading);
                }
                let Some(cursor) = state.cursor.as_ref() else {
                    return Err(SkipReason::Exhausted);
                };
                let ticket = FetchTicket {
                    key: key.clone(),
                    epoch: state.epoch,
                    url: cursor.as_str().to_string(),
                    mode: MergeMode::Append,
                };
                state.status = FeedStatus::Loading;
                Ok(ticket)
            })
            .unwrap_or(Err(SkipReason::Exhausted));

        if let Err(reason) = &begun {
            tracing::debug!(feed = %key, ?reason, "expand skipped");
        }
        begun
    }

    /// Perform the request for a ticket obtained from `begin_*`.
    pub fn execute(&self, ticket: &FetchTicket) -> Result<Page> {
        tracing::debug!(feed = %ticket.key, url = %ticket.url, mode = ?ticket.mode, "fetching page");
        let response = self.http.get(&ticket.url)?;
        decode_page(&response, &ticket.url)
    }

    fn complete(&self, ticket: FetchTicket) -> Fetch {
        let result = self.execute(&ticket);
        Fetch::Completed { ticket, result }
    }
}

/// Turn a response into a page.
pub fn decode_page(response: &HttpResponse, url: &str) -> Result<Page> {
    if !response.is_success() {
        let body = String::from_utf8_lossy(&response.body);
        let body: String = body.chars().take(MAX_ERROR_BODY).collect();
        return Err(FeedError::Network {
            status: Some(response.status),
            body,
        });
    }

    let value: serde_json::Value = serde_json::from_slice(&response.body)?;
    let serde_json::Value::Array(items) = value else {
        return Err(FeedError::Decode("response body is not an array".to_string()));
    };

    let entries = items
        .into_iter()
        .map(Entry::from_value)
        .collect::<Result<Vec<_>>>()?;

    let next_cursor = next_cursor(response.link.as_deref(), url)?;

    Ok(Page {
        entries,
        next_cursor,
    })
}
