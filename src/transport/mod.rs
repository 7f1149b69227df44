//! Seams to the outside world.
//!
//! The core never opens sockets itself. Fetches go through an
//! [`HttpTransport`], push connections through a [`StreamTransport`], and
//! entry payloads are handed to an [`EntityImporter`].

#[cfg(feature = "http")]
mod reqwest_http;

#[cfg(feature = "http")]
pub use reqwest_http::{HttpConfig, ReqwestTransport};

use crate::error::Result;
use crate::subscriptions::{StreamParams, StreamSink};
use crate::types::{Entry, FeedKey};

/// A raw HTTP response, reduced to what pagination needs.
#[derive(Clone, Debug, Default)]
pub struct HttpResponse {
    pub status: u16,
    /// Value of the `Link` header, if any.
    pub link: Option<String>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// 200 response with a JSON body.
    pub fn ok(body: impl Into<Vec<u8>>) -> Self {
        Self {
            status: 200,
            link: None,
            body: body.into(),
        }
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues GET requests.
///
/// Implementations return `Err` only when no response was obtained at all;
/// non-2xx responses are returned as `Ok` and classified by the caller.
pub trait HttpTransport: Send + Sync {
    fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// A live push connection.
pub trait StreamConnection: Send {
    /// Tear the connection down. Called at most once.
    fn close(&mut self);
}

/// Opens push connections.
///
/// The transport owns reconnection. Every event it receives for the
/// connection is handed to `sink`, in order.
pub trait StreamTransport: Send + Sync {
    fn connect(
        &self,
        key: &FeedKey,
        params: &StreamParams,
        sink: StreamSink,
    ) -> Result<Box<dyn StreamConnection>>;
}

/// Receives full entry payloads for the external entity store.
pub trait EntityImporter: Send + Sync {
    fn import(&self, key: &FeedKey, entries: &[Entry]);
}

/// Importer that discards payloads.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopImporter;

impl EntityImporter for NoopImporter {
    fn import(&self, _key: &FeedKey, _entries: &[Entry]) {}
}

/// Stream transport with no streaming backend. Every connect fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoStreaming;

impl StreamTransport for NoStreaming {
    fn connect(
        &self,
        key: &FeedKey,
        _params: &StreamParams,
        _sink: StreamSink,
    ) -> Result<Box<dyn StreamConnection>> {
        Err(crate::error::FeedError::Stream(format!(
            "no stream transport configured for {}",
            key
        )))
    }
}
