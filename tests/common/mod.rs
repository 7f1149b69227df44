//! Shared test transports.

#![allow(dead_code)]

use crossbeam_channel::{bounded, Receiver, Sender};
use feedsync::{
    Entry, EntityImporter, FeedError, FeedKey, HttpResponse, HttpTransport, Result,
    StreamConnection, StreamParams, StreamSink, StreamTransport,
};
use parking_lot::Mutex;
use serde_json::json;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const API: &str = "https://soapbox.example";

/// Send library logs to the test output. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}

/// JSON body for a page of entries.
pub fn body(ids: &[&str]) -> String {
    let items: Vec<_> = ids
        .iter()
        .map(|id| json!({"id": id, "content": format!("status {}", id)}))
        .collect();
    serde_json::to_string(&items).unwrap()
}

/// 200 response with the given ids and an optional `next` link.
pub fn page(ids: &[&str], next: Option<&str>) -> HttpResponse {
    let response = HttpResponse::ok(body(ids));
    match next {
        Some(next) => response.with_link(format!(
            r#"<{}>; rel="next", <{}/newer>; rel="prev""#,
            next, API
        )),
        None => response,
    }
}

pub fn status(code: u16, text: &str) -> HttpResponse {
    HttpResponse {
        status: code,
        link: None,
        body: text.as_bytes().to_vec(),
    }
}

/// A request parked until the test releases it.
pub struct Held {
    entered: Receiver<()>,
    release: Sender<()>,
}

impl Held {
    pub fn wait_entered(&self) {
        self.entered
            .recv_timeout(Duration::from_secs(5))
            .expect("request never arrived");
    }

    pub fn release(&self) {
        self.release.send(()).unwrap();
    }
}

struct Hold {
    entered: Sender<()>,
    release: Receiver<()>,
}

/// Scripted HTTP transport.
#[derive(Default)]
pub struct MockHttp {
    queued: Mutex<HashMap<String, VecDeque<Result<HttpResponse>>>>,
    sticky: Mutex<HashMap<String, HttpResponse>>,
    holds: Mutex<HashMap<String, Hold>>,
    requests: Mutex<Vec<String>>,
}

impl MockHttp {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Serve `response` once for `url`.
    pub fn queue(&self, url: &str, response: HttpResponse) {
        self.queue_result(url, Ok(response));
    }

    pub fn queue_result(&self, url: &str, result: Result<HttpResponse>) {
        self.queued
            .lock()
            .entry(url.to_string())
            .or_default()
            .push_back(result);
    }

    /// Serve `response` for `url` whenever nothing is queued.
    pub fn set(&self, url: &str, response: HttpResponse) {
        self.sticky.lock().insert(url.to_string(), response);
    }

    /// Park the next request to `url` until released.
    pub fn hold(&self, url: &str) -> Held {
        let (entered_tx, entered_rx) = bounded(1);
        let (release_tx, release_rx) = bounded(1);
        self.holds.lock().insert(
            url.to_string(),
            Hold {
                entered: entered_tx,
                release: release_rx,
            },
        );
        Held {
            entered: entered_rx,
            release: release_tx,
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

impl HttpTransport for MockHttp {
    fn get(&self, url: &str) -> Result<HttpResponse> {
        self.requests.lock().push(url.to_string());

        let queued = self
            .queued
            .lock()
            .get_mut(url)
            .and_then(|queue| queue.pop_front());
        let result = match queued {
            Some(result) => result,
            None => match self.sticky.lock().get(url) {
                Some(response) => Ok(response.clone()),
                None => Ok(status(404, "Record not found")),
            },
        };

        // The response is chosen; now wait as if it were still on the wire.
        let hold = self.holds.lock().remove(url);
        if let Some(hold) = hold {
            let _ = hold.entered.send(());
            let _ = hold.release.recv_timeout(Duration::from_secs(5));
        }

        result
    }
}

/// One connection opened through [`MockStreaming`].
pub struct MockConnection {
    pub key: FeedKey,
    pub params: StreamParams,
    pub sink: StreamSink,
    pub closed: Arc<AtomicBool>,
}

struct ClosingConnection {
    closed: Arc<AtomicBool>,
}

impl StreamConnection for ClosingConnection {
    fn close(&mut self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Stream transport that hands sinks to the test.
#[derive(Default)]
pub struct MockStreaming {
    connections: Mutex<Vec<Arc<MockConnection>>>,
    refuse: AtomicBool,
    announce_open: AtomicBool,
}

impl MockStreaming {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Make future connects fail.
    pub fn refuse(&self, refuse: bool) {
        self.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Push `Opened` from inside `connect`, as a transport that connects
    /// synchronously would.
    pub fn announce_open(&self, announce: bool) {
        self.announce_open.store(announce, Ordering::SeqCst);
    }

    /// Most recent connection for `key`.
    pub fn last(&self, key: &FeedKey) -> Arc<MockConnection> {
        self.connections
            .lock()
            .iter()
            .rev()
            .find(|c| &c.key == key)
            .cloned()
            .expect("no connection for key")
    }

    pub fn connect_count(&self) -> usize {
        self.connections.lock().len()
    }

    pub fn open_count(&self) -> usize {
        self.connections
            .lock()
            .iter()
            .filter(|c| !c.closed.load(Ordering::SeqCst))
            .count()
    }
}

impl StreamTransport for MockStreaming {
    fn connect(
        &self,
        key: &FeedKey,
        params: &StreamParams,
        sink: StreamSink,
    ) -> Result<Box<dyn StreamConnection>> {
        if self.refuse.load(Ordering::SeqCst) {
            return Err(FeedError::Stream("connection refused".to_string()));
        }

        if self.announce_open.load(Ordering::SeqCst) {
            sink.opened();
        }

        let closed = Arc::new(AtomicBool::new(false));
        self.connections.lock().push(Arc::new(MockConnection {
            key: key.clone(),
            params: params.clone(),
            sink,
            closed: Arc::clone(&closed),
        }));

        Ok(Box::new(ClosingConnection { closed }))
    }
}

/// Importer that records everything it is given.
#[derive(Default)]
pub struct RecordingImporter {
    pub imported: Mutex<Vec<(FeedKey, Entry)>>,
}

impl RecordingImporter {
    pub fn ids(&self) -> Vec<String> {
        self.imported
            .lock()
            .iter()
            .map(|(_, e)| e.id.as_str().to_string())
            .collect()
    }
}

impl EntityImporter for RecordingImporter {
    fn import(&self, key: &FeedKey, entries: &[Entry]) {
        let mut imported = self.imported.lock();
        for entry in entries {
            imported.push((key.clone(), entry.clone()));
        }
    }
}

pub fn ids(items: &[&str]) -> Vec<feedsync::EntryId> {
    items.iter().map(|s| feedsync::EntryId::from(*s)).collect()
}
