//! Error handling and edge case tests.

mod common;

use common::{ids, init_tracing, page, status, MockHttp, MockStreaming, API};
use feedsync::{
    Coordinator, FeedError, FeedKey, FeedStatus, HttpResponse, LoadOutcome, SkipReason,
    StreamParams,
};
use std::sync::Arc;

const QUOTES: &str = "https://soapbox.example/api/v1/pleroma/statuses/7/quotes";
const QUOTES_OLDER: &str = "https://soapbox.example/api/v1/pleroma/statuses/7/quotes?max_id=8";

fn setup() -> (Arc<MockHttp>, Arc<MockStreaming>, Coordinator) {
    init_tracing();
    let http = MockHttp::new();
    let streaming = MockStreaming::new();
    let coordinator = Coordinator::builder(http.clone())
        .api_base(API)
        .streaming(streaming.clone())
        .build();
    (http, streaming, coordinator)
}

// --- Fetch Errors ---

#[test]
fn test_failing_expand_preserves_state() {
    let (http, _streaming, coordinator) = setup();
    let key = FeedKey::quotes("7");

    http.queue(QUOTES, page(&["10", "9"], Some(QUOTES_OLDER)));
    http.queue(QUOTES_OLDER, status(502, "Bad Gateway"));
    coordinator.load(&key).unwrap();
    let before = coordinator.state(&key).unwrap();

    let result = coordinator.expand(&key);
    let expected = FeedError::Network {
        status: Some(502),
        body: "Bad Gateway".to_string(),
    };
    assert_eq!(result, Err(expected.clone()));

    let after = coordinator.state(&key).unwrap();
    assert_eq!(after.entries, before.entries);
    assert_eq!(after.cursor, before.cursor);
    assert_eq!(after.status, FeedStatus::Error);
    assert_eq!(after.last_error, Some(expected));
}

#[test]
fn test_retry_after_error_clears_it() {
    let (http, _streaming, coordinator) = setup();
    let key = FeedKey::quotes("7");

    http.queue(QUOTES, page(&["10", "9"], Some(QUOTES_OLDER)));
    http.queue(QUOTES_OLDER, status(500, "oops"));
    http.queue(QUOTES_OLDER, page(&["8"], None));

    coordinator.load(&key).unwrap();
    assert!(coordinator.expand(&key).is_err());

    // No automatic retry happened.
    assert_eq!(http.request_count(), 2);

    let outcome = coordinator.expand(&key).unwrap();
    assert_eq!(outcome, LoadOutcome::Applied { added: 1, has_more: false });

    let state = coordinator.state(&key).unwrap();
    assert_eq!(state.entries, ids(&["10", "9", "8"]));
    assert_eq!(state.status, FeedStatus::Loaded);
    assert_eq!(state.last_error, None);
}

#[test]
fn test_transport_failure_has_no_status() {
    let (http, _streaming, coordinator) = setup();
    let key = FeedKey::quotes("7");

    http.queue_result(QUOTES, Err(FeedError::transport("connection reset")));

    let result = coordinator.load(&key);
    assert!(matches!(result, Err(FeedError::Network { status: None, .. })));
    assert_eq!(coordinator.status(&key), Some(FeedStatus::Error));
    assert!(coordinator.entries(&key).is_empty());
}

#[test]
fn test_malformed_body_is_decode_error() {
    let (http, _streaming, coordinator) = setup();
    let key = FeedKey::quotes("7");

    http.queue(QUOTES, HttpResponse::ok(r#"{"error":"not a list"}"#));
    assert!(matches!(coordinator.load(&key), Err(FeedError::Decode(_))));

    http.queue(QUOTES, HttpResponse::ok(r#"[{"id":"1"},{"content":"no id"}]"#));
    assert!(matches!(coordinator.load(&key), Err(FeedError::Decode(_))));

    // Partially decodable pages are rejected whole.
    assert!(coordinator.entries(&key).is_empty());
    assert_eq!(coordinator.status(&key), Some(FeedStatus::Error));
}

#[test]
fn test_bad_next_link_leaves_entries_untouched() {
    let (http, _streaming, coordinator) = setup();
    let key = FeedKey::quotes("7");

    http.queue(QUOTES, page(&["10", "9"], Some(QUOTES_OLDER)));
    http.queue(
        QUOTES_OLDER,
        HttpResponse::ok(r#"[{"id":"8"}]"#).with_link(r#"<http://[broken>; rel="next""#),
    );

    coordinator.load(&key).unwrap();
    let result = coordinator.expand(&key);
    assert!(matches!(result, Err(FeedError::InvalidCursor(_))));

    let state = coordinator.state(&key).unwrap();
    assert_eq!(state.entries, ids(&["10", "9"]));
    assert_eq!(state.cursor.unwrap().as_str(), QUOTES_OLDER);
}

#[test]
fn test_error_state_allows_new_load() {
    let (http, _streaming, coordinator) = setup();
    let key = FeedKey::quotes("7");

    http.queue(QUOTES, status(503, "unavailable"));
    http.queue(QUOTES, page(&["1"], None));

    assert!(coordinator.load(&key).is_err());
    assert_eq!(
        coordinator.load(&key).unwrap(),
        LoadOutcome::Applied { added: 1, has_more: false }
    );
}

// --- No-ops ---

#[test]
fn test_expand_unknown_feed_is_noop() {
    let (http, _streaming, coordinator) = setup();
    let key = FeedKey::quotes("7");

    assert_eq!(
        coordinator.expand(&key).unwrap(),
        LoadOutcome::Skipped(SkipReason::Exhausted)
    );
    assert!(coordinator.state(&key).is_none());
    assert_eq!(http.request_count(), 0);
}

#[test]
fn test_unknown_key_needs_explicit_url() {
    let (http, _streaming, coordinator) = setup();
    let key = FeedKey::from("bookmarks");

    assert!(matches!(coordinator.load(&key), Err(FeedError::UnknownFeed(_))));

    let url = "https://soapbox.example/api/v1/bookmarks";
    http.queue(url, page(&["b"], None));
    coordinator.load_from(&key, url).unwrap();
    assert_eq!(coordinator.entries(&key), ids(&["b"]));
}

// --- Stream Errors ---

#[test]
fn test_refused_subscription() {
    let (_http, streaming, coordinator) = setup();
    let key = FeedKey::quotes("7");
    streaming.refuse(true);

    let result = coordinator.subscribe(&key, StreamParams::new("user"));
    assert!(matches!(result, Err(FeedError::Stream(_))));
    assert_eq!(coordinator.subscription_count(), 0);
    assert_eq!(coordinator.state(&key).unwrap().subscription, None);

    streaming.refuse(false);
    coordinator.subscribe(&key, StreamParams::new("user")).unwrap();
    assert_eq!(coordinator.subscription_count(), 1);
}

#[test]
fn test_stream_error_does_not_touch_fetch_state() {
    let (http, streaming, coordinator) = setup();
    let key = FeedKey::quotes("7");

    http.queue(QUOTES, page(&["2", "1"], Some(QUOTES_OLDER)));
    coordinator.load(&key).unwrap();
    coordinator.subscribe(&key, StreamParams::new("user")).unwrap();

    streaming.last(&key).sink.error("handshake failed");

    let state = coordinator.state(&key).unwrap();
    assert_eq!(state.status, FeedStatus::Loaded);
    assert_eq!(state.last_error, None);
    assert_eq!(state.entries, ids(&["2", "1"]));
    assert_eq!(state.last_stream_error.as_deref(), Some("handshake failed"));
}
