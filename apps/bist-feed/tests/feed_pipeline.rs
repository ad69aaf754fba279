//! Feed Pipeline Integration Tests
//!
//! Drives the whole pipeline through a local TCP peer: transport, framing,
//! routing, ordered workers, decoders, state store and event fan-out.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use rust_decimal::Decimal;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::time::timeout;

use bist_feed::infrastructure::broadcast::LogLevel;
use bist_feed::infrastructure::feed::{ConnectionState, UnknownReason};
use bist_feed::{
    DecoderContext, EndpointSettings, EventHub, FeedEncoding, FeedState, FixedClock,
    MarketStateStore, MessageRouter, NewsKind, SessionListener, SessionState, SharedEventHub,
    Side, WorkerPool,
};

const WAIT: Duration = Duration::from_secs(5);

struct Pipeline {
    peer: TcpStream,
    listener: SessionListener,
    workers: Arc<WorkerPool>,
    store: Arc<MarketStateStore>,
    events: SharedEventHub,
    state: Arc<FeedState>,
}

impl Pipeline {
    async fn send(&mut self, bytes: &[u8]) {
        self.peer.write_all(bytes).await.unwrap();
        self.peer.flush().await.unwrap();
    }

    async fn stop(self) {
        self.listener.stop();
        self.workers.shutdown(true).await;
    }
}

/// Builds a pipeline whose session clock is fixed in 2026 and whose events
/// are subscribed to before any byte is sent.
async fn start_pipeline() -> Pipeline {
    let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let mut endpoint = EndpointSettings::new("127.0.0.1", server.local_addr().unwrap().port());
    endpoint.encoding = FeedEncoding::Utf8;

    let store = Arc::new(MarketStateStore::new());
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap(),
    ));
    let events: SharedEventHub = Arc::new(EventHub::with_defaults());
    let state = Arc::new(FeedState::new());

    let workers = Arc::new(WorkerPool::start(
        DecoderContext::new(Arc::clone(&store), clock),
        Arc::clone(&events),
    ));
    let router = MessageRouter::new(Arc::clone(&workers)).with_state(Arc::clone(&state));
    let listener = SessionListener::new(
        endpoint,
        router,
        Arc::clone(&events),
        Arc::clone(&state),
    );

    listener.start().await.unwrap();
    let (mut peer, _) = server.accept().await.unwrap();

    let mut handshake = vec![0u8; b"SUBSCRIBE ALL\n".len()];
    peer.read_exact(&mut handshake).await.unwrap();

    Pipeline {
        peer,
        listener,
        workers,
        store,
        events,
        state,
    }
}

async fn next<T: Clone>(rx: &mut broadcast::Receiver<T>) -> T {
    timeout(WAIT, rx.recv()).await.unwrap().unwrap()
}

fn line(code: &str, fields: &[&str]) -> Vec<u8> {
    let mut text = format!("{code}{}", fields.join("\u{1F}"));
    text.push('\n');
    text.into_bytes()
}

#[tokio::test]
async fn update_split_across_chunks_is_applied_once() {
    let mut p = start_pipeline().await;
    let mut securities = p.events.securities_rx();

    p.send("060AKBNK\u{1F}1\u{1F}10".as_bytes()).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    p.send(b"0.5\n").await;

    let event = next(&mut securities).await;
    assert_eq!(event.security.org_security, "AKBNK");
    assert_eq!(event.security.stats.last, Some(Decimal::new(1005, 1)));
    assert_eq!(&*event.raw, "060AKBNK\u{1F}1\u{1F}100.5");

    let stored = p.store.security("AKBNK").unwrap();
    assert_eq!(stored.stats.last, Some(Decimal::new(1005, 1)));
    assert_eq!(p.state.get_lines_received(), 1);

    p.stop().await;
}

#[tokio::test]
async fn depth_update_creates_book_of_announced_size() {
    let mut p = start_pipeline().await;
    let mut depth = p.events.depth_rx();

    p.send(&line(
        "064",
        &["AKBNK", "0", "1", "10.50", "100", "5", "09:30:00", "5", ""],
    ))
    .await;

    let event = next(&mut depth).await;
    assert_eq!(event.org_security, "AKBNK");
    assert_eq!(event.side, Side::Buy);
    assert_eq!(event.depth.row_index, 0);
    assert_eq!(event.depth.buy.price, Decimal::new(1050, 2));
    assert_eq!(event.depth.buy.lots, 100);

    let quote = p.store.quote("AKBNK").unwrap();
    assert_eq!(quote.depth_size, 5);
    assert_eq!(quote.rows.len(), 5);

    p.stop().await;
}

#[tokio::test]
async fn create_then_delete_keeps_record_flagged() {
    let mut p = start_pipeline().await;
    let mut securities = p.events.securities_rx();

    p.send(&line(
        "001",
        &["AKBNK", "1", "Akbank", "4", "N", "5", "12", "2", "101", "AKBNK", "", ""],
    ))
    .await;
    let created = next(&mut securities).await;
    assert_eq!(created.security.description, "Akbank");
    assert!(!created.security.is_deleted);

    p.send(&line("002", &["AKBNK", "1", ""])).await;
    let deleted = next(&mut securities).await;
    assert!(deleted.security.is_deleted);

    let stored = p.store.security("AKBNK").unwrap();
    assert!(stored.is_deleted);
    assert_eq!(stored.description, "Akbank");
    assert_eq!(p.store.security_count(), 1);

    p.stop().await;
}

#[tokio::test]
async fn session_time_and_news_are_published() {
    let mut p = start_pipeline().await;
    let mut session = p.events.session_time_rx();
    let mut news = p.events.news_rx();

    p.send(&line("012", &["20261019", "10:15:30", "1", ""])).await;
    let time = next(&mut session).await;
    assert_eq!(time.time.state, SessionState::Open);
    assert_eq!(p.store.session_time(), Some(time.time));

    p.send(&line(
        "020",
        &[
            "N1001",
            "20261019",
            "10:00:00",
            "KAP",
            "ODA",
            "1",
            "Temettü dağıtımı",
            "AKBNK",
            "GARAN",
            "",
        ],
    ))
    .await;
    let headline = next(&mut news).await;
    assert_eq!(headline.news.kind, NewsKind::Headline);
    assert_eq!(headline.news.related_symbols, ["AKBNK", "GARAN"]);

    p.send(&line("021", &["N1001", "1", "Yönetim ", "kurulu kararı", ""]))
        .await;
    let body = next(&mut news).await;
    assert_eq!(body.news.kind, NewsKind::Body);
    assert_eq!(body.news.content, "Yönetim kurulu kararı");

    p.stop().await;
}

#[tokio::test]
async fn unknown_and_rejected_lines_do_not_stall_queues() {
    let mut p = start_pipeline().await;
    let mut unknown = p.events.unknown_rx();
    let mut logs = p.events.log_rx();
    let mut securities = p.events.securities_rx();

    p.send(b"999something-unrecognized\n").await;
    let event = next(&mut unknown).await;
    assert_eq!(event.reason, UnknownReason::UnrecognizedType);

    p.send(&line("002", &["AKBNK", "1", "", "extra"])).await;
    let log = next(&mut logs).await;
    assert_eq!(log.level, LogLevel::Warning);

    p.send(&line("002", &["GARAN", "1", ""])).await;
    let deleted = next(&mut securities).await;
    assert_eq!(deleted.security.org_security, "GARAN");
    assert!(!p.store.contains_security("AKBNK"));

    p.stop().await;
}

#[tokio::test]
async fn peer_close_marks_session_disconnected() {
    let p = start_pipeline().await;
    let mut fatal = p.events.fatal_rx();
    assert_eq!(p.state.get_state(), ConnectionState::Connected);

    drop(p.peer);

    next(&mut fatal).await;
    assert_ne!(p.state.get_state(), ConnectionState::Connected);

    p.listener.stop();
    p.workers.shutdown(false).await;
}
