//! Session Listener
//!
//! Owns one feed session: opens the transport, sends the handshake, and
//! pushes every received chunk through the frame reader into the router.
//! A dropped stream is reported as a fatal event; reconnecting is left to
//! the host.

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;

use super::framer::FrameReader;
use super::router::MessageRouter;
use super::state::{ConnectionState, FeedState};
use super::transport::{ReceiveHandler, TcpTransport, TransportError};
use crate::infrastructure::broadcast::{LogLevel, SharedEventHub};
use crate::infrastructure::config::EndpointSettings;
use crate::infrastructure::metrics;

/// Feed session lifecycle.
#[derive(Debug)]
pub struct SessionListener {
    endpoint: EndpointSettings,
    router: MessageRouter,
    events: SharedEventHub,
    state: Arc<FeedState>,
    started: AtomicBool,
    transport: Mutex<Option<TcpTransport>>,
}

impl SessionListener {
    /// Create a stopped listener.
    #[must_use]
    pub fn new(
        endpoint: EndpointSettings,
        router: MessageRouter,
        events: SharedEventHub,
        state: Arc<FeedState>,
    ) -> Self {
        Self {
            endpoint,
            router,
            events,
            state,
            started: AtomicBool::new(false),
            transport: Mutex::new(None),
        }
    }

    /// Connect and send the handshake.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::AlreadyStarted`] if the session is running,
    /// or the connect error if the endpoint cannot be reached.
    pub async fn start(&self) -> Result<(), TransportError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(TransportError::AlreadyStarted);
        }

        self.state.set_state(ConnectionState::Connecting);
        let handler = SessionHandler {
            reader: FrameReader::new(self.endpoint.encoding),
            router: self.router.clone(),
            events: Arc::clone(&self.events),
            state: Arc::clone(&self.state),
        };

        let transport = match TcpTransport::connect(&self.endpoint, handler).await {
            Ok(transport) => transport,
            Err(e) => {
                tracing::error!(error = %e, "Feed connect failed");
                self.state.set_error(e.to_string());
                self.started.store(false, Ordering::SeqCst);
                return Err(e);
            }
        };

        if !self.endpoint.handshake.is_empty() && !transport.send(self.endpoint.handshake.as_bytes())
        {
            tracing::warn!("Handshake not accepted, stream already closed");
        }

        *self.transport.lock() = Some(transport);
        Ok(())
    }

    /// Disconnect and release the transport.
    pub fn stop(&self) {
        if let Some(transport) = self.transport.lock().take() {
            transport.disconnect();
            self.state.set_state(ConnectionState::Disconnected);
        }
        self.started.store(false, Ordering::SeqCst);
    }

    /// Whether `start` succeeded and `stop` has not been called.
    #[must_use]
    pub fn is_started(&self) -> bool {
        self.started.load(Ordering::SeqCst)
    }

    /// Shared connection state.
    #[must_use]
    pub fn state(&self) -> Arc<FeedState> {
        Arc::clone(&self.state)
    }
}

/// Receive side of one session.
struct SessionHandler {
    reader: FrameReader,
    router: MessageRouter,
    events: SharedEventHub,
    state: Arc<FeedState>,
}

impl ReceiveHandler for SessionHandler {
    fn on_connected(&mut self, peer: SocketAddr) {
        tracing::debug!(peer = %peer, "Feed session open");
        self.state.set_state(ConnectionState::Connected);
    }

    fn on_receive(&mut self, chunk: &[u8]) {
        metrics::record_bytes_received(chunk.len());
        self.state.add_bytes(chunk.len());

        let router = &self.router;
        if let Err(e) = self.reader.push_with(chunk, |line| {
            router.route(line);
        }) {
            tracing::warn!(error = %e, bytes = chunk.len(), "Chunk dropped");
            metrics::record_chunk_dropped();
            let _ = self
                .events
                .send_log(LogLevel::Warning, None, e.to_string(), None);
        }
    }

    fn on_closed(&mut self, error: Option<TransportError>) {
        let message = error.map_or_else(
            || "feed connection closed by peer".to_string(),
            |e| e.to_string(),
        );
        if !self.reader.carry_over().is_empty() {
            tracing::debug!(
                partial = self.reader.carry_over(),
                "Partial line discarded on close"
            );
        }
        self.state.set_error(message.clone());
        let _ = self.events.send_fatal(message);
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;
    use crate::infrastructure::broadcast::EventHub;
    use crate::infrastructure::config::FeedEncoding;
    use crate::infrastructure::feed::decoders::test_support::context;
    use crate::infrastructure::feed::workers::WorkerPool;

    struct Harness {
        server: TcpListener,
        listener: SessionListener,
        events: SharedEventHub,
        workers: Arc<WorkerPool>,
    }

    async fn harness(encoding: FeedEncoding) -> Harness {
        let server = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let mut endpoint = EndpointSettings::new("127.0.0.1", server.local_addr().unwrap().port());
        endpoint.encoding = encoding;

        let events: SharedEventHub = Arc::new(EventHub::with_defaults());
        let state = Arc::new(FeedState::new());
        let workers = Arc::new(WorkerPool::start(context(), Arc::clone(&events)));
        let router = MessageRouter::new(Arc::clone(&workers)).with_state(Arc::clone(&state));
        let listener = SessionListener::new(endpoint, router, Arc::clone(&events), state);

        Harness {
            server,
            listener,
            events,
            workers,
        }
    }

    #[tokio::test]
    async fn start_sends_handshake_and_routes_lines() {
        let h = harness(FeedEncoding::Utf8).await;
        let mut securities = h.events.securities_rx();

        h.listener.start().await.unwrap();
        let (mut peer, _) = h.server.accept().await.unwrap();

        let mut handshake = vec![0u8; 14];
        peer.read_exact(&mut handshake).await.unwrap();
        assert_eq!(handshake, b"SUBSCRIBE ALL\n");
        assert!(h.listener.state().is_connected());

        peer.write_all(b"060AKBNK\x1f1\x1f10").await.unwrap();
        peer.flush().await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        peer.write_all(b".50\x1f\n").await.unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), securities.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(&*event.raw, "060AKBNK\u{1F}1\u{1F}10.50\u{1F}");
        assert_eq!(h.listener.state().get_lines_received(), 1);

        h.listener.stop();
        assert!(!h.listener.is_started());
        h.workers.shutdown(true).await;
    }

    #[tokio::test]
    async fn second_start_is_rejected() {
        let h = harness(FeedEncoding::Latin5).await;
        h.listener.start().await.unwrap();

        assert!(matches!(
            h.listener.start().await,
            Err(TransportError::AlreadyStarted)
        ));

        h.listener.stop();
        h.workers.shutdown(false).await;
    }

    #[tokio::test]
    async fn peer_close_is_fatal() {
        let h = harness(FeedEncoding::Latin5).await;
        let mut fatal = h.events.fatal_rx();

        h.listener.start().await.unwrap();
        let (mut peer, _) = h.server.accept().await.unwrap();
        let mut handshake = vec![0u8; 14];
        peer.read_exact(&mut handshake).await.unwrap();
        drop(peer);

        let event = tokio::time::timeout(Duration::from_secs(5), fatal.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(event.message.contains("closed"));
        assert_eq!(h.listener.state().get_state(), ConnectionState::Error);

        h.listener.stop();
        h.workers.shutdown(false).await;
    }

    #[tokio::test]
    async fn invalid_utf8_chunk_is_dropped() {
        let h = harness(FeedEncoding::Utf8).await;
        let mut logs = h.events.log_rx();
        let mut securities = h.events.securities_rx();

        h.listener.start().await.unwrap();
        let (mut peer, _) = h.server.accept().await.unwrap();

        peer.write_all(b"060AKBNK\x1f1\x1f\xff\xfe\n").await.unwrap();
        peer.flush().await.unwrap();
        let log = tokio::time::timeout(Duration::from_secs(5), logs.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(log.level, LogLevel::Warning);
        assert!(log.queue.is_none());

        peer.write_all(b"060GARAN\x1f1\x1f5\n").await.unwrap();
        let event = tokio::time::timeout(Duration::from_secs(5), securities.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.security.org_security, "GARAN");

        h.listener.stop();
        h.workers.shutdown(false).await;
    }

    #[tokio::test]
    async fn unreachable_endpoint_resets_start() {
        let h = harness(FeedEncoding::Latin5).await;
        drop(h.server);

        assert!(matches!(
            h.listener.start().await,
            Err(TransportError::Connect { .. })
        ));
        assert!(!h.listener.is_started());
        assert_eq!(h.listener.state().get_state(), ConnectionState::Error);
        h.workers.shutdown(false).await;
    }
}
