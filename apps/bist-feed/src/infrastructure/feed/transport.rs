//! TCP Transport
//!
//! Raw TCP stream to the feed endpoint. Received bytes are handed to a
//! [`ReceiveHandler`] exactly as read; interpretation belongs to the caller.
//!
//! # Design
//!
//! - `connect` splits the stream and spawns one receive task and one write
//!   task.
//! - `send` is fire-and-forget: the bytes are queued for the write task and
//!   the call only reports whether the stream was open to accept them.
//! - `disconnect` is idempotent and does not invoke `on_closed`. A stream
//!   that ends or fails on its own does.
//! - There is no reconnect logic at this layer.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::infrastructure::config::EndpointSettings;

// =============================================================================
// Error Type
// =============================================================================

/// Errors raised by the feed transport and session.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The endpoint refused or could not be reached.
    #[error("failed to connect to {address}: {source}")]
    Connect {
        /// `host:port` that was dialed.
        address: String,
        /// Underlying error.
        #[source]
        source: io::Error,
    },

    /// The connect attempt did not finish in time.
    #[error("connect to {address} timed out after {timeout:?}")]
    Timeout {
        /// `host:port` that was dialed.
        address: String,
        /// Configured timeout.
        timeout: Duration,
    },

    /// Read or write failure on an open stream.
    #[error("feed stream I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operation requires an open stream.
    #[error("transport not connected")]
    NotConnected,

    /// The session was started twice without a stop in between.
    #[error("feed session already started")]
    AlreadyStarted,
}

// =============================================================================
// Receive Handler
// =============================================================================

/// Callbacks driven by the receive task.
///
/// Calls happen on one task, in order, and must not block.
pub trait ReceiveHandler: Send + 'static {
    /// The stream is open. Runs before any `on_receive`.
    fn on_connected(&mut self, _peer: SocketAddr) {}

    /// A chunk was read.
    fn on_receive(&mut self, chunk: &[u8]);

    /// The stream ended (`None`) or failed.
    fn on_closed(&mut self, error: Option<TransportError>);
}

// =============================================================================
// TCP Transport
// =============================================================================

/// Open TCP stream to the feed.
#[derive(Debug)]
pub struct TcpTransport {
    peer: SocketAddr,
    writer_tx: mpsc::UnboundedSender<Vec<u8>>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
}

impl TcpTransport {
    /// Connect to the endpoint and start receiving.
    ///
    /// Must be called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError::Connect`] if the endpoint is unreachable
    /// and [`TransportError::Timeout`] if the connect attempt outlives
    /// `connect_timeout`.
    pub async fn connect<H: ReceiveHandler>(
        settings: &EndpointSettings,
        mut handler: H,
    ) -> Result<Self, TransportError> {
        let address = settings.address();
        tracing::info!(address = %address, "Connecting to feed");

        let stream = tokio::time::timeout(settings.connect_timeout, TcpStream::connect(&address))
            .await
            .map_err(|_| TransportError::Timeout {
                address: address.clone(),
                timeout: settings.connect_timeout,
            })?
            .map_err(|source| TransportError::Connect {
                address: address.clone(),
                source,
            })?;

        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "Failed to set TCP_NODELAY");
        }
        let peer = stream.peer_addr()?;
        let (reader, writer) = stream.into_split();

        let connected = Arc::new(AtomicBool::new(true));
        let cancel = CancellationToken::new();
        let (writer_tx, writer_rx) = mpsc::unbounded_channel();

        handler.on_connected(peer);

        tokio::spawn(receive_loop(
            reader,
            handler,
            settings.receive_buffer_bytes.max(1),
            Arc::clone(&connected),
            cancel.clone(),
        ));
        tokio::spawn(write_loop(
            writer,
            writer_rx,
            Arc::clone(&connected),
            cancel.clone(),
        ));

        tracing::info!(peer = %peer, "Feed connected");

        Ok(Self {
            peer,
            writer_tx,
            connected,
            cancel,
        })
    }

    /// Queue bytes for writing.
    ///
    /// Returns `false` if the stream is closed. Acceptance does not mean
    /// delivery.
    pub fn send(&self, bytes: &[u8]) -> bool {
        self.is_connected() && self.writer_tx.send(bytes.to_vec()).is_ok()
    }

    /// Close the stream. Safe to call more than once.
    pub fn disconnect(&self) {
        if self.connected.swap(false, Ordering::SeqCst) {
            tracing::info!(peer = %self.peer, "Disconnecting from feed");
        }
        self.cancel.cancel();
    }

    /// Whether the stream is still open.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Remote address.
    #[must_use]
    pub const fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn receive_loop<H: ReceiveHandler>(
    mut reader: OwnedReadHalf,
    mut handler: H,
    buffer_bytes: usize,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    let mut buf = vec![0u8; buffer_bytes];

    let outcome = loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                tracing::debug!("Receive loop cancelled");
                return;
            }
            read = reader.read(&mut buf) => match read {
                Ok(0) => break None,
                Ok(n) => handler.on_receive(&buf[..n]),
                Err(e) => break Some(TransportError::Io(e)),
            },
        }
    };

    connected.store(false, Ordering::SeqCst);
    match &outcome {
        None => tracing::warn!("Feed closed by peer"),
        Some(e) => tracing::error!(error = %e, "Feed receive failed"),
    }
    handler.on_closed(outcome);
}

async fn write_loop(
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Vec<u8>>,
    connected: Arc<AtomicBool>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            bytes = rx.recv() => match bytes {
                Some(bytes) => {
                    if let Err(e) = writer.write_all(&bytes).await {
                        tracing::warn!(error = %e, "Feed write failed");
                        connected.store(false, Ordering::SeqCst);
                        break;
                    }
                }
                None => break,
            },
        }
    }

    let _ = writer.shutdown().await;
}

#[cfg(test)]
mod tests {
    use tokio::net::TcpListener;
    use tokio::sync::mpsc::UnboundedSender;

    use super::*;

    #[derive(Debug)]
    enum Seen {
        Connected,
        Chunk(Vec<u8>),
        Closed(bool),
    }

    struct Recorder(UnboundedSender<Seen>);

    impl ReceiveHandler for Recorder {
        fn on_connected(&mut self, _peer: SocketAddr) {
            let _ = self.0.send(Seen::Connected);
        }

        fn on_receive(&mut self, chunk: &[u8]) {
            let _ = self.0.send(Seen::Chunk(chunk.to_vec()));
        }

        fn on_closed(&mut self, error: Option<TransportError>) {
            let _ = self.0.send(Seen::Closed(error.is_some()));
        }
    }

    async fn listener() -> (TcpListener, EndpointSettings) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, EndpointSettings::new("127.0.0.1", port))
    }

    #[tokio::test]
    async fn chunks_arrive_unmodified_and_close_is_reported() {
        let (server, settings) = listener().await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        let transport = TcpTransport::connect(&settings, Recorder(tx)).await.unwrap();
        let (mut peer, _) = server.accept().await.unwrap();

        peer.write_all(b"060AKBNK\x1f1\x1f10").await.unwrap();
        peer.flush().await.unwrap();

        assert!(matches!(rx.recv().await, Some(Seen::Connected)));
        let mut received = Vec::new();
        while received.len() < 14 {
            match rx.recv().await {
                Some(Seen::Chunk(chunk)) => received.extend(chunk),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert_eq!(received, b"060AKBNK\x1f1\x1f10");

        drop(peer);
        assert!(matches!(rx.recv().await, Some(Seen::Closed(false))));
        assert!(!transport.is_connected());
        assert!(!transport.send(b"late"));
    }

    #[tokio::test]
    async fn send_reaches_peer() {
        let (server, settings) = listener().await;
        let (tx, _rx) = mpsc::unbounded_channel();

        let transport = TcpTransport::connect(&settings, Recorder(tx)).await.unwrap();
        let (mut peer, _) = server.accept().await.unwrap();

        assert!(transport.send(b"SUBSCRIBE ALL\n"));

        let mut buf = vec![0u8; 14];
        peer.read_exact(&mut buf).await.unwrap();
        assert_eq!(buf, b"SUBSCRIBE ALL\n");
    }

    #[tokio::test]
    async fn disconnect_is_idempotent_and_silent() {
        let (server, settings) = listener().await;
        let (tx, mut rx) = mpsc::unbounded_channel();

        let transport = TcpTransport::connect(&settings, Recorder(tx)).await.unwrap();
        let (mut peer, _) = server.accept().await.unwrap();

        transport.disconnect();
        transport.disconnect();
        assert!(!transport.is_connected());
        assert!(!transport.send(b"x"));

        let mut buf = [0u8; 1];
        assert_eq!(peer.read(&mut buf).await.unwrap(), 0);

        assert!(matches!(rx.recv().await, Some(Seen::Connected)));
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_an_error() {
        let (server, settings) = listener().await;
        drop(server);

        let (tx, _rx) = mpsc::unbounded_channel();
        let err = TcpTransport::connect(&settings, Recorder(tx)).await.unwrap_err();
        assert!(matches!(err, TransportError::Connect { .. }));
    }
}
