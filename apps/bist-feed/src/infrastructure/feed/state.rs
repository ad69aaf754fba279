//! Feed Connection State
//!
//! Shared, lock-light view of the feed session read by the health server.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;

use crate::infrastructure::metrics;

/// Connection state of the feed session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// Not connected.
    #[default]
    Disconnected,
    /// Connect in progress.
    Connecting,
    /// Connected and receiving.
    Connected,
    /// Connection failed or dropped.
    Error,
}

impl ConnectionState {
    /// Label used in health responses.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        }
    }
}

/// Point-in-time copy of [`FeedState`].
#[derive(Debug, Clone, Serialize)]
pub struct FeedStatus {
    /// Connection state.
    pub state: ConnectionState,
    /// Last successful connect.
    pub last_connected_at: Option<DateTime<Utc>>,
    /// Last error message.
    pub error_message: Option<String>,
    /// Bytes received over the life of the process.
    pub bytes_received: u64,
    /// Complete lines routed over the life of the process.
    pub lines_received: u64,
}

/// Feed session state shared between the listener and the health server.
#[derive(Debug, Default)]
pub struct FeedState {
    state: RwLock<ConnectionState>,
    last_connected_at: RwLock<Option<DateTime<Utc>>>,
    error_message: RwLock<Option<String>>,
    bytes_received: AtomicU64,
    lines_received: AtomicU64,
}

impl FeedState {
    /// Create a disconnected state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the connection state.
    pub fn set_state(&self, state: ConnectionState) {
        *self.state.write() = state;
        if state == ConnectionState::Connected {
            *self.last_connected_at.write() = Some(Utc::now());
            *self.error_message.write() = None;
        }
        metrics::set_connected(state == ConnectionState::Connected);
    }

    /// Set an error state with message.
    pub fn set_error(&self, message: String) {
        *self.state.write() = ConnectionState::Error;
        *self.error_message.write() = Some(message);
        metrics::set_connected(false);
    }

    /// Add received bytes.
    pub fn add_bytes(&self, count: usize) {
        self.bytes_received
            .fetch_add(count as u64, Ordering::Relaxed);
    }

    /// Increment the routed line counter.
    pub fn increment_lines(&self) {
        self.lines_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Current connection state.
    #[must_use]
    pub fn get_state(&self) -> ConnectionState {
        *self.state.read()
    }

    /// Whether the session is connected.
    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.get_state() == ConnectionState::Connected
    }

    /// Lines routed so far.
    #[must_use]
    pub fn get_lines_received(&self) -> u64 {
        self.lines_received.load(Ordering::Relaxed)
    }

    /// Snapshot for reporting.
    #[must_use]
    pub fn status(&self) -> FeedStatus {
        FeedStatus {
            state: self.get_state(),
            last_connected_at: *self.last_connected_at.read(),
            error_message: self.error_message.read().clone(),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            lines_received: self.get_lines_received(),
        }
    }
}
