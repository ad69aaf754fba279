//! Event Fan-Out
//!
//! Publishes decoded feed events to any number of subscribers using tokio
//! broadcast channels.
//!
//! # Architecture
//!
//! The `EventHub` provides one typed channel per event kind:
//! - Security changed, depth changed, session time changed, news changed
//! - Unknown feed lines kept for diagnostics
//! - Log records from the worker boundary, and fatal transport errors
//!
//! Every event that originates from a feed line carries the raw line.
//! Sending never blocks; a subscriber that falls behind by more than the
//! channel capacity observes `RecvError::Lagged`.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;

use crate::domain::depth::{SecurityDepth, Side};
use crate::domain::news::News;
use crate::domain::security::Security;
use crate::domain::session::BistTime;
use crate::infrastructure::feed::protocol::{QueueKind, UnknownReason};

// =============================================================================
// Events
// =============================================================================

/// A security was created, updated or flagged deleted.
#[derive(Debug, Clone)]
pub struct SecurityChanged {
    /// Snapshot after the change.
    pub security: Security,
    /// Source line.
    pub raw: Arc<str>,
}

/// One side of one depth row changed.
#[derive(Debug, Clone)]
pub struct DepthChanged {
    /// Native symbol.
    pub org_security: String,
    /// Side that was updated.
    pub side: Side,
    /// Row snapshot after the change.
    pub depth: SecurityDepth,
    /// Source line.
    pub raw: Arc<str>,
}

/// The session clock was replaced.
#[derive(Debug, Clone)]
pub struct SessionTimeChanged {
    /// New session clock.
    pub time: BistTime,
    /// Source line.
    pub raw: Arc<str>,
}

/// A headline or body arrived.
#[derive(Debug, Clone)]
pub struct NewsChanged {
    /// Decoded record.
    pub news: News,
    /// Source line.
    pub raw: Arc<str>,
}

/// A line that was not decoded.
#[derive(Debug, Clone)]
pub struct UnknownFeed {
    /// Why it was not decoded.
    pub reason: UnknownReason,
    /// Source line.
    pub raw: Arc<str>,
}

/// Severity of a [`LogEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Informational.
    Info,
    /// Message rejected by validation.
    Warning,
    /// Unexpected failure inside a decoder.
    Error,
}

/// Diagnostic record from the pipeline.
#[derive(Debug, Clone)]
pub struct LogEvent {
    /// Severity.
    pub level: LogLevel,
    /// Queue that produced the record, if any.
    pub queue: Option<QueueKind>,
    /// Human-readable message.
    pub message: String,
    /// Source line, if the record concerns one.
    pub raw: Option<Arc<str>>,
}

/// The feed session failed and will not recover on its own.
#[derive(Debug, Clone)]
pub struct FatalError {
    /// Failure description.
    pub message: String,
}

// =============================================================================
// Event Hub
// =============================================================================

/// Configuration for event channel capacities.
#[derive(Debug, Clone, Copy)]
pub struct EventHubConfig {
    /// Capacity for state-change channels.
    pub changes_capacity: usize,
    /// Capacity for diagnostic channels (unknown, log, fatal).
    pub diagnostics_capacity: usize,
}

impl Default for EventHubConfig {
    fn default() -> Self {
        Self {
            changes_capacity: 10_000,
            diagnostics_capacity: 1_000,
        }
    }
}

impl EventHubConfig {
    /// Use the same capacity for every channel.
    #[must_use]
    pub const fn uniform(capacity: usize) -> Self {
        Self {
            changes_capacity: capacity,
            diagnostics_capacity: capacity,
        }
    }
}

/// Central hub for all event channels.
///
/// # Example
///
/// ```rust
/// use bist_feed::infrastructure::broadcast::EventHub;
///
/// let hub = EventHub::with_defaults();
/// let _rx = hub.securities_rx();
/// assert_eq!(hub.stats().securities_receivers, 1);
/// ```
#[derive(Debug)]
#[allow(clippy::struct_field_names)]
pub struct EventHub {
    securities_tx: broadcast::Sender<SecurityChanged>,
    depth_tx: broadcast::Sender<DepthChanged>,
    session_time_tx: broadcast::Sender<SessionTimeChanged>,
    news_tx: broadcast::Sender<NewsChanged>,
    unknown_tx: broadcast::Sender<UnknownFeed>,
    log_tx: broadcast::Sender<LogEvent>,
    fatal_tx: broadcast::Sender<FatalError>,
}

impl EventHub {
    /// Create a new hub with the given configuration.
    #[must_use]
    pub fn new(config: EventHubConfig) -> Self {
        Self {
            securities_tx: broadcast::channel(config.changes_capacity).0,
            depth_tx: broadcast::channel(config.changes_capacity).0,
            session_time_tx: broadcast::channel(config.changes_capacity).0,
            news_tx: broadcast::channel(config.changes_capacity).0,
            unknown_tx: broadcast::channel(config.diagnostics_capacity).0,
            log_tx: broadcast::channel(config.diagnostics_capacity).0,
            fatal_tx: broadcast::channel(config.diagnostics_capacity).0,
        }
    }

    /// Create a new hub with default configuration.
    #[must_use]
    pub fn with_defaults() -> Self {
        Self::new(EventHubConfig::default())
    }

    // =========================================================================
    // Security Channel
    // =========================================================================

    /// Publish a security change.
    ///
    /// Returns the number of receivers that received the event, or `None`
    /// if there are no active receivers.
    #[must_use]
    pub fn send_security(&self, security: Security, raw: Arc<str>) -> Option<usize> {
        self.securities_tx
            .send(SecurityChanged { security, raw })
            .ok()
    }

    /// Get a new receiver for security changes.
    #[must_use]
    pub fn securities_rx(&self) -> broadcast::Receiver<SecurityChanged> {
        self.securities_tx.subscribe()
    }

    // =========================================================================
    // Depth Channel
    // =========================================================================

    /// Publish a depth row change.
    #[must_use]
    pub fn send_depth(
        &self,
        org_security: String,
        side: Side,
        depth: SecurityDepth,
        raw: Arc<str>,
    ) -> Option<usize> {
        self.depth_tx
            .send(DepthChanged {
                org_security,
                side,
                depth,
                raw,
            })
            .ok()
    }

    /// Get a new receiver for depth changes.
    #[must_use]
    pub fn depth_rx(&self) -> broadcast::Receiver<DepthChanged> {
        self.depth_tx.subscribe()
    }

    // =========================================================================
    // Session Time Channel
    // =========================================================================

    /// Publish a session clock change.
    #[must_use]
    pub fn send_session_time(&self, time: BistTime, raw: Arc<str>) -> Option<usize> {
        self.session_time_tx
            .send(SessionTimeChanged { time, raw })
            .ok()
    }

    /// Get a new receiver for session clock changes.
    #[must_use]
    pub fn session_time_rx(&self) -> broadcast::Receiver<SessionTimeChanged> {
        self.session_time_tx.subscribe()
    }

    // =========================================================================
    // News Channel
    // =========================================================================

    /// Publish a news record.
    #[must_use]
    pub fn send_news(&self, news: News, raw: Arc<str>) -> Option<usize> {
        self.news_tx.send(NewsChanged { news, raw }).ok()
    }

    /// Get a new receiver for news.
    #[must_use]
    pub fn news_rx(&self) -> broadcast::Receiver<NewsChanged> {
        self.news_tx.subscribe()
    }

    // =========================================================================
    // Diagnostics Channels
    // =========================================================================

    /// Publish an undecoded line.
    #[must_use]
    pub fn send_unknown(&self, reason: UnknownReason, raw: Arc<str>) -> Option<usize> {
        self.unknown_tx.send(UnknownFeed { reason, raw }).ok()
    }

    /// Get a new receiver for undecoded lines.
    #[must_use]
    pub fn unknown_rx(&self) -> broadcast::Receiver<UnknownFeed> {
        self.unknown_tx.subscribe()
    }

    /// Publish a log record.
    #[must_use]
    pub fn send_log(
        &self,
        level: LogLevel,
        queue: Option<QueueKind>,
        message: String,
        raw: Option<Arc<str>>,
    ) -> Option<usize> {
        self.log_tx
            .send(LogEvent {
                level,
                queue,
                message,
                raw,
            })
            .ok()
    }

    /// Get a new receiver for log records.
    #[must_use]
    pub fn log_rx(&self) -> broadcast::Receiver<LogEvent> {
        self.log_tx.subscribe()
    }

    /// Publish a fatal session error.
    #[must_use]
    pub fn send_fatal(&self, message: String) -> Option<usize> {
        self.fatal_tx.send(FatalError { message }).ok()
    }

    /// Get a new receiver for fatal session errors.
    #[must_use]
    pub fn fatal_rx(&self) -> broadcast::Receiver<FatalError> {
        self.fatal_tx.subscribe()
    }

    // =========================================================================
    // Statistics
    // =========================================================================

    /// Get statistics about all channels.
    #[must_use]
    pub fn stats(&self) -> EventHubStats {
        EventHubStats {
            securities_receivers: self.securities_tx.receiver_count(),
            depth_receivers: self.depth_tx.receiver_count(),
            session_time_receivers: self.session_time_tx.receiver_count(),
            news_receivers: self.news_tx.receiver_count(),
            unknown_receivers: self.unknown_tx.receiver_count(),
            log_receivers: self.log_tx.receiver_count(),
            fatal_receivers: self.fatal_tx.receiver_count(),
        }
    }
}

/// Shared event hub reference.
pub type SharedEventHub = Arc<EventHub>;

/// Wait for the next fatal error, riding through lag.
///
/// Returns `None` once the hub is gone.
pub async fn next_fatal(rx: &mut broadcast::Receiver<FatalError>) -> Option<FatalError> {
    loop {
        match rx.recv().await {
            Ok(fatal) => return Some(fatal),
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "Fatal error receiver lagged");
            }
            Err(broadcast::error::RecvError::Closed) => return None,
        }
    }
}

/// Statistics about event channels.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EventHubStats {
    /// Number of security-change receivers.
    pub securities_receivers: usize,
    /// Number of depth-change receivers.
    pub depth_receivers: usize,
    /// Number of session-time receivers.
    pub session_time_receivers: usize,
    /// Number of news receivers.
    pub news_receivers: usize,
    /// Number of unknown-feed receivers.
    pub unknown_receivers: usize,
    /// Number of log receivers.
    pub log_receivers: usize,
    /// Number of fatal-error receivers.
    pub fatal_receivers: usize,
}

impl EventHubStats {
    /// Get total number of receivers across all channels.
    #[must_use]
    pub const fn total_receivers(&self) -> usize {
        self.securities_receivers
            + self.depth_receivers
            + self.session_time_receivers
            + self.news_receivers
            + self.unknown_receivers
            + self.log_receivers
            + self.fatal_receivers
    }
}

// =============================================================================
// Tests
// =============================================================================
