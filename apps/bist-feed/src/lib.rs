#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_pass_by_value,
        clippy::items_after_statements,
        clippy::unreadable_literal
    )
)]

//! BIST Feed Handler - Market Data Ingestion
//!
//! Maintains one raw TCP session to the line-oriented BIST market data feed,
//! decodes every message family into domain changes, and keeps a concurrent
//! in-memory view of securities, order-book depth and session time.
//!
//! # Layers (inside → outside)
//!
//! - **Domain**: Market data types and the state store
//!   - `security`, `depth`, `session`, `news`: record types
//!   - `reference`: static exchange and market-segment tables
//!   - `market`: concurrent state store
//!
//! - **Application**: Ports and services
//!   - `ports`: clock and reference-data source
//!   - `services`: reference-data preload
//!
//! - **Infrastructure**: Adapters and the feed pipeline
//!   - `feed`: transport, listener, framer, router, workers, decoders
//!   - `broadcast`: typed event fan-out
//!   - `config`, `metrics`, `telemetry`, `health`, `reference`
//!
//! # Data Flow
//!
//! ```text
//! TCP ──► Transport ──► FrameReader ──► Router ──┬──► create queue  ──┐
//!                                                ├──► delete queue  ──┤
//!                                                ├──► session queue ──┤
//!                                                ├──► news queue    ──┼──► decoders ──► MarketStateStore
//!                                                ├──► update queue  ──┤         │
//!                                                ├──► depth queue   ──┤         ▼
//!                                                └──► unknown queue ──┘      EventHub ──► subscribers
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

// =============================================================================
// Module Declarations
// =============================================================================

/// Domain layer - Market data types and the in-memory state store.
pub mod domain;

/// Application layer - Ports and services.
pub mod application;

/// Infrastructure layer - Feed pipeline and external integrations.
pub mod infrastructure;

// =============================================================================
// Re-exports
// =============================================================================

// Domain types
pub use domain::depth::{DepthLevel, Quote, SecurityDepth, Side};
pub use domain::market::MarketStateStore;
pub use domain::news::{News, NewsKind};
pub use domain::reference::{Exchange, MarketSegment};
pub use domain::security::{IndexMembership, Security, SecurityField, SecurityStats};
pub use domain::session::{BistTime, SessionState};

// Application ports and services
pub use application::ports::{Clock, FixedClock, SharedClock, SystemClock};
pub use application::services::{LoadSummary, ReferenceDataLoader};

// Infrastructure config
pub use infrastructure::config::{ConfigError, EndpointSettings, FeedConfig, FeedEncoding};

// Feed pipeline (for integration tests)
pub use infrastructure::feed::{
    DecodeError, DecoderContext, FeedState, FrameReader, MessageRouter, QueueKind,
    SessionListener, TcpTransport, TransportError, WorkerPool,
};

// Event fan-out
pub use infrastructure::broadcast::{EventHub, EventHubConfig, EventHubStats, SharedEventHub};

// Health server
pub use infrastructure::health::{HealthServer, HealthServerError, HealthServerState};

// Metrics
pub use infrastructure::metrics::init_metrics;

// Telemetry
pub use infrastructure::telemetry::{TelemetryConfig, TelemetryGuard, init as init_telemetry};
