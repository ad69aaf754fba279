//! BIST Feed Handler Binary
//!
//! Connects to the BIST market data feed and keeps the in-memory market
//! state current until shut down.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin bist-feed
//! ```
//!
//! # Environment Variables
//!
//! ## Required
//! - `FEED_HOST`: Feed endpoint host
//! - `FEED_PORT`: Feed endpoint port
//!
//! ## Optional
//! - `FEED_HANDSHAKE`: Command sent after connect (default: `SUBSCRIBE ALL\n`)
//! - `FEED_ENCODING`: utf8 | latin5 (default: latin5)
//! - `FEED_RECEIVE_BUFFER_BYTES`: Receive buffer size (default: 65536)
//! - `FEED_CONNECT_TIMEOUT_SECS`: Connect timeout (default: 10)
//! - `FEED_DRAIN_ON_SHUTDOWN`: Drain worker queues on shutdown (default: true)
//! - `FEED_REFERENCE_DATA_PATH`: JSON-lines security preload file
//! - `FEED_EVENTS_CAPACITY`: Broadcast channel capacity (default: 10000)
//! - `FEED_HEALTH_PORT`: Health and query HTTP port (default: 8083)
//! - `OTEL_ENABLED`: Export spans over OTLP (default: false)
//! - `OTEL_EXPORTER_OTLP_ENDPOINT`: OTLP endpoint (default: <http://localhost:4317>)
//! - `OTEL_SERVICE_NAME`: Service name (default: bist-feed)
//! - `RUST_LOG`: Log filter (default: `bist_feed=info`)

use std::sync::Arc;

use anyhow::Context;
use bist_feed::application::ports::{SharedClock, SystemClock};
use bist_feed::application::services::ReferenceDataLoader;
use bist_feed::domain::market::MarketStateStore;
use bist_feed::infrastructure::broadcast::{
    EventHub, EventHubConfig, SharedEventHub, next_fatal,
};
use bist_feed::infrastructure::feed::{
    DecoderContext, FeedState, MessageRouter, SessionListener, WorkerPool,
};
use bist_feed::infrastructure::health::{HealthServer, HealthServerState};
use bist_feed::infrastructure::reference::JsonLinesRowSource;
use bist_feed::infrastructure::telemetry;
use bist_feed::{FeedConfig, init_metrics};
use tokio::signal;
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    load_dotenv();

    let _telemetry_guard = telemetry::init();

    tracing::info!("Starting BIST feed handler");

    let _metrics_handle = init_metrics();

    let config = FeedConfig::from_env().context("invalid feed configuration")?;
    log_config(&config);

    let shutdown_token = CancellationToken::new();
    let clock: SharedClock = Arc::new(SystemClock);
    let store = Arc::new(MarketStateStore::new());
    let events: SharedEventHub = Arc::new(EventHub::new(EventHubConfig::uniform(
        config.events.capacity,
    )));
    let feed_state = Arc::new(FeedState::new());

    if let Some(path) = &config.reference_data_path {
        let loader = ReferenceDataLoader::new(
            Arc::new(JsonLinesRowSource::new(path)),
            Arc::clone(&store),
            Arc::clone(&clock),
        );
        loader
            .load()
            .await
            .with_context(|| format!("failed to preload reference data from {}", path.display()))?;
    }

    // Health server
    let health_state = Arc::new(HealthServerState::new(
        env!("CARGO_PKG_VERSION").to_string(),
        Arc::clone(&feed_state),
        Arc::clone(&store),
        Arc::clone(&events),
    ));
    let health_server = HealthServer::new(
        config.server.health_port,
        health_state,
        shutdown_token.clone(),
    );
    tokio::spawn(async move {
        if let Err(e) = health_server.run().await {
            tracing::error!(error = %e, "Health server error");
        }
    });

    // A lost feed session is not retried here; stop and let the supervisor restart.
    let mut fatal_rx = events.fatal_rx();
    let fatal_shutdown = shutdown_token.clone();
    tokio::spawn(async move {
        if let Some(fatal) = next_fatal(&mut fatal_rx).await {
            tracing::error!(error = %fatal.message, "Feed session lost");
            fatal_shutdown.cancel();
        }
    });

    // Pipeline
    let workers = Arc::new(WorkerPool::start(
        DecoderContext::new(Arc::clone(&store), clock),
        Arc::clone(&events),
    ));
    let router = MessageRouter::new(Arc::clone(&workers)).with_state(Arc::clone(&feed_state));
    let listener = SessionListener::new(
        config.endpoint.clone(),
        router,
        Arc::clone(&events),
        Arc::clone(&feed_state),
    );

    listener
        .start()
        .await
        .with_context(|| format!("failed to connect to feed at {}", config.endpoint.address()))?;

    tracing::info!("Feed handler ready");

    await_shutdown(shutdown_token).await;

    listener.stop();
    workers.shutdown(config.workers.drain_on_shutdown).await;

    tracing::info!(
        securities = store.security_count(),
        quotes = store.quote_count(),
        "Feed handler stopped"
    );
    Ok(())
}

/// Load .env file from current directory or any ancestor directory.
fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

/// Log the parsed configuration.
fn log_config(config: &FeedConfig) {
    tracing::info!(
        endpoint = %config.endpoint.address(),
        encoding = config.endpoint.encoding.as_str(),
        drain_on_shutdown = config.workers.drain_on_shutdown,
        health_port = config.server.health_port,
        "Configuration loaded"
    );
    tracing::debug!(
        receive_buffer_bytes = config.endpoint.receive_buffer_bytes,
        connect_timeout_secs = config.endpoint.connect_timeout.as_secs(),
        events_capacity = config.events.capacity,
        reference_data = ?config.reference_data_path,
        "Feed settings"
    );
}

/// Wait for SIGTERM, SIGINT or an internal shutdown request.
#[allow(clippy::expect_used)]
async fn await_shutdown(shutdown_token: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("signal handler installation is critical for graceful shutdown");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("SIGTERM handler installation is critical for graceful shutdown")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, initiating shutdown");
        }
        () = shutdown_token.cancelled() => {
            tracing::info!("Internal shutdown requested");
        }
    }

    shutdown_token.cancel();
}
