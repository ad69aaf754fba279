//! Health Check, Metrics and State Query Endpoint
//!
//! HTTP endpoint for health checks, connection status reporting, Prometheus
//! metrics and read-only lookups against the market state store.
//!
//! # Endpoints
//!
//! - `GET /health` - Returns JSON health status
//! - `GET /healthz` - Liveness probe (simple OK)
//! - `GET /readyz` - Readiness probe (ready when the feed is connected)
//! - `GET /metrics` - Prometheus metrics in text format
//! - `GET /securities/{symbol}` - Security by native symbol
//! - `GET /quotes/{symbol}` - Order book by native symbol
//! - `GET /session` - Latest session clock

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::domain::market::MarketStateStore;
use crate::infrastructure::broadcast::SharedEventHub;
use crate::infrastructure::feed::{ConnectionState, FeedState, FeedStatus};
use crate::infrastructure::metrics::get_metrics_handle;

// =============================================================================
// Health Response Types
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Overall status.
    pub status: HealthStatus,
    /// Service version.
    pub version: String,
    /// Server uptime in seconds.
    pub uptime_secs: u64,
    /// Current time.
    pub current_time: DateTime<Utc>,
    /// Feed session status.
    pub feed: FeedStatus,
    /// State store sizes.
    pub store: StoreStatus,
    /// Total broadcast receivers.
    pub event_receivers: usize,
}

/// Overall health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// Connected and receiving.
    Healthy,
    /// Connect in progress.
    Degraded,
    /// Not connected.
    Unhealthy,
}

impl HealthStatus {
    const fn from_connection(state: ConnectionState) -> Self {
        match state {
            ConnectionState::Connected => Self::Healthy,
            ConnectionState::Connecting => Self::Degraded,
            ConnectionState::Disconnected | ConnectionState::Error => Self::Unhealthy,
        }
    }
}

/// State store sizes.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StoreStatus {
    /// Securities in the registry, deleted ones included.
    pub securities: usize,
    /// Order books.
    pub quotes: usize,
    /// Whether a session clock has been received.
    pub has_session_time: bool,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error: String,
}

// =============================================================================
// Health Server State
// =============================================================================

/// Shared state for the health server.
#[derive(Debug)]
pub struct HealthServerState {
    version: String,
    started_at: Instant,
    feed: Arc<FeedState>,
    store: Arc<MarketStateStore>,
    events: SharedEventHub,
}

impl HealthServerState {
    /// Create new health server state.
    #[must_use]
    pub fn new(
        version: String,
        feed: Arc<FeedState>,
        store: Arc<MarketStateStore>,
        events: SharedEventHub,
    ) -> Self {
        Self {
            version,
            started_at: Instant::now(),
            feed,
            store,
            events,
        }
    }
}

// =============================================================================
// Health Server
// =============================================================================

/// Health check HTTP server.
pub struct HealthServer {
    port: u16,
    state: Arc<HealthServerState>,
    cancel: CancellationToken,
}

impl HealthServer {
    /// Create a new health server.
    #[must_use]
    pub const fn new(port: u16, state: Arc<HealthServerState>, cancel: CancellationToken) -> Self {
        Self {
            port,
            state,
            cancel,
        }
    }

    /// Run the health server until cancelled.
    ///
    /// # Errors
    ///
    /// Returns `HealthServerError` if binding fails or the HTTP server
    /// encounters a fatal error while running.
    pub async fn run(self) -> Result<(), HealthServerError> {
        let app = router(self.state);

        let addr = SocketAddr::from(([0, 0, 0, 0], self.port));
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| HealthServerError::BindFailed(self.port, e.to_string()))?;

        tracing::info!(port = self.port, "Health server listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(self.cancel.cancelled_owned())
            .await
            .map_err(|e| HealthServerError::ServerFailed(e.to_string()))?;

        tracing::info!("Health server stopped");
        Ok(())
    }
}

/// Build the HTTP routes.
pub fn router(state: Arc<HealthServerState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/healthz", get(liveness_handler))
        .route("/readyz", get(readiness_handler))
        .route("/metrics", get(metrics_handler))
        .route("/securities/{symbol}", get(security_handler))
        .route("/quotes/{symbol}", get(quote_handler))
        .route("/session", get(session_handler))
        .with_state(state)
}

// =============================================================================
// HTTP Handlers
// =============================================================================

async fn health_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    let response = build_health_response(&state);
    let status_code = match response.status {
        HealthStatus::Healthy | HealthStatus::Degraded => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (status_code, Json(response))
}

async fn liveness_handler() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn readiness_handler(State(state): State<Arc<HealthServerState>>) -> impl IntoResponse {
    if state.feed.is_connected() {
        (StatusCode::OK, "READY")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "NOT READY")
    }
}

async fn metrics_handler() -> impl IntoResponse {
    get_metrics_handle().map_or_else(
        || {
            (
                StatusCode::SERVICE_UNAVAILABLE,
                [("content-type", "text/plain")],
                "Metrics not initialized".to_string(),
            )
        },
        |handle| {
            let body = handle.render();
            (
                StatusCode::OK,
                [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
                body,
            )
        },
    )
}

async fn security_handler(
    State(state): State<Arc<HealthServerState>>,
    Path(symbol): Path<String>,
) -> Response {
    state.store.security(&symbol).map_or_else(
        || not_found(format!("security {symbol} not found")),
        |security| Json(security).into_response(),
    )
}

async fn quote_handler(
    State(state): State<Arc<HealthServerState>>,
    Path(symbol): Path<String>,
) -> Response {
    state.store.quote(&symbol).map_or_else(
        || not_found(format!("quote {symbol} not found")),
        |quote| Json(quote).into_response(),
    )
}

async fn session_handler(State(state): State<Arc<HealthServerState>>) -> Response {
    state.store.session_time().map_or_else(
        || not_found("no session time received".to_string()),
        |time| Json(time).into_response(),
    )
}

fn not_found(error: String) -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorBody { error })).into_response()
}

fn build_health_response(state: &HealthServerState) -> HealthResponse {
    let feed = state.feed.status();

    HealthResponse {
        status: HealthStatus::from_connection(feed.state),
        version: state.version.clone(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        current_time: Utc::now(),
        feed,
        store: StoreStatus {
            securities: state.store.security_count(),
            quotes: state.store.quote_count(),
            has_session_time: state.store.session_time().is_some(),
        },
        event_receivers: state.events.stats().total_receivers(),
    }
}

// =============================================================================
// Errors
// =============================================================================

/// Health server errors.
#[derive(Debug, thiserror::Error)]
pub enum HealthServerError {
    /// Failed to bind to port.
    #[error("failed to bind to port {0}: {1}")]
    BindFailed(u16, String),

    /// Server error.
    #[error("server error: {0}")]
    ServerFailed(String),
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use chrono::TimeZone;
    use rust_decimal::Decimal;
    use tower::ServiceExt;

    use super::*;
    use crate::domain::depth::{DepthLevel, Side};
    use crate::domain::session::{BistTime, SessionState};
    use crate::infrastructure::broadcast::EventHub;

    struct Fixture {
        feed: Arc<FeedState>,
        store: Arc<MarketStateStore>,
        app: Router,
    }

    fn fixture() -> Fixture {
        let feed = Arc::new(FeedState::new());
        let store = Arc::new(MarketStateStore::new());
        let state = Arc::new(HealthServerState::new(
            "0.1.0".to_string(),
            Arc::clone(&feed),
            Arc::clone(&store),
            Arc::new(EventHub::with_defaults()),
        ));
        Fixture {
            feed,
            store,
            app: router(state),
        }
    }

    async fn get(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = app
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(serde_json::Value::Null);
        (status, json)
    }

    #[test]
    fn health_status_serialization() {
        assert_eq!(
            serde_json::to_string(&HealthStatus::Healthy).unwrap(),
            "\"healthy\""
        );
        assert_eq!(
            serde_json::to_string(&HealthStatus::Unhealthy).unwrap(),
            "\"unhealthy\""
        );
    }

    #[test]
    fn status_follows_connection() {
        assert_eq!(
            HealthStatus::from_connection(ConnectionState::Connected),
            HealthStatus::Healthy
        );
        assert_eq!(
            HealthStatus::from_connection(ConnectionState::Connecting),
            HealthStatus::Degraded
        );
        assert_eq!(
            HealthStatus::from_connection(ConnectionState::Error),
            HealthStatus::Unhealthy
        );
    }

    #[tokio::test]
    async fn health_reports_feed_and_store() {
        let f = fixture();
        f.feed.set_state(ConnectionState::Connected);
        f.store.upsert_security("AKBNK", |_| {});

        let (status, body) = get(f.app, "/health").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["feed"]["state"], "connected");
        assert_eq!(body["store"]["securities"], 1);
        assert_eq!(body["store"]["has_session_time"], false);
    }

    #[tokio::test]
    async fn readiness_requires_connection() {
        let f = fixture();
        let (status, _) = get(f.app.clone(), "/readyz").await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

        f.feed.set_state(ConnectionState::Connected);
        let (status, _) = get(f.app, "/readyz").await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn security_lookup() {
        let f = fixture();
        f.store.upsert_security("AKBNK", |s| {
            s.description = "Akbank".to_string();
        });

        let (status, body) = get(f.app.clone(), "/securities/AKBNK").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["org_security"], "AKBNK");
        assert_eq!(body["description"], "Akbank");

        let (status, body) = get(f.app, "/securities/NOPE").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("NOPE"));
    }

    #[tokio::test]
    async fn quote_lookup() {
        let f = fixture();
        let now = Utc.with_ymd_and_hms(2026, 10, 19, 9, 30, 0).unwrap();
        f.store.apply_depth(
            "AKBNK",
            || 5,
            0,
            Side::Buy,
            DepthLevel {
                price: Decimal::new(1050, 2),
                lots: 100,
                orders: 5,
            },
            "09:30:00",
            now,
        );

        let (status, body) = get(f.app.clone(), "/quotes/AKBNK").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["depth_size"], 5);
        assert_eq!(body["rows"]["0"]["buy"]["lots"], 100);

        let (status, _) = get(f.app, "/quotes/GARAN").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn session_lookup() {
        let f = fixture();
        let (status, _) = get(f.app.clone(), "/session").await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        f.store
            .set_session_time(BistTime::new("20261019", "10:00:00", SessionState::Open));
        let (status, body) = get(f.app, "/session").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["date"], "20261019");
    }

    #[tokio::test]
    async fn liveness_is_plain_ok() {
        let f = fixture();
        let response = f
            .app
            .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}
