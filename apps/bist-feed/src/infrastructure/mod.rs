//! Infrastructure Layer - Adapters and external integrations.
//!
//! This layer contains the feed pipeline itself and the concrete
//! implementations of the port interfaces defined in the application layer.

/// Typed broadcast channels for decoded events.
pub mod broadcast;

/// Configuration loading.
pub mod config;

/// BIST feed transport, framing, routing, workers and decoders.
pub mod feed;

/// Health check and state query HTTP endpoint.
pub mod health;

/// Prometheus metrics instrumentation.
pub mod metrics;

/// File-backed reference data source.
pub mod reference;

/// Tracing subscriber and OpenTelemetry integration.
pub mod telemetry;
