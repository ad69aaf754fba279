//! Prometheus Metrics Module
//!
//! Exposes feed handler metrics in Prometheus format.
//!
//! # Metrics Categories
//!
//! - **Transport**: Bytes received, connection state
//! - **Framing**: Lines by message type, dropped chunks
//! - **Decoding**: Decoded, rejected and panicked messages per queue, decode latency
//! - **State**: Number of known securities
//!
//! # Integration
//!
//! Metrics are exposed at `/metrics` on the health server port.

use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use crate::infrastructure::feed::protocol::{MessageType, QueueKind};

// =============================================================================
// Global Metrics Handle
// =============================================================================

static PROMETHEUS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Initialize the Prometheus metrics recorder.
///
/// Subsequent calls return the handle installed by the first call.
///
/// # Panics
///
/// Panics if the recorder cannot be installed on the first call.
pub fn init_metrics() -> PrometheusHandle {
    PROMETHEUS_HANDLE
        .get_or_init(|| {
            let handle = PrometheusBuilder::new()
                .install_recorder()
                .expect("failed to install Prometheus recorder");

            register_metrics();
            handle
        })
        .clone()
}

/// Get the Prometheus handle for rendering metrics.
///
/// Returns `None` if metrics have not been initialized.
#[must_use]
pub fn get_metrics_handle() -> Option<PrometheusHandle> {
    PROMETHEUS_HANDLE.get().cloned()
}

// =============================================================================
// Metric Registration
// =============================================================================

fn register_metrics() {
    describe_counter!(
        "bist_feed_bytes_received_total",
        "Total bytes received from the feed"
    );
    describe_counter!(
        "bist_feed_lines_total",
        "Total complete lines routed, by message type"
    );
    describe_counter!(
        "bist_feed_chunks_dropped_total",
        "Total received chunks dropped for invalid encoding"
    );

    describe_counter!(
        "bist_feed_messages_decoded_total",
        "Total messages decoded, by queue"
    );
    describe_counter!(
        "bist_feed_messages_rejected_total",
        "Total messages rejected by validation, by queue"
    );
    describe_counter!(
        "bist_feed_decoder_panics_total",
        "Total decoder panics caught at the worker boundary, by queue"
    );

    describe_gauge!(
        "bist_feed_connected",
        "Whether the feed connection is up (1) or down (0)"
    );
    describe_gauge!("bist_feed_securities", "Number of known securities");

    describe_histogram!(
        "bist_feed_decode_seconds",
        "Time spent decoding one message, by queue"
    );
}

// =============================================================================
// Metric Recording Functions
// =============================================================================

/// Record bytes received from the transport.
pub fn record_bytes_received(count: usize) {
    counter!("bist_feed_bytes_received_total").increment(count as u64);
}

/// Record a complete line routed to a queue.
pub fn record_line(message_type: MessageType) {
    counter!(
        "bist_feed_lines_total",
        "message_type" => message_type.as_str()
    )
    .increment(1);
}

/// Record a chunk dropped for invalid encoding.
pub fn record_chunk_dropped() {
    counter!("bist_feed_chunks_dropped_total").increment(1);
}

/// Record a successfully decoded message.
pub fn record_decoded(queue: QueueKind) {
    counter!(
        "bist_feed_messages_decoded_total",
        "queue" => queue.as_str()
    )
    .increment(1);
}

/// Record a message rejected by validation.
pub fn record_rejected(queue: QueueKind) {
    counter!(
        "bist_feed_messages_rejected_total",
        "queue" => queue.as_str()
    )
    .increment(1);
}

/// Record a decoder panic.
pub fn record_decoder_panic(queue: QueueKind) {
    counter!(
        "bist_feed_decoder_panics_total",
        "queue" => queue.as_str()
    )
    .increment(1);
}

/// Record decode duration.
pub fn record_decode_duration(queue: QueueKind, duration: Duration) {
    histogram!(
        "bist_feed_decode_seconds",
        "queue" => queue.as_str()
    )
    .record(duration.as_secs_f64());
}

/// Update the connection gauge.
pub fn set_connected(connected: bool) {
    gauge!("bist_feed_connected").set(if connected { 1.0 } else { 0.0 });
}

/// Update the security count gauge.
#[allow(clippy::cast_precision_loss)]
pub fn set_securities(count: usize) {
    gauge!("bist_feed_securities").set(count as f64);
}

// =============================================================================
// Tests
// =============================================================================
