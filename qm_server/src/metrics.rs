//! Prometheus metrics for monitoring lobby server health.
//!
//! Metrics are exposed in Prometheus text format by a separate listener,
//! enabled with `METRICS_BIND`. Without an installed exporter every recording
//! call is a no-op.
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use qm_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::websocket_connection_opened();
//! metrics::lobbies_active(3);
//! ```

use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

/// Initialize Prometheus metrics exporter.
///
/// Metrics will be available at `http://<addr>/metrics`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), String> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()
        .map_err(|e| format!("Failed to install Prometheus exporter: {}", e))
}

// ============================================================================
// WebSocket Metrics
// ============================================================================

/// Record a new WebSocket connection.
pub fn websocket_connection_opened() {
    metrics::counter!("websocket_connections_total").increment(1);
    metrics::gauge!("websocket_connections_active").increment(1.0);
}

/// Record a closed WebSocket connection.
pub fn websocket_connection_closed() {
    metrics::gauge!("websocket_connections_active").decrement(1.0);
}

/// Increment WebSocket messages received counter.
pub fn websocket_messages_received() {
    metrics::counter!("websocket_messages_received").increment(1);
}

/// Increment dropped client messages counter.
pub fn websocket_messages_dropped(reason: &'static str) {
    metrics::counter!("websocket_messages_dropped", "reason" => reason).increment(1);
}

// ============================================================================
// Lobby Metrics
// ============================================================================

/// Set current live lobbies count.
pub fn lobbies_active(count: usize) {
    metrics::gauge!("lobbies_active").set(count as f64);
}

/// Increment started rounds counter.
pub fn rounds_started_total() {
    metrics::counter!("rounds_started_total").increment(1);
}

/// Increment accepted answers counter.
pub fn answers_total(correct: bool) {
    metrics::counter!("answers_total", "correct" => correct.to_string()).increment(1);
}
