//! Prometheus metrics for monitoring server health.
//!
//! Metrics are exposed in Prometheus text format on a separate listener
//! configured with `METRICS_BIND`. When no exporter is installed the
//! recording calls below are no-ops.
//!
//! # Metrics
//!
//! - **WebSocket**: active and total connections, frames in and out,
//!   rate-limited frames
//! - **Rooms**: rooms created, live rooms, matchmaking requests
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use tp_server::metrics;
//! use std::net::SocketAddr;
//!
//! let addr: SocketAddr = "127.0.0.1:9090".parse().unwrap();
//! metrics::init_metrics(addr).unwrap();
//!
//! metrics::websocket_connected();
//! metrics::matchmaking_requests_total();
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

/// Record a newly established WebSocket connection.
pub fn websocket_connected() {
    metrics::gauge!("websocket_connections_active").increment(1.0);
    metrics::counter!("websocket_connections_total").increment(1);
}

/// Record a closed WebSocket connection.
pub fn websocket_disconnected() {
    metrics::gauge!("websocket_connections_active").decrement(1.0);
}

/// Increment WebSocket messages sent counter.
pub fn websocket_messages_sent(event: &'static str) {
    metrics::counter!("websocket_messages_sent", "event" => event).increment(1);
}

/// Increment WebSocket messages received counter.
pub fn websocket_messages_received() {
    metrics::counter!("websocket_messages_received").increment(1);
}

// ============================================================================
// Rate Limiting Metrics
// ============================================================================

/// Increment rate limit hits counter.
pub fn rate_limit_hits_total(window: &'static str) {
    metrics::counter!("rate_limit_hits_total", "window" => window).increment(1);
}

// ============================================================================
// Room Metrics
// ============================================================================

/// Publish the manager's running total of spawned rooms.
pub fn rooms_created_total(total: u64) {
    metrics::counter!("rooms_created_total").absolute(total);
}

/// Set current live rooms count.
pub fn active_rooms(count: usize) {
    metrics::gauge!("active_rooms").set(count as f64);
}

/// Increment matchmaking requests counter.
pub fn matchmaking_requests_total() {
    metrics::counter!("matchmaking_requests_total").increment(1);
}
