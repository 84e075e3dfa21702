//! Structured logging configuration.
//!
//! The engine crate logs through the `log` facade; the subscriber installed
//! here picks those records up alongside the server's own `tracing` events.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var and default to
/// `info,sqlx=warn,hyper=warn`.
///
/// # Example
///
/// ```no_run
/// use tp_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log security event with structured data
///
/// # Arguments
///
/// * `event_type` - Type of security event
/// * `user_id` - User the event concerns, if known
/// * `message` - Event message
///
/// # Example
///
/// ```
/// use tp_server::logging::log_security_event;
///
/// log_security_event("invalid_token", None, "Signature mismatch");
/// ```
pub fn log_security_event(event_type: &str, user_id: Option<i64>, message: &str) {
    tracing::warn!(
        event_type = event_type,
        user_id = user_id,
        "SECURITY: {}",
        message
    );
}

/// Log a rejected WebSocket frame
pub fn log_rejected_frame(room_id: i64, user_id: i64, reason: &str) {
    tracing::debug!(
        room_id = room_id,
        user_id = user_id,
        reason = reason,
        "Rejected client frame"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_helpers_do_not_panic() {
        log_security_event("invalid_token", Some(1), "Test message");
        log_security_event("missing_token", None, "Test message");
        log_rejected_frame(3, 1, "malformed");
    }
}
