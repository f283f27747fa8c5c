//! Structured logging configuration.
//!
//! The lobby library logs through the `log` facade; those records are
//! bridged into the tracing subscriber installed here.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use qm_server::logging;
///
/// #[tokio::main]
/// async fn main() {
///     logging::init();
///     tracing::info!("Server starting");
/// }
/// ```
pub fn init() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tower_http=warn,hyper=warn"));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();

    tracing::info!("Structured logging initialized");
}

/// Log a client event that the dispatcher dropped
///
/// # Arguments
///
/// * `player_id` - Connection the event came from
/// * `reason` - Why it was dropped
/// * `detail` - Parser or limiter detail
pub fn log_dropped_event(player_id: &str, reason: &str, detail: &str) {
    tracing::warn!(
        player_id = player_id,
        reason = reason,
        detail = detail,
        "Dropped client event"
    );
}

/// Log the outcome of a lobby operation
pub fn log_lobby_event(event: &str, code: &str, player_id: &str, outcome: &str) {
    tracing::debug!(
        lobby_event = event,
        lobby_code = code,
        player_id = player_id,
        outcome = outcome,
        "Lobby event handled"
    );
}
