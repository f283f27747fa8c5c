//! Quickmath lobby server.
//!
//! Every lobby runs as its own actor task managed by LobbyManager; players
//! connect over a single WebSocket endpoint.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Error;
use log::info;
use pico_args::Arguments;
use qm_server::{api, config::ServerConfig, logging, metrics};
use quickmath::lobby::LobbyManager;

const HELP: &str = "\
Run the quickmath lobby server

USAGE:
  qm_server [OPTIONS]

OPTIONS:
  --bind       IP:PORT     Server socket bind address  [default: env SERVER_BIND or 127.0.0.1:3000]
  --duration   SECS        Round length in seconds     [default: env GAME_DURATION_SECS or 60]

FLAGS:
  -h, --help               Print help information

ENVIRONMENT:
  SERVER_BIND              Server bind address (e.g., 0.0.0.0:8080)
  GAME_DURATION_SECS       Round length in seconds
  MIN_PLAYERS              Ready players needed to start a round
  ANSWER_DEBOUNCE_MS       Window in which repeat answers are ignored
  LOBBY_INBOX_CAPACITY     Queued events per lobby
  SUBSCRIBER_CAPACITY      Buffered broadcasts per connection
  WS_BURST_LIMIT           Client events per second
  WS_SUSTAINED_LIMIT       Client events per minute
  METRICS_BIND             Prometheus exporter address (disabled when unset)
  RUST_LOG                 Log filter
";

struct Args {
    bind: Option<SocketAddr>,
    duration: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Load .env file if it exists
    let _ = dotenvy::dotenv();

    let mut pargs = Arguments::from_env();

    // Help has a higher priority and should be handled separately.
    if pargs.contains(["-h", "--help"]) {
        print!("{HELP}");
        std::process::exit(0);
    }

    let args = Args {
        bind: pargs.opt_value_from_str("--bind")?,
        duration: pargs.opt_value_from_str("--duration")?,
    };

    logging::init();

    let config = ServerConfig::from_env(args.bind, args.duration)?;
    config.validate()?;

    if let Some(metrics_bind) = config.metrics_bind {
        metrics::init_metrics(metrics_bind).map_err(|e| anyhow::anyhow!(e))?;
        info!("Prometheus metrics exported at http://{}/metrics", metrics_bind);
    }

    info!(
        "Lobby settings: {}s rounds, {} players to start, {}ms answer debounce",
        config.lobby.duration_secs, config.lobby.min_players, config.lobby.answer_debounce_ms
    );

    let lobby_manager = Arc::new(LobbyManager::new(config.lobby.clone())?);

    let api_state = api::AppState {
        lobby_manager,
        connection: config.connection.clone(),
    };

    let app = api::create_router(api_state);

    info!("Starting HTTP/WebSocket server on {}", config.bind);
    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", config.bind, e))?;

    info!(
        "Server is running at http://{}. Press Ctrl+C to stop.",
        config.bind
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    info!("Shutting down server...");

    Ok(())
}

/// Graceful shutdown signal
async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
}
