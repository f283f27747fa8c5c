//! HTTP/WebSocket API for the lobby server.
//!
//! Players talk to the server over a single WebSocket; the HTTP routes are
//! read-only views for monitoring.
//!
//! # Endpoints
//!
//! ```text
//! GET /health                  - Server health status
//! GET /ws                      - WebSocket event channel (one connection = one player)
//! GET /api/v1/lobbies          - List live lobbies
//! GET /api/v1/lobbies/{code}   - Lobby snapshot
//! ```
//!
//! # Example Usage
//!
//! ```rust,no_run
//! use qm_server::api::{AppState, create_router};
//! use qm_server::config::ConnectionConfig;
//! use quickmath::lobby::{LobbyConfig, LobbyManager};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let state = AppState {
//!     lobby_manager: Arc::new(LobbyManager::new(LobbyConfig::default())?),
//!     connection: ConnectionConfig::default(),
//! };
//!
//! let app = create_router(state);
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```
//!
//! # CORS
//!
//! CORS is permissive: any origin may connect.

pub mod lobbies;
pub mod rate_limiter;
pub mod request_id;
pub mod websocket;

use axum::{
    Router,
    extract::State,
    response::{IntoResponse, Json},
    routing::get,
};
use quickmath::lobby::LobbyManager;
use serde_json::json;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

use crate::config::ConnectionConfig;

/// Application state shared across all HTTP handlers and WebSocket connections.
#[derive(Clone)]
pub struct AppState {
    pub lobby_manager: Arc<LobbyManager>,
    pub connection: ConnectionConfig,
}

/// Create the API router with all endpoints and middleware.
pub fn create_router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/lobbies", get(lobbies::list_lobbies))
        .route("/lobbies/{code}", get(lobbies::get_lobby));

    Router::new()
        .route("/health", get(health_check))
        .route("/ws", get(websocket::websocket_handler))
        .nest("/api/v1", v1_routes)
        .layer(axum::middleware::from_fn(request_id::request_id_middleware))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Health check endpoint for monitoring and load balancers.
///
/// ```bash
/// curl http://localhost:3000/health
/// # {"status":"healthy","version":"0.1.0","lobbies":2,"timestamp":"2026-10-18T10:30:00Z"}
/// ```
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let lobbies = state.lobby_manager.lobby_count().await;
    crate::metrics::lobbies_active(lobbies);

    Json(json!({
        "status": "healthy",
        "version": env!("CARGO_PKG_VERSION"),
        "lobbies": lobbies,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    }))
}
