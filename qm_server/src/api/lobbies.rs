//! Read-only lobby endpoints.

use axum::{
    Extension,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
};
use quickmath::lobby::{LobbySnapshot, LobbySummary};
use serde::Serialize;

use super::{AppState, request_id::RequestId};

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// List all live lobbies
///
/// # Response
///
/// JSON array of `{code, status, playerCount, duration}`, sorted by code.
pub async fn list_lobbies(State(state): State<AppState>) -> Json<Vec<LobbySummary>> {
    Json(state.lobby_manager.list_lobbies().await)
}

/// Get the current snapshot of one lobby
pub async fn get_lobby(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Path(code): Path<String>,
) -> Result<Json<LobbySnapshot>, (StatusCode, Json<ErrorResponse>)> {
    match state.lobby_manager.snapshot(&code).await {
        Some(snapshot) => Ok(Json(snapshot)),
        None => {
            tracing::debug!(
                request_id = request_id.as_str(),
                lobby_code = %code,
                "Lobby not found"
            );
            Err((
                StatusCode::NOT_FOUND,
                Json(ErrorResponse {
                    error: format!("Lobby {code} not found"),
                }),
            ))
        }
    }
}
