//! Lobby error types.

use thiserror::Error;

use super::state::LobbyCode;

/// Result type for lobby operations
pub type LobbyResult<T> = Result<T, LobbyError>;

/// Lobby errors
///
/// None of these reach a client; the dispatcher logs them and moves on.
#[derive(Debug, Error)]
pub enum LobbyError {
    /// No lobby is registered under this code
    #[error("Lobby not found: {0}")]
    LobbyNotFound(LobbyCode),

    /// The lobby's actor stopped before it answered
    #[error("Lobby {0} is closed")]
    LobbyClosed(LobbyCode),

    /// Configuration rejected by validation
    #[error("Invalid lobby configuration: {0}")]
    InvalidConfig(String),
}
