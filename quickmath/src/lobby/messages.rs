//! Lobby actor message types.

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

use super::state::{IgnoreReason, LobbyCode, LobbySnapshot, LobbyStatus, PlayerId};

/// Messages that can be sent to a LobbyActor
#[derive(Debug)]
pub enum LobbyMessage {
    /// Join (or re-join) the lobby and subscribe to its broadcasts
    Join {
        player_id: PlayerId,
        player_name: String,
        subscriber: mpsc::Sender<LobbyBroadcast>,
        response: oneshot::Sender<LobbyResponse>,
    },

    /// Mark a player as ready
    SetReady {
        player_id: PlayerId,
        response: oneshot::Sender<LobbyResponse>,
    },

    /// Record an answer outcome
    SubmitAnswer {
        player_id: PlayerId,
        is_correct: bool,
        response: oneshot::Sender<LobbyResponse>,
    },

    /// Leave the lobby and drop the subscription
    Leave {
        player_id: PlayerId,
        response: oneshot::Sender<LobbyResponse>,
    },

    /// Get the current lobby state
    GetSnapshot {
        response: oneshot::Sender<LobbySnapshot>,
    },

    /// Internal: round deadline reached (posted by the round timer)
    Deadline,
}

/// Broadcast event names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BroadcastKind {
    /// After join, ready and leave
    LobbyUpdate,
    /// On `waiting -> playing`
    GameStart,
    /// After an accepted answer
    ScoreUpdate,
    /// On `playing -> finished`
    GameEnd,
}

impl std::fmt::Display for BroadcastKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BroadcastKind::LobbyUpdate => write!(f, "lobby-update"),
            BroadcastKind::GameStart => write!(f, "game-start"),
            BroadcastKind::ScoreUpdate => write!(f, "score-update"),
            BroadcastKind::GameEnd => write!(f, "game-end"),
        }
    }
}

/// A state broadcast fanned out to every subscriber of a lobby
///
/// Serialises as `{"event": "...", "code": "...", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyBroadcast {
    pub event: BroadcastKind,
    pub code: LobbyCode,
    pub data: LobbySnapshot,
}

/// Response from lobby operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyResponse {
    /// Player added (or re-added)
    Joined { rejoined: bool },

    /// Player marked ready, round not started
    Ready,

    /// Player marked ready and the round started
    Started,

    /// Answer accepted
    AnswerRecorded { correct: bool, score: u32 },

    /// Player removed; the lobby shuts down when `remaining` is 0
    Left { remaining: usize },

    /// Player was not in this lobby
    NotInLobby,

    /// Event was a no-op
    Ignored(IgnoreReason),
}

impl LobbyResponse {
    /// Whether the lobby state changed
    pub fn is_applied(&self) -> bool {
        !matches!(self, LobbyResponse::Ignored(_) | LobbyResponse::NotInLobby)
    }
}

/// Registry listing entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySummary {
    pub code: LobbyCode,
    pub status: LobbyStatus,
    pub player_count: usize,
    pub duration: u64,
}
