//! Lobby state machine.
//!
//! A [`Lobby`] is plain data plus the transition rules of a single game
//! round: `waiting -> playing -> finished`. It never touches the clock or a
//! channel itself; callers pass the current time in, which keeps every rule
//! deterministic and testable without a runtime. The [`LobbyActor`] is the
//! only owner of a live `Lobby`.
//!
//! [`LobbyActor`]: super::actor::LobbyActor

use serde::{Deserialize, Serialize};
use std::{
    collections::HashMap,
    fmt,
    time::{Duration, Instant},
};

use super::config::LobbyConfig;

/// Opaque connection identifier of a player.
pub type PlayerId = String;

/// Opaque invite code identifying a lobby.
pub type LobbyCode = String;

/// Lifecycle phase of a lobby
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LobbyStatus {
    Waiting,
    Playing,
    Finished,
}

impl fmt::Display for LobbyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LobbyStatus::Waiting => write!(f, "waiting"),
            LobbyStatus::Playing => write!(f, "playing"),
            LobbyStatus::Finished => write!(f, "finished"),
        }
    }
}

/// A participant of a lobby
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
    pub id: PlayerId,
    pub name: String,
    pub score: u32,
    pub is_ready: bool,
}

impl Player {
    fn new(id: PlayerId, name: String) -> Self {
        Self {
            id,
            name,
            score: 0,
            is_ready: false,
        }
    }
}

/// Full lobby state as sent to clients with every broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LobbySnapshot {
    pub players: HashMap<PlayerId, Player>,
    pub status: LobbyStatus,
    /// Round length in seconds
    pub duration: u64,
    /// Epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_time: Option<i64>,
    /// Epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<i64>,
}

/// Why an event left the lobby untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreReason {
    UnknownPlayer,
    WrongStatus(LobbyStatus),
    Debounced,
}

impl fmt::Display for IgnoreReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IgnoreReason::UnknownPlayer => write!(f, "player not in lobby"),
            IgnoreReason::WrongStatus(status) => write!(f, "lobby is {status}"),
            IgnoreReason::Debounced => write!(f, "duplicate submission"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined,
    /// Same id joined again; score and readiness were reset
    Rejoined,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyOutcome {
    /// Player is ready, the quorum is not
    Ready,
    /// Player was the last one missing; the round is now running
    Started,
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnswerOutcome {
    Recorded { correct: bool, score: u32 },
    Ignored(IgnoreReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    Left { remaining: usize },
    NotPresent,
}

/// A single lobby and its game round
#[derive(Debug, Clone)]
pub struct Lobby {
    code: LobbyCode,
    players: HashMap<PlayerId, Player>,
    status: LobbyStatus,
    duration_secs: u64,
    min_players: usize,
    answer_debounce: Duration,
    start_time: Option<i64>,
    end_time: Option<i64>,
    /// Last accepted answer per player, for deduplication
    last_answer: HashMap<PlayerId, Instant>,
}

impl Lobby {
    pub fn new(code: impl Into<LobbyCode>, config: &LobbyConfig) -> Self {
        Self {
            code: code.into(),
            players: HashMap::new(),
            status: LobbyStatus::Waiting,
            duration_secs: config.duration_secs,
            min_players: config.min_players,
            answer_debounce: config.answer_debounce(),
            start_time: None,
            end_time: None,
            last_answer: HashMap::new(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn status(&self) -> LobbyStatus {
        self.status
    }

    pub fn duration_secs(&self) -> u64 {
        self.duration_secs
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn player(&self, player_id: &str) -> Option<&Player> {
        self.players.get(player_id)
    }

    /// Add a player, or overwrite the entry of a player with the same id.
    ///
    /// Overwriting resets score and readiness. Joining is accepted in every
    /// status so a reconnecting client can get back into its lobby.
    pub fn join(&mut self, player_id: PlayerId, name: String) -> JoinOutcome {
        self.last_answer.remove(&player_id);
        let previous = self
            .players
            .insert(player_id.clone(), Player::new(player_id, name));

        match previous {
            Some(_) => JoinOutcome::Rejoined,
            None => JoinOutcome::Joined,
        }
    }

    /// Latch a player's readiness and start the round once the quorum is met.
    ///
    /// `now_ms` is the wall clock in epoch milliseconds, used to stamp the
    /// round boundaries.
    pub fn set_ready(&mut self, player_id: &str, now_ms: i64) -> ReadyOutcome {
        if self.status == LobbyStatus::Finished {
            return ReadyOutcome::Ignored(IgnoreReason::WrongStatus(self.status));
        }

        let Some(player) = self.players.get_mut(player_id) else {
            return ReadyOutcome::Ignored(IgnoreReason::UnknownPlayer);
        };
        player.is_ready = true;

        if self.status == LobbyStatus::Waiting && self.quorum_ready() {
            self.start(now_ms);
            ReadyOutcome::Started
        } else {
            ReadyOutcome::Ready
        }
    }

    /// Every current player is ready and there are enough of them.
    pub fn quorum_ready(&self) -> bool {
        self.players.len() >= self.min_players && self.players.values().all(|p| p.is_ready)
    }

    fn start(&mut self, now_ms: i64) {
        let duration_ms = i64::try_from(self.duration_secs.saturating_mul(1000)).unwrap_or(i64::MAX);
        self.status = LobbyStatus::Playing;
        self.start_time = Some(now_ms);
        self.end_time = Some(now_ms.saturating_add(duration_ms));
    }

    /// Record an answer. Only `correct == true` scores a point.
    ///
    /// A second submission from the same player inside the debounce window is
    /// dropped, whatever its correctness.
    pub fn submit_answer(&mut self, player_id: &str, correct: bool, now: Instant) -> AnswerOutcome {
        if self.status != LobbyStatus::Playing {
            return AnswerOutcome::Ignored(IgnoreReason::WrongStatus(self.status));
        }

        let Some(player) = self.players.get_mut(player_id) else {
            return AnswerOutcome::Ignored(IgnoreReason::UnknownPlayer);
        };

        if let Some(last) = self.last_answer.get(player_id)
            && now.saturating_duration_since(*last) < self.answer_debounce
        {
            return AnswerOutcome::Ignored(IgnoreReason::Debounced);
        }
        self.last_answer.insert(player_id.to_string(), now);

        if correct {
            player.score += 1;
        }

        AnswerOutcome::Recorded {
            correct,
            score: player.score,
        }
    }

    /// End the round. Returns `false` unless the lobby was playing.
    pub fn finish(&mut self) -> bool {
        if self.status != LobbyStatus::Playing {
            return false;
        }
        self.status = LobbyStatus::Finished;
        true
    }

    pub fn leave(&mut self, player_id: &str) -> LeaveOutcome {
        self.last_answer.remove(player_id);
        match self.players.remove(player_id) {
            Some(_) => LeaveOutcome::Left {
                remaining: self.players.len(),
            },
            None => LeaveOutcome::NotPresent,
        }
    }

    pub fn snapshot(&self) -> LobbySnapshot {
        LobbySnapshot {
            players: self.players.clone(),
            status: self.status,
            duration: self.duration_secs,
            start_time: self.start_time,
            end_time: self.end_time,
        }
    }
}
