//! # QuickMath
//!
//! Lobby coordinator for a real-time arithmetic race game.
//!
//! Players join a short-lived lobby through an invite code, signal that they
//! are ready, and once every player (at least two) is ready a timed round
//! starts. Answers are scored as they arrive and the full lobby state is
//! broadcast to every participant after each change.
//!
//! ## Lifecycle
//!
//! - **Waiting**: players join and signal ready
//! - **Playing**: the round timer runs, answers score points
//! - **Finished**: terminal; results stay visible until everyone leaves
//!
//! ## Core Modules
//!
//! - [`lobby`]: State machine, lobby actors and the lobby registry
//!
//! ## Example
//!
//! ```
//! use quickmath::{Lobby, LobbyConfig, LobbyStatus};
//!
//! let lobby = Lobby::new("ABC123", &LobbyConfig::default());
//! assert_eq!(lobby.status(), LobbyStatus::Waiting);
//! ```

/// Lobby state machine, actors and registry.
pub mod lobby;
pub use lobby::{
    BroadcastKind, Lobby, LobbyBroadcast, LobbyConfig, LobbyError, LobbyManager, LobbyResponse,
    LobbySnapshot, LobbyStatus, Player,
};
