//! Lobby module providing the game coordinator with an async actor model.
//!
//! This module implements:
//! - Lobby: the `waiting -> playing -> finished` state machine of one round
//! - LobbyActor: async actor owning a single lobby
//! - LobbyManager: registry of lobby actors keyed by invite code
//! - Message-based communication with tokio channels
//!
//! ## Architecture
//!
//! Each lobby runs in a separate Tokio task with an mpsc message inbox, so
//! mutations of one lobby are applied one at a time and in arrival order.
//! The round deadline is a deferred message posted into the same inbox.
//! Broadcasts go to an explicit set of subscriber channels per lobby.
//!
//! ## Example
//!
//! ```no_run
//! use quickmath::lobby::{LobbyConfig, LobbyManager};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let manager = LobbyManager::new(LobbyConfig::default())?;
//!     let (tx, mut rx) = mpsc::channel(32);
//!
//!     manager.join("ABC123", "conn-1", "Alice", tx).await?;
//!     let update = rx.recv().await.unwrap();
//!     println!("{} players waiting", update.data.players.len());
//!     Ok(())
//! }
//! ```

pub mod actor;
pub mod config;
pub mod errors;
pub mod manager;
pub mod messages;
pub mod state;

pub use actor::{LobbyActor, LobbyHandle};
pub use config::LobbyConfig;
pub use errors::{LobbyError, LobbyResult};
pub use manager::LobbyManager;
pub use messages::{BroadcastKind, LobbyBroadcast, LobbyMessage, LobbyResponse, LobbySummary};
pub use state::{IgnoreReason, Lobby, LobbyCode, LobbySnapshot, LobbyStatus, Player, PlayerId};
