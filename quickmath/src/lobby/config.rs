//! Lobby configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::errors::LobbyError;

/// Settings shared by every lobby a [`LobbyManager`] creates
///
/// [`LobbyManager`]: super::manager::LobbyManager
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LobbyConfig {
    /// Length of a game round in seconds (default: 60)
    pub duration_secs: u64,

    /// Players required before a round can start (default: 2)
    pub min_players: usize,

    /// Minimum gap between two accepted answers of one player, in
    /// milliseconds. 0 disables deduplication.
    pub answer_debounce_ms: u64,

    /// Capacity of each lobby actor's inbox
    pub inbox_capacity: usize,
}

impl Default for LobbyConfig {
    fn default() -> Self {
        Self {
            duration_secs: 60,
            min_players: 2,
            answer_debounce_ms: 300,
            inbox_capacity: 100,
        }
    }
}

impl LobbyConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), LobbyError> {
        if self.duration_secs == 0 {
            return Err(LobbyError::InvalidConfig(
                "Round duration must be at least 1 second".to_string(),
            ));
        }

        if self.min_players < 2 {
            return Err(LobbyError::InvalidConfig(
                "A round needs at least 2 players".to_string(),
            ));
        }

        if self.inbox_capacity == 0 {
            return Err(LobbyError::InvalidConfig(
                "Inbox capacity must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs(self.duration_secs)
    }

    pub fn answer_debounce(&self) -> Duration {
        Duration::from_millis(self.answer_debounce_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = LobbyConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.duration(), Duration::from_secs(60));
        assert_eq!(config.answer_debounce(), Duration::from_millis(300));
    }

    #[test]
    fn test_zero_duration_rejected() {
        let config = LobbyConfig {
            duration_secs: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LobbyError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_single_player_quorum_rejected() {
        let config = LobbyConfig {
            min_players: 1,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_inbox_rejected() {
        let config = LobbyConfig {
            inbox_capacity: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_debounce_allowed() {
        let config = LobbyConfig {
            answer_debounce_ms: 0,
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
