//! Server configuration management.
//!
//! Consolidates all environment variable reads and provides validated configuration.

use quickmath::lobby::{LobbyConfig, LobbyError};
use std::net::SocketAddr;

/// Default bind address
pub const DEFAULT_BIND: &str = "127.0.0.1:3000";

/// Complete server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Server bind address
    pub bind: SocketAddr,
    /// Lobby settings
    pub lobby: LobbyConfig,
    /// Per-connection limits
    pub connection: ConnectionConfig,
    /// Prometheus exporter address (disabled when unset)
    pub metrics_bind: Option<SocketAddr>,
}

/// Per-connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Buffered broadcasts per connection before new ones are dropped
    pub subscriber_capacity: usize,
    /// Messages allowed per second
    pub burst_limit: usize,
    /// Messages allowed per minute
    pub sustained_limit: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            subscriber_capacity: 32,
            burst_limit: 10,
            sustained_limit: 120,
        }
    }
}

impl ServerConfig {
    /// Load configuration from environment variables
    ///
    /// # Arguments
    ///
    /// * `bind_override` - Optional bind address override (from CLI args)
    /// * `duration_override` - Optional round length override (from CLI args)
    ///
    /// # Errors
    ///
    /// Returns error if a variable is set but cannot be parsed
    pub fn from_env(
        bind_override: Option<SocketAddr>,
        duration_override: Option<u64>,
    ) -> Result<Self, ConfigError> {
        let bind = match bind_override {
            Some(bind) => bind,
            None => parse_env_required("SERVER_BIND", DEFAULT_BIND)?,
        };

        let metrics_bind = match std::env::var("METRICS_BIND") {
            Ok(value) if !value.trim().is_empty() => {
                Some(value.parse().map_err(|_| ConfigError::Invalid {
                    var: "METRICS_BIND".to_string(),
                    reason: format!("'{value}' is not a socket address"),
                })?)
            }
            _ => None,
        };

        let defaults = LobbyConfig::default();
        let lobby = LobbyConfig {
            duration_secs: duration_override
                .unwrap_or_else(|| parse_env_or("GAME_DURATION_SECS", defaults.duration_secs)),
            min_players: parse_env_or("MIN_PLAYERS", defaults.min_players),
            answer_debounce_ms: parse_env_or("ANSWER_DEBOUNCE_MS", defaults.answer_debounce_ms),
            inbox_capacity: parse_env_or("LOBBY_INBOX_CAPACITY", defaults.inbox_capacity),
        };

        let connection_defaults = ConnectionConfig::default();
        let connection = ConnectionConfig {
            subscriber_capacity: parse_env_or(
                "SUBSCRIBER_CAPACITY",
                connection_defaults.subscriber_capacity,
            ),
            burst_limit: parse_env_or("WS_BURST_LIMIT", connection_defaults.burst_limit),
            sustained_limit: parse_env_or("WS_SUSTAINED_LIMIT", connection_defaults.sustained_limit),
        };

        Ok(ServerConfig {
            bind,
            lobby,
            connection,
            metrics_bind,
        })
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.lobby.validate().map_err(|e| match e {
            LobbyError::InvalidConfig(reason) => ConfigError::Invalid {
                var: "lobby".to_string(),
                reason,
            },
            other => ConfigError::Invalid {
                var: "lobby".to_string(),
                reason: other.to_string(),
            },
        })?;

        if self.connection.subscriber_capacity == 0 {
            return Err(ConfigError::Invalid {
                var: "SUBSCRIBER_CAPACITY".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.connection.burst_limit == 0 {
            return Err(ConfigError::Invalid {
                var: "WS_BURST_LIMIT".to_string(),
                reason: "Must be greater than 0".to_string(),
            });
        }

        if self.connection.sustained_limit < self.connection.burst_limit {
            return Err(ConfigError::Invalid {
                var: "WS_SUSTAINED_LIMIT".to_string(),
                reason: format!(
                    "Must be at least the burst limit ({})",
                    self.connection.burst_limit
                ),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Like [`parse_env_or`], but a set-and-unparseable value is an error
fn parse_env_required<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    let raw = std::env::var(key).unwrap_or_else(|_| default.to_string());
    raw.parse().map_err(|_| ConfigError::Invalid {
        var: key.to_string(),
        reason: format!("cannot parse '{raw}'"),
    })
}
