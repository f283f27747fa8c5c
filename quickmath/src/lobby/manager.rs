//! Lobby manager for spawning and tracking lobby actors.

use super::{
    actor::{LobbyActor, LobbyHandle},
    config::LobbyConfig,
    errors::{LobbyError, LobbyResult},
    messages::{LobbyBroadcast, LobbyMessage, LobbyResponse, LobbySummary},
    state::{LobbyCode, LobbySnapshot},
};
use std::{collections::HashMap, sync::Arc};
use tokio::sync::{RwLock, mpsc};
use uuid::Uuid;

/// How often a join is retried when it races with the destruction of the
/// lobby it targeted
const JOIN_ATTEMPTS: usize = 3;

/// Registry of live lobbies, keyed by invite code
///
/// The manager holds only actor handles. Each lobby's state lives in its own
/// [`LobbyActor`] task.
#[derive(Clone)]
pub struct LobbyManager {
    /// Settings for newly created lobbies
    config: LobbyConfig,

    /// Active lobby handles
    lobbies: Arc<RwLock<HashMap<LobbyCode, LobbyHandle>>>,
}

impl LobbyManager {
    /// Create a new lobby manager
    ///
    /// # Errors
    ///
    /// Returns [`LobbyError::InvalidConfig`] if `config` fails validation
    pub fn new(config: LobbyConfig) -> LobbyResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            lobbies: Arc::new(RwLock::new(HashMap::new())),
        })
    }

    /// Lobby settings
    pub fn config(&self) -> &LobbyConfig {
        &self.config
    }

    /// Get a lobby handle
    pub async fn get_lobby(&self, code: &str) -> Option<LobbyHandle> {
        let lobbies = self.lobbies.read().await;
        lobbies.get(code).cloned()
    }

    /// Get the handle for `code`, spawning a fresh lobby if there is none
    async fn get_or_create(&self, code: &str) -> LobbyHandle {
        let mut lobbies = self.lobbies.write().await;

        if let Some(handle) = lobbies.get(code)
            && !handle.is_closed()
        {
            return handle.clone();
        }

        let (actor, handle) = LobbyActor::new(code.to_string(), &self.config);
        lobbies.insert(code.to_string(), handle.clone());
        drop(lobbies);

        tokio::spawn(async move {
            actor.run().await;
        });

        log::info!("Created lobby {}", code);
        handle
    }

    /// Drop the registry entry for `code` if it still belongs to `instance`
    async fn remove_instance(&self, code: &str, instance: Uuid) {
        let mut lobbies = self.lobbies.write().await;
        if lobbies
            .get(code)
            .is_some_and(|handle| handle.instance() == instance)
        {
            lobbies.remove(code);
            log::info!("Removed lobby {}", code);
        }
    }

    /// Join a lobby, creating it on first use
    ///
    /// `subscriber` becomes the player's entry in the lobby's broadcast group.
    ///
    /// # Arguments
    ///
    /// * `code` - Invite code
    /// * `player_id` - Connection identifier of the player
    /// * `player_name` - Display name, stored as given
    /// * `subscriber` - Channel receiving the lobby's broadcasts
    pub async fn join(
        &self,
        code: &str,
        player_id: &str,
        player_name: &str,
        subscriber: mpsc::Sender<LobbyBroadcast>,
    ) -> LobbyResult<LobbyResponse> {
        for _ in 0..JOIN_ATTEMPTS {
            let handle = self.get_or_create(code).await;

            let result = handle
                .request(|response| LobbyMessage::Join {
                    player_id: player_id.to_string(),
                    player_name: player_name.to_string(),
                    subscriber: subscriber.clone(),
                    response,
                })
                .await;

            match result {
                Err(LobbyError::LobbyClosed(_)) => {
                    log::debug!("Lobby {} closed during join, recreating", code);
                    self.remove_instance(code, handle.instance()).await;
                }
                other => return other,
            }
        }

        Err(LobbyError::LobbyClosed(code.to_string()))
    }

    /// Mark a player as ready
    pub async fn set_ready(&self, code: &str, player_id: &str) -> LobbyResult<LobbyResponse> {
        let handle = self.require_lobby(code).await?;
        handle
            .request(|response| LobbyMessage::SetReady {
                player_id: player_id.to_string(),
                response,
            })
            .await
    }

    /// Submit an answer outcome
    pub async fn submit_answer(
        &self,
        code: &str,
        player_id: &str,
        is_correct: bool,
    ) -> LobbyResult<LobbyResponse> {
        let handle = self.require_lobby(code).await?;
        handle
            .request(|response| LobbyMessage::SubmitAnswer {
                player_id: player_id.to_string(),
                is_correct,
                response,
            })
            .await
    }

    /// Leave a lobby; the lobby is destroyed when its last player leaves
    pub async fn leave(&self, code: &str, player_id: &str) -> LobbyResult<LobbyResponse> {
        let handle = self.require_lobby(code).await?;
        let response = handle
            .request(|response| LobbyMessage::Leave {
                player_id: player_id.to_string(),
                response,
            })
            .await;

        match response {
            Ok(LobbyResponse::Left { remaining: 0 }) => {
                self.remove_instance(code, handle.instance()).await;
                Ok(LobbyResponse::Left { remaining: 0 })
            }
            Err(LobbyError::LobbyClosed(code)) => {
                self.remove_instance(&code, handle.instance()).await;
                Err(LobbyError::LobbyClosed(code))
            }
            other => other,
        }
    }

    /// Remove a player from every lobby it belongs to
    ///
    /// # Returns
    ///
    /// * `Vec<LobbyCode>` - Codes of the lobbies the player was removed from
    pub async fn disconnect(&self, player_id: &str) -> Vec<LobbyCode> {
        let codes: Vec<LobbyCode> = {
            let lobbies = self.lobbies.read().await;
            lobbies.keys().cloned().collect()
        };

        let mut left = Vec::new();
        for code in codes {
            match self.leave(&code, player_id).await {
                Ok(LobbyResponse::Left { .. }) => left.push(code),
                Ok(_) => {}
                Err(e) => log::debug!("Disconnect of {} skipped lobby {}: {}", player_id, code, e),
            }
        }

        left
    }

    /// Get the current state of a lobby
    pub async fn snapshot(&self, code: &str) -> Option<LobbySnapshot> {
        let handle = self.get_lobby(code).await?;
        handle
            .request(|response| LobbyMessage::GetSnapshot { response })
            .await
            .ok()
    }

    /// List all live lobbies
    pub async fn list_lobbies(&self) -> Vec<LobbySummary> {
        let handles: Vec<LobbyHandle> = {
            let lobbies = self.lobbies.read().await;
            lobbies.values().cloned().collect()
        };

        let mut summaries = Vec::with_capacity(handles.len());
        for handle in handles {
            if let Ok(snapshot) = handle
                .request(|response| LobbyMessage::GetSnapshot { response })
                .await
            {
                summaries.push(LobbySummary {
                    code: handle.code().to_string(),
                    status: snapshot.status,
                    player_count: snapshot.players.len(),
                    duration: snapshot.duration,
                });
            }
        }

        summaries.sort_by(|a, b| a.code.cmp(&b.code));
        summaries
    }

    /// Get active lobby count
    pub async fn lobby_count(&self) -> usize {
        let lobbies = self.lobbies.read().await;
        lobbies.len()
    }

    async fn require_lobby(&self, code: &str) -> LobbyResult<LobbyHandle> {
        self.get_lobby(code)
            .await
            .ok_or_else(|| LobbyError::LobbyNotFound(code.to_string()))
    }
}
