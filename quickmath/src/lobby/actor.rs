//! Lobby actor implementation with async message handling.

use super::{
    config::LobbyConfig,
    errors::{LobbyError, LobbyResult},
    messages::{BroadcastKind, LobbyBroadcast, LobbyMessage, LobbyResponse},
    state::{AnswerOutcome, JoinOutcome, LeaveOutcome, Lobby, LobbyCode, PlayerId, ReadyOutcome},
};
use std::collections::HashMap;
use tokio::{
    sync::{mpsc, oneshot},
    time::{Duration, Instant, sleep},
};
use uuid::Uuid;

/// Lobby actor handle for sending messages
#[derive(Clone, Debug)]
pub struct LobbyHandle {
    sender: mpsc::Sender<LobbyMessage>,
    code: LobbyCode,
    instance: Uuid,
}

impl LobbyHandle {
    /// Create a new lobby handle
    pub fn new(sender: mpsc::Sender<LobbyMessage>, code: LobbyCode, instance: Uuid) -> Self {
        Self {
            sender,
            code,
            instance,
        }
    }

    /// Get lobby code
    pub fn code(&self) -> &str {
        &self.code
    }

    /// Identity of the actor behind this handle. A code that is reused after
    /// its lobby was destroyed gets a new instance id.
    pub fn instance(&self) -> Uuid {
        self.instance
    }

    /// Whether the actor has stopped
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Send a message to the lobby
    pub async fn send(&self, message: LobbyMessage) -> LobbyResult<()> {
        self.sender
            .send(message)
            .await
            .map_err(|_| LobbyError::LobbyClosed(self.code.clone()))
    }

    /// Send a message carrying a response channel and wait for the answer.
    ///
    /// Fails with [`LobbyError::LobbyClosed`] if the actor stops before it
    /// replies, including when the message was still queued at shutdown.
    pub async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> LobbyMessage,
    ) -> LobbyResult<T> {
        let (tx, rx) = oneshot::channel();
        self.send(build(tx)).await?;
        rx.await
            .map_err(|_| LobbyError::LobbyClosed(self.code.clone()))
    }
}

/// Lobby actor owning a single lobby
///
/// All mutations of the lobby go through the actor's inbox, so at most one
/// of them runs at a time.
pub struct LobbyActor {
    /// Actor instance ID
    instance: Uuid,

    /// Lobby state machine
    lobby: Lobby,

    /// Round length
    round_duration: Duration,

    /// Message inbox
    inbox: mpsc::Receiver<LobbyMessage>,

    /// Own inbox, for the round timer. Weak so the timer never keeps a
    /// destroyed lobby alive.
    weak_sender: mpsc::WeakSender<LobbyMessage>,

    /// Broadcast group
    subscribers: HashMap<PlayerId, mpsc::Sender<LobbyBroadcast>>,

    /// Set once the last player left
    is_closed: bool,
}

impl LobbyActor {
    /// Create a new lobby actor
    ///
    /// # Returns
    ///
    /// * `(LobbyActor, LobbyHandle)` - Actor and handle for sending messages
    pub fn new(code: LobbyCode, config: &LobbyConfig) -> (Self, LobbyHandle) {
        let (sender, inbox) = mpsc::channel(config.inbox_capacity);
        let instance = Uuid::new_v4();

        let actor = Self {
            instance,
            lobby: Lobby::new(code.clone(), config),
            round_duration: config.duration(),
            inbox,
            weak_sender: sender.downgrade(),
            subscribers: HashMap::new(),
            is_closed: false,
        };

        let handle = LobbyHandle::new(sender, code, instance);

        (actor, handle)
    }

    /// Run the lobby actor event loop
    pub async fn run(mut self) {
        log::info!("Lobby {} ({}) opened", self.lobby.code(), self.instance);

        while let Some(message) = self.inbox.recv().await {
            self.handle_message(message);

            if self.is_closed {
                break;
            }
        }

        log::info!("Lobby {} ({}) closed", self.lobby.code(), self.instance);
    }

    /// Handle a lobby message
    fn handle_message(&mut self, message: LobbyMessage) {
        match message {
            LobbyMessage::Join {
                player_id,
                player_name,
                subscriber,
                response,
            } => {
                let result = self.handle_join(player_id, player_name, subscriber);
                let _ = response.send(result);
            }

            LobbyMessage::SetReady {
                player_id,
                response,
            } => {
                let result = self.handle_ready(&player_id);
                let _ = response.send(result);
            }

            LobbyMessage::SubmitAnswer {
                player_id,
                is_correct,
                response,
            } => {
                let result = self.handle_answer(&player_id, is_correct);
                let _ = response.send(result);
            }

            LobbyMessage::Leave {
                player_id,
                response,
            } => {
                let result = self.handle_leave(&player_id);
                let _ = response.send(result);
            }

            LobbyMessage::GetSnapshot { response } => {
                let _ = response.send(self.lobby.snapshot());
            }

            LobbyMessage::Deadline => {
                self.handle_deadline();
            }
        }
    }

    /// Broadcast the current lobby state to all subscribers
    fn broadcast(&mut self, event: BroadcastKind) {
        let message = LobbyBroadcast {
            event,
            code: self.lobby.code().to_string(),
            data: self.lobby.snapshot(),
        };

        let code = self.lobby.code();
        self.subscribers
            .retain(|player_id, sender| match sender.try_send(message.clone()) {
                Ok(_) => true,
                Err(mpsc::error::TrySendError::Full(_)) => {
                    // A lost transition leaves the client on a stale status
                    if matches!(event, BroadcastKind::GameStart | BroadcastKind::GameEnd) {
                        log::error!(
                            "Lobby {}: subscriber {} channel full, dropping {}",
                            code,
                            player_id,
                            event
                        );
                    } else {
                        log::warn!(
                            "Lobby {}: subscriber {} channel full, dropping {}",
                            code,
                            player_id,
                            event
                        );
                    }
                    true
                }
                Err(mpsc::error::TrySendError::Closed(_)) => {
                    log::debug!("Lobby {}: subscriber {} disconnected, removing", code, player_id);
                    false
                }
            });
    }

    fn handle_join(
        &mut self,
        player_id: PlayerId,
        player_name: String,
        subscriber: mpsc::Sender<LobbyBroadcast>,
    ) -> LobbyResponse {
        log::info!(
            "Player {} joining lobby {} as {:?}",
            player_id,
            self.lobby.code(),
            player_name
        );

        self.subscribers.insert(player_id.clone(), subscriber);
        let outcome = self.lobby.join(player_id, player_name);

        log::debug!(
            "Lobby {} now has {} player(s)",
            self.lobby.code(),
            self.lobby.player_count()
        );
        self.broadcast(BroadcastKind::LobbyUpdate);

        LobbyResponse::Joined {
            rejoined: outcome == JoinOutcome::Rejoined,
        }
    }

    fn handle_ready(&mut self, player_id: &str) -> LobbyResponse {
        let now_ms = chrono::Utc::now().timestamp_millis();

        match self.lobby.set_ready(player_id, now_ms) {
            ReadyOutcome::Ready => {
                self.broadcast(BroadcastKind::LobbyUpdate);
                LobbyResponse::Ready
            }
            ReadyOutcome::Started => {
                log::info!(
                    "Lobby {} started a {}s round with {} players",
                    self.lobby.code(),
                    self.lobby.duration_secs(),
                    self.lobby.player_count()
                );
                self.broadcast(BroadcastKind::GameStart);
                self.arm_deadline();
                self.broadcast(BroadcastKind::LobbyUpdate);
                LobbyResponse::Started
            }
            ReadyOutcome::Ignored(reason) => {
                log::debug!(
                    "Lobby {}: ready from {} ignored ({})",
                    self.lobby.code(),
                    player_id,
                    reason
                );
                LobbyResponse::Ignored(reason)
            }
        }
    }

    fn handle_answer(&mut self, player_id: &str, is_correct: bool) -> LobbyResponse {
        let now = Instant::now().into_std();

        match self.lobby.submit_answer(player_id, is_correct, now) {
            AnswerOutcome::Recorded { correct, score } => {
                log::debug!(
                    "Lobby {}: player {} answered (correct={}), score {}",
                    self.lobby.code(),
                    player_id,
                    correct,
                    score
                );
                self.broadcast(BroadcastKind::ScoreUpdate);
                LobbyResponse::AnswerRecorded { correct, score }
            }
            AnswerOutcome::Ignored(reason) => {
                log::debug!(
                    "Lobby {}: answer from {} ignored ({})",
                    self.lobby.code(),
                    player_id,
                    reason
                );
                LobbyResponse::Ignored(reason)
            }
        }
    }

    fn handle_leave(&mut self, player_id: &str) -> LobbyResponse {
        self.subscribers.remove(player_id);

        match self.lobby.leave(player_id) {
            LeaveOutcome::Left { remaining: 0 } => {
                log::info!("Last player left lobby {}, shutting it down", self.lobby.code());
                self.is_closed = true;
                LobbyResponse::Left { remaining: 0 }
            }
            LeaveOutcome::Left { remaining } => {
                log::info!(
                    "Player {} left lobby {} ({} remaining)",
                    player_id,
                    self.lobby.code(),
                    remaining
                );
                self.broadcast(BroadcastKind::LobbyUpdate);
                LobbyResponse::Left { remaining }
            }
            LeaveOutcome::NotPresent => LobbyResponse::NotInLobby,
        }
    }

    fn handle_deadline(&mut self) {
        if self.lobby.finish() {
            log::info!("Lobby {} round finished", self.lobby.code());
            self.broadcast(BroadcastKind::GameEnd);
        } else {
            log::debug!(
                "Lobby {}: stale deadline ignored ({})",
                self.lobby.code(),
                self.lobby.status()
            );
        }
    }

    /// Schedule the one-shot round deadline.
    ///
    /// The timer posts [`LobbyMessage::Deadline`] into this actor's inbox, so
    /// the transition is ordered with every other event of the lobby. If the
    /// lobby is gone by then the message has nowhere to go.
    fn arm_deadline(&self) {
        let weak_sender = self.weak_sender.clone();
        let duration = self.round_duration;
        let code = self.lobby.code().to_string();

        tokio::spawn(async move {
            sleep(duration).await;

            let delivered = match weak_sender.upgrade() {
                Some(sender) => sender.send(LobbyMessage::Deadline).await.is_ok(),
                None => false,
            };

            if !delivered {
                log::debug!("Lobby {} was destroyed before its deadline", code);
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lobby::state::LobbyStatus;

    fn spawn_lobby(config: LobbyConfig) -> LobbyHandle {
        let (actor, handle) = LobbyActor::new("ABC123".to_string(), &config);
        tokio::spawn(actor.run());
        handle
    }

    async fn join(
        handle: &LobbyHandle,
        id: &str,
        name: &str,
    ) -> (LobbyResponse, mpsc::Receiver<LobbyBroadcast>) {
        let (tx, rx) = mpsc::channel(32);
        let response = handle
            .request(|response| LobbyMessage::Join {
                player_id: id.to_string(),
                player_name: name.to_string(),
                subscriber: tx,
                response,
            })
            .await
            .unwrap();
        (response, rx)
    }

    async fn ready(handle: &LobbyHandle, id: &str) -> LobbyResponse {
        handle
            .request(|response| LobbyMessage::SetReady {
                player_id: id.to_string(),
                response,
            })
            .await
            .unwrap()
    }

    async fn leave(handle: &LobbyHandle, id: &str) -> LobbyResponse {
        handle
            .request(|response| LobbyMessage::Leave {
                player_id: id.to_string(),
                response,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_join_broadcasts_to_group() {
        let handle = spawn_lobby(LobbyConfig::default());

        let (response, mut alice) = join(&handle, "p1", "Alice").await;
        assert_eq!(response, LobbyResponse::Joined { rejoined: false });
        let update = alice.recv().await.unwrap();
        assert_eq!(update.event, BroadcastKind::LobbyUpdate);
        assert_eq!(update.data.players.len(), 1);

        let (_, mut bob) = join(&handle, "p2", "Bob").await;
        assert_eq!(alice.recv().await.unwrap().data.players.len(), 2);
        assert_eq!(bob.recv().await.unwrap().data.players.len(), 2);
    }

    #[tokio::test]
    async fn test_start_emits_game_start_then_lobby_update() {
        let handle = spawn_lobby(LobbyConfig::default());
        let (_, mut alice) = join(&handle, "p1", "Alice").await;
        join(&handle, "p2", "Bob").await;
        ready(&handle, "p1").await;
        assert_eq!(ready(&handle, "p2").await, LobbyResponse::Started);

        let events: Vec<_> = std::iter::from_fn(|| alice.try_recv().ok())
            .map(|b| b.event)
            .collect();
        assert_eq!(
            events,
            vec![
                BroadcastKind::LobbyUpdate,
                BroadcastKind::LobbyUpdate,
                BroadcastKind::LobbyUpdate,
                BroadcastKind::GameStart,
                BroadcastKind::LobbyUpdate,
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_finishes_round() {
        let handle = spawn_lobby(LobbyConfig {
            duration_secs: 5,
            ..Default::default()
        });
        let (_, mut alice) = join(&handle, "p1", "Alice").await;
        join(&handle, "p2", "Bob").await;
        ready(&handle, "p1").await;
        ready(&handle, "p2").await;

        let end = loop {
            let broadcast = alice.recv().await.unwrap();
            if broadcast.event == BroadcastKind::GameEnd {
                break broadcast;
            }
        };
        assert_eq!(end.data.status, LobbyStatus::Finished);
    }

    #[tokio::test]
    async fn test_last_leave_stops_actor() {
        let handle = spawn_lobby(LobbyConfig::default());
        join(&handle, "p1", "Alice").await;
        assert_eq!(leave(&handle, "p1").await, LobbyResponse::Left { remaining: 0 });

        let result = handle
            .request(|response| LobbyMessage::GetSnapshot { response })
            .await;
        assert!(matches!(result, Err(LobbyError::LobbyClosed(_))));
    }

    #[tokio::test]
    async fn test_leave_unknown_player_keeps_lobby() {
        let handle = spawn_lobby(LobbyConfig::default());
        join(&handle, "p1", "Alice").await;
        assert_eq!(leave(&handle, "ghost").await, LobbyResponse::NotInLobby);
        assert!(!handle.is_closed());
    }

    #[tokio::test]
    async fn test_full_subscriber_stays_subscribed() {
        let handle = spawn_lobby(LobbyConfig::default());
        let (slow_tx, mut slow) = mpsc::channel(1);
        handle
            .request(|response| LobbyMessage::Join {
                player_id: "p1".to_string(),
                player_name: "Alice".to_string(),
                subscriber: slow_tx,
                response,
            })
            .await
            .unwrap();

        // Queue is full with Alice's own join; these are dropped for her
        join(&handle, "p2", "Bob").await;
        ready(&handle, "p1").await;
        assert_eq!(ready(&handle, "p2").await, LobbyResponse::Started);

        let first = slow.recv().await.unwrap();
        assert_eq!(first.data.players.len(), 1);
        assert!(slow.try_recv().is_err());

        // Once drained she gets the next broadcast with the current state
        leave(&handle, "p2").await;
        let next = slow.recv().await.unwrap();
        assert_eq!(next.event, BroadcastKind::LobbyUpdate);
        assert_eq!(next.data.status, LobbyStatus::Playing);
        assert_eq!(next.data.players.len(), 1);
    }

    #[tokio::test]
    async fn test_dropped_subscriber_is_removed() {
        let handle = spawn_lobby(LobbyConfig::default());
        let (_, alice) = join(&handle, "p1", "Alice").await;
        drop(alice);

        // Broadcasting to a closed subscriber must not disturb the lobby
        let (_, mut bob) = join(&handle, "p2", "Bob").await;
        assert_eq!(bob.recv().await.unwrap().data.players.len(), 2);
    }
}
