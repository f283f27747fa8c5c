//! WebSocket event channel.
//!
//! One connection is one player. On upgrade the server mints a player id,
//! tells the client about it with a `connected` event, and from then on
//! forwards every broadcast of every lobby the player joined.
//!
//! # Frames
//!
//! Every text frame is JSON `{"event": <name>, "data": <payload>}`.
//!
//! Inbound:
//!
//! ```text
//! join-lobby     {code, playerName}
//! player-ready   {code}
//! submit-answer  {code, isCorrect}
//! leave-lobby    {code}
//! ```
//!
//! Outbound: `connected` with `{playerId}`, then lobby broadcasts
//! (`lobby-update`, `game-start`, `score-update`, `game-end`) carrying the
//! lobby snapshot. Closing the socket leaves every joined lobby.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:3000/ws');
//! ws.onopen = () => ws.send(JSON.stringify({
//!   event: 'join-lobby',
//!   data: { code: 'ABC123', playerName: 'Alice' },
//! }));
//! ```

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use log::{debug, error, info, warn};
use quickmath::lobby::{LobbyBroadcast, LobbyResponse, LobbyResult, PlayerId};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use uuid::Uuid;

use super::{AppState, rate_limiter::MessageLimiter};
use crate::{logging, metrics};

/// Events sent by clients
#[derive(Debug, Deserialize, PartialEq)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
enum ClientMessage {
    JoinLobby {
        code: String,
        /// Any JSON value; stored as text
        #[serde(default)]
        player_name: Option<serde_json::Value>,
    },
    PlayerReady {
        code: String,
    },
    SubmitAnswer {
        code: String,
        /// Any JSON value; only `true` scores
        #[serde(default)]
        is_correct: Option<serde_json::Value>,
    },
    LeaveLobby {
        code: String,
    },
}

impl ClientMessage {
    fn name(&self) -> &'static str {
        match self {
            ClientMessage::JoinLobby { .. } => "join-lobby",
            ClientMessage::PlayerReady { .. } => "player-ready",
            ClientMessage::SubmitAnswer { .. } => "submit-answer",
            ClientMessage::LeaveLobby { .. } => "leave-lobby",
        }
    }

    fn code(&self) -> &str {
        match self {
            ClientMessage::JoinLobby { code, .. }
            | ClientMessage::PlayerReady { code }
            | ClientMessage::SubmitAnswer { code, .. }
            | ClientMessage::LeaveLobby { code } => code,
        }
    }
}

/// Events sent only to the connection they concern
#[derive(Debug, Serialize)]
#[serde(
    tag = "event",
    content = "data",
    rename_all = "kebab-case",
    rename_all_fields = "camelCase"
)]
enum ServerEvent {
    Connected { player_id: PlayerId },
}

/// Upgrade an HTTP connection to the lobby event channel.
pub async fn websocket_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one connection until it closes, then leave every joined lobby.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let player_id: PlayerId = Uuid::new_v4().to_string();

    metrics::websocket_connection_opened();
    info!("WebSocket connected: player={}", player_id);

    let hello = ServerEvent::Connected {
        player_id: player_id.clone(),
    };
    match serde_json::to_string(&hello) {
        Ok(json) => {
            if sender.send(Message::Text(json.into())).await.is_err() {
                metrics::websocket_connection_closed();
                return;
            }
        }
        Err(e) => error!("Failed to serialize connected event: {}", e),
    }

    // Broadcasts from every lobby this player joins land here
    let (subscriber, mut broadcasts) =
        mpsc::channel::<LobbyBroadcast>(state.connection.subscriber_capacity);

    let send_task = tokio::spawn(async move {
        while let Some(broadcast) = broadcasts.recv().await {
            let json = match serde_json::to_string(&broadcast) {
                Ok(json) => json,
                Err(e) => {
                    error!("Failed to serialize {} broadcast: {}", broadcast.event, e);
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let mut limiter = MessageLimiter::from_config(&state.connection);

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                metrics::websocket_messages_received();

                if let Err(limit) = limiter.check() {
                    metrics::websocket_messages_dropped(limit.as_str());
                    logging::log_dropped_event(&player_id, "rate_limited", limit.as_str());
                    continue;
                }

                let client_msg = match serde_json::from_str::<ClientMessage>(text.as_str()) {
                    Ok(client_msg) => client_msg,
                    Err(e) => {
                        metrics::websocket_messages_dropped("malformed");
                        logging::log_dropped_event(&player_id, "malformed", &e.to_string());
                        continue;
                    }
                };

                dispatch(client_msg, &player_id, &subscriber, &state).await;
            }
            Ok(Message::Close(_)) => {
                info!("WebSocket closed: player={}", player_id);
                break;
            }
            Err(e) => {
                warn!("WebSocket error for player {}: {}", player_id, e);
                break;
            }
            _ => {}
        }
    }

    send_task.abort();
    drop(subscriber);

    let left = state.lobby_manager.disconnect(&player_id).await;
    if !left.is_empty() {
        info!(
            "Player {} left {} lobby(ies) on disconnect: {:?}",
            player_id,
            left.len(),
            left
        );
    }

    metrics::lobbies_active(state.lobby_manager.lobby_count().await);
    metrics::websocket_connection_closed();
    info!("WebSocket disconnected: player={}", player_id);
}

/// Apply one client event to the lobby it names.
///
/// Outcomes reach clients only through lobby broadcasts; rejected events are
/// logged and otherwise dropped.
async fn dispatch(
    client_msg: ClientMessage,
    player_id: &str,
    subscriber: &mpsc::Sender<LobbyBroadcast>,
    state: &AppState,
) {
    let event = client_msg.name();
    let code = client_msg.code().to_string();
    let manager = &state.lobby_manager;

    let result: LobbyResult<LobbyResponse> = match client_msg {
        ClientMessage::JoinLobby { code, player_name } => {
            let player_name = display_name(player_name);
            let result = manager
                .join(&code, player_id, &player_name, subscriber.clone())
                .await;
            metrics::lobbies_active(manager.lobby_count().await);
            result
        }
        ClientMessage::PlayerReady { code } => manager.set_ready(&code, player_id).await,
        ClientMessage::SubmitAnswer { code, is_correct } => {
            let is_correct = matches!(is_correct, Some(serde_json::Value::Bool(true)));
            manager.submit_answer(&code, player_id, is_correct).await
        }
        ClientMessage::LeaveLobby { code } => {
            let result = manager.leave(&code, player_id).await;
            metrics::lobbies_active(manager.lobby_count().await);
            result
        }
    };

    match result {
        Ok(response) => {
            match &response {
                LobbyResponse::Started => metrics::rounds_started_total(),
                LobbyResponse::AnswerRecorded { correct, .. } => metrics::answers_total(*correct),
                _ => {}
            }
            logging::log_lobby_event(event, &code, player_id, &format!("{response:?}"));
        }
        Err(e) => {
            debug!("{} from player {} dropped: {}", event, player_id, e);
        }
    }
}

/// Names are not validated: strings are kept as sent, null or missing becomes
/// empty and any other value is stored as its JSON text
fn display_name(value: Option<serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(name)) => name,
        Some(other) => other.to_string(),
    }
}
