//! WebSocket handler for live rooms.
//!
//! # Connection Flow
//!
//! 1. Client connects via `GET /ws/{room_id}?token=<jwt>`
//! 2. Server verifies the token and looks up the room before upgrading
//! 3. The socket joins the room; the room replies with a full `game_update`
//! 4. A writer task forwards every room event to the socket as JSON
//! 5. Inbound text frames are parsed as actions and handed to the room
//! 6. When the socket closes the room is told, starting the reconnect grace
//!
//! # Client Messages
//!
//! ```json
//! {"action": "place_bet", "amount": 200}
//! {"action": "sideshow", "opponent_id": 42}
//! {"action": "sideshow_response", "accept": true}
//! ```
//!
//! # Server Messages
//!
//! JSON objects tagged by `type`: `game_update`, `timer_start`,
//! `player_packed`, `show_result`, `sideshow_request`, `error` and so on.
//!
//! # Example
//!
//! ```javascript
//! const ws = new WebSocket('ws://localhost:6969/ws/1?token=eyJhbGc...');
//! ws.onmessage = (event) => {
//!   const data = JSON.parse(event.data);
//!   if (data.type === 'game_update') renderTable(data);
//! };
//! ws.send(JSON.stringify({ action: 'toggle_seen' }));
//! ```

use axum::{
    extract::{
        Path, Query, State,
        ws::{
            CloseFrame, Message, WebSocket, WebSocketUpgrade, close_code,
            rejection::WebSocketUpgradeRejection,
        },
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use teen_patti::room::{ClientAction, Identity, Outbound, RoomHandle, RoomId, ServerEvent};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use super::{AppState, auth::AuthError, rate_limiter::FrameLimiter};
use crate::{
    logging::{log_rejected_frame, log_security_event},
    metrics,
};

/// Events queued for one socket before the room starts dropping them
const OUTBOUND_BUFFER: usize = 64;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    token: Option<String>,
}

/// Upgrade HTTP connection to a room WebSocket.
///
/// Returns `401 Unauthorized` for a missing or invalid token and
/// `404 Not Found` for a room that does not exist, without upgrading.
pub async fn websocket_handler(
    Path(room_id): Path<RoomId>,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    let claims = match query
        .token
        .as_deref()
        .ok_or(AuthError::MissingToken)
        .and_then(|token| state.verifier.verify(token))
    {
        Ok(claims) => claims,
        Err(e) => {
            log_security_event("ws_rejected_token", None, &e.to_string());
            return (StatusCode::UNAUTHORIZED, "Invalid token").into_response();
        }
    };

    let Some(room) = state.room_manager.get(room_id).await else {
        return (StatusCode::NOT_FOUND, "Room not found").into_response();
    };

    match ws {
        Ok(ws) => ws.on_upgrade(move |socket| handle_socket(socket, room, claims.identity())),
        Err(rejection) => rejection.into_response(),
    }
}

/// Drive one established connection until either side closes it.
async fn handle_socket(socket: WebSocket, room: RoomHandle, identity: Identity) {
    let room_id = room.room_id();
    let user_id = identity.user_id;
    let connection_id = Uuid::new_v4();
    let (mut sender, mut receiver) = socket.split();

    metrics::websocket_connected();
    info!(room_id, user_id, %connection_id, "WebSocket connected");

    let (tx, mut rx) = mpsc::channel::<Outbound>(OUTBOUND_BUFFER);

    let send_task = tokio::spawn(async move {
        while let Some(outbound) = rx.recv().await {
            match outbound {
                Outbound::Event(event) => {
                    let json = match serde_json::to_string(&event) {
                        Ok(j) => j,
                        Err(e) => {
                            error!("Failed to serialize {} event: {}", event.name(), e);
                            continue;
                        }
                    };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                    metrics::websocket_messages_sent(event.name());
                }
                Outbound::Close { reason } => {
                    let frame = CloseFrame {
                        code: close_code::NORMAL,
                        reason: reason.into(),
                    };
                    let _ = sender.send(Message::Close(Some(frame))).await;
                    break;
                }
            }
        }
    });

    let rejection = match room.join(identity, connection_id, tx.clone()).await {
        Ok(response) if response.is_success() => {
            info!(room_id, user_id, ?response, "Joined room");
            None
        }
        Ok(response) => Some(
            response
                .error_message()
                .unwrap_or_else(|| "Unable to join room".to_string()),
        ),
        Err(e) => Some(e),
    };

    if let Some(message) = rejection {
        info!(room_id, user_id, "Join rejected: {}", message);
        let _ = tx
            .send(Outbound::Event(ServerEvent::error(message.clone())))
            .await;
        let _ = tx.send(Outbound::Close { reason: message }).await;
        drop(tx);
        let _ = send_task.await;
        metrics::websocket_disconnected();
        return;
    }

    let mut limiter = FrameLimiter::default();

    while let Some(msg) = receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                metrics::websocket_messages_received();

                if let Err(limited) = limiter.check() {
                    metrics::rate_limit_hits_total(limited.label());
                    log_rejected_frame(room_id, user_id, limited.label());
                    let _ = tx
                        .send(Outbound::Event(ServerEvent::error(limited.message())))
                        .await;
                    continue;
                }

                let action = match serde_json::from_str::<ClientAction>(&text) {
                    Ok(action) => action,
                    Err(e) => {
                        log_rejected_frame(room_id, user_id, &e.to_string());
                        let _ = tx
                            .send(Outbound::Event(ServerEvent::error("Invalid message format")))
                            .await;
                        continue;
                    }
                };

                // Rejected actions are reported to this connection by the room itself
                if let Err(e) = room.act(user_id, connection_id, action).await {
                    warn!(room_id, user_id, "Room stopped answering: {}", e);
                    break;
                }
            }
            Ok(Message::Close(_)) => break,
            Err(e) => {
                warn!(room_id, user_id, "WebSocket error: {}", e);
                break;
            }
            _ => {}
        }
    }

    room.disconnect(user_id, connection_id).await;
    drop(tx);
    send_task.abort();

    metrics::websocket_disconnected();
    info!(room_id, user_id, %connection_id, "WebSocket disconnected");
}
