// WebSocket endpoints: one socket per participant.
//
// Client -> Server: raw text frames, one chat message each (senders only;
// text from receivers and moderators is ignored).
//
// Server -> Client: JSON frames tagged by `type`:
//   {"type": "echo", "message_id": "...", "text": "...", "timestamp": "..."}
//   {"type": "message", "message_id": "...", "sender_id": "...", "text": "...", "moderated": true, "timestamp": "..."}
//   {"type": "audit", "message_id": "...", "original": "...", "delivered": "...", "toxic": true, "score": 0.9, "provider": "groq"}
//
// `echo` and `audit.original` carry the text exactly as sent; `message`
// carries the moderated text with surrounding whitespace trimmed.

use axum::extract::ws::{Message as WsMessage, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::hub::{ConnectionState, Role};
use crate::web::AppState;

pub async fn sender_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    upgrade(ws, state, Role::Sender)
}

pub async fn receiver_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    upgrade(ws, state, Role::Receiver)
}

pub async fn moderator_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    upgrade(ws, state, Role::Moderator)
}

fn upgrade(ws: WebSocketUpgrade, state: AppState, role: Role) -> Response {
    debug!(%role, state = ?ConnectionState::Connecting, "WebSocket upgrade requested");
    ws.on_upgrade(move |socket| handle_socket(socket, state, role))
}

/// Drive one participant connection until the client goes away.
///
/// A writer task forwards hub frames to the socket while this task reads
/// inbound frames. On exit the participant is removed from the hub.
async fn handle_socket(socket: WebSocket, state: AppState, role: Role) {
    let (mut ws_sender, mut ws_receiver) = socket.split();
    let connection = state.hub.connect(role).await;
    let id = connection.id;
    let mut frames = connection.frames;

    let writer = tokio::spawn(async move {
        while let Some(frame) = frames.recv().await {
            let json = match serde_json::to_string(&frame) {
                Ok(json) => json,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize frame");
                    continue;
                }
            };
            if ws_sender.send(WsMessage::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            WsMessage::Text(text) => {
                if role != Role::Sender {
                    debug!(participant = %id, %role, "Ignoring inbound text from non-sender");
                    continue;
                }
                let text: &str = &text;
                if text.trim().is_empty() {
                    continue;
                }
                if let Err(e) = state.hub.submit(id, text).await {
                    warn!(participant = %id, error = %e, "Message not accepted");
                }
            }
            WsMessage::Close(_) => break,
            _ => {} // Binary is unsupported; ping/pong handled by the transport
        }
    }

    state.hub.disconnect(id).await;
    writer.abort();
    debug!(participant = %id, state = ?ConnectionState::Closed, "WebSocket closed");
}
