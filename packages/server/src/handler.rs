//! WebSocket and HTTP handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{
        Query, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    http::StatusCode,
    response::IntoResponse,
};
use futures_util::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use huddle_shared::event::Event;

use crate::{
    error::{HubError, SubmitError},
    hub::RoomSnapshot,
    state::{AppState, ConnectQuery},
};

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
    Query(query): Query<ConnectQuery>,
) -> Result<impl IntoResponse, StatusCode> {
    let client_id = query.client_id;

    if client_id.trim().is_empty() {
        tracing::warn!("Rejecting connection with empty client_id");
        return Err(StatusCode::BAD_REQUEST);
    }

    // Register with the hub before upgrading; this pushes the presence count
    // to the new connection and broadcasts user_joined to everyone else.
    let rx = match state.hub.accept(&client_id).await {
        Ok(rx) => rx,
        Err(HubError::DuplicateIdentity(_)) => {
            tracing::warn!(
                "Client with ID '{}' is already connected. Rejecting connection.",
                client_id
            );
            return Err(StatusCode::CONFLICT);
        }
        Err(e) => {
            tracing::error!("Failed to accept connection '{}': {}", client_id, e);
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    tracing::info!("Client '{}' connected and registered", client_id);

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, client_id, rx)))
}

/// Spawns a task that drains the connection's hub queue into the WebSocket.
fn pusher_loop(
    mut rx: mpsc::Receiver<String>,
    mut sender: futures_util::stream::SplitSink<WebSocket, Message>,
) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(payload) = rx.recv().await {
            if sender.send(Message::Text(payload.into())).await.is_err() {
                break;
            }
        }
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: Arc<AppState>,
    client_id: String,
    rx: mpsc::Receiver<String>,
) {
    let (sender, mut receiver) = socket.split();

    let mut send_task = pusher_loop(rx, sender);

    let client_id_clone = client_id.clone();
    let state_clone = state.clone();

    // Inbound loop: decode each text frame and hand it to the hub. A frame
    // that fails to decode is dropped; the connection stays up.
    let mut recv_task = tokio::spawn(async move {
        while let Some(msg) = receiver.next().await {
            let msg = match msg {
                Ok(msg) => msg,
                Err(e) => {
                    tracing::warn!("WebSocket error on '{}': {}", client_id_clone, e);
                    break;
                }
            };

            match msg {
                Message::Text(text) => {
                    let event = match Event::decode(&text) {
                        Ok(event) => event,
                        Err(e) => {
                            tracing::warn!(
                                "Dropping malformed frame from '{}': {}",
                                client_id_clone,
                                e
                            );
                            continue;
                        }
                    };

                    if let Err(e) = state_clone.hub.submit(&client_id_clone, event).await {
                        // Spoofed or hub-owned events are dropped, not fatal.
                        tracing::warn!("Rejected event from '{}': {}", client_id_clone, e);
                    }
                }
                Message::Close(_) => {
                    tracing::info!("Client '{}' requested close", client_id_clone);
                    break;
                }
                // Ping/pong is handled by the protocol layer.
                _ => {}
            }
        }
    });

    // If either task finishes, tear down the other.
    tokio::select! {
        _ = &mut recv_task => send_task.abort(),
        _ = &mut send_task => recv_task.abort(),
    };

    // Deregister and notify the room. Idempotent if the hub already dropped
    // this connection as a slow consumer.
    state.hub.close(&client_id).await;
    tracing::info!("Client '{}' disconnected and removed from registry", client_id);
}

/// Body of a gateway submission.
#[derive(Debug, Deserialize)]
pub struct SubmitMessageRequest {
    pub text: String,
    pub sender: String,
}

/// The message submission gateway: accepts one message over HTTP and injects
/// it into the hub's broadcast path. Status-only response; the submitter
/// sees the accepted message again on the realtime channel.
pub async fn submit_message(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SubmitMessageRequest>,
) -> Result<StatusCode, StatusCode> {
    match state.hub.publish_message(&request.text, &request.sender).await {
        Ok(message) => {
            tracing::info!(
                "Accepted message {} from '{}' via gateway",
                message.id,
                message.sender
            );
            Ok(StatusCode::ACCEPTED)
        }
        Err(SubmitError::EmptyText) => {
            tracing::warn!("Rejected empty message from '{}'", request.sender);
            Err(StatusCode::UNPROCESSABLE_ENTITY)
        }
    }
}

/// Debug endpoint to get current room state (for testing purposes)
pub async fn debug_room_state(State(state): State<Arc<AppState>>) -> Json<RoomSnapshot> {
    Json(state.hub.snapshot().await)
}

/// Health check endpoint
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
