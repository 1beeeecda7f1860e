//! WebSocket transport.
//!
//! One upgraded socket per participant. On upgrade the connection gets a
//! fresh [`ConnectionId`], an outbound queue in the [`ClientRegistry`]
//! drained by a writer task, and a read loop that decodes JSON frames into
//! [`ClientEvent`]s for the controller. Frames that do not decode are
//! dropped; a closed or failed socket is reported to the controller as a
//! disconnect.

use crate::actors::{ControllerMetrics, MatchControllerHandle};
use crate::channel::ClientRegistry;
use crate::events::{ClientEvent, ConnectionId};

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared state for the WebSocket route.
#[derive(Clone)]
pub struct AppState {
    pub controller: MatchControllerHandle,
    pub registry: Arc<ClientRegistry>,
    pub metrics: Arc<ControllerMetrics>,
}

/// Router serving the WebSocket endpoint at `/ws`.
pub fn ws_router(state: AppState) -> Router {
    Router::new()
        .route("/ws", get(ws_handler))
        .with_state(state)
}

async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one client connection to completion.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = ConnectionId::new();
    let mut outbound = state.registry.register(connection_id);
    state.metrics.increment_connections();

    info!(
        target: "mc.transport.ws",
        connection_id = %connection_id,
        "Client connected"
    );

    let (mut sink, mut stream) = socket.split();

    // Writer: drain the outbound queue into the socket. Ends when the
    // queue is unregistered or the socket stops accepting frames.
    let writer = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            match serde_json::to_string(&event) {
                Ok(text) => {
                    if sink.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(
                        target: "mc.transport.ws",
                        error = %e,
                        "Failed to encode outbound event"
                    );
                }
            }
        }
    });

    // Reader: decode inbound frames and hand them to the controller.
    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => {
                    if state
                        .controller
                        .client_event(connection_id, event)
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                Err(e) => {
                    debug!(
                        target: "mc.transport.ws",
                        connection_id = %connection_id,
                        error = %e,
                        "Dropping malformed client frame"
                    );
                }
            },
            Ok(Message::Close(_)) => break,
            Ok(_) => {} // Ping/pong are answered by axum; binary is ignored.
            Err(e) => {
                debug!(
                    target: "mc.transport.ws",
                    connection_id = %connection_id,
                    error = %e,
                    "Socket error, closing"
                );
                break;
            }
        }
    }

    state.registry.unregister(connection_id);
    state.metrics.decrement_connections();
    writer.abort();

    if let Err(e) = state.controller.disconnected(connection_id).await {
        debug!(
            target: "mc.transport.ws",
            connection_id = %connection_id,
            error = %e,
            "Controller unavailable for disconnect"
        );
    }

    info!(
        target: "mc.transport.ws",
        connection_id = %connection_id,
        "Client disconnected"
    );
}
