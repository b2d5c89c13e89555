//! WebSocket handler
//!
//! Handles WebSocket connections and message processing.

use crate::connection::{Connection, ConnectionState};
use crate::handlers::MessageDispatcher;
use crate::protocol::WsMessage;
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::interval;
use uuid::Uuid;

/// Channel buffer size for outgoing messages
const MESSAGE_BUFFER_SIZE: usize = 256;

/// Shortest period between idle checks
const MIN_IDLE_CHECK: Duration = Duration::from_millis(250);

/// WebSocket gateway handler
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let max_message_bytes = state.config().max_message_bytes;
    ws.max_message_size(max_message_bytes)
        .max_frame_size(max_message_bytes)
        .on_upgrade(|socket| handle_socket(state, socket))
}

/// Handle an upgraded WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket) {
    let connection_id = Uuid::new_v4().to_string();

    // Create message channel for outgoing messages
    let (tx, mut rx) = mpsc::channel::<WsMessage>(MESSAGE_BUFFER_SIZE);

    let connection = state
        .connection_manager()
        .add_connection(connection_id.clone(), tx);

    tracing::info!(connection_id = %connection_id, "WebSocket connection established");

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Receive loop: one message is processed to completion before the next.
    // The stop signal is only observed between messages.
    let (stop_tx, mut stop_rx) = watch::channel(false);
    let state_recv = state.clone();
    let connection_recv = connection.clone();
    let mut recv_task = tokio::spawn(async move {
        let id = connection_recv.connection_id().to_string();
        loop {
            let next = tokio::select! {
                biased;
                _ = stop_rx.changed() => break,
                next = ws_stream.next() => next,
            };
            let Some(msg) = next else {
                break;
            };
            let text = match msg {
                Ok(Message::Text(text)) => text.to_string(),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => text,
                    Err(_) => {
                        if connection_recv
                            .send(WsMessage::error("Invalid message format"))
                            .await
                            .is_err()
                        {
                            break;
                        }
                        continue;
                    }
                },
                Ok(Message::Ping(_)) => {
                    // Pong is handled automatically by axum
                    connection_recv.touch().await;
                    continue;
                }
                Ok(Message::Pong(_)) => {
                    connection_recv.touch().await;
                    continue;
                }
                Ok(Message::Close(_)) => {
                    tracing::info!(connection_id = %id, "Client closed connection");
                    break;
                }
                Err(e) => {
                    tracing::warn!(connection_id = %id, error = %e, "WebSocket error");
                    break;
                }
            };

            if handle_text_message(&state_recv, &connection_recv, &text)
                .await
                .is_err()
            {
                break;
            }
        }
    });

    // Send loop: drains the outbound queue into the socket
    let connection_id_send = connection_id.clone();
    let mut send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            let json = match msg.to_json() {
                Ok(json) => json,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize message");
                    continue;
                }
            };
            if ws_sink.send(Message::Text(json.into())).await.is_err() {
                tracing::warn!(
                    connection_id = %connection_id_send,
                    "Failed to send message to WebSocket"
                );
                break;
            }
        }

        let _ = ws_sink.close().await;
    });

    // Idle monitor
    let idle_timeout = state.config().idle_timeout();
    let connection_idle = connection.clone();
    let mut idle_task = tokio::spawn(async move {
        let Some(timeout) = idle_timeout else {
            std::future::pending::<()>().await;
            return;
        };

        let mut check_interval = interval((timeout / 4).max(MIN_IDLE_CHECK));
        loop {
            check_interval.tick().await;

            let idle_for = connection_idle.idle_for().await;
            if idle_for > timeout {
                tracing::info!(
                    connection_id = %connection_idle.connection_id(),
                    idle_ms = idle_for.as_millis(),
                    "Closing idle connection"
                );
                break;
            }
        }
    });

    // Wait for any task to complete
    let recv_ended = tokio::select! {
        _ = &mut recv_task => {
            tracing::debug!(connection_id = %connection_id, "Receive task ended");
            true
        }
        _ = &mut send_task => {
            tracing::debug!(connection_id = %connection_id, "Send task ended");
            false
        }
        _ = &mut idle_task => {
            tracing::debug!(connection_id = %connection_id, "Idle monitor ended");
            false
        }
    };

    send_task.abort();
    idle_task.abort();

    // A message already being handled runs to completion; its reply is lost
    // with the send task
    if !recv_ended {
        let _ = stop_tx.send(true);
        if let Err(e) = recv_task.await {
            tracing::warn!(connection_id = %connection_id, error = %e, "Receive task failed");
        }
    }

    cleanup_connection(&state, &connection).await;
}

/// Handle a text message from the client
async fn handle_text_message(
    state: &GatewayState,
    connection: &Arc<Connection>,
    text: &str,
) -> Result<(), ()> {
    connection.touch().await;

    let message = match WsMessage::from_json(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::debug!(
                connection_id = %connection.connection_id(),
                error = %e,
                "Failed to parse message"
            );
            return connection
                .send(WsMessage::error("Invalid message format"))
                .await
                .map_err(|_| ());
        }
    };

    tracing::trace!(
        connection_id = %connection.connection_id(),
        kind = %message.kind,
        "Received message"
    );

    MessageDispatcher::dispatch(state, connection, message)
        .await
        .map_err(|e| {
            tracing::debug!(
                connection_id = %connection.connection_id(),
                error = %e,
                "Connection can no longer be answered"
            );
        })
}

/// Clean up a connection on disconnect
///
/// Subscriptions are torn down; likes and counts are left untouched since
/// other connections of the same user may still rely on them.
async fn cleanup_connection(state: &GatewayState, connection: &Arc<Connection>) {
    tracing::info!(
        connection_id = %connection.connection_id(),
        age_ms = connection.age().as_millis(),
        "Cleaning up connection"
    );

    connection.set_state(ConnectionState::Closed).await;
    state
        .connection_manager()
        .remove_connection(connection.connection_id())
        .await;
}
