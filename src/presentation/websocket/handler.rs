//! WebSocket Connection Handler
//!
//! One task per connection. It owns the socket, decodes inbound frames
//! into [`ClientEvent`]s for the dispatcher and writes whatever the
//! dispatcher queues for it.

use std::time::Duration;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::time::interval;

use super::gateway::GatewayHandle;
use super::messages::ClientEvent;
use super::session::Heartbeat;
use crate::startup::AppState;

/// Grace period on top of the heartbeat interval
const HEARTBEAT_GRACE: Duration = Duration::from_secs(10);

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    let max_message_size = state.settings.gateway.max_message_size;
    let max_frame_size = state.settings.gateway.max_frame_size;
    ws.max_message_size(max_message_size)
        .max_frame_size(max_frame_size)
        .on_upgrade(move |socket| handle_socket(socket, state.gateway))
}

/// Drive one connection until either side closes it.
pub async fn handle_socket(socket: WebSocket, gateway: GatewayHandle) {
    let (conn, mut outbound) = gateway.connect();
    tracing::debug!(connection_id = %conn, "New WebSocket connection");

    let (mut sink, mut stream) = socket.split();

    // The dispatcher closes `outbound` when it drops the connection
    let mut sender_task = tokio::spawn(async move {
        while let Some(event) = outbound.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(event = event.name(), error = %e, "Failed to serialize event");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                return;
            }
        }
        let _ = sink.close().await;
    });

    let timeout = Duration::from_millis(gateway.heartbeat_interval_ms()) + HEARTBEAT_GRACE;
    let mut heartbeat = Heartbeat::new();
    let mut heartbeat_check = interval(timeout);
    heartbeat_check.tick().await; // Skip first immediate tick

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientEvent>(text.as_str()) {
                            Ok(event) => {
                                if event == ClientEvent::Heartbeat {
                                    heartbeat.beat();
                                }
                                gateway.submit(conn, event);
                            }
                            Err(e) => gateway.malformed(conn, e.to_string()),
                        }
                    }
                    Some(Ok(Message::Binary(_))) => {
                        gateway.malformed(conn, "binary frames are not supported");
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::debug!(connection_id = %conn, "Connection closed by client");
                        break;
                    }
                    Some(Ok(_)) => {
                        // Ping/pong is handled by axum
                    }
                    Some(Err(e)) => {
                        tracing::debug!(connection_id = %conn, error = %e, "WebSocket error");
                        break;
                    }
                }
            }

            _ = &mut sender_task => {
                tracing::debug!(connection_id = %conn, "Connection closed by gateway");
                break;
            }

            _ = heartbeat_check.tick() => {
                if !heartbeat.is_alive(timeout) {
                    tracing::info!(connection_id = %conn, "Heartbeat timeout, closing connection");
                    break;
                }
            }
        }
    }

    gateway.disconnect(conn);
    sender_task.abort();
}
