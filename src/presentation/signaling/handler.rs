//! Signaling broker HTTP and WebSocket endpoints.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;

use super::broker::{is_valid_peer_id, PeerBroker, Relay, SignalFrame, SignalType};
use crate::config::CorsSettings;
use crate::presentation::middleware::{create_cors_layer, create_trace_layer};
use crate::shared::error::AppError;

#[derive(Debug, Deserialize)]
pub struct PeerQuery {
    pub id: Option<String>,
}

/// Router for the signaling listener, mounted under `path`.
pub fn signaling_router(broker: Arc<PeerBroker>, path: &str, cors: &CorsSettings) -> Router {
    let base = path.trim_end_matches('/');
    Router::new()
        .route(base, get(peer_socket))
        .route(&format!("{}/id", base), get(issue_id))
        .route(&format!("{}/peers", base), get(list_peers))
        .layer(create_trace_layer())
        .layer(create_cors_layer(cors))
        .with_state(broker)
}

/// GET {path}/id
async fn issue_id(State(broker): State<Arc<PeerBroker>>) -> String {
    broker.issue_id()
}

/// GET {path}/peers
async fn list_peers(State(broker): State<Arc<PeerBroker>>) -> Json<Vec<String>> {
    Json(broker.peer_ids())
}

/// GET {path}?id=<peer id>
async fn peer_socket(
    ws: WebSocketUpgrade,
    Query(query): Query<PeerQuery>,
    State(broker): State<Arc<PeerBroker>>,
) -> Result<Response, AppError> {
    let id = query
        .id
        .ok_or_else(|| AppError::BadRequest("Missing peer id".into()))?;
    if !is_valid_peer_id(&id) {
        return Err(AppError::Validation("Invalid peer id".into()));
    }
    Ok(ws
        .on_upgrade(move |socket| handle_peer(socket, broker, id))
        .into_response())
}

async fn handle_peer(socket: WebSocket, broker: Arc<PeerBroker>, id: String) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<SignalFrame>();

    if !broker.register(&id, tx.clone()) {
        tracing::debug!(peer_id = %id, "Peer id already taken");
        if let Ok(text) = serde_json::to_string(&SignalFrame::control(SignalType::IdTaken)) {
            let _ = sink.send(Message::Text(text.into())).await;
        }
        let _ = sink.close().await;
        return;
    }
    let _ = tx.send(SignalFrame::control(SignalType::Open));
    tracing::debug!(peer_id = %id, "Peer connected");

    let mut sender_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize signaling frame");
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    loop {
        tokio::select! {
            msg = stream.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let reply = match serde_json::from_str::<SignalFrame>(text.as_str()) {
                            Ok(frame) => match broker.relay(&id, frame) {
                                Relay::Reply(reply) => Some(reply),
                                Relay::Delivered | Relay::Ignored => None,
                            },
                            Err(e) => Some(SignalFrame::error(format!("Invalid frame: {}", e))),
                        };
                        if let Some(reply) = reply {
                            let _ = tx.send(reply);
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::debug!(peer_id = %id, error = %e, "Signaling socket error");
                        break;
                    }
                }
            }
            _ = &mut sender_task => break,
        }
    }

    broker.release(&id, &tx);
    sender_task.abort();
    tracing::debug!(peer_id = %id, "Peer disconnected");
}
