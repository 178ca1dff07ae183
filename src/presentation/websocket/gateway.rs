//! WebSocket Gateway
//!
//! The gateway is one dispatcher task that owns every real-time registry.
//! Connection tasks, HTTP handlers and I/O jobs talk to it only through
//! its command queue, so registry state is never shared or locked.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tokio::sync::{mpsc, oneshot};

use super::dispatcher::{Completion, Dispatcher};
use super::messages::{ClientEvent, ServerEvent};
use crate::application::services::{AuthService, DmService, MessageService};
use crate::config::GatewaySettings;
use crate::domain::{
    ConnectionId, DmRepository, DmRoom, ServerRepository, UserRepository, UserStatus,
};
use crate::shared::error::{AppError, GatewayError};

/// Collaborators injected into the dispatcher.
#[derive(Clone)]
pub struct GatewayContext {
    pub users: Arc<dyn UserRepository>,
    pub servers: Arc<dyn ServerRepository>,
    pub dm_rooms: Arc<dyn DmRepository>,
    pub messages: Arc<dyn MessageService>,
    pub dms: Arc<dyn DmService>,
    pub auth: Arc<dyn AuthService>,
    pub settings: GatewaySettings,
}

/// Everything the dispatcher reacts to.
pub(super) enum Command {
    Connect {
        conn: ConnectionId,
        sender: mpsc::UnboundedSender<ServerEvent>,
    },
    Client {
        conn: ConnectionId,
        event: ClientEvent,
    },
    Malformed {
        conn: ConnectionId,
        reason: String,
    },
    Disconnect {
        conn: ConnectionId,
    },
    /// An I/O job spawned for `conn` finished
    Completed {
        conn: ConnectionId,
        event: &'static str,
        outcome: Result<Completion, GatewayError>,
    },
    TypingExpired {
        channel_id: i64,
        user_id: i64,
        generation: u64,
    },
    IdentifyDeadline {
        conn: ConnectionId,
    },
    DmRoomCreated {
        room: DmRoom,
    },
    Statuses {
        user_ids: Vec<i64>,
        reply: oneshot::Sender<HashMap<i64, UserStatus>>,
    },
    Stats {
        reply: oneshot::Sender<GatewayStats>,
    },
}

/// Snapshot of live gateway state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GatewayStats {
    pub connections: usize,
    pub authenticated: usize,
    pub online_users: usize,
    pub voice_participants: usize,
    pub rooms: usize,
}

/// Cloneable handle to the dispatcher.
///
/// The dispatcher stops and clears its registries once every handle is
/// dropped.
#[derive(Clone)]
pub struct GatewayHandle {
    commands: mpsc::UnboundedSender<Command>,
    heartbeat_interval_ms: u64,
}

pub struct Gateway;

impl Gateway {
    /// Start the dispatcher task.
    pub fn spawn(context: GatewayContext) -> GatewayHandle {
        let (tx, rx) = mpsc::unbounded_channel();
        let heartbeat_interval_ms = context.settings.heartbeat_interval_ms;
        let dispatcher = Dispatcher::new(context, tx.downgrade());
        tokio::spawn(dispatcher.run(rx));

        GatewayHandle {
            commands: tx,
            heartbeat_interval_ms,
        }
    }
}

impl GatewayHandle {
    pub fn heartbeat_interval_ms(&self) -> u64 {
        self.heartbeat_interval_ms
    }

    /// Register a new connection. The receiver yields `hello` first and
    /// closes when the gateway drops the connection.
    pub fn connect(&self) -> (ConnectionId, mpsc::UnboundedReceiver<ServerEvent>) {
        let conn = ConnectionId::new();
        let (sender, receiver) = mpsc::unbounded_channel();
        self.send(Command::Connect { conn, sender });
        (conn, receiver)
    }

    pub fn submit(&self, conn: ConnectionId, event: ClientEvent) {
        self.send(Command::Client { conn, event });
    }

    /// Report a frame that could not be decoded.
    pub fn malformed(&self, conn: ConnectionId, reason: impl Into<String>) {
        self.send(Command::Malformed {
            conn,
            reason: reason.into(),
        });
    }

    pub fn disconnect(&self, conn: ConnectionId) {
        self.send(Command::Disconnect { conn });
    }

    /// Subscribe live sessions of both participants to a new DM room.
    pub fn dm_room_created(&self, room: DmRoom) {
        self.send(Command::DmRoomCreated { room });
    }

    /// Live status of each user, as other users see it.
    pub async fn statuses(&self, user_ids: Vec<i64>) -> Result<HashMap<i64, UserStatus>, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Statuses { user_ids, reply });
        rx.await
            .map_err(|_| AppError::Unavailable("Gateway is not running".into()))
    }

    pub async fn stats(&self) -> Result<GatewayStats, AppError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::Stats { reply });
        rx.await
            .map_err(|_| AppError::Unavailable("Gateway is not running".into()))
    }

    fn send(&self, command: Command) {
        if self.commands.send(command).is_err() {
            tracing::warn!("Gateway dispatcher is not running");
        }
    }
}
