//! Gateway dispatcher.
//!
//! Processes one [`Command`] at a time. Handlers that need the
//! persistence collaborator spawn an I/O job and return; the job's
//! result re-enters the queue as [`Command::Completed`]. While a job is
//! outstanding for a connection, later events from that connection wait
//! in its backlog so they are handled in arrival order.

mod direct;
mod identity;
mod rooms;
mod voice;

use std::collections::{BTreeSet, HashMap};
use std::future::Future;

use tokio::sync::mpsc;

use super::gateway::{Command, GatewayContext, GatewayStats};
use super::messages::{ClientEvent, JoinChannelPayload, ServerEvent};
use super::session::{Session, SessionRegistry};
use crate::application::services::{DmConversation, SentMessage};
use crate::domain::services::{
    visible_status, PresenceMap, RoomDirectory, TypingTracker, VoiceCoordinator,
};
use crate::domain::{ConnectionId, Message, RoomKey, User, UserStatus};
use crate::infrastructure::metrics;
use crate::shared::error::GatewayError;

/// Result of an I/O job, applied back on the dispatcher.
pub(crate) enum Completion {
    JoinAllowed(JoinChannelPayload),
    Authenticated {
        user: User,
        server_ids: Vec<i64>,
        friend_ids: Vec<i64>,
    },
    MessageSent(SentMessage),
    MessageEdited(Message),
    MessageDeleted(Message),
    DmSent {
        conversation: DmConversation,
        sent: SentMessage,
    },
    DmOpened(DmConversation),
    Conversations(Vec<DmConversation>),
    OnlineUsers(Vec<User>),
}

/// Who should hear about a user's presence.
#[derive(Debug, Default)]
pub(super) struct PresenceProfile {
    pub friend_ids: Vec<i64>,
    pub server_ids: BTreeSet<i64>,
}

/// In-memory state owned by the dispatcher.
#[derive(Debug, Default)]
pub(super) struct Registry {
    pub sessions: SessionRegistry,
    pub rooms: RoomDirectory,
    pub typing: TypingTracker,
    pub presence: PresenceMap,
    pub voice: VoiceCoordinator,
    pub profiles: HashMap<i64, PresenceProfile>,
}

impl Registry {
    fn clear(&mut self) {
        self.sessions.clear();
        self.rooms.clear();
        self.typing.clear();
        self.presence.clear();
        self.voice.clear();
        self.profiles.clear();
    }
}

pub(super) struct Dispatcher {
    ctx: GatewayContext,
    registry: Registry,
    /// Weak so the dispatcher stops once every handle is gone
    commands: mpsc::WeakUnboundedSender<Command>,
}

impl Dispatcher {
    pub(super) fn new(ctx: GatewayContext, commands: mpsc::WeakUnboundedSender<Command>) -> Self {
        Self {
            ctx,
            registry: Registry::default(),
            commands,
        }
    }

    pub(super) async fn run(mut self, mut rx: mpsc::UnboundedReceiver<Command>) {
        tracing::info!("Gateway dispatcher started");

        while let Some(command) = rx.recv().await {
            self.handle(command);
        }

        self.registry.clear();
        metrics::set_gateway_connections(0, 0);
        metrics::set_voice_participants(0);
        tracing::info!("Gateway dispatcher stopped");
    }

    fn handle(&mut self, command: Command) {
        match command {
            Command::Connect { conn, sender } => self.connect(conn, sender),
            Command::Client { conn, event } => self.on_client(conn, event),
            Command::Malformed { conn, reason } => {
                if self.registry.sessions.get(conn).is_some() {
                    self.reject(conn, "unknown", GatewayError::Malformed(reason));
                }
            }
            Command::Disconnect { conn } => self.teardown(conn),
            Command::Completed {
                conn,
                event,
                outcome,
            } => self.on_completed(conn, event, outcome),
            Command::TypingExpired {
                channel_id,
                user_id,
                generation,
            } => self.typing_expired(channel_id, user_id, generation),
            Command::IdentifyDeadline { conn } => self.identify_deadline(conn),
            Command::DmRoomCreated { room } => self.subscribe_dm_room(&room),
            Command::Statuses { user_ids, reply } => {
                let statuses = user_ids
                    .into_iter()
                    .map(|id| (id, visible_status(self.registry.presence.status(id))))
                    .collect();
                let _ = reply.send(statuses);
            }
            Command::Stats { reply } => {
                let _ = reply.send(self.stats());
            }
        }
    }

    fn connect(&mut self, conn: ConnectionId, sender: mpsc::UnboundedSender<ServerEvent>) {
        let session = Session::new(conn, sender);
        session.send(ServerEvent::Hello {
            heartbeat_interval: self.ctx.settings.heartbeat_interval_ms,
        });
        self.registry.sessions.insert(session);

        let deadline = self.ctx.settings.identify_timeout();
        self.schedule(deadline, Command::IdentifyDeadline { conn });

        tracing::debug!(connection_id = %conn, "Connection opened");
        self.update_connection_metrics();
    }

    fn on_client(&mut self, conn: ConnectionId, event: ClientEvent) {
        let Some(session) = self.registry.sessions.get_mut(conn) else {
            return;
        };

        if event == ClientEvent::Heartbeat {
            session.send(ServerEvent::HeartbeatAck);
            return;
        }
        if session.in_flight {
            let name = event.name();
            if !session.defer(event) {
                tracing::warn!(connection_id = %conn, event = name, "Backlog full, event dropped");
                self.reject(
                    conn,
                    name,
                    GatewayError::Validation("Too many pending events".into()),
                );
            }
            return;
        }
        self.dispatch(conn, event);
    }

    fn dispatch(&mut self, conn: ConnectionId, event: ClientEvent) {
        let name = event.name();
        metrics::record_gateway_event(name);

        let result = match event {
            ClientEvent::Heartbeat => {
                self.send(conn, ServerEvent::HeartbeatAck);
                Ok(())
            }
            ClientEvent::Authenticate(payload) => self.authenticate(conn, payload),
            ClientEvent::JoinChannel(payload) => self.join_channel(conn, payload),
            ClientEvent::LeaveChannel(payload) => self.leave_channel_request(conn, payload),
            ClientEvent::SendMessage(payload) => self.send_message(conn, payload),
            ClientEvent::EditMessage(payload) => self.edit_message(conn, payload),
            ClientEvent::DeleteMessage(payload) => self.delete_message(conn, payload),
            ClientEvent::TypingStart(payload) => self.typing_start(conn, payload),
            ClientEvent::TypingStop(payload) => self.typing_stop(conn, payload),
            ClientEvent::SendDm(payload) => self.send_dm(conn, payload),
            ClientEvent::OpenDm(payload) => self.open_dm(conn, payload),
            ClientEvent::ListDms => self.list_dms(conn),
            ClientEvent::ChangeStatus(payload) => self.change_status(conn, payload),
            ClientEvent::JoinVoice(payload) => self.join_voice(conn, payload),
            ClientEvent::LeaveVoice(payload) => self.leave_voice(conn, payload),
            ClientEvent::RequestMembers(payload) => self.request_members(conn, payload),
            ClientEvent::RequestOnlineUsers(payload) => self.request_online_users(conn, payload),
        };

        if let Err(error) = result {
            self.reject(conn, name, error);
        }
    }

    fn on_completed(
        &mut self,
        conn: ConnectionId,
        event: &'static str,
        outcome: Result<Completion, GatewayError>,
    ) {
        if let Some(session) = self.registry.sessions.get_mut(conn) {
            session.in_flight = false;
        }

        match outcome {
            Ok(completion) => self.apply(conn, completion),
            Err(error) => self.reject(conn, event, error),
        }

        self.drain_backlog(conn);
    }

    fn apply(&mut self, conn: ConnectionId, completion: Completion) {
        match completion {
            Completion::Authenticated {
                user,
                server_ids,
                friend_ids,
            } => self.authenticated(conn, user, server_ids, friend_ids),
            Completion::JoinAllowed(payload) => self.enter_channel(conn, payload),
            Completion::MessageSent(sent) => self.message_sent(conn, sent),
            Completion::MessageEdited(message) => self.message_edited(conn, message),
            Completion::MessageDeleted(message) => self.message_deleted(conn, message),
            Completion::DmSent { conversation, sent } => self.dm_sent(conversation, sent),
            Completion::DmOpened(conversation) => self.dm_opened(conn, conversation),
            Completion::Conversations(conversations) => self.conversations(conn, conversations),
            Completion::OnlineUsers(users) => self.online_users(conn, users),
        }
    }

    /// Replay deferred events until one of them starts another I/O job.
    fn drain_backlog(&mut self, conn: ConnectionId) {
        loop {
            let Some(session) = self.registry.sessions.get_mut(conn) else {
                return;
            };
            if session.in_flight {
                return;
            }
            let Some(event) = session.backlog.pop_front() else {
                return;
            };
            self.dispatch(conn, event);
        }
    }

    /// Run `job` off the dispatcher and feed its outcome back as a completion.
    fn spawn_io<F>(&mut self, conn: ConnectionId, event: &'static str, job: F)
    where
        F: Future<Output = Result<Completion, GatewayError>> + Send + 'static,
    {
        let Some(commands) = self.commands.upgrade() else {
            return;
        };
        if let Some(session) = self.registry.sessions.get_mut(conn) {
            session.in_flight = true;
        }

        tokio::spawn(async move {
            let outcome = match tokio::spawn(job).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!(connection_id = %conn, event, error = %e, "I/O job failed");
                    Err(GatewayError::Internal(e.to_string()))
                }
            };
            let _ = commands.send(Command::Completed {
                conn,
                event,
                outcome,
            });
        });
    }

    /// Deliver `command` to the dispatcher after `delay`.
    fn schedule(&self, delay: std::time::Duration, command: Command) {
        let Some(commands) = self.commands.upgrade() else {
            return;
        };
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = commands.send(command);
        });
    }

    /// Fire-and-forget status write to the persistence collaborator.
    fn persist_status(&self, user_id: i64, status: UserStatus) {
        let users = self.ctx.users.clone();
        tokio::spawn(async move {
            if let Err(e) = users.update_status(user_id, status).await {
                tracing::warn!(user_id, status = %status, error = %e, "Failed to persist status");
            }
        });
    }

    fn identify_deadline(&mut self, conn: ConnectionId) {
        let pending = self
            .registry
            .sessions
            .get(conn)
            .is_some_and(|s| !s.is_authenticated());
        if !pending {
            return;
        }

        tracing::info!(connection_id = %conn, "Identify timeout, closing connection");
        self.reject(
            conn,
            "authenticate",
            GatewayError::Validation("Authentication timed out".into()),
        );
        // Dropping the session drops its sender, which closes the socket
        self.teardown(conn);
    }

    /// Remove every trace of a connection. Unknown connections are ignored.
    fn teardown(&mut self, conn: ConnectionId) {
        let Some(channel_id) = self.registry.sessions.get(conn).map(|s| s.channel_id) else {
            return;
        };

        if let Some(channel_id) = channel_id {
            self.leave_channel(conn, channel_id);
        }
        self.leave_voice_connection(conn);

        let Some(session) = self.registry.sessions.remove(conn) else {
            return;
        };
        for server_id in &session.servers {
            self.registry.rooms.leave(RoomKey::Server(*server_id), conn);
        }

        if let Some(user) = &session.user {
            self.registry.rooms.leave(RoomKey::User(user.id), conn);
            if self.registry.sessions.session_count(user.id) == 0 {
                self.went_offline(user);
            }
        }

        tracing::debug!(
            connection_id = %conn,
            user_id = ?session.user_id(),
            connected_secs = session.connected_at.elapsed().as_secs(),
            "Connection closed"
        );
        self.update_connection_metrics();
    }

    fn stats(&self) -> GatewayStats {
        GatewayStats {
            connections: self.registry.sessions.len(),
            authenticated: self.registry.sessions.authenticated_count(),
            online_users: self.registry.presence.online_count(),
            voice_participants: self.registry.voice.participant_count(),
            rooms: self.registry.rooms.room_count(),
        }
    }

    fn update_connection_metrics(&self) {
        metrics::set_gateway_connections(
            self.registry.sessions.len(),
            self.registry.sessions.authenticated_count(),
        );
    }

    // ---- delivery helpers ----

    fn send(&self, conn: ConnectionId, event: ServerEvent) {
        if let Some(session) = self.registry.sessions.get(conn) {
            session.send(event);
        }
    }

    fn send_all<I>(&self, conns: I, event: &ServerEvent)
    where
        I: IntoIterator<Item = ConnectionId>,
    {
        for conn in conns {
            self.send(conn, event.clone());
        }
    }

    /// Send to every occupant of a room, optionally skipping one connection.
    fn broadcast(&self, room: RoomKey, event: &ServerEvent, except: Option<ConnectionId>) {
        let targets = self
            .registry
            .rooms
            .connections(room)
            .into_iter()
            .filter(|conn| Some(*conn) != except);
        self.send_all(targets, event);
    }

    /// Send to every live connection of a user.
    fn send_to_user(&self, user_id: i64, event: &ServerEvent) {
        self.send_all(self.registry.sessions.connections_of(user_id), event);
    }

    fn reject(&self, conn: ConnectionId, event: &str, error: GatewayError) {
        metrics::record_gateway_rejection(error.code());
        tracing::debug!(
            connection_id = %conn,
            event,
            code = error.code(),
            error = %error,
            "Event rejected"
        );
        self.send(
            conn,
            ServerEvent::Error {
                event: event.to_string(),
                code: error.code().to_string(),
                message: error.to_string(),
            },
        );
    }

    /// The user bound to a connection.
    fn identity(&self, conn: ConnectionId) -> Result<User, GatewayError> {
        self.registry
            .sessions
            .get(conn)
            .and_then(|s| s.user.clone())
            .ok_or(GatewayError::Unauthenticated)
    }
}

/// Reject payloads that claim to act for someone else.
fn ensure_same_user(user: &User, claimed: Option<i64>) -> Result<(), GatewayError> {
    match claimed {
        Some(id) if id != user.id => Err(GatewayError::Forbidden(
            "userId does not match the authenticated user".into(),
        )),
        _ => Ok(()),
    }
}
