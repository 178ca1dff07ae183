//! Channel rooms, message fan-out and typing.

use super::{ensure_same_user, Completion, Dispatcher};
use crate::application::services::{validate_content, SendMessage, SentMessage};
use crate::domain::services::Occupant;
use crate::domain::{ConnectionId, Message, RoomKey};
use crate::presentation::websocket::gateway::Command;
use crate::presentation::websocket::messages::{
    ChannelPayload, DeleteMessagePayload, EditMessagePayload, JoinChannelPayload,
    SendMessagePayload, ServerEvent,
};
use crate::shared::error::GatewayError;
use crate::shared::validation::validate_payload;

impl Dispatcher {
    pub(super) fn join_channel(
        &mut self,
        conn: ConnectionId,
        payload: JoinChannelPayload,
    ) -> Result<(), GatewayError> {
        validate_payload(&payload)?;
        let user = self.identity(conn)?;

        let dm_rooms = self.ctx.dm_rooms.clone();
        self.spawn_io(conn, "user:join", async move {
            if let Some(room) = dm_rooms.find_by_channel(payload.channel_id).await? {
                if !room.pair.members().contains(&user.id) {
                    return Err(GatewayError::Forbidden(
                        "Not a member of this conversation".into(),
                    ));
                }
            }
            Ok::<_, GatewayError>(Completion::JoinAllowed(payload))
        });
        Ok(())
    }

    /// Move a connection into a channel room it was cleared to join.
    pub(super) fn enter_channel(&mut self, conn: ConnectionId, payload: JoinChannelPayload) {
        let Ok(user) = self.identity(conn) else {
            return;
        };
        let channel_id = payload.channel_id;

        let previous = self.registry.sessions.get(conn).and_then(|s| s.channel_id);
        if let Some(previous) = previous.filter(|id| *id != channel_id) {
            self.leave_channel(conn, previous);
        }

        let occupant = Occupant {
            user_id: user.id,
            username: payload.username.unwrap_or(user.username),
        };
        let room = RoomKey::Channel(channel_id);
        self.registry.rooms.join(room, conn, occupant.clone());
        if let Some(session) = self.registry.sessions.get_mut(conn) {
            session.channel_id = Some(channel_id);
        }

        self.broadcast(
            room,
            &ServerEvent::UserJoined {
                channel_id,
                user_id: occupant.user_id,
                username: occupant.username,
            },
            Some(conn),
        );
        self.broadcast_members(channel_id);

        tracing::debug!(connection_id = %conn, user_id = user.id, channel_id, "Joined channel");
    }

    pub(super) fn leave_channel_request(
        &mut self,
        conn: ConnectionId,
        payload: ChannelPayload,
    ) -> Result<(), GatewayError> {
        self.identity(conn)?;
        let occupying = self.registry.sessions.get(conn).and_then(|s| s.channel_id);
        if occupying == Some(payload.channel_id) {
            self.leave_channel(conn, payload.channel_id);
        }
        Ok(())
    }

    /// Remove a connection from a channel room and tell the rest of the room.
    pub(super) fn leave_channel(&mut self, conn: ConnectionId, channel_id: i64) {
        if let Some(session) = self.registry.sessions.get_mut(conn) {
            if session.channel_id == Some(channel_id) {
                session.channel_id = None;
            }
        }

        let room = RoomKey::Channel(channel_id);
        let Some(occupant) = self.registry.rooms.leave(room, conn) else {
            return;
        };

        // Typing belongs to the user, so it ends with their last connection here.
        let still_present = self
            .registry
            .sessions
            .connections_of(occupant.user_id)
            .into_iter()
            .any(|other| self.registry.rooms.contains(room, other));
        if !still_present {
            if let Some(username) = self.registry.typing.stop(channel_id, occupant.user_id) {
                self.broadcast_typing(
                    channel_id,
                    occupant.user_id,
                    ServerEvent::TypingInactive {
                        channel_id,
                        user_id: occupant.user_id,
                        username,
                    },
                );
            }
        }

        self.broadcast(
            room,
            &ServerEvent::UserLeft {
                channel_id,
                user_id: occupant.user_id,
                username: occupant.username,
            },
            None,
        );
        self.broadcast_members(channel_id);
    }

    pub(super) fn request_members(
        &mut self,
        conn: ConnectionId,
        payload: ChannelPayload,
    ) -> Result<(), GatewayError> {
        self.identity(conn)?;
        let members = self
            .registry
            .rooms
            .snapshot(RoomKey::Channel(payload.channel_id));
        self.send(
            conn,
            ServerEvent::MembersUpdate {
                channel_id: payload.channel_id,
                members,
            },
        );
        Ok(())
    }

    fn broadcast_members(&self, channel_id: i64) {
        let room = RoomKey::Channel(channel_id);
        let event = ServerEvent::MembersUpdate {
            channel_id,
            members: self.registry.rooms.snapshot(room),
        };
        self.broadcast(room, &event, None);
    }

    pub(super) fn send_message(
        &mut self,
        conn: ConnectionId,
        payload: SendMessagePayload,
    ) -> Result<(), GatewayError> {
        let user = self.identity(conn)?;
        ensure_same_user(&user, payload.user_id)?;
        let content = validate_content(&payload.content, self.ctx.settings.max_content_length)?;

        let request = SendMessage {
            channel_id: payload.channel_id,
            author_id: user.id,
            author_username: user.username,
            content,
        };
        let messages = self.ctx.messages.clone();
        self.spawn_io(conn, "message:send", async move {
            let sent = messages.send_message(request).await?;
            Ok::<_, GatewayError>(Completion::MessageSent(sent))
        });
        Ok(())
    }

    pub(super) fn message_sent(&mut self, conn: ConnectionId, sent: SentMessage) {
        let SentMessage { message, dm_room } = sent;
        let channel_id = message.channel_id;

        if let Some(room) = dm_room {
            let event = ServerEvent::DmNotify {
                room_id: room.id,
                channel_id,
                message: message.clone(),
            };
            for member in room.pair.members() {
                if member != message.author_id {
                    self.send_to_user(member, &event);
                }
            }
        }

        self.deliver_to_room(conn, channel_id, ServerEvent::MessageReceive(message));
    }

    pub(super) fn edit_message(
        &mut self,
        conn: ConnectionId,
        payload: EditMessagePayload,
    ) -> Result<(), GatewayError> {
        let user = self.identity(conn)?;
        ensure_same_user(&user, payload.user_id)?;
        let content = validate_content(&payload.content, self.ctx.settings.max_content_length)?;

        let messages = self.ctx.messages.clone();
        self.spawn_io(conn, "message:edit", async move {
            let message = messages
                .edit_message(payload.message_id, payload.channel_id, user.id, &content)
                .await?;
            Ok::<_, GatewayError>(Completion::MessageEdited(message))
        });
        Ok(())
    }

    pub(super) fn message_edited(&mut self, conn: ConnectionId, message: Message) {
        let channel_id = message.channel_id;
        self.deliver_to_room(conn, channel_id, ServerEvent::MessageUpdate(message));
    }

    pub(super) fn delete_message(
        &mut self,
        conn: ConnectionId,
        payload: DeleteMessagePayload,
    ) -> Result<(), GatewayError> {
        let user = self.identity(conn)?;
        ensure_same_user(&user, payload.user_id)?;

        let messages = self.ctx.messages.clone();
        self.spawn_io(conn, "message:delete", async move {
            let message = messages
                .delete_message(payload.message_id, payload.channel_id, user.id)
                .await?;
            Ok::<_, GatewayError>(Completion::MessageDeleted(message))
        });
        Ok(())
    }

    pub(super) fn message_deleted(&mut self, conn: ConnectionId, message: Message) {
        let event = ServerEvent::MessageDelete {
            message_id: message.id,
            channel_id: message.channel_id,
        };
        self.deliver_to_room(conn, message.channel_id, event);
    }

    /// Broadcast to a channel room, plus a direct copy to the originating
    /// connection when it is not an occupant.
    fn deliver_to_room(&self, conn: ConnectionId, channel_id: i64, event: ServerEvent) {
        let room = RoomKey::Channel(channel_id);
        self.broadcast(room, &event, None);
        if !self.registry.rooms.contains(room, conn) {
            self.send(conn, event);
        }
    }

    pub(super) fn typing_start(
        &mut self,
        conn: ConnectionId,
        payload: ChannelPayload,
    ) -> Result<(), GatewayError> {
        let user = self.identity(conn)?;
        let channel_id = payload.channel_id;
        let generation = self
            .registry
            .typing
            .start(channel_id, user.id, &user.username);

        self.broadcast_typing(
            channel_id,
            user.id,
            ServerEvent::TypingActive {
                channel_id,
                user_id: user.id,
                username: user.username,
            },
        );
        self.schedule(
            self.ctx.settings.typing_timeout(),
            Command::TypingExpired {
                channel_id,
                user_id: user.id,
                generation,
            },
        );
        Ok(())
    }

    pub(super) fn typing_stop(
        &mut self,
        conn: ConnectionId,
        payload: ChannelPayload,
    ) -> Result<(), GatewayError> {
        let user = self.identity(conn)?;
        let channel_id = payload.channel_id;
        let username = self
            .registry
            .typing
            .stop(channel_id, user.id)
            .unwrap_or(user.username);

        self.broadcast_typing(
            channel_id,
            user.id,
            ServerEvent::TypingInactive {
                channel_id,
                user_id: user.id,
                username,
            },
        );
        Ok(())
    }

    /// A typing timer fired. Stale generations are ignored.
    pub(super) fn typing_expired(&mut self, channel_id: i64, user_id: i64, generation: u64) {
        let Some(username) = self.registry.typing.expire(channel_id, user_id, generation) else {
            return;
        };

        self.broadcast_typing(
            channel_id,
            user_id,
            ServerEvent::TypingInactive {
                channel_id,
                user_id,
                username,
            },
        );
    }

    /// Typing state goes to the room minus every connection of the typer.
    fn broadcast_typing(&self, channel_id: i64, user_id: i64, event: ServerEvent) {
        let own = self.registry.sessions.connections_of(user_id);
        let targets = self
            .registry
            .rooms
            .connections(RoomKey::Channel(channel_id))
            .into_iter()
            .filter(|conn| !own.contains(conn));
        self.send_all(targets, &event);
    }
}
