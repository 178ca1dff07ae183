//! Direct messages over the gateway.

use super::{Completion, Dispatcher};
use crate::application::dto::DmConversationResponse;
use crate::application::services::{validate_content, DmConversation, SendMessage, SentMessage};
use crate::domain::services::{visible_status, Occupant};
use crate::domain::{ConnectionId, DmRoom, RoomKey};
use crate::presentation::websocket::messages::{OpenDmPayload, SendDmPayload, ServerEvent};
use crate::shared::error::GatewayError;

impl Dispatcher {
    pub(super) fn send_dm(
        &mut self,
        conn: ConnectionId,
        payload: SendDmPayload,
    ) -> Result<(), GatewayError> {
        let user = self.identity(conn)?;
        if payload.receiver_id == user.id {
            return Err(GatewayError::BadRequest("You cannot message yourself".into()));
        }
        let content = validate_content(&payload.content, self.ctx.settings.max_content_length)?;

        let dms = self.ctx.dms.clone();
        let messages = self.ctx.messages.clone();
        self.spawn_io(conn, "dm:send", async move {
            let conversation = dms.get_or_create(user.id, payload.receiver_id).await?;
            let sent = messages
                .send_message(SendMessage {
                    channel_id: conversation.room.channel_id,
                    author_id: user.id,
                    author_username: user.username,
                    content,
                })
                .await?;
            Ok::<_, GatewayError>(Completion::DmSent { conversation, sent })
        });
        Ok(())
    }

    /// Deliver a DM to every connection of both participants.
    pub(super) fn dm_sent(&mut self, conversation: DmConversation, sent: SentMessage) {
        let room = conversation.room;
        self.subscribe_dm_room(&room);

        let event = ServerEvent::DmReceive {
            room_id: room.id,
            channel_id: room.channel_id,
            message: sent.message,
        };
        for member in room.pair.members() {
            self.send_to_user(member, &event);
        }
    }

    pub(super) fn open_dm(
        &mut self,
        conn: ConnectionId,
        payload: OpenDmPayload,
    ) -> Result<(), GatewayError> {
        let user = self.identity(conn)?;
        if payload.user_id == user.id {
            return Err(GatewayError::BadRequest("You cannot message yourself".into()));
        }

        let dms = self.ctx.dms.clone();
        self.spawn_io(conn, "dm:open", async move {
            let conversation = dms.get_or_create(user.id, payload.user_id).await?;
            Ok::<_, GatewayError>(Completion::DmOpened(conversation))
        });
        Ok(())
    }

    pub(super) fn dm_opened(&mut self, conn: ConnectionId, conversation: DmConversation) {
        self.subscribe_dm_room(&conversation.room);
        let response = self.conversation_response(conversation);
        self.send(conn, ServerEvent::DmOpened(response));
    }

    pub(super) fn list_dms(&mut self, conn: ConnectionId) -> Result<(), GatewayError> {
        let user = self.identity(conn)?;

        let dms = self.ctx.dms.clone();
        self.spawn_io(conn, "dm:list", async move {
            let conversations = dms.list_conversations(user.id).await?;
            Ok::<_, GatewayError>(Completion::Conversations(conversations))
        });
        Ok(())
    }

    pub(super) fn conversations(&mut self, conn: ConnectionId, conversations: Vec<DmConversation>) {
        let conversations = conversations
            .into_iter()
            .map(|c| self.conversation_response(c))
            .collect();
        self.send(conn, ServerEvent::DmConversations { conversations });
    }

    fn conversation_response(&self, conversation: DmConversation) -> DmConversationResponse {
        let status = visible_status(self.registry.presence.status(conversation.other_user.id));
        DmConversationResponse::new(conversation, status)
    }

    /// Subscribe the live sessions of both participants to the room's
    /// virtual server so presence reaches DM partners.
    pub(super) fn subscribe_dm_room(&mut self, room: &DmRoom) {
        for member in room.pair.members() {
            for conn in self.registry.sessions.connections_of(member) {
                let Some(session) = self.registry.sessions.get_mut(conn) else {
                    continue;
                };
                let Some(username) = session.user.as_ref().map(|u| u.username.clone()) else {
                    continue;
                };
                if !session.servers.insert(room.id) {
                    continue;
                }
                self.registry.rooms.join(
                    RoomKey::Server(room.id),
                    conn,
                    Occupant {
                        user_id: member,
                        username,
                    },
                );
            }
            if let Some(profile) = self.registry.profiles.get_mut(&member) {
                profile.server_ids.insert(room.id);
            }
        }
    }
}
