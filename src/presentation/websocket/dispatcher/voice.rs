//! Voice room membership and mesh signaling.
//!
//! The joiner gets `voice:existing-users`, the full list of peers it must
//! call. Everyone already present gets `voice:user-joined` and waits for
//! that call, so every link has exactly one initiator.

use super::{ensure_same_user, Dispatcher};
use crate::domain::services::VoiceParticipant;
use crate::domain::ConnectionId;
use crate::infrastructure::metrics;
use crate::presentation::websocket::messages::{JoinVoicePayload, LeaveVoicePayload, ServerEvent};
use crate::shared::error::GatewayError;
use crate::shared::validation::validate_payload;

impl Dispatcher {
    pub(super) fn join_voice(
        &mut self,
        conn: ConnectionId,
        payload: JoinVoicePayload,
    ) -> Result<(), GatewayError> {
        validate_payload(&payload)?;
        let user = self.identity(conn)?;
        ensure_same_user(&user, payload.user_id)?;
        let channel_id = payload.channel_id;

        let previous = self
            .registry
            .sessions
            .get(conn)
            .and_then(|s| s.voice_channel_id);
        if let Some(previous) = previous.filter(|id| *id != channel_id) {
            if let Some(left) = self.registry.voice.leave(previous, user.id) {
                self.voice_left(previous, left);
            }
        }

        let participant = VoiceParticipant {
            user_id: user.id,
            username: payload.username.unwrap_or(user.username),
            endpoint_address: payload.endpoint_address,
            connection_id: conn,
        };
        let joined = self.registry.voice.join(channel_id, participant.clone());

        if let Some(old) = joined.previous_connection {
            if let Some(session) = self.registry.sessions.get_mut(old) {
                if session.voice_channel_id == Some(channel_id) {
                    session.voice_channel_id = None;
                }
            }
        }
        if let Some(session) = self.registry.sessions.get_mut(conn) {
            session.voice_channel_id = Some(channel_id);
        }

        let notice = ServerEvent::VoiceUserJoined {
            channel_id,
            participant,
        };
        self.send_all(joined.existing.iter().map(|p| p.connection_id), &notice);
        self.send(
            conn,
            ServerEvent::VoiceExistingUsers {
                channel_id,
                users: joined.existing,
            },
        );

        tracing::debug!(
            connection_id = %conn,
            user_id = user.id,
            channel_id,
            rejoined = joined.rejoined,
            "Joined voice"
        );
        metrics::set_voice_participants(self.registry.voice.participant_count());
        Ok(())
    }

    pub(super) fn leave_voice(
        &mut self,
        conn: ConnectionId,
        payload: LeaveVoicePayload,
    ) -> Result<(), GatewayError> {
        let user = self.identity(conn)?;
        ensure_same_user(&user, payload.user_id)?;

        for (channel_id, participant) in self.registry.voice.leave_all(user.id) {
            self.voice_left(channel_id, participant);
        }
        Ok(())
    }

    /// Drop only the voice entries owned by a closing connection.
    pub(super) fn leave_voice_connection(&mut self, conn: ConnectionId) {
        for (channel_id, participant) in self.registry.voice.leave_connection(conn) {
            self.voice_left(channel_id, participant);
        }
    }

    fn voice_left(&mut self, channel_id: i64, participant: VoiceParticipant) {
        if let Some(session) = self.registry.sessions.get_mut(participant.connection_id) {
            if session.voice_channel_id == Some(channel_id) {
                session.voice_channel_id = None;
            }
        }

        let event = ServerEvent::VoiceUserLeft {
            channel_id,
            user_id: participant.user_id,
        };
        let remaining: Vec<ConnectionId> = self
            .registry
            .voice
            .participants(channel_id)
            .iter()
            .map(|p| p.connection_id)
            .collect();
        self.send_all(remaining, &event);

        tracing::debug!(user_id = participant.user_id, channel_id, "Left voice");
        metrics::set_voice_participants(self.registry.voice.participant_count());
    }
}
