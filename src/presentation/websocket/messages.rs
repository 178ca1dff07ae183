//! WebSocket Message Types
//!
//! Every frame is a JSON text frame `{"event": "<name>", "data": {...}}`
//! with camelCase fields. Inbound frames decode into the closed
//! [`ClientEvent`] union; everything the server emits is a [`ServerEvent`].

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::application::dto::{DmConversationResponse, UserResponse};
use crate::domain::services::{Occupant, VoiceParticipant};
use crate::domain::{ConnectionId, Message, UserStatus};

/// Events a client may send.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "heartbeat")]
    Heartbeat,
    #[serde(rename = "authenticate")]
    Authenticate(AuthenticatePayload),
    #[serde(rename = "user:join")]
    JoinChannel(JoinChannelPayload),
    #[serde(rename = "user:leave")]
    LeaveChannel(ChannelPayload),
    #[serde(rename = "message:send")]
    SendMessage(SendMessagePayload),
    #[serde(rename = "message:edit")]
    EditMessage(EditMessagePayload),
    #[serde(rename = "message:delete")]
    DeleteMessage(DeleteMessagePayload),
    #[serde(rename = "typing:start")]
    TypingStart(ChannelPayload),
    #[serde(rename = "typing:stop")]
    TypingStop(ChannelPayload),
    #[serde(rename = "dm:send")]
    SendDm(SendDmPayload),
    #[serde(rename = "dm:open")]
    OpenDm(OpenDmPayload),
    #[serde(rename = "dm:list")]
    ListDms,
    #[serde(rename = "status:change")]
    ChangeStatus(StatusPayload),
    #[serde(rename = "voice:join")]
    JoinVoice(JoinVoicePayload),
    #[serde(rename = "voice:leave")]
    LeaveVoice(LeaveVoicePayload),
    #[serde(rename = "members:request")]
    RequestMembers(ChannelPayload),
    #[serde(rename = "users:online")]
    RequestOnlineUsers(OnlineUsersPayload),
}

impl ClientEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ClientEvent::Heartbeat => "heartbeat",
            ClientEvent::Authenticate(_) => "authenticate",
            ClientEvent::JoinChannel(_) => "user:join",
            ClientEvent::LeaveChannel(_) => "user:leave",
            ClientEvent::SendMessage(_) => "message:send",
            ClientEvent::EditMessage(_) => "message:edit",
            ClientEvent::DeleteMessage(_) => "message:delete",
            ClientEvent::TypingStart(_) => "typing:start",
            ClientEvent::TypingStop(_) => "typing:stop",
            ClientEvent::SendDm(_) => "dm:send",
            ClientEvent::OpenDm(_) => "dm:open",
            ClientEvent::ListDms => "dm:list",
            ClientEvent::ChangeStatus(_) => "status:change",
            ClientEvent::JoinVoice(_) => "voice:join",
            ClientEvent::LeaveVoice(_) => "voice:leave",
            ClientEvent::RequestMembers(_) => "members:request",
            ClientEvent::RequestOnlineUsers(_) => "users:online",
        }
    }
}

/// `authenticate` payload
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatePayload {
    #[validate(range(min = 1, message = "must be a positive id"))]
    pub user_id: i64,

    #[validate(length(min = 1, max = 32, message = "must be 1-32 characters"))]
    pub username: String,

    /// Required when the server verifies tokens
    #[serde(default)]
    pub token: Option<String>,
}

/// `user:join` payload
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinChannelPayload {
    pub channel_id: i64,

    /// Display name inside the room, defaults to the session username
    #[validate(length(min = 1, max = 32, message = "must be 1-32 characters"))]
    #[serde(default)]
    pub username: Option<String>,
}

/// Payload carrying only a channel
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelPayload {
    pub channel_id: i64,
}

/// `message:send` payload. `userId`/`username` are advisory.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessagePayload {
    pub channel_id: i64,
    pub content: String,
    #[serde(default)]
    pub user_id: Option<i64>,
    #[serde(default)]
    pub username: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMessagePayload {
    pub message_id: i64,
    pub channel_id: i64,
    pub content: String,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessagePayload {
    pub message_id: i64,
    pub channel_id: i64,
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendDmPayload {
    pub receiver_id: i64,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDmPayload {
    pub user_id: i64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct StatusPayload {
    pub status: String,
}

/// `voice:join` payload
#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct JoinVoicePayload {
    pub channel_id: i64,

    #[serde(default)]
    pub user_id: Option<i64>,

    #[validate(length(min = 1, max = 32, message = "must be 1-32 characters"))]
    #[serde(default)]
    pub username: Option<String>,

    /// Peer id registered with the signaling broker
    #[validate(length(min = 1, max = 128, message = "must be 1-128 characters"))]
    pub endpoint_address: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveVoicePayload {
    #[serde(default)]
    pub user_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct OnlineUsersPayload {
    #[validate(length(max = 100, message = "at most 100 servers per request"))]
    pub server_ids: Vec<i64>,
}

/// Events the server emits.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "hello", rename_all = "camelCase")]
    Hello { heartbeat_interval: u64 },

    #[serde(rename = "heartbeat:ack")]
    HeartbeatAck,

    #[serde(rename = "ready", rename_all = "camelCase")]
    Ready {
        session_id: ConnectionId,
        user: UserResponse,
        server_ids: Vec<i64>,
    },

    #[serde(rename = "user:joined", rename_all = "camelCase")]
    UserJoined {
        channel_id: i64,
        user_id: i64,
        username: String,
    },

    #[serde(rename = "user:left", rename_all = "camelCase")]
    UserLeft {
        channel_id: i64,
        user_id: i64,
        username: String,
    },

    #[serde(rename = "members:update", rename_all = "camelCase")]
    MembersUpdate {
        channel_id: i64,
        members: Vec<Occupant>,
    },

    #[serde(rename = "message:receive")]
    MessageReceive(Message),

    #[serde(rename = "message:update")]
    MessageUpdate(Message),

    #[serde(rename = "message:delete", rename_all = "camelCase")]
    MessageDelete { message_id: i64, channel_id: i64 },

    /// Out-of-band unread signal for DM participants
    #[serde(rename = "dm:notify", rename_all = "camelCase")]
    DmNotify {
        room_id: i64,
        channel_id: i64,
        message: Message,
    },

    #[serde(rename = "dm:receive", rename_all = "camelCase")]
    DmReceive {
        room_id: i64,
        channel_id: i64,
        message: Message,
    },

    #[serde(rename = "dm:opened")]
    DmOpened(DmConversationResponse),

    #[serde(rename = "dm:conversations")]
    DmConversations {
        conversations: Vec<DmConversationResponse>,
    },

    #[serde(rename = "typing:active", rename_all = "camelCase")]
    TypingActive {
        channel_id: i64,
        user_id: i64,
        username: String,
    },

    #[serde(rename = "typing:inactive", rename_all = "camelCase")]
    TypingInactive {
        channel_id: i64,
        user_id: i64,
        username: String,
    },

    #[serde(rename = "status:update", rename_all = "camelCase")]
    StatusUpdate {
        user_id: i64,
        username: String,
        status: UserStatus,
    },

    #[serde(rename = "users:online")]
    UsersOnline { users: Vec<UserResponse> },

    /// Peers the joiner must call
    #[serde(rename = "voice:existing-users", rename_all = "camelCase")]
    VoiceExistingUsers {
        channel_id: i64,
        users: Vec<VoiceParticipant>,
    },

    /// A peer that will call the recipient
    #[serde(rename = "voice:user-joined", rename_all = "camelCase")]
    VoiceUserJoined {
        channel_id: i64,
        #[serde(flatten)]
        participant: VoiceParticipant,
    },

    #[serde(rename = "voice:user-left", rename_all = "camelCase")]
    VoiceUserLeft { channel_id: i64, user_id: i64 },

    #[serde(rename = "error")]
    Error {
        event: String,
        code: String,
        message: String,
    },
}

impl ServerEvent {
    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Hello { .. } => "hello",
            ServerEvent::HeartbeatAck => "heartbeat:ack",
            ServerEvent::Ready { .. } => "ready",
            ServerEvent::UserJoined { .. } => "user:joined",
            ServerEvent::UserLeft { .. } => "user:left",
            ServerEvent::MembersUpdate { .. } => "members:update",
            ServerEvent::MessageReceive(_) => "message:receive",
            ServerEvent::MessageUpdate(_) => "message:update",
            ServerEvent::MessageDelete { .. } => "message:delete",
            ServerEvent::DmNotify { .. } => "dm:notify",
            ServerEvent::DmReceive { .. } => "dm:receive",
            ServerEvent::DmOpened(_) => "dm:opened",
            ServerEvent::DmConversations { .. } => "dm:conversations",
            ServerEvent::TypingActive { .. } => "typing:active",
            ServerEvent::TypingInactive { .. } => "typing:inactive",
            ServerEvent::StatusUpdate { .. } => "status:update",
            ServerEvent::UsersOnline { .. } => "users:online",
            ServerEvent::VoiceExistingUsers { .. } => "voice:existing-users",
            ServerEvent::VoiceUserJoined { .. } => "voice:user-joined",
            ServerEvent::VoiceUserLeft { .. } => "voice:user-left",
            ServerEvent::Error { .. } => "error",
        }
    }
}
