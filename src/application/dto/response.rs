//! Response DTOs
//!
//! Shapes shared by the gateway and the HTTP surface.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::application::services::DmConversation;
use crate::domain::{User, UserStatus};

/// Public user profile with live status
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: i64,
    pub username: String,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
    pub status: UserStatus,
}

impl UserResponse {
    /// Build from a user and the status other users should see.
    pub fn from_user(user: User, status: UserStatus) -> Self {
        Self {
            id: user.id,
            username: user.username,
            display_name: user.display_name,
            avatar_url: user.avatar_url,
            status,
        }
    }
}

/// A DM conversation as seen by one of its participants
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DmConversationResponse {
    /// ID of the backing virtual server
    pub room_id: i64,
    pub channel_id: i64,
    pub other_user: UserResponse,
    pub created_at: DateTime<Utc>,
}

impl DmConversationResponse {
    pub fn new(conversation: DmConversation, other_status: UserStatus) -> Self {
        Self {
            room_id: conversation.room.id,
            channel_id: conversation.room.channel_id,
            other_user: UserResponse::from_user(conversation.other_user, other_status),
            created_at: conversation.room.created_at,
        }
    }
}
