//! Server and Channel entities and repository trait.
//!
//! The gateway never checks that a channel exists before tracking who is
//! in it; these types are read for authentication (server membership) and
//! for the online-members query.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::User;
use crate::shared::error::AppError;

/// Channel kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ChannelType {
    /// A text channel within a server
    #[default]
    Text,
    /// A voice channel within a server
    Voice,
    /// The single channel of a direct-message room
    Dm,
}

impl ChannelType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Voice => "voice",
            Self::Dm => "dm",
        }
    }

    /// Check if messages can be sent in this kind of channel.
    pub fn is_text_based(&self) -> bool {
        matches!(self, Self::Text | Self::Dm)
    }
}

impl std::fmt::Display for ChannelType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A server (community). DM rooms are backed by hidden virtual servers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Server {
    pub id: i64,
    pub name: String,
    /// Virtual servers back DM rooms and are never listed to users
    pub is_virtual: bool,
    pub created_at: DateTime<Utc>,
}

/// A channel in a server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Channel {
    pub id: i64,
    pub server_id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub channel_type: ChannelType,
    pub created_at: DateTime<Utc>,
}

/// Repository trait for server membership lookups.
#[async_trait]
pub trait ServerRepository: Send + Sync {
    /// IDs of every server (including DM virtual servers) the user belongs to.
    async fn server_ids_for_user(&self, user_id: i64) -> Result<Vec<i64>, AppError>;

    /// Members of a server.
    async fn members(&self, server_id: i64) -> Result<Vec<User>, AppError>;
}
