//! Message entity, link preview metadata and the persistence contracts
//! the message broadcaster talks to.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::shared::error::AppError;

/// Best-effort metadata attached to a message that contains a link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkPreview {
    pub url: String,
    pub site: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

/// A chat message in a channel (server channel or DM channel).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Channel ID where the message was sent
    pub channel_id: i64,

    pub author_id: i64,

    /// Author username at send time
    pub author_username: String,

    /// Trimmed message content
    pub content: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub link_preview: Option<LinkPreview>,

    /// Timestamp when message was last edited (None if never edited)
    pub edited_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

impl Message {
    /// Check if this message has been edited.
    pub fn is_edited(&self) -> bool {
        self.edited_at.is_some()
    }

    /// Whether `user_id` wrote this message.
    pub fn is_authored_by(&self, user_id: i64) -> bool {
        self.author_id == user_id
    }

    /// Get the content length in characters.
    pub fn content_length(&self) -> usize {
        self.content.chars().count()
    }
}

/// Repository trait for Message data access operations.
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// Find a message by its Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError>;

    /// Create a new message.
    async fn create(&self, message: &Message) -> Result<Message, AppError>;

    /// Update a message (for editing content).
    async fn update(&self, message: &Message) -> Result<Message, AppError>;

    /// Delete a message.
    async fn delete(&self, id: i64) -> Result<(), AppError>;
}

/// Side lookup that enriches message content with link metadata.
///
/// Callers treat every failure as "no preview".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LinkPreviewer: Send + Sync {
    async fn preview(&self, content: &str) -> Result<Option<LinkPreview>, AppError>;
}
