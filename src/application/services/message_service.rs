//! Message Service
//!
//! Validates, persists and enriches chat messages. Link preview lookups
//! are best-effort: a slow or failing previewer never fails the send.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{DmRepository, DmRoom, LinkPreview, LinkPreviewer, Message, MessageRepository};
use crate::shared::error::{AppError, GatewayError};
use crate::shared::snowflake::SnowflakeGenerator;

/// Message service trait
#[async_trait]
pub trait MessageService: Send + Sync {
    /// Persist a new message in a channel
    async fn send_message(&self, request: SendMessage) -> Result<SentMessage, MessageError>;

    /// Replace the content of a message written by `actor_id`
    async fn edit_message(
        &self,
        message_id: i64,
        channel_id: i64,
        actor_id: i64,
        content: &str,
    ) -> Result<Message, MessageError>;

    /// Delete a message written by `actor_id`, returning what was deleted
    async fn delete_message(
        &self,
        message_id: i64,
        channel_id: i64,
        actor_id: i64,
    ) -> Result<Message, MessageError>;
}

/// A message about to be sent
#[derive(Debug, Clone)]
pub struct SendMessage {
    pub channel_id: i64,
    pub author_id: i64,
    pub author_username: String,
    pub content: String,
}

/// A persisted message and, for DM channels, the room it belongs to
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    pub dm_room: Option<DmRoom>,
}

/// Message service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MessageError {
    #[error("Message content cannot be empty")]
    Empty,

    #[error("Message content exceeds {0} characters")]
    ContentTooLong(usize),

    #[error("Message not found")]
    NotFound,

    #[error("Only the author can change this message")]
    Forbidden,

    #[error("Not a member of this conversation")]
    NotParticipant,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AppError> for MessageError {
    fn from(err: AppError) -> Self {
        MessageError::Internal(err.to_string())
    }
}

impl From<MessageError> for GatewayError {
    fn from(err: MessageError) -> Self {
        match err {
            MessageError::Empty => GatewayError::Validation(err.to_string()),
            MessageError::ContentTooLong(max) => GatewayError::ContentTooLong(max),
            MessageError::NotFound => GatewayError::NotFound(err.to_string()),
            MessageError::Forbidden | MessageError::NotParticipant => {
                GatewayError::Forbidden(err.to_string())
            }
            MessageError::Internal(msg) => GatewayError::Internal(msg),
        }
    }
}

/// Trim `content` and check it against the length limit.
pub fn validate_content(content: &str, max_length: usize) -> Result<String, MessageError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(MessageError::Empty);
    }
    if trimmed.chars().count() > max_length {
        return Err(MessageError::ContentTooLong(max_length));
    }
    Ok(trimmed.to_string())
}

/// MessageService implementation
pub struct MessageServiceImpl<M, D>
where
    M: MessageRepository,
    D: DmRepository,
{
    message_repo: Arc<M>,
    dm_repo: Arc<D>,
    previewer: Arc<dyn LinkPreviewer>,
    id_generator: Arc<SnowflakeGenerator>,
    max_content_length: usize,
    /// `None` disables enrichment
    preview_timeout: Option<Duration>,
}

impl<M, D> MessageServiceImpl<M, D>
where
    M: MessageRepository,
    D: DmRepository,
{
    pub fn new(
        message_repo: Arc<M>,
        dm_repo: Arc<D>,
        previewer: Arc<dyn LinkPreviewer>,
        id_generator: Arc<SnowflakeGenerator>,
        max_content_length: usize,
        preview_timeout: Option<Duration>,
    ) -> Self {
        Self {
            message_repo,
            dm_repo,
            previewer,
            id_generator,
            max_content_length,
            preview_timeout,
        }
    }

    async fn enrich(&self, content: &str) -> Option<LinkPreview> {
        let timeout = self.preview_timeout?;

        match tokio::time::timeout(timeout, self.previewer.preview(content)).await {
            Ok(Ok(preview)) => preview,
            Ok(Err(e)) => {
                tracing::debug!(error = %e, "Link preview failed");
                None
            }
            Err(_) => {
                tracing::debug!(timeout_ms = timeout.as_millis() as u64, "Link preview timed out");
                None
            }
        }
    }

    async fn find_owned(
        &self,
        message_id: i64,
        channel_id: i64,
        actor_id: i64,
    ) -> Result<Message, MessageError> {
        let message = self
            .message_repo
            .find_by_id(message_id)
            .await?
            .filter(|m| m.channel_id == channel_id)
            .ok_or(MessageError::NotFound)?;

        if !message.is_authored_by(actor_id) {
            return Err(MessageError::Forbidden);
        }
        Ok(message)
    }
}

#[async_trait]
impl<M, D> MessageService for MessageServiceImpl<M, D>
where
    M: MessageRepository + 'static,
    D: DmRepository + 'static,
{
    async fn send_message(&self, request: SendMessage) -> Result<SentMessage, MessageError> {
        let content = validate_content(&request.content, self.max_content_length)?;

        let dm_room = self.dm_repo.find_by_channel(request.channel_id).await?;
        if let Some(room) = &dm_room {
            if !room.pair.members().contains(&request.author_id) {
                return Err(MessageError::NotParticipant);
            }
        }

        let link_preview = self.enrich(&content).await;

        let message = Message {
            id: self.id_generator.generate(),
            channel_id: request.channel_id,
            author_id: request.author_id,
            author_username: request.author_username,
            content,
            link_preview,
            edited_at: None,
            created_at: Utc::now(),
        };

        let message = self.message_repo.create(&message).await?;

        tracing::debug!(
            message_id = message.id,
            channel_id = message.channel_id,
            author_id = message.author_id,
            "Message persisted"
        );

        Ok(SentMessage { message, dm_room })
    }

    async fn edit_message(
        &self,
        message_id: i64,
        channel_id: i64,
        actor_id: i64,
        content: &str,
    ) -> Result<Message, MessageError> {
        let content = validate_content(content, self.max_content_length)?;
        let mut message = self.find_owned(message_id, channel_id, actor_id).await?;

        message.link_preview = self.enrich(&content).await;
        message.content = content;
        message.edited_at = Some(Utc::now());

        Ok(self.message_repo.update(&message).await?)
    }

    async fn delete_message(
        &self,
        message_id: i64,
        channel_id: i64,
        actor_id: i64,
    ) -> Result<Message, MessageError> {
        let message = self.find_owned(message_id, channel_id, actor_id).await?;
        self.message_repo.delete(message.id).await?;
        Ok(message)
    }
}
