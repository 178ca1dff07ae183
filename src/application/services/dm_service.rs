//! Direct-Message Service
//!
//! Maps an unordered pair of users to one hidden virtual room, creating
//! it on first contact.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use crate::domain::{DmPair, DmRepository, DmRoom, User, UserRepository};
use crate::shared::error::{AppError, GatewayError};
use crate::shared::snowflake::SnowflakeGenerator;

/// DM service trait
#[async_trait]
pub trait DmService: Send + Sync {
    /// Return the room shared by `user_id` and `other_id`, creating it if needed.
    async fn get_or_create(&self, user_id: i64, other_id: i64) -> Result<DmConversation, DmError>;

    /// Every DM room containing `user_id`, newest first.
    async fn list_conversations(&self, user_id: i64) -> Result<Vec<DmConversation>, DmError>;
}

/// A DM room seen from one participant
#[derive(Debug, Clone, PartialEq)]
pub struct DmConversation {
    pub room: DmRoom,
    pub other_user: User,
    /// Whether this call created the room
    pub created: bool,
}

/// DM service errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DmError {
    #[error("You cannot message yourself")]
    SelfConversation,

    #[error("User {0} not found")]
    UserNotFound(i64),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<AppError> for DmError {
    fn from(err: AppError) -> Self {
        DmError::Internal(err.to_string())
    }
}

impl From<DmError> for GatewayError {
    fn from(err: DmError) -> Self {
        match err {
            DmError::SelfConversation => GatewayError::BadRequest(err.to_string()),
            DmError::UserNotFound(_) => GatewayError::NotFound(err.to_string()),
            DmError::Internal(msg) => GatewayError::Internal(msg),
        }
    }
}

impl From<DmError> for AppError {
    fn from(err: DmError) -> Self {
        match err {
            DmError::SelfConversation => AppError::BadRequest(err.to_string()),
            DmError::UserNotFound(_) => AppError::NotFound(err.to_string()),
            DmError::Internal(msg) => AppError::Internal(msg),
        }
    }
}

/// DmService implementation
pub struct DmServiceImpl<U, D>
where
    U: UserRepository,
    D: DmRepository,
{
    user_repo: Arc<U>,
    dm_repo: Arc<D>,
    id_generator: Arc<SnowflakeGenerator>,
}

impl<U, D> DmServiceImpl<U, D>
where
    U: UserRepository,
    D: DmRepository,
{
    pub fn new(user_repo: Arc<U>, dm_repo: Arc<D>, id_generator: Arc<SnowflakeGenerator>) -> Self {
        Self {
            user_repo,
            dm_repo,
            id_generator,
        }
    }

    async fn require_user(&self, id: i64) -> Result<User, DmError> {
        self.user_repo
            .find_by_id(id)
            .await?
            .ok_or(DmError::UserNotFound(id))
    }
}

#[async_trait]
impl<U, D> DmService for DmServiceImpl<U, D>
where
    U: UserRepository + 'static,
    D: DmRepository + 'static,
{
    async fn get_or_create(&self, user_id: i64, other_id: i64) -> Result<DmConversation, DmError> {
        let pair = DmPair::new(user_id, other_id).ok_or(DmError::SelfConversation)?;
        self.require_user(user_id).await?;
        let other_user = self.require_user(other_id).await?;

        if let Some(room) = self.dm_repo.find_by_pair(pair).await? {
            return Ok(DmConversation {
                room,
                other_user,
                created: false,
            });
        }

        let candidate = DmRoom {
            id: self.id_generator.generate(),
            channel_id: self.id_generator.generate(),
            pair,
            created_at: Utc::now(),
        };
        let (room, created) = self.dm_repo.create_if_absent(candidate).await?;

        if created {
            tracing::info!(
                room_id = room.id,
                channel_id = room.channel_id,
                user_a = pair.low(),
                user_b = pair.high(),
                "DM room created"
            );
        }

        Ok(DmConversation {
            room,
            other_user,
            created,
        })
    }

    async fn list_conversations(&self, user_id: i64) -> Result<Vec<DmConversation>, DmError> {
        let mut rooms = self.dm_repo.list_for_user(user_id).await?;
        rooms.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let other_ids: Vec<i64> = rooms
            .iter()
            .filter_map(|room| room.pair.other(user_id))
            .collect();
        let others = self.user_repo.find_many(&other_ids).await?;

        Ok(rooms
            .into_iter()
            .filter_map(|room| {
                let other_id = room.pair.other(user_id)?;
                let other_user = others.iter().find(|u| u.id == other_id)?.clone();
                Some(DmConversation {
                    room,
                    other_user,
                    created: false,
                })
            })
            .collect())
    }
}
