//! User entity and repository trait.
//!
//! The gateway only reads profiles and writes the transient `status`
//! field; account management lives with the persistence collaborator.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::shared::error::AppError;

/// User presence status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    #[default]
    Offline,
    Online,
    Idle,
    Dnd,
    Invisible,
}

impl UserStatus {
    /// Convert to wire/storage string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Offline => "offline",
            Self::Online => "online",
            Self::Idle => "idle",
            Self::Dnd => "dnd",
            Self::Invisible => "invisible",
        }
    }

    /// Whether the status counts as connected (online, idle or dnd).
    pub fn is_online(&self) -> bool {
        matches!(self, Self::Online | Self::Idle | Self::Dnd)
    }
}

impl FromStr for UserStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "offline" => Ok(Self::Offline),
            "online" => Ok(Self::Online),
            "idle" => Ok(Self::Idle),
            "dnd" => Ok(Self::Dnd),
            "invisible" => Ok(Self::Invisible),
            other => Err(AppError::Validation(format!("Unknown status '{}'", other))),
        }
    }
}

impl std::fmt::Display for UserStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A user account as seen by the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Snowflake ID (primary key)
    pub id: i64,

    /// Username (unique)
    pub username: String,

    /// Display name (optional)
    pub display_name: Option<String>,

    /// URL to user's avatar image
    pub avatar_url: Option<String>,

    /// Last persisted status
    #[serde(default)]
    pub status: UserStatus,

    /// Account creation timestamp
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Create a user with only the required fields.
    pub fn new(id: i64, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            display_name: None,
            avatar_url: None,
            status: UserStatus::Offline,
            created_at: Utc::now(),
        }
    }

    /// Get the user's display name, falling back to username if not set.
    pub fn display_name_or_username(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.username)
    }
}

/// Repository trait for user data access.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Find a user by their Snowflake ID.
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError>;

    /// Find every user in `ids` that exists; unknown ids are skipped.
    async fn find_many(&self, ids: &[i64]) -> Result<Vec<User>, AppError>;

    /// Resolve an authenticating identity.
    ///
    /// Returns the stored user, registering it first when the store
    /// accepts unknown identities. `None` means the identity is refused.
    async fn resolve_identity(&self, id: i64, username: &str) -> Result<Option<User>, AppError>;

    /// Update user's status.
    async fn update_status(&self, id: i64, status: UserStatus) -> Result<(), AppError>;

    /// IDs of the user's accepted friends.
    async fn friend_ids(&self, id: i64) -> Result<Vec<i64>, AppError>;
}
