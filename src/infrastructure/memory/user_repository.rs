//! UserRepository over the in-memory store.

use async_trait::async_trait;

use super::{InMemoryStore, DEFAULT_SERVER_ID};
use crate::domain::{User, UserRepository, UserStatus};
use crate::shared::error::AppError;

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<User>, AppError> {
        Ok(self.user(id))
    }

    async fn find_many(&self, ids: &[i64]) -> Result<Vec<User>, AppError> {
        Ok(ids.iter().filter_map(|id| self.user(*id)).collect())
    }

    async fn resolve_identity(&self, id: i64, username: &str) -> Result<Option<User>, AppError> {
        if let Some(user) = self.user(id) {
            return Ok(Some(user));
        }
        if !self.open_registration {
            return Ok(None);
        }

        let user = self
            .users
            .entry(id)
            .or_insert_with(|| User::new(id, username))
            .clone();
        self.add_server_member(DEFAULT_SERVER_ID, id);

        tracing::info!(user_id = id, username = %user.username, "Registered new user");
        Ok(Some(user))
    }

    async fn update_status(&self, id: i64, status: UserStatus) -> Result<(), AppError> {
        let mut user = self
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("User {} not found", id)))?;
        user.status = status;
        Ok(())
    }

    async fn friend_ids(&self, id: i64) -> Result<Vec<i64>, AppError> {
        Ok(self
            .friendships
            .get(&id)
            .map(|f| f.iter().copied().collect())
            .unwrap_or_default())
    }
}
