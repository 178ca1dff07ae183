//! ServerRepository over the in-memory store.

use async_trait::async_trait;

use super::InMemoryStore;
use crate::domain::{ServerRepository, User};
use crate::shared::error::AppError;

#[async_trait]
impl ServerRepository for InMemoryStore {
    async fn server_ids_for_user(&self, user_id: i64) -> Result<Vec<i64>, AppError> {
        let mut ids: Vec<i64> = self
            .members
            .iter()
            .filter(|entry| entry.value().contains(&user_id))
            .map(|entry| *entry.key())
            .collect();
        ids.sort_unstable();
        Ok(ids)
    }

    async fn members(&self, server_id: i64) -> Result<Vec<User>, AppError> {
        Ok(self
            .member_ids(server_id)
            .into_iter()
            .filter_map(|id| self.user(id))
            .collect())
    }
}
