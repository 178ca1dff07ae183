//! DmRepository over the in-memory store.

use async_trait::async_trait;

use super::InMemoryStore;
use crate::domain::{DmPair, DmRepository, DmRoom};
use crate::shared::error::AppError;

#[async_trait]
impl DmRepository for InMemoryStore {
    async fn find_by_pair(&self, pair: DmPair) -> Result<Option<DmRoom>, AppError> {
        Ok(self.dm_rooms.lock().by_pair.get(&pair).cloned())
    }

    async fn create_if_absent(&self, candidate: DmRoom) -> Result<(DmRoom, bool), AppError> {
        let mut index = self.dm_rooms.lock();
        let candidate_id = candidate.id;
        let room = self.store_dm(&mut index, candidate);
        let created = room.id == candidate_id;
        Ok((room, created))
    }

    async fn find_by_channel(&self, channel_id: i64) -> Result<Option<DmRoom>, AppError> {
        let index = self.dm_rooms.lock();
        Ok(index
            .by_channel
            .get(&channel_id)
            .and_then(|pair| index.by_pair.get(pair))
            .cloned())
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<DmRoom>, AppError> {
        Ok(self
            .dm_rooms
            .lock()
            .by_pair
            .values()
            .filter(|room| room.pair.contains(user_id))
            .cloned()
            .collect())
    }
}
