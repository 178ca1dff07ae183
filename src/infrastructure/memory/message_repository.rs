//! MessageRepository over the in-memory store.

use async_trait::async_trait;

use super::InMemoryStore;
use crate::domain::{Message, MessageRepository};
use crate::shared::error::AppError;

#[async_trait]
impl MessageRepository for InMemoryStore {
    async fn find_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        Ok(self.message(id))
    }

    async fn create(&self, message: &Message) -> Result<Message, AppError> {
        if self.messages.contains_key(&message.id) {
            return Err(AppError::Conflict(format!("Message {} already exists", message.id)));
        }
        self.messages.insert(message.id, message.clone());
        Ok(message.clone())
    }

    async fn update(&self, message: &Message) -> Result<Message, AppError> {
        let mut stored = self
            .messages
            .get_mut(&message.id)
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", message.id)))?;
        *stored = message.clone();
        Ok(message.clone())
    }

    async fn delete(&self, id: i64) -> Result<(), AppError> {
        self.messages
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))
    }
}
