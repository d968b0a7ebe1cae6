use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::domain::{HistoryFilter, Message, MessageStore, MessageUpdate, NewMessage};
use crate::shared::error::AppError;
use crate::shared::snowflake::SnowflakeGenerator;

/// Messages keyed by id. Snowflake ids keep the map in creation order.
pub struct InMemoryMessageStore {
    messages: RwLock<BTreeMap<i64, Message>>,
    ids: Arc<SnowflakeGenerator>,
}

impl Default for InMemoryMessageStore {
    fn default() -> Self {
        Self::new(Arc::new(SnowflakeGenerator::default()))
    }
}

impl InMemoryMessageStore {
    pub fn new(ids: Arc<SnowflakeGenerator>) -> Self {
        Self {
            messages: RwLock::new(BTreeMap::new()),
            ids,
        }
    }

    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn save(&self, message: NewMessage) -> Result<Message, AppError> {
        let stored = Message::from_new(self.ids.generate(), message, Utc::now());
        self.messages.write().insert(stored.id, stored.clone());
        Ok(stored)
    }

    async fn get_by_id(&self, id: i64) -> Result<Option<Message>, AppError> {
        Ok(self.messages.read().get(&id).cloned())
    }

    async fn update_fields(&self, id: i64, update: MessageUpdate) -> Result<(), AppError> {
        let mut messages = self.messages.write();
        let message = messages
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("Message {} not found", id)))?;

        if let Some(readers) = update.reader_ids {
            message.reader_ids.extend(readers);
        }
        if let Some(extra) = update.extra_data {
            message.extra_data = Some(extra);
        }
        message.updated_at = Utc::now();
        Ok(())
    }

    async fn query_history(
        &self,
        user_id: i64,
        filter: &HistoryFilter,
    ) -> Result<Vec<Message>, AppError> {
        let messages = self.messages.read();
        Ok(messages
            .values()
            .rev()
            .filter(|m| filter.matches(user_id, m))
            .take(filter.fetch)
            .cloned()
            .collect())
    }
}
