use std::collections::HashMap;

use async_trait::async_trait;
use domain::{
    ConversationId, Message, MessageId, MessageRepository, RepositoryError, RepositoryResult,
    Timestamp,
};
use tokio::sync::RwLock;

/// 消息主存储与会话索引
#[derive(Default)]
struct Store {
    messages: HashMap<MessageId, Message>,
    by_conversation: HashMap<ConversationId, Vec<MessageId>>,
}

#[derive(Default)]
pub struct InMemoryMessageRepository {
    store: RwLock<Store>,
}

impl InMemoryMessageRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MessageRepository for InMemoryMessageRepository {
    async fn insert(&self, message: Message) -> RepositoryResult<()> {
        let mut store = self.store.write().await;
        if store.messages.contains_key(&message.id) {
            return Err(RepositoryError::Conflict);
        }
        store
            .by_conversation
            .entry(message.conversation_id)
            .or_default()
            .push(message.id);
        store.messages.insert(message.id, message);
        Ok(())
    }

    async fn find(&self, id: MessageId) -> RepositoryResult<Option<Message>> {
        let store = self.store.read().await;
        Ok(store.messages.get(&id).cloned())
    }

    async fn list_by_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> RepositoryResult<Vec<Message>> {
        let store = self.store.read().await;
        let ids = store
            .by_conversation
            .get(&conversation_id)
            .cloned()
            .unwrap_or_default();
        let mut messages: Vec<Message> = ids
            .into_iter()
            .filter_map(|id| store.messages.get(&id).cloned())
            .collect();
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(messages)
    }

    async fn update(&self, message: Message) -> RepositoryResult<()> {
        let mut store = self.store.write().await;
        match store.messages.get_mut(&message.id) {
            Some(existing) => {
                *existing = message;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: MessageId) -> RepositoryResult<()> {
        let mut store = self.store.write().await;
        if let Some(message) = store.messages.remove(&id) {
            if let Some(ids) = store.by_conversation.get_mut(&message.conversation_id) {
                ids.retain(|existing| *existing != id);
            }
        }
        Ok(())
    }

    async fn delete_by_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> RepositoryResult<()> {
        let mut store = self.store.write().await;
        if let Some(ids) = store.by_conversation.remove(&conversation_id) {
            for id in ids {
                store.messages.remove(&id);
            }
        }
        Ok(())
    }

    async fn due_unrevealed(&self, now: Timestamp) -> RepositoryResult<Vec<Message>> {
        let store = self.store.read().await;
        let mut due: Vec<Message> = store
            .messages
            .values()
            .filter(|m| m.is_reveal_due(now))
            .cloned()
            .collect();
        due.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(due)
    }

    async fn mark_revealed(&self, id: MessageId) -> RepositoryResult<bool> {
        let mut store = self.store.write().await;
        let message = store.messages.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        Ok(message.reveal())
    }
}
