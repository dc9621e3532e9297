use std::collections::HashMap;

use async_trait::async_trait;
use domain::{
    Conversation, ConversationId, ConversationRepository, RepositoryError, RepositoryResult,
    UserId,
};
use tokio::sync::RwLock;

/// 参与者对的规范化键：两个方向等价
fn pair_key(a: UserId, b: UserId) -> (UserId, UserId) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

/// 主存储与参与者对索引放在同一把锁下，保证插入与索引一致。
#[derive(Default)]
struct Store {
    conversations: HashMap<ConversationId, Conversation>,
    by_pair: HashMap<(UserId, UserId), ConversationId>,
}

#[derive(Default)]
pub struct InMemoryConversationRepository {
    store: RwLock<Store>,
}

impl InMemoryConversationRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationRepository for InMemoryConversationRepository {
    async fn insert(&self, conversation: Conversation) -> RepositoryResult<()> {
        let mut store = self.store.write().await;
        let key = pair_key(conversation.participant_a, conversation.participant_b);
        if store.by_pair.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }
        store.by_pair.insert(key, conversation.id);
        store.conversations.insert(conversation.id, conversation);
        Ok(())
    }

    async fn find(&self, id: ConversationId) -> RepositoryResult<Option<Conversation>> {
        let store = self.store.read().await;
        Ok(store.conversations.get(&id).cloned())
    }

    async fn find_by_participants(
        &self,
        a: UserId,
        b: UserId,
    ) -> RepositoryResult<Option<Conversation>> {
        let store = self.store.read().await;
        let id = store.by_pair.get(&pair_key(a, b));
        Ok(id.and_then(|id| store.conversations.get(id)).cloned())
    }

    async fn update(&self, conversation: Conversation) -> RepositoryResult<()> {
        let mut store = self.store.write().await;
        match store.conversations.get_mut(&conversation.id) {
            Some(existing) => {
                *existing = conversation;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    async fn delete(&self, id: ConversationId) -> RepositoryResult<()> {
        let mut store = self.store.write().await;
        let conversation = store
            .conversations
            .remove(&id)
            .ok_or(RepositoryError::NotFound)?;
        store
            .by_pair
            .remove(&pair_key(conversation.participant_a, conversation.participant_b));
        Ok(())
    }
}
