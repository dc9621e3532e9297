use async_trait::async_trait;

use crate::entities::Message;
use crate::repositories::RepositoryResult;
use crate::value_objects::{ConversationId, MessageId, Timestamp};

/// 消息仓储接口
#[async_trait]
pub trait MessageRepository: Send + Sync {
    /// 插入新消息
    async fn insert(&self, message: Message) -> RepositoryResult<()>;

    /// 按ID查询
    async fn find(&self, id: MessageId) -> RepositoryResult<Option<Message>>;

    /// 查询会话内全部消息，按创建时间升序
    async fn list_by_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> RepositoryResult<Vec<Message>>;

    /// 覆盖保存已有消息
    async fn update(&self, message: Message) -> RepositoryResult<()>;

    /// 删除单条消息，不存在时为无操作
    async fn delete(&self, id: MessageId) -> RepositoryResult<()>;

    /// 删除会话全部消息（拒绝时级联）
    async fn delete_by_conversation(
        &self,
        conversation_id: ConversationId,
    ) -> RepositoryResult<()>;

    /// 到期且未揭示、未删除的定时消息
    async fn due_unrevealed(&self, now: Timestamp) -> RepositoryResult<Vec<Message>>;

    /// 揭示状态的比较交换：仅当尚未揭示时落盘转换。
    /// 返回是否真的发生了转换，供调用方决定是否发通知。
    async fn mark_revealed(&self, id: MessageId) -> RepositoryResult<bool>;
}
