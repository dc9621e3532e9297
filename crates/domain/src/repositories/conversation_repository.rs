use async_trait::async_trait;

use crate::entities::Conversation;
use crate::repositories::RepositoryResult;
use crate::value_objects::{ConversationId, UserId};

/// 会话仓储接口
#[async_trait]
pub trait ConversationRepository: Send + Sync {
    /// 插入新会话
    async fn insert(&self, conversation: Conversation) -> RepositoryResult<()>;

    /// 按ID查询
    async fn find(&self, id: ConversationId) -> RepositoryResult<Option<Conversation>>;

    /// 按参与者对查询（无序对，两个方向等价）
    async fn find_by_participants(
        &self,
        a: UserId,
        b: UserId,
    ) -> RepositoryResult<Option<Conversation>>;

    /// 覆盖保存已有会话
    async fn update(&self, conversation: Conversation) -> RepositoryResult<()>;

    /// 硬删除会话（拒绝时的级联入口）
    async fn delete(&self, id: ConversationId) -> RepositoryResult<()>;
}
