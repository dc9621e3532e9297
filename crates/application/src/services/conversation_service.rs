//! 会话生命周期服务
//!
//! 管理两方会话的 pending/accepted/rejected 状态机。
//! 拒绝是终态：级联删除全部消息与会话本身，并通知创建者的存活连接。

use std::sync::Arc;

use domain::{
    AcceptOutcome, Conversation, ConversationId, ConversationRepository, DomainError,
    MessageRepository, RepositoryError, ServerEvent, UserId,
};
use tracing::info;

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::event_bus::EventBus;
use crate::presence::PresenceRegistry;

pub struct ConversationServiceDependencies {
    pub conversation_repository: Arc<dyn ConversationRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub presence: Arc<dyn PresenceRegistry>,
    pub event_bus: Arc<dyn EventBus>,
    pub clock: Arc<dyn Clock>,
}

pub struct ConversationService {
    conversation_repository: Arc<dyn ConversationRepository>,
    message_repository: Arc<dyn MessageRepository>,
    presence: Arc<dyn PresenceRegistry>,
    event_bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
}

impl ConversationService {
    pub fn new(deps: ConversationServiceDependencies) -> Self {
        Self {
            conversation_repository: deps.conversation_repository,
            message_repository: deps.message_repository,
            presence: deps.presence,
            event_bus: deps.event_bus,
            clock: deps.clock,
        }
    }

    /// 返回两位参与者之间已有的会话，不存在则以 PENDING 状态创建。
    pub async fn ensure(
        &self,
        participant_a: UserId,
        participant_b: UserId,
        created_by: UserId,
    ) -> Result<Conversation, ApplicationError> {
        if let Some(existing) = self
            .conversation_repository
            .find_by_participants(participant_a, participant_b)
            .await?
        {
            return Ok(existing);
        }

        let conversation = Conversation::new(
            ConversationId::generate(),
            participant_a,
            participant_b,
            created_by,
            self.clock.now(),
        )?;

        match self.conversation_repository.insert(conversation.clone()).await {
            Ok(()) => {
                info!(conversation_id = %conversation.id, created_by = %created_by, "创建会话");
                Ok(conversation)
            }
            // 并发 ensure 撞到唯一性冲突时，改为读取赢家
            Err(RepositoryError::Conflict) => self
                .conversation_repository
                .find_by_participants(participant_a, participant_b)
                .await?
                .ok_or(ApplicationError::Repository(RepositoryError::Conflict)),
            Err(err) => Err(err.into()),
        }
    }

    /// 接受会话。幂等：重复接受与创建者调用都是无操作成功。
    /// 首次成功接受时通知创建者的存活连接。
    pub async fn accept(
        &self,
        conversation_id: ConversationId,
        acting_user: UserId,
    ) -> Result<Conversation, ApplicationError> {
        let mut conversation = self
            .conversation_repository
            .find(conversation_id)
            .await?
            .ok_or(DomainError::ConversationNotFound)?;

        let outcome = conversation.accept(acting_user)?;
        if outcome == AcceptOutcome::Accepted {
            self.conversation_repository
                .update(conversation.clone())
                .await?;

            info!(conversation_id = %conversation_id, accepted_by = %acting_user, "会话已接受");

            let creator_connections = self
                .presence
                .connections_for(conversation.created_by)
                .await;
            self.event_bus
                .send_to_connections(
                    &creator_connections,
                    ServerEvent::ConversationAccepted {
                        conversation_id,
                        accepted_by: acting_user,
                    },
                )
                .await;
        }

        Ok(conversation)
    }

    /// 拒绝会话（终态）。仅非创建者可拒绝；
    /// 级联删除全部消息与会话，并通知创建者的每个存活连接恰好一次。
    pub async fn reject(
        &self,
        conversation_id: ConversationId,
        acting_user: UserId,
    ) -> Result<(), ApplicationError> {
        let conversation = self
            .conversation_repository
            .find(conversation_id)
            .await?
            .ok_or(DomainError::ConversationNotFound)?;

        conversation.assert_can_reject(acting_user)?;

        // 先删消息再删会话：会话消失后其消息绝不能再可达
        self.message_repository
            .delete_by_conversation(conversation_id)
            .await?;
        self.conversation_repository.delete(conversation_id).await?;

        info!(conversation_id = %conversation_id, rejected_by = %acting_user, "会话已拒绝并删除");

        let creator_connections = self
            .presence
            .connections_for(conversation.created_by)
            .await;
        self.event_bus
            .send_to_connections(
                &creator_connections,
                ServerEvent::ConversationRejected {
                    conversation_id,
                    rejected_by: acting_user,
                },
            )
            .await;

        Ok(())
    }
}
