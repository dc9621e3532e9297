//! 两方会话实体
//!
//! 会话经历 PENDING -> ACCEPTED 或 PENDING -> REJECTED（终态）的生命周期。
//! REJECTED 在存储层表现为级联删除，实体本身只需表达 accept 语义。

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{ConversationId, MessageId, Timestamp, UserId};

/// accept 调用的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// 首次由非创建者成功接受
    Accepted,
    /// 幂等无操作（已接受，或创建者自己调用）
    NoOp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub participant_a: UserId,
    pub participant_b: UserId,
    pub created_by: UserId,
    /// 非创建者接受前为 None，成功接受后记录接受者且不再改变
    pub accepted_by: Option<UserId>,
    pub last_message: Option<MessageId>,
    pub created_at: Timestamp,
}

impl Conversation {
    pub fn new(
        id: ConversationId,
        participant_a: UserId,
        participant_b: UserId,
        created_by: UserId,
        created_at: Timestamp,
    ) -> DomainResult<Self> {
        if participant_a == participant_b {
            return Err(DomainError::invalid_argument(
                "participants",
                "must be two distinct users",
            ));
        }
        if created_by != participant_a && created_by != participant_b {
            return Err(DomainError::invalid_argument(
                "created_by",
                "must be one of the participants",
            ));
        }
        Ok(Self {
            id,
            participant_a,
            participant_b,
            created_by,
            accepted_by: None,
            last_message: None,
            created_at,
        })
    }

    pub fn is_participant(&self, user_id: UserId) -> bool {
        user_id == self.participant_a || user_id == self.participant_b
    }

    /// 返回另一位参与者
    pub fn other_participant(&self, user_id: UserId) -> Option<UserId> {
        if user_id == self.participant_a {
            Some(self.participant_b)
        } else if user_id == self.participant_b {
            Some(self.participant_a)
        } else {
            None
        }
    }

    pub fn is_accepted(&self) -> bool {
        self.accepted_by.is_some()
    }

    /// 接受会话。幂等：重复接受与创建者自行调用都是无操作成功。
    pub fn accept(&mut self, acting_user: UserId) -> DomainResult<AcceptOutcome> {
        if !self.is_participant(acting_user) {
            return Err(DomainError::permission_denied("accept conversation"));
        }
        if self.accepted_by.is_some() || acting_user == self.created_by {
            return Ok(AcceptOutcome::NoOp);
        }
        self.accepted_by = Some(acting_user);
        Ok(AcceptOutcome::Accepted)
    }

    /// 校验拒绝操作：创建者不能拒绝自己发起的会话。
    pub fn assert_can_reject(&self, acting_user: UserId) -> DomainResult<()> {
        if !self.is_participant(acting_user) {
            return Err(DomainError::permission_denied("reject conversation"));
        }
        if acting_user == self.created_by {
            return Err(DomainError::permission_denied(
                "creator cannot reject own conversation",
            ));
        }
        Ok(())
    }

    /// 发送闸门：创建者随时可发，非创建者在接受前发送被拒。
    pub fn assert_can_send(&self, sender_id: UserId) -> DomainResult<()> {
        if !self.is_participant(sender_id) {
            return Err(DomainError::permission_denied("send message"));
        }
        if sender_id != self.created_by && self.accepted_by.is_none() {
            return Err(DomainError::ConversationNotAccepted);
        }
        Ok(())
    }

    pub fn record_last_message(&mut self, message_id: MessageId) {
        self.last_message = Some(message_id);
    }
}
