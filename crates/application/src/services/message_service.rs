//! 消息可见性与揭示引擎
//!
//! 实现消息的创建、读取（含懒惰揭示归一化）、已读标记与两种删除语义。
//! 所有通知按消息的可见性白名单过滤后经事件总线投递。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use domain::{
    ConversationId, ConversationRepository, DeleteScope, DomainError, Message, MessageId,
    MessageRepository, RepositoryError, ServerEvent, Timestamp, UserId,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::event_bus::EventBus;
use crate::presence::PresenceRegistry;

/// 发送消息命令
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendMessageCommand {
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub text: Option<String>,
    pub media_ref: Option<String>,
    /// 设置后消息在该时刻之前保持隐藏
    pub reveal_at: Option<Timestamp>,
    /// 可见性白名单，空集合表示对双方可见
    pub visible_to: HashSet<UserId>,
}

pub struct MessageServiceDependencies {
    pub conversation_repository: Arc<dyn ConversationRepository>,
    pub message_repository: Arc<dyn MessageRepository>,
    pub presence: Arc<dyn PresenceRegistry>,
    pub event_bus: Arc<dyn EventBus>,
    pub clock: Arc<dyn Clock>,
}

pub struct MessageService {
    conversation_repository: Arc<dyn ConversationRepository>,
    message_repository: Arc<dyn MessageRepository>,
    presence: Arc<dyn PresenceRegistry>,
    event_bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
}

impl MessageService {
    pub fn new(deps: MessageServiceDependencies) -> Self {
        Self {
            conversation_repository: deps.conversation_repository,
            message_repository: deps.message_repository,
            presence: deps.presence,
            event_bus: deps.event_bus,
            clock: deps.clock,
        }
    }

    /// 发送消息。校验发送闸门与收件人，落盘后按可见性通知相关连接。
    pub async fn send(&self, command: SendMessageCommand) -> Result<Message, ApplicationError> {
        let mut conversation = self
            .conversation_repository
            .find(command.conversation_id)
            .await?
            .ok_or(DomainError::ConversationNotFound)?;

        conversation.assert_can_send(command.sender_id)?;

        let expected_receiver = conversation
            .other_participant(command.sender_id)
            .ok_or_else(|| DomainError::permission_denied("send message"))?;
        if command.receiver_id != expected_receiver {
            return Err(DomainError::invalid_argument(
                "receiver_id",
                "must be the other participant",
            )
            .into());
        }

        let message = Message::new(
            MessageId::generate(),
            command.conversation_id,
            command.sender_id,
            command.receiver_id,
            command.text,
            command.media_ref,
            command.reveal_at,
            command.visible_to,
            self.clock.now(),
        )?;

        self.persist_and_notify(&mut conversation, message).await
    }

    /// 助手回复通道：发送者是保留的助手身份，不走参与者闸门。
    /// 可见性固定为仅调用者可见，且永远即时揭示。
    pub async fn send_assistant_reply(
        &self,
        conversation_id: ConversationId,
        for_user: UserId,
        text: String,
    ) -> Result<Message, ApplicationError> {
        let mut conversation = self
            .conversation_repository
            .find(conversation_id)
            .await?
            .ok_or(DomainError::ConversationNotFound)?;

        if !conversation.is_participant(for_user) {
            return Err(DomainError::permission_denied("invoke assistant").into());
        }

        let message = Message::new(
            MessageId::generate(),
            conversation_id,
            UserId::ASSISTANT,
            for_user,
            Some(text),
            None,
            None,
            HashSet::from([for_user]),
            self.clock.now(),
        )?;

        self.persist_and_notify(&mut conversation, message).await
    }

    /// 落盘消息并更新会话的最后消息引用，随后通知有资格的查看者。
    /// 白名单限制到单人时只会命中该用户的连接。
    /// 会话更新输给并发拒绝的级联删除时，回收刚写入的消息。
    pub(crate) async fn persist_and_notify(
        &self,
        conversation: &mut domain::Conversation,
        message: Message,
    ) -> Result<Message, ApplicationError> {
        self.message_repository.insert(message.clone()).await?;
        conversation.record_last_message(message.id);
        if let Err(err) = self
            .conversation_repository
            .update(conversation.clone())
            .await
        {
            let _ = self.message_repository.delete(message.id).await;
            return Err(match err {
                RepositoryError::NotFound => DomainError::ConversationNotFound.into(),
                other => other.into(),
            });
        }

        info!(
            conversation_id = %message.conversation_id,
            message_id = %message.id,
            sender_id = %message.sender_id,
            "消息已发送"
        );

        let mut targets = Vec::new();
        for participant in [conversation.participant_a, conversation.participant_b] {
            if message.is_visible_to(participant) {
                targets.extend(self.presence.connections_for(participant).await);
            }
        }
        self.event_bus
            .send_to_connections(
                &targets,
                ServerEvent::MessageReceived {
                    message: message.clone(),
                },
            )
            .await;

        Ok(message)
    }

    /// 读取会话消息。过滤白名单与本地删除，
    /// 并做揭示归一化：到期消息即使后台扫描未跑到也按已揭示返回。
    pub async fn list(
        &self,
        conversation_id: ConversationId,
        requester_id: UserId,
    ) -> Result<Vec<Message>, ApplicationError> {
        let conversation = self
            .conversation_repository
            .find(conversation_id)
            .await?
            .ok_or(DomainError::ConversationNotFound)?;

        if !conversation.is_participant(requester_id) {
            return Err(DomainError::permission_denied("read conversation").into());
        }

        let now = self.clock.now();
        let messages = self
            .message_repository
            .list_by_conversation(conversation_id)
            .await?
            .into_iter()
            .filter(|m| m.is_visible_to(requester_id))
            .map(|m| m.normalized_view(now))
            .collect();

        Ok(messages)
    }

    /// 标记已读：会话内所有发给请求者、可见且已揭示的未读消息。
    /// 每个受影响的发送者收到一条聚合的已读通知。
    pub async fn mark_seen(
        &self,
        conversation_id: ConversationId,
        requester_id: UserId,
    ) -> Result<(), ApplicationError> {
        let conversation = self
            .conversation_repository
            .find(conversation_id)
            .await?
            .ok_or(DomainError::ConversationNotFound)?;

        if !conversation.is_participant(requester_id) {
            return Err(DomainError::permission_denied("mark seen").into());
        }

        let now = self.clock.now();
        let messages = self
            .message_repository
            .list_by_conversation(conversation_id)
            .await?;

        // 发送者 -> 被该次调用标记的消息
        let mut by_sender: HashMap<UserId, Vec<MessageId>> = HashMap::new();
        for mut message in messages {
            if message.receiver_id != requester_id
                || message.seen
                || !message.is_visible_to(requester_id)
                || !message.normalized_view(now).revealed
            {
                continue;
            }
            if message.mark_seen(now) {
                self.message_repository.update(message.clone()).await?;
                by_sender.entry(message.sender_id).or_default().push(message.id);
            }
        }

        for (sender_id, message_ids) in by_sender {
            let connections = self.presence.connections_for(sender_id).await;
            self.event_bus
                .send_to_connections(
                    &connections,
                    ServerEvent::MessagesSeen {
                        conversation_id,
                        seen_by: requester_id,
                        seen_at: now,
                        message_ids,
                    },
                )
                .await;
        }

        Ok(())
    }

    /// 删除消息。
    /// scope=me：参与者即可，仅对请求者本地隐藏，幂等。
    /// scope=everyone：仅发送者，内容永久清空并通知双方连接。
    pub async fn delete(
        &self,
        message_id: MessageId,
        requester_id: UserId,
        scope: DeleteScope,
    ) -> Result<(), ApplicationError> {
        let mut message = self
            .message_repository
            .find(message_id)
            .await?
            .ok_or(DomainError::MessageNotFound)?;

        let conversation = self
            .conversation_repository
            .find(message.conversation_id)
            .await?
            .ok_or(DomainError::ConversationNotFound)?;

        if !conversation.is_participant(requester_id) {
            return Err(DomainError::permission_denied("delete message").into());
        }

        match scope {
            DeleteScope::Me => {
                message.hide_for(requester_id);
                self.message_repository.update(message).await?;
            }
            DeleteScope::Everyone => {
                message.tombstone(requester_id)?;
                self.message_repository.update(message.clone()).await?;

                info!(message_id = %message_id, deleted_by = %requester_id, "消息已对所有人删除");

                let mut targets = self.presence.connections_for(message.sender_id).await;
                targets.extend(self.presence.connections_for(message.receiver_id).await);
                self.event_bus
                    .send_to_connections(
                        &targets,
                        ServerEvent::MessageDeleted {
                            conversation_id: message.conversation_id,
                            message_id,
                            deleted_by: requester_id,
                        },
                    )
                    .await;
            }
        }

        Ok(())
    }
}
