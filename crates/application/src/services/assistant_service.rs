//! 限流助手桥
//!
//! 把请求整形后交给外部回复生成协作方，并把回复以私有通道写回消息引擎。
//! 冷却窗口内的调用直接拒绝，不触碰外部协作方；
//! 协作方失败时用固定的兜底文案代替，错误不外传。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use domain::{ConversationId, Message, Timestamp, UserId};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::services::message_service::MessageService;

/// 协作方失败的兜底回复
pub const FALLBACK_REPLY: &str = "抱歉，我现在无法回复，请稍后再试。";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptRole {
    /// 调用助手的用户本人
    User,
    /// 会话对端
    Peer,
    /// 之前的助手回复
    Assistant,
}

/// 发给回复生成协作方的单轮上下文
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptTurn {
    pub role: PromptRole,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum ReplyGeneratorError {
    #[error("reply generator unavailable: {0}")]
    Unavailable(String),
}

/// 外部回复生成协作方的窄接口，无会话状态
#[async_trait]
pub trait ReplyGenerator: Send + Sync {
    async fn generate_reply(&self, context: &[PromptTurn]) -> Result<String, ReplyGeneratorError>;
}

/// 按用户记录上次调用时间的冷却跟踪器。
/// 时钟由调用方注入，限流边界可以确定性测试。
pub struct CooldownTracker {
    window: Duration,
    last_invocation: Mutex<HashMap<UserId, Timestamp>>,
}

impl CooldownTracker {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_invocation: Mutex::new(HashMap::new()),
        }
    }

    /// 冷却未过返回剩余秒数；否则记录本次调用时间。
    pub async fn check_and_record(&self, user_id: UserId, now: Timestamp) -> Result<(), i64> {
        let mut last = self.last_invocation.lock().await;
        if let Some(&previous) = last.get(&user_id) {
            let elapsed = now.signed_duration_since(previous);
            let window = chrono::Duration::from_std(self.window).unwrap_or(chrono::Duration::zero());
            if elapsed < window {
                return Err((window - elapsed).num_seconds().max(1));
            }
        }
        last.insert(user_id, now);
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct AssistantSettings {
    /// 同一用户两次调用之间的最小间隔
    pub cooldown: Duration,
    /// 发给协作方的最近会话轮数上限
    pub context_window: usize,
    /// 回复的最大字符数，超出截断
    pub max_reply_chars: usize,
}

impl Default for AssistantSettings {
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(30),
            context_window: 10,
            max_reply_chars: 1000,
        }
    }
}

pub struct AssistantServiceDependencies {
    pub message_service: Arc<MessageService>,
    pub reply_generator: Arc<dyn ReplyGenerator>,
    pub clock: Arc<dyn Clock>,
    pub settings: AssistantSettings,
}

pub struct AssistantService {
    message_service: Arc<MessageService>,
    reply_generator: Arc<dyn ReplyGenerator>,
    clock: Arc<dyn Clock>,
    settings: AssistantSettings,
    cooldown: CooldownTracker,
}

impl AssistantService {
    pub fn new(deps: AssistantServiceDependencies) -> Self {
        let cooldown = CooldownTracker::new(deps.settings.cooldown);
        Self {
            message_service: deps.message_service,
            reply_generator: deps.reply_generator,
            clock: deps.clock,
            settings: deps.settings,
            cooldown,
        }
    }

    /// 调用助手为 `sender_id` 生成一条仅其本人可见的回复消息。
    pub async fn invoke(
        &self,
        sender_id: UserId,
        conversation_id: ConversationId,
    ) -> Result<Message, ApplicationError> {
        // 先取有界上下文，顺带校验会话存在与成员资格；
        // 被拒绝的调用不消耗冷却窗口。
        let context = self.build_context(sender_id, conversation_id).await?;

        let now = self.clock.now();
        if let Err(retry_after_secs) = self.cooldown.check_and_record(sender_id, now).await {
            return Err(ApplicationError::RateLimited { retry_after_secs });
        }

        let reply = match self.reply_generator.generate_reply(&context).await {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, sender_id = %sender_id, "回复生成失败，使用兜底文案");
                FALLBACK_REPLY.to_string()
            }
        };
        let reply = truncate_chars(&reply, self.settings.max_reply_chars);

        info!(conversation_id = %conversation_id, sender_id = %sender_id, "助手回复已生成");

        self.message_service
            .send_assistant_reply(conversation_id, sender_id, reply)
            .await
    }

    async fn build_context(
        &self,
        sender_id: UserId,
        conversation_id: ConversationId,
    ) -> Result<Vec<PromptTurn>, ApplicationError> {
        let messages = self
            .message_service
            .list(conversation_id, sender_id)
            .await?;

        let turns: Vec<PromptTurn> = messages
            .into_iter()
            .rev()
            .filter(|m| m.revealed && !m.deleted)
            .filter_map(|m| {
                let text = m.text?;
                let role = if m.sender_id == UserId::ASSISTANT {
                    PromptRole::Assistant
                } else if m.sender_id == sender_id {
                    PromptRole::User
                } else {
                    PromptRole::Peer
                };
                Some(PromptTurn { role, text })
            })
            .take(self.settings.context_window)
            .collect();

        // 恢复时间顺序
        Ok(turns.into_iter().rev().collect())
    }
}

/// 按字符截断，避免切在多字节边界上
fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    text.chars().take(max_chars).collect()
}
