//! 消息实体
//!
//! 管理消息的可见性白名单、定时揭示、已读标记与两种删除语义。
//! 不变量：`revealed` 只能 false -> true；墓碑化后内容永久清空。

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, DomainResult};
use crate::value_objects::{ConversationId, MessageBody, MessageId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: MessageId,
    pub conversation_id: ConversationId,
    pub sender_id: UserId,
    pub receiver_id: UserId,
    pub text: Option<String>,
    pub media_ref: Option<String>,
    pub created_at: Timestamp,
    pub seen: bool,
    pub seen_at: Option<Timestamp>,
    /// 设置后消息在该时刻之前保持隐藏
    pub reveal_at: Option<Timestamp>,
    pub revealed: bool,
    /// 可见性白名单，空集合表示对双方可见
    pub visible_to: HashSet<UserId>,
    pub deleted: bool,
    pub deleted_by: Option<UserId>,
    /// 对这些用户本地隐藏（delete for me）
    pub deleted_for: HashSet<UserId>,
}

impl Message {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: MessageId,
        conversation_id: ConversationId,
        sender_id: UserId,
        receiver_id: UserId,
        text: Option<String>,
        media_ref: Option<String>,
        reveal_at: Option<Timestamp>,
        visible_to: HashSet<UserId>,
        created_at: Timestamp,
    ) -> DomainResult<Self> {
        // 提供了正文就必须通过正文校验（非空白、长度上限）
        let text = text
            .map(MessageBody::new)
            .transpose()?
            .map(MessageBody::into_string);
        if text.is_none() && media_ref.is_none() {
            return Err(DomainError::invalid_argument(
                "message",
                "text or media_ref is required",
            ));
        }
        if let Some(at) = reveal_at {
            if at <= created_at {
                return Err(DomainError::invalid_argument(
                    "reveal_at",
                    "must be in the future",
                ));
            }
        }
        Ok(Self {
            id,
            conversation_id,
            sender_id,
            receiver_id,
            text,
            media_ref,
            created_at,
            seen: false,
            seen_at: None,
            reveal_at,
            revealed: reveal_at.is_none(),
            visible_to,
            deleted: false,
            deleted_by: None,
            deleted_for: HashSet::new(),
        })
    }

    /// 白名单判定：空集合对双方可见，非空则仅限名单内成员。
    pub fn is_visible_to(&self, user_id: UserId) -> bool {
        if self.deleted_for.contains(&user_id) {
            return false;
        }
        self.visible_to.is_empty() || self.visible_to.contains(&user_id)
    }

    /// 是否仅发送者可见（私有回复通道）
    pub fn is_sender_only(&self) -> bool {
        self.visible_to.len() == 1 && self.visible_to.contains(&self.sender_id)
    }

    /// 揭示是否到期
    pub fn is_reveal_due(&self, now: Timestamp) -> bool {
        !self.revealed && !self.deleted && self.reveal_at.map_or(false, |at| at <= now)
    }

    /// 揭示状态转换。返回是否真的发生了转换，已揭示时为无操作。
    pub fn reveal(&mut self) -> bool {
        if self.revealed {
            return false;
        }
        self.revealed = true;
        true
    }

    /// 读取路径的懒惰归一化：到期但尚未被后台扫描揭示的消息，
    /// 在返回的视图中按已揭示呈现。不落盘、不发事件。
    pub fn normalized_view(&self, now: Timestamp) -> Self {
        let mut view = self.clone();
        if view.is_reveal_due(now) {
            view.revealed = true;
        }
        view
    }

    /// 标记已读。返回是否发生了状态转换。
    pub fn mark_seen(&mut self, at: Timestamp) -> bool {
        if self.seen {
            return false;
        }
        self.seen = true;
        self.seen_at = Some(at);
        true
    }

    /// 对单个用户本地隐藏，幂等。
    pub fn hide_for(&mut self, user_id: UserId) {
        self.deleted_for.insert(user_id);
    }

    /// 对所有人删除：仅发送者可执行，内容永久清空。
    pub fn tombstone(&mut self, requester_id: UserId) -> DomainResult<()> {
        if requester_id != self.sender_id {
            return Err(DomainError::permission_denied(
                "only the sender may delete for everyone",
            ));
        }
        self.deleted = true;
        self.deleted_by = Some(requester_id);
        self.text = None;
        self.media_ref = None;
        Ok(())
    }
}
