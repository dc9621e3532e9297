//! 推送给连接的领域事件
//!
//! 所有需要到达客户端连接的通知都以该枚举表达，经事件总线投递。
//! 单一连接内的投递顺序与发出顺序一致。

use serde::{Deserialize, Serialize};

use crate::entities::Message;
use crate::value_objects::{CallType, ConversationId, MessageId, Timestamp, UserId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// 在线成员变化时推送完整在线集合
    OnlineUsers { user_ids: Vec<UserId> },

    /// 新消息投递
    MessageReceived { message: Message },

    /// 定时消息揭示
    MessageRevealed {
        conversation_id: ConversationId,
        message_id: MessageId,
    },

    /// 对端已读（按发送者聚合，一个发送者一条）
    MessagesSeen {
        conversation_id: ConversationId,
        seen_by: UserId,
        seen_at: Timestamp,
        message_ids: Vec<MessageId>,
    },

    /// 消息被对所有人删除
    MessageDeleted {
        conversation_id: ConversationId,
        message_id: MessageId,
        deleted_by: UserId,
    },

    /// 会话被接受（通知创建者）
    ConversationAccepted {
        conversation_id: ConversationId,
        accepted_by: UserId,
    },

    /// 会话被拒绝（通知创建者，会话与消息已级联删除）
    ConversationRejected {
        conversation_id: ConversationId,
        rejected_by: UserId,
    },

    /// 通话邀请
    CallOffer {
        from: UserId,
        call_type: CallType,
        sdp: String,
    },

    /// 通话应答
    CallAnswer { from: UserId, sdp: String },

    /// ICE candidate 中继
    CallIce { from: UserId, candidate: serde_json::Value },

    /// 通话结束（同时回送给发起方的其它设备）
    CallEnd { from: UserId },
}
