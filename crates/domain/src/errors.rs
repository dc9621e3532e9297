//! 领域模型错误定义
//!
//! 定义会话核心中所有可能的错误类型，提供清晰的错误上下文。

use thiserror::Error;

/// 领域模型错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// 参数验证错误
    #[error("invalid argument {field}: {reason}")]
    InvalidArgument { field: String, reason: String },

    /// 会话不存在
    #[error("conversation not found")]
    ConversationNotFound,

    /// 消息不存在
    #[error("message not found")]
    MessageNotFound,

    /// 权限不足
    #[error("permission denied: {action}")]
    PermissionDenied { action: String },

    /// 会话尚未被接受，非创建者不能发送
    #[error("conversation not accepted yet")]
    ConversationNotAccepted,

    /// 操作不被允许
    #[error("operation not allowed")]
    OperationNotAllowed,
}

impl DomainError {
    /// 创建验证错误
    pub fn invalid_argument(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            field: field.into(),
            reason: reason.into(),
        }
    }

    /// 创建权限错误
    pub fn permission_denied(action: impl Into<String>) -> Self {
        Self::PermissionDenied {
            action: action.into(),
        }
    }
}

/// 领域模型结果类型
pub type DomainResult<T> = Result<T, DomainError>;
