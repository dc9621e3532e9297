//! 仓储接口定义
//!
//! 存储引擎内部实现不属于核心；这里只约定核心正确性所需的逻辑操作。

pub mod conversation_repository;
pub mod message_repository;

pub use conversation_repository::ConversationRepository;
pub use message_repository::MessageRepository;

use thiserror::Error;

/// 仓储层错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RepositoryError {
    /// 目标记录不存在
    #[error("record not found")]
    NotFound,

    /// 唯一性冲突
    #[error("record conflict")]
    Conflict,

    /// 底层存储错误
    #[error("storage error: {message}")]
    Storage { message: String },
}

impl RepositoryError {
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
        }
    }
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
