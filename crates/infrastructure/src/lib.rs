//! 基础设施层实现。
//!
//! 提供领域仓储的内存实现、本地事件总线、JWT 身份校验器
//! 以及外部回复生成协作方的 HTTP 客户端。

pub mod assistant;
pub mod auth;
pub mod event_bus;
pub mod storage;

pub use assistant::{HttpReplyGenerator, ReplyGeneratorSettings};
pub use auth::{JwtIdentityVerifier, JwtSettings};
pub use event_bus::LocalEventBus;
pub use storage::{InMemoryConversationRepository, InMemoryMessageRepository};
