//! 仓储的内存实现
//!
//! 单进程模型下的生产实现；持久化引擎内部不属于本核心的范围。

pub mod conversation_repository_impl;
pub mod message_repository_impl;

pub use conversation_repository_impl::InMemoryConversationRepository;
pub use message_repository_impl::InMemoryMessageRepository;
