//! 应用层实现。
//!
//! 这里提供围绕领域模型的用例服务，处理输入校验、并发纪律、
//! 以及对外部适配器（身份校验、事件总线、回复生成）的抽象。

pub mod clock;
pub mod error;
pub mod event_bus;
pub mod identity;
pub mod presence;
pub mod services;

pub use clock::{Clock, SystemClock};
pub use error::ApplicationError;
pub use event_bus::EventBus;
pub use identity::IdentityVerifier;
pub use presence::{InMemoryPresenceRegistry, PresenceRegistry};
pub use services::{
    AssistantService, AssistantServiceDependencies, AssistantSettings, CallService,
    ConversationService, ConversationServiceDependencies, CooldownTracker, MessageService,
    MessageServiceDependencies, PromptRole, PromptTurn, ReplyGenerator, ReplyGeneratorError,
    RevealScheduler, RevealSchedulerHandle, SendMessageCommand,
};
