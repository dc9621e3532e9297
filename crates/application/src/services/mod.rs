pub mod assistant_service;
pub mod call_service;
pub mod conversation_service;
pub mod message_service;
pub mod reveal_scheduler;

pub use assistant_service::{
    AssistantService, AssistantServiceDependencies, AssistantSettings, CooldownTracker,
    PromptRole, PromptTurn, ReplyGenerator, ReplyGeneratorError,
};
pub use call_service::CallService;
pub use conversation_service::{ConversationService, ConversationServiceDependencies};
pub use message_service::{MessageService, MessageServiceDependencies, SendMessageCommand};
pub use reveal_scheduler::{RevealScheduler, RevealSchedulerHandle};

#[cfg(test)]
pub(crate) mod test_support;
