use std::sync::Arc;

use application::{
    AssistantService, CallService, ConversationService, EventBus, IdentityVerifier,
    MessageService, PresenceRegistry,
};

#[derive(Clone)]
pub struct AppState {
    pub conversation_service: Arc<ConversationService>,
    pub message_service: Arc<MessageService>,
    pub call_service: Arc<CallService>,
    pub assistant_service: Arc<AssistantService>,
    pub presence: Arc<dyn PresenceRegistry>,
    pub event_bus: Arc<dyn EventBus>,
    pub identity: Arc<dyn IdentityVerifier>,
}

impl AppState {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        conversation_service: Arc<ConversationService>,
        message_service: Arc<MessageService>,
        call_service: Arc<CallService>,
        assistant_service: Arc<AssistantService>,
        presence: Arc<dyn PresenceRegistry>,
        event_bus: Arc<dyn EventBus>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            conversation_service,
            message_service,
            call_service,
            assistant_service,
            presence,
            event_bus,
            identity,
        }
    }
}
