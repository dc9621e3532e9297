//! 服务层测试的共享脚手架：可控时钟、记录型事件总线与服务装配。

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use domain::{ConnectionId, ConversationId, ServerEvent, Timestamp, UserId};
use infrastructure::{InMemoryConversationRepository, InMemoryMessageRepository};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::clock::Clock;
use crate::event_bus::EventBus;
use crate::presence::{InMemoryPresenceRegistry, PresenceRegistry};
use crate::services::conversation_service::{ConversationService, ConversationServiceDependencies};
use crate::services::message_service::{MessageService, MessageServiceDependencies, SendMessageCommand};
use crate::services::reveal_scheduler::RevealScheduler;

/// 测试可任意拨动的时钟
pub struct ManualClock {
    now: Mutex<Timestamp>,
}

impl ManualClock {
    pub fn new(now: Timestamp) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now = *now + by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock().unwrap()
    }
}

/// 记录型事件总线：保留每次定向投递与广播，供断言检查。
#[derive(Default)]
pub struct RecordingEventBus {
    sent: Mutex<Vec<(Vec<ConnectionId>, ServerEvent)>>,
    broadcasts: Mutex<Vec<ServerEvent>>,
}

impl RecordingEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn sent(&self) -> Vec<(Vec<ConnectionId>, ServerEvent)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn broadcasts(&self) -> Vec<ServerEvent> {
        self.broadcasts.lock().unwrap().clone()
    }

    /// 某个连接收到的全部定向事件
    pub fn events_for(&self, connection_id: ConnectionId) -> Vec<ServerEvent> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|(targets, _)| targets.contains(&connection_id))
            .map(|(_, event)| event.clone())
            .collect()
    }

    pub fn clear(&self) {
        self.sent.lock().unwrap().clear();
        self.broadcasts.lock().unwrap().clear();
    }
}

#[async_trait]
impl EventBus for RecordingEventBus {
    async fn register(&self, _connection_id: ConnectionId, _sender: mpsc::UnboundedSender<ServerEvent>) {}

    async fn deregister(&self, _connection_id: ConnectionId) {}

    async fn send_to_connections(&self, targets: &[ConnectionId], event: ServerEvent) {
        self.sent.lock().unwrap().push((targets.to_vec(), event));
    }

    async fn broadcast(&self, event: ServerEvent) {
        self.broadcasts.lock().unwrap().push(event);
    }
}

/// 全套服务的内存装配
pub struct TestHarness {
    pub conversation_repository: Arc<InMemoryConversationRepository>,
    pub message_repository: Arc<InMemoryMessageRepository>,
    pub presence: Arc<InMemoryPresenceRegistry>,
    pub bus: Arc<RecordingEventBus>,
    pub clock: Arc<ManualClock>,
    pub conversations: ConversationService,
    pub messages: Arc<MessageService>,
}

impl TestHarness {
    pub fn new() -> Self {
        let conversation_repository = Arc::new(InMemoryConversationRepository::new());
        let message_repository = Arc::new(InMemoryMessageRepository::new());
        let bus = Arc::new(RecordingEventBus::new());
        let presence = Arc::new(InMemoryPresenceRegistry::new(bus.clone()));
        let clock = Arc::new(ManualClock::new(Utc::now()));

        let conversations = ConversationService::new(ConversationServiceDependencies {
            conversation_repository: conversation_repository.clone(),
            message_repository: message_repository.clone(),
            presence: presence.clone(),
            event_bus: bus.clone(),
            clock: clock.clone(),
        });
        let messages = Arc::new(MessageService::new(MessageServiceDependencies {
            conversation_repository: conversation_repository.clone(),
            message_repository: message_repository.clone(),
            presence: presence.clone(),
            event_bus: bus.clone(),
            clock: clock.clone(),
        }));

        Self {
            conversation_repository,
            message_repository,
            presence,
            bus,
            clock,
            conversations,
            messages,
        }
    }

    pub fn scheduler(&self, period: Duration) -> RevealScheduler {
        RevealScheduler::new(
            self.conversation_repository.clone(),
            self.message_repository.clone(),
            self.presence.clone(),
            self.bus.clone(),
            self.clock.clone(),
            period,
        )
    }

    /// 为用户挂一个连接并返回连接ID
    pub async fn connect(&self, user_id: UserId) -> ConnectionId {
        let connection_id = ConnectionId::generate();
        self.presence.register(user_id, connection_id).await;
        connection_id
    }

    /// 建一个已接受的会话，创建者为 a
    pub async fn accepted_conversation(&self, a: UserId, b: UserId) -> ConversationId {
        let conversation = self.conversations.ensure(a, b, a).await.unwrap();
        self.conversations.accept(conversation.id, b).await.unwrap();
        conversation.id
    }
}

pub fn user() -> UserId {
    UserId::new(Uuid::new_v4())
}

pub fn text_command(
    conversation_id: ConversationId,
    sender_id: UserId,
    receiver_id: UserId,
    text: &str,
) -> SendMessageCommand {
    SendMessageCommand {
        conversation_id,
        sender_id,
        receiver_id,
        text: Some(text.to_string()),
        media_ref: None,
        reveal_at: None,
        visible_to: HashSet::new(),
    }
}
