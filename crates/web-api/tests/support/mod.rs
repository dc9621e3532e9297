use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use application::{
    AssistantService, AssistantServiceDependencies, AssistantSettings, CallService,
    ConversationService, ConversationServiceDependencies, InMemoryPresenceRegistry,
    MessageService, MessageServiceDependencies, PromptTurn, ReplyGenerator, ReplyGeneratorError,
    RevealScheduler, RevealSchedulerHandle, SystemClock,
};
use domain::{UserId, UserProfile};
use infrastructure::{
    InMemoryConversationRepository, InMemoryMessageRepository, JwtIdentityVerifier, JwtSettings,
    LocalEventBus,
};
use tokio::{net::TcpListener, sync::oneshot};
use uuid::Uuid;
use web_api::{router, AppState};

const TEST_JWT_SECRET: &str = "test-secret-key-with-at-least-32-characters";

/// 固定回复的生成协作方，测试不出网
struct CannedReplyGenerator;

#[async_trait::async_trait]
impl ReplyGenerator for CannedReplyGenerator {
    async fn generate_reply(&self, _context: &[PromptTurn]) -> Result<String, ReplyGeneratorError> {
        Ok("好的，收到。".to_string())
    }
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub verifier: JwtIdentityVerifier,
    scheduler_handle: Option<RevealSchedulerHandle>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn http_url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws_url(&self, token: &str) -> String {
        format!("ws://{}/api/v1/ws?token={}", self.addr, token)
    }

    pub fn token_for(&self, user_id: UserId, name: &str) -> String {
        self.verifier
            .issue_token(&UserProfile::new(user_id, name, None))
            .expect("issue token")
    }

    pub async fn stop(mut self) {
        if let Some(handle) = self.scheduler_handle.take() {
            handle.stop().await;
        }
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub fn new_user() -> UserId {
    UserId::new(Uuid::new_v4())
}

/// 启动完整内存栈的测试服务器，揭示调度周期压短以便测试定时消息。
pub async fn spawn_server() -> TestServer {
    let conversation_repository = Arc::new(InMemoryConversationRepository::new());
    let message_repository = Arc::new(InMemoryMessageRepository::new());
    let event_bus = Arc::new(LocalEventBus::new());
    let presence = Arc::new(InMemoryPresenceRegistry::new(event_bus.clone()));
    let clock = Arc::new(SystemClock);

    let conversation_service = Arc::new(ConversationService::new(ConversationServiceDependencies {
        conversation_repository: conversation_repository.clone(),
        message_repository: message_repository.clone(),
        presence: presence.clone(),
        event_bus: event_bus.clone(),
        clock: clock.clone(),
    }));
    let message_service = Arc::new(MessageService::new(MessageServiceDependencies {
        conversation_repository: conversation_repository.clone(),
        message_repository: message_repository.clone(),
        presence: presence.clone(),
        event_bus: event_bus.clone(),
        clock: clock.clone(),
    }));
    let call_service = Arc::new(CallService::new(presence.clone(), event_bus.clone()));
    let assistant_service = Arc::new(AssistantService::new(AssistantServiceDependencies {
        message_service: message_service.clone(),
        reply_generator: Arc::new(CannedReplyGenerator),
        clock: clock.clone(),
        settings: AssistantSettings::default(),
    }));

    let scheduler = Arc::new(RevealScheduler::new(
        conversation_repository.clone(),
        message_repository.clone(),
        presence.clone(),
        event_bus.clone(),
        clock.clone(),
        Duration::from_millis(50),
    ));
    let scheduler_handle = scheduler.start();

    let verifier = JwtIdentityVerifier::new(JwtSettings {
        secret: TEST_JWT_SECRET.to_string(),
        expiration_hours: 1,
    });
    let identity = Arc::new(JwtIdentityVerifier::new(JwtSettings {
        secret: TEST_JWT_SECRET.to_string(),
        expiration_hours: 1,
    }));

    let state = AppState::new(
        conversation_service,
        message_service,
        call_service,
        assistant_service,
        presence,
        event_bus,
        identity,
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let app = router(state);
    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    TestServer {
        addr,
        verifier,
        scheduler_handle: Some(scheduler_handle),
        shutdown: Some(shutdown_tx),
    }
}
