//! 主应用程序入口
//!
//! 启动 Axum Web API 服务与定时揭示调度器。

use std::sync::Arc;
use std::time::Duration;

use application::{
    AssistantService, AssistantServiceDependencies, AssistantSettings, CallService,
    ConversationService, ConversationServiceDependencies, InMemoryPresenceRegistry,
    MessageService, MessageServiceDependencies, RevealScheduler, SystemClock,
};
use config::AppConfig;
use infrastructure::{
    HttpReplyGenerator, InMemoryConversationRepository, InMemoryMessageRepository,
    JwtIdentityVerifier, JwtSettings, LocalEventBus, ReplyGeneratorSettings,
};
use tracing_subscriber::EnvFilter;
use web_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = AppConfig::from_env_with_defaults();
    if let Err(err) = config.validate() {
        tracing::warn!(error = %err, "配置校验未通过，继续以开发配置启动");
    }

    // 仓储与事件总线
    let conversation_repository = Arc::new(InMemoryConversationRepository::new());
    let message_repository = Arc::new(InMemoryMessageRepository::new());
    let event_bus = Arc::new(LocalEventBus::new());
    let presence = Arc::new(InMemoryPresenceRegistry::new(event_bus.clone()));
    let clock = Arc::new(SystemClock);

    // 应用层服务
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

    // 助手回复服务
    let reply_generator = Arc::new(
        HttpReplyGenerator::new(ReplyGeneratorSettings {
            base_url: config.assistant.base_url.clone(),
            timeout: Duration::from_secs(config.assistant.timeout_secs),
        })
        .map_err(|err| anyhow::anyhow!("failed to build reply generator: {err}"))?,
    );
    let assistant_service = Arc::new(AssistantService::new(AssistantServiceDependencies {
        message_service: message_service.clone(),
        reply_generator,
        clock: clock.clone(),
        settings: AssistantSettings {
            cooldown: Duration::from_secs(config.assistant.cooldown_secs),
            context_window: config.assistant.context_window,
            max_reply_chars: config.assistant.max_reply_chars,
        },
    }));

    // 定时揭示调度器
    let scheduler = Arc::new(RevealScheduler::new(
        conversation_repository.clone(),
        message_repository.clone(),
        presence.clone(),
        event_bus.clone(),
        clock.clone(),
        Duration::from_millis(config.reveal.period_ms),
    ));
    let scheduler_handle = scheduler.start();

    // 身份校验
    let identity = Arc::new(JwtIdentityVerifier::new(JwtSettings {
        secret: config.jwt.secret.clone(),
        expiration_hours: config.jwt.expiration_hours,
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

    // 启动 Web 服务器
    let app = router(state);
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    tracing::info!("会话服务器启动在 http://{}", bind_addr);
    axum::serve(listener, app).await?;

    scheduler_handle.stop().await;
    Ok(())
}
