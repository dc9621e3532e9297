//! 定时揭示调度器
//!
//! 周期性扫描到期的定时消息并落盘揭示，向会话双方的连接发通知。
//! 单次 tick 的失败被记录后吞掉，循环永不停止；
//! 与读取路径的懒惰归一化并发竞争时，落盘转换是比较交换，
//! 已经揭示的消息不会再发出重复通知。

use std::sync::Arc;
use std::time::Duration;

use domain::{ConversationRepository, MessageRepository, ServerEvent};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::clock::Clock;
use crate::error::ApplicationError;
use crate::event_bus::EventBus;
use crate::presence::PresenceRegistry;

pub struct RevealScheduler {
    conversation_repository: Arc<dyn ConversationRepository>,
    message_repository: Arc<dyn MessageRepository>,
    presence: Arc<dyn PresenceRegistry>,
    event_bus: Arc<dyn EventBus>,
    clock: Arc<dyn Clock>,
    period: Duration,
}

/// 已启动调度器的控制句柄
pub struct RevealSchedulerHandle {
    shutdown: watch::Sender<bool>,
    join: JoinHandle<()>,
}

impl RevealSchedulerHandle {
    /// 停止调度循环并等待任务退出
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        let _ = self.join.await;
    }
}

impl RevealScheduler {
    pub fn new(
        conversation_repository: Arc<dyn ConversationRepository>,
        message_repository: Arc<dyn MessageRepository>,
        presence: Arc<dyn PresenceRegistry>,
        event_bus: Arc<dyn EventBus>,
        clock: Arc<dyn Clock>,
        period: Duration,
    ) -> Self {
        Self {
            conversation_repository,
            message_repository,
            presence,
            event_bus,
            clock,
            period,
        }
    }

    /// 单次扫描，测试可以直接单步调用。返回本次揭示的消息数。
    pub async fn tick(&self) -> Result<usize, ApplicationError> {
        let now = self.clock.now();
        let due = self.message_repository.due_unrevealed(now).await?;
        let mut revealed = 0usize;

        for message in due {
            // 比较交换：读取路径或上一次 tick 已经揭示时不再发通知
            if !self.message_repository.mark_revealed(message.id).await? {
                continue;
            }
            revealed += 1;

            let Some(conversation) = self
                .conversation_repository
                .find(message.conversation_id)
                .await?
            else {
                // 会话已被拒绝级联删除，消息随之无主
                continue;
            };

            let mut targets = Vec::new();
            for participant in [conversation.participant_a, conversation.participant_b] {
                if message.is_visible_to(participant) {
                    targets.extend(self.presence.connections_for(participant).await);
                }
            }
            self.event_bus
                .send_to_connections(
                    &targets,
                    ServerEvent::MessageRevealed {
                        conversation_id: message.conversation_id,
                        message_id: message.id,
                    },
                )
                .await;
        }

        if revealed > 0 {
            debug!(count = revealed, "定时消息已揭示");
        }
        Ok(revealed)
    }

    /// 启动后台循环。失败的 tick 记录日志后继续下一轮。
    pub fn start(self: Arc<Self>) -> RevealSchedulerHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let period = self.period;

        let join = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            info!(period_ms = period.as_millis() as u64, "揭示调度器启动");

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(err) = self.tick().await {
                            error!(error = %err, "揭示扫描失败，下一轮继续");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        info!("揭示调度器停止");
                        break;
                    }
                }
            }
        });

        RevealSchedulerHandle {
            shutdown: shutdown_tx,
            join,
        }
    }
}
