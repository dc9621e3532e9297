//! 本地事件总线
//!
//! 连接ID到其无界发送端的映射。单个连接的事件顺序由 mpsc 通道保证；
//! 未知或已死的连接静默跳过。

use std::collections::HashMap;

use application::EventBus;
use async_trait::async_trait;
use domain::{ConnectionId, ServerEvent};
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

#[derive(Default)]
pub struct LocalEventBus {
    senders: RwLock<HashMap<ConnectionId, mpsc::UnboundedSender<ServerEvent>>>,
}

impl LocalEventBus {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventBus for LocalEventBus {
    async fn register(
        &self,
        connection_id: ConnectionId,
        sender: mpsc::UnboundedSender<ServerEvent>,
    ) {
        let mut senders = self.senders.write().await;
        senders.insert(connection_id, sender);
    }

    async fn deregister(&self, connection_id: ConnectionId) {
        let mut senders = self.senders.write().await;
        senders.remove(&connection_id);
    }

    async fn send_to_connections(&self, targets: &[ConnectionId], event: ServerEvent) {
        let senders = self.senders.read().await;
        for connection_id in targets {
            match senders.get(connection_id) {
                Some(sender) => {
                    // 接收端随连接关闭而丢弃时发送失败，静默跳过
                    if sender.send(event.clone()).is_err() {
                        debug!(connection_id = %connection_id, "事件发送失败，连接已关闭");
                    }
                }
                None => {
                    debug!(connection_id = %connection_id, "目标连接未注册，跳过");
                }
            }
        }
    }

    async fn broadcast(&self, event: ServerEvent) {
        let senders = self.senders.read().await;
        for sender in senders.values() {
            let _ = sender.send(event.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::UserId;
    use uuid::Uuid;

    fn online_event() -> ServerEvent {
        ServerEvent::OnlineUsers {
            user_ids: vec![UserId::new(Uuid::new_v4())],
        }
    }

    #[tokio::test]
    async fn delivers_in_emission_order_per_connection() {
        let bus = LocalEventBus::new();
        let conn = ConnectionId::generate();
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.register(conn, tx).await;

        let first = ServerEvent::OnlineUsers { user_ids: vec![] };
        let second = online_event();
        bus.send_to_connections(&[conn], first.clone()).await;
        bus.send_to_connections(&[conn], second.clone()).await;

        assert_eq!(rx.recv().await.unwrap(), first);
        assert_eq!(rx.recv().await.unwrap(), second);
    }

    #[tokio::test]
    async fn unknown_target_is_silently_skipped() {
        let bus = LocalEventBus::new();
        // 不应panic也不应报错
        bus.send_to_connections(&[ConnectionId::generate()], online_event())
            .await;
    }

    #[tokio::test]
    async fn deregistered_connection_receives_nothing() {
        let bus = LocalEventBus::new();
        let conn = ConnectionId::generate();
        let (tx, mut rx) = mpsc::unbounded_channel();
        bus.register(conn, tx).await;
        bus.deregister(conn).await;

        bus.broadcast(online_event()).await;
        assert!(rx.try_recv().is_err());
    }
}
