//! 在线状态注册表
//!
//! 用户身份到其存活连接集合的映射，支持同一用户多设备并存。
//! 每次 register/deregister 都是对注册表状态的单次原子变更；
//! 在线成员（而非连接数）发生变化时，向所有连接广播完整在线集合。
//! 成员集合未变化的新连接只收到一份定向的当前快照，方便客户端首屏渲染。

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use domain::{ConnectionId, ServerEvent, UserId};
use tokio::sync::Mutex;

use crate::event_bus::EventBus;

/// 在线状态注册表接口
#[async_trait]
pub trait PresenceRegistry: Send + Sync {
    /// 用户的一个连接上线。同一用户的连接是累加的。
    async fn register(&self, user_id: UserId, connection_id: ConnectionId);

    /// 连接断开。返回该连接归属的用户（若已注册）。
    async fn deregister(&self, connection_id: ConnectionId) -> Option<UserId>;

    /// 查询用户的存活连接。未知用户返回空集合，不报错。
    async fn connections_for(&self, user_id: UserId) -> Vec<ConnectionId>;

    /// 当前在线用户集合
    async fn online_user_ids(&self) -> Vec<UserId>;

    /// 用户在线 当且仅当 其连接集合非空
    async fn is_online(&self, user_id: UserId) -> bool;
}

/// 双向映射放在同一把锁下，读方永远不会看到半更新的集合。
#[derive(Default)]
struct PresenceState {
    user_connections: HashMap<UserId, HashSet<ConnectionId>>,
    connection_users: HashMap<ConnectionId, UserId>,
}

/// 单进程内存实现
pub struct InMemoryPresenceRegistry {
    state: Mutex<PresenceState>,
    event_bus: Arc<dyn EventBus>,
}

impl InMemoryPresenceRegistry {
    pub fn new(event_bus: Arc<dyn EventBus>) -> Self {
        Self {
            state: Mutex::new(PresenceState::default()),
            event_bus,
        }
    }

    fn online_snapshot(state: &PresenceState) -> Vec<UserId> {
        let mut ids: Vec<UserId> = state.user_connections.keys().copied().collect();
        ids.sort();
        ids
    }
}

#[async_trait]
impl PresenceRegistry for InMemoryPresenceRegistry {
    async fn register(&self, user_id: UserId, connection_id: ConnectionId) {
        // 广播发生在持锁期间，保证成员变化通知与变更顺序一致
        let mut state = self.state.lock().await;
        let came_online = !state.user_connections.contains_key(&user_id);

        state
            .user_connections
            .entry(user_id)
            .or_default()
            .insert(connection_id);
        state.connection_users.insert(connection_id, user_id);

        tracing::info!(user_id = %user_id, connection_id = %connection_id, "连接注册");

        let snapshot = Self::online_snapshot(&state);
        if came_online {
            self.event_bus
                .broadcast(ServerEvent::OnlineUsers { user_ids: snapshot })
                .await;
        } else {
            // 同一用户的后续设备：不打扰其他人，只给新连接推当前快照
            self.event_bus
                .send_to_connections(
                    &[connection_id],
                    ServerEvent::OnlineUsers { user_ids: snapshot },
                )
                .await;
        }
    }

    async fn deregister(&self, connection_id: ConnectionId) -> Option<UserId> {
        let mut state = self.state.lock().await;
        let user_id = state.connection_users.remove(&connection_id)?;

        let went_offline = if let Some(connections) = state.user_connections.get_mut(&user_id) {
            connections.remove(&connection_id);
            if connections.is_empty() {
                state.user_connections.remove(&user_id);
                true
            } else {
                false
            }
        } else {
            false
        };

        tracing::info!(user_id = %user_id, connection_id = %connection_id, "连接注销");

        if went_offline {
            let snapshot = Self::online_snapshot(&state);
            self.event_bus
                .broadcast(ServerEvent::OnlineUsers { user_ids: snapshot })
                .await;
        }

        Some(user_id)
    }

    async fn connections_for(&self, user_id: UserId) -> Vec<ConnectionId> {
        let state = self.state.lock().await;
        state
            .user_connections
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    async fn online_user_ids(&self) -> Vec<UserId> {
        let state = self.state.lock().await;
        Self::online_snapshot(&state)
    }

    async fn is_online(&self, user_id: UserId) -> bool {
        let state = self.state.lock().await;
        state.user_connections.contains_key(&user_id)
    }
}
