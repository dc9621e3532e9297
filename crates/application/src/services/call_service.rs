//! 通话信令中继
//!
//! 无状态：正确性完全依赖在线状态注册表的时效性。
//! 目标用户没有存活连接时静默丢弃，绝不向发起方报错——
//! 发起方的界面独立处理取消与超时。

use std::sync::Arc;

use domain::{CallType, ConnectionId, ServerEvent, UserId};
use tracing::debug;

use crate::event_bus::EventBus;
use crate::presence::PresenceRegistry;

pub struct CallService {
    presence: Arc<dyn PresenceRegistry>,
    event_bus: Arc<dyn EventBus>,
}

impl CallService {
    pub fn new(presence: Arc<dyn PresenceRegistry>, event_bus: Arc<dyn EventBus>) -> Self {
        Self {
            presence,
            event_bus,
        }
    }

    /// 向目标用户的全部连接扇出事件
    async fn relay(&self, to: UserId, event: ServerEvent) {
        let targets = self.presence.connections_for(to).await;
        if targets.is_empty() {
            debug!(to = %to, "信令目标离线，静默丢弃");
            return;
        }
        self.event_bus.send_to_connections(&targets, event).await;
    }

    pub async fn offer(&self, from: UserId, to: UserId, sdp: String, call_type: CallType) {
        self.relay(
            to,
            ServerEvent::CallOffer {
                from,
                call_type,
                sdp,
            },
        )
        .await;
    }

    pub async fn answer(&self, from: UserId, to: UserId, sdp: String) {
        self.relay(to, ServerEvent::CallAnswer { from, sdp }).await;
    }

    pub async fn ice_candidate(&self, from: UserId, to: UserId, candidate: serde_json::Value) {
        self.relay(to, ServerEvent::CallIce { from, candidate })
            .await;
    }

    /// 结束通话：投递到目标用户的每个连接，
    /// 并回送给发起方除发起连接外的其它设备，让它们同步收起通话界面。
    pub async fn end(&self, from: UserId, to: UserId, from_connection: ConnectionId) {
        self.relay(to, ServerEvent::CallEnd { from }).await;

        let echo_targets: Vec<ConnectionId> = self
            .presence
            .connections_for(from)
            .await
            .into_iter()
            .filter(|&c| c != from_connection)
            .collect();
        if !echo_targets.is_empty() {
            self.event_bus
                .send_to_connections(&echo_targets, ServerEvent::CallEnd { from })
                .await;
        }
    }
}
