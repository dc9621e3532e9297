//! 事件总线端口
//!
//! 所有需要触达客户端连接的通知都经由该抽象投递。
//! 约定：同一连接内事件按发出顺序投递；目标连接不存在时静默跳过。

use async_trait::async_trait;
use domain::{ConnectionId, ServerEvent};
use tokio::sync::mpsc;

#[async_trait]
pub trait EventBus: Send + Sync {
    /// 连接建立时注册其发送端
    async fn register(&self, connection_id: ConnectionId, sender: mpsc::UnboundedSender<ServerEvent>);

    /// 连接断开时注销
    async fn deregister(&self, connection_id: ConnectionId);

    /// 向指定连接集合投递事件，未知连接静默跳过
    async fn send_to_connections(&self, targets: &[ConnectionId], event: ServerEvent);

    /// 向所有已注册连接广播
    async fn broadcast(&self, event: ServerEvent);
}
