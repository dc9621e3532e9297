//! WebSocket 连接管理器
//!
//! 封装单个 WebSocket 连接的所有状态和逻辑，包括：
//! - 服务端事件下发
//! - 在线状态注册与清理
//! - 通话信令上行
//! - 心跳机制

use axum::extract::ws::{Message as WsMessage, WebSocket};
use domain::{CallType, ConnectionId, UserId};
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::state::AppState;

/// 客户端经 WebSocket 上行的消息
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClientMessage {
    CallOffer {
        to: Uuid,
        sdp: String,
        call_type: CallType,
    },
    CallAnswer {
        to: Uuid,
        sdp: String,
    },
    CallIce {
        to: Uuid,
        candidate: serde_json::Value,
    },
    CallEnd {
        to: Uuid,
    },
}

/// WebSocket 写操作命令
///
/// 使用命令模式统一管理所有对 WebSocket sender 的写操作
#[derive(Debug)]
enum WsCommand {
    SendText(String),
    SendPong(Vec<u8>),
}

pub struct WebSocketConnection {
    socket: Option<WebSocket>,
    state: AppState,
    user_id: UserId,
    connection_id: ConnectionId,
}

impl WebSocketConnection {
    pub fn new(socket: WebSocket, state: AppState, user_id: UserId) -> Self {
        Self {
            socket: Some(socket),
            state,
            user_id,
            connection_id: ConnectionId::generate(),
        }
    }

    /// 运行 WebSocket 连接的主循环
    ///
    /// 先在事件总线上注册发送端、再登记在线状态，
    /// 保证连接上线后的第一个事件就能送达。
    pub async fn run(mut self) {
        let socket = self.socket.take().expect("Socket should be available");
        let (mut sender, mut incoming) = socket.split();

        let (event_tx, mut event_rx) = mpsc::unbounded_channel();
        self.state
            .event_bus
            .register(self.connection_id, event_tx)
            .await;
        self.state
            .presence
            .register(self.user_id, self.connection_id)
            .await;

        tracing::info!(user_id = %self.user_id, connection_id = %self.connection_id, "WebSocket 连接已建立");

        // 创建 mpsc channel 来解耦对 sender 的访问
        let (cmd_tx, mut cmd_rx) = mpsc::channel::<WsCommand>(32);

        // 发送任务：统一处理所有对 WebSocket sender 的写操作
        let send_task = {
            let cmd_tx_for_events = cmd_tx.clone();

            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        Some(cmd) = cmd_rx.recv() => {
                            match cmd {
                                WsCommand::SendText(text) => {
                                    if sender.send(WsMessage::Text(text.into())).await.is_err() {
                                        break;
                                    }
                                }
                                WsCommand::SendPong(data) => {
                                    if sender.send(WsMessage::Pong(data.into())).await.is_err() {
                                        break;
                                    }
                                }
                            }
                        }
                        // 服务端事件下发
                        Some(event) = event_rx.recv() => {
                            let payload = match serde_json::to_string(&event) {
                                Ok(json) => json,
                                Err(err) => {
                                    tracing::warn!(error = %err, "failed to serialize websocket payload");
                                    continue;
                                }
                            };
                            if cmd_tx_for_events.send(WsCommand::SendText(payload)).await.is_err() {
                                break;
                            }
                        }
                        else => break,
                    }
                }
                tracing::debug!("WebSocket发送任务结束");
            })
        };

        // 接收任务：处理来自WebSocket客户端的消息
        let recv_task = {
            let state = self.state.clone();
            let user_id = self.user_id;
            let connection_id = self.connection_id;

            tokio::spawn(async move {
                while let Some(Ok(message)) = incoming.next().await {
                    if Self::handle_incoming(&state, user_id, connection_id, message, &cmd_tx)
                        .await
                        .is_err()
                    {
                        break;
                    }
                }
                tracing::debug!("WebSocket接收任务结束");
            })
        };

        // 等待任意一个任务完成（连接断开）
        tokio::select! {
            _ = send_task => {}
            _ = recv_task => {}
        }

        // 连接断开时清理事件总线与在线状态
        self.state.event_bus.deregister(self.connection_id).await;
        self.state.presence.deregister(self.connection_id).await;

        tracing::info!(user_id = %self.user_id, connection_id = %self.connection_id, "WebSocket连接已断开，在线状态已清理");
    }

    /// 处理来自客户端的消息
    ///
    /// 包括：
    /// - 关闭消息处理
    /// - Ping/Pong 心跳机制
    /// - 通话信令转发
    async fn handle_incoming(
        state: &AppState,
        user_id: UserId,
        connection_id: ConnectionId,
        message: WsMessage,
        cmd_tx: &mpsc::Sender<WsCommand>,
    ) -> Result<(), ()> {
        match message {
            WsMessage::Close(_) => {
                tracing::debug!("WebSocket收到关闭消息");
                return Err(());
            }
            WsMessage::Ping(data) => {
                if cmd_tx
                    .send(WsCommand::SendPong(data.to_vec()))
                    .await
                    .is_err()
                {
                    return Err(());
                }
            }
            WsMessage::Pong(_) => {}
            WsMessage::Text(text) => {
                match serde_json::from_str::<ClientMessage>(&text) {
                    Ok(client_message) => {
                        Self::dispatch(state, user_id, connection_id, client_message).await;
                    }
                    Err(err) => {
                        // 无法解析的上行消息只记录，不断开连接
                        tracing::debug!(error = %err, "无法解析的客户端消息");
                    }
                }
            }
            WsMessage::Binary(_) => {
                tracing::debug!("收到二进制客户端消息，忽略");
            }
        }
        Ok(())
    }

    async fn dispatch(
        state: &AppState,
        user_id: UserId,
        connection_id: ConnectionId,
        message: ClientMessage,
    ) {
        match message {
            ClientMessage::CallOffer { to, sdp, call_type } => {
                state
                    .call_service
                    .offer(user_id, UserId::from(to), sdp, call_type)
                    .await;
            }
            ClientMessage::CallAnswer { to, sdp } => {
                state
                    .call_service
                    .answer(user_id, UserId::from(to), sdp)
                    .await;
            }
            ClientMessage::CallIce { to, candidate } => {
                state
                    .call_service
                    .ice_candidate(user_id, UserId::from(to), candidate)
                    .await;
            }
            ClientMessage::CallEnd { to } => {
                state
                    .call_service
                    .end(user_id, UserId::from(to), connection_id)
                    .await;
            }
        }
    }
}
