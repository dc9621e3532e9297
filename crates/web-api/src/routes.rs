use axum::{
    extract::{Path, Query, State, WebSocketUpgrade},
    http::{HeaderMap, StatusCode},
    response::Response,
    routing::{delete, get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use application::SendMessageCommand;
use domain::{
    Conversation, ConversationId, DeleteScope, Message, MessageId, Timestamp, UserId,
};

use crate::auth::authenticate;
use crate::ws_connection::WebSocketConnection;
use crate::{error::ApiError, state::AppState};

#[derive(Debug, Deserialize)]
struct CreateConversationPayload {
    peer_id: Uuid,
}

#[derive(Debug, Deserialize)]
struct SendMessagePayload {
    receiver_id: Uuid,
    text: Option<String>,
    media_ref: Option<String>,
    reveal_at: Option<Timestamp>,
    #[serde(default)]
    visible_to: Vec<Uuid>,
}

#[derive(Debug, Deserialize)]
struct DeleteMessageQuery {
    scope: DeleteScope,
}

#[derive(Debug, Serialize)]
struct PresenceResponse {
    user_ids: Vec<UserId>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .nest("/api/v1", api_routes())
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/conversations", post(create_conversation))
        .route("/conversations/{conversation_id}/accept", post(accept_conversation))
        .route("/conversations/{conversation_id}/reject", post(reject_conversation))
        .route(
            "/conversations/{conversation_id}/messages",
            post(send_message).get(list_messages),
        )
        .route("/conversations/{conversation_id}/seen", post(mark_seen))
        .route("/conversations/{conversation_id}/assistant", post(invoke_assistant))
        .route("/messages/{message_id}", delete(delete_message))
        .route("/presence", get(online_users))
        .route("/ws", get(websocket_upgrade))
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn create_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<CreateConversationPayload>,
) -> Result<(StatusCode, Json<Conversation>), ApiError> {
    let me = authenticate(&state, &headers).await?.user_id;
    let peer = UserId::from(payload.peer_id);

    let conversation = state.conversation_service.ensure(me, peer, me).await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

async fn accept_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<Conversation>, ApiError> {
    let me = authenticate(&state, &headers).await?.user_id;
    let conversation = state
        .conversation_service
        .accept(ConversationId::from(conversation_id), me)
        .await?;
    Ok(Json(conversation))
}

async fn reject_conversation(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let me = authenticate(&state, &headers).await?.user_id;
    state
        .conversation_service
        .reject(ConversationId::from(conversation_id), me)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn send_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<(StatusCode, Json<Message>), ApiError> {
    let me = authenticate(&state, &headers).await?.user_id;

    let visible_to: HashSet<UserId> = payload.visible_to.into_iter().map(UserId::from).collect();
    let message = state
        .message_service
        .send(SendMessageCommand {
            conversation_id: ConversationId::from(conversation_id),
            sender_id: me,
            receiver_id: UserId::from(payload.receiver_id),
            text: payload.text,
            media_ref: payload.media_ref,
            reveal_at: payload.reveal_at,
            visible_to,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(message)))
}

async fn list_messages(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let me = authenticate(&state, &headers).await?.user_id;
    let messages = state
        .message_service
        .list(ConversationId::from(conversation_id), me)
        .await?;
    Ok(Json(messages))
}

async fn mark_seen(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    let me = authenticate(&state, &headers).await?.user_id;
    state
        .message_service
        .mark_seen(ConversationId::from(conversation_id), me)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn invoke_assistant(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(conversation_id): Path<Uuid>,
) -> Result<Json<Message>, ApiError> {
    let me = authenticate(&state, &headers).await?.user_id;
    let message = state
        .assistant_service
        .invoke(me, ConversationId::from(conversation_id))
        .await?;
    Ok(Json(message))
}

async fn delete_message(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(message_id): Path<Uuid>,
    Query(query): Query<DeleteMessageQuery>,
) -> Result<StatusCode, ApiError> {
    let me = authenticate(&state, &headers).await?.user_id;
    state
        .message_service
        .delete(MessageId::from(message_id), me, query.scope)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn online_users(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<PresenceResponse>, ApiError> {
    authenticate(&state, &headers).await?;
    let user_ids = state.presence.online_user_ids().await;
    Ok(Json(PresenceResponse { user_ids }))
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    token: String,
}

async fn websocket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Result<Response, ApiError> {
    // 握手阶段就校验凭据，无效凭据直接拒绝升级
    let profile = crate::auth::authenticate_token(&state, &query.token).await?;

    Ok(ws.on_upgrade(move |socket| async move {
        WebSocketConnection::new(socket, state, profile.user_id)
            .run()
            .await;
    }))
}
