//! 请求身份提取
//!
//! 从 Authorization 头或 WebSocket 查询参数中取出凭据，
//! 交给应用层的身份校验器还原用户身份。

use axum::http::HeaderMap;
use domain::UserProfile;

use crate::error::ApiError;
use crate::state::AppState;

/// 从 headers 中提取并校验 Bearer 凭据
pub async fn authenticate(state: &AppState, headers: &HeaderMap) -> Result<UserProfile, ApiError> {
    let auth_header = headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| ApiError::unauthorized("Missing authorization header"))?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or_else(|| ApiError::unauthorized("Invalid authorization header format"))?;

    authenticate_token(state, token).await
}

/// 校验裸凭据（WebSocket 握手走查询参数）
pub async fn authenticate_token(state: &AppState, token: &str) -> Result<UserProfile, ApiError> {
    state
        .identity
        .verify(token)
        .await
        .map_err(ApiError::from)
}
