//! JWT 身份校验器
//!
//! 身份凭据由外部签发；这里只校验签名与有效期并还原用户身份。
//! 校验失败一律映射为认证错误，不触碰任何状态。

use application::{ApplicationError, IdentityVerifier};
use async_trait::async_trait;
use chrono::Utc;
use domain::{UserId, UserProfile};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub expiration_hours: i64,
}

/// token 载荷
#[derive(Debug, Serialize, Deserialize)]
struct Claims {
    /// 用户ID
    sub: String,
    /// 显示名
    name: String,
    /// 头像引用
    #[serde(skip_serializing_if = "Option::is_none")]
    avatar: Option<String>,
    exp: i64,
    iat: i64,
}

pub struct JwtIdentityVerifier {
    settings: JwtSettings,
}

impl JwtIdentityVerifier {
    pub fn new(settings: JwtSettings) -> Self {
        Self { settings }
    }

    /// 为指定身份签发 token（开发与测试用途）
    pub fn issue_token(&self, profile: &UserProfile) -> Result<String, ApplicationError> {
        let now = Utc::now();
        let claims = Claims {
            sub: profile.user_id.to_string(),
            name: profile.display_name.clone(),
            avatar: profile.avatar_ref.clone(),
            exp: (now + chrono::Duration::hours(self.settings.expiration_hours)).timestamp(),
            iat: now.timestamp(),
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.settings.secret.as_bytes()),
        )
        .map_err(|err| ApplicationError::infrastructure(format!("token encode failed: {err}")))
    }
}

#[async_trait]
impl IdentityVerifier for JwtIdentityVerifier {
    async fn verify(&self, credential: &str) -> Result<UserProfile, ApplicationError> {
        let data = decode::<Claims>(
            credential,
            &DecodingKey::from_secret(self.settings.secret.as_bytes()),
            &Validation::default(),
        )
        .map_err(|err| {
            warn!(error = %err, "token 校验失败");
            ApplicationError::Authentication
        })?;

        let user_id = data
            .claims
            .sub
            .parse::<Uuid>()
            .map(UserId::from)
            .map_err(|_| ApplicationError::Authentication)?;

        Ok(UserProfile::new(
            user_id,
            data.claims.name,
            data.claims.avatar,
        ))
    }
}
