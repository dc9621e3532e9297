//! 身份校验端口
//!
//! 身份由外部协作方签发与校验，核心只消费校验结果。

use async_trait::async_trait;
use domain::UserProfile;

use crate::error::ApplicationError;

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// 校验凭据并返回稳定的用户身份。
    /// 失败返回 `ApplicationError::Authentication`，不触碰任何状态。
    async fn verify(&self, credential: &str) -> Result<UserProfile, ApplicationError>;
}
