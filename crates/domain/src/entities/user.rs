//! 用户身份读模型
//!
//! 身份由外部校验服务签发，本核心只读。

use serde::{Deserialize, Serialize};

use crate::value_objects::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub user_id: UserId,
    pub display_name: String,
    pub avatar_ref: Option<String>,
}

impl UserProfile {
    pub fn new(user_id: UserId, display_name: impl Into<String>, avatar_ref: Option<String>) -> Self {
        Self {
            user_id,
            display_name: display_name.into(),
            avatar_ref,
        }
    }
}
