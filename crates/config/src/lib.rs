//! 统一配置中心
//!
//! 提供应用的全局配置管理，包括：
//! - JWT认证
//! - 助手回复服务
//! - 定时揭示调度
//! - 服务设置

use serde::{Deserialize, Serialize};
use std::env;

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// JWT认证配置
    pub jwt: JwtConfig,
    /// 助手回复服务配置
    pub assistant: AssistantConfig,
    /// 定时揭示调度配置
    pub reveal: RevealConfig,
    /// 服务配置
    pub server: ServerConfig,
}

/// JWT配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub expiration_hours: i64,
}

/// 助手回复服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// 回复生成服务的基地址
    pub base_url: String,
    /// 单次请求超时（秒）
    pub timeout_secs: u64,
    /// 同一用户两次调用之间的最小间隔（秒）
    pub cooldown_secs: u64,
    /// 发给回复服务的最近会话轮数上限
    pub context_window: usize,
    /// 回复的最大字符数
    pub max_reply_chars: usize,
}

/// 定时揭示调度配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevealConfig {
    /// 后台扫描周期（毫秒）
    pub period_ms: u64,
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl AppConfig {
    /// 从环境变量加载配置
    /// 对于关键安全配置（JWT_SECRET），如果环境变量不存在将会 panic
    /// 这确保了生产环境中不会使用不安全的默认值
    pub fn from_env() -> Self {
        Self {
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET")
                    .expect("JWT_SECRET environment variable is required for production safety"),
                expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(24),
            },
            assistant: Self::assistant_from_env(),
            reveal: Self::reveal_from_env(),
            server: Self::server_from_env(),
        }
    }

    /// 从环境变量加载配置，开发环境版本
    /// 提供不安全的默认值，仅用于测试和开发
    pub fn from_env_with_defaults() -> Self {
        Self {
            jwt: JwtConfig {
                secret: env::var("JWT_SECRET").unwrap_or_else(|_| {
                    "dev-secret-key-not-for-production-use-minimum-32-chars".to_string()
                }),
                expiration_hours: env::var("JWT_EXPIRATION_HOURS")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(24),
            },
            assistant: Self::assistant_from_env(),
            reveal: Self::reveal_from_env(),
            server: Self::server_from_env(),
        }
    }

    fn assistant_from_env() -> AssistantConfig {
        AssistantConfig {
            base_url: env::var("ASSISTANT_BASE_URL")
                .unwrap_or_else(|_| "http://127.0.0.1:8090".to_string()),
            timeout_secs: env::var("ASSISTANT_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            cooldown_secs: env::var("ASSISTANT_COOLDOWN_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(30),
            context_window: env::var("ASSISTANT_CONTEXT_WINDOW")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(10),
            max_reply_chars: env::var("ASSISTANT_MAX_REPLY_CHARS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        }
    }

    fn reveal_from_env() -> RevealConfig {
        RevealConfig {
            period_ms: env::var("REVEAL_PERIOD_MS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1000),
        }
    }

    fn server_from_env() -> ServerConfig {
        ServerConfig {
            host: env::var("SERVER_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: env::var("SERVER_PORT")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(8080),
        }
    }

    /// 验证配置有效性
    /// 增强的验证逻辑，特别关注生产环境安全
    pub fn validate(&self) -> Result<(), ConfigError> {
        // 验证JWT密钥长度和安全性（至少256位/32字节）
        if self.jwt.secret.len() < 32 {
            return Err(ConfigError::InvalidJwtSecret(
                "JWT secret must be at least 32 characters long".to_string(),
            ));
        }

        // 检查JWT密钥是否为明显的开发密钥
        if self.jwt.secret.contains("dev-secret")
            || self.jwt.secret.contains("not-for-production")
            || self.jwt.secret.contains("please-change")
        {
            return Err(ConfigError::InvalidJwtSecret(
                "Cannot use development JWT secret in production".to_string(),
            ));
        }

        if self.assistant.base_url.is_empty() {
            return Err(ConfigError::InvalidAssistantConfig(
                "Assistant base URL cannot be empty".to_string(),
            ));
        }
        if self.assistant.context_window == 0 {
            return Err(ConfigError::InvalidAssistantConfig(
                "Context window must be greater than 0".to_string(),
            ));
        }
        if self.assistant.max_reply_chars == 0 {
            return Err(ConfigError::InvalidAssistantConfig(
                "Max reply chars must be greater than 0".to_string(),
            ));
        }

        if self.reveal.period_ms == 0 {
            return Err(ConfigError::InvalidRevealConfig(
                "Reveal period must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// 配置错误类型
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid JWT secret: {0}")]
    InvalidJwtSecret(String),
    #[error("Invalid server port: {0}")]
    InvalidServerPort(String),
    #[error("Invalid assistant configuration: {0}")]
    InvalidAssistantConfig(String),
    #[error("Invalid reveal configuration: {0}")]
    InvalidRevealConfig(String),
    #[error("Environment variable error: {0}")]
    EnvVarError(#[from] std::env::VarError),
}

impl Default for AppConfig {
    /// 默认配置使用开发环境版本
    /// 注意：生产环境应该明确调用 from_env() 而不是依赖默认值
    fn default() -> Self {
        Self::from_env_with_defaults()
    }
}
