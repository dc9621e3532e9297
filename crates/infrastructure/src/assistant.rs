//! 回复生成协作方的 HTTP 客户端
//!
//! 协议：POST {base_url}/v1/replies，请求体携带会话上下文，
//! 响应体返回一条回复文本。任何网络或协议错误都折叠为
//! [`ReplyGeneratorError::Unavailable`]，兜底策略由上层决定。

use std::time::Duration;

use application::{PromptTurn, ReplyGenerator, ReplyGeneratorError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct ReplyGeneratorSettings {
    pub base_url: String,
    pub timeout: Duration,
}

#[derive(Serialize)]
struct ReplyRequest<'a> {
    turns: &'a [PromptTurn],
}

#[derive(Deserialize)]
struct ReplyResponse {
    reply: String,
}

pub struct HttpReplyGenerator {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReplyGenerator {
    pub fn new(settings: ReplyGeneratorSettings) -> Result<Self, ReplyGeneratorError> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|err| ReplyGeneratorError::Unavailable(err.to_string()))?;
        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl ReplyGenerator for HttpReplyGenerator {
    async fn generate_reply(&self, context: &[PromptTurn]) -> Result<String, ReplyGeneratorError> {
        let url = format!("{}/v1/replies", self.base_url);
        debug!(url = %url, turns = context.len(), "请求回复生成");

        let response = self
            .client
            .post(&url)
            .json(&ReplyRequest { turns: context })
            .send()
            .await
            .map_err(|err| ReplyGeneratorError::Unavailable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(ReplyGeneratorError::Unavailable(format!(
                "unexpected status {}",
                response.status()
            )));
        }

        let body: ReplyResponse = response
            .json()
            .await
            .map_err(|err| ReplyGeneratorError::Unavailable(err.to_string()))?;
        Ok(body.reply)
    }
}
