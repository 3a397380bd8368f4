//! 代理接口的请求/响应格式。

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::call::types::ChatMessage;
use crate::proxy::error::ProxyError;

pub const CHAT_PATH: &str = "/api/chat";
pub const VOICE_PATH: &str = "/api/voice";
pub const HEALTH_PATH: &str = "/api/health";

/// 语音合成代理接受的最大文本长度（字符）。
pub const MAX_VOICE_TEXT_CHARS: usize = 5_000;

#[derive(Debug, Serialize)]
pub struct ChatRequest<'a> {
    pub messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
pub struct ChoiceMessage {
    pub content: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct VoiceRequest<'a> {
    pub text: &'a str,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    pub uptime: f64,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// Extracts `choices[0].message.content` from a chat completion body.
pub fn parse_chat_reply(body: &str) -> Result<String, ProxyError> {
    let response: ChatResponse = serde_json::from_str(body).map_err(|err| ProxyError::Decode {
        endpoint: CHAT_PATH,
        reason: err.to_string(),
    })?;

    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| ProxyError::Decode {
            endpoint: CHAT_PATH,
            reason: "missing choices[0].message.content".to_string(),
        })
}

pub fn parse_health(body: &str) -> Result<HealthStatus, ProxyError> {
    serde_json::from_str(body).map_err(|err| ProxyError::Decode {
        endpoint: HEALTH_PATH,
        reason: err.to_string(),
    })
}

/// Trims the text and cuts it down to the synthesis limit.
pub fn clip_voice_text(text: &str) -> Result<String, ProxyError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(ProxyError::EmptyText);
    }

    let total = trimmed.chars().count();
    if total > MAX_VOICE_TEXT_CHARS {
        warn!(
            target: "proxy_client",
            chars = total,
            limit = MAX_VOICE_TEXT_CHARS,
            "voice text too long, truncating"
        );
        return Ok(trimmed.chars().take(MAX_VOICE_TEXT_CHARS).collect());
    }

    Ok(trimmed.to_string())
}
