use std::io::Read;

use async_trait::async_trait;
use bytes::Bytes;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::call::traits::{CompletionService, SpeechSynthesizer};
use crate::call::types::{AudioClip, ChatMessage};
use crate::proxy::config::ProxyConfig;
use crate::proxy::error::ProxyError;
use crate::proxy::wire::{
    clip_voice_text, parse_chat_reply, parse_health, ChatRequest, HealthStatus, VoiceRequest,
    CHAT_PATH, HEALTH_PATH, VOICE_PATH,
};

const TARGET: &str = "proxy_client";

/// 调用服务端代理（`/api/chat`、`/api/voice`、`/api/health`）的阻塞客户端。
///
/// Requests run on the blocking pool so the async call runtime is never stalled.
#[derive(Clone)]
pub struct HttpProxyClient {
    config: ProxyConfig,
    agent: ureq::Agent,
}

impl std::fmt::Debug for HttpProxyClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpProxyClient")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpProxyClient {
    pub fn new(config: ProxyConfig) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout(config.request_timeout)
            .build();
        Self { config, agent }
    }

    pub fn config(&self) -> &ProxyConfig {
        &self.config
    }

    pub async fn health(&self) -> Result<HealthStatus, ProxyError> {
        let client = self.clone();
        run_blocking(move || client.health_blocking()).await
    }

    fn chat_blocking(&self, messages: &[ChatMessage]) -> Result<String, ProxyError> {
        debug!(target: TARGET, count = messages.len(), "sending chat request");
        let response = self.post_json(CHAT_PATH, &ChatRequest { messages })?;
        let body = response.into_string().map_err(|err| ProxyError::Decode {
            endpoint: CHAT_PATH,
            reason: err.to_string(),
        })?;
        parse_chat_reply(&body)
    }

    fn voice_blocking(&self, text: &str) -> Result<AudioClip, ProxyError> {
        let text = clip_voice_text(text)?;
        let response = self.post_json(VOICE_PATH, &VoiceRequest { text: &text })?;

        let mut data = Vec::new();
        response
            .into_reader()
            .read_to_end(&mut data)
            .map_err(|err| ProxyError::Decode {
                endpoint: VOICE_PATH,
                reason: err.to_string(),
            })?;

        info!(target: TARGET, bytes = data.len(), "voice generated");
        Ok(AudioClip::mpeg(Bytes::from(data)))
    }

    fn health_blocking(&self) -> Result<HealthStatus, ProxyError> {
        let response = self
            .agent
            .get(&self.config.endpoint(HEALTH_PATH))
            .call()
            .map_err(|err| map_request_error(HEALTH_PATH, err))?;
        let body = response.into_string().map_err(|err| ProxyError::Decode {
            endpoint: HEALTH_PATH,
            reason: err.to_string(),
        })?;
        parse_health(&body)
    }

    fn post_json<T: Serialize>(
        &self,
        path: &'static str,
        body: &T,
    ) -> Result<ureq::Response, ProxyError> {
        let payload = serde_json::to_string(body).map_err(|err| ProxyError::Encode {
            endpoint: path,
            reason: err.to_string(),
        })?;

        self.agent
            .post(&self.config.endpoint(path))
            .set("Content-Type", "application/json")
            .send_string(&payload)
            .map_err(|err| map_request_error(path, err))
    }
}

fn map_request_error(endpoint: &'static str, err: ureq::Error) -> ProxyError {
    match err {
        ureq::Error::Status(status, _) => {
            warn!(target: TARGET, endpoint, status, "proxy returned error status");
            ProxyError::Status { endpoint, status }
        }
        ureq::Error::Transport(transport) => {
            warn!(target: TARGET, endpoint, %transport, "proxy request failed");
            ProxyError::Transport {
                endpoint,
                reason: transport.to_string(),
            }
        }
    }
}

async fn run_blocking<T, F>(job: F) -> Result<T, ProxyError>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, ProxyError> + Send + 'static,
{
    tokio::task::spawn_blocking(job)
        .await
        .map_err(|err| ProxyError::Worker(err.to_string()))?
}

#[async_trait]
impl CompletionService for HttpProxyClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProxyError> {
        let client = self.clone();
        let messages = messages.to_vec();
        run_blocking(move || client.chat_blocking(&messages)).await
    }
}

#[async_trait]
impl SpeechSynthesizer for HttpProxyClient {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, ProxyError> {
        let client = self.clone();
        let text = text.to_string();
        run_blocking(move || client.voice_blocking(&text)).await
    }
}
