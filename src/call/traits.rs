use anyhow::Result;
use async_trait::async_trait;
use thiserror::Error;

use crate::call::types::{AudioClip, ChatMessage};
use crate::proxy::ProxyError;

/// 识别引擎同步抛出的错误，例如 "already started"。
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("recognition engine fault: {0}")]
pub struct EngineFault(pub String);

impl EngineFault {
    pub fn new<S: Into<String>>(message: S) -> Self {
        Self(message.into())
    }
}

/// 平台提供的语音识别能力（continuous=false，开启 interim 结果）。
///
/// Calls return immediately; the engine reports progress through the
/// event sender handed out by the call handle.
pub trait RecognitionEngine: Send + Sync {
    fn start(&self) -> std::result::Result<(), EngineFault>;
    fn stop(&self) -> std::result::Result<(), EngineFault>;
    fn abort(&self);
}

#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> std::result::Result<String, ProxyError>;
}

#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    async fn synthesize(&self, text: &str) -> std::result::Result<AudioClip, ProxyError>;
}

/// 平台提供的音频播放能力。
///
/// `play` resolves once the clip has finished playing. Dropping the returned
/// future must stop playback and release the clip.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, clip: AudioClip) -> Result<()>;
}
