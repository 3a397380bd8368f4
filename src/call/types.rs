use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::call::recognition::RecognitionState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// 对话历史中的单条消息，与补全代理的 `{role, content}` 格式一致。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant<S: Into<String>>(content: S) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// 合成语音的音频负载（`audio/mpeg`）。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub content_type: String,
    pub data: Bytes,
}

impl AudioClip {
    pub fn mpeg(data: Bytes) -> Self {
        Self {
            content_type: "audio/mpeg".to_string(),
            data,
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// 识别引擎回调，由引擎适配层通过 [`RecognitionEventSender`] 投递。
///
/// [`RecognitionEventSender`]: crate::call::RecognitionEventSender
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecognitionEvent {
    Started,
    Ended,
    Error { code: String },
    Result { transcript: String, is_final: bool },
}

impl RecognitionEvent {
    pub fn error<S: Into<String>>(code: S) -> Self {
        RecognitionEvent::Error { code: code.into() }
    }

    pub fn interim<S: Into<String>>(transcript: S) -> Self {
        RecognitionEvent::Result {
            transcript: transcript.into(),
            is_final: false,
        }
    }

    pub fn final_result<S: Into<String>>(transcript: S) -> Self {
        RecognitionEvent::Result {
            transcript: transcript.into(),
            is_final: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusUpdate {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    User,
    Assistant,
}

/// 渲染层中的一行对话气泡。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranscriptLine {
    pub index: usize,
    pub speaker: Speaker,
    pub text: String,
    pub finalized: bool,
}

/// 通话向外广播的界面更新。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallUpdate {
    Status(StatusUpdate),
    Transcript(TranscriptLine),
    TranscriptCleared,
    Listening(bool),
    Speaking(bool),
}

/// 通话当前状态的只读快照。
#[derive(Debug, Clone)]
pub struct CallSnapshot {
    pub active: bool,
    pub turn_in_progress: bool,
    pub history: Vec<ChatMessage>,
    pub recognition: RecognitionState,
    pub retry_count: u8,
    pub speaking: bool,
    pub transcript: Vec<TranscriptLine>,
}
