//! 语音通话的客户端状态机：识别、轮次协调、播放与对话渲染。

pub mod config;
mod constants;
pub mod recognition;
pub(crate) mod playback;
pub(crate) mod scheduler;
pub mod session;
pub mod traits;
pub mod transcript;
pub mod types;

mod runtime;

#[cfg(test)]
pub(crate) mod tests;

pub use config::CallConfig;
pub use recognition::{RecognitionError, RecognitionState, RetryBudget};
pub use runtime::{spawn_call, CallComponents, CallHandle, RecognitionEventSender};
pub use session::CallSession;
pub use traits::{AudioOutput, CompletionService, EngineFault, RecognitionEngine, SpeechSynthesizer};
pub use transcript::TranscriptRenderer;
pub use types::{
    AudioClip, CallSnapshot, CallUpdate, ChatMessage, NoticeLevel, RecognitionEvent, Role,
    Speaker, StatusUpdate, TranscriptLine,
};
