//! 通话测试使用的可编程替身。

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use bytes::Bytes;

use crate::call::runtime::RecognitionEventSender;
use crate::call::traits::{AudioOutput, CompletionService, EngineFault, RecognitionEngine, SpeechSynthesizer};
use crate::call::types::{AudioClip, ChatMessage, RecognitionEvent};
use crate::proxy::ProxyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum EngineCall {
    Start,
    Stop,
    Abort,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StartMode {
    /// 接受 start，挂接事件发送端时立即回报 started。
    Acknowledge,
    /// 接受 start 但永远不回报 started。
    Silent,
    /// start 同步抛错。
    Throw,
    /// 接受 start 后立即回报 `not-allowed` 错误并结束，例如麦克风权限被拒。
    Refuse,
}

pub(crate) struct RecordingEngine {
    mode: Mutex<StartMode>,
    calls: Mutex<Vec<EngineCall>>,
    events: Mutex<Option<RecognitionEventSender>>,
}

impl RecordingEngine {
    pub(crate) fn new(mode: StartMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            calls: Mutex::new(Vec::new()),
            events: Mutex::new(None),
        }
    }

    pub(crate) fn attach(&self, sender: RecognitionEventSender) {
        *self.events.lock().expect("events lock") = Some(sender);
    }

    pub(crate) fn set_mode(&self, mode: StartMode) {
        *self.mode.lock().expect("mode lock") = mode;
    }

    pub(crate) fn calls(&self) -> Vec<EngineCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    pub(crate) fn count(&self, call: EngineCall) -> usize {
        self.calls
            .lock()
            .expect("calls lock")
            .iter()
            .filter(|recorded| **recorded == call)
            .count()
    }

    fn record(&self, call: EngineCall) {
        self.calls.lock().expect("calls lock").push(call);
    }

    fn emit(&self, event: RecognitionEvent) {
        if let Some(sender) = self.events.lock().expect("events lock").as_ref() {
            sender.send(event);
        }
    }
}

impl RecognitionEngine for RecordingEngine {
    fn start(&self) -> Result<(), EngineFault> {
        self.record(EngineCall::Start);
        let mode = *self.mode.lock().expect("mode lock");
        match mode {
            StartMode::Acknowledge => {
                self.emit(RecognitionEvent::Started);
                Ok(())
            }
            StartMode::Silent => Ok(()),
            StartMode::Throw => Err(EngineFault::new("recognition has already started")),
            StartMode::Refuse => {
                self.emit(RecognitionEvent::error("not-allowed"));
                self.emit(RecognitionEvent::Ended);
                Ok(())
            }
        }
    }

    fn stop(&self) -> Result<(), EngineFault> {
        self.record(EngineCall::Stop);
        self.emit(RecognitionEvent::Ended);
        Ok(())
    }

    fn abort(&self) {
        self.record(EngineCall::Abort);
        self.emit(RecognitionEvent::Ended);
    }
}

/// 按顺序返回预置结果的补全服务；队列为空时回复 `"Sure."`。
#[derive(Default)]
pub(crate) struct ScriptedCompletion {
    replies: Mutex<VecDeque<Result<String, ProxyError>>>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    delay: Option<Duration>,
}

impl ScriptedCompletion {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub(crate) fn push_ok(&self, reply: &str) {
        self.replies
            .lock()
            .expect("replies lock")
            .push_back(Ok(reply.to_string()));
    }

    pub(crate) fn push_err(&self, err: ProxyError) {
        self.replies.lock().expect("replies lock").push_back(Err(err));
    }

    pub(crate) fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().expect("requests lock").clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, ProxyError> {
        self.requests
            .lock()
            .expect("requests lock")
            .push(messages.to_vec());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.replies.lock().expect("replies lock").pop_front();
        next.unwrap_or_else(|| Ok("Sure.".to_string()))
    }
}

#[derive(Default)]
pub(crate) struct ScriptedSynthesizer {
    fail: bool,
    texts: Mutex<Vec<String>>,
}

impl ScriptedSynthesizer {
    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub(crate) fn texts(&self) -> Vec<String> {
        self.texts.lock().expect("texts lock").clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for ScriptedSynthesizer {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, ProxyError> {
        self.texts.lock().expect("texts lock").push(text.to_string());
        if self.fail {
            return Err(ProxyError::Status {
                endpoint: "/api/voice",
                status: 502,
            });
        }
        Ok(AudioClip::mpeg(Bytes::from_static(b"ID3")))
    }
}

/// 记录并发播放数量的音频输出，每段音频固定播放 `duration`。
pub(crate) struct RecordingOutput {
    duration: Duration,
    fail: bool,
    started: AtomicUsize,
    active: AtomicUsize,
    max_active: AtomicUsize,
    completed: AtomicUsize,
}

struct ActiveGuard<'a>(&'a AtomicUsize);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

impl RecordingOutput {
    pub(crate) fn new(duration: Duration) -> Self {
        Self {
            duration,
            fail: false,
            started: AtomicUsize::new(0),
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            completed: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Duration::ZERO)
        }
    }

    pub(crate) fn started(&self) -> usize {
        self.started.load(Ordering::SeqCst)
    }

    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    pub(crate) fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub(crate) fn completed(&self) -> usize {
        self.completed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioOutput for RecordingOutput {
    async fn play(&self, _clip: AudioClip) -> Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("audio device unavailable");
        }

        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        let _guard = ActiveGuard(&self.active);

        tokio::time::sleep(self.duration).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
