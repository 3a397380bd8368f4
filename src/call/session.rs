//! 单次通话的会话状态，仅由轮次协调器持有和修改。

use crate::call::types::ChatMessage;

#[derive(Debug, Clone)]
pub struct CallSession {
    call_id: u64,
    active: bool,
    turn_in_progress: bool,
    history: Vec<ChatMessage>,
}

impl CallSession {
    pub fn start(call_id: u64) -> Self {
        Self {
            call_id,
            active: true,
            turn_in_progress: false,
            history: Vec::new(),
        }
    }

    pub fn call_id(&self) -> u64 {
        self.call_id
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn turn_in_progress(&self) -> bool {
        self.turn_in_progress
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// 是否允许发起新的识别：通话进行中且没有未完成的轮次。
    pub fn accepts_listening(&self) -> bool {
        self.active && !self.turn_in_progress
    }

    pub fn push_user<S: Into<String>>(&mut self, content: S) {
        self.history.push(ChatMessage::user(content));
    }

    pub fn push_assistant<S: Into<String>>(&mut self, content: S) {
        self.history.push(ChatMessage::assistant(content));
    }

    pub fn begin_turn(&mut self) {
        self.turn_in_progress = true;
    }

    pub fn finish_turn(&mut self) {
        self.turn_in_progress = false;
    }

    /// Request payload: the persona system message followed by the history.
    pub fn completion_messages(&self, system_prompt: &str) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(ChatMessage::system(system_prompt));
        messages.extend(self.history.iter().cloned());
        messages
    }

    pub fn close(&mut self) {
        self.active = false;
        self.turn_in_progress = false;
        self.history.clear();
    }
}
