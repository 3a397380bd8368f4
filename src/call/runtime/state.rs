/// 用户当前发言的缓冲：interim 文本持续覆盖，final 文本决定提交内容。
#[derive(Debug, Default)]
pub(crate) struct PendingUtterance {
    live: String,
    last_final: Option<String>,
}

impl PendingUtterance {
    pub(crate) fn observe(&mut self, transcript: &str, is_final: bool) {
        self.live = transcript.to_string();
        if is_final {
            self.last_final = Some(transcript.to_string());
        }
    }

    pub(crate) fn live(&self) -> &str {
        &self.live
    }

    /// Takes the latest final transcript, trimmed, and resets the buffer.
    pub(crate) fn take_final(&mut self) -> String {
        self.live.clear();
        self.last_final
            .take()
            .map(|text| text.trim().to_string())
            .unwrap_or_default()
    }

    pub(crate) fn clear(&mut self) {
        self.live.clear();
        self.last_final = None;
    }
}
