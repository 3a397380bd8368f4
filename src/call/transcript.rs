//! 对话气泡的合并逻辑：同一时刻最多一行未定稿的用户发言。

use crate::call::types::{Speaker, TranscriptLine};

#[derive(Debug, Default)]
pub struct TranscriptRenderer {
    lines: Vec<TranscriptLine>,
}

impl TranscriptRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[TranscriptLine] {
        &self.lines
    }

    /// Overwrites the live user line, or opens a new one after a finalized line.
    pub fn show_live(&mut self, text: &str) -> TranscriptLine {
        match self.lines.last_mut() {
            Some(line) if line.speaker == Speaker::User && !line.finalized => {
                line.text = text.to_string();
                line.clone()
            }
            _ => self.push(Speaker::User, text, false),
        }
    }

    pub fn finalize_live(&mut self) -> Option<TranscriptLine> {
        match self.lines.last_mut() {
            Some(line) if line.speaker == Speaker::User && !line.finalized => {
                line.finalized = true;
                Some(line.clone())
            }
            _ => None,
        }
    }

    pub fn push_assistant(&mut self, text: &str) -> TranscriptLine {
        self.push(Speaker::Assistant, text, true)
    }

    pub fn clear(&mut self) {
        self.lines.clear();
    }

    fn push(&mut self, speaker: Speaker, text: &str, finalized: bool) -> TranscriptLine {
        let line = TranscriptLine {
            index: self.lines.len(),
            speaker,
            text: text.to_string(),
            finalized,
        };
        self.lines.push(line.clone());
        line
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interim_results_overwrite_live_line() {
        let mut renderer = TranscriptRenderer::new();
        renderer.show_live("I'd");
        renderer.show_live("I'd like");
        let line = renderer.show_live("I'd like an appointment");

        assert_eq!(renderer.lines().len(), 1);
        assert_eq!(line.index, 0);
        assert_eq!(line.text, "I'd like an appointment");
        assert!(!line.finalized);
    }

    #[test]
    fn finalized_line_starts_a_new_one() {
        let mut renderer = TranscriptRenderer::new();
        renderer.show_live("hello");
        let finalized = renderer.finalize_live().expect("live line");
        assert!(finalized.finalized);
        assert!(renderer.finalize_live().is_none());

        let next = renderer.show_live("again");
        assert_eq!(next.index, 1);
        assert_eq!(renderer.lines()[0].text, "hello");
    }

    #[test]
    fn assistant_line_closes_live_line_for_display() {
        let mut renderer = TranscriptRenderer::new();
        renderer.push_assistant("Hi! How can I help?");
        let user = renderer.show_live("book");
        assert_eq!(user.index, 1);
        assert_eq!(user.speaker, Speaker::User);

        renderer.push_assistant("Sure.");
        let user = renderer.show_live("tomorrow");
        assert_eq!(user.index, 3);
        assert_eq!(renderer.lines().len(), 4);
    }

    #[test]
    fn clear_drops_all_lines() {
        let mut renderer = TranscriptRenderer::new();
        renderer.push_assistant("Hi");
        renderer.show_live("hey");
        renderer.clear();
        assert!(renderer.lines().is_empty());
        assert_eq!(renderer.show_live("new").index, 0);
    }
}
