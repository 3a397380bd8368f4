//! 前台人设：系统提示词、问候语与状态文案。

use serde::{Deserialize, Serialize};

const DEFAULT_NAME: &str = "Athena";
const DEFAULT_SYSTEM_PROMPT: &str = "You are Athena, a friendly front desk manager. Keep responses SHORT (1-2 sentences max). Help customers schedule appointments.";
const DEFAULT_GREETING: &str = "Hi! I'm Athena, your AI assistant. This is a demo. Please pretend you're calling to schedule an appointment for your dog. How can I help?";
const DEFAULT_TEXT_CHAT_SEED: &str = "Say hello and introduce yourself as Athena, the AI front desk manager for D's Doggy Daycare. Ask me to pretend I'm calling to schedule an appointment.";
const DEFAULT_TEXT_CHAT_FALLBACK: &str =
    "Hi! I'm Athena, your AI assistant. How can I help you schedule an appointment for your dog?";
const DEFAULT_TEXT_CHAT_APOLOGY: &str = "Sorry, I'm having trouble connecting right now.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    pub name: String,
    /// 每次补全请求前置的 system 消息。
    pub system_prompt: String,
    /// 通话接通后播放的固定问候语。
    pub greeting: String,
    /// 文字聊天打开时用于生成问候语的种子消息。
    pub text_chat_seed: String,
    pub text_chat_fallback_greeting: String,
    pub text_chat_apology: String,
}

impl Default for Persona {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            greeting: DEFAULT_GREETING.to_string(),
            text_chat_seed: DEFAULT_TEXT_CHAT_SEED.to_string(),
            text_chat_fallback_greeting: DEFAULT_TEXT_CHAT_FALLBACK.to_string(),
            text_chat_apology: DEFAULT_TEXT_CHAT_APOLOGY.to_string(),
        }
    }
}

impl Persona {
    pub fn thinking_status(&self) -> String {
        format!("{} is thinking...", self.name)
    }

    pub fn speaking_status(&self) -> String {
        format!("{} is speaking...", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_lines_use_persona_name() {
        let mut persona = Persona::default();
        assert_eq!(persona.thinking_status(), "Athena is thinking...");
        persona.name = "Iris".into();
        assert_eq!(persona.speaking_status(), "Iris is speaking...");
    }
}
