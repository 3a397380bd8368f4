//! 文字聊天：与语音通话共用同一个补全代理，但历史独立维护。

use std::sync::Arc;

use tracing::{info, warn};

use crate::call::traits::CompletionService;
use crate::call::types::ChatMessage;
use crate::persona::Persona;

const TARGET: &str = "text_chat";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatReply {
    Answer(String),
    /// 代理不可用时展示的致歉文案，不写入历史。
    Unavailable(String),
}

impl ChatReply {
    pub fn text(&self) -> &str {
        match self {
            ChatReply::Answer(text) | ChatReply::Unavailable(text) => text,
        }
    }
}

pub struct TextChat {
    completion: Arc<dyn CompletionService>,
    persona: Persona,
    history: Vec<ChatMessage>,
}

impl TextChat {
    pub fn new(completion: Arc<dyn CompletionService>, persona: Persona) -> Self {
        Self {
            completion,
            persona,
            history: Vec::new(),
        }
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// Resets the conversation and asks the assistant to introduce itself.
    pub async fn open(&mut self) -> String {
        self.history.clear();
        let seed = [
            ChatMessage::system(self.persona.system_prompt.as_str()),
            ChatMessage::user(self.persona.text_chat_seed.as_str()),
        ];

        let greeting = match self.completion.complete(&seed).await {
            Ok(reply) => reply,
            Err(err) => {
                warn!(target: TARGET, %err, "greeting request failed, using fallback");
                self.persona.text_chat_fallback_greeting.clone()
            }
        };

        self.history.push(ChatMessage::assistant(greeting.as_str()));
        greeting
    }

    /// 发送一条用户消息；空白输入返回 `None` 且不产生请求。
    pub async fn send(&mut self, input: &str) -> Option<ChatReply> {
        let text = input.trim();
        if text.is_empty() {
            return None;
        }

        self.history.push(ChatMessage::user(text));
        let mut messages = Vec::with_capacity(self.history.len() + 1);
        messages.push(ChatMessage::system(self.persona.system_prompt.as_str()));
        messages.extend(self.history.iter().cloned());

        match self.completion.complete(&messages).await {
            Ok(reply) => {
                info!(target: TARGET, chars = reply.chars().count(), "reply received");
                self.history.push(ChatMessage::assistant(reply.as_str()));
                Some(ChatReply::Answer(reply))
            }
            Err(err) => {
                warn!(target: TARGET, %err, "chat request failed");
                Some(ChatReply::Unavailable(self.persona.text_chat_apology.clone()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::call::tests::support::ScriptedCompletion;
    use crate::call::types::Role;
    use crate::proxy::ProxyError;

    fn chat(completion: Arc<ScriptedCompletion>) -> TextChat {
        TextChat::new(completion, Persona::default())
    }

    #[tokio::test]
    async fn open_seeds_greeting_from_completion() {
        let completion = Arc::new(ScriptedCompletion::new());
        completion.push_ok("Hello, I'm Athena!");
        let mut chat = chat(completion.clone());

        assert_eq!(chat.open().await, "Hello, I'm Athena!");
        assert_eq!(chat.history(), &[ChatMessage::assistant("Hello, I'm Athena!")]);

        let requests = completion.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0][0].role, Role::System);
        assert_eq!(requests[0][1].content, Persona::default().text_chat_seed);
    }

    #[tokio::test]
    async fn open_falls_back_when_proxy_fails() {
        let completion = Arc::new(ScriptedCompletion::new());
        completion.push_err(ProxyError::Status {
            endpoint: "/api/chat",
            status: 500,
        });
        let mut chat = chat(completion);

        let greeting = chat.open().await;
        assert_eq!(greeting, Persona::default().text_chat_fallback_greeting);
        assert_eq!(chat.history().len(), 1);
    }

    #[tokio::test]
    async fn send_carries_history_and_ignores_blank_input() {
        let completion = Arc::new(ScriptedCompletion::new());
        completion.push_ok("Hi!");
        completion.push_ok("Friday works.");
        let mut chat = chat(completion.clone());
        chat.open().await;

        assert_eq!(chat.send("   ").await, None);
        let reply = chat.send(" Can I book Friday? ").await.expect("reply");
        assert_eq!(reply, ChatReply::Answer("Friday works.".into()));

        let requests = completion.requests();
        assert_eq!(requests.len(), 2);
        let last = &requests[1];
        assert_eq!(last[0].role, Role::System);
        assert_eq!(last[1], ChatMessage::assistant("Hi!"));
        assert_eq!(last[2], ChatMessage::user("Can I book Friday?"));
        assert_eq!(chat.history().len(), 3);
    }

    #[tokio::test]
    async fn failed_send_shows_apology_without_recording_it() {
        let completion = Arc::new(ScriptedCompletion::new());
        completion.push_ok("Hi!");
        completion.push_err(ProxyError::Transport {
            endpoint: "/api/chat",
            reason: "connection refused".into(),
        });
        let mut chat = chat(completion);
        chat.open().await;

        let reply = chat.send("hello?").await.expect("reply");
        assert_eq!(reply.text(), Persona::default().text_chat_apology);
        assert!(matches!(reply, ChatReply::Unavailable(_)));
        assert_eq!(
            chat.history().last(),
            Some(&ChatMessage::user("hello?"))
        );
    }
}
