//! crates/docsensei_core/src/chat.rs
//!
//! The append-only free-reading transcript.

use crate::domain::{ChatMessage, Sender};

pub const WELCOME_MESSAGE: &str = "Welcome to your personalized reading experience! I'm here to \
help you understand the content, answer questions, and provide insights as you explore the \
document. Feel free to ask me anything!";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("message text is empty")]
    EmptyMessage,
}

#[derive(Debug, Clone, Default)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
}

impl ChatTranscript {
    pub fn new() -> Self {
        Self::default()
    }

    /// A transcript opened by the assistant's greeting.
    pub fn with_welcome() -> Self {
        let mut transcript = Self::new();
        transcript.push_ai(WELCOME_MESSAGE);
        transcript
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Appends the reader's message; blank text is refused.
    pub fn push_user(&mut self, text: &str) -> Result<&ChatMessage, ChatError> {
        if text.trim().is_empty() {
            return Err(ChatError::EmptyMessage);
        }
        Ok(self.push(ChatMessage::new(text, Sender::User)))
    }

    pub fn push_ai(&mut self, text: impl Into<String>) -> &ChatMessage {
        self.push(ChatMessage::new(text, Sender::Ai))
    }

    fn push(&mut self, message: ChatMessage) -> &ChatMessage {
        self.messages.push(message);
        // Just pushed, so the vector is non-empty.
        &self.messages[self.messages.len() - 1]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_with_welcome() {
        let t = ChatTranscript::with_welcome();
        assert_eq!(t.len(), 1);
        assert_eq!(t.messages()[0].sender, Sender::Ai);
        assert_eq!(t.messages()[0].text, WELCOME_MESSAGE);
    }

    #[test]
    fn keeps_insertion_order() {
        let mut t = ChatTranscript::new();
        t.push_user("what is this page about?").unwrap();
        t.push_ai("It is about gating.");
        t.push_user("thanks").unwrap();
        let senders: Vec<Sender> = t.messages().iter().map(|m| m.sender).collect();
        assert_eq!(senders, vec![Sender::User, Sender::Ai, Sender::User]);
        assert_eq!(t.messages()[2].text, "thanks");
    }

    #[test]
    fn blank_messages_are_refused() {
        let mut t = ChatTranscript::new();
        assert_eq!(t.push_user("   ").unwrap_err(), ChatError::EmptyMessage);
        assert!(t.is_empty());
    }
}
