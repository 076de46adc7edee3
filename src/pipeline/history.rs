//! Conversation memory with value semantics.
//!
//! A turn is appended by consuming the old history and returning the new
//! one, so a failed request can simply drop the updated value and keep
//! the history it started with.

use crate::llm::ChatMessage;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationHistory {
    turns: Vec<Turn>,
}

impl ConversationHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed question/answer turn, returning the grown history.
    #[must_use]
    pub fn push(mut self, question: impl Into<String>, answer: impl Into<String>) -> Self {
        self.turns.push(Turn {
            question: question.into(),
            answer: answer.into(),
        });
        self
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// Flatten into alternating user/assistant messages, oldest first.
    pub fn as_messages(&self) -> Vec<ChatMessage> {
        let mut messages = Vec::with_capacity(self.turns.len() * 2);
        for turn in &self.turns {
            messages.push(ChatMessage::user(&turn.question));
            messages.push(ChatMessage::assistant(&turn.answer));
        }
        messages
    }
}
