use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// What the embedding is for; some embedding APIs score passages and
/// queries asymmetrically.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmbeddingInput {
    Passage,
    Query,
}

impl EmbeddingInput {
    pub fn as_str(&self) -> &'static str {
        match self {
            EmbeddingInput::Passage => "passage",
            EmbeddingInput::Query => "query",
        }
    }
}

/// One answer-generation call: the question plus retrieved context and
/// prior conversation turns.
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    pub question: String,
    pub context: String,
    pub history: Vec<ChatMessage>,
}
