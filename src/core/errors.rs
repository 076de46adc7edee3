use thiserror::Error;

#[derive(Debug, Error)]
pub enum RagError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    /// Embedding or chat-completion failures; both travel through the
    /// same model service and credential.
    #[error("model service error during {operation}: {message}")]
    Model { operation: String, message: String },

    #[error("index service error during {operation} on '{index}': {message}")]
    Index {
        operation: String,
        index: String,
        message: String,
    },

    #[error("chunking error: {0}")]
    Chunking(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RagError {
    pub fn config<M: std::fmt::Display>(message: M) -> Self {
        RagError::Config(message.to_string())
    }

    pub fn model<M: std::fmt::Display>(operation: &str, message: M) -> Self {
        RagError::Model {
            operation: operation.to_string(),
            message: message.to_string(),
        }
    }

    pub fn index<M: std::fmt::Display>(operation: &str, index: &str, message: M) -> Self {
        RagError::Index {
            operation: operation.to_string(),
            index: index.to_string(),
            message: message.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RagError>;
