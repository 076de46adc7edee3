use async_trait::async_trait;

use super::types::{AnswerRequest, EmbeddingInput};
use crate::core::errors::Result;

/// The embedding/answer capability behind the pipeline.
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// provider name (e.g. "openai")
    fn name(&self) -> &str;

    /// check if the provider is reachable
    async fn health_check(&self) -> Result<bool>;

    /// embed one batch of inputs; one vector per input, same order.
    /// The whole batch fails or succeeds together.
    async fn embed(&self, inputs: &[String], input_type: EmbeddingInput)
        -> Result<Vec<Vec<f32>>>;

    /// answer a question given retrieved context and conversation history
    async fn generate(&self, request: AnswerRequest) -> Result<String>;
}
