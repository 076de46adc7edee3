//! Order-preserving batch embedding.
//!
//! Splits fragment batches to the provider's request-size limit and
//! reassembles vectors by explicit offset pairing, never by call-return
//! order. A whole batch fails or succeeds together.

use std::sync::Arc;

use futures_util::future;

use crate::core::errors::{RagError, Result};
use crate::llm::{EmbeddingInput, ModelProvider};

pub struct Embedder {
    provider: Arc<dyn ModelProvider>,
    batch_size: usize,
}

impl Embedder {
    pub fn new(provider: Arc<dyn ModelProvider>, batch_size: usize) -> Self {
        Self {
            provider,
            batch_size: batch_size.max(1),
        }
    }

    /// Embed fragment texts: one vector per input, same order, same length.
    pub async fn embed_fragments(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let batches = texts
            .chunks(self.batch_size)
            .enumerate()
            .map(|(batch_index, batch)| async move {
                let vectors = self.provider.embed(batch, EmbeddingInput::Passage).await?;
                if vectors.len() != batch.len() {
                    return Err(RagError::model(
                        "embed",
                        format!("expected {} vectors, got {}", batch.len(), vectors.len()),
                    ));
                }
                Ok((batch_index * self.batch_size, vectors))
            });

        let mut out: Vec<Vec<f32>> = vec![Vec::new(); texts.len()];
        for (offset, vectors) in future::try_join_all(batches).await? {
            for (i, vector) in vectors.into_iter().enumerate() {
                out[offset + i] = vector;
            }
        }
        Ok(out)
    }

    /// Embed a single question.
    pub async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        let mut vectors = self
            .provider
            .embed(&[text.to_string()], EmbeddingInput::Query)
            .await?;
        if vectors.len() != 1 {
            return Err(RagError::model(
                "embed",
                format!("expected 1 vector, got {}", vectors.len()),
            ));
        }
        Ok(vectors.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::AnswerRequest;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Deterministic stand-in: maps each text to a vector derived from its
    /// length, and counts calls so batching can be asserted.
    struct LengthProvider {
        calls: AtomicUsize,
    }

    impl LengthProvider {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelProvider for LengthProvider {
        fn name(&self) -> &str {
            "length"
        }

        async fn health_check(&self) -> Result<bool> {
            Ok(true)
        }

        async fn embed(
            &self,
            inputs: &[String],
            _input_type: EmbeddingInput,
        ) -> Result<Vec<Vec<f32>>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(inputs.iter().map(|t| vec![t.len() as f32, 1.0]).collect())
        }

        async fn generate(&self, _request: AnswerRequest) -> Result<String> {
            Ok(String::new())
        }
    }

    #[tokio::test]
    async fn preserves_order_and_length_across_batches() {
        let provider = Arc::new(LengthProvider::new());
        let embedder = Embedder::new(provider.clone(), 2);

        let texts: Vec<String> = ["a", "bb", "ccc", "dddd", "eeeee"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let vectors = embedder.embed_fragments(&texts).await.unwrap();

        assert_eq!(vectors.len(), texts.len());
        for (text, vector) in texts.iter().zip(&vectors) {
            assert_eq!(vector[0], text.len() as f32);
        }
        // 5 inputs with batch size 2 -> 3 provider calls
        assert_eq!(provider.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn empty_input_makes_no_calls() {
        let provider = Arc::new(LengthProvider::new());
        let embedder = Embedder::new(provider.clone(), 8);

        let vectors = embedder.embed_fragments(&[]).await.unwrap();
        assert!(vectors.is_empty());
        assert_eq!(provider.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn query_embedding_is_single_vector() {
        let embedder = Embedder::new(Arc::new(LengthProvider::new()), 8);
        let vector = embedder.embed_query("hello").await.unwrap();
        assert_eq!(vector, vec![5.0, 1.0]);
    }
}
