//! Question answering over the index: embed the question, retrieve the
//! closest fragments, format them into a context block, and generate an
//! answer that carries the conversation history.

pub mod history;
pub mod ingest;

use std::sync::Arc;

use tracing::debug;

use crate::core::errors::Result;
use crate::embedding::Embedder;
use crate::index::{IndexManager, QueryMatch, RerankOptions};
use crate::llm::{AnswerRequest, ModelProvider};

pub use history::ConversationHistory;
pub use ingest::{IngestReport, Ingestor};

#[derive(Debug, Clone)]
pub struct RetrievalOptions {
    pub namespace: String,
    pub top_k: usize,
    pub rerank: Option<RerankOptions>,
}

pub struct RetrievalPipeline {
    embedder: Embedder,
    index: Arc<IndexManager>,
    provider: Arc<dyn ModelProvider>,
    options: RetrievalOptions,
}

impl RetrievalPipeline {
    pub fn new(
        embedder: Embedder,
        index: Arc<IndexManager>,
        provider: Arc<dyn ModelProvider>,
        options: RetrievalOptions,
    ) -> Self {
        Self {
            embedder,
            index,
            provider,
            options,
        }
    }

    /// Retrieve the fragments closest to the question, best first. An
    /// index with nothing relevant yields an empty list.
    pub async fn retrieve(&self, question: &str) -> Result<Vec<QueryMatch>> {
        let vector = self.embedder.embed_query(question).await?;
        self.index
            .query(
                &self.options.namespace,
                vector,
                self.options.top_k,
                self.options.rerank.clone(),
            )
            .await
    }

    /// Answer a question. The returned history includes this turn; on
    /// error the caller keeps the history it passed in untouched.
    pub async fn answer(
        &self,
        question: &str,
        history: ConversationHistory,
    ) -> Result<(String, ConversationHistory)> {
        let matches = self.retrieve(question).await?;
        let context = build_context(&matches);
        if context.is_empty() {
            debug!("no fragments retrieved; answering without context");
        }

        let answer = self
            .provider
            .generate(AnswerRequest {
                question: question.to_string(),
                context,
                history: history.as_messages(),
            })
            .await?;

        let history = history.push(question, answer.clone());
        Ok((answer, history))
    }
}

/// Format matches into a numbered context block with source citations.
pub fn build_context(matches: &[QueryMatch]) -> String {
    let mut context = String::new();
    for (i, hit) in matches.iter().enumerate() {
        let text = hit.text();
        if text.is_empty() {
            continue;
        }
        let category = hit.category();
        if category.is_empty() {
            context.push_str(&format!(
                "[{}] (source: {}, relevance: {:.2})\n{}\n\n",
                i + 1,
                hit.id,
                hit.score,
                text
            ));
        } else {
            context.push_str(&format!(
                "[{}] (source: {}, category: {}, relevance: {:.2})\n{}\n\n",
                i + 1,
                hit.id,
                category,
                hit.score,
                text
            ));
        }
    }
    context.trim_end().to_string()
}
