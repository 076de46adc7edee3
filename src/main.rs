//! Interactive question-answering session over the configured index.

use std::sync::Arc;

use anyhow::Result;
use tracing::error;

use ragline::cli;
use ragline::core::config::{Credentials, Settings};
use ragline::embedding::Embedder;
use ragline::index::{HttpIndexClient, IndexManager};
use ragline::llm::{ModelProvider, OpenAiCompatProvider};
use ragline::logging;
use ragline::pipeline::{ConversationHistory, RetrievalOptions, RetrievalPipeline};

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let settings = Settings::load()?;
    let credentials = Credentials::from_env()?;

    let provider: Arc<dyn ModelProvider> = Arc::new(OpenAiCompatProvider::new(
        &settings.models,
        credentials.model_api_key,
    ));
    let client = Arc::new(HttpIndexClient::new(
        &settings.index,
        credentials.index_api_key,
    ));
    if !provider.health_check().await? {
        tracing::warn!(
            "model provider '{}' did not answer the health check; requests may fail",
            provider.name()
        );
    }

    let index = Arc::new(IndexManager::new(client, settings.index.spec()));
    index.ensure_index().await?;

    let pipeline = RetrievalPipeline::new(
        Embedder::new(provider.clone(), settings.models.embed_batch_size),
        index,
        provider,
        RetrievalOptions {
            namespace: settings.index.namespace.clone(),
            top_k: settings.retrieval.top_k,
            rerank: settings.retrieval.rerank.clone(),
        },
    );

    println!("Ask questions about the indexed documents. Type 'exit' or 'salir' to quit.");
    let mut history = ConversationHistory::new();
    loop {
        let Some(input) = cli::prompt("\nQuestion: ")? else {
            break;
        };
        if cli::is_exit(&input) {
            break;
        }
        if input.is_empty() {
            continue;
        }

        match pipeline.answer(&input, history.clone()).await {
            Ok((answer, updated)) => {
                history = updated;
                println!("\n{}", answer);
            }
            Err(err) => {
                error!("{}", err);
                println!("Could not answer that question: {}", err);
            }
        }
    }

    println!("Goodbye.");
    Ok(())
}
