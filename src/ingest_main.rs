//! Batch document ingestion.
//!
//! Usage: ragline-ingest [--category NAME] [--source-id ID] FILE...
//!
//! Every file's format is checked before anything is embedded, so a bad
//! extension in the batch aborts the run with no partial index write.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Result};

use ragline::chunker::Chunker;
use ragline::core::config::{Credentials, Settings};
use ragline::document;
use ragline::embedding::Embedder;
use ragline::index::{HttpIndexClient, IndexManager};
use ragline::llm::{ModelProvider, OpenAiCompatProvider};
use ragline::logging;
use ragline::pipeline::Ingestor;

struct Args {
    files: Vec<PathBuf>,
    category: String,
    source_id: Option<String>,
}

fn parse_args() -> Result<Args> {
    let mut files = Vec::new();
    let mut category = "general".to_string();
    let mut source_id = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--category" => {
                category = args
                    .next()
                    .ok_or_else(|| anyhow::anyhow!("--category needs a value"))?;
            }
            "--source-id" => {
                source_id = Some(
                    args.next()
                        .ok_or_else(|| anyhow::anyhow!("--source-id needs a value"))?,
                );
            }
            other if other.starts_with("--") => bail!("unknown flag: {}", other),
            path => files.push(PathBuf::from(path)),
        }
    }

    if files.is_empty() {
        bail!("usage: ragline-ingest [--category NAME] [--source-id ID] FILE...");
    }
    if source_id.is_some() && files.len() > 1 {
        bail!("--source-id only makes sense with a single file");
    }
    Ok(Args {
        files,
        category,
        source_id,
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let args = parse_args()?;
    for path in &args.files {
        document::check_format(path)?;
    }

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
    let index = Arc::new(IndexManager::new(client, settings.index.spec()));
    index.ensure_index().await?;

    let ingestor = Ingestor::new(
        Chunker::from_settings(&settings.chunking)?,
        Embedder::new(provider, settings.models.embed_batch_size),
        index.clone(),
        settings.index.namespace.clone(),
    );

    let mut total_fragments = 0;
    let mut total_upserted = 0;
    let mut total_tokens = 0;
    for path in &args.files {
        let report = match &args.source_id {
            Some(source_id) => {
                let text = document::load_text(path)?;
                ingestor
                    .ingest_text(&text, source_id, &args.category)
                    .await?
            }
            None => ingestor.ingest_file(path, &args.category).await?,
        };
        println!(
            "{}: {} fragments, {} upserted, ~{} tokens",
            path.display(),
            report.fragments,
            report.upserted,
            report.token_estimate
        );
        total_fragments += report.fragments;
        total_upserted += report.upserted;
        total_tokens += report.token_estimate;
    }

    let stats = index.stats(Some(&settings.index.namespace)).await?;
    println!(
        "done: {} fragments ({} upserted, ~{} tokens); namespace '{}' now holds {} vectors",
        total_fragments, total_upserted, total_tokens, settings.index.namespace, stats.vector_count
    );
    Ok(())
}
