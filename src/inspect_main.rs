//! Index inspection and maintenance.
//!
//! With no flags: an interactive loop that runs each query twice, once
//! plain and once reranked (when reranking is configured), and prints
//! both result lists side by side.
//!
//! Flags: --stats prints vector counts and exits; --delete-index and
//! --delete-all remove indexes and require --yes.

use std::sync::Arc;

use anyhow::{bail, Result};

use ragline::cli;
use ragline::core::config::{Credentials, Settings};
use ragline::embedding::Embedder;
use ragline::index::{delete_all_indexes, HttpIndexClient, IndexManager, RerankOptions};
use ragline::llm::{ModelProvider, OpenAiCompatProvider};
use ragline::logging;

enum Mode {
    Query,
    Stats,
    DeleteIndex,
    DeleteAll,
}

fn parse_mode() -> Result<Mode> {
    let mut mode = Mode::Query;
    let mut confirmed = false;

    for arg in std::env::args().skip(1) {
        match arg.as_str() {
            "--stats" => mode = Mode::Stats,
            "--delete-index" => mode = Mode::DeleteIndex,
            "--delete-all" => mode = Mode::DeleteAll,
            "--yes" => confirmed = true,
            other => bail!("unknown flag: {}", other),
        }
    }

    match mode {
        Mode::DeleteIndex | Mode::DeleteAll if !confirmed => {
            bail!("deletion is irreversible; pass --yes to confirm")
        }
        _ => Ok(mode),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let mode = parse_mode()?;
    let settings = Settings::load()?;
    let credentials = Credentials::from_env()?;

    let client = Arc::new(HttpIndexClient::new(
        &settings.index,
        credentials.index_api_key,
    ));

    match mode {
        Mode::DeleteAll => {
            let removed = delete_all_indexes(client.as_ref()).await?;
            println!("deleted {} index(es)", removed);
            return Ok(());
        }
        Mode::DeleteIndex => {
            let index = IndexManager::new(client, settings.index.spec());
            index.delete_index().await?;
            println!("deleted index '{}'", settings.index.name);
            return Ok(());
        }
        Mode::Stats => {
            let index = Arc::new(IndexManager::new(client, settings.index.spec()));
            let total = index.stats(None).await?;
            let in_namespace = index.stats(Some(&settings.index.namespace)).await?;
            println!(
                "index '{}': {} vectors total, {} in namespace '{}'",
                settings.index.name,
                total.vector_count,
                in_namespace.vector_count,
                settings.index.namespace
            );
            return Ok(());
        }
        Mode::Query => {}
    }

    let provider: Arc<dyn ModelProvider> = Arc::new(OpenAiCompatProvider::new(
        &settings.models,
        credentials.model_api_key,
    ));
    let index = Arc::new(IndexManager::new(client, settings.index.spec()));
    index.ensure_index().await?;
    let embedder = Embedder::new(provider, settings.models.embed_batch_size);

    println!("Inspect retrieval for index '{}'. Type 'exit' or 'salir' to quit.", settings.index.name);
    loop {
        let Some(input) = cli::prompt("\nQuery: ")? else {
            break;
        };
        if cli::is_exit(&input) {
            break;
        }
        if input.is_empty() {
            continue;
        }

        let vector = match embedder.embed_query(&input).await {
            Ok(vector) => vector,
            Err(err) => {
                println!("embedding failed: {}", err);
                continue;
            }
        };

        show_results(
            &index,
            &settings.index.namespace,
            vector,
            settings.retrieval.top_k,
            settings.retrieval.rerank.as_ref(),
        )
        .await;
    }

    Ok(())
}

/// Run one query, plain and (when configured) reranked. Failures are
/// printed and stop this question only; the session keeps going.
async fn show_results(
    index: &IndexManager,
    namespace: &str,
    vector: Vec<f32>,
    top_k: usize,
    rerank: Option<&RerankOptions>,
) {
    match index.query(namespace, vector.clone(), top_k, None).await {
        Ok(matches) => {
            println!("similarity only:");
            cli::print_matches(&matches);
        }
        Err(err) => {
            println!("query failed: {}", err);
            return;
        }
    }

    let Some(rerank) = rerank else {
        return;
    };
    match index
        .query(namespace, vector, top_k, Some(rerank.clone()))
        .await
    {
        Ok(matches) => {
            println!("with rerank ({}):", rerank.model);
            cli::print_matches(&matches);
        }
        Err(err) => println!("reranked query failed: {}", err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ragline::core::errors::{RagError, Result};
    use ragline::index::types::{IndexDescription, QueryRequest};
    use ragline::index::{IndexSpec, IndexStats, Metric, QueryMatch, VectorIndexApi, VectorRecord};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Counts queries and optionally fails them all.
    struct FlakyIndex {
        query_calls: AtomicUsize,
        fail_queries: bool,
    }

    impl FlakyIndex {
        fn new(fail_queries: bool) -> Self {
            Self {
                query_calls: AtomicUsize::new(0),
                fail_queries,
            }
        }
    }

    #[async_trait]
    impl VectorIndexApi for FlakyIndex {
        async fn list_indexes(&self) -> Result<Vec<String>> {
            Ok(vec![])
        }

        async fn has_index(&self, _name: &str) -> Result<bool> {
            Ok(true)
        }

        async fn create_index(&self, _spec: &IndexSpec) -> Result<()> {
            Ok(())
        }

        async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>> {
            Ok(Some(IndexDescription {
                name: name.to_string(),
                dimension: 2,
                host: format!("{}.test.local", name),
                ready: true,
            }))
        }

        async fn delete_index(&self, _name: &str) -> Result<()> {
            Ok(())
        }

        async fn upsert(
            &self,
            _index: &str,
            _namespace: &str,
            records: &[VectorRecord],
        ) -> Result<usize> {
            Ok(records.len())
        }

        async fn query(
            &self,
            index: &str,
            _namespace: &str,
            _request: &QueryRequest,
        ) -> Result<Vec<QueryMatch>> {
            self.query_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_queries {
                Err(RagError::index("query", index, "service unavailable"))
            } else {
                Ok(vec![])
            }
        }

        async fn stats(&self, _index: &str, _namespace: Option<&str>) -> Result<IndexStats> {
            Ok(IndexStats::default())
        }
    }

    fn manager(api: Arc<FlakyIndex>) -> IndexManager {
        IndexManager::new(
            api,
            IndexSpec {
                name: "test-index".to_string(),
                dimension: 2,
                metric: Metric::Cosine,
                cloud: "aws".to_string(),
                region: "us-east-1".to_string(),
            },
        )
    }

    #[tokio::test]
    async fn query_failure_is_contained_to_the_question() {
        let api = Arc::new(FlakyIndex::new(true));
        let index = manager(api.clone());

        // Returning at all means the failure stayed inside this question;
        // the session loop would prompt again.
        show_results(
            &index,
            "default",
            vec![1.0, 0.0],
            5,
            Some(&RerankOptions::default()),
        )
        .await;

        assert_eq!(api.query_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn rerank_pass_runs_only_when_configured() {
        let api = Arc::new(FlakyIndex::new(false));
        let index = manager(api.clone());

        show_results(&index, "default", vec![1.0, 0.0], 5, None).await;
        assert_eq!(api.query_calls.load(Ordering::SeqCst), 1);

        show_results(
            &index,
            "default",
            vec![1.0, 0.0],
            5,
            Some(&RerankOptions::default()),
        )
        .await;
        assert_eq!(api.query_calls.load(Ordering::SeqCst), 3);
    }
}
