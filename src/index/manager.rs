//! Index lifecycle and data-plane orchestration.

use std::cmp::Ordering;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use super::client::VectorIndexApi;
use super::types::{
    IndexSpec, IndexState, IndexStats, QueryMatch, QueryRequest, RerankOptions, VectorRecord,
};
use crate::core::errors::{RagError, Result};

/// Records per upsert request.
const UPSERT_BATCH: usize = 100;
/// Readiness poll schedule: doubling delay, capped, bounded attempts.
const POLL_INITIAL: Duration = Duration::from_millis(500);
const POLL_CAP: Duration = Duration::from_secs(5);
const POLL_ATTEMPTS: usize = 60;

/// Serializes index provisioning and checks every write against the
/// index dimension before it reaches the wire.
pub struct IndexManager {
    api: Arc<dyn VectorIndexApi>,
    spec: IndexSpec,
    state: RwLock<IndexState>,
    // Only one caller provisions at a time; losers of the race observe
    // Ready and return without a second create.
    ensure_lock: Mutex<()>,
}

impl IndexManager {
    pub fn new(api: Arc<dyn VectorIndexApi>, spec: IndexSpec) -> Self {
        Self {
            api,
            spec,
            state: RwLock::new(IndexState::Absent),
            ensure_lock: Mutex::new(()),
        }
    }

    pub fn name(&self) -> &str {
        &self.spec.name
    }

    pub async fn state(&self) -> IndexState {
        *self.state.read().await
    }

    /// Bring the index to Ready. Safe to call any number of times; an
    /// index that already exists is left untouched.
    pub async fn ensure_index(&self) -> Result<()> {
        if *self.state.read().await == IndexState::Ready {
            return Ok(());
        }

        let _guard = self.ensure_lock.lock().await;
        if *self.state.read().await == IndexState::Ready {
            return Ok(());
        }

        match self.api.describe_index(&self.spec.name).await? {
            Some(description) if description.ready => {
                info!("index '{}' already exists", self.spec.name);
                *self.state.write().await = IndexState::Ready;
                return Ok(());
            }
            Some(_) => {
                debug!("index '{}' exists but is not ready yet", self.spec.name);
            }
            None => {
                info!(
                    "creating index '{}' ({}d, {})",
                    self.spec.name,
                    self.spec.dimension,
                    self.spec.metric.as_str()
                );
                self.api.create_index(&self.spec).await?;
            }
        }

        *self.state.write().await = IndexState::Creating;
        self.wait_until_ready().await?;
        *self.state.write().await = IndexState::Ready;
        info!("index '{}' is ready", self.spec.name);
        Ok(())
    }

    async fn wait_until_ready(&self) -> Result<()> {
        let mut delay = POLL_INITIAL;
        for _ in 0..POLL_ATTEMPTS {
            if let Some(description) = self.api.describe_index(&self.spec.name).await? {
                if description.ready {
                    return Ok(());
                }
            }
            tokio::time::sleep(delay).await;
            delay = (delay * 2).min(POLL_CAP);
        }
        Err(RagError::index(
            "ensure_index",
            &self.spec.name,
            "timed out waiting for the index to become ready",
        ))
    }

    /// Upsert records into a namespace, batching transparently. Records
    /// whose vector length does not match the index dimension are
    /// rejected before anything is written.
    pub async fn upsert(&self, namespace: &str, records: &[VectorRecord]) -> Result<usize> {
        for record in records {
            if record.values.len() != self.spec.dimension {
                return Err(RagError::index(
                    "upsert",
                    &self.spec.name,
                    format!(
                        "record '{}' has dimension {}, index expects {}",
                        record.id,
                        record.values.len(),
                        self.spec.dimension
                    ),
                ));
            }
        }

        let mut written = 0;
        for batch in records.chunks(UPSERT_BATCH) {
            match self.api.upsert(&self.spec.name, namespace, batch).await {
                Ok(count) => written += count,
                Err(err) => {
                    warn!(
                        "upsert into '{}' stopped after {}/{} records",
                        self.spec.name,
                        written,
                        records.len()
                    );
                    return Err(err);
                }
            }
        }
        debug!(
            "upserted {} records into '{}' namespace '{}'",
            written, self.spec.name, namespace
        );
        Ok(written)
    }

    /// Similarity query over a namespace. Matches come back in stable
    /// descending score order; an empty namespace yields an empty list.
    pub async fn query(
        &self,
        namespace: &str,
        vector: Vec<f32>,
        top_k: usize,
        rerank: Option<RerankOptions>,
    ) -> Result<Vec<QueryMatch>> {
        let rerank = rerank.map(|mut options| {
            if options.top_n > top_k {
                debug!(
                    "clamping rerank top_n {} to top_k {}",
                    options.top_n, top_k
                );
                options.top_n = top_k;
            }
            options
        });

        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            rerank,
        };
        let mut matches = self.api.query(&self.spec.name, namespace, &request).await?;
        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
        });
        Ok(matches)
    }

    pub async fn stats(&self, namespace: Option<&str>) -> Result<IndexStats> {
        self.api.stats(&self.spec.name, namespace).await
    }

    pub async fn delete_index(&self) -> Result<()> {
        *self.state.write().await = IndexState::Deleting;
        self.api.delete_index(&self.spec.name).await?;
        *self.state.write().await = IndexState::Absent;
        info!("deleted index '{}'", self.spec.name);
        Ok(())
    }
}

/// Delete every index the service reports; returns how many went away.
pub async fn delete_all_indexes(api: &dyn VectorIndexApi) -> Result<usize> {
    let names = api.list_indexes().await?;
    for name in &names {
        api.delete_index(name).await?;
        info!("deleted index '{}'", name);
    }
    Ok(names.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::fake::InMemoryIndex;
    use crate::index::types::Metric;
    use serde_json::json;

    fn spec(dimension: usize) -> IndexSpec {
        IndexSpec {
            name: "test-index".to_string(),
            dimension,
            metric: Metric::Cosine,
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
        }
    }

    fn record(id: &str, values: Vec<f32>) -> VectorRecord {
        VectorRecord {
            id: id.to_string(),
            values,
            metadata: json!({ "chunk_text": id }),
        }
    }

    #[tokio::test]
    async fn ensure_index_creates_once() {
        let api = Arc::new(InMemoryIndex::new());
        let manager = IndexManager::new(api.clone(), spec(2));

        manager.ensure_index().await.unwrap();
        manager.ensure_index().await.unwrap();

        assert_eq!(api.create_calls(), 1);
        assert_eq!(manager.state().await, IndexState::Ready);
    }

    #[tokio::test]
    async fn ensure_index_skips_create_when_index_exists() {
        let api = Arc::new(InMemoryIndex::new());
        api.create_index(&spec(2)).await.unwrap();

        let manager = IndexManager::new(api.clone(), spec(2));
        manager.ensure_index().await.unwrap();

        // The pre-existing create is the only one.
        assert_eq!(api.create_calls(), 1);
    }

    #[tokio::test]
    async fn upsert_overwrites_by_id() {
        let api = Arc::new(InMemoryIndex::new());
        let manager = IndexManager::new(api.clone(), spec(2));
        manager.ensure_index().await.unwrap();

        manager
            .upsert("default", &[record("a", vec![1.0, 0.0])])
            .await
            .unwrap();
        manager
            .upsert("default", &[record("a", vec![0.0, 1.0])])
            .await
            .unwrap();

        let stats = manager.stats(Some("default")).await.unwrap();
        assert_eq!(stats.vector_count, 1);

        let matches = manager
            .query("default", vec![0.0, 1.0], 5, None)
            .await
            .unwrap();
        assert_eq!(matches.len(), 1);
        assert!(matches[0].score > 0.99);
    }

    #[tokio::test]
    async fn upsert_rejects_wrong_dimension_before_writing() {
        let api = Arc::new(InMemoryIndex::new());
        let manager = IndexManager::new(api.clone(), spec(2));
        manager.ensure_index().await.unwrap();

        let err = manager
            .upsert(
                "default",
                &[record("a", vec![1.0, 0.0]), record("b", vec![1.0])],
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("dimension"));

        let stats = manager.stats(Some("default")).await.unwrap();
        assert_eq!(stats.vector_count, 0);
    }

    #[tokio::test]
    async fn query_returns_descending_scores() {
        let api = Arc::new(InMemoryIndex::new());
        let manager = IndexManager::new(api.clone(), spec(2));
        manager.ensure_index().await.unwrap();

        manager
            .upsert(
                "default",
                &[
                    record("aligned", vec![1.0, 0.0]),
                    record("diagonal", vec![1.0, 1.0]),
                    record("orthogonal", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let matches = manager
            .query("default", vec![1.0, 0.0], 3, None)
            .await
            .unwrap();
        let ids: Vec<&str> = matches.iter().map(|m| m.id.as_str()).collect();
        assert_eq!(ids, ["aligned", "diagonal", "orthogonal"]);
        assert!(matches.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[tokio::test]
    async fn query_on_empty_namespace_is_empty_not_error() {
        let api = Arc::new(InMemoryIndex::new());
        let manager = IndexManager::new(api.clone(), spec(2));
        manager.ensure_index().await.unwrap();

        let matches = manager
            .query("default", vec![1.0, 0.0], 5, None)
            .await
            .unwrap();
        assert!(matches.is_empty());
    }

    #[tokio::test]
    async fn rerank_top_n_is_clamped_to_top_k() {
        let api = Arc::new(InMemoryIndex::new());
        let manager = IndexManager::new(api.clone(), spec(2));
        manager.ensure_index().await.unwrap();

        manager
            .upsert(
                "default",
                &[
                    record("a", vec![1.0, 0.0]),
                    record("b", vec![1.0, 1.0]),
                    record("c", vec![0.0, 1.0]),
                ],
            )
            .await
            .unwrap();

        let rerank = RerankOptions {
            top_n: 10,
            ..RerankOptions::default()
        };
        let matches = manager
            .query("default", vec![1.0, 0.0], 2, Some(rerank))
            .await
            .unwrap();
        assert_eq!(matches.len(), 2);
    }

    #[tokio::test]
    async fn delete_all_removes_every_index() {
        let api = InMemoryIndex::new();
        api.create_index(&spec(2)).await.unwrap();
        api.create_index(&IndexSpec {
            name: "other".to_string(),
            ..spec(2)
        })
        .await
        .unwrap();

        let removed = delete_all_indexes(&api).await.unwrap();
        assert_eq!(removed, 2);
        assert!(api.list_indexes().await.unwrap().is_empty());
    }
}
