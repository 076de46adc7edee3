//! In-memory `VectorIndexApi` used by unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use super::client::VectorIndexApi;
use super::types::{
    IndexDescription, IndexSpec, IndexStats, QueryMatch, QueryRequest, VectorRecord,
};
use crate::core::errors::{RagError, Result};

#[derive(Default)]
struct StoredIndex {
    dimension: usize,
    namespaces: HashMap<String, HashMap<String, VectorRecord>>,
}

/// Cosine-scoring fake with enough bookkeeping to assert idempotence.
#[derive(Default)]
pub struct InMemoryIndex {
    indexes: Mutex<HashMap<String, StoredIndex>>,
    create_calls: AtomicUsize,
}

impl InMemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[async_trait]
impl VectorIndexApi for InMemoryIndex {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        let indexes = self.indexes.lock().unwrap();
        Ok(indexes.keys().cloned().collect())
    }

    async fn has_index(&self, name: &str) -> Result<bool> {
        Ok(self.indexes.lock().unwrap().contains_key(name))
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        let mut indexes = self.indexes.lock().unwrap();
        indexes.entry(spec.name.clone()).or_insert_with(|| StoredIndex {
            dimension: spec.dimension,
            namespaces: HashMap::new(),
        });
        Ok(())
    }

    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>> {
        let indexes = self.indexes.lock().unwrap();
        Ok(indexes.get(name).map(|stored| IndexDescription {
            name: name.to_string(),
            dimension: stored.dimension,
            host: format!("{}.test.local", name),
            ready: true,
        }))
    }

    async fn delete_index(&self, name: &str) -> Result<()> {
        let mut indexes = self.indexes.lock().unwrap();
        indexes
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| RagError::index("delete_index", name, "index does not exist"))
    }

    async fn upsert(
        &self,
        index: &str,
        namespace: &str,
        records: &[VectorRecord],
    ) -> Result<usize> {
        let mut indexes = self.indexes.lock().unwrap();
        let stored = indexes
            .get_mut(index)
            .ok_or_else(|| RagError::index("upsert", index, "index does not exist"))?;
        let ns = stored.namespaces.entry(namespace.to_string()).or_default();
        for record in records {
            ns.insert(record.id.clone(), record.clone());
        }
        Ok(records.len())
    }

    async fn query(
        &self,
        index: &str,
        namespace: &str,
        request: &QueryRequest,
    ) -> Result<Vec<QueryMatch>> {
        let indexes = self.indexes.lock().unwrap();
        let stored = indexes
            .get(index)
            .ok_or_else(|| RagError::index("query", index, "index does not exist"))?;

        let mut matches: Vec<QueryMatch> = stored
            .namespaces
            .get(namespace)
            .map(|ns| {
                ns.values()
                    .map(|record| QueryMatch {
                        id: record.id.clone(),
                        score: cosine(&request.vector, &record.values),
                        metadata: record.metadata.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        matches.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        matches.truncate(request.top_k);
        if let Some(rerank) = &request.rerank {
            matches.truncate(rerank.top_n);
        }
        Ok(matches)
    }

    async fn stats(&self, index: &str, namespace: Option<&str>) -> Result<IndexStats> {
        let indexes = self.indexes.lock().unwrap();
        let stored = indexes
            .get(index)
            .ok_or_else(|| RagError::index("stats", index, "index does not exist"))?;

        let vector_count = match namespace {
            Some(ns) => stored.namespaces.get(ns).map(|v| v.len()).unwrap_or(0),
            None => stored.namespaces.values().map(|v| v.len()).sum(),
        };
        Ok(IndexStats { vector_count })
    }
}
