//! Vector-store domain types.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::chunker::Fragment;

/// Metadata field carrying the fragment's display text.
pub const METADATA_TEXT_FIELD: &str = "chunk_text";
/// Metadata field carrying the fragment's category facet.
pub const METADATA_CATEGORY_FIELD: &str = "category";

/// Similarity metric an index is configured with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cosine,
    Dotproduct,
    Euclidean,
}

impl Metric {
    pub fn as_str(&self) -> &'static str {
        match self {
            Metric::Cosine => "cosine",
            Metric::Dotproduct => "dotproduct",
            Metric::Euclidean => "euclidean",
        }
    }
}

/// Creation parameters for a vector index.
#[derive(Debug, Clone)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub cloud: String,
    pub region: String,
}

/// Lifecycle state of an index, as tracked by the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexState {
    Absent,
    Creating,
    Ready,
    Deleting,
}

/// What the service reports about an existing index.
#[derive(Debug, Clone)]
pub struct IndexDescription {
    pub name: String,
    pub dimension: usize,
    pub host: String,
    pub ready: bool,
}

/// A vector plus the metadata needed to display its fragment without a
/// second lookup. `id` equals the fragment id, so upserting the same
/// fragment twice overwrites instead of duplicating.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorRecord {
    pub id: String,
    pub values: Vec<f32>,
    pub metadata: Value,
}

impl VectorRecord {
    pub fn from_fragment(fragment: &Fragment, values: Vec<f32>) -> Self {
        Self {
            id: fragment.id.clone(),
            values,
            metadata: json!({
                METADATA_TEXT_FIELD: fragment.text,
                METADATA_CATEGORY_FIELD: fragment.category,
                "source_id": fragment.source_id,
                "sequence_index": fragment.sequence_index,
            }),
        }
    }
}

/// Secondary relevance pass over the query's candidate set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RerankOptions {
    pub model: String,
    /// Results to keep after reranking; clamped to the query's top_k.
    pub top_n: usize,
    /// Metadata field the reranker scores against.
    pub rank_field: String,
}

impl Default for RerankOptions {
    fn default() -> Self {
        Self {
            model: "bge-reranker-v2-m3".to_string(),
            top_n: 5,
            rank_field: METADATA_TEXT_FIELD.to_string(),
        }
    }
}

/// One similarity query against a namespace.
#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub vector: Vec<f32>,
    pub top_k: usize,
    pub include_metadata: bool,
    pub rerank: Option<RerankOptions>,
}

/// A ranked query hit.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryMatch {
    pub id: String,
    pub score: f32,
    #[serde(default)]
    pub metadata: Value,
}

impl QueryMatch {
    pub fn text(&self) -> &str {
        self.metadata[METADATA_TEXT_FIELD].as_str().unwrap_or("")
    }

    pub fn category(&self) -> &str {
        self.metadata[METADATA_CATEGORY_FIELD]
            .as_str()
            .unwrap_or("")
    }
}

/// Vector counts reported by the service.
#[derive(Debug, Clone, Copy, Default)]
pub struct IndexStats {
    pub vector_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_metadata_reconstructs_fragment_display() {
        let fragment = Fragment {
            id: "doc_chunk_2".to_string(),
            text: "some text".to_string(),
            source_id: "doc".to_string(),
            sequence_index: 2,
            category: "general".to_string(),
        };
        let record = VectorRecord::from_fragment(&fragment, vec![0.1, 0.2]);

        assert_eq!(record.id, "doc_chunk_2");
        assert_eq!(record.metadata[METADATA_TEXT_FIELD], "some text");
        assert_eq!(record.metadata[METADATA_CATEGORY_FIELD], "general");

        let hit = QueryMatch {
            id: record.id.clone(),
            score: 1.0,
            metadata: record.metadata.clone(),
        };
        assert_eq!(hit.text(), "some text");
        assert_eq!(hit.category(), "general");
    }
}
