//! Document ingestion: chunk, embed, upsert.

use std::path::Path;
use std::sync::Arc;

use tracing::info;

use crate::chunker::Chunker;
use crate::core::errors::Result;
use crate::document;
use crate::embedding::Embedder;
use crate::index::{IndexManager, VectorRecord};

/// What one ingestion run produced.
#[derive(Debug, Clone, Copy, Default)]
pub struct IngestReport {
    pub fragments: usize,
    pub upserted: usize,
    /// Token total across all fragments, for cost estimation.
    pub token_estimate: usize,
}

pub struct Ingestor {
    chunker: Chunker,
    embedder: Embedder,
    index: Arc<IndexManager>,
    namespace: String,
}

impl Ingestor {
    pub fn new(
        chunker: Chunker,
        embedder: Embedder,
        index: Arc<IndexManager>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            namespace: namespace.into(),
        }
    }

    /// Ingest a document file. The format gate runs before the file is
    /// read, so an unsupported extension never costs an embedding call.
    pub async fn ingest_file(&self, path: &Path, category: &str) -> Result<IngestReport> {
        let text = document::load_text(path)?;
        let source_id = document::source_id_for(path);
        info!("ingesting '{}' as source '{}'", path.display(), source_id);
        self.ingest_text(&text, &source_id, category).await
    }

    /// Ingest raw text under a caller-chosen source ID. Re-ingesting the
    /// same source overwrites its previous vectors.
    pub async fn ingest_text(
        &self,
        text: &str,
        source_id: &str,
        category: &str,
    ) -> Result<IngestReport> {
        let fragments = self.chunker.fragments(text, source_id, category)?;
        if fragments.is_empty() {
            info!("source '{}' produced no fragments", source_id);
            return Ok(IngestReport::default());
        }

        let mut token_estimate = 0;
        for fragment in &fragments {
            token_estimate += self.chunker.token_count(&fragment.text)?;
        }
        info!(
            "source '{}': {} fragments, ~{} tokens to embed",
            source_id,
            fragments.len(),
            token_estimate
        );

        let texts: Vec<String> = fragments.iter().map(|f| f.text.clone()).collect();
        let vectors = self.embedder.embed_fragments(&texts).await?;

        let records: Vec<VectorRecord> = fragments
            .iter()
            .zip(vectors)
            .map(|(fragment, values)| VectorRecord::from_fragment(fragment, values))
            .collect();
        let upserted = self.index.upsert(&self.namespace, &records).await?;

        Ok(IngestReport {
            fragments: fragments.len(),
            upserted,
            token_estimate,
        })
    }
}
