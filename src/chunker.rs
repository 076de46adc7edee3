//! Text fragmenting.
//!
//! Splits raw document text into bounded-size fragments, either by word
//! count (whitespace split, rejoined with single spaces) or by token count
//! (one tokenizer pass, contiguous windows with optional overlap, decoded
//! back to text). Fragment IDs are derived from the source ID and the
//! fragment's position, so re-ingesting a document overwrites its own
//! vectors instead of duplicating them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tokenizers::Tokenizer;

use crate::core::config::ChunkingSettings;
use crate::core::errors::{RagError, Result};

/// Unit a fragment size is measured in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChunkUnit {
    Words,
    Tokens,
}

/// A bounded-size slice of a source document, the unit of embedding and
/// retrieval. Fragments from one source preserve document order via
/// `sequence_index`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fragment {
    pub id: String,
    pub text: String,
    pub source_id: String,
    pub sequence_index: usize,
    pub category: String,
}

impl Fragment {
    /// Deterministic fragment ID: same source and position always map to
    /// the same ID, making re-upserts idempotent.
    pub fn fragment_id(source_id: &str, sequence_index: usize) -> String {
        format!("{}_chunk_{}", source_id, sequence_index)
    }
}

pub struct Chunker {
    unit: ChunkUnit,
    size: usize,
    overlap: usize,
    tokenizer: Option<Tokenizer>,
}

impl Chunker {
    /// Word-mode chunker: non-overlapping runs of at most `size` words.
    pub fn by_words(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(RagError::Chunking("chunk size must be positive".into()));
        }
        Ok(Self {
            unit: ChunkUnit::Words,
            size,
            overlap: 0,
            tokenizer: None,
        })
    }

    /// Token-mode chunker: contiguous windows of `size` tokens, consecutive
    /// windows sharing `overlap` tokens.
    pub fn by_tokens(tokenizer: Tokenizer, size: usize, overlap: usize) -> Result<Self> {
        if size == 0 {
            return Err(RagError::Chunking("chunk size must be positive".into()));
        }
        if overlap >= size {
            return Err(RagError::Chunking(format!(
                "overlap {} must be smaller than chunk size {}",
                overlap, size
            )));
        }
        Ok(Self {
            unit: ChunkUnit::Tokens,
            size,
            overlap,
            tokenizer: Some(tokenizer),
        })
    }

    pub fn from_settings(settings: &ChunkingSettings) -> Result<Self> {
        match settings.unit {
            ChunkUnit::Words => Self::by_words(settings.size),
            ChunkUnit::Tokens => {
                let path = settings.tokenizer_path.as_deref().ok_or_else(|| {
                    RagError::config("chunking.tokenizer_path is required for token mode")
                })?;
                let tokenizer = load_tokenizer(path)?;
                Self::by_tokens(tokenizer, settings.size, settings.overlap)
            }
        }
    }

    /// Split `text` into fragment texts. Empty input yields an empty
    /// sequence. Deterministic for a given configuration.
    pub fn chunk(&self, text: &str) -> Result<Vec<String>> {
        match self.unit {
            ChunkUnit::Words => Ok(chunk_words(text, self.size)),
            ChunkUnit::Tokens => {
                // Constructor guarantees the tokenizer is present in token mode.
                let tokenizer = self
                    .tokenizer
                    .as_ref()
                    .ok_or_else(|| RagError::Chunking("token mode without a tokenizer".into()))?;
                chunk_tokens(tokenizer, text, self.size, self.overlap)
            }
        }
    }

    /// Chunk `text` and attach provenance, producing upsert-ready fragments.
    pub fn fragments(&self, text: &str, source_id: &str, category: &str) -> Result<Vec<Fragment>> {
        let pieces = self.chunk(text)?;
        Ok(pieces
            .into_iter()
            .enumerate()
            .map(|(sequence_index, text)| Fragment {
                id: Fragment::fragment_id(source_id, sequence_index),
                text,
                source_id: source_id.to_string(),
                sequence_index,
                category: category.to_string(),
            })
            .collect())
    }

    /// Token count of `text`: exact when a tokenizer is loaded, otherwise
    /// the ~4-chars-per-token estimate. Used for pre-embedding cost reports.
    pub fn token_count(&self, text: &str) -> Result<usize> {
        match &self.tokenizer {
            Some(tokenizer) => {
                let encoding = tokenizer
                    .encode(text, false)
                    .map_err(|e| RagError::Chunking(format!("tokenization failed: {}", e)))?;
                Ok(encoding.get_ids().len())
            }
            None => Ok((text.len() + 3) / 4),
        }
    }
}

pub fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    Tokenizer::from_file(path)
        .map_err(|e| RagError::config(format!("cannot load tokenizer {}: {}", path.display(), e)))
}

fn chunk_words(text: &str, size: usize) -> Vec<String> {
    let words: Vec<&str> = text.split_whitespace().collect();
    words.chunks(size).map(|run| run.join(" ")).collect()
}

fn chunk_tokens(tokenizer: &Tokenizer, text: &str, size: usize, overlap: usize) -> Result<Vec<String>> {
    if text.trim().is_empty() {
        return Ok(vec![]);
    }

    let encoding = tokenizer
        .encode(text, false)
        .map_err(|e| RagError::Chunking(format!("tokenization failed: {}", e)))?;
    let ids = encoding.get_ids();

    let mut fragments = Vec::new();
    for (start, end) in token_windows(ids.len(), size, overlap) {
        let piece = tokenizer
            .decode(&ids[start..end], true)
            .map_err(|e| RagError::Chunking(format!("decoding failed: {}", e)))?;
        fragments.push(piece);
    }
    Ok(fragments)
}

/// Window spans over a token sequence of length `len`. Consecutive windows
/// share `overlap` tokens; the final window may be shorter than `size`.
fn token_windows(len: usize, size: usize, overlap: usize) -> Vec<(usize, usize)> {
    let mut spans = Vec::new();
    if len == 0 {
        return spans;
    }
    let step = size - overlap;
    let mut start = 0;
    loop {
        let end = (start + size).min(len);
        spans.push((start, end));
        if end >= len {
            break;
        }
        start += step;
    }
    spans
}
