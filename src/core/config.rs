//! Settings and credentials.
//!
//! Non-secret tunables live in `config.yml` (path overridable via
//! `RAGLINE_CONFIG`); every value has a default so the file is optional.
//! API keys are never read from the config file — they come from the
//! process environment and are validated eagerly, before any network call.

use std::env;
use std::fs;
use std::path::PathBuf;

use serde::Deserialize;

use crate::chunker::ChunkUnit;
use crate::core::errors::{RagError, Result};
use crate::index::types::{IndexSpec, Metric, RerankOptions};

pub const MODEL_API_KEY_VAR: &str = "RAGLINE_MODEL_API_KEY";
pub const INDEX_API_KEY_VAR: &str = "RAGLINE_INDEX_API_KEY";
pub const CONFIG_PATH_VAR: &str = "RAGLINE_CONFIG";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub models: ModelSettings,
    pub index: IndexSettings,
    pub chunking: ChunkingSettings,
    pub retrieval: RetrievalSettings,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ModelSettings {
    /// Base URL of an OpenAI-compatible API (`/embeddings`, `/chat/completions`).
    pub base_url: String,
    pub embedding_model: String,
    pub chat_model: String,
    /// Send the `input_type` field (`passage`/`query`) on embedding requests.
    /// Off by default: strict OpenAI servers reject unknown fields.
    pub send_input_type: bool,
    /// Maximum inputs per embedding request.
    pub embed_batch_size: usize,
    pub request_timeout_secs: u64,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            embedding_model: "text-embedding-ada-002".to_string(),
            chat_model: "gpt-3.5-turbo".to_string(),
            send_input_type: false,
            embed_batch_size: 64,
            request_timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IndexSettings {
    pub control_url: String,
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub cloud: String,
    pub region: String,
    pub namespace: String,
}

impl Default for IndexSettings {
    fn default() -> Self {
        Self {
            control_url: "https://api.pinecone.io".to_string(),
            name: "pdf-vector-store".to_string(),
            dimension: 1536,
            metric: Metric::Cosine,
            cloud: "aws".to_string(),
            region: "us-east-1".to_string(),
            namespace: "default".to_string(),
        }
    }
}

impl IndexSettings {
    pub fn spec(&self) -> IndexSpec {
        IndexSpec {
            name: self.name.clone(),
            dimension: self.dimension,
            metric: self.metric,
            cloud: self.cloud.clone(),
            region: self.region.clone(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ChunkingSettings {
    pub unit: ChunkUnit,
    /// Fragment size in `unit`s.
    pub size: usize,
    /// Token overlap between consecutive fragments; ignored in word mode.
    pub overlap: usize,
    /// Path to a `tokenizer.json`; required for token mode.
    pub tokenizer_path: Option<PathBuf>,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            unit: ChunkUnit::Words,
            size: 200,
            overlap: 20,
            tokenizer_path: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrievalSettings {
    pub top_k: usize,
    pub rerank: Option<RerankOptions>,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 5,
            rerank: None,
        }
    }
}

impl Settings {
    /// Load settings from `config.yml`, falling back to defaults when the
    /// file does not exist. A file named via `RAGLINE_CONFIG` must exist.
    pub fn load() -> Result<Self> {
        match env::var(CONFIG_PATH_VAR) {
            Ok(path) => Self::from_path(&PathBuf::from(path)),
            Err(_) => {
                let default_path = PathBuf::from("config.yml");
                if default_path.exists() {
                    Self::from_path(&default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn from_path(path: &PathBuf) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|e| {
            RagError::config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let settings: Settings = serde_yaml::from_str(&raw)
            .map_err(|e| RagError::config(format!("invalid config {}: {}", path.display(), e)))?;
        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.chunking.size == 0 {
            return Err(RagError::config("chunking.size must be positive"));
        }
        if self.chunking.unit == ChunkUnit::Tokens && self.chunking.overlap >= self.chunking.size {
            return Err(RagError::config(
                "chunking.overlap must be smaller than chunking.size",
            ));
        }
        if self.index.dimension == 0 {
            return Err(RagError::config("index.dimension must be positive"));
        }
        if self.retrieval.top_k == 0 {
            return Err(RagError::config("retrieval.top_k must be positive"));
        }
        if let Some(rerank) = &self.retrieval.rerank {
            if rerank.top_n > self.retrieval.top_k {
                return Err(RagError::config(
                    "retrieval.rerank.top_n cannot exceed retrieval.top_k",
                ));
            }
        }
        Ok(())
    }
}

/// API keys for the two external services.
#[derive(Clone)]
pub struct Credentials {
    pub model_api_key: String,
    pub index_api_key: String,
}

impl Credentials {
    /// Read both keys from the environment. Missing or blank keys are a
    /// startup-fatal configuration error, reported by variable name.
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            model_api_key: require_env(MODEL_API_KEY_VAR)?,
            index_api_key: require_env(INDEX_API_KEY_VAR)?,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("model_api_key", &"****")
            .field("index_api_key", &"****")
            .finish()
    }
}

fn require_env(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .ok_or_else(|| RagError::config(format!("{} environment variable not set", name)))
}
