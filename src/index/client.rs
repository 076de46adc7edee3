//! Vector-store wire client.
//!
//! `VectorIndexApi` is the abstract wire contract; `HttpIndexClient` talks
//! to a Pinecone-style REST service: a control plane for index lifecycle
//! and a per-index data-plane host for upsert/query.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use tokio::sync::RwLock;

use super::types::{
    IndexDescription, IndexSpec, IndexStats, QueryMatch, QueryRequest, VectorRecord,
};
use crate::core::config::IndexSettings;
use crate::core::errors::{RagError, Result};

#[async_trait]
pub trait VectorIndexApi: Send + Sync {
    async fn list_indexes(&self) -> Result<Vec<String>>;
    async fn has_index(&self, name: &str) -> Result<bool>;
    /// Create an index. Creating a name that already exists is a no-op,
    /// which makes concurrent check-then-act callers safe.
    async fn create_index(&self, spec: &IndexSpec) -> Result<()>;
    /// `None` when the index does not exist.
    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>>;
    async fn delete_index(&self, name: &str) -> Result<()>;
    /// Write records into a namespace; returns how many were written.
    async fn upsert(&self, index: &str, namespace: &str, records: &[VectorRecord])
        -> Result<usize>;
    async fn query(
        &self,
        index: &str,
        namespace: &str,
        request: &QueryRequest,
    ) -> Result<Vec<QueryMatch>>;
    async fn stats(&self, index: &str, namespace: Option<&str>) -> Result<IndexStats>;
}

pub struct HttpIndexClient {
    client: Client,
    control_url: String,
    api_key: String,
    /// Data-plane host per index, filled in lazily from describe calls.
    hosts: RwLock<HashMap<String, String>>,
}

impl HttpIndexClient {
    pub fn new(settings: &IndexSettings, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            control_url: settings.control_url.trim_end_matches('/').to_string(),
            api_key,
            hosts: RwLock::new(HashMap::new()),
        }
    }

    async fn host_for(&self, name: &str) -> Result<String> {
        if let Some(host) = self.hosts.read().await.get(name) {
            return Ok(host.clone());
        }

        let description = self.describe_index(name).await?.ok_or_else(|| {
            RagError::index("resolve_host", name, "index does not exist")
        })?;

        let host = if description.host.starts_with("http") {
            description.host
        } else {
            format!("https://{}", description.host)
        };
        self.hosts
            .write()
            .await
            .insert(name.to_string(), host.clone());
        Ok(host)
    }

    async fn fail_on_status(
        res: reqwest::Response,
        operation: &str,
        index: &str,
    ) -> Result<reqwest::Response> {
        if res.status().is_success() {
            return Ok(res);
        }
        let status = res.status();
        let text = res.text().await.unwrap_or_default();
        Err(RagError::index(
            operation,
            index,
            format!("{}: {}", status, text),
        ))
    }
}

#[derive(Deserialize)]
struct ListIndexesResponse {
    #[serde(default)]
    indexes: Vec<IndexEntry>,
}

#[derive(Deserialize)]
struct IndexEntry {
    name: String,
}

#[derive(Deserialize)]
struct DescribeResponse {
    name: String,
    dimension: usize,
    host: String,
    #[serde(default)]
    status: DescribeStatus,
}

#[derive(Deserialize, Default)]
struct DescribeStatus {
    #[serde(default)]
    ready: bool,
}

#[derive(Deserialize)]
struct UpsertResponse {
    #[serde(rename = "upsertedCount", default)]
    upserted_count: Option<usize>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<QueryMatch>,
}

#[derive(Deserialize)]
struct StatsResponse {
    #[serde(rename = "totalVectorCount", default)]
    total_vector_count: usize,
    #[serde(default)]
    namespaces: HashMap<String, NamespaceStats>,
}

#[derive(Deserialize, Default)]
struct NamespaceStats {
    #[serde(rename = "vectorCount", default)]
    vector_count: usize,
}

#[async_trait]
impl VectorIndexApi for HttpIndexClient {
    async fn list_indexes(&self) -> Result<Vec<String>> {
        let url = format!("{}/indexes", self.control_url);
        let res = self
            .client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| RagError::index("list_indexes", "*", e))?;
        let res = Self::fail_on_status(res, "list_indexes", "*").await?;

        let payload: ListIndexesResponse = res
            .json()
            .await
            .map_err(|e| RagError::index("list_indexes", "*", e))?;
        Ok(payload.indexes.into_iter().map(|entry| entry.name).collect())
    }

    async fn has_index(&self, name: &str) -> Result<bool> {
        Ok(self.describe_index(name).await?.is_some())
    }

    async fn create_index(&self, spec: &IndexSpec) -> Result<()> {
        let url = format!("{}/indexes", self.control_url);
        let body = json!({
            "name": spec.name,
            "dimension": spec.dimension,
            "metric": spec.metric.as_str(),
            "spec": {
                "serverless": {
                    "cloud": spec.cloud,
                    "region": spec.region,
                }
            }
        });

        let res = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::index("create_index", &spec.name, e))?;

        if res.status() == StatusCode::CONFLICT {
            tracing::debug!("index '{}' already exists", spec.name);
            return Ok(());
        }
        Self::fail_on_status(res, "create_index", &spec.name).await?;
        Ok(())
    }

    async fn describe_index(&self, name: &str) -> Result<Option<IndexDescription>> {
        let url = format!("{}/indexes/{}", self.control_url, name);
        let res = self
            .client
            .get(&url)
            .header("Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| RagError::index("describe_index", name, e))?;

        if res.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let res = Self::fail_on_status(res, "describe_index", name).await?;

        let payload: DescribeResponse = res
            .json()
            .await
            .map_err(|e| RagError::index("describe_index", name, e))?;
        Ok(Some(IndexDescription {
            name: payload.name,
            dimension: payload.dimension,
            host: payload.host,
            ready: payload.status.ready,
        }))
    }

    async fn delete_index(&self, name: &str) -> Result<()> {
        let url = format!("{}/indexes/{}", self.control_url, name);
        let res = self
            .client
            .delete(&url)
            .header("Api-Key", &self.api_key)
            .send()
            .await
            .map_err(|e| RagError::index("delete_index", name, e))?;
        Self::fail_on_status(res, "delete_index", name).await?;

        self.hosts.write().await.remove(name);
        Ok(())
    }

    async fn upsert(
        &self,
        index: &str,
        namespace: &str,
        records: &[VectorRecord],
    ) -> Result<usize> {
        if records.is_empty() {
            return Ok(0);
        }

        let host = self.host_for(index).await?;
        let url = format!("{}/vectors/upsert", host);
        let body = json!({
            "vectors": records,
            "namespace": namespace,
        });

        let res = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::index("upsert", index, e))?;
        let res = Self::fail_on_status(res, "upsert", index).await?;

        let payload: UpsertResponse = res
            .json()
            .await
            .map_err(|e| RagError::index("upsert", index, e))?;
        Ok(payload.upserted_count.unwrap_or(records.len()))
    }

    async fn query(
        &self,
        index: &str,
        namespace: &str,
        request: &QueryRequest,
    ) -> Result<Vec<QueryMatch>> {
        let host = self.host_for(index).await?;
        let url = format!("{}/query", host);

        let mut body = json!({
            "vector": request.vector,
            "topK": request.top_k,
            "namespace": namespace,
            "includeMetadata": request.include_metadata,
        });
        if let Some(rerank) = &request.rerank {
            if let Some(obj) = body.as_object_mut() {
                obj.insert(
                    "rerank".to_string(),
                    json!({
                        "model": rerank.model,
                        "topN": rerank.top_n,
                        "rankFields": [rerank.rank_field],
                    }),
                );
            }
        }

        let res = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::index("query", index, e))?;
        let res = Self::fail_on_status(res, "query", index).await?;

        let payload: QueryResponse = res
            .json()
            .await
            .map_err(|e| RagError::index("query", index, e))?;
        Ok(payload.matches)
    }

    async fn stats(&self, index: &str, namespace: Option<&str>) -> Result<IndexStats> {
        let host = self.host_for(index).await?;
        let url = format!("{}/describe_index_stats", host);

        let res = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .json(&json!({}))
            .send()
            .await
            .map_err(|e| RagError::index("stats", index, e))?;
        let res = Self::fail_on_status(res, "stats", index).await?;

        let payload: StatsResponse = res
            .json()
            .await
            .map_err(|e| RagError::index("stats", index, e))?;

        let vector_count = match namespace {
            Some(ns) => payload
                .namespaces
                .get(ns)
                .map(|stats| stats.vector_count)
                .unwrap_or(0),
            None => payload.total_vector_count,
        };
        Ok(IndexStats { vector_count })
    }
}
