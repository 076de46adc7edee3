use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};

use super::provider::ModelProvider;
use super::types::{AnswerRequest, ChatMessage, EmbeddingInput};
use crate::core::config::ModelSettings;
use crate::core::errors::{RagError, Result};

const SYSTEM_PROMPT: &str = "You are a helpful assistant. Answer the user's question using the \
    provided document fragments. If the fragments do not contain the answer, say so instead of \
    inventing one.";

/// OpenAI-compatible provider: `/embeddings` for vectors,
/// `/chat/completions` for answer generation.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    base_url: String,
    api_key: String,
    embedding_model: String,
    chat_model: String,
    send_input_type: bool,
    client: Client,
}

impl OpenAiCompatProvider {
    pub fn new(settings: &ModelSettings, api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.request_timeout_secs))
            .build()
            .unwrap_or_default();

        Self {
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            api_key,
            embedding_model: settings.embedding_model.clone(),
            chat_model: settings.chat_model.clone(),
            send_input_type: settings.send_input_type,
            client,
        }
    }
}

#[derive(Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl ModelProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);
        let res = self
            .client
            .get(&url)
            .bearer_auth(&self.api_key)
            .send()
            .await;
        match res {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    async fn embed(
        &self,
        inputs: &[String],
        input_type: EmbeddingInput,
    ) -> Result<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(vec![]);
        }

        let url = format!("{}/embeddings", self.base_url);

        let mut body = json!({
            "model": self.embedding_model,
            "input": inputs,
        });
        if self.send_input_type {
            if let Some(obj) = body.as_object_mut() {
                obj.insert("input_type".to_string(), json!(input_type.as_str()));
            }
        }

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::model("embed", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::model(
                "embed",
                format!("{}: {}", status, text),
            ));
        }

        let payload: EmbeddingsResponse = res
            .json()
            .await
            .map_err(|e| RagError::model("embed", e))?;

        // The service tags each vector with its input index; order by it
        // rather than trusting response order.
        let mut items = payload.data;
        items.sort_by_key(|item| item.index);
        Ok(items.into_iter().map(|item| item.embedding).collect())
    }

    async fn generate(&self, request: AnswerRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut messages = vec![ChatMessage::system(SYSTEM_PROMPT)];
        if !request.context.is_empty() {
            messages.push(ChatMessage::system(format!(
                "Document fragments:\n{}",
                request.context
            )));
        }
        messages.extend(request.history);
        messages.push(ChatMessage::user(request.question));

        let body = json!({
            "model": self.chat_model,
            "messages": messages,
            "stream": false,
        });

        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| RagError::model("chat_completion", e))?;

        if !res.status().is_success() {
            let status = res.status();
            let text = res.text().await.unwrap_or_default();
            return Err(RagError::model(
                "chat_completion",
                format!("{}: {}", status, text),
            ));
        }

        let payload: Value = res
            .json()
            .await
            .map_err(|e| RagError::model("chat_completion", e))?;

        payload["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.to_string())
            .ok_or_else(|| RagError::model("chat_completion", "response had no content"))
    }
}
