use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlsage_core::{Embeddings, SqlSageError};
use sqlsage_models::{ProviderBackend, ProviderRequest, ProviderResponse};

#[derive(Debug, Clone)]
pub struct OpenAiEmbeddingsConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    /// Requested output dimensions (text-embedding-3 models only).
    pub dimensions: Option<usize>,
}

impl OpenAiEmbeddingsConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            dimensions: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

pub struct OpenAiEmbeddings {
    config: OpenAiEmbeddingsConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl OpenAiEmbeddings {
    pub fn new(config: OpenAiEmbeddingsConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }

    fn build_request(&self, input: Vec<String>) -> ProviderRequest {
        let mut body = json!({
            "model": self.config.model,
            "input": input,
        });
        if let Some(dimensions) = self.config.dimensions {
            body["dimensions"] = json!(dimensions);
        }

        ProviderRequest {
            url: format!("{}/embeddings", self.config.base_url.trim_end_matches('/')),
            headers: vec![
                (
                    "Authorization".to_string(),
                    format!("Bearer {}", self.config.api_key),
                ),
                ("Content-Type".to_string(), "application/json".to_string()),
            ],
            body,
        }
    }
}

/// Extract vectors from an embeddings response, ordered by their `index`.
pub(crate) fn parse_embeddings(
    response: &ProviderResponse,
) -> Result<Vec<Vec<f32>>, SqlSageError> {
    if response.status != 200 {
        return Err(SqlSageError::Embedding(format!(
            "OpenAI API error ({}): {}",
            response.status, response.body
        )));
    }

    let data = response
        .body
        .get("data")
        .and_then(|d| d.as_array())
        .ok_or_else(|| SqlSageError::Embedding("missing 'data' field in response".to_string()))?;

    let mut indexed: Vec<(u64, Vec<f32>)> = Vec::with_capacity(data.len());
    for (position, item) in data.iter().enumerate() {
        let embedding = item
            .get("embedding")
            .and_then(|e| e.as_array())
            .ok_or_else(|| SqlSageError::Embedding("missing 'embedding' field".to_string()))?
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0) as f32)
            .collect();
        let index = item
            .get("index")
            .and_then(Value::as_u64)
            .unwrap_or(position as u64);
        indexed.push((index, embedding));
    }
    indexed.sort_by_key(|(index, _)| *index);

    Ok(indexed.into_iter().map(|(_, v)| v).collect())
}

#[async_trait]
impl Embeddings for OpenAiEmbeddings {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SqlSageError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let input: Vec<String> = texts.iter().map(|s| s.to_string()).collect();
        let request = self.build_request(input);
        let response = self.backend.send(request).await?;
        parse_embeddings(&response)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, SqlSageError> {
        let mut results = self.embed_documents(&[text]).await?;
        results
            .pop()
            .ok_or_else(|| SqlSageError::Embedding("empty response".to_string()))
    }
}
