//! Azure OpenAI deployments.
//!
//! Same wire format as OpenAI, but the deployment is addressed by URL and
//! authentication uses an `api-key` header.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::json;
use sqlsage_core::{ChatModel, ChatRequest, ChatResponse, Embeddings, SqlSageError};
use sqlsage_models::{ProviderBackend, ProviderRequest};

use crate::chat_model::{chat_body, parse_response};
use crate::embeddings::parse_embeddings;

const DEFAULT_API_VERSION: &str = "2024-10-21";

fn deployment_url(resource: &str, deployment: &str, api_version: &str, op: &str) -> String {
    format!(
        "https://{resource}.openai.azure.com/openai/deployments/{deployment}/{op}?api-version={api_version}"
    )
}

fn azure_headers(api_key: &str) -> Vec<(String, String)> {
    vec![
        ("api-key".to_string(), api_key.to_string()),
        ("Content-Type".to_string(), "application/json".to_string()),
    ]
}

// ---------------------------------------------------------------------------
// Chat
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AzureOpenAiConfig {
    pub api_key: String,
    pub resource_name: String,
    pub deployment_name: String,
    pub api_version: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
}

impl AzureOpenAiConfig {
    pub fn new(
        api_key: impl Into<String>,
        resource_name: impl Into<String>,
        deployment_name: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            resource_name: resource_name.into(),
            deployment_name: deployment_name.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            max_tokens: None,
            temperature: None,
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

pub struct AzureOpenAiChatModel {
    config: AzureOpenAiConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl AzureOpenAiChatModel {
    pub fn new(config: AzureOpenAiConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }

    pub fn build_request(&self, request: &ChatRequest) -> ProviderRequest {
        ProviderRequest {
            url: deployment_url(
                &self.config.resource_name,
                &self.config.deployment_name,
                &self.config.api_version,
                "chat/completions",
            ),
            headers: azure_headers(&self.config.api_key),
            body: chat_body(request, self.config.max_tokens, self.config.temperature),
        }
    }
}

#[async_trait]
impl ChatModel for AzureOpenAiChatModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, SqlSageError> {
        let provider_req = self.build_request(&request);
        let resp = self.backend.send(provider_req).await?;
        parse_response(&resp)
    }
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AzureOpenAiEmbeddingsConfig {
    pub api_key: String,
    pub resource_name: String,
    pub deployment_name: String,
    pub api_version: String,
    pub model: String,
    /// Requested output dimensions (text-embedding-3 deployments only).
    pub dimensions: Option<usize>,
}

impl AzureOpenAiEmbeddingsConfig {
    pub fn new(
        api_key: impl Into<String>,
        resource_name: impl Into<String>,
        deployment_name: impl Into<String>,
    ) -> Self {
        Self {
            api_key: api_key.into(),
            resource_name: resource_name.into(),
            deployment_name: deployment_name.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            model: "text-embedding-3-small".to_string(),
            dimensions: None,
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_dimensions(mut self, dimensions: usize) -> Self {
        self.dimensions = Some(dimensions);
        self
    }
}

pub struct AzureOpenAiEmbeddings {
    config: AzureOpenAiEmbeddingsConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl AzureOpenAiEmbeddings {
    pub fn new(config: AzureOpenAiEmbeddingsConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }
}

#[async_trait]
impl Embeddings for AzureOpenAiEmbeddings {
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SqlSageError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let mut body = json!({
            "model": self.config.model,
            "input": texts,
        });
        if let Some(dimensions) = self.config.dimensions {
            body["dimensions"] = json!(dimensions);
        }
        let request = ProviderRequest {
            url: deployment_url(
                &self.config.resource_name,
                &self.config.deployment_name,
                &self.config.api_version,
                "embeddings",
            ),
            headers: azure_headers(&self.config.api_key),
            body,
        };
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
