use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlsage_core::{ChatModel, ChatRequest, ChatResponse, Message, SqlSageError, TokenUsage};
use sqlsage_models::{ProviderBackend, ProviderRequest, ProviderResponse};

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub model: String,
    pub base_url: String,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    pub seed: Option<u64>,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            max_tokens: None,
            temperature: None,
            seed: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
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

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }
}

pub struct OpenAiChatModel {
    config: OpenAiConfig,
    backend: Arc<dyn ProviderBackend>,
}

impl OpenAiChatModel {
    pub fn new(config: OpenAiConfig, backend: Arc<dyn ProviderBackend>) -> Self {
        Self { config, backend }
    }

    pub fn build_request(&self, request: &ChatRequest) -> ProviderRequest {
        let mut body = chat_body(request, self.config.max_tokens, self.config.temperature);
        body["model"] = json!(self.config.model);
        if let Some(seed) = self.config.seed {
            body["seed"] = json!(seed);
        }

        ProviderRequest {
            url: format!(
                "{}/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ),
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

/// Request body shared by OpenAI and Azure OpenAI (Azure puts the model in the URL).
pub(crate) fn chat_body(
    request: &ChatRequest,
    max_tokens: Option<u32>,
    temperature: Option<f64>,
) -> Value {
    let messages: Vec<Value> = request.messages.iter().map(message_to_openai).collect();
    let mut body = json!({ "messages": messages });
    if let Some(max_tokens) = max_tokens {
        body["max_tokens"] = json!(max_tokens);
    }
    if let Some(temp) = temperature {
        body["temperature"] = json!(temp);
    }
    body
}

fn message_to_openai(msg: &Message) -> Value {
    let role = match msg {
        Message::System { .. } => "system",
        Message::Human { .. } => "user",
        Message::AI { .. } => "assistant",
    };
    json!({
        "role": role,
        "content": msg.content(),
    })
}

pub(crate) fn parse_response(resp: &ProviderResponse) -> Result<ChatResponse, SqlSageError> {
    check_error_status(resp)?;

    let content = resp.body["choices"][0]["message"]["content"]
        .as_str()
        .unwrap_or("")
        .to_string();
    let usage = parse_usage(&resp.body["usage"]);

    Ok(ChatResponse {
        message: Message::ai(content),
        usage,
    })
}

fn check_error_status(resp: &ProviderResponse) -> Result<(), SqlSageError> {
    if resp.status == 429 {
        let msg = resp.body["error"]["message"]
            .as_str()
            .unwrap_or("rate limited")
            .to_string();
        return Err(SqlSageError::RateLimit(msg));
    }
    if resp.status >= 400 {
        let msg = resp.body["error"]["message"]
            .as_str()
            .unwrap_or("unknown API error")
            .to_string();
        return Err(SqlSageError::Model(format!(
            "OpenAI API error ({}): {}",
            resp.status, msg
        )));
    }
    Ok(())
}

fn parse_usage(usage: &Value) -> Option<TokenUsage> {
    if usage.is_null() {
        return None;
    }
    Some(TokenUsage {
        input_tokens: usage["prompt_tokens"].as_u64().unwrap_or(0) as u32,
        output_tokens: usage["completion_tokens"].as_u64().unwrap_or(0) as u32,
        total_tokens: usage["total_tokens"].as_u64().unwrap_or(0) as u32,
    })
}

#[async_trait]
impl ChatModel for OpenAiChatModel {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, SqlSageError> {
        let provider_req = self.build_request(&request);
        let resp = self.backend.send(provider_req).await?;
        parse_response(&resp)
    }
}
