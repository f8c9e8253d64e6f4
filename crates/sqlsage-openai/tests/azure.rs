use std::sync::Arc;

use serde_json::json;
use sqlsage_core::{ChatModel, ChatRequest, Embeddings, Message, SqlSageError};
use sqlsage_models::{FakeBackend, ProviderResponse};
use sqlsage_openai::{
    AzureOpenAiChatModel, AzureOpenAiConfig, AzureOpenAiEmbeddings, AzureOpenAiEmbeddingsConfig,
};

// ---------------------------------------------------------------------------
// AzureOpenAiConfig
// ---------------------------------------------------------------------------

#[test]
fn config_defaults() {
    let config = AzureOpenAiConfig::new("key", "my-resource", "gpt-4o");
    assert_eq!(config.api_key, "key");
    assert_eq!(config.resource_name, "my-resource");
    assert_eq!(config.deployment_name, "gpt-4o");
    assert_eq!(config.api_version, "2024-10-21");
    assert!(config.max_tokens.is_none());
    assert!(config.temperature.is_none());
}

#[test]
fn config_builder_methods() {
    let config = AzureOpenAiConfig::new("key", "res", "dep")
        .with_api_version("2025-01-01")
        .with_max_tokens(500)
        .with_temperature(0.0);

    assert_eq!(config.api_version, "2025-01-01");
    assert_eq!(config.max_tokens, Some(500));
    assert_eq!(config.temperature, Some(0.0));
}

// ---------------------------------------------------------------------------
// Request shape
// ---------------------------------------------------------------------------

#[test]
fn build_request_addresses_deployment_with_api_key() {
    let backend = Arc::new(FakeBackend::new());
    let config = AzureOpenAiConfig::new("test-key", "contoso", "sql-gpt");
    let model = AzureOpenAiChatModel::new(config, backend);

    let request = ChatRequest::new(vec![
        Message::system("You are a SQLite expert."),
        Message::human("how many orders?"),
    ]);
    let provider_req = model.build_request(&request);

    assert_eq!(
        provider_req.url,
        "https://contoso.openai.azure.com/openai/deployments/sql-gpt/chat/completions?api-version=2024-10-21"
    );
    assert!(provider_req
        .headers
        .iter()
        .any(|(k, v)| k == "api-key" && v == "test-key"));
    assert!(!provider_req.headers.iter().any(|(k, _)| k == "Authorization"));

    // the deployment selects the model
    assert!(provider_req.body.get("model").is_none());
    let messages = provider_req.body["messages"].as_array().unwrap();
    assert_eq!(messages[0]["role"], "system");
    assert_eq!(messages[1]["role"], "user");
    assert_eq!(messages[1]["content"], "how many orders?");
}

#[tokio::test]
async fn chat_parses_choice_and_usage() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 200,
        body: json!({
            "choices": [{"message": {"role": "assistant", "content": "SELECT COUNT(*) FROM orders;"}}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 7, "total_tokens": 19}
        }),
    });

    let model = AzureOpenAiChatModel::new(
        AzureOpenAiConfig::new("k", "res", "dep"),
        backend.clone(),
    );
    let response = model
        .chat(ChatRequest::new(vec![Message::human("count orders")]))
        .await
        .unwrap();

    assert!(response.message.is_ai());
    assert_eq!(response.message.content(), "SELECT COUNT(*) FROM orders;");
    let usage = response.usage.unwrap();
    assert_eq!(usage.total_tokens, 19);
    assert_eq!(backend.requests().len(), 1);
}

#[tokio::test]
async fn chat_maps_rate_limit() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 429,
        body: json!({"error": {"message": "slow down"}}),
    });

    let model = AzureOpenAiChatModel::new(AzureOpenAiConfig::new("k", "res", "dep"), backend);
    let err = model
        .chat(ChatRequest::new(vec![Message::human("hi")]))
        .await
        .unwrap_err();
    assert!(matches!(err, SqlSageError::RateLimit(ref msg) if msg == "slow down"));
}

#[tokio::test]
async fn chat_maps_server_errors_to_model_error() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 500,
        body: json!({"error": {"message": "boom"}}),
    });

    let model = AzureOpenAiChatModel::new(AzureOpenAiConfig::new("k", "res", "dep"), backend);
    let err = model
        .chat(ChatRequest::new(vec![Message::human("hi")]))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "model error: OpenAI API error (500): boom");
}

// ---------------------------------------------------------------------------
// Embeddings
// ---------------------------------------------------------------------------

#[tokio::test]
async fn embeddings_use_deployment_url_and_keep_order() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 200,
        body: json!({
            "data": [
                {"index": 1, "embedding": [0.0, 1.0]},
                {"index": 0, "embedding": [1.0, 0.0]}
            ]
        }),
    });

    let embeddings = AzureOpenAiEmbeddings::new(
        AzureOpenAiEmbeddingsConfig::new("k", "contoso", "embed"),
        backend.clone(),
    );
    let vectors = embeddings
        .embed_documents(&["first", "second"])
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);

    let sent = backend.requests();
    assert!(sent[0]
        .url
        .starts_with("https://contoso.openai.azure.com/openai/deployments/embed/embeddings"));
    assert_eq!(sent[0].body["model"], "text-embedding-3-small");
    assert!(sent[0].body.get("dimensions").is_none());
}

#[tokio::test]
async fn embeddings_request_configured_dimensions() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 200,
        body: json!({"data": [{"index": 0, "embedding": [0.5, 0.5, 0.0]}]}),
    });

    let embeddings = AzureOpenAiEmbeddings::new(
        AzureOpenAiEmbeddingsConfig::new("k", "contoso", "embed").with_dimensions(3),
        backend.clone(),
    );
    let vector = embeddings.embed_query("orders").await.unwrap();
    assert_eq!(vector.len(), 3);
    assert_eq!(backend.requests()[0].body["dimensions"], 3);
}

#[tokio::test]
async fn embeddings_error_mentions_status() {
    let backend = Arc::new(FakeBackend::new());
    backend.push_response(ProviderResponse {
        status: 429,
        body: json!({"error": {"message": "quota"}}),
    });

    let embeddings = AzureOpenAiEmbeddings::new(
        AzureOpenAiEmbeddingsConfig::new("k", "res", "dep"),
        backend,
    );
    let err = embeddings.embed_query("hello").await.unwrap_err();
    assert!(matches!(err, SqlSageError::Embedding(_)));
    assert!(err.to_string().contains("429"));
}

#[tokio::test]
async fn empty_batch_skips_the_network() {
    let backend = Arc::new(FakeBackend::new());
    let embeddings = AzureOpenAiEmbeddings::new(
        AzureOpenAiEmbeddingsConfig::new("k", "res", "dep"),
        backend.clone(),
    );
    assert!(embeddings.embed_documents(&[]).await.unwrap().is_empty());
    assert!(backend.requests().is_empty());
}
