use serde_json::json;
use sqlsage_core::{ChatModel, ChatRequest, Message, SqlSageError};
use sqlsage_models::{
    FakeBackend, ProviderBackend, ProviderRequest, ProviderResponse, ScriptedChatModel,
};

fn request(url: &str) -> ProviderRequest {
    ProviderRequest {
        url: url.to_string(),
        headers: vec![],
        body: json!({"ping": true}),
    }
}

#[tokio::test]
async fn fake_backend_replays_in_order() {
    let backend = FakeBackend::new();
    backend
        .push_response(ProviderResponse {
            status: 200,
            body: json!({"n": 1}),
        })
        .push_response(ProviderResponse {
            status: 500,
            body: json!({"n": 2}),
        });

    let first = backend.send(request("http://a")).await.unwrap();
    let second = backend.send(request("http://b")).await.unwrap();
    assert_eq!(first.body["n"], 1);
    assert_eq!(second.status, 500);

    let seen = backend.requests();
    assert_eq!(seen.len(), 2);
    assert_eq!(seen[1].url, "http://b");
}

#[tokio::test]
async fn fake_backend_errors_when_exhausted() {
    let backend = FakeBackend::new();
    let err = backend.send(request("http://a")).await.unwrap_err();
    assert!(err.to_string().contains("exhausted"));
}

#[tokio::test]
async fn fake_backend_returns_pushed_errors() {
    let backend = FakeBackend::new();
    backend.push_error(SqlSageError::Timeout("slow".into()));
    let err = backend.send(request("http://a")).await.unwrap_err();
    assert!(matches!(err, SqlSageError::Timeout(_)));
}

#[tokio::test]
async fn scripted_model_replays_and_records() {
    let model = ScriptedChatModel::from_replies(["SELECT 1;", "SELECT 2;"]);

    let first = model
        .chat(ChatRequest::new(vec![Message::human("one")]))
        .await
        .unwrap();
    assert_eq!(first.message.content(), "SELECT 1;");

    model
        .chat(ChatRequest::new(vec![Message::human("two")]))
        .await
        .unwrap();
    let err = model
        .chat(ChatRequest::new(vec![Message::human("three")]))
        .await
        .unwrap_err();
    assert!(matches!(err, SqlSageError::Model(_)));

    let requests = model.requests().await;
    assert_eq!(requests.len(), 3);
    assert_eq!(requests[2].messages[0].content(), "three");
}
