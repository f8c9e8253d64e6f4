use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    response::Html,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlsage_assistant::AskError;
use sqlsage_core::TrainingItem;

use crate::AppState;

const PREVIEW_ROWS: usize = 10;

#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub question: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<ErrorResponse>)>;

fn internal(e: impl std::fmt::Display) -> (StatusCode, Json<ErrorResponse>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: e.to_string(),
        }),
    )
}

pub async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

/// `POST /answer`: generate SQL for a question, run it, return preview rows
/// and the full result as CSV. Failures are reported in the body with the
/// stage they happened in.
pub async fn answer(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<AnswerRequest>, JsonRejection>,
) -> (StatusCode, Json<Value>) {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => return invalid(rejection.body_text()),
    };
    let question = request.question.trim();
    if question.is_empty() {
        return invalid("question must not be empty".to_string());
    }

    let outcome = tokio::time::timeout(state.answer_timeout, state.assistant.ask(question)).await;
    let body = match outcome {
        Err(_) => {
            tracing::warn!(%question, "answer timed out");
            json!({
                "error": true,
                "stage": "timeout",
                "detail": format!(
                    "no answer within {} seconds",
                    state.answer_timeout.as_secs_f64()
                ),
            })
        }
        Ok(Err(AskError::Generation { source })) => {
            tracing::warn!(%question, error = %source, "SQL generation failed");
            json!({
                "error": true,
                "stage": "generation",
                "detail": source.to_string(),
            })
        }
        Ok(Err(AskError::Execution { sql, source })) => {
            tracing::warn!(%sql, error = %source, "generated SQL failed");
            json!({
                "error": true,
                "stage": "execution",
                "detail": sql,
                "message": source.to_string(),
            })
        }
        Ok(Ok(answer)) => match answer.result.to_csv() {
            Ok(csv) => json!({
                "preview": answer.result.preview(PREVIEW_ROWS),
                "csv": csv,
                "sql": answer.sql,
            }),
            Err(e) => json!({
                "error": true,
                "stage": "execution",
                "detail": answer.sql,
                "message": e.to_string(),
            }),
        },
    };
    (StatusCode::OK, Json(body))
}

fn invalid(detail: String) -> (StatusCode, Json<Value>) {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error": true,
            "stage": "validation",
            "detail": detail,
        })),
    )
}

pub async fn training_data(State(state): State<Arc<AppState>>) -> ApiResult {
    let rows = state.assistant.training_data().await.map_err(internal)?;
    Ok(Json(json!({ "rows": rows })))
}

pub async fn train(
    State(state): State<Arc<AppState>>,
    Json(item): Json<TrainingItem>,
) -> ApiResult {
    let kind = item.kind();
    let id = state.assistant.train(item).await.map_err(internal)?;
    tracing::info!(%kind, %id, "stored training data");
    Ok(Json(json!({ "id": id })))
}

pub async fn remove_training_data(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult {
    let removed = state
        .assistant
        .store()
        .remove_training_data(&id)
        .await
        .map_err(internal)?;
    Ok(Json(json!({ "removed": removed })))
}

pub async fn remove_collection(
    State(state): State<Arc<AppState>>,
    Path(kind): Path<String>,
) -> ApiResult {
    let reset = state
        .assistant
        .store()
        .remove_collection(&kind)
        .await
        .map_err(internal)?;
    Ok(Json(json!({ "reset": reset })))
}
