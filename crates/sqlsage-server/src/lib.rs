//! HTTP front end for SqlSage.
//!
//! [`initialize`] builds an [`Assistant`] from a [`ServerConfig`] and seeds
//! its training data; [`router`] exposes it over axum.

mod config;
pub mod routes;
mod startup;

pub use config::{SearchConfig, ServerConfig};
pub use startup::initialize;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{delete, get, post},
    Router,
};
use sqlsage_assistant::Assistant;
use sqlsage_core::SqlSageError;
use tower_http::trace::TraceLayer;

/// Shared handler state.
pub struct AppState {
    pub assistant: Arc<Assistant>,
    pub answer_timeout: Duration,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(routes::index))
        .route("/answer", post(routes::answer))
        .route("/api/training-data", get(routes::training_data))
        .route("/api/training-data/{id}", delete(routes::remove_training_data))
        .route("/api/train", post(routes::train))
        .route("/api/collections/{kind}", delete(routes::remove_collection))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn serve(config: &ServerConfig, assistant: Arc<Assistant>) -> Result<(), SqlSageError> {
    let state = Arc::new(AppState {
        assistant,
        answer_timeout: config.answer_timeout,
    });
    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SqlSageError::Config(format!("cannot bind {addr}: {e}")))?;
    tracing::info!("listening on http://{addr}");

    axum::serve(listener, router(state))
        .await
        .map_err(|e| SqlSageError::Config(format!("server error: {e}")))
}
