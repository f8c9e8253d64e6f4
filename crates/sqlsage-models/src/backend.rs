use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use sqlsage_core::SqlSageError;

#[derive(Debug, Clone)]
pub struct ProviderRequest {
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct ProviderResponse {
    pub status: u16,
    pub body: Value,
}

/// Transport for JSON provider APIs.
#[async_trait]
pub trait ProviderBackend: Send + Sync {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, SqlSageError>;
}

/// Production backend using reqwest.
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for HttpBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProviderBackend for HttpBackend {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, SqlSageError> {
        let mut builder = self.client.post(&request.url);
        for (key, value) in &request.headers {
            builder = builder.header(key, value);
        }
        builder = builder.json(&request.body);

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SqlSageError::Timeout(format!("provider request timed out: {e}"))
            } else {
                SqlSageError::Model(format!("HTTP request failed: {e}"))
            }
        })?;

        let status = response.status().as_u16();
        let body: Value = response
            .json()
            .await
            .map_err(|e| SqlSageError::Parsing(format!("failed to parse response JSON: {e}")))?;

        tracing::debug!(url = %request.url, status, "provider response");
        Ok(ProviderResponse { status, body })
    }
}

/// Test backend with queued responses. Every request is recorded.
#[derive(Clone, Default)]
pub struct FakeBackend {
    responses: Arc<Mutex<VecDeque<Result<ProviderResponse, SqlSageError>>>>,
    requests: Arc<Mutex<Vec<ProviderRequest>>>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_response(&self, response: ProviderResponse) -> &Self {
        self.responses
            .lock()
            .expect("fake backend lock poisoned")
            .push_back(Ok(response));
        self
    }

    pub fn push_error(&self, error: SqlSageError) -> &Self {
        self.responses
            .lock()
            .expect("fake backend lock poisoned")
            .push_back(Err(error));
        self
    }

    /// Requests sent so far, oldest first.
    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests
            .lock()
            .expect("fake backend lock poisoned")
            .clone()
    }
}

#[async_trait]
impl ProviderBackend for FakeBackend {
    async fn send(&self, request: ProviderRequest) -> Result<ProviderResponse, SqlSageError> {
        self.requests
            .lock()
            .expect("fake backend lock poisoned")
            .push(request);
        self.responses
            .lock()
            .expect("fake backend lock poisoned")
            .pop_front()
            .unwrap_or_else(|| Err(SqlSageError::Model("FakeBackend exhausted".to_string())))
    }
}
