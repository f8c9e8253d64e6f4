use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::{json, Value};
use sqlsage_core::{Document, Embeddings, SqlSageError, VectorStore};

const DEFAULT_API_VERSION: &str = "2024-07-01";
const LIST_PAGE_SIZE: usize = 1000;
const HNSW_ALGORITHM: &str = "sqlsage-hnsw";
const VECTOR_PROFILE: &str = "sqlsage-vector-profile";

// ---------------------------------------------------------------------------
// AzureSearchConfig
// ---------------------------------------------------------------------------

/// Configuration for one Azure AI Search index.
#[derive(Debug, Clone)]
pub struct AzureSearchConfig {
    /// Service endpoint, e.g. `https://my-service.search.windows.net`.
    pub endpoint: String,
    /// Admin key sent in the `api-key` header.
    pub api_key: String,
    pub index_name: String,
    /// Vector dimensionality (required for index creation).
    pub dimensions: usize,
    /// REST API version (default: `2024-07-01`).
    pub api_version: String,
    /// Field name for storing embedding vectors (default: `embedding`).
    pub vector_field: String,
    /// Field name for storing document content (default: `content`).
    pub content_field: String,
}

impl AzureSearchConfig {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        index_name: impl Into<String>,
        dimensions: usize,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: api_key.into(),
            index_name: index_name.into(),
            dimensions,
            api_version: DEFAULT_API_VERSION.to_string(),
            vector_field: "embedding".to_string(),
            content_field: "content".to_string(),
        }
    }

    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    pub fn with_vector_field(mut self, field: impl Into<String>) -> Self {
        self.vector_field = field.into();
        self
    }

    pub fn with_content_field(mut self, field: impl Into<String>) -> Self {
        self.content_field = field.into();
        self
    }
}

// ---------------------------------------------------------------------------
// AzureSearchIndex
// ---------------------------------------------------------------------------

/// A [`VectorStore`] backed by a single Azure AI Search index.
///
/// The index is created on first use with a fixed schema:
/// - `id`: key, filterable
/// - `content`: searchable text
/// - `metadata`: serialized JSON object, not searchable
/// - `embedding`: `Collection(Edm.Single)` searched with HNSW / cosine
///
/// If the index disappears while the process runs (deleted from the portal,
/// say) the next operation recreates it; reads then see an empty index.
pub struct AzureSearchIndex {
    config: AzureSearchConfig,
    client: reqwest::Client,
    exists: AtomicBool,
}

impl AzureSearchIndex {
    pub fn new(config: AzureSearchConfig) -> Self {
        Self::with_client(config, reqwest::Client::new())
    }

    /// Share an existing HTTP client (connection pool) across indexes.
    pub fn with_client(config: AzureSearchConfig, client: reqwest::Client) -> Self {
        Self {
            config,
            client,
            exists: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &AzureSearchConfig {
        &self.config
    }

    /// Build the full URL for a path below this index.
    pub fn url(&self, path: &str) -> String {
        let base = self.config.endpoint.trim_end_matches('/');
        format!(
            "{base}/indexes/{}{path}?api-version={}",
            self.config.index_name, self.config.api_version
        )
    }

    fn apply_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder.header("api-key", &self.config.api_key)
    }

    /// Index definition used when creating the index.
    pub fn index_definition(&self) -> Value {
        json!({
            "name": self.config.index_name,
            "fields": [
                {
                    "name": "id",
                    "type": "Edm.String",
                    "key": true,
                    "filterable": true
                },
                {
                    "name": self.config.content_field,
                    "type": "Edm.String",
                    "searchable": true
                },
                {
                    "name": "metadata",
                    "type": "Edm.String",
                    "searchable": false
                },
                {
                    "name": self.config.vector_field,
                    "type": "Collection(Edm.Single)",
                    "searchable": true,
                    "dimensions": self.config.dimensions,
                    "vectorSearchProfile": VECTOR_PROFILE
                }
            ],
            "vectorSearch": {
                "algorithms": [
                    {
                        "name": HNSW_ALGORITHM,
                        "kind": "hnsw",
                        "hnswParameters": { "metric": "cosine" }
                    }
                ],
                "profiles": [
                    { "name": VECTOR_PROFILE, "algorithm": HNSW_ALGORITHM }
                ]
            }
        })
    }

    /// Ensure the index exists, creating it if the service reports 404.
    ///
    /// Only the first call talks to the service; afterwards the cached flag
    /// short-circuits until an operation sees the index missing again.
    pub async fn ensure_index(&self) -> Result<(), SqlSageError> {
        if self.exists.load(Ordering::Acquire) {
            return Ok(());
        }

        let index_url = self.url("");
        let resp = self
            .apply_auth(self.client.get(&index_url))
            .send()
            .await
            .map_err(|e| SqlSageError::VectorStore(format!("Azure Search GET index failed: {e}")))?;

        match resp.status() {
            status if status.is_success() => {}
            StatusCode::NOT_FOUND => self.create_index().await?,
            status => {
                let text = resp.text().await.unwrap_or_default();
                return Err(SqlSageError::VectorStore(format!(
                    "Azure Search index lookup error (HTTP {status}): {text}"
                )));
            }
        }

        self.exists.store(true, Ordering::Release);
        Ok(())
    }

    async fn create_index(&self) -> Result<(), SqlSageError> {
        let resp = self
            .apply_auth(self.client.put(self.url("")))
            .header("Content-Type", "application/json")
            .json(&self.index_definition())
            .send()
            .await
            .map_err(|e| SqlSageError::VectorStore(format!("Azure Search PUT index failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(SqlSageError::VectorStore(format!(
                "Azure Search create index error (HTTP {status}): {text}"
            )));
        }

        tracing::info!(index = %self.config.index_name, "created Azure Search index");
        Ok(())
    }

    /// POST a JSON body below the index.
    ///
    /// Returns `Ok(None)` when the service answered 404: the index is
    /// recreated empty and the caller decides what that means.
    async fn post_json(&self, path: &str, body: &Value) -> Result<Option<Value>, SqlSageError> {
        self.ensure_index().await?;

        let resp = self
            .apply_auth(self.client.post(self.url(path)))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| {
                SqlSageError::VectorStore(format!("Azure Search request to {path} failed: {e}"))
            })?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            tracing::warn!(index = %self.config.index_name, "index vanished, recreating");
            self.exists.store(false, Ordering::Release);
            self.ensure_index().await?;
            return Ok(None);
        }

        let text = resp.text().await.map_err(|e| {
            SqlSageError::VectorStore(format!("failed to read Azure Search response: {e}"))
        })?;
        if !status.is_success() {
            return Err(SqlSageError::VectorStore(format!(
                "Azure Search error (HTTP {status}): {text}"
            )));
        }

        match serde_json::from_str(&text) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                tracing::warn!(error = %e, "unparseable Azure Search response");
                Ok(Some(Value::Null))
            }
        }
    }

    /// Build the `mergeOrUpload` batch for documents and their vectors.
    pub fn upload_batch(&self, docs: &[Document], vectors: &[Vec<f32>]) -> Value {
        let actions: Vec<Value> = docs
            .iter()
            .zip(vectors)
            .map(|(doc, vector)| {
                let metadata =
                    serde_json::to_string(&doc.metadata).unwrap_or_else(|_| "{}".to_string());
                json!({
                    "@search.action": "mergeOrUpload",
                    "id": doc.id,
                    &self.config.content_field: doc.content,
                    "metadata": metadata,
                    &self.config.vector_field: vector,
                })
            })
            .collect();
        json!({ "value": actions })
    }

    /// Build a k-NN query against the vector field.
    pub fn vector_query(&self, vector: &[f32], k: usize) -> Value {
        json!({
            "select": self.select_fields(),
            "top": k,
            "vectorQueries": [
                {
                    "kind": "vector",
                    "vector": vector,
                    "k": k,
                    "fields": self.config.vector_field,
                }
            ]
        })
    }

    fn list_query(&self, skip: usize) -> Value {
        json!({
            "search": "*",
            "select": self.select_fields(),
            "top": LIST_PAGE_SIZE,
            "skip": skip,
        })
    }

    fn select_fields(&self) -> String {
        format!("id,{},metadata", self.config.content_field)
    }

    /// Turn a search response into scored documents.
    ///
    /// A missing or malformed `value` array yields no results.
    pub fn parse_search_results(&self, body: &Value) -> Vec<(Document, f32)> {
        let Some(hits) = body.get("value").and_then(Value::as_array) else {
            tracing::warn!(index = %self.config.index_name, "search response has no value array");
            return Vec::new();
        };

        hits.iter()
            .filter_map(|hit| {
                let id = hit.get("id").and_then(Value::as_str)?;
                let content = hit
                    .get(&self.config.content_field)
                    .and_then(Value::as_str)
                    .unwrap_or("");
                let score = hit
                    .get("@search.score")
                    .and_then(Value::as_f64)
                    .unwrap_or(0.0) as f32;
                let metadata: HashMap<String, Value> = hit
                    .get("metadata")
                    .and_then(Value::as_str)
                    .and_then(|raw| serde_json::from_str(raw).ok())
                    .unwrap_or_default();
                Some((Document::with_metadata(id, content, metadata), score))
            })
            .collect()
    }
}

/// Item-level failures in an indexing response.
fn failed_keys(body: &Value) -> Vec<String> {
    body.get("value")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| !item.get("status").and_then(Value::as_bool).unwrap_or(true))
                .map(|item| {
                    let key = item.get("key").and_then(Value::as_str).unwrap_or("?");
                    let msg = item
                        .get("errorMessage")
                        .and_then(Value::as_str)
                        .unwrap_or("unknown error");
                    format!("{key}: {msg}")
                })
                .collect()
        })
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// VectorStore implementation
// ---------------------------------------------------------------------------

#[async_trait]
impl VectorStore for AzureSearchIndex {
    async fn add_documents(
        &self,
        docs: Vec<Document>,
        embeddings: &dyn Embeddings,
    ) -> Result<Vec<String>, SqlSageError> {
        if docs.is_empty() {
            return Ok(Vec::new());
        }

        let texts: Vec<&str> = docs.iter().map(|d| d.content.as_str()).collect();
        let vectors = embeddings.embed_documents(&texts).await?;
        if vectors.len() != docs.len() {
            return Err(SqlSageError::VectorStore(format!(
                "got {} embeddings for {} documents",
                vectors.len(),
                docs.len()
            )));
        }
        let batch = self.upload_batch(&docs, &vectors);

        // A vanished index is recreated by post_json; upload once more into it.
        let response = match self.post_json("/docs/index", &batch).await? {
            Some(response) => response,
            None => self
                .post_json("/docs/index", &batch)
                .await?
                .ok_or_else(|| {
                    SqlSageError::VectorStore(format!(
                        "index {} missing after recreation",
                        self.config.index_name
                    ))
                })?,
        };

        let failures = failed_keys(&response);
        if !failures.is_empty() {
            return Err(SqlSageError::VectorStore(format!(
                "Azure Search rejected documents: {}",
                failures.join("; ")
            )));
        }

        Ok(docs.into_iter().map(|d| d.id).collect())
    }

    async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
        embeddings: &dyn Embeddings,
    ) -> Result<Vec<(Document, f32)>, SqlSageError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let query_vec = embeddings.embed_query(query).await?;
        let body = self.vector_query(&query_vec, k);
        Ok(self
            .post_json("/docs/search", &body)
            .await?
            .map(|response| self.parse_search_results(&response))
            .unwrap_or_default())
    }

    async fn list_documents(&self) -> Result<Vec<Document>, SqlSageError> {
        let mut docs = Vec::new();
        let mut skip = 0;
        loop {
            let Some(response) = self.post_json("/docs/search", &self.list_query(skip)).await?
            else {
                break;
            };
            let page = self.parse_search_results(&response);
            let fetched = page.len();
            docs.extend(page.into_iter().map(|(doc, _)| doc));
            if fetched < LIST_PAGE_SIZE {
                break;
            }
            skip += fetched;
        }
        Ok(docs)
    }

    async fn delete(&self, ids: &[&str]) -> Result<(), SqlSageError> {
        if ids.is_empty() {
            return Ok(());
        }
        let actions: Vec<Value> = ids
            .iter()
            .map(|id| json!({ "@search.action": "delete", "id": id }))
            .collect();
        // Deleting from a recreated (empty) index is a no-op.
        self.post_json("/docs/index", &json!({ "value": actions }))
            .await?;
        Ok(())
    }

    async fn reset(&self) -> Result<(), SqlSageError> {
        let resp = self
            .apply_auth(self.client.delete(self.url("")))
            .send()
            .await
            .map_err(|e| {
                SqlSageError::VectorStore(format!("Azure Search DELETE index failed: {e}"))
            })?;

        let status = resp.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let text = resp.text().await.unwrap_or_default();
            return Err(SqlSageError::VectorStore(format!(
                "Azure Search delete index error (HTTP {status}): {text}"
            )));
        }

        self.exists.store(false, Ordering::Release);
        self.ensure_index().await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
