use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

mod query_result;
mod training;

pub use query_result::QueryResult;
pub use training::{
    extract_documents, training_id, QuestionSql, RetrievedDocument, TrainingItem, TrainingKind,
    TrainingRow,
};

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// A chat message. Tagged enum with System, Human and AI variants.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role")]
pub enum Message {
    #[serde(rename = "system")]
    System { content: String },
    #[serde(rename = "human")]
    Human { content: String },
    #[serde(rename = "assistant")]
    AI { content: String },
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Message::System {
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Message::Human {
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Message::AI {
            content: content.into(),
        }
    }

    pub fn content(&self) -> &str {
        match self {
            Message::System { content } | Message::Human { content } | Message::AI { content } => {
                content
            }
        }
    }

    pub fn role(&self) -> &str {
        match self {
            Message::System { .. } => "system",
            Message::Human { .. } => "human",
            Message::AI { .. } => "assistant",
        }
    }

    pub fn is_system(&self) -> bool {
        matches!(self, Message::System { .. })
    }

    pub fn is_human(&self) -> bool {
        matches!(self, Message::Human { .. })
    }

    pub fn is_ai(&self) -> bool {
        matches!(self, Message::AI { .. })
    }
}

// ---------------------------------------------------------------------------
// Chat request / response
// ---------------------------------------------------------------------------

/// A request to a chat model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<Message>,
}

impl ChatRequest {
    pub fn new(messages: Vec<Message>) -> Self {
        Self { messages }
    }
}

/// A response from a chat model containing the AI message and optional token usage statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub message: Message,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Unified error type for SqlSage with variants covering all subsystems.
#[derive(Debug, Error)]
pub enum SqlSageError {
    #[error("model error: {0}")]
    Model(String),
    #[error("rate limit: {0}")]
    RateLimit(String),
    #[error("timeout: {0}")]
    Timeout(String),
    #[error("validation error: {0}")]
    Validation(String),
    #[error("parsing error: {0}")]
    Parsing(String),
    #[error("embedding error: {0}")]
    Embedding(String),
    #[error("vector store error: {0}")]
    VectorStore(String),
    #[error("database error: {0}")]
    Database(String),
    #[error("generation error: {0}")]
    Generation(String),
    #[error("training feed error: {0}")]
    Feed(String),
    #[error("config error: {0}")]
    Config(String),
}

// ---------------------------------------------------------------------------
// ChatModel
// ---------------------------------------------------------------------------

/// The core trait for language model providers.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, SqlSageError>;
}

// ---------------------------------------------------------------------------
// Embeddings trait (implemented in sqlsage-embeddings and sqlsage-openai)
// ---------------------------------------------------------------------------

/// Trait for embedding text into vectors.
#[async_trait]
pub trait Embeddings: Send + Sync {
    /// Embed multiple texts (for batch document embedding).
    async fn embed_documents(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>, SqlSageError>;

    /// Embed a single query text.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, SqlSageError>;
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// A stored document with content and metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(
        id: impl Into<String>,
        content: impl Into<String>,
        metadata: HashMap<String, Value>,
    ) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata,
        }
    }
}

// ---------------------------------------------------------------------------
// VectorStore trait (implementations in sqlsage-vectorstores, sqlsage-azure-search)
// ---------------------------------------------------------------------------

/// A single collection of embedded documents.
///
/// Adding a document whose id already exists replaces it.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Add (or replace) documents, computing their embeddings.
    async fn add_documents(
        &self,
        docs: Vec<Document>,
        embeddings: &dyn Embeddings,
    ) -> Result<Vec<String>, SqlSageError>;

    /// Search for similar documents by query string.
    async fn similarity_search(
        &self,
        query: &str,
        k: usize,
        embeddings: &dyn Embeddings,
    ) -> Result<Vec<Document>, SqlSageError> {
        let results = self
            .similarity_search_with_score(query, k, embeddings)
            .await?;
        Ok(results.into_iter().map(|(doc, _)| doc).collect())
    }

    /// Search with similarity scores (higher = more similar).
    async fn similarity_search_with_score(
        &self,
        query: &str,
        k: usize,
        embeddings: &dyn Embeddings,
    ) -> Result<Vec<(Document, f32)>, SqlSageError>;

    /// Return every document in the collection.
    async fn list_documents(&self) -> Result<Vec<Document>, SqlSageError>;

    /// Delete documents by ID. Unknown IDs are ignored.
    async fn delete(&self, ids: &[&str]) -> Result<(), SqlSageError>;

    /// Drop every document, leaving an empty collection behind.
    async fn reset(&self) -> Result<(), SqlSageError>;
}

// ---------------------------------------------------------------------------
// TrainingStore
// ---------------------------------------------------------------------------

/// Persistence for the three kinds of training data that ground SQL generation.
#[async_trait]
pub trait TrainingStore: Send + Sync {
    async fn add_question_sql(&self, question: &str, sql: &str) -> Result<String, SqlSageError>;

    async fn add_ddl(&self, ddl: &str) -> Result<String, SqlSageError>;

    async fn add_documentation(&self, documentation: &str) -> Result<String, SqlSageError>;

    /// All training records across kinds, normalized into rows.
    async fn get_training_data(&self) -> Result<Vec<TrainingRow>, SqlSageError>;

    /// Remove one record; the id suffix selects the collection.
    /// Returns `false` when the suffix is not recognized.
    async fn remove_training_data(&self, id: &str) -> Result<bool, SqlSageError>;

    /// Reset the named collection (`sql`, `ddl`, `documentation`) to empty.
    /// Returns `false` when the name is not recognized.
    async fn remove_collection(&self, name: &str) -> Result<bool, SqlSageError>;

    async fn get_similar_question_sql(
        &self,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, SqlSageError>;

    async fn get_related_ddl(
        &self,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, SqlSageError>;

    async fn get_related_documentation(
        &self,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, SqlSageError>;
}

// ---------------------------------------------------------------------------
// SqlGenerator / SqlRunner
// ---------------------------------------------------------------------------

/// Turns a natural-language question into SQL.
#[async_trait]
pub trait SqlGenerator: Send + Sync {
    async fn generate_sql(&self, question: &str) -> Result<String, SqlSageError>;

    /// Guess the business question a SQL statement answers.
    async fn generate_question(&self, sql: &str) -> Result<String, SqlSageError> {
        let _ = sql;
        Err(SqlSageError::Generation(
            "this generator cannot derive questions from SQL".to_string(),
        ))
    }
}

/// Executes SQL against the connected database.
#[async_trait]
pub trait SqlRunner: Send + Sync {
    async fn run_sql(&self, sql: &str) -> Result<QueryResult, SqlSageError>;

    /// Human-readable dialect name used in prompts.
    fn dialect(&self) -> &str {
        "SQL"
    }
}
