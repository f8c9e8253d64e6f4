use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::SqlSageError;

/// Namespace for content-derived training ids.
const TRAINING_ID_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2b8e_5a43_4d0f_9c2e_7b1a_33d4_e8a5);

// ---------------------------------------------------------------------------
// TrainingKind
// ---------------------------------------------------------------------------

/// The three kinds of training data, each kept in its own collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainingKind {
    /// Question/SQL pairs.
    Sql,
    /// Schema definition snippets.
    Ddl,
    /// Free-text documentation.
    Documentation,
}

impl TrainingKind {
    pub const ALL: [TrainingKind; 3] = [
        TrainingKind::Sql,
        TrainingKind::Ddl,
        TrainingKind::Documentation,
    ];

    /// Collection name accepted by `remove_collection`.
    pub fn collection_name(self) -> &'static str {
        match self {
            TrainingKind::Sql => "sql",
            TrainingKind::Ddl => "ddl",
            TrainingKind::Documentation => "documentation",
        }
    }

    /// Suffix appended to every id of this kind.
    pub fn id_suffix(self) -> &'static str {
        match self {
            TrainingKind::Sql => "-sql",
            TrainingKind::Ddl => "-ddl",
            TrainingKind::Documentation => "-doc",
        }
    }

    /// Recover the kind from a training id's suffix.
    pub fn from_id(id: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| id.ends_with(kind.id_suffix()))
    }
}

impl fmt::Display for TrainingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.collection_name())
    }
}

impl FromStr for TrainingKind {
    type Err = SqlSageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.collection_name() == s)
            .ok_or_else(|| SqlSageError::Validation(format!("unknown training collection: {s}")))
    }
}

/// Deterministic id for a piece of training content.
///
/// Identical content and kind always produce the same id, so re-submitting
/// a record is an upsert.
pub fn training_id(content: &str, kind: TrainingKind) -> String {
    let uuid = Uuid::new_v5(&TRAINING_ID_NAMESPACE, content.as_bytes());
    format!("{}{}", uuid.hyphenated(), kind.id_suffix())
}

// ---------------------------------------------------------------------------
// QuestionSql
// ---------------------------------------------------------------------------

/// A natural-language question paired with the SQL that answers it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionSql {
    pub question: String,
    pub sql: String,
}

impl QuestionSql {
    pub fn new(question: impl Into<String>, sql: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            sql: sql.into(),
        }
    }

    /// The stored form of the pair. Its id is derived from this string.
    pub fn to_document(&self) -> Result<String, SqlSageError> {
        serde_json::to_string(self)
            .map_err(|e| SqlSageError::Parsing(format!("failed to serialize question/sql: {e}")))
    }

    pub fn from_document(content: &str) -> Option<Self> {
        serde_json::from_str(content).ok()
    }
}

// ---------------------------------------------------------------------------
// TrainingRow
// ---------------------------------------------------------------------------

/// One row of the tabular training-data listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub id: String,
    /// Only set for question/SQL rows.
    pub question: Option<String>,
    /// SQL for question/SQL rows, the raw text otherwise.
    pub content: String,
    #[serde(rename = "training_data_type")]
    pub kind: TrainingKind,
}

// ---------------------------------------------------------------------------
// RetrievedDocument
// ---------------------------------------------------------------------------

/// A document returned by a similarity query.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RetrievedDocument {
    /// The document was stored as a serialized JSON object.
    Structured(Value),
    Text(String),
}

impl RetrievedDocument {
    /// Parse stored content, keeping it as text unless it is a JSON object.
    pub fn parse(content: &str) -> Self {
        match serde_json::from_str::<Value>(content) {
            Ok(value @ Value::Object(_)) => RetrievedDocument::Structured(value),
            _ => RetrievedDocument::Text(content.to_string()),
        }
    }

    pub fn as_question_sql(&self) -> Option<QuestionSql> {
        match self {
            RetrievedDocument::Structured(value) => serde_json::from_value(value.clone()).ok(),
            RetrievedDocument::Text(_) => None,
        }
    }

    /// The document as prompt text.
    pub fn as_text(&self) -> String {
        match self {
            RetrievedDocument::Structured(value) => value.to_string(),
            RetrievedDocument::Text(text) => text.clone(),
        }
    }
}

/// Turn raw stored contents into retrieved documents.
pub fn extract_documents<'a, I>(contents: I) -> Vec<RetrievedDocument>
where
    I: IntoIterator<Item = &'a str>,
{
    contents.into_iter().map(RetrievedDocument::parse).collect()
}

// ---------------------------------------------------------------------------
// TrainingItem
// ---------------------------------------------------------------------------

/// One unit of training input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TrainingItem {
    QuestionSql { question: String, sql: String },
    /// SQL whose question has to be generated before storing.
    Sql { sql: String },
    Ddl { ddl: String },
    Documentation { documentation: String },
}

impl TrainingItem {
    pub fn kind(&self) -> TrainingKind {
        match self {
            TrainingItem::QuestionSql { .. } | TrainingItem::Sql { .. } => TrainingKind::Sql,
            TrainingItem::Ddl { .. } => TrainingKind::Ddl,
            TrainingItem::Documentation { .. } => TrainingKind::Documentation,
        }
    }
}
