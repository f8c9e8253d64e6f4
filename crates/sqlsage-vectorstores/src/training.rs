use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use sqlsage_core::{
    extract_documents, training_id, Document, Embeddings, QuestionSql, RetrievedDocument,
    SqlSageError, TrainingKind, TrainingRow, TrainingStore, VectorStore,
};

use crate::InMemoryVectorStore;

/// Training data kept in three vector collections, one per [`TrainingKind`].
///
/// Any [`VectorStore`] backend can hold the collections; ids, suffix
/// dispatch and row normalization are handled here.
pub struct VectorTrainingStore {
    sql: Arc<dyn VectorStore>,
    ddl: Arc<dyn VectorStore>,
    documentation: Arc<dyn VectorStore>,
    embeddings: Arc<dyn Embeddings>,
}

impl VectorTrainingStore {
    pub fn new(
        sql: Arc<dyn VectorStore>,
        ddl: Arc<dyn VectorStore>,
        documentation: Arc<dyn VectorStore>,
        embeddings: Arc<dyn Embeddings>,
    ) -> Self {
        Self {
            sql,
            ddl,
            documentation,
            embeddings,
        }
    }

    /// A store whose collections live in process memory.
    pub fn in_memory(embeddings: Arc<dyn Embeddings>) -> Self {
        Self::new(
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(InMemoryVectorStore::new()),
            Arc::new(InMemoryVectorStore::new()),
            embeddings,
        )
    }

    fn collection(&self, kind: TrainingKind) -> &Arc<dyn VectorStore> {
        match kind {
            TrainingKind::Sql => &self.sql,
            TrainingKind::Ddl => &self.ddl,
            TrainingKind::Documentation => &self.documentation,
        }
    }

    async fn upsert(&self, kind: TrainingKind, content: String) -> Result<String, SqlSageError> {
        let id = training_id(&content, kind);
        let metadata = HashMap::from([(
            "training_data_type".to_string(),
            Value::String(kind.collection_name().to_string()),
        )]);
        let doc = Document::with_metadata(id.clone(), content, metadata);
        self.collection(kind)
            .add_documents(vec![doc], self.embeddings.as_ref())
            .await?;
        tracing::debug!(%id, %kind, "stored training record");
        Ok(id)
    }

    async fn related(
        &self,
        kind: TrainingKind,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, SqlSageError> {
        if k == 0 {
            return Ok(Vec::new());
        }
        let docs = self
            .collection(kind)
            .similarity_search(question, k, self.embeddings.as_ref())
            .await?;
        Ok(extract_documents(docs.iter().map(|d| d.content.as_str())))
    }
}

fn to_row(kind: TrainingKind, doc: Document) -> TrainingRow {
    match kind {
        TrainingKind::Sql => match QuestionSql::from_document(&doc.content) {
            Some(pair) => TrainingRow {
                id: doc.id,
                question: Some(pair.question),
                content: pair.sql,
                kind,
            },
            None => {
                tracing::warn!(id = %doc.id, "stored question/sql record is not valid JSON");
                TrainingRow {
                    id: doc.id,
                    question: None,
                    content: doc.content,
                    kind,
                }
            }
        },
        TrainingKind::Ddl | TrainingKind::Documentation => TrainingRow {
            id: doc.id,
            question: None,
            content: doc.content,
            kind,
        },
    }
}

#[async_trait]
impl TrainingStore for VectorTrainingStore {
    async fn add_question_sql(&self, question: &str, sql: &str) -> Result<String, SqlSageError> {
        let content = QuestionSql::new(question, sql).to_document()?;
        self.upsert(TrainingKind::Sql, content).await
    }

    async fn add_ddl(&self, ddl: &str) -> Result<String, SqlSageError> {
        self.upsert(TrainingKind::Ddl, ddl.to_string()).await
    }

    async fn add_documentation(&self, documentation: &str) -> Result<String, SqlSageError> {
        self.upsert(TrainingKind::Documentation, documentation.to_string())
            .await
    }

    async fn get_training_data(&self) -> Result<Vec<TrainingRow>, SqlSageError> {
        let mut rows = Vec::new();
        for kind in TrainingKind::ALL {
            let docs = self.collection(kind).list_documents().await?;
            rows.extend(docs.into_iter().map(|doc| to_row(kind, doc)));
        }
        Ok(rows)
    }

    async fn remove_training_data(&self, id: &str) -> Result<bool, SqlSageError> {
        let Some(kind) = TrainingKind::from_id(id) else {
            tracing::debug!(%id, "unrecognized training id suffix");
            return Ok(false);
        };
        self.collection(kind).delete(&[id]).await?;
        Ok(true)
    }

    async fn remove_collection(&self, name: &str) -> Result<bool, SqlSageError> {
        let Ok(kind) = name.parse::<TrainingKind>() else {
            return Ok(false);
        };
        self.collection(kind).reset().await?;
        tracing::info!(collection = name, "training collection reset");
        Ok(true)
    }

    async fn get_similar_question_sql(
        &self,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, SqlSageError> {
        self.related(TrainingKind::Sql, question, k).await
    }

    async fn get_related_ddl(
        &self,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, SqlSageError> {
        self.related(TrainingKind::Ddl, question, k).await
    }

    async fn get_related_documentation(
        &self,
        question: &str,
        k: usize,
    ) -> Result<Vec<RetrievedDocument>, SqlSageError> {
        self.related(TrainingKind::Documentation, question, k).await
    }
}
