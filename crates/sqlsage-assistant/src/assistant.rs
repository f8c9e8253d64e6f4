use std::sync::Arc;

use sqlsage_core::{
    QueryResult, SqlGenerator, SqlRunner, SqlSageError, TrainingItem, TrainingRow, TrainingStore,
};
use thiserror::Error;

use crate::TrainingPlan;

/// A generated query and its result set.
#[derive(Debug, Clone, PartialEq)]
pub struct Answer {
    pub sql: String,
    pub result: QueryResult,
}

/// Why a question could not be answered.
///
/// Execution failures carry the SQL that was generated, so callers can show
/// what was attempted.
#[derive(Debug, Error)]
pub enum AskError {
    #[error("could not generate SQL: {source}")]
    Generation { source: SqlSageError },
    #[error("generated SQL failed: {source}")]
    Execution { sql: String, source: SqlSageError },
}

/// Ties the training store, SQL generator and database together.
pub struct Assistant {
    store: Arc<dyn TrainingStore>,
    generator: Arc<dyn SqlGenerator>,
    runner: Arc<dyn SqlRunner>,
}

impl Assistant {
    pub fn new(
        store: Arc<dyn TrainingStore>,
        generator: Arc<dyn SqlGenerator>,
        runner: Arc<dyn SqlRunner>,
    ) -> Self {
        Self {
            store,
            generator,
            runner,
        }
    }

    pub fn store(&self) -> &Arc<dyn TrainingStore> {
        &self.store
    }

    pub fn runner(&self) -> &Arc<dyn SqlRunner> {
        &self.runner
    }

    /// Store one training item and return its id.
    ///
    /// SQL without a question gets one generated first.
    pub async fn train(&self, item: TrainingItem) -> Result<String, SqlSageError> {
        match item {
            TrainingItem::QuestionSql { question, sql } => {
                self.store.add_question_sql(&question, &sql).await
            }
            TrainingItem::Sql { sql } => {
                let question = self.generator.generate_question(&sql).await?;
                tracing::debug!(%question, "generated question for training SQL");
                self.store.add_question_sql(&question, &sql).await
            }
            TrainingItem::Ddl { ddl } => self.store.add_ddl(&ddl).await,
            TrainingItem::Documentation { documentation } => {
                self.store.add_documentation(&documentation).await
            }
        }
    }

    /// Train every item of a plan, in order.
    pub async fn train_plan(&self, plan: &TrainingPlan) -> Result<Vec<String>, SqlSageError> {
        let mut ids = Vec::with_capacity(plan.len());
        for item in plan.items() {
            tracing::info!("{}", item.summary());
            ids.push(self.train(item.to_training_item()).await?);
        }
        Ok(ids)
    }

    pub async fn training_data(&self) -> Result<Vec<TrainingRow>, SqlSageError> {
        self.store.get_training_data().await
    }

    pub async fn generate_sql(&self, question: &str) -> Result<String, SqlSageError> {
        self.generator.generate_sql(question).await
    }

    /// Generate SQL for the question and run it.
    pub async fn ask(&self, question: &str) -> Result<Answer, AskError> {
        let sql = self
            .generator
            .generate_sql(question)
            .await
            .map_err(|source| AskError::Generation { source })?;
        tracing::info!(%sql, "generated SQL");

        match self.runner.run_sql(&sql).await {
            Ok(result) => Ok(Answer { sql, result }),
            Err(source) => Err(AskError::Execution { sql, source }),
        }
    }
}
