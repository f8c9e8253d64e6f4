//! SQL execution for SqlSage.
//!
//! [`SqlDatabase`] wraps a sqlx `Any` pool so one binary can talk to SQLite,
//! PostgreSQL or MySQL depending on the connection URL. Result sets come
//! back as [`QueryResult`] with loosely typed JSON cells.

mod dialect;

pub use dialect::SqlDialect;

use async_trait::async_trait;
use serde_json::{json, Value};
use sqlsage_core::{QueryResult, SqlRunner, SqlSageError};
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Column, Executor, Row};

/// A connected database that executes generated SQL.
pub struct SqlDatabase {
    pool: AnyPool,
    dialect: SqlDialect,
}

impl SqlDatabase {
    /// Connect using a sqlx URL (`sqlite::memory:`, `postgres://...`, `mysql://...`).
    ///
    /// In-memory SQLite databases live and die with their connection, so such
    /// URLs get a pool of exactly one connection that is never recycled.
    pub async fn connect(url: &str) -> Result<Self, SqlSageError> {
        sqlx::any::install_default_drivers();
        let dialect = SqlDialect::from_url(url);

        let options = if is_sqlite_memory(url) {
            AnyPoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            AnyPoolOptions::new().max_connections(5)
        };

        let pool = options.connect(url).await.map_err(|e| {
            SqlSageError::Database(format!("failed to connect to {} database: {e}", dialect))
        })?;

        tracing::info!(dialect = %dialect, "connected to database");
        Ok(Self { pool, dialect })
    }

    pub fn from_pool(pool: AnyPool, dialect: SqlDialect) -> Self {
        Self { pool, dialect }
    }

    pub fn pool(&self) -> &AnyPool {
        &self.pool
    }

    pub fn sql_dialect(&self) -> SqlDialect {
        self.dialect
    }

    /// Execute a statement that returns no rows; yields the affected row count.
    pub async fn execute(&self, sql: &str) -> Result<u64, SqlSageError> {
        let result = sqlx::query(sql)
            .execute(&self.pool)
            .await
            .map_err(|e| SqlSageError::Database(format!("statement failed: {e}")))?;
        Ok(result.rows_affected())
    }

    /// Column names of a statement, read from its prepared description.
    ///
    /// Used for empty result sets, where no row carries the columns.
    async fn describe_columns(&self, sql: &str) -> Vec<String> {
        match (&self.pool).describe(sql).await {
            Ok(describe) => describe
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect(),
            Err(e) => {
                tracing::debug!(error = %e, "could not describe statement, columns unknown");
                Vec::new()
            }
        }
    }
}

fn is_sqlite_memory(url: &str) -> bool {
    url.starts_with("sqlite:") && (url.contains(":memory:") || url.contains("mode=memory"))
}

/// Decode one cell, trying the types the `Any` driver can represent.
fn decode_cell(row: &AnyRow, index: usize) -> Value {
    if let Ok(v) = row.try_get::<Option<i64>, _>(index) {
        return v.map_or(Value::Null, |v| json!(v));
    }
    if let Ok(v) = row.try_get::<Option<f64>, _>(index) {
        return v.map_or(Value::Null, |v| json!(v));
    }
    if let Ok(v) = row.try_get::<Option<bool>, _>(index) {
        return v.map_or(Value::Null, Value::Bool);
    }
    if let Ok(v) = row.try_get::<Option<String>, _>(index) {
        return v.map_or(Value::Null, Value::String);
    }
    if let Ok(v) = row.try_get::<Option<Vec<u8>>, _>(index) {
        return v.map_or(Value::Null, |bytes| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        });
    }
    Value::Null
}

fn to_query_result(first: &AnyRow, rows: &[AnyRow]) -> QueryResult {
    let columns: Vec<String> = first
        .columns()
        .iter()
        .map(|c| c.name().to_string())
        .collect();
    let data = rows
        .iter()
        .map(|row| (0..columns.len()).map(|i| decode_cell(row, i)).collect())
        .collect();
    QueryResult::new(columns, data)
}

#[async_trait]
impl SqlRunner for SqlDatabase {
    async fn run_sql(&self, sql: &str) -> Result<QueryResult, SqlSageError> {
        let rows = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| SqlSageError::Database(format!("query execution error: {e}")))?;
        tracing::debug!(rows = rows.len(), "query executed");
        match rows.first() {
            Some(first) => Ok(to_query_result(first, &rows)),
            None => Ok(QueryResult::new(self.describe_columns(sql).await, Vec::new())),
        }
    }

    fn dialect(&self) -> &str {
        self.dialect.name()
    }
}
