use std::sync::Arc;

use sqlsage_core::{SqlSageError, TrainingKind};

use crate::{AzureSearchConfig, AzureSearchIndex};

/// Index name for one training collection, e.g. `sqlsage-documentation`.
///
/// Azure index names must be lowercase.
pub fn index_name(prefix: &str, kind: TrainingKind) -> String {
    format!("{}-{}", prefix.to_lowercase(), kind.collection_name())
}

/// The three indexes holding question/SQL pairs, DDL and documentation.
pub struct AzureSearchIndexSet {
    pub sql: Arc<AzureSearchIndex>,
    pub ddl: Arc<AzureSearchIndex>,
    pub documentation: Arc<AzureSearchIndex>,
}

impl AzureSearchIndexSet {
    /// Build the indexes `{prefix}-sql`, `{prefix}-ddl` and
    /// `{prefix}-documentation` on one search service.
    pub fn from_prefix(
        endpoint: impl Into<String>,
        api_key: impl Into<String>,
        prefix: &str,
        dimensions: usize,
    ) -> Self {
        let endpoint = endpoint.into();
        let api_key = api_key.into();
        let client = reqwest::Client::new();
        let make = |kind: TrainingKind| {
            Arc::new(AzureSearchIndex::with_client(
                AzureSearchConfig::new(
                    endpoint.clone(),
                    api_key.clone(),
                    index_name(prefix, kind),
                    dimensions,
                ),
                client.clone(),
            ))
        };

        Self {
            sql: make(TrainingKind::Sql),
            ddl: make(TrainingKind::Ddl),
            documentation: make(TrainingKind::Documentation),
        }
    }

    pub fn get(&self, kind: TrainingKind) -> &Arc<AzureSearchIndex> {
        match kind {
            TrainingKind::Sql => &self.sql,
            TrainingKind::Ddl => &self.ddl,
            TrainingKind::Documentation => &self.documentation,
        }
    }

    /// Create any of the three indexes that do not exist yet.
    pub async fn ensure_all(&self) -> Result<(), SqlSageError> {
        for kind in TrainingKind::ALL {
            self.get(kind).ensure_index().await?;
        }
        Ok(())
    }
}
