use sqlsage_core::SqlSageError;

use crate::{Assistant, TrainingFeed, TrainingPlan};

/// What a startup bootstrap stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BootstrapReport {
    /// Items trained from the schema plan (zero when the store was already populated).
    pub plan_items: usize,
    pub feed_items: usize,
    /// Feed entries that were malformed or failed to train.
    pub skipped: usize,
}

/// Inputs for [`bootstrap`].
pub struct BootstrapOptions {
    /// Information-schema style query run against the database.
    pub schema_query: String,
    pub feed: Option<TrainingFeed>,
}

impl BootstrapOptions {
    pub fn new(schema_query: impl Into<String>) -> Self {
        Self {
            schema_query: schema_query.into(),
            feed: None,
        }
    }

    pub fn with_feed(mut self, feed: TrainingFeed) -> Self {
        self.feed = Some(feed);
        self
    }
}

/// Seed the training store.
///
/// An empty store is trained from the database schema. The optional feed is
/// applied every time; content-derived ids make repeated items upserts. Feed
/// problems are logged and never fail the bootstrap.
pub async fn bootstrap(
    assistant: &Assistant,
    options: &BootstrapOptions,
) -> Result<BootstrapReport, SqlSageError> {
    let mut report = BootstrapReport::default();

    let existing = assistant.training_data().await?;
    if existing.is_empty() {
        let schema = assistant.runner().run_sql(&options.schema_query).await?;
        let plan = TrainingPlan::from_information_schema(&schema)?;
        tracing::info!(tables = plan.len(), "training from database schema");
        report.plan_items = assistant.train_plan(&plan).await?.len();
    } else {
        tracing::info!(
            records = existing.len(),
            "training store already populated, skipping schema plan"
        );
    }

    if let Some(feed) = &options.feed {
        match feed.fetch().await {
            Ok(batch) => {
                report.skipped += batch.skipped;
                for item in batch.items {
                    let kind = item.kind();
                    match assistant.train(item).await {
                        Ok(_) => report.feed_items += 1,
                        Err(e) => {
                            tracing::warn!(%kind, error = %e, "failed to train feed item");
                            report.skipped += 1;
                        }
                    }
                }
            }
            Err(e) => tracing::warn!(url = feed.url(), error = %e, "training feed unavailable"),
        }
    }

    tracing::info!(
        plan_items = report.plan_items,
        feed_items = report.feed_items,
        skipped = report.skipped,
        "bootstrap complete"
    );
    Ok(report)
}
