//! Question answering over a SQL database.
//!
//! [`LlmSqlGenerator`] grounds a chat model in retrieved training data,
//! [`Assistant`] runs the generated SQL, and [`bootstrap`] seeds the
//! training store from the database schema and an optional remote feed.

mod assistant;
mod bootstrap;
mod feed;
mod generator;
mod plan;

pub use assistant::{Answer, AskError, Assistant};
pub use bootstrap::{bootstrap, BootstrapOptions, BootstrapReport};
pub use feed::{parse_feed, FeedBatch, TrainingFeed};
pub use generator::{LlmSqlGenerator, PromptContext, SqlExtractor};
pub use plan::{TrainingPlan, TrainingPlanItem};
