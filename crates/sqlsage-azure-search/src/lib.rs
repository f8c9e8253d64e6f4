mod index;
mod set;

pub use index::{AzureSearchConfig, AzureSearchIndex};
pub use set::{index_name, AzureSearchIndexSet};
