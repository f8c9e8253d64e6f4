mod in_memory;
mod training;

pub use in_memory::InMemoryVectorStore;
pub use training::VectorTrainingStore;

// Re-export core traits for convenience.
pub use sqlsage_core::{Document, Embeddings, TrainingStore, VectorStore};
