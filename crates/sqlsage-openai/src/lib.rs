mod azure;
mod chat_model;
mod embeddings;

pub use azure::{
    AzureOpenAiChatModel, AzureOpenAiConfig, AzureOpenAiEmbeddings, AzureOpenAiEmbeddingsConfig,
};
pub use chat_model::{OpenAiChatModel, OpenAiConfig};
pub use embeddings::{OpenAiEmbeddings, OpenAiEmbeddingsConfig};
