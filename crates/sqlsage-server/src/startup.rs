use std::sync::Arc;

use sqlsage_assistant::{bootstrap, Assistant, BootstrapOptions, LlmSqlGenerator, TrainingFeed};
use sqlsage_azure_search::AzureSearchIndexSet;
use sqlsage_core::{ChatModel, Embeddings, SqlSageError, TrainingStore};
use sqlsage_embeddings::CacheBackedEmbeddings;
use sqlsage_models::{HttpBackend, ProviderBackend};
use sqlsage_openai::{
    AzureOpenAiChatModel, AzureOpenAiConfig, AzureOpenAiEmbeddings, AzureOpenAiEmbeddingsConfig,
    OpenAiChatModel, OpenAiConfig, OpenAiEmbeddings, OpenAiEmbeddingsConfig,
};
use sqlsage_sql::SqlDatabase;
use sqlsage_vectorstores::VectorTrainingStore;

use crate::config::ServerConfig;

fn chat_model(config: &ServerConfig, backend: Arc<dyn ProviderBackend>) -> Arc<dyn ChatModel> {
    match &config.azure_openai_resource {
        Some(resource) => Arc::new(AzureOpenAiChatModel::new(
            AzureOpenAiConfig::new(
                config.openai_api_key.as_str(),
                resource.as_str(),
                config.openai_deployment.as_str(),
            ),
            backend,
        )),
        None => Arc::new(OpenAiChatModel::new(
            OpenAiConfig::new(
                config.openai_api_key.as_str(),
                config.openai_deployment.as_str(),
            )
            .with_base_url(config.openai_base_url.as_str()),
            backend,
        )),
    }
}

fn embeddings(config: &ServerConfig, backend: Arc<dyn ProviderBackend>) -> Arc<dyn Embeddings> {
    let inner: Arc<dyn Embeddings> = match &config.azure_openai_resource {
        Some(resource) => {
            let mut embeddings_config = AzureOpenAiEmbeddingsConfig::new(
                config.openai_api_key.as_str(),
                resource.as_str(),
                config.embedding_model.as_str(),
            )
            .with_model(config.embedding_model.as_str());
            if let Some(dimensions) = config.embedding_dimensions {
                embeddings_config = embeddings_config.with_dimensions(dimensions);
            }
            Arc::new(AzureOpenAiEmbeddings::new(embeddings_config, backend))
        }
        None => {
            let mut embeddings_config = OpenAiEmbeddingsConfig::new(config.openai_api_key.as_str())
                .with_model(config.embedding_model.as_str())
                .with_base_url(config.openai_base_url.as_str());
            if let Some(dimensions) = config.embedding_dimensions {
                embeddings_config = embeddings_config.with_dimensions(dimensions);
            }
            Arc::new(OpenAiEmbeddings::new(embeddings_config, backend))
        }
    };
    Arc::new(CacheBackedEmbeddings::new(inner))
}

async fn training_store(
    config: &ServerConfig,
    embeddings: Arc<dyn Embeddings>,
) -> Result<Arc<dyn TrainingStore>, SqlSageError> {
    let Some(search) = &config.search else {
        tracing::warn!("SEARCH_ENDPOINT not set, training data is kept in memory");
        return Ok(Arc::new(VectorTrainingStore::in_memory(embeddings)));
    };

    let indexes = AzureSearchIndexSet::from_prefix(
        search.endpoint.as_str(),
        search.api_key.as_str(),
        &search.index_prefix,
        config.dimensions(),
    );
    indexes.ensure_all().await?;
    tracing::info!(
        endpoint = %search.endpoint,
        prefix = %search.index_prefix,
        "using Azure AI Search training store"
    );
    Ok(Arc::new(VectorTrainingStore::new(
        indexes.sql.clone(),
        indexes.ddl.clone(),
        indexes.documentation.clone(),
        embeddings,
    )))
}

/// Wire the model, store and database together and seed the training data.
pub async fn initialize(config: &ServerConfig) -> Result<Arc<Assistant>, SqlSageError> {
    let backend: Arc<dyn ProviderBackend> = Arc::new(HttpBackend::new());
    let model = chat_model(config, backend.clone());
    let store = training_store(config, embeddings(config, backend)).await?;

    let db = Arc::new(SqlDatabase::connect(&config.database_url).await?);
    tracing::info!(dialect = %db.sql_dialect(), "connected to database");

    let generator = LlmSqlGenerator::new(model, store.clone())?
        .with_runner(db.clone())
        .with_allow_llm_to_see_data(config.allow_llm_to_see_data);
    let assistant = Arc::new(Assistant::new(store, Arc::new(generator), db.clone()));

    let schema_query = config
        .bootstrap_query
        .clone()
        .unwrap_or_else(|| db.sql_dialect().schema_query().to_string());
    let mut options = BootstrapOptions::new(schema_query);
    if let Some(url) = &config.training_endpoint {
        options = options.with_feed(TrainingFeed::new(url.as_str()));
    }
    bootstrap(&assistant, &options).await?;

    Ok(assistant)
}
