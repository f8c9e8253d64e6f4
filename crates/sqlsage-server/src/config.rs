use std::time::Duration;

use sqlsage_core::SqlSageError;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";
const DEFAULT_EMBEDDING_DIMENSIONS: usize = 1536;
const DEFAULT_INDEX_PREFIX: &str = "sqlsage";

/// Azure AI Search connection for the training store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchConfig {
    pub endpoint: String,
    pub api_key: String,
    pub index_prefix: String,
}

/// Everything the service reads from its environment.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerConfig {
    pub openai_api_key: String,
    /// Chat model name, or the deployment name on Azure OpenAI.
    pub openai_deployment: String,
    pub openai_base_url: String,
    /// When set, chat and embeddings go to this Azure OpenAI resource.
    pub azure_openai_resource: Option<String>,
    pub embedding_model: String,
    /// Explicit vector size; also sent to the embeddings API when set.
    pub embedding_dimensions: Option<usize>,
    pub database_url: String,
    pub bootstrap_query: Option<String>,
    pub training_endpoint: Option<String>,
    /// `None` keeps training data in memory.
    pub search: Option<SearchConfig>,
    pub host: String,
    pub port: u16,
    pub answer_timeout: Duration,
    pub allow_llm_to_see_data: bool,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, SqlSageError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, SqlSageError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let required = |key: &str| {
            get(key).ok_or_else(|| SqlSageError::Config(format!("{key} is not set")))
        };

        let database_url = get("DATABASE_URL")
            .or_else(|| get("MSSQL_CONNECTION_STRING"))
            .ok_or_else(|| SqlSageError::Config("DATABASE_URL is not set".to_string()))?;

        let search = match get("SEARCH_ENDPOINT") {
            Some(endpoint) => Some(SearchConfig {
                endpoint,
                api_key: get("SEARCH_KEY").ok_or_else(|| {
                    SqlSageError::Config(
                        "SEARCH_KEY is required when SEARCH_ENDPOINT is set".to_string(),
                    )
                })?,
                index_prefix: get("SEARCH_INDEX_PREFIX")
                    .unwrap_or_else(|| DEFAULT_INDEX_PREFIX.to_string()),
            }),
            None => None,
        };

        Ok(Self {
            openai_api_key: required("OPENAI_APIKEY")?,
            openai_deployment: required("OPENAI_DEPLOYMENT")?,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            azure_openai_resource: get("AZURE_OPENAI_RESOURCE"),
            embedding_model: get("OPENAI_EMBEDDING_MODEL")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            embedding_dimensions: parse_opt(get("EMBEDDING_DIMENSIONS"), "EMBEDDING_DIMENSIONS")?,
            database_url,
            bootstrap_query: get("BOOTSTRAP_QUERY").or_else(|| get("MSSQL_BOOTSTRAP_QUERY")),
            training_endpoint: get("TRAINING_ENDPOINT"),
            search,
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_opt(get("PORT"), "PORT")?.unwrap_or(8080),
            answer_timeout: Duration::from_secs(
                parse_opt(get("ANSWER_TIMEOUT_SECS"), "ANSWER_TIMEOUT_SECS")?.unwrap_or(60),
            ),
            allow_llm_to_see_data: parse_flag(
                get("ALLOW_LLM_TO_SEE_DATA"),
                "ALLOW_LLM_TO_SEE_DATA",
            )?,
        })
    }

    pub fn dimensions(&self) -> usize {
        self.embedding_dimensions.unwrap_or(DEFAULT_EMBEDDING_DIMENSIONS)
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_opt<T: std::str::FromStr>(
    value: Option<String>,
    key: &str,
) -> Result<Option<T>, SqlSageError> {
    value
        .map(|v| {
            v.parse()
                .map_err(|_| SqlSageError::Config(format!("{key} has invalid value {v:?}")))
        })
        .transpose()
}

fn parse_flag(value: Option<String>, key: &str) -> Result<bool, SqlSageError> {
    match value.as_deref().map(str::to_ascii_lowercase).as_deref() {
        None => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some("0" | "false" | "no" | "off") => Ok(false),
        Some(other) => Err(SqlSageError::Config(format!(
            "{key} has invalid value {other:?}"
        ))),
    }
}
