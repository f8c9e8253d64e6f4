use std::collections::HashMap;
use std::time::Duration;

use sqlsage_core::SqlSageError;
use sqlsage_server::ServerConfig;

fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
    let vars: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    move |key| vars.get(key).cloned()
}

const MINIMAL: &[(&str, &str)] = &[
    ("OPENAI_APIKEY", "sk-test"),
    ("OPENAI_DEPLOYMENT", "gpt-4o-mini"),
    ("DATABASE_URL", "sqlite::memory:"),
];

#[test]
fn defaults_apply() {
    let config = ServerConfig::from_lookup(lookup(MINIMAL)).unwrap();
    assert_eq!(config.openai_base_url, "https://api.openai.com/v1");
    assert_eq!(config.embedding_model, "text-embedding-3-small");
    assert_eq!(config.dimensions(), 1536);
    assert_eq!(config.bind_address(), "0.0.0.0:8080");
    assert_eq!(config.answer_timeout, Duration::from_secs(60));
    assert!(!config.allow_llm_to_see_data);
    assert!(config.search.is_none());
    assert!(config.azure_openai_resource.is_none());
    assert!(config.bootstrap_query.is_none());
}

#[test]
fn legacy_names_are_fallbacks() {
    let config = ServerConfig::from_lookup(lookup(&[
        ("OPENAI_APIKEY", "sk-test"),
        ("OPENAI_DEPLOYMENT", "gpt-4o"),
        ("MSSQL_CONNECTION_STRING", "postgres://localhost/shop"),
        ("MSSQL_BOOTSTRAP_QUERY", "SELECT * FROM INFORMATION_SCHEMA.COLUMNS"),
    ]))
    .unwrap();
    assert_eq!(config.database_url, "postgres://localhost/shop");
    assert_eq!(
        config.bootstrap_query.as_deref(),
        Some("SELECT * FROM INFORMATION_SCHEMA.COLUMNS")
    );
}

#[test]
fn missing_required_values_are_config_errors() {
    let err = ServerConfig::from_lookup(lookup(&[("DATABASE_URL", "sqlite::memory:")]))
        .unwrap_err();
    assert!(matches!(err, SqlSageError::Config(_)));
    assert!(err.to_string().contains("OPENAI_APIKEY"));

    let err = ServerConfig::from_lookup(lookup(&[
        ("OPENAI_APIKEY", "sk-test"),
        ("OPENAI_DEPLOYMENT", "gpt-4o"),
        ("DATABASE_URL", "   "),
    ]))
    .unwrap_err();
    assert!(err.to_string().contains("DATABASE_URL"));
}

#[test]
fn search_requires_key() {
    let mut vars = MINIMAL.to_vec();
    vars.push(("SEARCH_ENDPOINT", "https://demo.search.windows.net"));
    let err = ServerConfig::from_lookup(lookup(&vars)).unwrap_err();
    assert!(err.to_string().contains("SEARCH_KEY"));

    vars.push(("SEARCH_KEY", "admin-key"));
    let search = ServerConfig::from_lookup(lookup(&vars))
        .unwrap()
        .search
        .unwrap();
    assert_eq!(search.endpoint, "https://demo.search.windows.net");
    assert_eq!(search.index_prefix, "sqlsage");
}

#[test]
fn overrides_are_parsed() {
    let mut vars = MINIMAL.to_vec();
    vars.extend([
        ("AZURE_OPENAI_RESOURCE", "contoso"),
        ("EMBEDDING_DIMENSIONS", "256"),
        ("PORT", "9000"),
        ("HOST", "127.0.0.1"),
        ("ANSWER_TIMEOUT_SECS", "5"),
        ("ALLOW_LLM_TO_SEE_DATA", "TRUE"),
    ]);
    let config = ServerConfig::from_lookup(lookup(&vars)).unwrap();
    assert_eq!(config.azure_openai_resource.as_deref(), Some("contoso"));
    assert_eq!(config.embedding_dimensions, Some(256));
    assert_eq!(config.bind_address(), "127.0.0.1:9000");
    assert_eq!(config.answer_timeout, Duration::from_secs(5));
    assert!(config.allow_llm_to_see_data);
}

#[test]
fn malformed_numbers_are_rejected() {
    let mut vars = MINIMAL.to_vec();
    vars.push(("PORT", "eighty"));
    let err = ServerConfig::from_lookup(lookup(&vars)).unwrap_err();
    assert!(err.to_string().contains("PORT"));

    let mut vars = MINIMAL.to_vec();
    vars.push(("ALLOW_LLM_TO_SEE_DATA", "maybe"));
    assert!(ServerConfig::from_lookup(lookup(&vars)).is_err());
}
