use std::collections::HashMap;

use serde_json::json;
use sqlsage_azure_search::{index_name, AzureSearchConfig, AzureSearchIndex, AzureSearchIndexSet};
use sqlsage_core::{Document, TrainingKind};

fn index() -> AzureSearchIndex {
    AzureSearchIndex::new(AzureSearchConfig::new(
        "https://svc.search.windows.net/",
        "secret",
        "sqlsage-sql",
        4,
    ))
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

#[test]
fn config_new_sets_defaults() {
    let config = AzureSearchConfig::new("https://svc.search.windows.net", "k", "idx", 1536);
    assert_eq!(config.index_name, "idx");
    assert_eq!(config.dimensions, 1536);
    assert_eq!(config.api_version, "2024-07-01");
    assert_eq!(config.vector_field, "embedding");
    assert_eq!(config.content_field, "content");
}

#[test]
fn config_builder_chain() {
    let config = AzureSearchConfig::new("https://svc", "k", "idx", 8)
        .with_api_version("2025-05-01-preview")
        .with_vector_field("vec")
        .with_content_field("text");
    assert_eq!(config.api_version, "2025-05-01-preview");
    assert_eq!(config.vector_field, "vec");
    assert_eq!(config.content_field, "text");
}

// ---------------------------------------------------------------------------
// Request shaping
// ---------------------------------------------------------------------------

#[test]
fn urls_carry_index_and_api_version() {
    let index = index();
    assert_eq!(
        index.url(""),
        "https://svc.search.windows.net/indexes/sqlsage-sql?api-version=2024-07-01"
    );
    assert_eq!(
        index.url("/docs/search"),
        "https://svc.search.windows.net/indexes/sqlsage-sql/docs/search?api-version=2024-07-01"
    );
}

#[test]
fn index_definition_has_fixed_schema() {
    let def = index().index_definition();
    assert_eq!(def["name"], "sqlsage-sql");

    let fields = def["fields"].as_array().unwrap();
    let names: Vec<&str> = fields.iter().map(|f| f["name"].as_str().unwrap()).collect();
    assert_eq!(names, vec!["id", "content", "metadata", "embedding"]);
    assert_eq!(fields[0]["key"], true);
    assert_eq!(fields[0]["filterable"], true);
    assert_eq!(fields[1]["searchable"], true);
    assert_eq!(fields[2]["searchable"], false);
    assert_eq!(fields[3]["type"], "Collection(Edm.Single)");
    assert_eq!(fields[3]["dimensions"], 4);

    let profile = &def["vectorSearch"]["profiles"][0];
    assert_eq!(fields[3]["vectorSearchProfile"], profile["name"]);
    assert_eq!(def["vectorSearch"]["algorithms"][0]["kind"], "hnsw");
}

#[test]
fn upload_batch_uses_merge_or_upload() {
    let index = index();
    let metadata = HashMap::from([("training_data_type".to_string(), json!("sql"))]);
    let docs = vec![Document::with_metadata("abc-sql", "{\"question\":\"q\"}", metadata)];
    let batch = index.upload_batch(&docs, &[vec![0.1, 0.2, 0.3, 0.4]]);

    let action = &batch["value"][0];
    assert_eq!(action["@search.action"], "mergeOrUpload");
    assert_eq!(action["id"], "abc-sql");
    assert_eq!(action["content"], "{\"question\":\"q\"}");
    assert_eq!(action["embedding"].as_array().unwrap().len(), 4);
    // metadata travels as a JSON string
    let meta: serde_json::Value =
        serde_json::from_str(action["metadata"].as_str().unwrap()).unwrap();
    assert_eq!(meta["training_data_type"], "sql");
}

#[test]
fn vector_query_targets_embedding_field() {
    let body = index().vector_query(&[1.0, 0.0, 0.0, 0.0], 5);
    assert_eq!(body["top"], 5);
    assert_eq!(body["select"], "id,content,metadata");
    let vq = &body["vectorQueries"][0];
    assert_eq!(vq["kind"], "vector");
    assert_eq!(vq["k"], 5);
    assert_eq!(vq["fields"], "embedding");
}

// ---------------------------------------------------------------------------
// Response parsing
// ---------------------------------------------------------------------------

#[test]
fn parse_search_results_reads_hits() {
    let body = json!({
        "value": [
            {"@search.score": 0.9, "id": "a-ddl", "content": "CREATE TABLE a (x INT)", "metadata": "{\"k\":1}"},
            {"@search.score": 0.4, "id": "b-ddl", "content": "CREATE TABLE b (y INT)", "metadata": null}
        ]
    });
    let results = index().parse_search_results(&body);
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0.id, "a-ddl");
    assert!((results[0].1 - 0.9).abs() < 1e-6);
    assert_eq!(results[0].0.metadata["k"], 1);
    assert!(results[1].0.metadata.is_empty());
}

#[test]
fn malformed_results_are_empty() {
    let index = index();
    assert!(index.parse_search_results(&json!({})).is_empty());
    assert!(index
        .parse_search_results(&json!({"value": "nope"}))
        .is_empty());
    assert!(index.parse_search_results(&serde_json::Value::Null).is_empty());
    // hits without an id are skipped
    assert!(index
        .parse_search_results(&json!({"value": [{"content": "x"}]}))
        .is_empty());
}

// ---------------------------------------------------------------------------
// Index set
// ---------------------------------------------------------------------------

#[test]
fn index_names_follow_prefix() {
    assert_eq!(index_name("SqlSage", TrainingKind::Sql), "sqlsage-sql");
    assert_eq!(
        index_name("prod", TrainingKind::Documentation),
        "prod-documentation"
    );

    let set = AzureSearchIndexSet::from_prefix("https://svc", "k", "prod", 1536);
    assert_eq!(set.ddl.config().index_name, "prod-ddl");
    assert_eq!(set.get(TrainingKind::Sql).config().index_name, "prod-sql");
    assert_eq!(set.documentation.config().dimensions, 1536);
}

// ---------------------------------------------------------------------------
// Integration (requires a live service)
// ---------------------------------------------------------------------------

#[tokio::test]
#[ignore = "requires AZURE_SEARCH_ENDPOINT and AZURE_SEARCH_KEY"]
async fn round_trip_against_live_service() {
    use sqlsage_core::VectorStore;
    use sqlsage_embeddings::FakeEmbeddings;

    let endpoint = std::env::var("AZURE_SEARCH_ENDPOINT").unwrap();
    let key = std::env::var("AZURE_SEARCH_KEY").unwrap();
    let embeddings = FakeEmbeddings::new(16);
    let index = AzureSearchIndex::new(AzureSearchConfig::new(
        endpoint,
        key,
        "sqlsage-it-ddl",
        16,
    ));

    index.reset().await.unwrap();
    index
        .add_documents(
            vec![Document::new("one-ddl", "CREATE TABLE orders (id INT)")],
            &embeddings,
        )
        .await
        .unwrap();

    let results = index
        .similarity_search("orders", 1, &embeddings)
        .await
        .unwrap();
    assert_eq!(results[0].id, "one-ddl");

    index.delete(&["one-ddl"]).await.unwrap();
    index.reset().await.unwrap();
    assert!(index.list_documents().await.unwrap().is_empty());
}
