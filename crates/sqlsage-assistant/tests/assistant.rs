use std::sync::Arc;

use serde_json::json;
use sqlsage_assistant::{
    bootstrap, AskError, Assistant, BootstrapOptions, BootstrapReport, LlmSqlGenerator,
    TrainingFeed,
};
use sqlsage_core::{TrainingItem, TrainingKind, TrainingStore};
use sqlsage_embeddings::FakeEmbeddings;
use sqlsage_models::ScriptedChatModel;
use sqlsage_sql::SqlDatabase;
use sqlsage_vectorstores::VectorTrainingStore;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

struct Fixture {
    assistant: Assistant,
    model: ScriptedChatModel,
    db: Arc<SqlDatabase>,
}

async fn fixture<I, S>(replies: I) -> Fixture
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let db = SqlDatabase::connect("sqlite::memory:").await.unwrap();
    db.execute("CREATE TABLE customers (id INTEGER, name TEXT)")
        .await
        .unwrap();
    db.execute("CREATE TABLE orders (id INTEGER, customer_id INTEGER, total REAL)")
        .await
        .unwrap();
    db.execute("INSERT INTO customers VALUES (1, 'Ada'), (2, 'Grace')")
        .await
        .unwrap();
    let db = Arc::new(db);

    let model = ScriptedChatModel::from_replies(replies);
    let store: Arc<dyn TrainingStore> = Arc::new(VectorTrainingStore::in_memory(Arc::new(
        FakeEmbeddings::default(),
    )));
    let generator = LlmSqlGenerator::new(Arc::new(model.clone()), store.clone())
        .unwrap()
        .with_runner(db.clone());
    let assistant = Assistant::new(store, Arc::new(generator), db.clone());
    Fixture {
        assistant,
        model,
        db,
    }
}

#[tokio::test]
async fn ask_runs_generated_sql() {
    let fx = fixture(["```sql\nSELECT name FROM customers ORDER BY id\n```"]).await;

    let answer = fx.assistant.ask("List customer names").await.unwrap();
    assert_eq!(answer.sql, "SELECT name FROM customers ORDER BY id");
    assert_eq!(answer.result.columns, vec!["name"]);
    assert_eq!(answer.result.rows, vec![vec![json!("Ada")], vec![json!("Grace")]]);
}

#[tokio::test]
async fn ask_reports_generation_failure() {
    let fx = fixture(["Sorry, I do not know."]).await;
    let err = fx.assistant.ask("Weather?").await.unwrap_err();
    assert!(matches!(err, AskError::Generation { .. }));
}

#[tokio::test]
async fn ask_reports_failing_sql_with_the_query() {
    let fx = fixture(["SELECT * FROM invoices"]).await;
    match fx.assistant.ask("Show invoices").await.unwrap_err() {
        AskError::Execution { sql, source } => {
            assert_eq!(sql, "SELECT * FROM invoices");
            assert!(source.to_string().contains("invoices"), "{source}");
        }
        other => panic!("expected execution error, got {other}"),
    }
}

#[tokio::test]
async fn training_bare_sql_generates_its_question() {
    let fx = fixture(["How many customers are there?"]).await;

    let id = fx
        .assistant
        .train(TrainingItem::Sql {
            sql: "SELECT COUNT(*) FROM customers".into(),
        })
        .await
        .unwrap();
    assert!(id.ends_with("-sql"));

    let rows = fx.assistant.training_data().await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].question.as_deref(), Some("How many customers are there?"));
    assert_eq!(rows[0].content, "SELECT COUNT(*) FROM customers");
    assert_eq!(fx.model.requests().await.len(), 1);
}

#[tokio::test]
async fn training_items_of_each_kind() {
    let fx = fixture(Vec::<String>::new()).await;
    let items = [
        TrainingItem::QuestionSql {
            question: "Customer count?".into(),
            sql: "SELECT COUNT(*) FROM customers".into(),
        },
        TrainingItem::Ddl {
            ddl: "CREATE TABLE customers (id INTEGER, name TEXT)".into(),
        },
        TrainingItem::Documentation {
            documentation: "Customers are never deleted".into(),
        },
    ];
    for item in items {
        let kind = item.kind();
        let id = fx.assistant.train(item).await.unwrap();
        assert_eq!(TrainingKind::from_id(&id), Some(kind));
    }
    assert_eq!(fx.assistant.training_data().await.unwrap().len(), 3);
}

#[tokio::test]
async fn bootstrap_trains_schema_into_empty_store() {
    let fx = fixture(Vec::<String>::new()).await;
    let options = BootstrapOptions::new(fx.db.sql_dialect().schema_query());

    let report = bootstrap(&fx.assistant, &options).await.unwrap();
    assert_eq!(report.plan_items, 2);
    assert_eq!(report.feed_items, 0);

    let rows = fx.assistant.training_data().await.unwrap();
    assert_eq!(rows.len(), 2);
    assert!(rows.iter().all(|r| r.kind == TrainingKind::Documentation));
    assert!(rows.iter().any(|r| r
        .content
        .starts_with("The following columns are in the orders table in the main database:")));
}

#[tokio::test]
async fn bootstrap_skips_schema_when_store_has_data() {
    let fx = fixture(Vec::<String>::new()).await;
    fx.assistant
        .train(TrainingItem::Documentation {
            documentation: "Existing knowledge".into(),
        })
        .await
        .unwrap();

    let report = bootstrap(&fx.assistant, &BootstrapOptions::new("SELECT * FROM nowhere"))
        .await
        .unwrap();
    assert_eq!(report.plan_items, 0);
    assert_eq!(fx.assistant.training_data().await.unwrap().len(), 1);
}

#[tokio::test]
async fn bootstrap_applies_feed_items() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/training.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "items": [
                {"type": "question", "documentation": "Who are our customers?", "query": "SELECT name FROM customers"},
                {"type": "documentation", "documentation": "Totals include VAT"},
                {"type": "question", "documentation": "missing query"}
            ]
        })))
        .mount(&server)
        .await;

    let fx = fixture(Vec::<String>::new()).await;
    let options = BootstrapOptions::new(fx.db.sql_dialect().schema_query())
        .with_feed(TrainingFeed::new(format!("{}/training.json", server.uri())));

    let report = bootstrap(&fx.assistant, &options).await.unwrap();
    assert_eq!(report.plan_items, 2);
    assert_eq!(report.feed_items, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(fx.assistant.training_data().await.unwrap().len(), 4);

    // Replaying the feed upserts the same ids.
    let again = bootstrap(&fx.assistant, &options).await.unwrap();
    assert_eq!(again.plan_items, 0);
    assert_eq!(fx.assistant.training_data().await.unwrap().len(), 4);
}

#[tokio::test]
async fn unreachable_feed_does_not_fail_bootstrap() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let fx = fixture(Vec::<String>::new()).await;
    let options = BootstrapOptions::new(fx.db.sql_dialect().schema_query())
        .with_feed(TrainingFeed::new(format!("{}/training.json", server.uri())));

    let report = bootstrap(&fx.assistant, &options).await.unwrap();
    assert_eq!(report.plan_items, 2);
    assert_eq!(report.feed_items, 0);
}

#[tokio::test]
async fn bootstrap_on_database_without_tables_trains_nothing() {
    let db = Arc::new(SqlDatabase::connect("sqlite::memory:").await.unwrap());
    let store: Arc<dyn TrainingStore> = Arc::new(VectorTrainingStore::in_memory(Arc::new(
        FakeEmbeddings::default(),
    )));
    let model = ScriptedChatModel::from_replies(Vec::<String>::new());
    let generator = LlmSqlGenerator::new(Arc::new(model), store.clone())
        .unwrap()
        .with_runner(db.clone());
    let assistant = Assistant::new(store, Arc::new(generator), db.clone());

    let report = bootstrap(
        &assistant,
        &BootstrapOptions::new(db.sql_dialect().schema_query()),
    )
    .await
    .unwrap();
    assert_eq!(report, BootstrapReport::default());
    assert!(assistant.training_data().await.unwrap().is_empty());
}

#[tokio::test]
async fn failing_schema_query_fails_bootstrap() {
    let fx = fixture(Vec::<String>::new()).await;
    let result = bootstrap(&fx.assistant, &BootstrapOptions::new("SELECT * FROM nowhere")).await;
    assert!(result.is_err());
}
