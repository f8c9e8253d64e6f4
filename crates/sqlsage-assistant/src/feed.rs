use serde_json::Value;
use sqlsage_core::{SqlSageError, TrainingItem};

type EntryParser = fn(&Value) -> Option<TrainingItem>;

/// Items parsed from a training feed, plus how many entries were unusable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedBatch {
    pub items: Vec<TrainingItem>,
    pub skipped: usize,
}

/// A remote JSON document listing extra training data.
///
/// Two shapes are understood:
///
/// ```json
/// {"items": [{"type": "question", "documentation": "...", "query": "..."}]}
/// {"questions": [...], "sqls": [...], "documentations": [...]}
/// ```
pub struct TrainingFeed {
    client: reqwest::Client,
    url: String,
}

impl TrainingFeed {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub async fn fetch(&self) -> Result<FeedBatch, SqlSageError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| SqlSageError::Feed(format!("fetch {}: {e}", self.url)))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(SqlSageError::Feed(format!(
                "fetch {} returned HTTP {status}",
                self.url
            )));
        }

        let body: Value = resp
            .json()
            .await
            .map_err(|e| SqlSageError::Feed(format!("invalid JSON from {}: {e}", self.url)))?;
        Ok(parse_feed(&body))
    }
}

/// Convert a feed document into training items.
pub fn parse_feed(body: &Value) -> FeedBatch {
    let mut batch = FeedBatch::default();

    if let Some(items) = body.get("items").and_then(Value::as_array) {
        for entry in items {
            batch.push(tagged_item(entry));
        }
        return batch;
    }

    let lists: [(&str, EntryParser); 3] = [
        ("questions", question_entry),
        ("sqls", sql_entry),
        ("documentations", documentation_entry),
    ];
    let mut recognized = false;
    for (key, convert) in lists {
        if let Some(entries) = body.get(key).and_then(Value::as_array) {
            recognized = true;
            for entry in entries {
                batch.push(convert(entry));
            }
        }
    }
    if !recognized {
        tracing::warn!("training feed has neither items nor questions/sqls/documentations");
    }
    batch
}

impl FeedBatch {
    fn push(&mut self, item: Option<TrainingItem>) {
        match item {
            Some(item) => self.items.push(item),
            None => self.skipped += 1,
        }
    }
}

fn text<'a>(entry: &'a Value, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .filter_map(|key| entry.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .find(|s| !s.is_empty())
}

fn tagged_item(entry: &Value) -> Option<TrainingItem> {
    let kind = entry.get("type").and_then(Value::as_str).unwrap_or_default();
    let item = match kind {
        "documentation" => text(entry, &["documentation"]).map(|d| TrainingItem::Documentation {
            documentation: d.to_string(),
        }),
        "question" => question_entry(entry),
        "query" | "sql" => text(entry, &["query", "sql"]).map(|sql| TrainingItem::Sql {
            sql: sql.to_string(),
        }),
        "ddl" => text(entry, &["ddl"]).map(|ddl| TrainingItem::Ddl {
            ddl: ddl.to_string(),
        }),
        other => {
            tracing::warn!(kind = other, "skipping feed item of unknown type");
            return None;
        }
    };
    if item.is_none() {
        tracing::warn!(kind, "skipping feed item with missing fields");
    }
    item
}

/// A question needs its SQL; older feeds carry the question text in
/// `documentation` and the SQL in `query`.
fn question_entry(entry: &Value) -> Option<TrainingItem> {
    let question = text(entry, &["question", "documentation"])?;
    let sql = text(entry, &["query", "sql"])?;
    Some(TrainingItem::QuestionSql {
        question: question.to_string(),
        sql: sql.to_string(),
    })
}

fn sql_entry(entry: &Value) -> Option<TrainingItem> {
    if let Some(sql) = entry.as_str().map(str::trim).filter(|s| !s.is_empty()) {
        return Some(TrainingItem::Sql {
            sql: sql.to_string(),
        });
    }
    let sql = text(entry, &["sql", "query"])?;
    match text(entry, &["question"]) {
        Some(question) => Some(TrainingItem::QuestionSql {
            question: question.to_string(),
            sql: sql.to_string(),
        }),
        None => Some(TrainingItem::Sql {
            sql: sql.to_string(),
        }),
    }
}

fn documentation_entry(entry: &Value) -> Option<TrainingItem> {
    entry
        .as_str()
        .or_else(|| text(entry, &["documentation"]))
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|d| TrainingItem::Documentation {
            documentation: d.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn text_prefers_first_non_empty_key() {
        let entry = json!({"question": "  ", "documentation": "how many?"});
        assert_eq!(text(&entry, &["question", "documentation"]), Some("how many?"));
    }

    #[test]
    fn plain_string_question_is_skipped() {
        assert!(question_entry(&json!("how many orders?")).is_none());
    }
}
