use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlsage_core::{QueryResult, SqlSageError, TrainingItem, TrainingKind};

/// One step of a training plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPlanItem {
    pub item_type: TrainingKind,
    /// `catalog.schema` the table belongs to.
    pub group: String,
    /// Table name.
    pub name: String,
    pub value: String,
}

impl TrainingPlanItem {
    pub fn to_training_item(&self) -> TrainingItem {
        match self.item_type {
            TrainingKind::Ddl => TrainingItem::Ddl {
                ddl: self.value.clone(),
            },
            TrainingKind::Sql => TrainingItem::Sql {
                sql: self.value.clone(),
            },
            TrainingKind::Documentation => TrainingItem::Documentation {
                documentation: self.value.clone(),
            },
        }
    }

    pub fn summary(&self) -> String {
        match self.item_type {
            TrainingKind::Documentation => {
                format!("Train on Information Schema: {} {}", self.group, self.name)
            }
            TrainingKind::Ddl => format!("Train on DDL: {} {}", self.group, self.name),
            TrainingKind::Sql => format!("Train on SQL: {} {}", self.group, self.name),
        }
    }
}

/// Ordered training items derived from the database schema.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainingPlan {
    items: Vec<TrainingPlanItem>,
}

impl TrainingPlan {
    pub fn new(items: Vec<TrainingPlanItem>) -> Self {
        Self { items }
    }

    /// One documentation item per table of an information-schema result.
    ///
    /// Column names are matched case-insensitively. `table_name` is
    /// required; `table_catalog` and `table_schema` are used when present.
    /// Tables keep the order in which they first appear. A result without
    /// rows gives an empty plan whatever its columns.
    pub fn from_information_schema(schema: &QueryResult) -> Result<Self, SqlSageError> {
        if schema.is_empty() {
            return Ok(Self::default());
        }
        let table_col = schema.column_index("table_name").ok_or_else(|| {
            SqlSageError::Validation(
                "information schema result has no table_name column".to_string(),
            )
        })?;
        let catalog_col = schema.column_index("table_catalog");
        let schema_col = schema.column_index("table_schema");

        let cell = |row: &[Value], col: Option<usize>| -> String {
            col.and_then(|i| row.get(i)).map(cell_text).unwrap_or_default()
        };

        let mut order: Vec<(String, String, String)> = Vec::new();
        let mut groups: HashMap<(String, String, String), Vec<usize>> = HashMap::new();
        for (index, row) in schema.rows.iter().enumerate() {
            let key = (
                cell(row, catalog_col),
                cell(row, schema_col),
                cell(row, Some(table_col)),
            );
            if key.2.is_empty() {
                continue;
            }
            groups
                .entry(key.clone())
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(index);
        }

        let mut items = Vec::with_capacity(order.len());
        for key in order {
            let rows = groups.remove(&key).unwrap_or_default();
            let (catalog, db_schema, table) = key;
            let database = if catalog.is_empty() { &db_schema } else { &catalog };
            let value = format!(
                "The following columns are in the {table} table in the {database} database:\n\n{}",
                schema.select_rows(&rows).to_markdown()
            );
            let group = [catalog.as_str(), db_schema.as_str()]
                .into_iter()
                .filter(|part| !part.is_empty())
                .collect::<Vec<_>>()
                .join(".");
            items.push(TrainingPlanItem {
                item_type: TrainingKind::Documentation,
                group,
                name: table,
                value,
            });
        }

        Ok(Self { items })
    }

    pub fn items(&self) -> &[TrainingPlanItem] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Human-readable list of what training the plan would perform.
    pub fn summary(&self) -> Vec<String> {
        self.items.iter().map(TrainingPlanItem::summary).collect()
    }

    /// Drop every item whose summary matches `summary`.
    pub fn remove_item(&mut self, summary: &str) {
        self.items.retain(|item| item.summary() != summary);
    }
}

fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
