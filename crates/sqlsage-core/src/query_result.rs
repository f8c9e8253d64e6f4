use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::SqlSageError;

/// A SQL result set in tabular form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column, ignoring ASCII case.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(name))
    }

    /// A new result with the same columns and only the given rows.
    pub fn select_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices
                .iter()
                .filter_map(|&i| self.rows.get(i).cloned())
                .collect(),
        }
    }

    /// The first `n` rows as JSON objects keyed by column name.
    pub fn preview(&self, n: usize) -> Vec<Map<String, Value>> {
        self.rows
            .iter()
            .take(n)
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }

    /// Render as CSV with a header row.
    pub fn to_csv(&self) -> Result<String, SqlSageError> {
        let mut writer = csv::Writer::from_writer(Vec::new());
        if !self.columns.is_empty() {
            writer
                .write_record(&self.columns)
                .map_err(|e| SqlSageError::Parsing(format!("failed to write CSV header: {e}")))?;
        }
        for row in &self.rows {
            writer
                .write_record(row.iter().map(cell_text))
                .map_err(|e| SqlSageError::Parsing(format!("failed to write CSV row: {e}")))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|e| SqlSageError::Parsing(format!("failed to flush CSV: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| SqlSageError::Parsing(format!("CSV output is not UTF-8: {e}")))
    }

    /// Render as a Markdown table.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str("| ");
        out.push_str(&self.columns.join(" | "));
        out.push_str(" |\n|");
        for _ in &self.columns {
            out.push_str(":---|");
        }
        out.push('\n');
        for row in &self.rows {
            let cells: Vec<String> = row
                .iter()
                .map(|v| cell_text(v).replace('|', "\\|"))
                .collect();
            out.push_str("| ");
            out.push_str(&cells.join(" | "));
            out.push_str(" |\n");
        }
        out
    }
}

/// Plain-text form of a cell. Nulls become empty strings.
fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
