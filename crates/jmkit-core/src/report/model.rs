//! Typed view of the dashboard's embedded table data.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JmkitError;

/// The raw shape of a `createTable` data block: a `titles` array and an
/// `items` array of `{data: [...]}` records.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableBlock {
    #[serde(default)]
    pub titles: Vec<String>,
    #[serde(default)]
    pub items: Vec<TableItem>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TableItem {
    #[serde(default)]
    pub data: Vec<Value>,
}

/// A dashboard table flattened into titles plus value rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StatsTable {
    pub titles: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl StatsTable {
    /// Parse a table from an extracted JSON block.
    pub fn parse(json_text: &str) -> Result<Self, JmkitError> {
        let block: TableBlock = serde_json::from_str(json_text)?;
        Ok(Self {
            titles: block.titles,
            rows: block.items.into_iter().map(|item| item.data).collect(),
        })
    }

    /// Index of a column by normalized title (whitespace removed,
    /// case-insensitive), so "Error %" and "error%" both match.
    pub fn column(&self, name: &str) -> Option<usize> {
        let wanted = normalize_title(name);
        self.titles
            .iter()
            .position(|t| normalize_title(t) == wanted)
    }

    /// The label cell of a row as a string, if present.
    pub fn label_of(&self, row: &[Value]) -> Option<String> {
        let idx = self.column("Label")?;
        row.get(idx).map(cell_text)
    }

    /// Sort rows by their label column. Rows without a label sort first.
    pub fn sort_by_label(&mut self) {
        let Some(idx) = self.column("Label") else {
            return;
        };
        self.rows.sort_by_key(|row| {
            row.get(idx).map(cell_text).unwrap_or_default()
        });
    }
}

fn normalize_title(title: &str) -> String {
    title
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect::<String>()
        .to_lowercase()
}

/// Render a JSON cell as plain text (strings without quotes).
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Numeric view of a JSON cell: numbers directly, strings parsed after
/// stripping a trailing `%`.
pub fn cell_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse().ok(),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
