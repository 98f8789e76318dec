//! Loading of exported metrics documents for comparison.
//!
//! A metrics document is CSV with optional leading `#` comment lines, a
//! single-cell title row, the header row, and data rows. The header must
//! carry the label column and the five fixed metric columns; anything else
//! in the header is ignored.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::{Dataset, MetricSet, StatRow, LABEL_COLUMN, METRIC_COLUMNS};
use crate::error::JmkitError;

// ---------------------------------------------------------------------------
// CellIssue / LoadedDataset
// ---------------------------------------------------------------------------

/// One per-row problem encountered while loading. The affected row is still
/// emitted (with the bad cell left empty) — isolated failures never abort
/// the whole comparison.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CellIssue {
    /// 1-based line number within the document, comment lines included.
    pub row: usize,
    pub column: String,
    pub detail: String,
}

/// A loaded dataset together with the issues collected along the way.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoadedDataset {
    pub dataset: Dataset,
    pub issues: Vec<CellIssue>,
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Read a metrics CSV document from disk. The dataset name is the file stem
/// (file name up to the first `.`).
pub fn load_metrics_csv(path: impl AsRef<Path>) -> Result<LoadedDataset, JmkitError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)?;
    parse_metrics_csv(&file_stem(path), &content)
}

/// File name up to the first `.`, used as the source identity in merged
/// column headers.
pub fn file_stem(path: &Path) -> String {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    name.split('.').next().unwrap_or(&name).to_string()
}

/// Parse a metrics document from text.
///
/// Fatal errors: empty document, missing header, header missing any of the
/// expected columns. Per-cell coercion failures and duplicate labels are
/// collected as [`CellIssue`]s instead.
pub fn parse_metrics_csv(name: &str, content: &str) -> Result<LoadedDataset, JmkitError> {
    // General-info comment lines precede the table; they still count
    // toward reported row numbers.
    let mut comment_lines = 0usize;
    let table: String = content
        .lines()
        .filter(|line| {
            if line.trim_start().starts_with('#') {
                comment_lines += 1;
                false
            } else {
                true
            }
        })
        .collect::<Vec<_>>()
        .join("\n");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(table.as_bytes());

    let mut records = reader.records();

    // Row 1 is the document title, row 2 the header.
    let _title = records
        .next()
        .ok_or_else(|| JmkitError::Schema("metrics document is empty".to_string()))??;
    let header = records
        .next()
        .ok_or_else(|| JmkitError::Schema("metrics document has no header row".to_string()))??;

    let find = |column: &str| -> Result<usize, JmkitError> {
        header
            .iter()
            .position(|field| field.trim() == column)
            .ok_or_else(|| JmkitError::Schema(format!("missing column '{column}' in header")))
    };

    let label_idx = find(LABEL_COLUMN)?;
    let mut metric_idx = [0usize; 5];
    for (slot, column) in metric_idx.iter_mut().zip(METRIC_COLUMNS) {
        *slot = find(column)?;
    }

    let mut rows = Vec::new();
    let mut issues = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();

    for (offset, record) in records.enumerate() {
        let record = record?;
        let row_no = comment_lines + offset + 3; // comments + title + header precede the data

        // Blank records are visual separators.
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }

        let label = record
            .get(label_idx)
            .map(str::trim)
            .unwrap_or_default()
            .to_string();
        if label.is_empty() {
            continue;
        }

        // Duplicate labels are undefined in the source format; the first
        // occurrence wins and later ones are reported.
        if !seen.insert(label.clone()) {
            issues.push(CellIssue {
                row: row_no,
                column: LABEL_COLUMN.to_string(),
                detail: format!("duplicate label '{label}' ignored (first occurrence kept)"),
            });
            continue;
        }

        let mut cells = [None; 5];
        for (cell, (&idx, column)) in cells
            .iter_mut()
            .zip(metric_idx.iter().zip(METRIC_COLUMNS))
        {
            let raw = record.get(idx).map(str::trim).unwrap_or_default();
            if raw.is_empty() {
                continue;
            }
            match raw.parse::<f64>() {
                Ok(value) => *cell = Some(value),
                Err(_) => {
                    tracing::warn!(row = row_no, column, value = raw, "non-numeric metric cell");
                    issues.push(CellIssue {
                        row: row_no,
                        column: column.to_string(),
                        detail: format!("non-numeric value '{raw}' treated as empty"),
                    });
                }
            }
        }

        rows.push(StatRow {
            label,
            metrics: MetricSet {
                samples: cells[0],
                failures: cells[1],
                error_pct: cells[2],
                average: cells[3],
                pct90: cells[4],
            },
        });
    }

    Ok(LoadedDataset {
        dataset: Dataset {
            name: name.to_string(),
            rows,
        },
        issues,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
