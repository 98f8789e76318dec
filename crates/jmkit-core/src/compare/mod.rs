//! Report differencer — aligns two exported metric datasets by label,
//! computes per-metric deltas against thresholds, and classifies rows for
//! rendering (parent sections, group separators, regression/improvement
//! marks).

pub mod export;
pub mod load;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// The label column every metrics document must carry.
pub const LABEL_COLUMN: &str = "Label";

/// The fixed metric columns, in document order.
pub const METRIC_COLUMNS: [&str; 5] = ["#Samples", "FAIL", "Error %", "Average", "90th pct"];

// ---------------------------------------------------------------------------
// MetricSet — one source's metric cells for a single row
// ---------------------------------------------------------------------------

/// The fixed metric cells of one row from one source.
///
/// `None` means the cell is empty — either the label only exists in the
/// other source, or the cell failed numeric coercion at load time. An empty
/// cell is distinct from a true zero measurement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MetricSet {
    pub samples: Option<f64>,
    pub failures: Option<f64>,
    pub error_pct: Option<f64>,
    pub average: Option<f64>,
    pub pct90: Option<f64>,
}

impl MetricSet {
    /// Cell values in [`METRIC_COLUMNS`] order.
    pub fn values(&self) -> [Option<f64>; 5] {
        [
            self.samples,
            self.failures,
            self.error_pct,
            self.average,
            self.pct90,
        ]
    }
}

/// One row loaded from a metrics document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct StatRow {
    pub label: String,
    pub metrics: MetricSet,
}

/// An ordered collection of rows read from one tabular source.
///
/// `name` is the source identity (the input file stem) and qualifies the
/// metric columns of the merged output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Dataset {
    pub name: String,
    pub rows: Vec<StatRow>,
}

// ---------------------------------------------------------------------------
// Thresholds and marks
// ---------------------------------------------------------------------------

/// Maximum allowed per-metric difference (source A minus source B) before a
/// row is marked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Thresholds {
    pub error_pct: f64,
    pub average: f64,
    pub pct90: f64,
}

/// Highlight decision for one monitored metric on one row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mark {
    /// Source A degraded relative to source B (`a - b > threshold`).
    Regression,
    /// Source A improved relative to source B (`a - b < -threshold`).
    Improvement,
}

/// Marks for the three monitored metrics of one merged row.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MarkSet {
    pub error_pct: Option<Mark>,
    pub average: Option<Mark>,
    pub pct90: Option<Mark>,
}

// ---------------------------------------------------------------------------
// MergedRow / MergedReport
// ---------------------------------------------------------------------------

/// One output row after aligning both datasets on label.
///
/// Exactly one of `a`/`b` is `None` for one-sided labels; both are `Some`
/// for labels common to the two sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MergedRow {
    pub label: String,
    pub a: Option<MetricSet>,
    pub b: Option<MetricSet>,
    pub marks: MarkSet,
    /// A label with no hyphen is an aggregate transaction (section row);
    /// hyphenated labels nest under the nearest preceding parent.
    pub parent: bool,
    /// True when the top-level label segment changed from the previous row
    /// in sorted order; renderers insert a blank separator here.
    pub group_break: bool,
}

/// The complete merged comparison, ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MergedReport {
    pub source_a: String,
    pub source_b: String,
    pub rows: Vec<MergedRow>,
}

// ---------------------------------------------------------------------------
// merge
// ---------------------------------------------------------------------------

/// Align two datasets on label and compute highlight marks.
///
/// Rows are sorted case-insensitively by label. Labels present in only one
/// source keep the other source's metric cells empty. A metric is marked
/// only when both sources carry a value for it.
pub fn merge(a: &Dataset, b: &Dataset, thresholds: &Thresholds) -> MergedReport {
    // Case-insensitive ordering with the original label as tie-breaker so
    // the output is deterministic.
    let mut by_label: BTreeMap<(String, String), (Option<MetricSet>, Option<MetricSet>)> =
        BTreeMap::new();

    for row in &a.rows {
        if row.label.trim().is_empty() {
            continue;
        }
        let key = (row.label.to_lowercase(), row.label.clone());
        by_label.entry(key).or_insert((None, None)).0 = Some(row.metrics);
    }
    for row in &b.rows {
        if row.label.trim().is_empty() {
            continue;
        }
        let key = (row.label.to_lowercase(), row.label.clone());
        by_label.entry(key).or_insert((None, None)).1 = Some(row.metrics);
    }

    let mut rows = Vec::with_capacity(by_label.len());
    let mut last_segment: Option<String> = None;

    for ((_, label), (ma, mb)) in by_label {
        let marks = match (ma, mb) {
            (Some(va), Some(vb)) => MarkSet {
                error_pct: evaluate(va.error_pct, vb.error_pct, thresholds.error_pct),
                average: evaluate(va.average, vb.average, thresholds.average),
                pct90: evaluate(va.pct90, vb.pct90, thresholds.pct90),
            },
            _ => MarkSet::default(),
        };

        let segment = top_segment(&label).to_string();
        let group_break = matches!(&last_segment, Some(prev) if *prev != segment);
        last_segment = Some(segment);

        rows.push(MergedRow {
            parent: is_parent(&label),
            group_break,
            label,
            a: ma,
            b: mb,
            marks,
        });
    }

    MergedReport {
        source_a: a.name.clone(),
        source_b: b.name.clone(),
        rows,
    }
}

/// Threshold decision for a single metric pair. `None` unless both values
/// are present and the delta exceeds the threshold in either direction.
fn evaluate(a: Option<f64>, b: Option<f64>, threshold: f64) -> Option<Mark> {
    let (a, b) = (a?, b?);
    let delta = a - b;
    if delta > threshold {
        Some(Mark::Regression)
    } else if delta < -threshold {
        Some(Mark::Improvement)
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Label helpers
// ---------------------------------------------------------------------------

/// Text before the first `.` of a label — the top-level hierarchy segment.
pub fn top_segment(label: &str) -> &str {
    label.split('.').next().unwrap_or(label)
}

/// A label with no hyphen is an aggregate/parent transaction.
pub fn is_parent(label: &str) -> bool {
    !label.contains('-')
}

// ---------------------------------------------------------------------------
// Numeric rendering
// ---------------------------------------------------------------------------

/// Render a metric value for output.
///
/// Values are rounded half-up (ties away from zero) to two decimals;
/// integral values render without decimals and trailing zeros are trimmed.
pub fn fmt_metric(value: f64) -> String {
    let mut rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        rounded = 0.0; // normalize -0.0
    }
    let text = format!("{:.2}", rounded);
    text.trim_end_matches('0').trim_end_matches('.').to_string()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
