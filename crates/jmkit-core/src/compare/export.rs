//! Rendering of a merged comparison to CSV and standalone HTML.

use super::{fmt_metric, Mark, MergedReport, MergedRow, MetricSet, METRIC_COLUMNS};
use crate::error::JmkitError;

/// Output file stem for a comparison of two sources.
pub fn output_stem(source_a: &str, source_b: &str) -> String {
    format!("{source_a}_vrs_{source_b}")
}

/// Merged column headers: label first, then each metric's two
/// source-qualified columns adjacent (source A immediately before B).
pub fn merged_headers(report: &MergedReport) -> Vec<String> {
    let mut headers = Vec::with_capacity(1 + METRIC_COLUMNS.len() * 2);
    headers.push(super::LABEL_COLUMN.to_string());
    for metric in METRIC_COLUMNS {
        headers.push(format!("{metric} ({})", report.source_a));
        headers.push(format!("{metric} ({})", report.source_b));
    }
    headers
}

fn cell(metrics: Option<&MetricSet>, index: usize) -> String {
    metrics
        .and_then(|m| m.values()[index])
        .map(fmt_metric)
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

/// Export the merged comparison as CSV.
///
/// Row 1 is the document title, row 2 the header — the same shape the
/// exporter produces, so a comparison document can itself be reloaded.
/// Group transitions emit one blank record.
pub fn export_merged_csv(report: &MergedReport) -> Result<String, JmkitError> {
    let headers = merged_headers(report);
    let width = headers.len();

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    let mut title = vec![""; width];
    title[0] = "Comparison";
    writer.write_record(&title)?;
    writer.write_record(&headers)?;

    for row in &report.rows {
        if row.group_break {
            writer.write_record(vec![""; width])?;
        }
        let mut record = Vec::with_capacity(width);
        record.push(row.label.clone());
        for index in 0..METRIC_COLUMNS.len() {
            record.push(cell(row.a.as_ref(), index));
            record.push(cell(row.b.as_ref(), index));
        }
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| JmkitError::Internal(format!("CSV writer flush failed: {e}")))?;
    String::from_utf8(bytes).map_err(|e| JmkitError::Internal(format!("invalid UTF-8: {e}")))
}

// ---------------------------------------------------------------------------
// HTML export
// ---------------------------------------------------------------------------

fn mark_class(mark: Option<Mark>) -> &'static str {
    match mark {
        Some(Mark::Regression) => " class=\"reg\"",
        Some(Mark::Improvement) => " class=\"imp\"",
        None => "",
    }
}

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn merged_row_html(row: &MergedRow, width: usize) -> String {
    let mut out = String::new();
    if row.group_break {
        out.push_str(&format!(
            "<tr class=\"sep\"><td colspan=\"{width}\"></td></tr>\n"
        ));
    }

    let row_class = if row.parent { "parent" } else { "child" };
    out.push_str(&format!("<tr class=\"{row_class}\">"));
    out.push_str(&format!(
        "<td class=\"label\">{}</td>",
        html_escape(&row.label)
    ));

    // Marked cells: both sources of a monitored metric share the mark.
    let marks = [
        None,
        None,
        row.marks.error_pct,
        row.marks.average,
        row.marks.pct90,
    ];
    for (index, mark) in marks.iter().enumerate() {
        let class = mark_class(*mark);
        out.push_str(&format!("<td{class}>{}</td>", cell(row.a.as_ref(), index)));
        out.push_str(&format!("<td{class}>{}</td>", cell(row.b.as_ref(), index)));
    }
    out.push_str("</tr>");
    out
}

/// Export the merged comparison as a standalone HTML report with inline CSS.
///
/// Parent rows render as section rows, children indent under them, group
/// transitions insert a blank separator row, and threshold breaches color
/// both source cells of the affected metric.
pub fn export_merged_html(report: &MergedReport) -> String {
    let headers = merged_headers(report);
    let width = headers.len();

    let head_cells: String = headers
        .iter()
        .map(|h| format!("<th>{}</th>", html_escape(h)))
        .collect();

    let body: String = report
        .rows
        .iter()
        .map(|row| merged_row_html(row, width))
        .collect::<Vec<_>>()
        .join("\n");

    let generated = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>Comparison — {source_a} vs {source_b}</title>
<style>
  *, *::before, *::after {{ box-sizing: border-box; }}
  body {{
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    margin: 0; padding: 2rem;
    background: #0f172a; color: #e2e8f0; line-height: 1.5;
  }}
  h1 {{ font-size: 1.75rem; font-weight: 700; color: #f1f5f9; margin: 0 0 0.25rem; }}
  .meta {{ color: #64748b; font-size: 0.875rem; margin-bottom: 2rem; }}
  table {{
    width: 100%; border-collapse: collapse; font-size: 0.8125rem;
    background: #1e293b; border-radius: 0.5rem; overflow: hidden;
  }}
  thead {{ background: #0f172a; }}
  th {{
    padding: 0.625rem 0.875rem; text-align: left;
    font-weight: 600; color: #94a3b8;
    text-transform: uppercase; letter-spacing: 0.04em; font-size: 0.7rem;
  }}
  td {{ padding: 0.5rem 0.875rem; border-top: 1px solid #334155; color: #cbd5e1; }}
  td.label {{ max-width: 36rem; overflow-wrap: break-word; }}
  tr.parent td {{ background: #16263e; font-weight: 600; color: #e2e8f0; }}
  tr.child td.label {{ padding-left: 2rem; color: #94a3b8; }}
  tr.sep td {{ background: #0f172a; border-top: none; padding: 0.25rem; }}
  td.reg {{ background: #7f1d1d; color: #fecaca; }}
  td.imp {{ background: #14532d; color: #bbf7d0; }}
  footer {{
    margin-top: 3rem; padding-top: 1rem; border-top: 1px solid #1e293b;
    color: #475569; font-size: 0.8125rem;
  }}
</style>
</head>
<body>
<h1>Comparison Report</h1>
<div class="meta">
  <span>Source A: <strong>{source_a}</strong></span> &nbsp;
  <span>Source B: <strong>{source_b}</strong></span>
</div>

<table>
  <thead><tr>{head_cells}</tr></thead>
  <tbody>
{body}
  </tbody>
</table>

<footer>Generated by jmkit &bull; {generated}</footer>
</body>
</html>
"#,
        source_a = html_escape(&report.source_a),
        source_b = html_escape(&report.source_b),
        head_cells = head_cells,
        body = body,
        generated = generated,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
