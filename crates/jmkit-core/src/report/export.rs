//! Rendering of a fetched dashboard into CSV documents and a styled HTML
//! report, with optional SLA breach marking.

use std::collections::HashSet;

use serde_json::Value;

use super::model::{cell_number, cell_text, StatsTable};
use super::scrape::GeneralInfo;
use crate::compare::{fmt_metric, is_parent, top_segment};
use crate::error::JmkitError;

// ---------------------------------------------------------------------------
// SLA evaluation
// ---------------------------------------------------------------------------

/// Operator-supplied SLA ceilings. `None` disables marking for that metric.
#[derive(Debug, Clone, Copy, Default)]
pub struct SlaConfig {
    pub error_pct: Option<f64>,
    pub average: Option<f64>,
    /// Apply the SLA to parent transactions too; the default marks only
    /// child requests (labels carrying an HTTP method).
    pub include_parents: bool,
}

/// Which rows breach which SLA, plus per-row conversion problems. A bad
/// cell skips that row's evaluation but never aborts the report.
#[derive(Debug, Clone, Default)]
pub struct SlaEvaluation {
    pub error_rows: HashSet<usize>,
    pub avg_rows: HashSet<usize>,
    pub issues: Vec<String>,
}

/// The owning transaction of a request label: `"first.second."`.
fn transaction_prefix(label: &str) -> Option<String> {
    let mut parts = label.split('.');
    let first = parts.next()?;
    let second = parts.next()?;
    Some(format!("{first}.{second}."))
}

fn is_request_label(label: &str) -> bool {
    label.contains("GET") || label.contains("POST")
}

/// Evaluate both SLA metrics over the statistics table.
///
/// A breach marks the row and propagates to the row whose label is the
/// breaching request's transaction prefix, so collapsed sections still show
/// the problem.
pub fn evaluate_sla(stats: &StatsTable, sla: &SlaConfig) -> SlaEvaluation {
    let mut evaluation = SlaEvaluation::default();

    let metrics: [(&str, Option<f64>, fn(&mut SlaEvaluation) -> &mut HashSet<usize>); 2] = [
        ("Error %", sla.error_pct, |e| &mut e.error_rows),
        ("Average", sla.average, |e| &mut e.avg_rows),
    ];

    for (column, ceiling, rows_of) in metrics {
        let Some(ceiling) = ceiling else { continue };
        let Some(col_idx) = stats.column(column) else {
            evaluation
                .issues
                .push(format!("column '{column}' not found; SLA not applied"));
            continue;
        };

        let mut breached_transactions: HashSet<String> = HashSet::new();

        for (row_idx, row) in stats.rows.iter().enumerate() {
            let Some(label) = stats.label_of(row) else { continue };
            let cell = match row.get(col_idx) {
                Some(cell) if !cell.is_null() => cell,
                _ => continue,
            };
            let Some(value) = cell_number(cell) else {
                evaluation.issues.push(format!(
                    "row {} ('{}'): non-numeric {} value '{}', SLA check skipped",
                    row_idx + 1,
                    label,
                    column,
                    cell_text(cell)
                ));
                continue;
            };

            if value > ceiling && (is_request_label(&label) || sla.include_parents) {
                rows_of(&mut evaluation).insert(row_idx);
                if let Some(prefix) = transaction_prefix(&label) {
                    breached_transactions.insert(prefix);
                }
            }
        }

        // Propagate to the owning parent transactions.
        for (row_idx, row) in stats.rows.iter().enumerate() {
            if let Some(label) = stats.label_of(row) {
                if breached_transactions.contains(&label) {
                    rows_of(&mut evaluation).insert(row_idx);
                }
            }
        }
    }

    evaluation
}

// ---------------------------------------------------------------------------
// CSV export
// ---------------------------------------------------------------------------

fn csv_cell(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().map(fmt_metric).unwrap_or_else(|| n.to_string()),
        other => cell_text(other),
    }
}

fn export_table_csv(
    table: &StatsTable,
    title: &str,
    comments: &[String],
) -> Result<String, JmkitError> {
    let width = table.titles.len().max(1);

    let mut out = String::new();
    for comment in comments {
        out.push_str(&format!("# {comment}\n"));
    }

    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_writer(Vec::new());

    let mut title_record = vec![""; width];
    title_record[0] = title;
    writer.write_record(&title_record)?;
    writer.write_record(&table.titles)?;
    for row in &table.rows {
        let record: Vec<String> = row.iter().map(csv_cell).collect();
        writer.write_record(&record)?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| JmkitError::Internal(format!("CSV writer flush failed: {e}")))?;
    out.push_str(
        &String::from_utf8(bytes)
            .map_err(|e| JmkitError::Internal(format!("invalid UTF-8: {e}")))?,
    );
    Ok(out)
}

/// Export the statistics table as CSV, with the general information carried
/// as leading comment lines so the document stays self-describing.
pub fn export_stats_csv(
    stats: &StatsTable,
    info: &GeneralInfo,
    report_url: &str,
) -> Result<String, JmkitError> {
    let comments = vec![
        format!("JMeter report: {report_url}"),
        format!("Start Time: {}", info.start_time),
        format!("End Time: {}", info.end_time),
    ];
    export_table_csv(stats, "Statistics", &comments)
}

/// Export the errors table as CSV.
pub fn export_errors_csv(errors: &StatsTable) -> Result<String, JmkitError> {
    export_table_csv(errors, "Errors", &[])
}

// ---------------------------------------------------------------------------
// HTML export
// ---------------------------------------------------------------------------

fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn value_html(value: &Value) -> String {
    match value {
        Value::Number(n) => n.as_f64().map(fmt_metric).unwrap_or_else(|| n.to_string()),
        other => html_escape(&cell_text(other)),
    }
}

fn stats_rows_html(stats: &StatsTable, evaluation: &SlaEvaluation) -> String {
    let width = stats.titles.len().max(1);
    let error_col = stats.column("Error %");
    let avg_col = stats.column("Average");

    let mut out = String::new();
    let mut last_segment: Option<String> = None;

    for (row_idx, row) in stats.rows.iter().enumerate() {
        let label = stats.label_of(row).unwrap_or_default();

        let segment = top_segment(&label).to_string();
        if matches!(&last_segment, Some(prev) if *prev != segment) {
            out.push_str(&format!(
                "<tr class=\"sep\"><td colspan=\"{width}\"></td></tr>\n"
            ));
        }
        last_segment = Some(segment);

        let row_class = if is_parent(&label) { "parent" } else { "child" };
        out.push_str(&format!("<tr class=\"{row_class}\">"));
        for (col_idx, cell) in row.iter().enumerate() {
            let breached = (Some(col_idx) == error_col && evaluation.error_rows.contains(&row_idx))
                || (Some(col_idx) == avg_col && evaluation.avg_rows.contains(&row_idx));
            let class = if breached {
                " class=\"sla\""
            } else if col_idx == 0 {
                " class=\"label\""
            } else {
                ""
            };
            out.push_str(&format!("<td{class}>{}</td>", value_html(cell)));
        }
        out.push_str("</tr>\n");
    }
    out
}

fn plain_rows_html(table: &StatsTable) -> String {
    table
        .rows
        .iter()
        .map(|row| {
            let cells: String = row
                .iter()
                .map(|cell| format!("<td>{}</td>", value_html(cell)))
                .collect();
            format!("<tr>{cells}</tr>")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn head_cells(titles: &[String]) -> String {
    titles
        .iter()
        .map(|t| format!("<th>{}</th>", html_escape(t)))
        .collect()
}

/// Export the full report as a standalone HTML document: general information
/// first, then the statistics table (with SLA marks, section rows, and group
/// separators), then the errors table.
pub fn export_report_html(
    stats: &StatsTable,
    errors: &StatsTable,
    info: &GeneralInfo,
    report_url: &str,
    evaluation: &SlaEvaluation,
) -> String {
    let generated = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="UTF-8">
<title>jmkit Report</title>
<style>
  *, *::before, *::after {{ box-sizing: border-box; }}
  body {{
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto, sans-serif;
    margin: 0; padding: 2rem;
    background: #0f172a; color: #e2e8f0; line-height: 1.5;
  }}
  h1 {{ font-size: 1.75rem; font-weight: 700; color: #f1f5f9; margin: 0 0 0.25rem; }}
  h2 {{ font-size: 1.125rem; font-weight: 600; color: #94a3b8;
        text-transform: uppercase; letter-spacing: 0.05em;
        margin: 2rem 0 0.75rem; border-bottom: 1px solid #1e293b; padding-bottom: 0.5rem; }}
  .info {{ color: #94a3b8; font-size: 0.875rem; }}
  .info dt {{ font-weight: 600; color: #64748b; }}
  .info dd {{ margin: 0 0 0.5rem; }}
  table {{
    width: 100%; border-collapse: collapse; font-size: 0.8125rem;
    background: #1e293b; border-radius: 0.5rem; overflow: hidden;
    margin-bottom: 2rem;
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
  td.sla {{ background: #7f1d1d; color: #fecaca; }}
  footer {{
    margin-top: 3rem; padding-top: 1rem; border-top: 1px solid #1e293b;
    color: #475569; font-size: 0.8125rem;
  }}
</style>
</head>
<body>
<h1>Load Test Report</h1>

<h2>General Info</h2>
<dl class="info">
  <dt>Complete JMeter report</dt><dd><a href="{url}">{url}</a></dd>
  <dt>Start Time</dt><dd>{start_time}</dd>
  <dt>End Time</dt><dd>{end_time}</dd>
</dl>

<h2>Statistics</h2>
<table>
  <thead><tr>{stats_head}</tr></thead>
  <tbody>
{stats_rows}
  </tbody>
</table>

<h2>Errors</h2>
<table>
  <thead><tr>{errors_head}</tr></thead>
  <tbody>
{errors_rows}
  </tbody>
</table>

<footer>Generated by jmkit &bull; {generated}</footer>
</body>
</html>
"#,
        url = html_escape(report_url),
        start_time = html_escape(&info.start_time),
        end_time = html_escape(&info.end_time),
        stats_head = head_cells(&stats.titles),
        stats_rows = stats_rows_html(stats, evaluation),
        errors_head = head_cells(&errors.titles),
        errors_rows = plain_rows_html(errors),
        generated = generated,
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stats() -> StatsTable {
        StatsTable {
            titles: vec![
                "Label".to_string(),
                "#Samples".to_string(),
                "FAIL".to_string(),
                "Error %".to_string(),
                "Average".to_string(),
                "90th pct".to_string(),
            ],
            rows: vec![
                vec![
                    json!("Shop.01 Cart."),
                    json!(30),
                    json!(3),
                    json!("10.00%"),
                    json!(150.0),
                    json!(200),
                ],
                vec![
                    json!("Shop.01 Cart.-0 GET host/cart"),
                    json!(30),
                    json!(3),
                    json!("10.00%"),
                    json!(320.5),
                    json!(400),
                ],
                vec![
                    json!("Shop.02 Pay.-0 POST host/pay"),
                    json!(30),
                    json!(0),
                    json!("0.00%"),
                    json!(80.0),
                    json!(100),
                ],
            ],
        }
    }

    fn sla(error_pct: Option<f64>, average: Option<f64>, include_parents: bool) -> SlaConfig {
        SlaConfig {
            error_pct,
            average,
            include_parents,
        }
    }

    // -----------------------------------------------------------------------
    // evaluate_sla
    // -----------------------------------------------------------------------

    #[test]
    fn breach_marks_request_row() {
        let evaluation = evaluate_sla(&stats(), &sla(None, Some(300.0), false));
        assert!(evaluation.avg_rows.contains(&1));
        assert!(!evaluation.avg_rows.contains(&2));
    }

    #[test]
    fn breach_propagates_to_parent_transaction() {
        // Row 1's transaction prefix is "Shop.01 Cart." — row 0's label.
        let evaluation = evaluate_sla(&stats(), &sla(Some(5.0), None, false));
        assert!(evaluation.error_rows.contains(&1));
        assert!(evaluation.error_rows.contains(&0));
    }

    #[test]
    fn parent_rows_need_include_parents_flag() {
        // Row 0 breaches Error % but is not a GET/POST label.
        let only_children = evaluate_sla(&stats(), &sla(Some(5.0), None, false));
        // It is still marked, but only via propagation from row 1.
        assert!(only_children.error_rows.contains(&0));

        let mut table = stats();
        table.rows.truncate(1); // keep just the parent row
        let without_flag = evaluate_sla(&table, &sla(Some(5.0), None, false));
        assert!(without_flag.error_rows.is_empty());
        let with_flag = evaluate_sla(&table, &sla(Some(5.0), None, true));
        assert!(with_flag.error_rows.contains(&0));
    }

    #[test]
    fn disabled_sla_marks_nothing() {
        let evaluation = evaluate_sla(&stats(), &sla(None, None, false));
        assert!(evaluation.error_rows.is_empty());
        assert!(evaluation.avg_rows.is_empty());
        assert!(evaluation.issues.is_empty());
    }

    #[test]
    fn non_numeric_cell_is_reported_not_fatal() {
        let mut table = stats();
        table.rows[1][4] = json!("broken");
        let evaluation = evaluate_sla(&table, &sla(None, Some(100.0), false));
        assert_eq!(evaluation.issues.len(), 1);
        assert!(evaluation.issues[0].contains("non-numeric"));
        // Other rows still evaluated.
        assert!(!evaluation.avg_rows.contains(&1));
    }

    #[test]
    fn transaction_prefix_needs_two_segments() {
        assert_eq!(
            transaction_prefix("Shop.01 Cart.-0 GET host/cart"),
            Some("Shop.01 Cart.".to_string())
        );
        assert_eq!(transaction_prefix("NoDots"), None);
    }

    // -----------------------------------------------------------------------
    // CSV export
    // -----------------------------------------------------------------------

    #[test]
    fn stats_csv_carries_info_comments_then_table() {
        let info = GeneralInfo {
            start_time: "10:00".to_string(),
            end_time: "11:00".to_string(),
        };
        let csv = export_stats_csv(&stats(), &info, "http://host/index.html").unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert!(lines[0].starts_with("# JMeter report: http://host/index.html"));
        assert!(lines[1].starts_with("# Start Time: 10:00"));
        assert!(lines[3].starts_with("Statistics"));
        assert!(lines[4].starts_with("Label,"));
        assert_eq!(lines.len(), 5 + 3);
    }

    #[test]
    fn csv_numbers_use_metric_formatting() {
        let csv = export_errors_csv(&stats()).unwrap();
        // 320.5 stays fractional, 30 renders without decimals.
        assert!(csv.contains("320.5"));
        assert!(csv.contains(",30,"));
        assert!(!csv.contains("30.00"));
    }

    // -----------------------------------------------------------------------
    // HTML export
    // -----------------------------------------------------------------------

    #[test]
    fn html_has_three_sections_in_order() {
        let info = GeneralInfo::default();
        let html = export_report_html(
            &stats(),
            &stats(),
            &info,
            "http://host/index.html",
            &SlaEvaluation::default(),
        );
        let general = html.find("General Info").unwrap();
        let statistics = html.find("<h2>Statistics</h2>").unwrap();
        let errors = html.find("<h2>Errors</h2>").unwrap();
        assert!(general < statistics);
        assert!(statistics < errors);
    }

    #[test]
    fn html_marks_sla_cells() {
        let evaluation = evaluate_sla(&stats(), &sla(None, Some(300.0), false));
        let html = export_report_html(
            &stats(),
            &stats(),
            &GeneralInfo::default(),
            "url",
            &evaluation,
        );
        assert!(html.contains("class=\"sla\""));
    }

    #[test]
    fn html_classifies_parent_and_child_rows() {
        let html = export_report_html(
            &stats(),
            &stats(),
            &GeneralInfo::default(),
            "url",
            &SlaEvaluation::default(),
        );
        assert!(html.contains("<tr class=\"parent\">"));
        assert!(html.contains("<tr class=\"child\">"));
    }
}
