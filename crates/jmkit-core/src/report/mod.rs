//! Report exporter — fetches a JMeter HTML dashboard, extracts its embedded
//! statistics/errors tables and general information, and renders CSV plus a
//! styled HTML document with optional SLA highlighting.

pub mod export;
pub mod fetch;
pub mod model;
pub mod scrape;

pub use export::{SlaConfig, SlaEvaluation};
pub use fetch::{fetch_dashboard, DashboardSource};
pub use model::StatsTable;
pub use scrape::GeneralInfo;

use crate::error::JmkitError;

/// Everything the exporter produces for one dashboard.
#[derive(Debug, Clone)]
pub struct ReportBundle {
    /// Statistics table as CSV (general info as leading comments).
    pub metrics_csv: String,
    /// Errors table as CSV.
    pub errors_csv: String,
    /// Standalone styled HTML document with all three sections.
    pub html: String,
    /// Per-row problems encountered during SLA evaluation.
    pub issues: Vec<String>,
}

/// Build the full report from fetched dashboard documents.
///
/// Parse failures (missing markers, malformed blocks) abort before anything
/// is rendered — partial output is never produced.
pub fn build_report(source: &DashboardSource, sla: &SlaConfig) -> Result<ReportBundle, JmkitError> {
    let info = scrape::general_info(&source.index_html);

    let stats_block = scrape::find_table_block(&source.dashboard_js, scrape::STATISTICS_MARKER)?;
    let mut stats = StatsTable::parse(stats_block)?;
    stats.sort_by_label();

    let errors_block = scrape::find_table_block(&source.dashboard_js, scrape::ERRORS_MARKER)?;
    let errors = StatsTable::parse(errors_block)?;

    let evaluation = export::evaluate_sla(&stats, sla);

    Ok(ReportBundle {
        metrics_csv: export::export_stats_csv(&stats, &info, &source.report_url)?,
        errors_csv: export::export_errors_csv(&errors)?,
        html: export::export_report_html(&stats, &errors, &info, &source.report_url, &evaluation),
        issues: evaluation.issues,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
