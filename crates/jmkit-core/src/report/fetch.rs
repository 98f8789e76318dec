//! Retrieval of a remote JMeter dashboard and its script assets.
//!
//! Plain sequential GETs; failures terminate the flow with the offending
//! URL and status. No retries and no timeouts (matching the source tool —
//! a known gap).

use crate::error::JmkitError;

/// Raw documents fetched from a dashboard, ready for scraping.
#[derive(Debug, Clone)]
pub struct DashboardSource {
    pub report_url: String,
    pub index_html: String,
    pub dashboard_js: String,
    pub graph_js: String,
}

/// Base URL for the dashboard's script assets, derived from the report URL
/// by cutting at `index` (the dashboard view is always `.../index.html`).
pub fn scripts_base(report_url: &str) -> String {
    match report_url.find("index") {
        Some(pos) => report_url[..pos].to_string(),
        None => report_url.to_string(),
    }
}

/// Fetch the dashboard index page plus `dashboard.js` and `graph.js`.
pub async fn fetch_dashboard(report_url: &str) -> Result<DashboardSource, JmkitError> {
    let index_html = get_text(report_url).await?;

    let base = scripts_base(report_url);
    let dashboard_js = get_text(&format!("{base}content/js/dashboard.js")).await?;
    let graph_js = get_text(&format!("{base}content/js/graph.js")).await?;

    Ok(DashboardSource {
        report_url: report_url.to_string(),
        index_html,
        dashboard_js,
        graph_js,
    })
}

async fn get_text(url: &str) -> Result<String, JmkitError> {
    let response = reqwest::get(url).await?;
    let status = response.status();
    if !status.is_success() {
        return Err(JmkitError::Fetch {
            url: url.to_string(),
            status: status.as_u16(),
        });
    }
    Ok(response.text().await?)
}
