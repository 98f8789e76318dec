#[derive(Debug, thiserror::Error)]
pub enum JmkitError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Fetch failed for {url}: status {status}")]
    Fetch { url: String, status: u16 },

    #[error("Marker not found: {0}")]
    Marker(String),

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("XML error: {0}")]
    Xml(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<quick_xml::Error> for JmkitError {
    fn from(e: quick_xml::Error) -> Self {
        JmkitError::Xml(e.to_string())
    }
}
