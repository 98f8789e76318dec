//! Extraction of the embedded data blocks from a JMeter dashboard.
//!
//! The dashboard's `dashboard.js` and `graph.js` assets embed their table
//! data as JavaScript object literals, not standalone JSON documents, so the
//! blocks are located by marker substrings and cut out with a brace-depth
//! scanner that is aware of string literals (braces inside quoted strings
//! must not affect the depth count).

use regex::Regex;
use serde_json::Value;

use crate::error::JmkitError;

/// Marker preceding the statistics table data in `dashboard.js`.
pub const STATISTICS_MARKER: &str = "createTable($(\"#statisticsTable\")";

/// Marker preceding the errors table data in `dashboard.js`.
pub const ERRORS_MARKER: &str = "createTable($(\"#errorsTable\")";

/// Marker preceding the response-time series in `graph.js`.
pub const RESPONSE_TIMES_MARKER: &str = "var responseTimesOverTimeInfos";

// ---------------------------------------------------------------------------
// Brace-depth scanner
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Normal,
    InString,
    Escape,
}

/// Starting at byte offset `from`, find the first `{` and return the whole
/// balanced block, including braces inside string literals.
///
/// Returns `None` when no opening brace follows `from` or the block never
/// closes.
pub fn extract_json_block(text: &str, from: usize) -> Option<&str> {
    let start = text.get(from..)?.find('{')? + from;
    let mut depth = 0usize;
    let mut state = ScanState::Normal;

    for (i, ch) in text[start..].char_indices() {
        match state {
            ScanState::Normal => match ch {
                '"' => state = ScanState::InString,
                '{' => depth += 1,
                '}' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&text[start..start + i + ch.len_utf8()]);
                    }
                }
                _ => {}
            },
            ScanState::InString => match ch {
                '\\' => state = ScanState::Escape,
                '"' => state = ScanState::Normal,
                _ => {}
            },
            ScanState::Escape => state = ScanState::InString,
        }
    }
    None
}

/// Locate a `createTable` invocation by its marker and return the JSON block
/// passed as its second argument.
pub fn find_table_block<'a>(js: &'a str, marker: &str) -> Result<&'a str, JmkitError> {
    let position = js
        .find(marker)
        .ok_or_else(|| JmkitError::Marker(marker.to_string()))?;
    let comma = js[position..]
        .find(',')
        .map(|i| position + i)
        .ok_or_else(|| JmkitError::Marker(format!("comma after {marker}")))?;
    extract_json_block(js, comma)
        .ok_or_else(|| JmkitError::Marker(format!("JSON block after {marker}")))
}

// ---------------------------------------------------------------------------
// General-information table
// ---------------------------------------------------------------------------

/// Start/end timestamps scraped from the dashboard summary page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GeneralInfo {
    pub start_time: String,
    pub end_time: String,
}

/// Scrape the `generalInfos` table from the dashboard index page.
///
/// A missing table is tolerated (the report simply carries empty
/// timestamps); the page layout is not under our control.
pub fn general_info(html: &str) -> GeneralInfo {
    let mut info = GeneralInfo::default();

    let Some(table_start) = html.find("id=\"generalInfos\"") else {
        tracing::warn!("table 'generalInfos' not found on the summary page");
        return info;
    };
    let table = match html[table_start..].find("</table>") {
        Some(end) => &html[table_start..table_start + end],
        None => &html[table_start..],
    };

    // Label/value <td> pairs, in document order.
    let td = Regex::new(r"(?s)<td[^>]*>(.*?)</td>").expect("static regex");
    let cells: Vec<String> = td
        .captures_iter(table)
        .map(|c| strip_tags(&c[1]).trim().trim_matches('"').to_string())
        .collect();

    for pair in cells.chunks(2) {
        let [label, value] = pair else { continue };
        match label.as_str() {
            "Start Time" => info.start_time = value.clone(),
            "End Time" => info.end_time = value.clone(),
            _ => {}
        }
    }
    info
}

fn strip_tags(fragment: &str) -> String {
    let tags = Regex::new(r"<[^>]+>").expect("static regex");
    tags.replace_all(fragment, "").into_owned()
}

// ---------------------------------------------------------------------------
// Response-time series (graph.js)
// ---------------------------------------------------------------------------

/// Extract the response-time-over-time series for one label from `graph.js`.
///
/// Returns `Ok(None)` when the series data is present but carries no entry
/// for the label; missing markers are errors.
pub fn response_series(
    graph_js: &str,
    label: &str,
) -> Result<Option<Vec<(f64, f64)>>, JmkitError> {
    let position = graph_js
        .find(RESPONSE_TIMES_MARKER)
        .ok_or_else(|| JmkitError::Marker(RESPONSE_TIMES_MARKER.to_string()))?;
    let equals = graph_js[position..]
        .find('=')
        .map(|i| position + i)
        .ok_or_else(|| JmkitError::Marker(format!("'=' after {RESPONSE_TIMES_MARKER}")))?;
    let block = extract_json_block(graph_js, equals)
        .ok_or_else(|| JmkitError::Marker(format!("JSON block after {RESPONSE_TIMES_MARKER}")))?;

    // The chart options wrap the payload; the `data:` member holds pure JSON.
    let data_pos = block
        .find("data:")
        .ok_or_else(|| JmkitError::Marker("'data:' inside response-time infos".to_string()))?;
    let data_block = extract_json_block(block, data_pos + "data:".len())
        .ok_or_else(|| JmkitError::Marker("JSON block after 'data:'".to_string()))?;

    let data: Value = serde_json::from_str(data_block)?;
    let series = data
        .get("result")
        .and_then(|r| r.get("series"))
        .and_then(Value::as_array);

    let Some(series) = series else {
        return Ok(None);
    };

    for entry in series {
        if entry.get("label").and_then(Value::as_str) == Some(label) {
            let points = entry
                .get("data")
                .and_then(Value::as_array)
                .map(|rows| {
                    rows.iter()
                        .filter_map(|p| {
                            let pair = p.as_array()?;
                            Some((pair.first()?.as_f64()?, pair.get(1)?.as_f64()?))
                        })
                        .collect::<Vec<_>>()
                })
                .unwrap_or_default();
            return Ok(Some(points));
        }
    }
    Ok(None)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
