//! Test plan naming normalizer.
//!
//! Applies the naming conventions to a JMeter `.jmx` plan: transaction
//! controllers get numbered per thread group, samplers are composed from
//! controller, method and target, extractor variables receive the capture
//! prefix, and every reference to a renamed variable is rewritten. The
//! original file is left untouched; output goes to a `_Modified` sibling.

pub mod rewrite;
pub mod rules;
pub mod tree;

pub use rules::NamingSummary;

use std::path::{Path, PathBuf};

use crate::error::JmkitError;

/// Result of normalizing one plan file.
#[derive(Debug, Clone)]
pub struct NormalizeOutcome {
    /// Where the normalized plan was written.
    pub output: PathBuf,
    pub summary: NamingSummary,
}

/// Sibling path for the normalized plan: `plan.jmx` becomes
/// `plan_Modified.jmx`.
pub fn output_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let modified = match name.strip_suffix(".jmx") {
        Some(stem) => format!("{stem}_Modified.jmx"),
        None => format!("{name}_Modified"),
    };
    input.with_file_name(modified)
}

/// Normalize a plan file end to end and write the result next to it.
pub fn normalize_plan_file(input: &Path) -> Result<NormalizeOutcome, JmkitError> {
    let content = std::fs::read_to_string(input)?;

    let mut root = tree::parse_document(&content)?;
    let summary = rules::apply_naming_conventions(&mut root)?;

    let serialized = tree::to_xml_string(&root)?;
    let rewritten = rewrite::rewrite_variable_refs(&serialized, &summary.renames)?;
    let cleaned = rewrite::collapse_blank_lines(&rewritten);

    let output = output_path(input);
    std::fs::write(&output, cleaned)?;

    tracing::info!(
        input = %input.display(),
        output = %output.display(),
        controllers = summary.controllers,
        samplers = summary.samplers,
        extractors = summary.extractors,
        "plan normalized"
    );

    Ok(NormalizeOutcome { output, summary })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
