//! Post-serialization rewriting: variable references and blank lines.
//!
//! Renamed extractor variables are referenced elsewhere in the plan as
//! `${name}` placeholders and as `vars.get("name")` calls inside scripts;
//! both forms are rewritten over the serialized document text.

use std::collections::BTreeMap;

use regex::{NoExpand, Regex};

use crate::error::JmkitError;

/// Rewrite every reference to a renamed variable throughout the document.
pub fn rewrite_variable_refs(
    content: &str,
    renames: &BTreeMap<String, String>,
) -> Result<String, JmkitError> {
    let mut out = content.to_string();

    for (old, new) in renames {
        let escaped = regex::escape(old);

        let placeholder = Regex::new(&format!(r"\$\{{{escaped}\}}"))
            .map_err(|e| JmkitError::Internal(format!("placeholder pattern: {e}")))?;
        out = placeholder
            .replace_all(&out, NoExpand(&format!("${{{new}}}")))
            .into_owned();

        let getter = Regex::new(&format!(r#"vars\.get\(["']{escaped}["']\)"#))
            .map_err(|e| JmkitError::Internal(format!("getter pattern: {e}")))?;
        out = getter
            .replace_all(&out, NoExpand(&format!("vars.get(\"{new}\")")))
            .into_owned();
    }

    Ok(out)
}

/// Collapse runs of blank lines into a single blank line.
pub fn collapse_blank_lines(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut previous_blank = false;
    for line in content.lines() {
        if line.trim().is_empty() {
            if previous_blank {
                continue;
            }
            previous_blank = true;
        } else {
            previous_blank = false;
        }
        out.push_str(line);
        out.push('\n');
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn renames(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(a, b)| (a.to_string(), b.to_string()))
            .collect()
    }

    #[test]
    fn rewrites_placeholder_references() {
        let map = renames(&[("token", "C_token")]);
        let out = rewrite_variable_refs("<stringProp>${token}</stringProp>", &map).unwrap();
        assert_eq!(out, "<stringProp>${C_token}</stringProp>");
    }

    #[test]
    fn rewrites_vars_get_with_either_quote_style() {
        let map = renames(&[("token", "C_token")]);
        let script = r#"vars.get("token"); vars.get('token')"#;
        let out = rewrite_variable_refs(script, &map).unwrap();
        assert_eq!(out, r#"vars.get("C_token"); vars.get("C_token")"#);
    }

    #[test]
    fn unrelated_names_are_untouched() {
        let map = renames(&[("token", "C_token")]);
        let text = "${tokenExtra} and ${other} stay";
        let out = rewrite_variable_refs(text, &map).unwrap();
        assert_eq!(out, text);
    }

    #[test]
    fn variable_names_with_regex_metacharacters_are_escaped() {
        let map = renames(&[("a.b", "C_a.b")]);
        let out = rewrite_variable_refs("${a.b} ${axb}", &map).unwrap();
        assert_eq!(out, "${C_a.b} ${axb}");
    }

    #[test]
    fn multiple_renames_apply_together() {
        let map = renames(&[("one", "C_one"), ("two", "C_two")]);
        let out = rewrite_variable_refs("${one}+${two}", &map).unwrap();
        assert_eq!(out, "${C_one}+${C_two}");
    }

    #[test]
    fn collapses_blank_line_runs() {
        let text = "a\n\n\n\nb\n\nc\n";
        assert_eq!(collapse_blank_lines(text), "a\n\nb\n\nc\n");
    }

    #[test]
    fn single_blank_lines_survive() {
        let text = "a\n\nb\n";
        assert_eq!(collapse_blank_lines(text), text);
    }

    #[test]
    fn whitespace_only_lines_count_as_blank() {
        let text = "a\n   \n\t\nb\n";
        assert_eq!(collapse_blank_lines(text), "a\n   \nb\n");
    }
}
