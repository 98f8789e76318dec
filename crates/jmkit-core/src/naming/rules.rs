//! The naming conventions applied to a JMX test plan tree.
//!
//! Transaction controllers gain their thread group's name and a zero-padded
//! sequence number; HTTP samplers are named from method + host + path;
//! extractor reference names are forced onto the `C_` prefix with a
//! `__not_found` default; JSR223 post-processors are deduplicated with a
//! numeric suffix. Every variable rename is recorded so references can be
//! rewritten afterwards.

use std::collections::BTreeMap;

use super::tree::{XmlElement, XmlNode};
use crate::error::JmkitError;

/// Maximum sampler path length before abbreviation.
const MAX_PATH_LEN: usize = 50;

/// Counts of what was renamed, plus the variable rename map.
#[derive(Debug, Clone, Default)]
pub struct NamingSummary {
    pub controllers: usize,
    pub samplers: usize,
    pub extractors: usize,
    pub post_processors: usize,
    /// Old extractor variable name to new (`C_`-prefixed) name.
    pub renames: BTreeMap<String, String>,
}

/// Extractor element kinds and the string props holding their variable
/// name and default value.
const EXTRACTOR_KINDS: [(&str, &str, &str); 4] = [
    ("RegexExtractor", "RegexExtractor.refname", "RegexExtractor.default"),
    ("HtmlExtractor", "HtmlExtractor.refname", "HtmlExtractor.default"),
    (
        "JSONPostProcessor",
        "JSONPostProcessor.referenceNames",
        "JSONPostProcessor.defaultValues",
    ),
    (
        "BoundaryExtractor",
        "BoundaryExtractor.refname",
        "BoundaryExtractor.default",
    ),
];

/// Apply all naming conventions to a parsed JMX document, in place.
pub fn apply_naming_conventions(root: &mut XmlElement) -> Result<NamingSummary, JmkitError> {
    let mut summary = NamingSummary::default();

    {
        let plan_tree = locate_plan_tree(root)?;
        rename_thread_group_contents(plan_tree, &mut summary);
    }

    rename_extractors(root, &mut summary);
    suffix_post_processors(root, &mut summary);

    Ok(summary)
}

// ---------------------------------------------------------------------------
// Plan tree navigation
// ---------------------------------------------------------------------------

/// The hashTree holding the thread groups: inside the root's outer
/// hashTree, the element sibling following the TestPlan element.
fn locate_plan_tree(root: &mut XmlElement) -> Result<&mut XmlElement, JmkitError> {
    let outer_idx = root
        .next_element_index(0)
        .ok_or_else(|| JmkitError::Xml("test plan has no outer hashTree".to_string()))?;
    let XmlNode::Element(outer) = &mut root.children[outer_idx] else {
        unreachable!("next_element_index returns element positions");
    };
    if outer.name != "hashTree" {
        return Err(JmkitError::Xml(format!(
            "expected outer hashTree, found <{}>",
            outer.name
        )));
    }

    let plan_idx = outer
        .elements()
        .position(|el| el.name == "TestPlan")
        .ok_or_else(|| JmkitError::Xml("TestPlan element not found".to_string()))?;
    // Translate element position back to a child index, then take the next
    // element sibling (the plan's own hashTree).
    let mut seen = 0usize;
    let mut test_plan_child = None;
    for (idx, child) in outer.children.iter().enumerate() {
        if matches!(child, XmlNode::Element(_)) {
            if seen == plan_idx {
                test_plan_child = Some(idx);
                break;
            }
            seen += 1;
        }
    }
    let after_plan = test_plan_child.expect("position came from the same iteration") + 1;
    let tree_idx = outer
        .next_element_index(after_plan)
        .ok_or_else(|| JmkitError::Xml("TestPlan has no hashTree sibling".to_string()))?;
    if let XmlNode::Element(el) = &outer.children[tree_idx] {
        if el.name != "hashTree" {
            return Err(JmkitError::Xml(format!(
                "expected plan hashTree, found <{}>",
                el.name
            )));
        }
    }
    match &mut outer.children[tree_idx] {
        XmlNode::Element(el) => Ok(el),
        XmlNode::Text(_) => unreachable!("next_element_index returns element positions"),
    }
}

// ---------------------------------------------------------------------------
// Thread groups: controllers then samplers
// ---------------------------------------------------------------------------

fn rename_thread_group_contents(plan_tree: &mut XmlElement, summary: &mut NamingSummary) {
    let mut idx = 0;
    while idx < plan_tree.children.len() {
        let tg_name = match &plan_tree.children[idx] {
            XmlNode::Element(el) if el.name == "ThreadGroup" => {
                el.attr("testname").unwrap_or_default().to_string()
            }
            _ => {
                idx += 1;
                continue;
            }
        };

        let Some(subtree_idx) = plan_tree.next_element_index(idx + 1) else {
            break;
        };
        if let XmlNode::Element(subtree) = &mut plan_tree.children[subtree_idx] {
            if subtree.name == "hashTree" {
                rename_controllers(&tg_name, subtree, summary);
                rename_samplers(subtree, summary);
            }
        }
        idx = subtree_idx + 1;
    }
}

/// Rename every transaction controller under a thread group's tree:
/// `"{threadGroup}. {NN} {oldName}."` with a per-thread-group sequence.
fn rename_controllers(tg_name: &str, tree: &mut XmlElement, summary: &mut NamingSummary) {
    let mut seq = 0usize;
    tree.for_each_named_mut("TransactionController", &mut |tc| {
        let old = tc.attr("testname").unwrap_or_default().to_string();
        tc.set_attr("testname", format!("{tg_name}. {seq:02} {old}."));
        seq += 1;
        summary.controllers += 1;
    });
}

/// Pair each transaction controller with its sibling hashTree and rename
/// the HTTP samplers inside it after the (already renamed) controller.
fn rename_samplers(tree: &mut XmlElement, summary: &mut NamingSummary) {
    enum Step {
        Controller(String),
        Descend,
        Skip,
    }

    let mut idx = 0;
    while idx < tree.children.len() {
        let step = match &tree.children[idx] {
            XmlNode::Element(el) if el.name == "TransactionController" => {
                Step::Controller(el.attr("testname").unwrap_or_default().to_string())
            }
            XmlNode::Element(el) if el.name == "hashTree" => Step::Descend,
            _ => Step::Skip,
        };

        match step {
            Step::Controller(tc_name) => {
                if let Some(subtree_idx) = tree.next_element_index(idx + 1) {
                    if let XmlNode::Element(subtree) = &mut tree.children[subtree_idx] {
                        if subtree.name == "hashTree" {
                            let mut sampler_idx = 0usize;
                            subtree.for_each_named_mut("HTTPSamplerProxy", &mut |sampler| {
                                if rename_sampler(&tc_name, sampler_idx, sampler) {
                                    summary.samplers += 1;
                                }
                                sampler_idx += 1;
                            });
                            // Controllers nested inside this subtree rename
                            // their own samplers again; the innermost name
                            // wins.
                            rename_samplers(subtree, summary);
                        }
                    }
                    idx = subtree_idx + 1;
                    continue;
                }
            }
            Step::Descend => {
                // Controllers can sit deeper inside plain hashTrees.
                if let XmlNode::Element(subtree) = &mut tree.children[idx] {
                    rename_samplers(subtree, summary);
                }
            }
            Step::Skip => {}
        }
        idx += 1;
    }
}

fn sampler_prop_text(sampler: &XmlElement, prop: &str) -> Option<String> {
    sampler
        .elements()
        .find(|el| el.attr("name") == Some(prop))
        .map(XmlElement::text)
}

/// `"{tcName}-{i} {METHOD} {host}{path}"`; long paths are abbreviated to
/// their last three segments and `$` is stripped from host and path.
fn rename_sampler(tc_name: &str, index: usize, sampler: &mut XmlElement) -> bool {
    let Some(method) = sampler_prop_text(sampler, "HTTPSampler.method") else {
        tracing::warn!(sampler = ?sampler.attr("testname"), "sampler has no method prop, skipped");
        return false;
    };
    let Some(path) = sampler_prop_text(sampler, "HTTPSampler.path") else {
        tracing::warn!(sampler = ?sampler.attr("testname"), "sampler has no path prop, skipped");
        return false;
    };
    // The domain box may be empty when the full URL comes from a config
    // element or a previous request.
    let host = sampler_prop_text(sampler, "HTTPSampler.domain")
        .unwrap_or_default()
        .replace('$', "");

    let path = abbreviate_path(&path).replace('$', "");
    sampler.set_attr("testname", format!("{tc_name}-{index} {method} {host}{path}"));
    true
}

fn abbreviate_path(path: &str) -> String {
    if path.len() <= MAX_PATH_LEN {
        return path.to_string();
    }
    let segments: Vec<&str> = path.split('/').collect();
    let tail = segments[segments.len().saturating_sub(3)..].join("/");
    format!("/....{tail}")
}

// ---------------------------------------------------------------------------
// Extractors
// ---------------------------------------------------------------------------

/// The `C_` prefix check mirrors the convention's intent: first letter `c`
/// in either case followed by an underscore counts as already prefixed.
fn has_capture_prefix(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(
        (chars.next(), chars.next()),
        (Some(first), Some('_')) if first.eq_ignore_ascii_case(&'c')
    )
}

fn rename_extractors(root: &mut XmlElement, summary: &mut NamingSummary) {
    for (element, refname_prop, default_prop) in EXTRACTOR_KINDS {
        root.for_each_named_mut(element, &mut |extractor| {
            let testclass = extractor.attr("testclass").unwrap_or(element).to_string();

            let Some(refname_el) = extractor
                .find_descendant_mut(&|el| el.name == "stringProp" && el.attr("name") == Some(refname_prop))
            else {
                tracing::warn!(element, "extractor without a refname prop, skipped");
                return;
            };

            let original = refname_el.text();
            let refname = if has_capture_prefix(&original) {
                original.clone()
            } else {
                let renamed = format!("C_{original}");
                summary.renames.insert(original.clone(), renamed.clone());
                refname_el.set_text(renamed.clone());
                renamed
            };

            let default_text = format!("{refname}__not_found");
            match extractor
                .find_descendant_mut(&|el| el.name == "stringProp" && el.attr("name") == Some(default_prop))
            {
                Some(default_el) => default_el.set_text(default_text),
                None => {
                    // JSON post-processors are often saved without a
                    // defaults prop; create it.
                    let mut prop = XmlElement::new("stringProp");
                    prop.set_attr("name", default_prop);
                    prop.set_text(default_text);
                    extractor.children.push(XmlNode::Element(prop));
                }
            }

            extractor.set_attr("testname", format!("{testclass} {refname}"));
            summary.extractors += 1;
        });
    }
}

// ---------------------------------------------------------------------------
// JSR223 post-processors
// ---------------------------------------------------------------------------

/// Suffix each JSR223 post-processor's testname with its document-order
/// index so duplicated names stay distinguishable in listeners.
fn suffix_post_processors(root: &mut XmlElement, summary: &mut NamingSummary) {
    let mut index = 0usize;
    root.for_each_named_mut("JSR223PostProcessor", &mut |pp| {
        let name = pp.attr("testname").unwrap_or_default().to_string();
        pp.set_attr("testname", format!("{name}_{index}"));
        index += 1;
        summary.post_processors += 1;
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::tree::parse_document;

    const PLAN: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<jmeterTestPlan version="1.2">
  <hashTree>
    <TestPlan testname="Plan"/>
    <hashTree>
      <ThreadGroup testname="Shoppers"/>
      <hashTree>
        <TransactionController testname="Checkout"/>
        <hashTree>
          <HTTPSamplerProxy testname="old">
            <stringProp name="HTTPSampler.method">GET</stringProp>
            <stringProp name="HTTPSampler.domain">shop.example.com</stringProp>
            <stringProp name="HTTPSampler.path">/cart</stringProp>
          </HTTPSamplerProxy>
          <hashTree>
            <RegexExtractor testclass="RegexExtractor" testname="re">
              <stringProp name="RegexExtractor.refname">token</stringProp>
              <stringProp name="RegexExtractor.default">none</stringProp>
            </RegexExtractor>
            <hashTree/>
          </hashTree>
        </hashTree>
        <TransactionController testname="Browse"/>
        <hashTree>
          <HTTPSamplerProxy testname="old2">
            <stringProp name="HTTPSampler.method">POST</stringProp>
            <stringProp name="HTTPSampler.path">/search</stringProp>
          </HTTPSamplerProxy>
          <hashTree/>
        </hashTree>
      </hashTree>
    </hashTree>
  </hashTree>
</jmeterTestPlan>
"#;

    fn find_testname(root: &XmlElement, element: &str, results: &mut Vec<String>) {
        for el in root.elements() {
            if el.name == element {
                results.push(el.attr("testname").unwrap_or_default().to_string());
            }
            find_testname(el, element, results);
        }
    }

    fn testnames(root: &XmlElement, element: &str) -> Vec<String> {
        let mut names = Vec::new();
        find_testname(root, element, &mut names);
        names
    }

    #[test]
    fn controllers_gain_thread_group_and_sequence() {
        let mut root = parse_document(PLAN).unwrap();
        let summary = apply_naming_conventions(&mut root).unwrap();
        assert_eq!(summary.controllers, 2);
        let names = testnames(&root, "TransactionController");
        assert_eq!(names, vec!["Shoppers. 00 Checkout.", "Shoppers. 01 Browse."]);
    }

    #[test]
    fn samplers_compose_controller_method_host_path() {
        let mut root = parse_document(PLAN).unwrap();
        let summary = apply_naming_conventions(&mut root).unwrap();
        assert_eq!(summary.samplers, 2);
        let names = testnames(&root, "HTTPSamplerProxy");
        assert_eq!(
            names,
            vec![
                "Shoppers. 00 Checkout.-0 GET shop.example.com/cart",
                "Shoppers. 01 Browse.-0 POST /search",
            ]
        );
    }

    #[test]
    fn nested_controller_owns_its_samplers() {
        let plan = r#"<?xml version="1.0" encoding="UTF-8"?>
<jmeterTestPlan version="1.2">
  <hashTree>
    <TestPlan testname="Plan"/>
    <hashTree>
      <ThreadGroup testname="Shoppers"/>
      <hashTree>
        <TransactionController testname="Outer"/>
        <hashTree>
          <HTTPSamplerProxy testname="first">
            <stringProp name="HTTPSampler.method">GET</stringProp>
            <stringProp name="HTTPSampler.domain">host</stringProp>
            <stringProp name="HTTPSampler.path">/a</stringProp>
          </HTTPSamplerProxy>
          <hashTree/>
          <TransactionController testname="Inner"/>
          <hashTree>
            <HTTPSamplerProxy testname="second">
              <stringProp name="HTTPSampler.method">GET</stringProp>
              <stringProp name="HTTPSampler.domain">host</stringProp>
              <stringProp name="HTTPSampler.path">/b</stringProp>
            </HTTPSamplerProxy>
            <hashTree/>
          </hashTree>
        </hashTree>
      </hashTree>
    </hashTree>
  </hashTree>
</jmeterTestPlan>
"#;
        let mut root = parse_document(plan).unwrap();
        apply_naming_conventions(&mut root).unwrap();
        let names = testnames(&root, "HTTPSamplerProxy");
        assert_eq!(
            names,
            vec![
                "Shoppers. 00 Outer.-0 GET host/a",
                "Shoppers. 01 Inner.-0 GET host/b",
            ]
        );
    }

    #[test]
    fn extractor_gains_prefix_default_and_testname() {
        let mut root = parse_document(PLAN).unwrap();
        let summary = apply_naming_conventions(&mut root).unwrap();
        assert_eq!(summary.extractors, 1);
        assert_eq!(summary.renames.get("token"), Some(&"C_token".to_string()));

        let mut refname = String::new();
        let mut default = String::new();
        let mut root_view = root.clone();
        if let Some(el) = root_view.find_descendant_mut(&|el| {
            el.name == "stringProp" && el.attr("name") == Some("RegexExtractor.refname")
        }) {
            refname = el.text();
        }
        if let Some(el) = root_view.find_descendant_mut(&|el| {
            el.name == "stringProp" && el.attr("name") == Some("RegexExtractor.default")
        }) {
            default = el.text();
        }
        assert_eq!(refname, "C_token");
        assert_eq!(default, "C_token__not_found");
        assert_eq!(testnames(&root, "RegexExtractor"), vec!["RegexExtractor C_token"]);
    }

    #[test]
    fn already_prefixed_refname_is_untouched() {
        let plan = PLAN.replace(
            ">token<",
            ">C_token<",
        );
        let mut root = parse_document(&plan).unwrap();
        let summary = apply_naming_conventions(&mut root).unwrap();
        assert!(summary.renames.is_empty());
        assert_eq!(testnames(&root, "RegexExtractor"), vec!["RegexExtractor C_token"]);
    }

    #[test]
    fn lowercase_c_prefix_counts_as_prefixed() {
        assert!(has_capture_prefix("C_token"));
        assert!(has_capture_prefix("c_token"));
        assert!(!has_capture_prefix("Ca_token"));
        assert!(!has_capture_prefix("token"));
        assert!(!has_capture_prefix(""));
    }

    #[test]
    fn json_post_processor_gets_created_default() {
        let plan = PLAN.replace(
            r#"<RegexExtractor testclass="RegexExtractor" testname="re">
              <stringProp name="RegexExtractor.refname">token</stringProp>
              <stringProp name="RegexExtractor.default">none</stringProp>
            </RegexExtractor>"#,
            r#"<JSONPostProcessor testclass="JSONPostProcessor" testname="jp">
              <stringProp name="JSONPostProcessor.referenceNames">userId</stringProp>
            </JSONPostProcessor>"#,
        );
        let mut root = parse_document(&plan).unwrap();
        apply_naming_conventions(&mut root).unwrap();
        let default = root
            .find_descendant_mut(&|el| {
                el.name == "stringProp" && el.attr("name") == Some("JSONPostProcessor.defaultValues")
            })
            .map(|el| el.text());
        assert_eq!(default, Some("C_userId__not_found".to_string()));
    }

    #[test]
    fn jsr223_post_processors_get_index_suffix() {
        let plan = PLAN.replace(
            "<hashTree/>\n        </hashTree>",
            r#"<JSR223PostProcessor testname="fix headers"/>
          <JSR223PostProcessor testname="fix headers"/>
        </hashTree>"#,
        );
        let mut root = parse_document(&plan).unwrap();
        let summary = apply_naming_conventions(&mut root).unwrap();
        assert_eq!(summary.post_processors, 2);
        let names = testnames(&root, "JSR223PostProcessor");
        assert_eq!(names, vec!["fix headers_0", "fix headers_1"]);
    }

    #[test]
    fn long_paths_abbreviate_to_last_three_segments() {
        let long = "/very/long/path/that/keeps/going/and/going/far/beyond/limit";
        assert_eq!(abbreviate_path(long), "/....far/beyond/limit");
        assert_eq!(abbreviate_path("/short"), "/short");
    }

    #[test]
    fn missing_test_plan_is_error() {
        let mut root = parse_document("<jmeterTestPlan><hashTree/></jmeterTestPlan>").unwrap();
        assert!(apply_naming_conventions(&mut root).is_err());
    }
}
