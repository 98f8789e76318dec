//! Minimal mutable XML tree over quick-xml events.
//!
//! quick-xml is event-based; the naming rules need in-place mutation of a
//! document tree, so events are collected into this small DOM and written
//! back out afterwards. Text nodes (including indentation whitespace) are
//! preserved so the serialized document keeps the original layout.

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::{Reader, Writer};

use crate::error::JmkitError;

/// A child of an element: nested element or character data.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// One element with its attributes and children, in document order.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlElement {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set an attribute, replacing an existing one of the same name.
    pub fn set_attr(&mut self, key: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key.to_string(), value)),
        }
    }

    /// Concatenated character data of direct children.
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// Replace all children with a single text node.
    pub fn set_text(&mut self, value: impl Into<String>) {
        self.children = vec![XmlNode::Text(value.into())];
    }

    /// Direct child elements.
    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    /// Visit every descendant element with the given name, in document
    /// order (the `.//name` axis).
    pub fn for_each_named_mut(&mut self, name: &str, f: &mut impl FnMut(&mut XmlElement)) {
        for child in &mut self.children {
            if let XmlNode::Element(el) = child {
                if el.name == name {
                    f(el);
                }
                el.for_each_named_mut(name, f);
            }
        }
    }

    /// First descendant element (depth-first) matching the predicate.
    pub fn find_descendant_mut(
        &mut self,
        pred: &impl Fn(&XmlElement) -> bool,
    ) -> Option<&mut XmlElement> {
        for child in &mut self.children {
            if let XmlNode::Element(el) = child {
                if pred(el) {
                    return Some(el);
                }
                if let Some(found) = el.find_descendant_mut(pred) {
                    return Some(found);
                }
            }
        }
        None
    }

    /// Index of the next element child at or after `from`, skipping text
    /// nodes. Sibling pairing (element followed by its `hashTree`) relies
    /// on this.
    pub fn next_element_index(&self, from: usize) -> Option<usize> {
        self.children[from..]
            .iter()
            .position(|child| matches!(child, XmlNode::Element(_)))
            .map(|offset| from + offset)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

fn xml_err(e: impl std::fmt::Display) -> JmkitError {
    JmkitError::Xml(e.to_string())
}

/// Parse an XML document into its root element.
pub fn parse_document(xml: &str) -> Result<XmlElement, JmkitError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                stack.push(element_from_start(&start)?);
            }
            Event::Empty(start) => {
                let el = element_from_start(&start)?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| JmkitError::Xml("unbalanced closing tag".to_string()))?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::Text(text) => {
                if let Some(top) = stack.last_mut() {
                    let content = text.unescape().map_err(xml_err)?.into_owned();
                    top.children.push(XmlNode::Text(content));
                }
            }
            Event::CData(data) => {
                if let Some(top) = stack.last_mut() {
                    let content = String::from_utf8_lossy(&data).into_owned();
                    top.children.push(XmlNode::Text(content));
                }
            }
            Event::Eof => break,
            // Declaration, comments, processing instructions: not part of
            // the mutable model.
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(JmkitError::Xml("unclosed element at end of input".to_string()));
    }
    root.ok_or_else(|| JmkitError::Xml("document has no root element".to_string()))
}

fn element_from_start(start: &BytesStart<'_>) -> Result<XmlElement, JmkitError> {
    let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let mut el = XmlElement::new(name);
    for attr in start.attributes() {
        let attr = attr.map_err(xml_err)?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr.unescape_value().map_err(xml_err)?.into_owned();
        el.attrs.push((key, value));
    }
    Ok(el)
}

fn attach(
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
    el: XmlElement,
) -> Result<(), JmkitError> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(el)),
        None => {
            if root.is_some() {
                return Err(JmkitError::Xml("multiple root elements".to_string()));
            }
            *root = Some(el);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// Serialize a tree back to an XML document with the standard declaration.
pub fn to_xml_string(root: &XmlElement) -> Result<String, JmkitError> {
    let mut writer = Writer::new(Vec::new());
    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(xml_err)?;
    writer
        .write_event(Event::Text(BytesText::new("\n")))
        .map_err(xml_err)?;
    write_element(&mut writer, root)?;

    let bytes = writer.into_inner();
    String::from_utf8(bytes).map_err(|e| JmkitError::Xml(format!("invalid UTF-8: {e}")))
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &XmlElement) -> Result<(), JmkitError> {
    let mut start = BytesStart::new(el.name.as_str());
    for (key, value) in &el.attrs {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if el.children.is_empty() {
        writer.write_event(Event::Empty(start)).map_err(xml_err)?;
        return Ok(());
    }

    writer.write_event(Event::Start(start)).map_err(xml_err)?;
    for child in &el.children {
        match child {
            XmlNode::Element(inner) => write_element(writer, inner)?,
            XmlNode::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(xml_err)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.name.as_str())))
        .map_err(xml_err)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
