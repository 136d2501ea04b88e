//! 🧾 XML — a tiny document tree, because tax authorities never got the JSON memo.
//!
//! 🎬 COLD OPEN — INT. REVENUE OFFICE — 1998, FOREVER
//!
//! "We'd like the payroll submission in XML, please. With a digest. Of the XML.
//! Inside the XML." Nobody in the room objects. Nobody in the room will have to
//! implement it. We are not in the room. We are here.
//!
//! This module parses with quick-xml into an owned tree of [`XmlElement`]s and
//! serializes back with exactly one canonical form:
//! - optional `<?xml version="1.0" encoding="UTF-8"?>` declaration,
//! - attributes in document order,
//! - `& < > " '` escaped,
//! - childless elements written as `<a/>`,
//! - no indentation, no whitespace-only text nodes, no comments.
//!
//! Same tree in, same bytes out. The IRmark digest depends on it. 🦆

use std::borrow::Cow;

use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::{BytesStart, Event};

use crate::error::{IntegrationError, Result};

pub const XML_DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// 🌳 A node is either an element or some text. No comments. No drama.
#[derive(Debug, Clone, PartialEq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// 🏷️ One element with its attributes and children, owned and mutable.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct XmlElement {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

/// 📄 A whole document: the root plus whether it wore a declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct XmlDocument {
    pub declaration: bool,
    pub root: XmlElement,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    pub fn child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    /// 🍃 `<name>text</name>` in one call, the most common shape in any mapping.
    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(name).text(text)
    }

    pub fn push(&mut self, child: XmlElement) {
        self.children.push(XmlNode::Element(child));
    }

    pub fn insert_child(&mut self, index: usize, node: XmlNode) {
        let index = index.min(self.children.len());
        self.children.insert(index, node);
    }

    /// 🗑️ Drop every direct child element called `name`. Returns how many left.
    pub fn remove_children_named(&mut self, name: &str) -> usize {
        let before = self.children.len();
        self.children
            .retain(|node| !matches!(node, XmlNode::Element(el) if el.is_named(name)));
        before - self.children.len()
    }

    /// 🏷️ Name match that ignores any namespace prefix (`ns:IRheader` is an `IRheader`).
    pub fn is_named(&self, name: &str) -> bool {
        self.name == name || self.local_name() == name
    }

    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn elements(&self) -> impl Iterator<Item = &XmlElement> {
        self.children.iter().filter_map(|node| match node {
            XmlNode::Element(el) => Some(el),
            XmlNode::Text(_) => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlElement> {
        self.elements().filter(move |el| el.is_named(name))
    }

    pub fn child_element(&self, name: &str) -> Option<&XmlElement> {
        self.elements().find(|el| el.is_named(name))
    }

    pub fn child_element_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        self.children.iter_mut().find_map(|node| match node {
            XmlNode::Element(el) if el.is_named(name) => Some(el),
            _ => None,
        })
    }

    /// 🧭 Walk down by child names. `path[0]` is a child of `self`.
    pub fn find_path(&self, path: &[&str]) -> Option<&XmlElement> {
        path.iter()
            .try_fold(self, |current, segment| current.child_element(segment))
    }

    pub fn find_path_mut(&mut self, path: &[&str]) -> Option<&mut XmlElement> {
        let mut current = self;
        for segment in path {
            current = current.child_element_mut(segment)?;
        }
        Some(current)
    }

    /// 🔍 Depth-first search for the first descendant called `name` (self included).
    pub fn find_first(&self, name: &str) -> Option<&XmlElement> {
        if self.is_named(name) {
            return Some(self);
        }
        self.elements().find_map(|el| el.find_first(name))
    }

    pub fn find_first_mut(&mut self, name: &str) -> Option<&mut XmlElement> {
        if self.is_named(name) {
            return Some(self);
        }
        self.children.iter_mut().find_map(|node| match node {
            XmlNode::Element(el) => el.find_first_mut(name),
            XmlNode::Text(_) => None,
        })
    }

    /// 📝 Concatenated direct text children.
    pub fn text_content(&self) -> String {
        self.children
            .iter()
            .filter_map(|node| match node {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    /// 📝 Text of the child at `path`, if it exists.
    pub fn text_at(&self, path: &[&str]) -> Option<String> {
        self.find_path(path).map(XmlElement::text_content)
    }

    pub fn to_canonical_string(&self) -> String {
        let mut out = String::new();
        self.write_into(&mut out);
        out
    }

    fn write_into(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (key, value) in &self.attributes {
            out.push(' ');
            out.push_str(key);
            out.push_str("=\"");
            out.push_str(&escape(value.as_str()));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                XmlNode::Element(el) => el.write_into(out),
                XmlNode::Text(text) => out.push_str(&escape(text.as_str())),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

impl XmlDocument {
    pub fn new(root: XmlElement) -> Self {
        Self {
            declaration: true,
            root,
        }
    }

    /// 📥 Parse a document. Whitespace-only text between elements is dropped.
    pub fn parse(xml: &str) -> Result<Self> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;
        let mut declaration = false;

        loop {
            match reader.read_event()? {
                Event::Decl(_) => declaration = true,
                Event::Start(start) => stack.push(element_from(&start)?),
                Event::Empty(start) => {
                    let element = element_from(&start)?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::End(_) => {
                    let element = stack.pop().ok_or_else(|| {
                        IntegrationError::Mapping("XML: closing tag without opening tag".into())
                    })?;
                    attach(&mut stack, &mut root, element)?;
                }
                Event::Text(text) => push_text(&mut stack, text.unescape()?)?,
                Event::CData(cdata) => {
                    let raw = cdata.into_inner();
                    let text = std::str::from_utf8(&raw)
                        .map_err(|err| IntegrationError::Mapping(format!("XML: CDATA is not UTF-8: {err}")))?
                        .to_string();
                    push_text(&mut stack, Cow::Owned(text))?;
                }
                Event::Eof => break,
                // 🗑️ Comments, processing instructions, doctypes: not our department.
                _ => {}
            }
        }

        if !stack.is_empty() {
            return Err(IntegrationError::Mapping(format!(
                "XML: unclosed element '{}'",
                stack.last().map(|el| el.name.as_str()).unwrap_or_default()
            )));
        }
        let root = root.ok_or_else(|| IntegrationError::Mapping("XML: no root element".into()))?;
        Ok(Self { declaration, root })
    }

    pub fn to_canonical_string(&self) -> String {
        let body = self.root.to_canonical_string();
        if self.declaration {
            format!("{XML_DECLARATION}{body}")
        } else {
            body
        }
    }
}

fn element_from(start: &BytesStart<'_>) -> Result<XmlElement> {
    let name = utf8(start.name().as_ref())?;
    let mut element = XmlElement::new(name);
    for attribute in start.attributes() {
        let attribute =
            attribute.map_err(|err| IntegrationError::Mapping(format!("XML attribute: {err}")))?;
        let key = utf8(attribute.key.as_ref())?;
        let value = attribute.unescape_value()?.into_owned();
        element.attributes.push((key, value));
    }
    Ok(element)
}

fn attach(stack: &mut [XmlElement], root: &mut Option<XmlElement>, element: XmlElement) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.push(element),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(IntegrationError::Mapping(
                "XML: more than one root element".into(),
            ));
        }
    }
    Ok(())
}

fn push_text(stack: &mut [XmlElement], text: Cow<'_, str>) -> Result<()> {
    if text.trim().is_empty() {
        return Ok(());
    }
    let parent = stack
        .last_mut()
        .ok_or_else(|| IntegrationError::Mapping("XML: text outside the root element".into()))?;
    // 🧵 Text next to text (say, plain text then CDATA) is one node, not two.
    if let Some(XmlNode::Text(existing)) = parent.children.last_mut() {
        existing.push_str(&text);
    } else {
        parent.children.push(XmlNode::Text(text.into_owned()));
    }
    Ok(())
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|err| IntegrationError::Mapping(format!("XML: name is not UTF-8: {err}")))
}
