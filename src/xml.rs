//! Minimal owned XML element tree.
//!
//! `parse_document` reads a whole document with quick-xml into an
//! [`XmlNode`] tree. Nodes follow the ElementTree text model: `text` is the
//! character data before the first child, `tail` is the character data
//! between a node's end tag and the next sibling. The query helpers look
//! nodes up by tag name in document (depth-first, pre-order) order.
//!
//! Documents nested deeper than [`MAX_DEPTH`] are rejected, and every walk
//! over a tree is iterative.

use crate::error::{OptionExt, Result, ScoutError};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

/// Deepest element nesting `parse_document` accepts
pub const MAX_DEPTH: usize = 1024;

/// One element of a parsed document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub text: String,
    pub tail: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// All character data inside this node, nested markup included, in document order.
    pub fn text_content(&self) -> String {
        enum Piece<'a> {
            Node(&'a XmlNode),
            Tail(&'a str),
        }

        let mut out = String::new();
        let mut stack = vec![Piece::Node(self)];

        while let Some(piece) = stack.pop() {
            match piece {
                Piece::Node(node) => {
                    out.push_str(&node.text);
                    for child in node.children.iter().rev() {
                        stack.push(Piece::Tail(&child.tail));
                        stack.push(Piece::Node(child));
                    }
                }
                Piece::Tail(tail) => out.push_str(tail),
            }
        }
        out
    }

    /// First direct child named `name`.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Trimmed text of the first direct child named `name`, or `""`.
    pub fn child_text(&self, name: &str) -> &str {
        self.child(name).map(|c| c.text.trim()).unwrap_or("")
    }

    /// This node followed by all of its descendants.
    pub fn iter(&self) -> Descendants<'_> {
        Descendants { stack: vec![self] }
    }

    /// All descendants, excluding this node.
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.children.iter().rev().collect(),
        }
    }

    /// First descendant named `name`.
    pub fn find(&self, name: &str) -> Option<&XmlNode> {
        self.descendants().find(|n| n.name == name)
    }

    /// Every descendant named `name`.
    pub fn find_all(&self, name: &str) -> Vec<&XmlNode> {
        self.descendants().filter(|n| n.name == name).collect()
    }

    /// Nodes matching `.//path[0]/path[1]/...`: any descendant named
    /// `path[0]`, then direct children for the remaining steps.
    pub fn find_path(&self, path: &[&str]) -> Vec<&XmlNode> {
        let Some((first, rest)) = path.split_first() else {
            return Vec::new();
        };

        let mut current = self.find_all(first);
        for step in rest {
            current = current
                .into_iter()
                .flat_map(|node| node.children.iter().filter(|c| c.name == *step))
                .collect();
        }
        current
    }
}

/// Depth-first, pre-order walk over a subtree.
pub struct Descendants<'a> {
    stack: Vec<&'a XmlNode>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// Parse a complete XML document and return its root element.
///
/// Declarations, DOCTYPE, comments and processing instructions are skipped.
/// Fails on malformed markup, mismatched or unclosed tags, documents with
/// no root element or more than one, and nesting deeper than [`MAX_DEPTH`].
pub fn parse_document(content: &str) -> Result<XmlNode> {
    let mut reader = Reader::from_str(content);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            ScoutError::Parse(format!(
                "XML parsing error at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(ScoutError::Parse(format!(
                        "XML nesting deeper than {} elements at position {}",
                        MAX_DEPTH,
                        reader.buffer_position()
                    )));
                }
                stack.push(start_node(&e)?);
            }
            Event::Empty(e) => {
                let node = start_node(&e)?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::End(_) => {
                let node = stack.pop().ok_or_parse("Unexpected closing tag")?;
                attach(&mut stack, &mut root, node)?;
            }
            Event::Text(e) => {
                let text = e
                    .unescape()
                    .map_err(|e| ScoutError::Parse(format!("Invalid XML text content: {}", e)))?;
                push_text(&mut stack, &text);
            }
            Event::CData(e) => {
                let raw = e.into_inner();
                push_text(&mut stack, &String::from_utf8_lossy(&raw));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ScoutError::Parse(format!(
            "Unexpected end of document inside <{}>",
            open.name
        )));
    }

    root.ok_or_parse("Document has no root element")
}

fn start_node(e: &BytesStart<'_>) -> Result<XmlNode> {
    let mut node = XmlNode::new(String::from_utf8_lossy(e.name().as_ref()));

    for attr in e.attributes() {
        let attr = attr.map_err(|e| ScoutError::Parse(format!("Invalid attribute: {}", e)))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| ScoutError::Parse(format!("Invalid attribute value: {}", e)))?
            .into_owned();
        node.attributes.push((key, value));
    }

    Ok(node)
}

/// Hang a finished node under the open element, or make it the root.
fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None if root.is_none() => *root = Some(node),
        None => {
            return Err(ScoutError::Parse(format!(
                "Multiple root elements (second is <{}>)",
                node.name
            )))
        }
    }
    Ok(())
}

fn push_text(stack: &mut [XmlNode], text: &str) {
    // Character data outside the root element is ignored
    let Some(parent) = stack.last_mut() else {
        return;
    };

    match parent.children.last_mut() {
        Some(previous) => previous.tail.push_str(text),
        None => parent.text.push_str(text),
    }
}
