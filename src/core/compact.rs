//! Folding of parsed XML responses into schema-less values.
//!
//! Responses are first collected into a small element tree by
//! [`TreeBuilder`], then reduced by [`compact`]:
//!
//! ```text
//! <DescribeInstancesResponse>
//!   <reservationSet>
//!     <item><imageId>ami-1</imageId></item>
//!   </reservationSet>
//! </DescribeInstancesResponse>
//! ```
//!
//! becomes
//!
//! ```text
//! { "DescribeInstancesResponse": { "reservationSet": [ { "imageId": "ami-1" } ] } }
//! ```
//!
//! Elements whose children are named `item` are sequences, other elements
//! with children are mappings, and leaves are their text.

use crate::core::errors::QueryError;
use crate::core::kernel::xml::{XmlEvent, XmlEventSink};
use serde_json::{Map, Value};

/// Name of the element whose children mark a sequence
pub const ITEM_ELEMENT: &str = "item";

const DOCUMENT_NODE: &str = "#document";

/// One element of the intermediate tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementNode {
    pub name: String,
    pub children: Vec<ElementNode>,
    /// Character data seen directly inside this element, `None` if it was
    /// only whitespace
    pub text: Option<String>,
}

impl ElementNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            text: None,
        }
    }

    /// Leaf element holding `text`
    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            children: Vec::new(),
            text: Some(text.into()),
        }
    }

    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.children.push(child);
        self
    }
}

/// Open element plus the raw character data gathered for it so far
#[derive(Debug)]
struct OpenElement {
    node: ElementNode,
    pending_text: String,
}

impl OpenElement {
    fn new(name: impl Into<String>) -> Self {
        Self {
            node: ElementNode::new(name),
            pending_text: String::new(),
        }
    }

    fn close(mut self) -> ElementNode {
        if !self.pending_text.trim().is_empty() {
            self.node.text = Some(self.pending_text);
        }
        self.node
    }
}

/// Builds an element tree from parse events
///
/// One builder serves exactly one document. The result is the synthetic
/// document wrapper whose single child is the response's root element.
#[derive(Debug)]
pub struct TreeBuilder {
    stack: Vec<OpenElement>,
    document: Option<ElementNode>,
}

impl Default for TreeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl TreeBuilder {
    pub fn new() -> Self {
        Self {
            stack: vec![OpenElement::new(DOCUMENT_NODE)],
            document: None,
        }
    }

    /// The finished tree, once `EndDocument` has been seen
    pub fn finish(self) -> Result<ElementNode, QueryError> {
        self.document.ok_or_else(|| {
            QueryError::MalformedResponse("response ended before the document was complete".into())
        })
    }

    fn start_element(&mut self, name: String) -> Result<(), QueryError> {
        if self.document.is_some() {
            return Err(QueryError::MalformedResponse(format!(
                "element <{}> after end of document",
                name
            )));
        }
        self.stack.push(OpenElement::new(name));
        Ok(())
    }

    fn characters(&mut self, text: &str) {
        // Text outside the root element (prolog whitespace) lands on the
        // wrapper and is never looked at.
        if let Some(open) = self.stack.last_mut() {
            open.pending_text.push_str(text);
        }
    }

    fn end_element(&mut self, name: &str) -> Result<(), QueryError> {
        if self.stack.len() < 2 {
            return Err(QueryError::MalformedResponse(format!(
                "unexpected closing tag </{}>",
                name
            )));
        }
        let closed = self
            .stack
            .pop()
            .map(OpenElement::close)
            .ok_or_else(|| QueryError::MalformedResponse("element stack is empty".into()))?;
        if closed.name != name {
            return Err(QueryError::MalformedResponse(format!(
                "closing tag </{}> does not match <{}>",
                name, closed.name
            )));
        }
        if let Some(parent) = self.stack.last_mut() {
            parent.node.children.push(closed);
        }
        Ok(())
    }

    fn end_document(&mut self) -> Result<(), QueryError> {
        if self.document.is_some() {
            return Err(QueryError::MalformedResponse(
                "end of document reported twice".into(),
            ));
        }
        if self.stack.len() != 1 {
            let open: Vec<&str> = self.stack[1..]
                .iter()
                .map(|e| e.node.name.as_str())
                .collect();
            return Err(QueryError::MalformedResponse(format!(
                "document ended with unclosed elements: {}",
                open.join(" > ")
            )));
        }
        let wrapper = self
            .stack
            .pop()
            .map(OpenElement::close)
            .ok_or_else(|| QueryError::MalformedResponse("element stack is empty".into()))?;
        self.document = Some(wrapper);
        Ok(())
    }
}

impl XmlEventSink for TreeBuilder {
    fn on_event(&mut self, event: XmlEvent) -> Result<(), QueryError> {
        match event {
            XmlEvent::StartElement(name) => self.start_element(name),
            XmlEvent::Characters(text) => {
                self.characters(&text);
                Ok(())
            }
            XmlEvent::EndElement(name) => self.end_element(&name),
            XmlEvent::EndDocument => self.end_document(),
        }
    }
}

/// Reduce a document wrapper to `{ rootName: compacted root }`
pub fn compact(document: &ElementNode) -> Result<Value, QueryError> {
    let root = match document.children.as_slice() {
        [root] => root,
        [] => {
            return Err(QueryError::MalformedResponse(
                "response contains no root element".into(),
            ))
        }
        [_, extra, ..] => {
            return Err(QueryError::MalformedResponse(format!(
                "response has more than one root element (found <{}>)",
                extra.name
            )))
        }
    };

    let mut result = Map::new();
    result.insert(root.name.clone(), compact_node(root)?);
    Ok(Value::Object(result))
}

/// Compact a single element
///
/// A leaf yields its text or `null`; an element with `item` children
/// yields an array in document order; any other element yields an object
/// where a repeated child name keeps the last occurrence.
pub fn compact_node(node: &ElementNode) -> Result<Value, QueryError> {
    if node.children.is_empty() {
        return Ok(node.text.clone().map_or(Value::Null, Value::String));
    }

    let items = node
        .children
        .iter()
        .filter(|c| c.name == ITEM_ELEMENT)
        .count();

    if items == node.children.len() {
        node.children
            .iter()
            .map(compact_node)
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array)
    } else if items > 0 {
        let stray = node
            .children
            .iter()
            .find(|c| c.name != ITEM_ELEMENT)
            .map_or("", |c| c.name.as_str());
        Err(QueryError::MalformedResponse(format!(
            "<{}> mixes <{}> children with <{}>",
            node.name, ITEM_ELEMENT, stray
        )))
    } else {
        let mut map = Map::new();
        for child in &node.children {
            map.insert(child.name.clone(), compact_node(child)?);
        }
        Ok(Value::Object(map))
    }
}
