//! Lightweight element tree over quick-xml events.
//!
//! Only what the article normalizer needs: element names, attributes, nested
//! children and text. Inline markup (`<i>`, `<sup>`, ...) is kept as child
//! elements and flattened back into text by [`Element::text`].

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

use crate::utils::squash_whitespace;

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Element {
    pub name: String,
    attributes: Vec<(String, String)>,
    children: Vec<Node>,
    /// Whether the closing tag was seen
    complete: bool,
}

/// Parse result; `error` is set when the document broke off early
#[derive(Debug, Clone)]
pub struct Document {
    pub root: Element,
    pub error: Option<String>,
}

impl Element {
    fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
            complete: false,
        }
    }

    fn from_start(start: &BytesStart<'_>) -> Self {
        let mut element = Self::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
        for attr in start.attributes().flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map(|v| v.into_owned())
                .unwrap_or_default();
            element.attributes.push((key, value));
        }
        element
    }

    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn has_attributes(&self) -> bool {
        !self.attributes.is_empty()
    }

    /// Direct child elements
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name == name)
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.name == name)
    }

    /// Follow a path of child names
    pub fn find(&self, path: &[&str]) -> Option<&Element> {
        path.iter().try_fold(self, |current, name| current.child(name))
    }

    /// All descendant text, whitespace collapsed
    pub fn text(&self) -> String {
        let mut raw = String::new();
        self.collect_text(&mut raw);
        squash_whitespace(&raw)
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(t) => out.push_str(t),
                Node::Element(e) => e.collect_text(out),
            }
        }
    }
}

fn attach(stack: &mut [Element], node: Node) {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(node);
    }
}

/// Parse `xml` into a tree rooted at a synthetic `#document` element.
///
/// On a syntax error the tree built so far is returned: elements still open
/// at that point are attached but left incomplete.
pub fn parse(xml: &str) -> Document {
    let mut reader = Reader::from_str(xml);
    let mut stack = vec![Element::new("#document")];
    let mut error = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => stack.push(Element::from_start(e)),
            Ok(Event::Empty(ref e)) => {
                let mut element = Element::from_start(e);
                element.complete = true;
                attach(&mut stack, Node::Element(element));
            }
            Ok(Event::Text(t)) => {
                // Unknown entities (e.g. from HTML) keep their raw text
                let text = t
                    .unescape()
                    .map(|c| c.into_owned())
                    .unwrap_or_else(|_| String::from_utf8_lossy(&t).into_owned());
                attach(&mut stack, Node::Text(text));
            }
            Ok(Event::CData(c)) => {
                let text = String::from_utf8_lossy(&c.into_inner()).into_owned();
                attach(&mut stack, Node::Text(text));
            }
            Ok(Event::End(_)) => {
                if stack.len() > 1 {
                    if let Some(mut element) = stack.pop() {
                        element.complete = true;
                        attach(&mut stack, Node::Element(element));
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                error = Some(format!("position {}: {}", reader.buffer_position(), e));
                break;
            }
        }
    }

    while stack.len() > 1 {
        if let Some(open) = stack.pop() {
            attach(&mut stack, Node::Element(open));
        }
    }

    let mut root = stack.pop().unwrap_or_else(|| Element::new("#document"));
    root.complete = error.is_none();
    Document { root, error }
}
