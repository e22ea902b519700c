//! Owned document tree for UI markup.
//!
//! Markup is parsed with `roxmltree` and copied into [`Element`] values so the
//! later stages (target resolution, validation) can work on a plain tree and
//! produce new trees instead of editing a borrowed document in place.
//!
//! Namespace prefixes and the `xmlns` declarations that introduce them are
//! kept. A leading XML declaration and `<!DOCTYPE>` are dropped; entities
//! declared in an internal DTD subset are not supported.

use roxmltree::Node as XmlNode;
use std::collections::BTreeMap;
use std::fmt;

use crate::error::PreviewResult;

/// Tag of the document root expected by the widget-construction layer.
pub const INTERFACE: &str = "interface";

/// Synthetic root tag used to wrap markup (allows fragments with several top-level objects)
const WRAPPER: &str = "__preview_root__";

const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// One element of the markup: tag, attributes and ordered children.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub attrs: BTreeMap<String, String>,
    pub children: Vec<Node>,
}

/// A child of an [`Element`]. Comments and processing instructions are not kept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

impl Element {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    /// Read an attribute value.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    /// Return a copy of this element with `name` set to `value`.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.insert(name.into(), value.into());
        self
    }

    /// Append a child element (builder style, mostly for tests and catalogs).
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(Node::Element(child));
        self
    }

    /// Iterator over element children (skips text nodes).
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(element) => Some(element),
            Node::Text(_) => None,
        })
    }

    /// Iterator over element children with the given tag.
    pub fn children_named<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |e| e.tag == tag)
    }

    /// First element child with the given tag.
    pub fn first_named<'a>(&'a self, tag: &'a str) -> Option<&'a Element> {
        self.children_named(tag).next()
    }

    /// Serialize back to markup text.
    pub fn to_markup(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.tag)?;
        for (name, value) in &self.attrs {
            write!(f, " {}=\"{}\"", name, escape(value, true))?;
        }
        if self.children.is_empty() {
            return f.write_str("/>");
        }
        f.write_str(">")?;
        for child in &self.children {
            match child {
                Node::Element(element) => write!(f, "{}", element)?,
                Node::Text(text) => f.write_str(&escape(text, false))?,
            }
        }
        write!(f, "</{}>", self.tag)
    }
}

// ─── Parsing ─────────────────────────────────────────────────────────────────

/// Parse markup into a tree rooted at an `interface` element.
///
/// A document whose only top-level element is `<interface>` keeps that root.
/// Anything else (a bare `<object>`, several siblings) becomes the body of an
/// implicit `<interface>` root, so the serialized form is always a complete
/// interface document.
pub fn parse_markup(text: &str) -> PreviewResult<Element> {
    let body = strip_prolog(text.trim());
    let wrapped = format!("<{0}>{1}</{0}>", WRAPPER, body);
    let doc = roxmltree::Document::parse(&wrapped)?;
    let wrapper = convert_element(doc.root_element());

    let interface = {
        let mut top = wrapper.elements();
        match (top.next(), top.next()) {
            (Some(only), None) if only.tag == INTERFACE => Some(only.clone()),
            _ => None,
        }
    };
    if let Some(interface) = interface {
        return Ok(interface);
    }

    Ok(Element {
        tag: INTERFACE.to_string(),
        ..wrapper
    })
}

/// Drop the XML declaration and doctype; neither may appear inside the wrapper.
fn strip_prolog(text: &str) -> &str {
    let mut rest = text;
    if rest.starts_with("<?xml") {
        if let Some(end) = rest.find("?>") {
            rest = rest[end + 2..].trim_start();
        }
    }
    if rest.starts_with("<!DOCTYPE") {
        let end = match (rest.find('['), rest.find('>')) {
            (Some(open), Some(close)) if open < close => rest.find("]>").map(|i| i + 2),
            (_, Some(close)) => Some(close + 1),
            _ => None,
        };
        if let Some(end) = end {
            rest = rest[end..].trim_start();
        }
    }
    rest
}

/// `prefix:name` for a namespaced tag or attribute, plain `name` otherwise.
fn qualified_name(node: XmlNode, namespace: Option<&str>, name: &str) -> String {
    match namespace {
        Some(XML_NAMESPACE) => format!("xml:{}", name),
        Some(uri) => match node.lookup_prefix(uri) {
            Some(prefix) if !prefix.is_empty() => format!("{}:{}", prefix, name),
            _ => name.to_string(),
        },
        None => name.to_string(),
    }
}

fn convert_element(node: XmlNode) -> Element {
    let tag = node.tag_name();
    let mut element = Element::new(qualified_name(node, tag.namespace(), tag.name()));

    // declarations made on this element, not inherited from the parent
    let inherited: Vec<(Option<&str>, &str)> = node
        .parent_element()
        .map(|parent| parent.namespaces().map(|ns| (ns.name(), ns.uri())).collect())
        .unwrap_or_default();
    for ns in node.namespaces() {
        if ns.uri() == XML_NAMESPACE || inherited.contains(&(ns.name(), ns.uri())) {
            continue;
        }
        let declaration = match ns.name() {
            Some(prefix) => format!("xmlns:{}", prefix),
            None => "xmlns".to_string(),
        };
        element.attrs.insert(declaration, ns.uri().to_string());
    }

    for attr in node.attributes() {
        let name = qualified_name(node, attr.namespace(), attr.name());
        element.attrs.insert(name, attr.value().to_string());
    }

    for child in node.children() {
        if child.is_element() {
            element.children.push(Node::Element(convert_element(child)));
        } else if child.is_text() {
            if let Some(text) = child.text() {
                element.children.push(Node::Text(text.to_string()));
            }
        }
    }

    element
}

fn escape(s: &str, attribute: bool) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' if attribute => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
