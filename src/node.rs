//! Telegraph content nodes.
//!
//! Telegraph pages are not HTML strings but a JSON array of nodes. A node is
//! either a bare string or an element object:
//!
//! ```json
//! ["plain text", {"tag": "a", "attrs": {"href": "https://..."}, "children": ["link"]}]
//! ```
//!
//! [`Node`] mirrors that shape exactly through `#[serde(untagged)]`, so a
//! `Vec<Node>` serializes straight into the `content` field of the API.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single content node: text or element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Text(String),
    Element(Element),
}

/// An element node (`<tag attrs...>children</tag>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Element {
    pub tag: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<BTreeMap<String, String>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Node>,
}

impl Node {
    pub fn text(s: impl Into<String>) -> Self {
        Node::Text(s.into())
    }

    pub fn element(tag: &str, children: Vec<Node>) -> Self {
        Node::Element(Element {
            tag: tag.to_string(),
            attrs: None,
            children,
        })
    }

    pub fn element_with_attr(tag: &str, key: &str, value: &str, children: Vec<Node>) -> Self {
        let mut attrs = BTreeMap::new();
        attrs.insert(key.to_string(), value.to_string());
        Node::Element(Element {
            tag: tag.to_string(),
            attrs: Some(attrs),
            children,
        })
    }

    pub fn paragraph(children: Vec<Node>) -> Self {
        Self::element("p", children)
    }

    pub fn link(href: &str, label: impl Into<String>) -> Self {
        Self::element_with_attr("a", "href", href, vec![Node::text(label)])
    }

    pub fn bold(label: impl Into<String>) -> Self {
        Self::element("b", vec![Node::text(label)])
    }

    pub fn image(src: &str) -> Self {
        Self::element_with_attr("img", "src", src, Vec::new())
    }

    pub fn hr() -> Self {
        Self::element("hr", Vec::new())
    }

    /// Tag name, or `None` for text nodes.
    pub fn tag(&self) -> Option<&str> {
        match self {
            Node::Text(_) => None,
            Node::Element(e) => Some(&e.tag),
        }
    }

    /// Value of an attribute on an element node.
    pub fn attr(&self, key: &str) -> Option<&str> {
        match self {
            Node::Element(Element {
                attrs: Some(attrs), ..
            }) => attrs.get(key).map(String::as_str),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Node] {
        match self {
            Node::Text(_) => &[],
            Node::Element(e) => &e.children,
        }
    }

    /// Every `href` in this subtree, in document order.
    pub fn hrefs(&self) -> Vec<&str> {
        let mut out = Vec::new();
        collect_hrefs(self, &mut out);
        out
    }
}

fn collect_hrefs<'a>(node: &'a Node, out: &mut Vec<&'a str>) {
    if node.tag() == Some("a")
        && let Some(href) = node.attr("href")
    {
        out.push(href);
    }
    for child in node.children() {
        collect_hrefs(child, out);
    }
}

/// Every `href` across a node list.
pub fn hrefs(nodes: &[Node]) -> Vec<&str> {
    nodes.iter().flat_map(Node::hrefs).collect()
}
