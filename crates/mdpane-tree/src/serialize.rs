//! HTML serializer.

use std::fmt::Write;

use crate::parse::is_void;
use crate::{Element, Fragment, Node};

/// Serialize a fragment to HTML text.
#[must_use]
pub fn serialize(fragment: &Fragment) -> String {
    serialize_nodes(&fragment.children)
}

/// Serialize a sequence of nodes to HTML text.
#[must_use]
pub fn serialize_nodes(nodes: &[Node]) -> String {
    let mut out = String::with_capacity(4096);
    for node in nodes {
        serialize_node(node, &mut out);
    }
    out
}

/// Serialize a single node recursively.
fn serialize_node(node: &Node, out: &mut String) {
    match node {
        Node::Element(element) => serialize_element(element, out),
        Node::Text(text) => out.push_str(&escape_text(text)),
        Node::Comment(text) => {
            write!(out, "<!--{text}-->").unwrap();
        }
        Node::Raw(html) => out.push_str(html),
    }
}

fn serialize_element(element: &Element, out: &mut String) {
    // Opening tag
    out.push('<');
    out.push_str(&element.tag);

    // Attributes in document order, then class, then style
    for (name, value) in &element.attrs {
        write!(out, r#" {}="{}""#, name, escape_attr(value)).unwrap();
    }
    if !element.classes.is_empty() {
        write!(out, r#" class="{}""#, escape_attr(&element.classes.join(" "))).unwrap();
    }
    if let Some(style) = &element.style
        && !style.is_empty()
    {
        write!(out, r#" style="{}""#, escape_attr(style)).unwrap();
    }
    out.push('>');

    // Void elements have no content and no closing tag
    if is_void(&element.tag) {
        return;
    }

    for child in &element.children {
        serialize_node(child, out);
    }

    write!(out, "</{}>", element.tag).unwrap();
}

/// Escape text for HTML content.
fn escape_text(text: &str) -> String {
    escape_html(text, false)
}

/// Escape text for HTML attribute values.
fn escape_attr(text: &str) -> String {
    escape_html(text, true)
}

/// Escape HTML special characters.
fn escape_html(text: &str, escape_quotes: bool) -> String {
    let mut result = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            '"' if escape_quotes => result.push_str("&quot;"),
            _ => result.push(ch),
        }
    }
    result
}
