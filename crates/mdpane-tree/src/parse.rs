//! HTML fragment parser.
//!
//! Parses the raw HTML that markdown lets through into tree nodes. The input
//! is fragment text, not a document: multiple top-level nodes are fine, void
//! elements may be written without the self-closing slash, attributes may
//! have no value, and end tags may be missing or stray. Named entities are
//! converted to Unicode up front so the XML reader only sees its own five.

use std::sync::LazyLock;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use regex::Regex;

use crate::entities::convert_named_entities;
use crate::error::TreeError;
use crate::{Element, Node};

/// HTML void elements: serialized without a closing tag, never any children.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Check whether a tag is an HTML void element.
pub(crate) fn is_void(tag: &str) -> bool {
    VOID_ELEMENTS.contains(&tag)
}

/// Matches void-element open tags written without the self-closing slash.
static VOID_TAG_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)<(area|base|br|col|embed|hr|img|input|link|meta|param|source|track|wbr)(\s[^<>]*[^/<>])?>",
    )
    .expect("invalid void tag regex")
});

/// Rewrite `<br>` style void tags to `<br/>` so the XML reader accepts them.
fn normalize_void_tags(html: &str) -> String {
    VOID_TAG_PATTERN.replace_all(html, "<$1$2/>").into_owned()
}

/// Parse an HTML fragment into a sequence of tree nodes.
///
/// Stray end tags are ignored; elements still open at end of input are
/// closed in stack order. Comments are kept as [`Node::Comment`] because the
/// directive passes act on them.
///
/// # Errors
///
/// Returns an error if the fragment is malformed beyond what HTML leniency
/// can absorb, or if it contains invalid attribute syntax or encoding.
pub fn parse_fragment(html: &str) -> Result<Vec<Node>, TreeError> {
    let html = convert_named_entities(html);
    let html = normalize_void_tags(&html);

    let mut reader = Reader::from_str(&html);
    reader.config_mut().trim_text(false);
    // close_element handles mismatched and stray end tags itself.
    reader.config_mut().check_end_names = false;
    reader.config_mut().allow_unmatched_ends = true;

    // Stack of open elements; index 0 is a synthetic root.
    let mut stack: Vec<Element> = vec![Element::default()];

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                let element = element_from_start(&reader, &e)?;
                if is_void(&element.tag) {
                    // A void element cannot take children even when the
                    // source writes it as an open tag.
                    push_node(&mut stack, Node::Element(element));
                } else {
                    stack.push(element);
                }
            }
            Event::Empty(e) => {
                let element = element_from_start(&reader, &e)?;
                push_node(&mut stack, Node::Element(element));
            }
            Event::End(e) => {
                let tag = decode_bytes(&reader, e.name().as_ref()).to_ascii_lowercase();
                close_element(&mut stack, &tag);
            }
            Event::Text(e) => {
                let text = reader.decoder().decode(&e)?;
                push_text(&mut stack, &text);
            }
            Event::GeneralRef(e) => {
                let entity = reader.decoder().decode(&e)?;
                push_text(&mut stack, &decode_entity(&entity));
            }
            Event::CData(e) => {
                let text = String::from_utf8_lossy(&e).into_owned();
                push_text(&mut stack, &text);
            }
            Event::Comment(e) => {
                let text = reader.decoder().decode(&e)?.into_owned();
                push_node(&mut stack, Node::Comment(text));
            }
            Event::Eof => break,
            Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }

    // Close anything left open.
    while stack.len() > 1 {
        if let Some(element) = stack.pop() {
            push_node(&mut stack, Node::Element(element));
        }
    }

    Ok(stack.pop().map(|root| root.children).unwrap_or_default())
}

/// Build an element from a start or empty tag.
fn element_from_start(reader: &Reader<&[u8]>, e: &BytesStart) -> Result<Element, TreeError> {
    let mut element = Element::new(decode_bytes(reader, e.name().as_ref()).to_ascii_lowercase());

    // html_attributes allows value-less attributes like `disabled`.
    for attr in e.html_attributes() {
        let attr = attr?;
        let key = decode_bytes(reader, attr.key.as_ref()).to_ascii_lowercase();
        let value = attr.unescape_value().map_or_else(
            |_| String::from_utf8_lossy(&attr.value).into_owned(),
            std::borrow::Cow::into_owned,
        );
        match key.as_str() {
            "class" => element.classes = value.split_whitespace().map(String::from).collect(),
            "style" => element.style = Some(value),
            _ => element.attrs.push((key, value)),
        }
    }

    Ok(element)
}

/// Attach a finished node to the innermost open element.
fn push_node(stack: &mut [Element], node: Node) {
    if let Some(top) = stack.last_mut() {
        top.children.push(node);
    }
}

/// Append character data to the innermost open element.
fn push_text(stack: &mut [Element], text: &str) {
    if let Some(top) = stack.last_mut() {
        top.push_text(text);
    }
}

/// Close the innermost open element matching `tag`.
///
/// Elements opened after it are closed implicitly; an end tag with no
/// matching open element is dropped.
fn close_element(stack: &mut Vec<Element>, tag: &str) {
    let open_at = stack
        .iter()
        .enumerate()
        .skip(1)
        .rev()
        .find(|(_, element)| element.tag == tag)
        .map(|(index, _)| index);

    let Some(open_at) = open_at else {
        tracing::debug!(tag, "ignoring stray end tag");
        return;
    };

    while stack.len() > open_at {
        if let Some(element) = stack.pop() {
            push_node(stack, Node::Element(element));
        }
    }
}

/// Decode reader bytes, falling back to lossy UTF-8.
fn decode_bytes(reader: &Reader<&[u8]>, bytes: &[u8]) -> String {
    reader.decoder().decode(bytes).map_or_else(
        |_| String::from_utf8_lossy(bytes).into_owned(),
        std::borrow::Cow::into_owned,
    )
}

/// Decode XML entity references to their character values.
fn decode_entity(entity: &str) -> String {
    match entity {
        "lt" => "<".to_owned(),
        "gt" => ">".to_owned(),
        "amp" => "&".to_owned(),
        "apos" => "'".to_owned(),
        "quot" => "\"".to_owned(),
        // Numeric character references
        s if s.starts_with('#') => {
            let code = if s.starts_with("#x") || s.starts_with("#X") {
                u32::from_str_radix(&s[2..], 16).ok()
            } else {
                s[1..].parse::<u32>().ok()
            };
            code.and_then(char::from_u32)
                .map_or_else(|| format!("&{entity};"), |c| c.to_string())
        }
        // Unknown entity - preserve as-is
        _ => format!("&{entity};"),
    }
}
