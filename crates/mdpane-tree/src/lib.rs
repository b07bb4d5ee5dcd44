//! HTML tree model for mdpane.
//!
//! Rendered markdown lives in this tree between parsing and serialization:
//! the converter builds it, the pipeline passes mutate it, and the serializer
//! turns it back into fragment text. The tree owns its full hierarchy; passes
//! that need parent information receive it as a separate read-only context
//! rather than through back-pointers.

mod entities;
mod error;
mod parse;
mod serialize;

pub use error::TreeError;
pub use parse::parse_fragment;
pub use serialize::{serialize, serialize_nodes};

/// Node in an HTML fragment tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    /// Element with tag, attributes and children.
    Element(Element),
    /// Character data.
    Text(String),
    /// Comment contents, without the `<!--`/`-->` delimiters.
    Comment(String),
    /// Verbatim HTML emitted by the markdown parser. Only present between
    /// tree construction and the raw-merge pass, which resolves it into
    /// proper nodes.
    Raw(String),
}

impl Node {
    /// Create a text node.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text(text.into())
    }

    /// Borrow the contained element, if this is an element node.
    #[must_use]
    pub fn as_element(&self) -> Option<&Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Mutably borrow the contained element, if this is an element node.
    pub fn as_element_mut(&mut self) -> Option<&mut Element> {
        match self {
            Self::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Check whether this is an unresolved raw HTML node.
    #[must_use]
    pub fn is_raw(&self) -> bool {
        matches!(self, Self::Raw(_))
    }
}

/// Element node.
///
/// `classes` and `style` are typed fields rather than entries in `attrs`:
/// the rewrite rules dispatch on class membership and concatenate style text,
/// and keeping them typed avoids reparsing attribute strings at every rule.
/// The parser and serializer translate between the two representations.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name, lowercase.
    pub tag: String,
    /// Ordered class list.
    pub classes: Vec<String>,
    /// Inline style text, if any.
    pub style: Option<String>,
    /// Remaining attributes in document order.
    pub attrs: Vec<(String, String)>,
    /// Child nodes, owned.
    pub children: Vec<Node>,
}

impl Element {
    /// Create a new element with the given tag.
    #[must_use]
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }

    /// Append a class name.
    #[must_use]
    pub fn with_class(mut self, class: impl Into<String>) -> Self {
        self.classes.push(class.into());
        self
    }

    /// Set the inline style text.
    #[must_use]
    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    /// Append an attribute.
    #[must_use]
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attrs.push((name.into(), value.into()));
        self
    }

    /// Append a text child.
    #[must_use]
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(Node::Text(text.into()));
        self
    }

    /// Set children.
    #[must_use]
    pub fn with_children(mut self, children: Vec<Node>) -> Self {
        self.children = children;
        self
    }

    /// Check class membership.
    #[must_use]
    pub fn has_class(&self, name: &str) -> bool {
        self.classes.iter().any(|c| c == name)
    }

    /// Look up an attribute value.
    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Set an attribute, replacing an existing value of the same name.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(entry) = self.attrs.iter_mut().find(|(key, _)| *key == name) {
            entry.1 = value;
        } else {
            self.attrs.push((name, value));
        }
    }

    /// Append a child node.
    pub fn push(&mut self, node: Node) {
        self.children.push(node);
    }

    /// Append text, merging with a trailing text child.
    pub fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(Node::Text(existing)) = self.children.last_mut() {
            existing.push_str(text);
        } else {
            self.children.push(Node::Text(text.to_owned()));
        }
    }

    /// Concatenated text of this element and all descendants.
    #[must_use]
    pub fn text_content(&self) -> String {
        fn collect(nodes: &[Node], out: &mut String) {
            for node in nodes {
                match node {
                    Node::Text(text) => out.push_str(text),
                    Node::Element(element) => collect(&element.children, out),
                    Node::Comment(_) | Node::Raw(_) => {}
                }
            }
        }

        let mut out = String::new();
        collect(&self.children, &mut out);
        out
    }

    /// First child that is an element, skipping text and comments.
    #[must_use]
    pub fn first_element_child(&self) -> Option<&Element> {
        self.children.iter().find_map(Node::as_element)
    }

    /// Mutable access to the first element child.
    pub fn first_element_child_mut(&mut self) -> Option<&mut Element> {
        self.children.iter_mut().find_map(Node::as_element_mut)
    }
}

/// Parsed HTML fragment: a sequence of top-level nodes owning the hierarchy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Fragment {
    /// Top-level nodes in document order.
    pub children: Vec<Node>,
}

impl Fragment {
    /// Create a fragment from top-level nodes.
    #[must_use]
    pub fn new(children: Vec<Node>) -> Self {
        Self { children }
    }

    /// Serialize the fragment to HTML text.
    #[must_use]
    pub fn to_html(&self) -> String {
        serialize(self)
    }
}
