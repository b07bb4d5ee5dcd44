//! Ignore region stripping.
//!
//! Authors fence off parts of a document with marker comments; everything
//! between a start and end marker in the same sibling list is dropped, the
//! markers included. A start without an end runs to the end of its list.

use mdpane_tree::{Fragment, Node};

const START_MARKER: &str = "mdpane:ignore:start";
const END_MARKER: &str = "mdpane:ignore:end";

pub(crate) fn strip(fragment: &mut Fragment) {
    strip_children(&mut fragment.children);
}

fn strip_children(nodes: &mut Vec<Node>) {
    let mut kept = Vec::with_capacity(nodes.len());
    let mut ignoring = false;

    for mut node in nodes.drain(..) {
        if let Node::Comment(text) = &node {
            let marker = text.trim();
            if marker == START_MARKER {
                ignoring = true;
                continue;
            }
            if marker == END_MARKER {
                ignoring = false;
                continue;
            }
        }
        if ignoring {
            continue;
        }
        if let Node::Element(element) = &mut node {
            strip_children(&mut element.children);
        }
        kept.push(node);
    }

    *nodes = kept;
}
