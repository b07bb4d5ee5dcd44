//! Raw HTML merge pass.
//!
//! The converter leaves markdown-authored HTML as [`Node::Raw`] text, which
//! can open and close elements anywhere in a sibling list. This pass folds
//! that text into real nodes: bottom-up, every children list still holding a
//! raw node is re-serialized (raw text verbatim, everything else through the
//! tree serializer) and parsed again as a fragment. After the pass the tree
//! contains no raw nodes.

use mdpane_tree::{Fragment, Node, TreeError, parse_fragment, serialize_nodes};

pub(crate) fn merge(fragment: &mut Fragment) -> Result<(), TreeError> {
    merge_children(&mut fragment.children)
}

fn merge_children(nodes: &mut Vec<Node>) -> Result<(), TreeError> {
    for node in nodes.iter_mut() {
        if let Node::Element(element) = node {
            merge_children(&mut element.children)?;
        }
    }
    if nodes.iter().any(Node::is_raw) {
        let html = serialize_nodes(nodes);
        *nodes = parse_fragment(&html)?;
    }
    Ok(())
}
