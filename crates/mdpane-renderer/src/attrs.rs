//! Attribute directive comments.
//!
//! `<!--mdpane:key=value&key2=value2-->` applies attributes to the nearest
//! preceding element sibling, or to the parent element when the comment has
//! no element before it. Parsed directives disappear from the tree; anything
//! that does not parse stays behind as an ordinary comment.

use mdpane_tree::{Element, Fragment, Node};

const DIRECTIVE_PREFIX: &str = "mdpane:";

pub(crate) fn apply(fragment: &mut Fragment) {
    process_list(&mut fragment.children, None);
}

/// Mutable views into the attribute-bearing fields of the parent element.
struct ParentSlots<'a> {
    classes: &'a mut Vec<String>,
    style: &'a mut Option<String>,
    attrs: &'a mut Vec<(String, String)>,
}

fn process_list(nodes: &mut Vec<Node>, mut parent: Option<ParentSlots<'_>>) {
    let mut i = 0;
    while i < nodes.len() {
        if let Node::Element(element) = &mut nodes[i] {
            let Element {
                classes,
                style,
                attrs,
                children,
                ..
            } = element;
            process_list(
                children,
                Some(ParentSlots {
                    classes,
                    style,
                    attrs,
                }),
            );
            i += 1;
            continue;
        }

        if let Node::Comment(text) = &nodes[i]
            && let Some(pairs) = parse_directive(text)
        {
            if let Some(target) = nodes[..i].iter_mut().rev().find_map(Node::as_element_mut) {
                let Element {
                    classes,
                    style,
                    attrs,
                    ..
                } = target;
                apply_pairs(classes, style, attrs, &pairs);
            } else if let Some(slots) = parent.as_mut() {
                apply_pairs(slots.classes, slots.style, slots.attrs, &pairs);
            } else {
                tracing::debug!("attribute directive has nothing to attach to");
            }
            nodes.remove(i);
            continue;
        }

        i += 1;
    }
}

fn apply_pairs(
    classes: &mut Vec<String>,
    style: &mut Option<String>,
    attrs: &mut Vec<(String, String)>,
    pairs: &[(String, String)],
) {
    for (key, value) in pairs {
        match key.as_str() {
            "class" => classes.extend(value.split_whitespace().map(str::to_owned)),
            "style" => style.get_or_insert_with(String::new).push_str(value),
            _ => {
                if let Some(entry) = attrs.iter_mut().find(|(name, _)| name == key) {
                    entry.1 = value.clone();
                } else {
                    attrs.push((key.clone(), value.clone()));
                }
            }
        }
    }
}

/// Parse `mdpane:key=value&key2=value2` comment text. `None` means the
/// comment is not a well-formed directive.
fn parse_directive(comment: &str) -> Option<Vec<(String, String)>> {
    let body = comment.trim().strip_prefix(DIRECTIVE_PREFIX)?;

    let mut pairs = Vec::new();
    for pair in body.split('&') {
        let (key, value) = pair.split_once('=')?;
        let key = key.trim();
        if key.is_empty() {
            return None;
        }
        pairs.push((key.to_owned(), value.trim().to_owned()));
    }
    Some(pairs)
}
