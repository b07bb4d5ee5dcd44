//! Tree rewrite rules.
//!
//! The final pass before serialization: a pre-order walk that fixes up
//! preview-hostile markup and inlines stylesheet declarations onto matching
//! elements. Rules run in a fixed order on every element; removal of the
//! element (interactive inputs) is the only rule that stops the rest.
//! Parent information travels as a read-only context alongside the walk.

use mdpane_styles::StyleMap;
use mdpane_tree::{Element, Fragment, Node};

/// What the element's parent looks like. `child_count` counts all sibling
/// nodes, text included.
#[derive(Clone, Copy)]
struct ParentCtx<'a> {
    tag: &'a str,
    child_count: usize,
}

enum Outcome {
    Keep,
    Remove,
}

pub(crate) fn apply(fragment: &mut Fragment, styles: &StyleMap) {
    rewrite_children(&mut fragment.children, None, styles);
}

fn rewrite_children(nodes: &mut Vec<Node>, parent: Option<ParentCtx<'_>>, styles: &StyleMap) {
    let mut i = 0;
    while i < nodes.len() {
        let outcome = match &mut nodes[i] {
            Node::Element(element) => rewrite_element(element, parent, styles),
            _ => Outcome::Keep,
        };
        match outcome {
            Outcome::Keep => i += 1,
            Outcome::Remove => {
                nodes.remove(i);
            }
        }
    }
}

fn rewrite_element(
    element: &mut Element,
    parent: Option<ParentCtx<'_>>,
    styles: &StyleMap,
) -> Outcome {
    let parent_tag = parent.map(|p| p.tag);

    // Code block text: whitespace collapsing in the preview host must not
    // eat indentation, so edge spaces become no-break spaces.
    if element.tag == "code" && parent_tag == Some("pre") {
        escape_edge_spaces(element);
    }

    // The generated footnote label is screen-reader-only; previews show it.
    if element.tag == "section" && element.has_class("footnotes") {
        ensure_footnote_label(element);
    }

    // Footnote references read as [n] instead of a bare superscript number.
    if element.tag == "sup" {
        bracket_footnote_ref(element);
    }

    // Images scale to the pane; a paragraph's sole image also centers.
    if element.tag == "img" {
        let sole_child = matches!(parent, Some(p) if p.tag == "p" && p.child_count == 1);
        let mut additions = String::from("max-width:100%;");
        if sole_child {
            additions.push_str("display:block;margin:0 auto;");
        }
        prepend_style(element, &additions);
    }

    // Inline code gets a fixed marker class for the stylesheet to key on.
    if element.tag == "code" && parent_tag != Some("pre") {
        element.classes = vec!["code-spans".to_owned()];
    }

    // Checkboxes and friends are interactive; the preview drops them.
    if element.tag == "input" {
        return Outcome::Remove;
    }

    apply_selector_style(element, styles);

    let Element { tag, children, .. } = element;
    let ctx = ParentCtx {
        tag,
        child_count: children.len(),
    };
    rewrite_children(children, Some(ctx), styles);
    Outcome::Keep
}

/// Replace the leading and trailing space run of every line in every text
/// descendant with U+00A0.
fn escape_edge_spaces(element: &mut Element) {
    fn walk(nodes: &mut [Node]) {
        for node in nodes {
            match node {
                Node::Text(text) => *text = escape_text(text),
                Node::Element(element) => walk(&mut element.children),
                Node::Comment(_) | Node::Raw(_) => {}
            }
        }
    }

    walk(&mut element.children);
}

fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            out.push('\n');
        }
        push_escaped_line(&mut out, line);
    }
    out
}

fn push_escaped_line(out: &mut String, line: &str) {
    let without_leading = line.trim_start_matches(' ');
    let leading = line.len() - without_leading.len();
    let body = without_leading.trim_end_matches(' ');
    let trailing = without_leading.len() - body.len();

    for _ in 0..leading {
        out.push('\u{a0}');
    }
    out.push_str(body);
    for _ in 0..trailing {
        out.push('\u{a0}');
    }
}

/// Make the footnote section label visible.
fn ensure_footnote_label(section: &mut Element) {
    if let Some(first) = section.first_element_child_mut()
        && first.tag == "h2"
    {
        first.classes.retain(|class| class != "sr-only");
        return;
    }
    let label = Element::new("h2")
        .with_attr("id", "footnote-label")
        .with_text("Footnotes");
    section.children.insert(0, Node::Element(label));
}

/// Wrap a footnote reference's number in square brackets.
fn bracket_footnote_ref(sup: &mut Element) {
    let Some(link) = sup.first_element_child_mut() else {
        return;
    };
    if link.tag != "a" || !link.has_class("footnote-ref") {
        return;
    }
    let text = link.text_content();
    if text.starts_with('[') && text.ends_with(']') {
        return;
    }
    link.children = vec![Node::Text(format!("[{text}]"))];
}

fn prepend_style(element: &mut Element, additions: &str) {
    let existing = element.style.take().unwrap_or_default();
    element.style = Some(format!("{additions}{existing}"));
}

/// Inline the declaration text for the element's best-matching selector.
/// Matched text goes before any existing inline style, so the authored style
/// wins conflicting properties.
fn apply_selector_style(element: &mut Element, styles: &StyleMap) {
    let mut matched = None;
    for class in &element.classes {
        if let Some(text) = styles.class(class) {
            matched = Some(text);
        }
    }
    if matched.is_none() {
        matched = styles.tag(&element.tag);
    }

    if let Some(text) = matched {
        prepend_style(element, text);
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use mdpane_styles::StyleOptions;
    use mdpane_tree::parse_fragment;

    /// Rewrite `html` against `css`; an empty `css` means an empty map, so
    /// the structural rules can be tested without the seeded defaults.
    fn rewritten(html: &str, css: &str) -> String {
        let styles = if css.is_empty() {
            StyleMap::default()
        } else {
            StyleMap::parse(css, &StyleOptions::default()).unwrap()
        };
        let mut fragment = Fragment::new(parse_fragment(html).unwrap());
        apply(&mut fragment, &styles);
        fragment.to_html()
    }

    #[test]
    fn test_code_block_edge_spaces_become_nbsp() {
        let html = "<pre><code>  two\n    four  \n</code></pre>";
        assert_eq!(
            rewritten(html, ""),
            "<pre><code>\u{a0}\u{a0}two\n\u{a0}\u{a0}\u{a0}\u{a0}four\u{a0}\u{a0}\n</code></pre>"
        );
    }

    #[test]
    fn test_edge_spaces_apply_per_text_node() {
        let html = "<pre><code><span>  let</span> x\n</code></pre>";
        assert_eq!(
            rewritten(html, ""),
            "<pre><code><span>\u{a0}\u{a0}let</span>\u{a0}x\n</code></pre>"
        );
    }

    #[test]
    fn test_inline_code_class_is_replaced() {
        let html = "<p><code class=\"language-js\"> x </code></p>";
        assert_eq!(
            rewritten(html, ""),
            "<p><code class=\"code-spans\"> x </code></p>"
        );
    }

    #[test]
    fn test_footnote_label_becomes_visible() {
        let html = concat!(
            "<section class=\"footnotes\">",
            "<h2 id=\"footnote-label\" class=\"sr-only\">Footnotes</h2>",
            "<ol></ol></section>"
        );
        assert_eq!(
            rewritten(html, ""),
            "<section class=\"footnotes\"><h2 id=\"footnote-label\">Footnotes</h2><ol></ol></section>"
        );
    }

    #[test]
    fn test_footnote_label_inserted_when_missing() {
        let html = "<section class=\"footnotes\"><ol></ol></section>";
        assert_eq!(
            rewritten(html, ""),
            "<section class=\"footnotes\"><h2 id=\"footnote-label\">Footnotes</h2><ol></ol></section>"
        );
    }

    #[test]
    fn test_footnote_ref_gains_brackets() {
        let html = "<sup><a href=\"#fn-1\" id=\"fnref-1\" class=\"footnote-ref\">1</a></sup>";
        assert_eq!(
            rewritten(html, ""),
            "<sup><a href=\"#fn-1\" id=\"fnref-1\" class=\"footnote-ref\">[1]</a></sup>"
        );
    }

    #[test]
    fn test_foreign_sup_is_untouched() {
        assert_eq!(rewritten("<sup>2</sup>", ""), "<sup>2</sup>");
    }

    #[test]
    fn test_bracketing_is_idempotent() {
        let html = "<sup><a class=\"footnote-ref\" href=\"#fn-1\">[1]</a></sup>";
        assert_eq!(
            rewritten(html, ""),
            "<sup><a href=\"#fn-1\" class=\"footnote-ref\">[1]</a></sup>"
        );
    }

    #[test]
    fn test_sole_image_centers() {
        let html = "<p><img src=\"x.png\" alt=\"\"></p>";
        assert_eq!(
            rewritten(html, ""),
            "<p><img src=\"x.png\" alt=\"\" style=\"max-width:100%;display:block;margin:0 auto;\"></p>"
        );
    }

    #[test]
    fn test_accompanied_image_only_scales() {
        let html = "<p><img src=\"x.png\" alt=\"\">caption</p>";
        assert_eq!(
            rewritten(html, ""),
            "<p><img src=\"x.png\" alt=\"\" style=\"max-width:100%;\">caption</p>"
        );
    }

    #[test]
    fn test_image_additions_precede_authored_style() {
        let html = "<p><img src=\"x.png\" style=\"border:0;\"></p>";
        assert_eq!(
            rewritten(html, ""),
            "<p><img src=\"x.png\" style=\"max-width:100%;display:block;margin:0 auto;border:0;\"></p>"
        );
    }

    #[test]
    fn test_inputs_are_removed_text_stays() {
        let html = concat!(
            "<ul class=\"contains-task-list\">",
            "<li class=\"task-list-item\"><input type=\"checkbox\" disabled=\"\"> Done</li>",
            "</ul>"
        );
        assert_eq!(
            rewritten(html, ""),
            "<ul class=\"contains-task-list\"><li class=\"task-list-item\"> Done</li></ul>"
        );
    }

    #[test]
    fn test_last_class_wins() {
        let css = ".a { color: red; } .b { color: blue; }";
        assert_eq!(
            rewritten("<p class=\"a b\">x</p>", css),
            "<p class=\"a b\" style=\"color:blue;\">x</p>"
        );
        assert_eq!(
            rewritten("<p class=\"b a\">x</p>", css),
            "<p class=\"b a\" style=\"color:red;\">x</p>"
        );
    }

    #[test]
    fn test_tag_fallback_when_no_class_matches() {
        let css = "p { margin: 0; } .x { color: red; }";
        assert_eq!(
            rewritten("<p class=\"zzz\">x</p>", css),
            "<p class=\"zzz\" style=\"margin:0;\">x</p>"
        );
        assert_eq!(
            rewritten("<p class=\"x\">x</p>", css),
            "<p class=\"x\" style=\"color:red;\">x</p>"
        );
    }

    #[test]
    fn test_matched_text_precedes_existing_style() {
        let css = ".x { color: red; }";
        assert_eq!(
            rewritten("<p class=\"x\" style=\"color:blue;\">x</p>", css),
            "<p class=\"x\" style=\"color:red;color:blue;\">x</p>"
        );
    }

    #[test]
    fn test_unmatched_element_untouched() {
        assert_eq!(
            rewritten("<p class=\"quiet\">x</p>", ".loud { color: red; }"),
            "<p class=\"quiet\">x</p>"
        );
    }

    #[test]
    fn test_default_entries_style_pre() {
        let styles = StyleMap::parse("", &StyleOptions::default()).unwrap();
        let mut fragment = Fragment::new(parse_fragment("<pre><code>x</code></pre>").unwrap());
        apply(&mut fragment, &styles);
        assert_eq!(
            fragment.to_html(),
            "<pre style=\"background-color:#f6f8fa;border-radius:6px;color:#24292f;\"><code>x</code></pre>"
        );
    }
}
