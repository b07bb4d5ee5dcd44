//! Code highlighting pass.
//!
//! Fenced code blocks carry a `language-<lang>` class from the fence info.
//! Known languages are tokenized with syntect's class-annotating generator,
//! which wraps tokens in classed spans and leaves colors to the stylesheet.
//! Unknown languages keep their plain text.

use std::sync::LazyLock;

use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

use mdpane_tree::{Element, Fragment, Node, parse_fragment};

use crate::error::RenderError;

static SYNTAX_SET: LazyLock<SyntaxSet> = LazyLock::new(SyntaxSet::load_defaults_newlines);

pub(crate) fn annotate(fragment: &mut Fragment) -> Result<(), RenderError> {
    annotate_children(&mut fragment.children)
}

fn annotate_children(nodes: &mut [Node]) -> Result<(), RenderError> {
    for node in nodes {
        let Node::Element(element) = node else {
            continue;
        };
        if element.tag == "pre" {
            if let Some(code) = element.first_element_child_mut()
                && code.tag == "code"
            {
                annotate_code(code)?;
            }
        } else {
            annotate_children(&mut element.children)?;
        }
    }
    Ok(())
}

fn annotate_code(code: &mut Element) -> Result<(), RenderError> {
    let Some(language) = code
        .classes
        .iter()
        .find_map(|class| class.strip_prefix("language-"))
    else {
        return Ok(());
    };
    let Some(syntax) = SYNTAX_SET.find_syntax_by_token(language) else {
        tracing::debug!(language, "no syntax definition, leaving code block plain");
        return Ok(());
    };

    let source = code.text_content();
    let mut generator =
        ClassedHTMLGenerator::new_with_class_style(syntax, &SYNTAX_SET, ClassStyle::Spaced);
    for line in LinesWithEndings::from(&source) {
        generator.parse_html_for_line_which_includes_newline(line)?;
    }
    code.children = parse_fragment(&generator.finalize())?;
    Ok(())
}
