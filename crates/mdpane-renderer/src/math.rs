//! Math rendering pass.
//!
//! The converter wraps TeX source in `span.math.math-inline` /
//! `div.math.math-display` elements. This pass renders the TeX to MathML and
//! replaces each wrapper's children with the parsed markup; the wrapper and
//! its classes stay, so stylesheet rules keyed on them still apply.

use latex2mathml::{DisplayStyle, latex_to_mathml};
use mdpane_tree::{Element, Fragment, Node, parse_fragment};

use crate::error::RenderError;

pub(crate) fn render(fragment: &mut Fragment) -> Result<(), RenderError> {
    render_children(&mut fragment.children)
}

fn render_children(nodes: &mut [Node]) -> Result<(), RenderError> {
    for node in nodes {
        if let Node::Element(element) = node {
            if element.has_class("math") {
                render_element(element)?;
            } else {
                render_children(&mut element.children)?;
            }
        }
    }
    Ok(())
}

fn render_element(element: &mut Element) -> Result<(), RenderError> {
    let style = if element.has_class("math-display") {
        DisplayStyle::Block
    } else {
        DisplayStyle::Inline
    };
    let latex = element.text_content();
    let mathml =
        latex_to_mathml(&latex, style).map_err(|error| RenderError::Math(error.to_string()))?;
    element.children = parse_fragment(&mathml)?;
    Ok(())
}
