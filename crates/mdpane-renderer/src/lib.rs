//! Markdown to styled HTML fragment rendering for mdpane.
//!
//! Takes a markdown document and a stylesheet and produces a self-contained
//! HTML fragment with the stylesheet's declarations inlined onto matching
//! elements, ready for embedding in a preview pane with no external CSS.
//!
//! ```
//! use mdpane_renderer::{RenderOptions, markdown_to_html};
//!
//! let html = markdown_to_html("# Hello", "h1 { margin: 0; }", &RenderOptions::default())?;
//! assert_eq!(html, "<h1 style=\"margin:0;\">Hello</h1>");
//! # Ok::<(), mdpane_renderer::RenderError>(())
//! ```
//!
//! # Pipeline
//!
//! Each call parses the stylesheet into a fresh selector map, converts the
//! markdown event stream into an HTML tree, then runs the passes in order:
//! raw-HTML merging, math rendering, code highlighting, ignore-region
//! stripping, attribute directives, and finally the rewrite rules that apply
//! the selector map. Everything is synchronous and single-threaded; the
//! first collaborator failure aborts the call.

mod attrs;
mod convert;
mod error;
mod highlight;
mod ignore;
mod math;
mod raw;
mod rewrite;

pub use error::RenderError;
pub use mdpane_styles::{StyleError, StyleMap, StyleOptions, Theme};

/// Rendering knobs for [`markdown_to_html`].
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    /// Overrides the default code block text color.
    pub pre_color: Option<String>,
    /// Base theme for the built-in default styles; [`Theme::Light`] when
    /// unset.
    pub theme: Option<Theme>,
}

/// Render a markdown document and stylesheet to a styled HTML fragment.
///
/// # Errors
///
/// Returns [`RenderError`] when the stylesheet cannot be parsed, when raw
/// HTML or generated markup cannot be folded into the tree, or when math
/// rendering or highlighting fails. There is no partial output.
pub fn markdown_to_html(
    markdown: &str,
    stylesheet: &str,
    options: &RenderOptions,
) -> Result<String, RenderError> {
    let style_options = StyleOptions {
        pre_color: options.pre_color.clone(),
        theme: options.theme,
    };
    let styles = StyleMap::parse(stylesheet, &style_options)?;

    let mut fragment = convert::convert(markdown);
    raw::merge(&mut fragment)?;
    math::render(&mut fragment)?;
    highlight::annotate(&mut fragment)?;
    ignore::strip(&mut fragment);
    attrs::apply(&mut fragment);
    rewrite::apply(&mut fragment, &styles);

    Ok(fragment.to_html())
}
