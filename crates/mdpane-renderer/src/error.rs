//! Error type for the rendering pipeline.

use mdpane_styles::StyleError;
use mdpane_tree::TreeError;

/// Error from one of the pipeline's collaborators. Rendering never recovers
/// or emits partial output; the first failure surfaces unchanged.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum RenderError {
    /// The stylesheet could not be parsed into a selector map.
    #[error("stylesheet error: {0}")]
    Stylesheet(#[from] StyleError),

    /// An HTML fragment (raw markdown HTML, rendered MathML, highlighter
    /// output) could not be parsed into the tree.
    #[error("html fragment error: {0}")]
    Fragment(#[from] TreeError),

    /// TeX source the math renderer rejected.
    #[error("math rendering error: {0}")]
    Math(String),

    /// Highlighter failure.
    #[error("highlighting error: {0}")]
    Highlight(#[from] syntect::Error),
}
