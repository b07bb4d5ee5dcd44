//! Stylesheet error types.

/// Error while parsing a stylesheet.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum StyleError {
    /// Syntax error CSS error recovery could not absorb.
    #[error("stylesheet parse error at {line}:{column}: {message}")]
    Parse {
        /// Source line of the error, first line is 0.
        line: u32,
        /// Source column within the line, first character is 1.
        column: u32,
        /// Parser diagnostic text.
        message: String,
    },
}
