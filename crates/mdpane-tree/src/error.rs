//! Error types for fragment parsing.

use std::str::Utf8Error;

/// Error while parsing an HTML fragment.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum TreeError {
    /// Markup the reader could not recover from.
    #[error("HTML parse error")]
    Parse(#[from] quick_xml::Error),

    /// UTF-8 decoding error.
    #[error("UTF-8 error")]
    Utf8(#[from] Utf8Error),

    /// Attribute syntax error.
    #[error("attribute error")]
    Attr(#[from] quick_xml::events::attributes::AttrError),

    /// Encoding error while decoding reader bytes.
    #[error("encoding error")]
    Encoding(#[from] quick_xml::encoding::EncodingError),
}
