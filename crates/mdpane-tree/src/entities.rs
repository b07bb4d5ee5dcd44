//! HTML entity to Unicode conversion.
//!
//! Raw HTML in markdown routinely uses named entities the XML reader does not
//! know. They are converted to Unicode before parsing; the standard XML
//! entities (amp, lt, gt, quot, apos) are preserved for the reader itself.

use std::sync::LazyLock;

use regex::Regex;

/// Regex pattern for matching named HTML entities.
static ENTITY_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&([a-zA-Z][a-zA-Z0-9]*);").expect("invalid entity regex"));

/// Convert named HTML entities to Unicode characters.
///
/// Unknown entities and the standard XML entities are left unchanged.
pub(crate) fn convert_named_entities(html: &str) -> String {
    ENTITY_PATTERN
        .replace_all(html, |caps: &regex::Captures| {
            let entity_name = &caps[1];
            entity_to_unicode(entity_name)
                .map(String::from)
                .unwrap_or_else(|| caps[0].to_owned())
        })
        .into_owned()
}

/// Map HTML entity name to Unicode character.
fn entity_to_unicode(name: &str) -> Option<&'static str> {
    Some(match name {
        // Whitespace and punctuation
        "nbsp" => "\u{00a0}",
        "ensp" => "\u{2002}",
        "emsp" => "\u{2003}",
        "thinsp" => "\u{2009}",
        "mdash" => "\u{2014}",
        "ndash" => "\u{2013}",
        "ldquo" => "\u{201c}",
        "rdquo" => "\u{201d}",
        "lsquo" => "\u{2018}",
        "rsquo" => "\u{2019}",
        "hellip" => "\u{2026}",
        "bull" => "\u{2022}",
        "middot" => "\u{00b7}",
        "laquo" => "\u{00ab}",
        "raquo" => "\u{00bb}",

        // Arrows
        "larr" => "\u{2190}",
        "uarr" => "\u{2191}",
        "rarr" => "\u{2192}",
        "darr" => "\u{2193}",
        "harr" => "\u{2194}",

        // Math
        "times" => "\u{00d7}",
        "divide" => "\u{00f7}",
        "plusmn" => "\u{00b1}",
        "le" => "\u{2264}",
        "ge" => "\u{2265}",
        "ne" => "\u{2260}",
        "minus" => "\u{2212}",
        "infin" => "\u{221e}",
        "frac12" => "\u{00bd}",
        "frac14" => "\u{00bc}",
        "frac34" => "\u{00be}",

        // Legal and misc symbols
        "copy" => "\u{00a9}",
        "reg" => "\u{00ae}",
        "trade" => "\u{2122}",
        "deg" => "\u{00b0}",
        "sect" => "\u{00a7}",
        "para" => "\u{00b6}",
        "dagger" => "\u{2020}",
        "euro" => "\u{20ac}",
        "pound" => "\u{00a3}",
        "yen" => "\u{00a5}",
        "cent" => "\u{00a2}",

        // Unknown entity - return None to preserve as-is
        _ => return None,
    })
}
