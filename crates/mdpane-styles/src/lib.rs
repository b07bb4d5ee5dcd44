//! Stylesheet to selector-map conversion.
//!
//! A [`StyleMap`] indexes a stylesheet's declaration text by simple selector:
//! `.name` for single class selectors, `name` for single tag selectors.
//! Compound selectors (descendants, ids, pseudo-classes) are parsed but map to
//! no key. Later rules overwrite earlier ones wholesale; declarations are
//! never merged.
//!
//! The map always starts from a small built-in set of defaults keyed by
//! [`Theme`], so a caller with no stylesheet still gets a readable preview.

mod error;
mod parser;

use std::collections::HashMap;

pub use error::StyleError;
use parser::{Rule, Selector};

/// Base color scheme for the built-in default styles.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    /// Parse a theme name, as written in configuration.
    pub fn parse(name: &str) -> Option<Self> {
        match name {
            "light" => Some(Self::Light),
            "dark" => Some(Self::Dark),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Dark => "dark",
        }
    }
}

/// Knobs for the built-in default entries.
#[derive(Debug, Clone, Default)]
pub struct StyleOptions {
    /// Overrides the default `pre` text color.
    pub pre_color: Option<String>,
    /// Defaults to [`Theme::Light`] when unset.
    pub theme: Option<Theme>,
}

/// Declaration text indexed by simple selector.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleMap {
    entries: HashMap<String, String>,
}

impl StyleMap {
    /// Build a map from stylesheet source.
    ///
    /// Parses `css`, seeds the default entries for `options`, then folds the
    /// parsed rules over them in source order. A rule whose selector list
    /// names an already-present key replaces that entry.
    ///
    /// # Errors
    ///
    /// Returns [`StyleError::Parse`] when the stylesheet cannot be tokenized
    /// into rules. Invalid declarations and unsupported selectors inside an
    /// otherwise well-formed stylesheet are skipped, not errors.
    pub fn parse(css: &str, options: &StyleOptions) -> Result<Self, StyleError> {
        let rules = parser::parse_rules(css)?;
        let seeded = Self {
            entries: default_entries(options),
        };
        Ok(rules.into_iter().fold(seeded, StyleMap::register))
    }

    /// Fold step: index one rule under each of its simple selectors.
    fn register(mut self, rule: Rule) -> Self {
        for selector in &rule.selectors {
            let key = match selector {
                Selector::Class(name) => format!(".{name}"),
                Selector::Tag(name) => name.clone(),
                Selector::Unsupported => {
                    tracing::debug!("skipping unsupported selector");
                    continue;
                }
            };
            self.entries.insert(key, rule.declarations.clone());
        }
        self
    }

    /// Declaration text for a class selector, if any.
    #[must_use]
    pub fn class(&self, name: &str) -> Option<&str> {
        self.lookup(&format!(".{name}"))
    }

    /// Declaration text for a tag selector, if any.
    #[must_use]
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.lookup(name)
    }

    // An entry holding empty text never matches. A rule with an empty body
    // therefore shadows a default without producing any inline style.
    fn lookup(&self, key: &str) -> Option<&str> {
        self.entries
            .get(key)
            .map(String::as_str)
            .filter(|text| !text.is_empty())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Built-in entries present before any stylesheet rule applies.
fn default_entries(options: &StyleOptions) -> HashMap<String, String> {
    let theme = options.theme.unwrap_or_default();
    let (body, link, pre_background, pre_text) = match theme {
        Theme::Light => (
            "color:#24292f;background-color:#ffffff;",
            "color:#0969da;",
            "#f6f8fa",
            "#24292f",
        ),
        Theme::Dark => (
            "color:#c9d1d9;background-color:#0d1117;",
            "color:#58a6ff;",
            "#161b22",
            "#c9d1d9",
        ),
    };
    let pre_text = options.pre_color.as_deref().unwrap_or(pre_text);

    let mut entries = HashMap::new();
    entries.insert(".markdown-body".to_owned(), body.to_owned());
    entries.insert("a".to_owned(), link.to_owned());
    entries.insert(
        "pre".to_owned(),
        format!("background-color:{pre_background};border-radius:6px;color:{pre_text};"),
    );
    entries
}
