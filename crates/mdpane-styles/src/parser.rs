//! Stylesheet rule extraction.
//!
//! Built on `cssparser`'s rule/declaration traits. The goal is not CSS
//! semantics: selectors are only classified (simple class, simple tag,
//! everything else), declaration values are captured as literal source text,
//! and at-rules are consumed and dropped. CSS error recovery applies inside
//! rule bodies; only errors the tokenizer cannot recover from abort.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, Token,
};

use crate::error::StyleError;

/// Selector forms the style map can key on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Selector {
    /// `.name`
    Class(String),
    /// `name`
    Tag(String),
    /// Compound selectors, pseudo-classes, ids, attribute selectors and the
    /// universal selector. The rule body is still consumed; the selector
    /// maps to no key.
    Unsupported,
}

/// One qualified rule: selector list plus literal declaration text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Rule {
    pub(crate) selectors: Vec<Selector>,
    /// `prop:value;` pairs concatenated in source order.
    pub(crate) declarations: String,
}

/// Parse a stylesheet into its rule sequence, in source order.
pub(crate) fn parse_rules(css: &str) -> Result<Vec<Rule>, StyleError> {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut rule_parser = RuleParser;

    let mut rules = Vec::new();
    for result in cssparser::StyleSheetParser::new(&mut parser, &mut rule_parser) {
        match result {
            Ok(Some(rule)) => rules.push(rule),
            // Skipped at-rule
            Ok(None) => {}
            Err((error, _slice)) => return Err(to_style_error(&error)),
        }
    }
    Ok(rules)
}

fn to_style_error(error: &ParseError<'_, ()>) -> StyleError {
    StyleError::Parse {
        line: error.location.line,
        column: error.location.column,
        message: format!("{:?}", error.kind),
    }
}

struct RuleParser;

impl<'i> QualifiedRuleParser<'i> for RuleParser {
    type Prelude = Vec<Selector>;
    type QualifiedRule = Option<Rule>;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        Ok(parse_selector_list(input))
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let mut decl_parser = DeclarationTextParser;
        let mut declarations = String::new();

        for item in RuleBodyParser::new(input, &mut decl_parser) {
            match item {
                Ok(declaration) => declarations.push_str(&declaration),
                Err((error, slice)) => {
                    tracing::debug!(declaration = slice, error = ?error.kind, "skipping declaration");
                }
            }
        }

        Ok(Some(Rule {
            selectors: prelude,
            declarations,
        }))
    }
}

impl<'i> AtRuleParser<'i> for RuleParser {
    type Prelude = ();
    type AtRule = Option<Rule>;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        // At-rules cannot contribute map keys; consume and drop them.
        tracing::debug!(at_rule = %name, "skipping at-rule");
        while input.next().is_ok() {}
        Ok(())
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        while input.next().is_ok() {}
        Ok(None)
    }

    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        Ok(None)
    }
}

/// Token-level selector part, collected per comma-separated group.
enum Part {
    Dot,
    Ident(String),
    Space,
    Other,
}

/// Split the prelude into comma-separated selectors and classify each.
fn parse_selector_list(input: &mut Parser<'_, '_>) -> Vec<Selector> {
    let mut selectors = Vec::new();
    let mut group: Vec<Part> = Vec::new();

    loop {
        // Whitespace is significant here: it is the descendant combinator.
        let token = match input.next_including_whitespace() {
            Ok(token) => token.clone(),
            Err(_) => break,
        };
        match token {
            Token::Comma => {
                if !group.is_empty() {
                    selectors.push(classify(&group));
                }
                group.clear();
            }
            Token::WhiteSpace(_) => {
                if !group.is_empty() {
                    group.push(Part::Space);
                }
            }
            Token::Delim('.') => group.push(Part::Dot),
            Token::Ident(name) => group.push(Part::Ident(name.as_ref().to_owned())),
            _ => group.push(Part::Other),
        }
    }
    if !group.is_empty() {
        selectors.push(classify(&group));
    }

    selectors
}

fn classify(parts: &[Part]) -> Selector {
    // Trailing whitespace before the block is not a combinator.
    let mut parts = parts;
    while let Some(Part::Space) = parts.last() {
        parts = &parts[..parts.len() - 1];
    }

    match parts {
        [Part::Dot, Part::Ident(name)] => Selector::Class(name.clone()),
        [Part::Ident(name)] => Selector::Tag(name.clone()),
        _ => Selector::Unsupported,
    }
}

struct DeclarationTextParser;

impl<'i> DeclarationParser<'i> for DeclarationTextParser {
    type Declaration = String;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        // Capture the value as literal source text, `!important` included.
        let start = input.position();
        while input.next().is_ok() {}
        let value = input.slice_from(start).trim();
        Ok(format!("{name}:{value};"))
    }
}

impl<'i> AtRuleParser<'i> for DeclarationTextParser {
    type Prelude = ();
    type AtRule = String;
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for DeclarationTextParser {
    type Prelude = ();
    type QualifiedRule = String;
    type Error = ();
}

impl<'i> RuleBodyItemParser<'i, String, ()> for DeclarationTextParser {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn test_parse_single_rule() {
        let rules = parse_rules(".error { color: red; font-weight: bold; }").unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selectors, vec![Selector::Class("error".to_owned())]);
        assert_eq!(rules[0].declarations, "color:red;font-weight:bold;");
    }

    #[test]
    fn test_parse_tag_selector() {
        let rules = parse_rules("blockquote { border-left: 4px solid #ddd; }").unwrap();
        assert_eq!(rules[0].selectors, vec![Selector::Tag("blockquote".to_owned())]);
        assert_eq!(rules[0].declarations, "border-left:4px solid #ddd;");
    }

    #[test]
    fn test_parse_selector_list() {
        let rules = parse_rules(".a, p , .b { margin: 0; }").unwrap();
        assert_eq!(
            rules[0].selectors,
            vec![
                Selector::Class("a".to_owned()),
                Selector::Tag("p".to_owned()),
                Selector::Class("b".to_owned()),
            ]
        );
    }

    #[test]
    fn test_compound_selectors_are_unsupported() {
        for css in [
            ".a .b { color: red; }",
            ".a.b { color: red; }",
            "div.wide { color: red; }",
            "#main { color: red; }",
            "* { color: red; }",
            "a:hover { color: red; }",
            "ul > li { color: red; }",
            "[data-x] { color: red; }",
        ] {
            let rules = parse_rules(css).unwrap();
            assert_eq!(rules.len(), 1, "{css}");
            assert_eq!(rules[0].selectors, vec![Selector::Unsupported], "{css}");
        }
    }

    #[test]
    fn test_mixed_list_keeps_simple_members() {
        let rules = parse_rules(".a, div p, .b { color: red; }").unwrap();
        assert_eq!(
            rules[0].selectors,
            vec![
                Selector::Class("a".to_owned()),
                Selector::Unsupported,
                Selector::Class("b".to_owned()),
            ]
        );
    }

    #[test]
    fn test_declaration_text_is_literal() {
        let rules =
            parse_rules(".x { font: 12px/1.5 monospace; background: rgba(0, 0, 0, 0.5) !important; }")
                .unwrap();
        assert_eq!(
            rules[0].declarations,
            "font:12px/1.5 monospace;background:rgba(0, 0, 0, 0.5) !important;"
        );
    }

    #[test]
    fn test_invalid_declaration_is_skipped() {
        let rules = parse_rules(".x { color red; background: blue; }").unwrap();
        assert_eq!(rules[0].declarations, "background:blue;");
    }

    #[test]
    fn test_empty_rule_body() {
        let rules = parse_rules(".x {}").unwrap();
        assert_eq!(rules[0].declarations, "");
    }

    #[test]
    fn test_at_rules_are_skipped() {
        let css = "@import url(other.css); @media screen { .a { color: red; } } .b { color: blue; }";
        let rules = parse_rules(css).unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].selectors, vec![Selector::Class("b".to_owned())]);
    }

    #[test]
    fn test_rules_keep_source_order() {
        let rules = parse_rules(".a { color: red; } .a { color: blue; }").unwrap();
        assert_eq!(rules.len(), 2);
        assert_eq!(rules[0].declarations, "color:red;");
        assert_eq!(rules[1].declarations, "color:blue;");
    }

    #[test]
    fn test_comments_are_ignored() {
        let rules = parse_rules("/* lead */ .a { /* in */ color: red; } /* tail */").unwrap();
        assert_eq!(rules.len(), 1);
        assert_eq!(rules[0].declarations, "color:red;");
    }
}
