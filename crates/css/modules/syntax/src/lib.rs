//! CSS Syntax Module Level 3 — stylesheet and declaration-list parsing.
//! Spec: <https://www.w3.org/TR/css-syntax-3/>
//!
//! Only what the style engine consumes is produced: style rules with a raw
//! selector prelude and raw declaration values. At-rules are skipped.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, StyleSheetParser,
};
use log::trace;

/// A single CSS declaration (`property: value [!important]`).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Declaration {
    /// Property name, ASCII-lowercased. Custom properties keep their case.
    pub name: String,
    /// Raw value text without the `!important` flag.
    pub value: String,
    pub important: bool,
}

/// A qualified rule: raw prelude plus its declarations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StyleRule {
    /// Raw prelude text, typically a selector list.
    pub prelude: String,
    pub declarations: Vec<Declaration>,
}

/// A parsed stylesheet.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stylesheet {
    /// Style rules in source order.
    pub rules: Vec<StyleRule>,
}

/// Split a trailing `!important` (ASCII case-insensitive) off a raw value.
fn strip_important(raw: &str) -> (&str, bool) {
    let trimmed = raw.trim();
    let Some(bang) = trimmed.rfind('!') else {
        return (trimmed, false);
    };
    let flag = trimmed[bang + 1..].trim();
    if flag.eq_ignore_ascii_case("important") {
        (trimmed[..bang].trim_end(), true)
    } else {
        (trimmed, false)
    }
}

/// Collects declarations inside a block or a `style` attribute.
struct DeclarationCollector;

impl<'i> DeclarationParser<'i> for DeclarationCollector {
    type Declaration = Declaration;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
        _declaration_start: &ParserState,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next_including_whitespace_and_comments().is_ok() {}
        let (value, important) = strip_important(input.slice_from(start));
        let name = if name.starts_with("--") {
            name.to_string()
        } else {
            name.to_ascii_lowercase()
        };
        Ok(Declaration {
            name,
            value: value.to_owned(),
            important,
        })
    }
}

// Nested rules are not supported; the default implementations reject them.
impl<'i> AtRuleParser<'i> for DeclarationCollector {
    type Prelude = ();
    type AtRule = Declaration;
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for DeclarationCollector {
    type Prelude = ();
    type QualifiedRule = Declaration;
    type Error = ();
}

impl<'i> RuleBodyItemParser<'i, Declaration, ()> for DeclarationCollector {
    fn parse_declarations(&self) -> bool {
        true
    }

    fn parse_qualified(&self) -> bool {
        false
    }
}

/// Collects top-level style rules.
struct RuleCollector;

impl<'i> QualifiedRuleParser<'i> for RuleCollector {
    type Prelude = String;
    type QualifiedRule = StyleRule;
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let start = input.position();
        while input.next_including_whitespace_and_comments().is_ok() {}
        Ok(input.slice_from(start).trim().to_owned())
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        Ok(StyleRule {
            prelude,
            declarations: collect_declarations(input),
        })
    }
}

// At-rules (@media, @supports, ...) are skipped entirely.
impl<'i> AtRuleParser<'i> for RuleCollector {
    type Prelude = ();
    type AtRule = StyleRule;
    type Error = ();
}

fn collect_declarations(input: &mut Parser<'_, '_>) -> Vec<Declaration> {
    let mut collector = DeclarationCollector;
    RuleBodyParser::new(input, &mut collector)
        .filter_map(Result::ok)
        .collect()
}

/// Parse a full stylesheet.
pub fn parse_stylesheet(css: &str) -> Stylesheet {
    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut collector = RuleCollector;
    let rules: Vec<StyleRule> = StyleSheetParser::new(&mut parser, &mut collector)
        .filter_map(Result::ok)
        .collect();
    trace!("css_syntax: parsed {} rules", rules.len());
    Stylesheet { rules }
}

/// Parse the value of a `style` attribute into declarations.
///
/// Spec: <https://www.w3.org/TR/css-style-attr/#interpreting>
pub fn parse_declaration_list(input: &str) -> Vec<Declaration> {
    if input.trim().is_empty() {
        return Vec::new();
    }
    let mut parser_input = ParserInput::new(input);
    let mut parser = Parser::new(&mut parser_input);
    collect_declarations(&mut parser)
}
