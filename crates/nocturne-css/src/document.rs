//! Source-preserving stylesheet model.
//!
//! A [`StyleSheet`] keeps the original text untouched and only structures the one
//! node the reconciler edits: the `@media (prefers-color-scheme: dark)` block.
//! Every other node stays opaque, so re-serializing a sheet never reformats
//! rules outside the dark-mode block.
//!
//! # Design
//!
//! Parsing is built on `cssparser`'s rule-list machinery. Instead of building a
//! full tree, the parser records the byte span of the dark-mode block while it
//! walks the sheet. The block itself is parsed into [`BlockItem`]s: style rules
//! (with any rules nested in their bodies), grouping at-rules such as
//! `@supports`, and other at-rules kept as written. Selectors and values are raw
//! source slices, so both round-trip exactly as written.
//!
//! Matching is literal: the at-rule must be named `media` and its condition,
//! trimmed of surrounding whitespace, must equal [`DARK_MODE_QUERY`]. Blocks are
//! found at the top level and inside grouping at-rules. When a sheet carries
//! several, the last one in source order is the dark-mode block and the rest
//! are treated like any other node.
//!
//! Besides what the tokenizer rejects, parsing fails on unclosed blocks, stray
//! closing brackets, unterminated strings, malformed `url()`s and malformed
//! declarations inside the dark-mode block.

use std::ops::Range;

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser, Token,
};

use crate::error::{Malformed, ParseError};

/// The media condition identifying the dark-mode block.
pub const DARK_MODE_QUERY: &str = "(prefers-color-scheme: dark)";

/// At-rules whose blocks hold further rules.
const GROUPING_AT_RULES: &[&str] = &[
    "media",
    "supports",
    "layer",
    "container",
    "document",
    "-moz-document",
    "scope",
];

type CssError<'i> = cssparser::ParseError<'i, Malformed>;

/// A single `property: value` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    pub property: String,
    pub value: String,
}

impl Declaration {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

/// A style rule inside the dark-mode block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    /// The selector text, as written, trimmed.
    pub selector: String,
    /// Declarations in source order.
    pub declarations: Vec<Declaration>,
    /// Rules and at-rules nested in the rule body, after its declarations.
    pub children: Vec<BlockItem>,
}

impl StyleRule {
    pub fn new(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            declarations: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Returns the value of the first declaration of `property`.
    pub fn value(&self, property: &str) -> Option<&str> {
        self.declarations
            .iter()
            .find(|decl| decl.property == property)
            .map(|decl| decl.value.as_str())
    }
}

/// A grouping at-rule inside the dark-mode block, e.g. `@supports`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupRule {
    /// The at-rule head without its block, e.g. `@supports (color: lab(0 0 0))`.
    pub prelude: String,
    pub items: Vec<BlockItem>,
}

/// A child of the dark-mode block, a group, or a rule body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockItem {
    Rule(StyleRule),
    Group(GroupRule),
    /// Any other at-rule, kept as written.
    Verbatim(String),
}

impl BlockItem {
    /// True when the item holds a declaration, directly or in a nested rule.
    pub fn has_declarations(&self) -> bool {
        match self {
            BlockItem::Rule(rule) => {
                !rule.declarations.is_empty()
                    || rule.children.iter().any(BlockItem::has_declarations)
            }
            BlockItem::Group(group) => group.items.iter().any(BlockItem::has_declarations),
            BlockItem::Verbatim(_) => false,
        }
    }
}

/// The contents of the `@media (prefers-color-scheme: dark)` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DarkModeBlock {
    pub(crate) items: Vec<BlockItem>,
}

impl DarkModeBlock {
    /// Creates an empty block.
    pub fn new() -> Self {
        Self::default()
    }

    /// All children in order.
    pub fn items(&self) -> &[BlockItem] {
        &self.items
    }

    /// Style rules directly inside the block, in order.
    pub fn rules(&self) -> impl Iterator<Item = &StyleRule> {
        self.items.iter().filter_map(|item| match item {
            BlockItem::Rule(rule) => Some(rule),
            _ => None,
        })
    }

    /// Every style rule at any depth, depth-first in source order.
    pub fn all_rules(&self) -> Vec<&StyleRule> {
        let mut rules = Vec::new();
        collect_rules(&self.items, &mut rules);
        rules
    }

    /// The first rule, depth-first, whose selector is exactly `selector`.
    pub fn rule(&self, selector: &str) -> Option<&StyleRule> {
        self.all_rules()
            .into_iter()
            .find(|rule| rule.selector == selector)
    }

    pub(crate) fn rule_mut(&mut self, selector: &str) -> Option<&mut StyleRule> {
        find_rule_mut(&mut self.items, selector)
    }

    pub(crate) fn push_rule(&mut self, rule: StyleRule) {
        self.items.push(BlockItem::Rule(rule));
    }

    /// True when no declaration is left anywhere in the block.
    ///
    /// At-rules kept as written do not count.
    pub fn is_empty(&self) -> bool {
        !self.items.iter().any(BlockItem::has_declarations)
    }

    /// Renders the block, including the `@media` wrapper.
    ///
    /// Each nesting level is indented by two spaces with one declaration per
    /// line.
    pub fn to_css(&self) -> String {
        let mut out = format!("@media {} {{\n", DARK_MODE_QUERY);
        write_items(&mut out, &self.items, 1);
        out.push('}');
        out
    }
}

fn collect_rules<'a>(items: &'a [BlockItem], rules: &mut Vec<&'a StyleRule>) {
    for item in items {
        match item {
            BlockItem::Rule(rule) => {
                rules.push(rule);
                collect_rules(&rule.children, rules);
            }
            BlockItem::Group(group) => collect_rules(&group.items, rules),
            BlockItem::Verbatim(_) => {}
        }
    }
}

fn find_rule_mut<'a>(items: &'a mut [BlockItem], selector: &str) -> Option<&'a mut StyleRule> {
    for item in items {
        let found = match item {
            BlockItem::Rule(rule) => {
                if rule.selector == selector {
                    return Some(rule);
                }
                find_rule_mut(&mut rule.children, selector)
            }
            BlockItem::Group(group) => find_rule_mut(&mut group.items, selector),
            BlockItem::Verbatim(_) => None,
        };
        if found.is_some() {
            return found;
        }
    }
    None
}

fn write_items(out: &mut String, items: &[BlockItem], depth: usize) {
    let indent = "  ".repeat(depth);
    for item in items {
        match item {
            BlockItem::Rule(rule) => {
                out.push_str(&format!("{}{} {{\n", indent, rule.selector));
                for decl in &rule.declarations {
                    out.push_str(&format!("{}  {}: {};\n", indent, decl.property, decl.value));
                }
                write_items(out, &rule.children, depth + 1);
                out.push_str(&format!("{}}}\n", indent));
            }
            BlockItem::Group(group) => {
                out.push_str(&format!("{}{} {{\n", indent, group.prelude));
                write_items(out, &group.items, depth + 1);
                out.push_str(&format!("{}}}\n", indent));
            }
            BlockItem::Verbatim(text) => {
                out.push_str(&indent);
                out.push_str(text);
                out.push('\n');
            }
        }
    }
}

/// A parsed stylesheet.
///
/// Borrows the source text; only the dark-mode block is owned.
#[derive(Debug, Clone)]
pub struct StyleSheet<'a> {
    source: &'a str,
    dark_mode: Option<(Range<usize>, DarkModeBlock)>,
}

impl<'a> StyleSheet<'a> {
    /// Parses `source`.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError`] when the text is not a structurally valid
    /// stylesheet.
    pub fn parse(source: &'a str) -> Result<Self, ParseError> {
        let mut input = ParserInput::new(source);
        let mut parser = Parser::new(&mut input);
        let mut sheet = SheetParser {
            source,
            dark_mode: None,
        };
        for result in cssparser::StyleSheetParser::new(&mut parser, &mut sheet) {
            result.map_err(|(err, _)| ParseError::from(err))?;
        }

        Ok(Self {
            source,
            dark_mode: sheet.dark_mode,
        })
    }

    /// The original text.
    pub fn source(&self) -> &'a str {
        self.source
    }

    /// The dark-mode block, if the sheet has one.
    pub fn dark_mode(&self) -> Option<&DarkModeBlock> {
        self.dark_mode.as_ref().map(|(_, block)| block)
    }

    /// Byte range of the dark-mode block in the source.
    pub fn dark_mode_span(&self) -> Option<Range<usize>> {
        self.dark_mode.as_ref().map(|(span, _)| span.clone())
    }

    /// Renders the sheet with its dark-mode block replaced by `block`.
    ///
    /// `None` removes the block along with the whitespace preceding it. A sheet
    /// without a block gets `block` appended after a blank line.
    pub fn render_with(&self, block: Option<&DarkModeBlock>) -> String {
        match (&self.dark_mode, block) {
            (Some((span, _)), Some(block)) => {
                let mut out = String::with_capacity(self.source.len());
                out.push_str(&self.source[..span.start]);
                out.push_str(&block.to_css());
                out.push_str(&self.source[span.end..]);
                out
            }
            (Some((span, _)), None) => {
                let before = self.source[..span.start].trim_end();
                let mut out = String::with_capacity(self.source.len());
                out.push_str(before);
                out.push_str(&self.source[span.end..]);
                out
            }
            (None, Some(block)) => {
                let mut out = String::from(self.source);
                if !out.is_empty() {
                    if !out.ends_with('\n') {
                        out.push('\n');
                    }
                    out.push('\n');
                }
                out.push_str(&block.to_css());
                out.push('\n');
                out
            }
            (None, None) => self.source.to_string(),
        }
    }
}

/// Consumes the rest of `input`, rejecting stray closing brackets and bad tokens
/// at any nesting depth.
pub(crate) fn consume_balanced<'i>(input: &mut Parser<'i, '_>) -> Result<(), CssError<'i>> {
    while let Ok(token) = input.next() {
        let token = token.clone();
        consume_token(input, token)?;
    }
    Ok(())
}

fn consume_token<'i>(input: &mut Parser<'i, '_>, token: Token<'i>) -> Result<(), CssError<'i>> {
    match token {
        Token::CurlyBracketBlock
        | Token::SquareBracketBlock
        | Token::ParenthesisBlock
        | Token::Function(_) => input.parse_nested_block(|nested| consume_balanced(nested)),
        Token::CloseCurlyBracket | Token::CloseParenthesis | Token::CloseSquareBracket => {
            Err(input.new_custom_error(Malformed::StrayClosingBracket))
        }
        Token::BadString(_) => Err(input.new_custom_error(Malformed::BadString)),
        Token::BadUrl(_) => Err(input.new_custom_error(Malformed::BadUrl)),
        _ => Ok(()),
    }
}

/// Consumes the rest of `input` and returns it as trimmed source text.
pub(crate) fn raw_text<'i>(input: &mut Parser<'i, '_>) -> Result<&'i str, CssError<'i>> {
    let start = input.position();
    consume_balanced(input)?;
    Ok(input.slice_from(start).trim())
}

/// Like [`raw_text`], but a `{}` block ends the value with an error so the rule
/// body parser can retry the text as a nested rule.
fn declaration_value<'i>(input: &mut Parser<'i, '_>) -> Result<&'i str, CssError<'i>> {
    let start = input.position();
    while let Ok(token) = input.next() {
        let token = token.clone();
        if token == Token::CurlyBracketBlock {
            return Err(input.new_unexpected_token_error(token));
        }
        consume_token(input, token)?;
    }
    Ok(input.slice_from(start).trim())
}

/// Checks that the block `input` has just consumed was closed by a `}` and
/// returns the byte offset past it.
///
/// `cssparser` closes blocks implicitly at the end of input; a consumed block
/// stops either on its `}` or at the end of the source.
fn close_block<'i>(input: &Parser<'i, '_>, source: &str) -> Result<usize, CssError<'i>> {
    let end = input.position().byte_index();
    match source.as_bytes().get(end) {
        Some(b'}') => Ok(end + 1),
        _ => Err(input.new_custom_error(Malformed::UnclosedBlock)),
    }
}

pub(crate) fn is_grouping(name: &str) -> bool {
    GROUPING_AT_RULES.contains(&name.to_ascii_lowercase().as_str())
}

/// `@name prelude`, with the prelude as written.
fn at_rule_head<'i>(name: &str, input: &mut Parser<'i, '_>) -> Result<String, CssError<'i>> {
    let prelude = raw_text(input)?;
    Ok(if prelude.is_empty() {
        format!("@{}", name)
    } else {
        format!("@{} {}", name, prelude)
    })
}

/// Walks the sheet, descending into grouping at-rules, and keeps the last
/// dark-mode block it completes.
struct SheetParser<'s> {
    source: &'s str,
    dark_mode: Option<(Range<usize>, DarkModeBlock)>,
}

enum SheetAtRule {
    DarkMode,
    Group,
    Other,
}

impl<'i> QualifiedRuleParser<'i> for SheetParser<'_> {
    type Prelude = ();
    type QualifiedRule = ();
    type Error = Malformed;

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, CssError<'i>> {
        consume_balanced(input)
    }

    fn parse_block<'t>(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, CssError<'i>> {
        consume_balanced(input)?;
        close_block(input, self.source)?;
        Ok(())
    }
}

impl<'i> AtRuleParser<'i> for SheetParser<'_> {
    type Prelude = SheetAtRule;
    type AtRule = ();
    type Error = Malformed;

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, CssError<'i>> {
        let condition = raw_text(input)?;
        Ok(if name.as_ref() == "media" && condition == DARK_MODE_QUERY {
            SheetAtRule::DarkMode
        } else if is_grouping(&name) {
            SheetAtRule::Group
        } else {
            SheetAtRule::Other
        })
    }

    fn rule_without_block(
        &mut self,
        _prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        Ok(())
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, CssError<'i>> {
        match prelude {
            SheetAtRule::DarkMode => {
                let items = parse_block_items(input, self.source)?;
                let end = close_block(input, self.source)?;
                let span = start.position().byte_index()..end;
                self.dark_mode = Some((span, DarkModeBlock { items }));
            }
            SheetAtRule::Group => {
                for result in cssparser::StyleSheetParser::new(input, self) {
                    result.map_err(|(err, _)| err)?;
                }
                close_block(input, self.source)?;
            }
            SheetAtRule::Other => {
                consume_balanced(input)?;
                close_block(input, self.source)?;
            }
        }
        Ok(())
    }
}

/// Parses the rules and at-rules of a dark-mode block or of a group inside it.
fn parse_block_items<'i>(
    input: &mut Parser<'i, '_>,
    source: &str,
) -> Result<Vec<BlockItem>, CssError<'i>> {
    let mut parser = BlockParser { source };
    let mut items = Vec::new();
    for result in cssparser::StyleSheetParser::new(input, &mut parser) {
        items.push(result.map_err(|(err, _)| err)?);
    }
    Ok(items)
}

struct BlockParser<'s> {
    source: &'s str,
}

/// An at-rule head and whether its block holds rules.
struct AtRuleHead {
    head: String,
    grouping: bool,
}

impl<'i> QualifiedRuleParser<'i> for BlockParser<'_> {
    type Prelude = String;
    type QualifiedRule = BlockItem;
    type Error = Malformed;

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, CssError<'i>> {
        selector(input)
    }

    fn parse_block<'t>(
        &mut self,
        selector: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, CssError<'i>> {
        let rule = parse_rule_body(selector, input, self.source)?;
        close_block(input, self.source)?;
        Ok(BlockItem::Rule(rule))
    }
}

impl<'i> AtRuleParser<'i> for BlockParser<'_> {
    type Prelude = AtRuleHead;
    type AtRule = BlockItem;
    type Error = Malformed;

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, CssError<'i>> {
        Ok(AtRuleHead {
            head: at_rule_head(&name, input)?,
            grouping: is_grouping(&name),
        })
    }

    fn rule_without_block(
        &mut self,
        prelude: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        Ok(BlockItem::Verbatim(format!("{};", prelude.head)))
    }

    fn parse_block<'t>(
        &mut self,
        prelude: Self::Prelude,
        start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, CssError<'i>> {
        if prelude.grouping {
            let items = parse_block_items(input, self.source)?;
            close_block(input, self.source)?;
            return Ok(BlockItem::Group(GroupRule {
                prelude: prelude.head,
                items,
            }));
        }
        consume_balanced(input)?;
        let end = close_block(input, self.source)?;
        Ok(verbatim(self.source, start, end))
    }
}

fn selector<'i>(input: &mut Parser<'i, '_>) -> Result<String, CssError<'i>> {
    let selector = raw_text(input)?;
    if selector.is_empty() {
        return Err(input.new_custom_error(Malformed::EmptySelector));
    }
    Ok(selector.to_string())
}

fn verbatim(source: &str, start: &ParserState, end: usize) -> BlockItem {
    BlockItem::Verbatim(source[start.position().byte_index()..end].to_string())
}

fn parse_rule_body<'i>(
    selector: String,
    input: &mut Parser<'i, '_>,
    source: &str,
) -> Result<StyleRule, CssError<'i>> {
    let mut body = RuleBodyItems { source };
    let mut rule = StyleRule::new(selector);
    for result in RuleBodyParser::new(input, &mut body) {
        match result.map_err(|(err, _)| err)? {
            BodyItem::Declaration(decl) => rule.declarations.push(decl),
            BodyItem::Child(item) => rule.children.push(item),
        }
    }
    Ok(rule)
}

enum BodyItem {
    Declaration(Declaration),
    Child(BlockItem),
}

/// Parses a rule body: declarations plus nested rules and at-rules.
struct RuleBodyItems<'s> {
    source: &'s str,
}

impl<'i> DeclarationParser<'i> for RuleBodyItems<'_> {
    type Declaration = BodyItem;
    type Error = Malformed;

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Declaration, CssError<'i>> {
        let value = declaration_value(input)?;
        Ok(BodyItem::Declaration(Declaration::new(name.as_ref(), value)))
    }
}

impl<'i> QualifiedRuleParser<'i> for RuleBodyItems<'_> {
    type Prelude = String;
    type QualifiedRule = BodyItem;
    type Error = Malformed;

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, CssError<'i>> {
        selector(input)
    }

    fn parse_block<'t>(
        &mut self,
        selector: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, CssError<'i>> {
        let rule = parse_rule_body(selector, input, self.source)?;
        close_block(input, self.source)?;
        Ok(BodyItem::Child(BlockItem::Rule(rule)))
    }
}

impl<'i> AtRuleParser<'i> for RuleBodyItems<'_> {
    type Prelude = String;
    type AtRule = BodyItem;
    type Error = Malformed;

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, CssError<'i>> {
        at_rule_head(&name, input)
    }

    fn rule_without_block(
        &mut self,
        head: Self::Prelude,
        _start: &ParserState,
    ) -> Result<Self::AtRule, ()> {
        Ok(BodyItem::Child(BlockItem::Verbatim(format!("{};", head))))
    }

    fn parse_block<'t>(
        &mut self,
        _head: Self::Prelude,
        start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, CssError<'i>> {
        consume_balanced(input)?;
        let end = close_block(input, self.source)?;
        Ok(BodyItem::Child(verbatim(self.source, start, end)))
    }
}

impl<'i> RuleBodyItemParser<'i, BodyItem, Malformed> for RuleBodyItems<'_> {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_dark_mode_block() {
        let css = "a { color: red; }\n@media (prefers-color-scheme: dark) { a { color: blue; } }\n";
        let sheet = StyleSheet::parse(css).unwrap();
        let block = sheet.dark_mode().expect("dark mode block");
        let rule = block.rule("a").unwrap();
        assert_eq!(rule.value("color"), Some("blue"));

        let span = sheet.dark_mode_span().unwrap();
        assert!(css[span.clone()].starts_with("@media"));
        assert!(css[span].ends_with('}'));
    }

    #[test]
    fn ignores_other_media_queries() {
        let css = "@media (prefers-color-scheme: light) { a { color: blue; } }\n\
                   @media (max-width: 600px) { a { color: green; } }";
        let sheet = StyleSheet::parse(css).unwrap();
        assert!(sheet.dark_mode().is_none());
    }

    #[test]
    fn condition_match_is_literal() {
        let css = "@media (prefers-color-scheme:dark) { a { color: blue; } }";
        let sheet = StyleSheet::parse(css).unwrap();
        assert!(sheet.dark_mode().is_none());

        let css = "@media   (prefers-color-scheme: dark)   { a { color: blue; } }";
        let sheet = StyleSheet::parse(css).unwrap();
        assert!(sheet.dark_mode().is_some());
    }

    #[test]
    fn last_dark_mode_block_wins() {
        let css = "@media (prefers-color-scheme: dark) { a { color: blue; } }\n\
                   @media (prefers-color-scheme: dark) { b { color: green; } }";
        let sheet = StyleSheet::parse(css).unwrap();
        let block = sheet.dark_mode().unwrap();
        assert!(block.rule("a").is_none());
        assert!(block.rule("b").is_some());
    }

    #[test]
    fn keeps_selectors_and_values_verbatim() {
        let css = "@media (prefers-color-scheme: dark) {\n  .a > .b,\n  .c { color: rgba(0, 0, 0, 0.5) !important; }\n}";
        let sheet = StyleSheet::parse(css).unwrap();
        let rule = sheet.dark_mode().unwrap().rules().next().unwrap();
        assert_eq!(rule.selector, ".a > .b,\n  .c");
        assert_eq!(rule.value("color"), Some("rgba(0, 0, 0, 0.5) !important"));
    }

    #[test]
    fn structures_grouping_at_rules_in_block() {
        let css = "@media (prefers-color-scheme: dark) { @supports (color: lab(0 0 0)) { a { color: lab(0 0 0); } } b { fill: red; } }";
        let sheet = StyleSheet::parse(css).unwrap();
        let block = sheet.dark_mode().unwrap();
        assert_eq!(block.items().len(), 2);
        match &block.items()[0] {
            BlockItem::Group(group) => {
                assert_eq!(group.prelude, "@supports (color: lab(0 0 0))");
                assert_eq!(group.items.len(), 1);
            }
            other => panic!("expected a group, got {:?}", other),
        }
        assert_eq!(block.rule("a").unwrap().value("color"), Some("lab(0 0 0)"));
        let selectors: Vec<_> = block.all_rules().iter().map(|r| r.selector.as_str()).collect();
        assert_eq!(selectors, vec!["a", "b"]);
    }

    #[test]
    fn keeps_other_at_rules_verbatim() {
        let css = "@media (prefers-color-scheme: dark) { @font-face { font-family: x; } @import url(\"d.css\"); a { color: red; } }";
        let sheet = StyleSheet::parse(css).unwrap();
        let block = sheet.dark_mode().unwrap();
        assert_eq!(
            block.items()[0],
            BlockItem::Verbatim("@font-face { font-family: x; }".into())
        );
        assert_eq!(
            block.items()[1],
            BlockItem::Verbatim("@import url(\"d.css\");".into())
        );
    }

    #[test]
    fn parses_rules_nested_in_rule_bodies() {
        let css = "@media (prefers-color-scheme: dark) { a { color: red; &:hover { color: blue; } .icon { fill: white; } } }";
        let sheet = StyleSheet::parse(css).unwrap();
        let block = sheet.dark_mode().unwrap();
        let rule = block.rule("a").unwrap();
        assert_eq!(rule.declarations, vec![Declaration::new("color", "red")]);
        assert_eq!(rule.children.len(), 2);
        assert_eq!(block.rule("&:hover").unwrap().value("color"), Some("blue"));
        assert_eq!(block.rule(".icon").unwrap().value("fill"), Some("white"));
    }

    #[test]
    fn renders_nested_items_indented() {
        let css = "@media (prefers-color-scheme: dark) { @supports (color: red) { a { color: red; &:hover { color: blue; } } } }";
        let sheet = StyleSheet::parse(css).unwrap();
        assert_eq!(
            sheet.dark_mode().unwrap().to_css(),
            "@media (prefers-color-scheme: dark) {\n  @supports (color: red) {\n    a {\n      color: red;\n      &:hover {\n        color: blue;\n      }\n    }\n  }\n}"
        );
    }

    #[test]
    fn finds_dark_mode_block_inside_grouping_rule() {
        let css = "a { color: red; }\n@supports (display: grid) {\n  @media (prefers-color-scheme: dark) { a { color: blue; } }\n}\n";
        let sheet = StyleSheet::parse(css).unwrap();
        assert_eq!(sheet.dark_mode().unwrap().rule("a").unwrap().value("color"), Some("blue"));

        let span = sheet.dark_mode_span().unwrap();
        assert_eq!(&css[span], "@media (prefers-color-scheme: dark) { a { color: blue; } }");
    }

    #[test]
    fn nested_dark_mode_block_later_in_source_wins() {
        let css = "@media (prefers-color-scheme: dark) { a { color: blue; } }\n\
                   @layer theme { @media (prefers-color-scheme: dark) { b { color: green; } } }";
        let block = StyleSheet::parse(css).unwrap().dark_mode().cloned().unwrap();
        assert!(block.rule("a").is_none());
        assert!(block.rule("b").is_some());
    }

    #[test]
    fn rejects_unclosed_block() {
        let err = StyleSheet::parse("a { color: red;").unwrap_err();
        assert!(err.message.contains("unclosed"), "{}", err);

        let err =
            StyleSheet::parse("@media (prefers-color-scheme: dark) { a { color: red; }").unwrap_err();
        assert!(err.message.contains("unclosed"), "{}", err);
    }

    #[test]
    fn rejects_block_left_open_by_inner_rule() {
        for css in [
            "@media print { a { color: red; }",
            "@supports (display: grid) { a { color: red; }",
            "@media (prefers-color-scheme: dark) { a { color: red; &:hover { color: blue; } }",
            "@media (prefers-color-scheme: dark) { @supports (color: red) { a { color: red; } }",
            "a { color: red; } b { fill: url(x) }  c { }  d { stroke: blue; }  e { color: red;",
        ] {
            let err = StyleSheet::parse(css).unwrap_err();
            assert!(err.message.contains("unclosed"), "{}: {}", css, err);
        }
    }

    #[test]
    fn rejects_stray_closing_bracket() {
        let err = StyleSheet::parse("a { color: red; } } b { color: blue; }").unwrap_err();
        assert_eq!(err.message, "unbalanced closing bracket");
        assert_eq!(err.line, 1);
    }

    #[test]
    fn rejects_rule_without_block() {
        assert!(StyleSheet::parse("a { color: red; }\nb").is_err());
    }

    #[test]
    fn rejects_malformed_declaration_in_dark_mode_block() {
        let err = StyleSheet::parse("@media (prefers-color-scheme: dark) { a { color red; } }")
            .unwrap_err();
        assert_eq!(err.line, 1);
    }

    #[test]
    fn accepts_statement_at_rules() {
        let css = "@charset \"utf-8\";\n@import url(\"base.css\");\na { color: red; }";
        let sheet = StyleSheet::parse(css).unwrap();
        assert!(sheet.dark_mode().is_none());
    }

    #[test]
    fn render_without_block_returns_source() {
        let css = "a { color: red; }\n";
        let sheet = StyleSheet::parse(css).unwrap();
        assert_eq!(sheet.render_with(None), css);
    }

    #[test]
    fn render_appends_after_blank_line() {
        let sheet = StyleSheet::parse("a { color: red; }").unwrap();
        let mut block = DarkModeBlock::new();
        let mut rule = StyleRule::new("a");
        rule.declarations.push(Declaration::new("color", "blue"));
        block.push_rule(rule);

        assert_eq!(
            sheet.render_with(Some(&block)),
            "a { color: red; }\n\n@media (prefers-color-scheme: dark) {\n  a {\n    color: blue;\n  }\n}\n"
        );
    }

    #[test]
    fn render_removal_takes_leading_whitespace() {
        let css = "a { color: red; }\n\n@media (prefers-color-scheme: dark) { a { color: blue; } }\n";
        let sheet = StyleSheet::parse(css).unwrap();
        assert_eq!(sheet.render_with(None), "a { color: red; }\n");
    }
}
