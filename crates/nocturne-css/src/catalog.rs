//! Discovery of color-carrying attributes.
//!
//! The attribute catalog lists, per stylesheet, every selector that declares one
//! of the color properties, and which of those properties it declares. Editing
//! tools use it to offer the attributes a user can override.
//!
//! Rules nested in grouping at-rules (`@media`, `@supports`, `@layer`,
//! `@container`, `@document`, `@scope`) are visited too. Other at-rules, like
//! `@font-face` or `@keyframes`, contribute nothing.

use cssparser::{
    AtRuleParser, CowRcStr, DeclarationParser, ParseError, Parser, ParserInput, ParserState,
    QualifiedRuleParser, RuleBodyItemParser, RuleBodyParser,
};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::document::{consume_balanced, is_grouping, raw_text, StyleSheet};
use crate::error::ParseError as StyleSheetError;

/// Properties considered color-carrying unless configured otherwise.
pub const DEFAULT_COLOR_PROPERTIES: &[&str] =
    &["color", "background-color", "border-color", "fill", "stroke"];

/// Selector → color properties, in first-seen order.
pub type SheetCatalog = IndexMap<String, Vec<String>>;

/// Catalogs for every stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttributeCatalog {
    sheets: IndexMap<String, SheetCatalog>,
}

impl AttributeCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a stylesheet's catalog. Sheets without color attributes are skipped.
    pub fn insert(&mut self, sheet: impl Into<String>, catalog: SheetCatalog) {
        if !catalog.is_empty() {
            self.sheets.insert(sheet.into(), catalog);
        }
    }

    pub fn sheet(&self, name: &str) -> Option<&SheetCatalog> {
        self.sheets.get(name)
    }

    pub fn sheets(&self) -> impl Iterator<Item = (&str, &SheetCatalog)> {
        self.sheets.iter().map(|(name, catalog)| (name.as_str(), catalog))
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Total number of (sheet, selector, property) entries.
    pub fn attribute_count(&self) -> usize {
        self.sheets
            .values()
            .flat_map(|catalog| catalog.values())
            .map(Vec::len)
            .sum()
    }
}

/// Lists the color attributes declared in `css`.
///
/// # Errors
///
/// Fails with the same [`ParseError`](StyleSheetError) as reconciliation when
/// the sheet is malformed.
pub fn extract_catalog<S: AsRef<str>>(
    css: &str,
    color_properties: &[S],
) -> Result<SheetCatalog, StyleSheetError> {
    StyleSheet::parse(css)?;

    let mut input = ParserInput::new(css);
    let mut parser = Parser::new(&mut input);
    let mut walker = CatalogWalker {
        properties: color_properties,
        catalog: SheetCatalog::new(),
    };
    let rules = cssparser::StyleSheetParser::new(&mut parser, &mut walker);
    for _ in rules {}

    Ok(walker.catalog)
}

struct CatalogWalker<'p, S> {
    properties: &'p [S],
    catalog: SheetCatalog,
}

impl<S: AsRef<str>> CatalogWalker<'_, S> {
    fn is_color_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.as_ref() == name)
    }

    fn record(&mut self, selector: &str, property: &str) {
        if !self.is_color_property(property) {
            return;
        }
        let properties = self.catalog.entry(selector.to_string()).or_default();
        if !properties.iter().any(|p| p == property) {
            properties.push(property.to_string());
        }
    }
}

impl<'i, S: AsRef<str>> QualifiedRuleParser<'i> for CatalogWalker<'_, S> {
    type Prelude = String;
    type QualifiedRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        let selector = raw_text(input).map_err(|_| input.new_custom_error::<(), ()>(()))?;
        Ok(selector.to_string())
    }

    fn parse_block<'t>(
        &mut self,
        selector: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::QualifiedRule, ParseError<'i, Self::Error>> {
        let mut names = PropertyNames;
        let properties: Vec<String> = RuleBodyParser::new(input, &mut names).flatten().collect();
        for property in properties {
            self.record(&selector, &property);
        }
        Ok(())
    }
}

impl<'i, S: AsRef<str>> AtRuleParser<'i> for CatalogWalker<'_, S> {
    /// Whether the at-rule groups style rules.
    type Prelude = bool;
    type AtRule = ();
    type Error = ();

    fn parse_prelude<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Prelude, ParseError<'i, Self::Error>> {
        while input.next().is_ok() {}
        Ok(is_grouping(&name))
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
        groups_rules: Self::Prelude,
        _start: &ParserState,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::AtRule, ParseError<'i, Self::Error>> {
        if groups_rules {
            let nested = cssparser::StyleSheetParser::new(input, self);
            for _ in nested {}
        } else {
            consume_balanced(input).map_err(|_| input.new_custom_error::<(), ()>(()))?;
        }
        Ok(())
    }
}

/// Yields the property name of every well-formed declaration.
struct PropertyNames;

impl<'i> DeclarationParser<'i> for PropertyNames {
    type Declaration = String;
    type Error = ();

    fn parse_value<'t>(
        &mut self,
        name: CowRcStr<'i>,
        input: &mut Parser<'i, 't>,
    ) -> Result<Self::Declaration, ParseError<'i, Self::Error>> {
        while input.next().is_ok() {}
        Ok(name.as_ref().to_string())
    }
}

impl<'i> AtRuleParser<'i> for PropertyNames {
    type Prelude = ();
    type AtRule = String;
    type Error = ();
}

impl<'i> QualifiedRuleParser<'i> for PropertyNames {
    type Prelude = ();
    type QualifiedRule = String;
    type Error = ();
}

impl<'i> RuleBodyItemParser<'i, String, ()> for PropertyNames {
    fn parse_declarations(&self) -> bool {
        true
    }
    fn parse_qualified(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(css: &str) -> SheetCatalog {
        extract_catalog(css, DEFAULT_COLOR_PROPERTIES).unwrap()
    }

    #[test]
    fn collects_color_properties_per_selector() {
        let catalog = extract(
            ".title { color: red; font-weight: bold; background-color: #000; }\n\
             svg path { fill: blue; stroke: black; stroke-width: 2px; }",
        );
        assert_eq!(catalog[".title"], vec!["color", "background-color"]);
        assert_eq!(catalog["svg path"], vec!["fill", "stroke"]);
    }

    #[test]
    fn skips_rules_without_color() {
        let catalog = extract("p { margin: 0; } a { color: red; }");
        assert!(!catalog.contains_key("p"));
        assert_eq!(catalog.len(), 1);
    }

    #[test]
    fn merges_repeated_selectors_without_duplicates() {
        let catalog = extract("a { color: red; } a { color: blue; border-color: gray; }");
        assert_eq!(catalog["a"], vec!["color", "border-color"]);
    }

    #[test]
    fn walks_grouping_at_rules() {
        let catalog = extract(
            "@media print { .a { color: black; } }\n\
             @supports (display: grid) { @media (min-width: 1px) { .b { fill: red; } } }\n\
             @font-face { font-family: x; color: red; }\n\
             @keyframes pulse { from { color: red; } }",
        );
        let selectors: Vec<_> = catalog.keys().map(String::as_str).collect();
        assert_eq!(selectors, vec![".a", ".b"]);
    }

    #[test]
    fn honors_custom_property_list() {
        let catalog = extract_catalog("a { color: red; outline-color: blue; }", &["outline-color"])
            .unwrap();
        assert_eq!(catalog["a"], vec!["outline-color"]);
    }

    #[test]
    fn tolerates_malformed_declarations() {
        let catalog = extract("a { color red; fill: blue; }");
        assert_eq!(catalog["a"], vec!["fill"]);
    }

    #[test]
    fn rejects_malformed_sheet() {
        assert!(extract_catalog("a { color: red;", DEFAULT_COLOR_PROPERTIES).is_err());
    }

    #[test]
    fn attribute_catalog_skips_empty_sheets() {
        let mut catalog = AttributeCatalog::new();
        catalog.insert("empty.css", SheetCatalog::new());
        catalog.insert("a.css", extract("a { color: red; fill: red; }"));
        assert!(catalog.sheet("empty.css").is_none());
        assert_eq!(catalog.attribute_count(), 2);
        assert_eq!(
            serde_json::to_string(&catalog).unwrap(),
            r#"{"a.css":{"a":["color","fill"]}}"#
        );
    }
}
