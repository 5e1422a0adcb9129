//! The persisted color map: stylesheet → selector → property → color.
//!
//! [`ColorMap`] is a plain value. It serializes to and from the JSON file that
//! records every override, preserving key order so the file diffs cleanly.
//!
//! ```json
//! {
//!   "manual-style.css": {
//!     ".title": { "color": "#fff", "background-color": "#000" }
//!   }
//! }
//! ```

use std::fmt;
use std::str::FromStr;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ColorMapError;

/// Property → color for one selector.
pub type Declarations = IndexMap<String, String>;

/// Selector → declarations for one stylesheet. This is what the reconciler
/// consumes.
pub type SheetColors = IndexMap<String, Declarations>;

/// Color overrides for every stylesheet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColorMap {
    sheets: IndexMap<String, SheetColors>,
}

impl ColorMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON document. See [`ColorMap::from_value`].
    pub fn from_json(json: &str) -> Result<Self, ColorMapError> {
        let value: Value = serde_json::from_str(json)?;
        Self::from_value(value)
    }

    /// Validates and converts an already-decoded JSON value.
    ///
    /// The value must be an object of objects of objects of strings. Selectors
    /// and property names must not be blank.
    pub fn from_value(value: Value) -> Result<Self, ColorMapError> {
        let sheets = match value {
            Value::Object(sheets) => sheets,
            other => {
                return Err(ColorMapError::invalid(format!(
                    "expected an object, found {}",
                    kind_of(&other)
                )))
            }
        };

        let mut map = ColorMap::new();
        for (sheet, selectors) in sheets {
            let selectors = match selectors {
                Value::Object(selectors) => selectors,
                other => {
                    return Err(ColorMapError::invalid(format!(
                        "'{}': expected an object of selectors, found {}",
                        sheet,
                        kind_of(&other)
                    )))
                }
            };
            let entry = map.sheets.entry(sheet.clone()).or_default();
            for (selector, properties) in selectors {
                if selector.trim().is_empty() {
                    return Err(ColorMapError::invalid(format!("'{}': blank selector", sheet)));
                }
                let properties = match properties {
                    Value::Object(properties) => properties,
                    other => {
                        return Err(ColorMapError::invalid(format!(
                            "'{}' > '{}': expected an object of properties, found {}",
                            sheet,
                            selector,
                            kind_of(&other)
                        )))
                    }
                };
                let declarations = entry.entry(selector.clone()).or_default();
                for (property, color) in properties {
                    if property.trim().is_empty() {
                        return Err(ColorMapError::invalid(format!(
                            "'{}' > '{}': blank property name",
                            sheet, selector
                        )));
                    }
                    let color = match color {
                        Value::String(color) => color,
                        other => {
                            return Err(ColorMapError::invalid(format!(
                                "'{}' > '{}' > '{}': expected a color string, found {}",
                                sheet,
                                selector,
                                property,
                                kind_of(&other)
                            )))
                        }
                    };
                    declarations.insert(property, color);
                }
            }
        }
        Ok(map)
    }

    /// Serializes with two-space indentation.
    pub fn to_json_pretty(&self) -> Result<String, ColorMapError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn is_empty(&self) -> bool {
        self.sheets.is_empty()
    }

    /// Stylesheet names in insertion order.
    pub fn sheet_names(&self) -> impl Iterator<Item = &str> {
        self.sheets.keys().map(String::as_str)
    }

    /// Every stylesheet with its overrides.
    pub fn sheets(&self) -> impl Iterator<Item = (&str, &SheetColors)> {
        self.sheets.iter().map(|(name, colors)| (name.as_str(), colors))
    }

    /// The overrides of one stylesheet.
    pub fn sheet(&self, name: &str) -> Option<&SheetColors> {
        self.sheets.get(name)
    }

    /// Looks up a single color.
    pub fn get(&self, sheet: &str, selector: &str, property: &str) -> Option<&str> {
        self.sheets
            .get(sheet)?
            .get(selector)?
            .get(property)
            .map(String::as_str)
    }

    /// Sets a color, returning the one it replaced.
    pub fn set(
        &mut self,
        sheet: impl Into<String>,
        selector: impl Into<String>,
        property: impl Into<String>,
        value: impl Into<String>,
    ) -> Option<String> {
        self.sheets
            .entry(sheet.into())
            .or_default()
            .entry(selector.into())
            .or_default()
            .insert(property.into(), value.into())
    }

    /// Removes a color, returning it.
    ///
    /// A selector left without properties is dropped. The stylesheet entry stays,
    /// even when empty, so the next reconciliation clears its dark-mode block.
    pub fn remove(&mut self, sheet: &str, selector: &str, property: &str) -> Option<String> {
        let selectors = self.sheets.get_mut(sheet)?;
        let properties = selectors.get_mut(selector)?;
        let removed = properties.shift_remove(property);
        if properties.is_empty() {
            selectors.shift_remove(selector);
        }
        removed
    }

    /// Applies a set (`Some`) or remove (`None`) for one attribute.
    pub fn apply(&mut self, key: &AttributeKey, value: Option<&str>) -> Option<String> {
        match value {
            Some(value) => self.set(&key.sheet, &key.selector, &key.property, value),
            None => self.remove(&key.sheet, &key.selector, &key.property),
        }
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Identifies one overridable attribute: `sheet||selector||property`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AttributeKey {
    pub sheet: String,
    pub selector: String,
    pub property: String,
}

/// Separator between the parts of a serialized [`AttributeKey`].
pub const KEY_SEPARATOR: &str = "||";

impl AttributeKey {
    pub fn new(
        sheet: impl Into<String>,
        selector: impl Into<String>,
        property: impl Into<String>,
    ) -> Self {
        Self {
            sheet: sheet.into(),
            selector: selector.into(),
            property: property.into(),
        }
    }
}

impl fmt::Display for AttributeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{sep}{}{sep}{}",
            self.sheet,
            self.selector,
            self.property,
            sep = KEY_SEPARATOR
        )
    }
}

impl FromStr for AttributeKey {
    type Err = ColorMapError;

    /// Splits on the first and last separator, so selectors may themselves
    /// contain `||`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ColorMapError::invalid(format!("malformed attribute key '{}'", s));
        let (sheet, rest) = s.split_once(KEY_SEPARATOR).ok_or_else(invalid)?;
        let (selector, property) = rest.rsplit_once(KEY_SEPARATOR).ok_or_else(invalid)?;
        if sheet.is_empty() || selector.is_empty() || property.is_empty() {
            return Err(invalid());
        }
        Ok(Self::new(sheet, selector, property))
    }
}
