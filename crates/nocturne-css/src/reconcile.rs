//! Dark-mode block reconciliation.
//!
//! [`reconcile`] rewrites a stylesheet's `@media (prefers-color-scheme: dark)`
//! block so that it holds exactly the declarations of a [`SheetColors`] map:
//!
//! 1. **Prune**: every declaration whose `(selector, property)` is not in the map
//!    is removed, at any depth, including rules inside grouping at-rules and
//!    rules nested in rule bodies. Rules and groups left without declarations
//!    are removed with it.
//! 2. **Apply**: every `(selector, property, value)` in the map is written to the
//!    first rule with that exact selector, searched depth-first, updating an
//!    existing declaration or appending a new one. Selectors without a rule get
//!    a new rule at the end of the block.
//! 3. **Cleanup**: a block left without any declaration is removed from the
//!    sheet, along with any at-rules kept as written inside it.
//!
//! Selectors and property names are compared as literal strings. Values are
//! written through verbatim.
//!
//! The operation is pure: it reads nothing but its arguments and returns the new
//! text. When nothing needs to change, the input is returned byte for byte, which
//! makes reconciliation idempotent.
//!
//! # Example
//!
//! ```
//! use nocturne_css::{reconcile, SheetColors};
//!
//! let mut colors = SheetColors::new();
//! colors
//!     .entry("a".to_string())
//!     .or_default()
//!     .insert("color".to_string(), "green".to_string());
//!
//! let css = "a { color: red; }\n@media (prefers-color-scheme: dark) { a { color: blue; } }\n";
//! let updated = reconcile(css, &colors).unwrap();
//! assert!(updated.starts_with("a { color: red; }\n@media (prefers-color-scheme: dark) {"));
//! assert!(updated.contains("    color: green;\n"));
//! ```

use std::fmt;

use serde::Serialize;

use crate::color_map::SheetColors;
use crate::document::{BlockItem, DarkModeBlock, Declaration, StyleRule, StyleSheet};
use crate::error::ParseError;

/// One mutation made while reconciling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Change {
    BlockCreated,
    BlockRemoved,
    RuleAdded {
        selector: String,
    },
    RuleRemoved {
        selector: String,
    },
    GroupRemoved {
        prelude: String,
    },
    DeclarationAdded {
        selector: String,
        property: String,
        value: String,
    },
    DeclarationUpdated {
        selector: String,
        property: String,
        from: String,
        to: String,
    },
    DeclarationRemoved {
        selector: String,
        property: String,
        value: String,
    },
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Change::BlockCreated => write!(f, "created dark mode block"),
            Change::BlockRemoved => write!(f, "removed empty dark mode block"),
            Change::RuleAdded { selector } => write!(f, "added rule {}", selector),
            Change::RuleRemoved { selector } => write!(f, "removed empty rule {}", selector),
            Change::GroupRemoved { prelude } => write!(f, "removed empty group {}", prelude),
            Change::DeclarationAdded {
                selector,
                property,
                value,
            } => write!(f, "added {} {{ {}: {}; }}", selector, property, value),
            Change::DeclarationUpdated {
                selector,
                property,
                from,
                to,
            } => write!(f, "updated {} {{ {}: {} -> {}; }}", selector, property, from, to),
            Change::DeclarationRemoved {
                selector,
                property,
                value,
            } => write!(f, "removed {} {{ {}: {}; }}", selector, property, value),
        }
    }
}

/// The outcome of [`reconcile_with_changes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    /// The updated stylesheet text.
    pub css: String,
    /// Mutations in the order they were made. Empty when `css` equals the input.
    pub changes: Vec<Change>,
}

impl Reconciliation {
    /// True when the stylesheet was modified.
    pub fn is_changed(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// Reconciles the dark-mode block of `css` with `desired`.
///
/// # Errors
///
/// Returns [`ParseError`] when `css` cannot be parsed.
pub fn reconcile(css: &str, desired: &SheetColors) -> Result<String, ParseError> {
    reconcile_with_changes(css, desired).map(|outcome| outcome.css)
}

/// Like [`reconcile`], also reporting each mutation.
pub fn reconcile_with_changes(
    css: &str,
    desired: &SheetColors,
) -> Result<Reconciliation, ParseError> {
    let sheet = StyleSheet::parse(css)?;
    let existed = sheet.dark_mode().is_some();
    let mut block = sheet.dark_mode().cloned().unwrap_or_default();
    let mut changes = Vec::new();

    prune(&mut block, desired, &mut changes);
    apply(&mut block, desired, &mut changes);

    let css = match (existed, block.is_empty()) {
        (true, true) => {
            changes.push(Change::BlockRemoved);
            sheet.render_with(None)
        }
        (false, true) => css.to_string(),
        (false, false) => {
            changes.insert(0, Change::BlockCreated);
            sheet.render_with(Some(&block))
        }
        (true, false) if changes.is_empty() => css.to_string(),
        (true, false) => sheet.render_with(Some(&block)),
    };

    Ok(Reconciliation { css, changes })
}

fn prune(block: &mut DarkModeBlock, desired: &SheetColors, changes: &mut Vec<Change>) {
    prune_items(&mut block.items, desired, changes);
}

fn prune_items(items: &mut Vec<BlockItem>, desired: &SheetColors, changes: &mut Vec<Change>) {
    items.retain_mut(|item| match item {
        BlockItem::Rule(rule) => prune_rule(rule, desired, changes),
        BlockItem::Group(group) => {
            prune_items(&mut group.items, desired, changes);
            let keep = group.items.iter().any(BlockItem::has_declarations);
            if !keep {
                changes.push(Change::GroupRemoved {
                    prelude: group.prelude.clone(),
                });
            }
            keep
        }
        BlockItem::Verbatim(_) => true,
    });
}

/// Prunes `rule` and its nested rules; returns whether it still declares
/// anything.
fn prune_rule(rule: &mut StyleRule, desired: &SheetColors, changes: &mut Vec<Change>) -> bool {
    let wanted = desired.get(&rule.selector);
    let selector = &rule.selector;
    rule.declarations.retain(|decl| {
        let keep = wanted.is_some_and(|properties| properties.contains_key(&decl.property));
        if !keep {
            changes.push(Change::DeclarationRemoved {
                selector: selector.clone(),
                property: decl.property.clone(),
                value: decl.value.clone(),
            });
        }
        keep
    });
    prune_items(&mut rule.children, desired, changes);

    let keep = !rule.declarations.is_empty()
        || rule.children.iter().any(BlockItem::has_declarations);
    if !keep {
        changes.push(Change::RuleRemoved {
            selector: rule.selector.clone(),
        });
    }
    keep
}

fn apply(block: &mut DarkModeBlock, desired: &SheetColors, changes: &mut Vec<Change>) {
    for (selector, properties) in desired {
        for (property, value) in properties {
            let Some(rule) = block.rule_mut(selector) else {
                let mut rule = StyleRule::new(selector.clone());
                rule.declarations
                    .push(Declaration::new(property.clone(), value.clone()));
                block.push_rule(rule);
                changes.push(Change::RuleAdded {
                    selector: selector.clone(),
                });
                changes.push(Change::DeclarationAdded {
                    selector: selector.clone(),
                    property: property.clone(),
                    value: value.clone(),
                });
                continue;
            };

            let mut found = false;
            // Every duplicate of the property is updated so the last one in the
            // cascade carries the new value too.
            for decl in rule
                .declarations
                .iter_mut()
                .filter(|decl| decl.property == *property)
            {
                found = true;
                if decl.value != *value {
                    changes.push(Change::DeclarationUpdated {
                        selector: selector.clone(),
                        property: property.clone(),
                        from: std::mem::replace(&mut decl.value, value.clone()),
                        to: value.clone(),
                    });
                }
            }
            if !found {
                rule.declarations
                    .push(Declaration::new(property.clone(), value.clone()));
                changes.push(Change::DeclarationAdded {
                    selector: selector.clone(),
                    property: property.clone(),
                    value: value.clone(),
                });
            }
        }
    }
}
