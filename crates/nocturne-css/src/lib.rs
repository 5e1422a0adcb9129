//! # Nocturne CSS - Dark-Mode Block Reconciliation
//!
//! `nocturne-css` keeps the `@media (prefers-color-scheme: dark)` block of a
//! stylesheet in sync with a map of color overrides, and discovers which
//! selector/property pairs of a stylesheet carry colors in the first place.
//!
//! ## Core Concepts
//!
//! - [`ColorMap`]: stylesheet → selector → property → color, the persisted
//!   record of every override
//! - [`SheetColors`]: the slice of a [`ColorMap`] belonging to one stylesheet
//! - [`reconcile`]: rewrites a stylesheet's dark-mode block to hold exactly the
//!   declarations of a [`SheetColors`]
//! - [`StyleSheet`]: source-preserving parse of a stylesheet, structuring only
//!   the dark-mode block
//! - [`extract_catalog`]: lists the color attributes a stylesheet declares
//!
//! ## Quick Start
//!
//! ```rust
//! use nocturne_css::{reconcile, ColorMap};
//!
//! let mut map = ColorMap::new();
//! map.set("site.css", ".title", "color", "#fff");
//! map.set("site.css", ".title", "background-color", "#000");
//!
//! let css = ".title { color: #000; }\n";
//! let updated = reconcile(css, map.sheet("site.css").unwrap()).unwrap();
//!
//! assert_eq!(
//!     updated,
//!     ".title { color: #000; }\n\n\
//!      @media (prefers-color-scheme: dark) {\n  \
//!      .title {\n    color: #fff;\n    background-color: #000;\n  }\n}\n"
//! );
//! ```
//!
//! ## Guarantees
//!
//! Reconciliation is pure and idempotent. Text outside the dark-mode block is
//! never rewritten, and when the block already matches the map the input comes
//! back byte for byte. An empty map removes the block.
//!
//! Parsing is delegated to `cssparser`, the tokenizer used by Firefox.

mod catalog;
mod color_map;
mod document;
mod error;
mod reconcile;

pub use catalog::{extract_catalog, AttributeCatalog, SheetCatalog, DEFAULT_COLOR_PROPERTIES};
pub use color_map::{AttributeKey, ColorMap, Declarations, SheetColors, KEY_SEPARATOR};
pub use document::{
    BlockItem, DarkModeBlock, Declaration, GroupRule, StyleRule, StyleSheet, DARK_MODE_QUERY,
};
pub use error::{ColorMapError, ParseError};
pub use reconcile::{reconcile, reconcile_with_changes, Change, Reconciliation};
