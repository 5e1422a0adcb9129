//! # Nocturne - Dark-Mode Color Editing
//!
//! The calling layer around [`nocturne_css`]: it stores the color map, applies
//! it to stylesheets on disk, and tells listeners when the stylesheets changed.
//!
//! ## Core Concepts
//!
//! - [`Config`]: where stylesheets, the color map and the catalog live
//! - [`Store`]: reads and writes those files
//! - [`SaveService`]: the save request; persist, reconcile each stylesheet,
//!   broadcast
//! - [`Broadcaster`]: fan-out of [`StateEvent`]s to registered listeners
//! - [`EditSession`]: debounces single-attribute edits into one save
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use nocturne::{Broadcaster, Config, SaveService, Store};
//! use serde_json::json;
//!
//! let config = Config::load_or_default("nocturne.yaml".as_ref())?;
//! let broadcaster = Arc::new(Broadcaster::new());
//! let reloads = broadcaster.subscribe();
//!
//! let mut service = SaveService::new(Store::new(&config), broadcaster);
//! let report = service.save_payload(json!({
//!     "site.css": { ".title": { "color": "#e0e0e0" } }
//! }))?;
//!
//! println!("{} ({:?})", report.message, report.updated_files);
//! assert!(reloads.try_recv().is_ok());
//! # Ok::<(), nocturne::Error>(())
//! ```

pub mod broadcast;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod save;
pub mod session;
pub mod store;

pub use broadcast::{Broadcaster, StateEvent};
pub use catalog::build_catalog;
pub use config::{Config, CONFIG_FILE};
pub use error::{Error, Result};
pub use save::{FileFailure, SaveReport, SaveService};
pub use session::{Edit, EditQueue, EditSession, RecentColors, RECENT_COLORS_CAPACITY};
pub use store::Store;

pub use nocturne_css::{AttributeCatalog, AttributeKey, ColorMap, SheetColors};
