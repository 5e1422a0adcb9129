//! Building the attribute catalog from stylesheets on disk.

use nocturne_css::{extract_catalog, AttributeCatalog};

use crate::error::{Error, Result};
use crate::store::Store;

/// Extracts the color attributes of each named stylesheet.
///
/// Missing or unparsable stylesheets are skipped with a log line; the catalog
/// lists whatever could be read.
pub fn build_catalog<S: AsRef<str>>(
    store: &Store,
    stylesheets: &[S],
    color_properties: &[S],
) -> AttributeCatalog {
    let mut catalog = AttributeCatalog::new();
    for name in stylesheets {
        let name = name.as_ref();
        match catalog_sheet(store, name, color_properties) {
            Ok(sheet) => {
                tracing::debug!(selectors = sheet.len(), "cataloged {}", name);
                catalog.insert(name, sheet);
            }
            Err(err) if err.is_not_found() => tracing::warn!("skipping {}: {}", name, err),
            Err(err) => tracing::error!("failed to catalog {}: {}", name, err),
        }
    }
    catalog
}

fn catalog_sheet<S: AsRef<str>>(
    store: &Store,
    name: &str,
    color_properties: &[S],
) -> Result<nocturne_css::SheetCatalog> {
    let css = store.read_stylesheet(name)?;
    extract_catalog(&css, color_properties).map_err(|source| Error::Parse {
        path: store.stylesheet_path(name).unwrap_or_else(|_| name.into()),
        source,
    })
}
