//! File access for color maps, catalogs and stylesheets.
//!
//! The [`Store`] owns the one persisted [`ColorMap`] and resolves stylesheet
//! names against the configured directory. It knows nothing about
//! reconciliation; see [`SaveService`](crate::SaveService) for that.

use std::fs;
use std::path::{Component, Path, PathBuf};

use nocturne_css::{AttributeCatalog, ColorMap};

use crate::config::Config;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct Store {
    stylesheet_dir: PathBuf,
    color_map: PathBuf,
    catalog: PathBuf,
}

impl Store {
    pub fn new(config: &Config) -> Self {
        Self {
            stylesheet_dir: config.stylesheet_dir.clone(),
            color_map: config.color_map.clone(),
            catalog: config.catalog.clone(),
        }
    }

    /// Path of the persisted color map.
    pub fn color_map_path(&self) -> &Path {
        &self.color_map
    }

    /// Path of the attribute catalog.
    pub fn catalog_path(&self) -> &Path {
        &self.catalog
    }

    /// Loads the color map. A missing file is an empty map.
    pub fn load_color_map(&self) -> Result<ColorMap> {
        let json = match fs::read_to_string(&self.color_map) {
            Ok(json) => json,
            Err(e) => {
                let err = Error::io(&self.color_map, e);
                if err.is_not_found() {
                    tracing::debug!("{} not found, starting empty", self.color_map.display());
                    return Ok(ColorMap::new());
                }
                return Err(err);
            }
        };
        ColorMap::from_json(&json).map_err(|source| Error::Json {
            path: self.color_map.clone(),
            source,
        })
    }

    /// Writes the color map as pretty JSON.
    pub fn save_color_map(&self, map: &ColorMap) -> Result<()> {
        let json = map.to_json_pretty().map_err(|source| Error::Json {
            path: self.color_map.clone(),
            source,
        })?;
        write_file(&self.color_map, &json)
    }

    /// Loads the attribute catalog.
    pub fn load_catalog(&self) -> Result<AttributeCatalog> {
        let json = fs::read_to_string(&self.catalog).map_err(|e| Error::io(&self.catalog, e))?;
        serde_json::from_str(&json).map_err(|source| Error::Json {
            path: self.catalog.clone(),
            source: source.into(),
        })
    }

    /// Writes the attribute catalog as pretty JSON.
    pub fn save_catalog(&self, catalog: &AttributeCatalog) -> Result<()> {
        let json = serde_json::to_string_pretty(catalog).map_err(|source| Error::Json {
            path: self.catalog.clone(),
            source: source.into(),
        })?;
        write_file(&self.catalog, &json)
    }

    /// Resolves a stylesheet name inside the stylesheet directory.
    ///
    /// Names must be relative and may not climb out of the directory.
    pub fn stylesheet_path(&self, name: &str) -> Result<PathBuf> {
        let relative = Path::new(name);
        let is_plain = !name.is_empty()
            && relative
                .components()
                .all(|component| matches!(component, Component::Normal(_)));
        if !is_plain {
            return Err(Error::InvalidSheetName(name.to_string()));
        }
        Ok(self.stylesheet_dir.join(relative))
    }

    pub fn read_stylesheet(&self, name: &str) -> Result<String> {
        let path = self.stylesheet_path(name)?;
        fs::read_to_string(&path).map_err(|e| Error::io(path, e))
    }

    pub fn write_stylesheet(&self, name: &str, css: &str) -> Result<()> {
        let path = self.stylesheet_path(name)?;
        fs::write(&path, css).map_err(|e| Error::io(path, e))
    }
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
    }
    fs::write(path, contents).map_err(|e| Error::io(path, e))
}
