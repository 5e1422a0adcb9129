//! Workspace configuration.
//!
//! Settings live in an optional `nocturne.yaml`; every field has a default, so
//! a partial file or no file at all both work:
//!
//! ```yaml
//! stylesheet_dir: public/pairs-and-lists/styles
//! color_map: public/dark-mode-colors.json
//! catalog: public/color-properties.json
//! stylesheets:
//!   - manual-racket.css
//!   - scribble.css
//! color_properties: [color, background-color, border-color, fill, stroke]
//! debounce_ms: 2000
//! ```
//!
//! Relative paths resolve against the current directory.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nocturne_css::DEFAULT_COLOR_PROPERTIES;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default configuration file name.
pub const CONFIG_FILE: &str = "nocturne.yaml";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding the stylesheets named by the color map.
    pub stylesheet_dir: PathBuf,
    /// Persisted color map.
    pub color_map: PathBuf,
    /// Attribute catalog output.
    pub catalog: PathBuf,
    /// Stylesheets to catalog. Empty means every `.css` file in
    /// `stylesheet_dir`.
    pub stylesheets: Vec<String>,
    /// Properties treated as colors when cataloging.
    pub color_properties: Vec<String>,
    /// Quiet period before queued edits are saved.
    pub debounce_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            stylesheet_dir: PathBuf::from("public/styles"),
            color_map: PathBuf::from("public/dark-mode-colors.json"),
            catalog: PathBuf::from("public/color-properties.json"),
            stylesheets: Vec::new(),
            color_properties: DEFAULT_COLOR_PROPERTIES
                .iter()
                .map(|p| p.to_string())
                .collect(),
            debounce_ms: 2000,
        }
    }
}

impl Config {
    /// Parses YAML configuration.
    pub fn from_yaml(yaml: &str, path: &Path) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Loads `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        Self::from_yaml(&yaml, path)
    }

    /// Loads `path`, falling back to defaults when it does not exist.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(err) if err.is_not_found() => {
                tracing::debug!("no config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            other => other,
        }
    }

    /// The debounce quiet period.
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }

    /// The stylesheets to catalog: the configured list, or every `.css` file in
    /// the stylesheet directory, sorted by name.
    pub fn catalog_stylesheets(&self) -> Result<Vec<String>> {
        if !self.stylesheets.is_empty() {
            return Ok(self.stylesheets.clone());
        }
        let entries =
            fs::read_dir(&self.stylesheet_dir).map_err(|e| Error::io(&self.stylesheet_dir, e))?;

        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&self.stylesheet_dir, e))?;
            let path = entry.path();
            if path.is_file() && path.extension().is_some_and(|ext| ext == "css") {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_yaml_keeps_defaults() {
        let config = Config::from_yaml(
            "stylesheet_dir: assets/css\ndebounce_ms: 250\n",
            Path::new(CONFIG_FILE),
        )
        .unwrap();

        assert_eq!(config.stylesheet_dir, PathBuf::from("assets/css"));
        assert_eq!(config.debounce(), Duration::from_millis(250));
        assert_eq!(config.color_map, Config::default().color_map);
        assert_eq!(config.color_properties.len(), 5);
    }

    #[test]
    fn malformed_yaml_is_reported() {
        let err = Config::from_yaml("debounce_ms: soon", Path::new(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_default(&dir.path().join(CONFIG_FILE)).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn catalog_stylesheets_scans_directory() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("b.css"), "").unwrap();
        fs::write(dir.path().join("a.css"), "").unwrap();
        fs::write(dir.path().join("notes.txt"), "").unwrap();

        let config = Config {
            stylesheet_dir: dir.path().to_path_buf(),
            ..Config::default()
        };
        assert_eq!(config.catalog_stylesheets().unwrap(), vec!["a.css", "b.css"]);

        let config = Config {
            stylesheets: vec!["racket.css".into()],
            ..config
        };
        assert_eq!(config.catalog_stylesheets().unwrap(), vec!["racket.css"]);
    }
}
