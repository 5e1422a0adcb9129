//! Command-line interface.
//!
//! ```text
//! nocturne apply                               reconcile stylesheets with the stored map
//! nocturne save [FILE]                         save a color map payload (FILE or stdin)
//! nocturne catalog                             write the attribute catalog
//! nocturne set site.css .title color '#eee'    change one color
//! nocturne unset site.css .title color         drop one color
//! nocturne show                                print the stored map
//! ```

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use clap::{Parser, Subcommand};
use nocturne_css::AttributeKey;
use serde_json::Value;

use crate::broadcast::Broadcaster;
use crate::catalog::build_catalog;
use crate::config::{Config, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::save::{SaveReport, SaveService};
use crate::session::EditSession;
use crate::store::Store;

/// Keep prefers-color-scheme blocks in sync with a color map.
#[derive(Debug, Parser)]
#[command(name = "nocturne", version, about)]
pub struct Cli {
    /// Configuration file [default: nocturne.yaml, if present]
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log every individual change
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Directory holding the stylesheets
    #[arg(long, global = true, value_name = "DIR")]
    pub stylesheet_dir: Option<PathBuf>,

    /// Persisted color map
    #[arg(long, global = true, value_name = "FILE")]
    pub color_map: Option<PathBuf>,

    /// Attribute catalog output
    #[arg(long, global = true, value_name = "FILE")]
    pub catalog: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Reconcile every stylesheet with the stored color map
    Apply,
    /// Save a color map payload and reconcile the stylesheets it names
    Save {
        /// JSON payload; reads stdin when omitted
        file: Option<PathBuf>,
    },
    /// Extract color attributes from the stylesheets
    Catalog,
    /// Set one dark-mode color
    Set {
        sheet: String,
        selector: String,
        property: String,
        value: String,
    },
    /// Remove one dark-mode color
    Unset {
        sheet: String,
        selector: String,
        property: String,
    },
    /// Print the stored color map
    Show,
}

impl Cli {
    /// Loads the configuration and applies the path overrides.
    ///
    /// An explicit `--config` must exist; the default file is optional.
    pub fn load_config(&self) -> Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default(Path::new(CONFIG_FILE))?,
        };
        if let Some(dir) = &self.stylesheet_dir {
            config.stylesheet_dir = dir.clone();
        }
        if let Some(path) = &self.color_map {
            config.color_map = path.clone();
        }
        if let Some(path) = &self.catalog {
            config.catalog = path.clone();
        }
        Ok(config)
    }
}

/// Runs `cli`, writing results to `out`.
///
/// Returns `false` when some stylesheet could not be reconciled.
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<bool> {
    let config = cli.load_config()?;
    let store = Store::new(&config);

    match &cli.command {
        Command::Apply => {
            let map = store.load_color_map()?;
            let mut service = SaveService::new(store, Arc::new(Broadcaster::new()));
            let report = service.apply(&map);
            write_report(out, &report)?;
            Ok(report.is_complete())
        }
        Command::Save { file } => {
            let payload = read_payload(file.as_deref())?;
            let mut service = SaveService::new(store, Arc::new(Broadcaster::new()));
            let report = service.save_payload(payload)?;
            serde_json::to_writer_pretty(&mut *out, &report)
                .map_err(|e| Error::io("<stdout>", e.into()))?;
            emit(out, "")?;
            Ok(report.is_complete())
        }
        Command::Catalog => {
            let stylesheets = config.catalog_stylesheets()?;
            let catalog = build_catalog(&store, &stylesheets, &config.color_properties);
            store.save_catalog(&catalog)?;
            emit(
                out,
                &format!(
                    "Cataloged {} attributes in {} stylesheets to {}",
                    catalog.attribute_count(),
                    catalog.sheets().count(),
                    store.catalog_path().display()
                ),
            )?;
            Ok(true)
        }
        Command::Set {
            sheet,
            selector,
            property,
            value,
        } => {
            let key = AttributeKey::new(sheet, selector, property);
            edit(config, store, out, |session| {
                session.set(key, value.as_str(), Instant::now())
            })
        }
        Command::Unset {
            sheet,
            selector,
            property,
        } => {
            let key = AttributeKey::new(sheet, selector, property);
            edit(config, store, out, |session| {
                session.remove(key, Instant::now())
            })
        }
        Command::Show => {
            let map = store.load_color_map()?;
            let json = map.to_json_pretty().map_err(|source| Error::Json {
                path: store.color_map_path().to_path_buf(),
                source,
            })?;
            emit(out, &json)?;
            Ok(true)
        }
    }
}

/// Runs one edit through a session and flushes it right away.
fn edit<W, F>(config: Config, store: Store, out: &mut W, apply: F) -> Result<bool>
where
    W: Write,
    F: FnOnce(&mut EditSession),
{
    let service = SaveService::new(store, Arc::new(Broadcaster::new()));
    let mut session = EditSession::open(service, config.debounce())?;
    apply(&mut session);
    match session.flush()? {
        Some(report) => {
            write_report(out, &report)?;
            Ok(report.is_complete())
        }
        None => Ok(true),
    }
}

fn read_payload(file: Option<&Path>) -> Result<Value> {
    let (json, origin) = match file {
        Some(path) => (
            fs::read_to_string(path).map_err(|e| Error::io(path, e))?,
            path.display().to_string(),
        ),
        None => {
            let mut json = String::new();
            io::stdin()
                .read_to_string(&mut json)
                .map_err(|e| Error::io("<stdin>", e))?;
            (json, "<stdin>".to_string())
        }
    };
    serde_json::from_str(&json).map_err(|e| Error::Validation(format!("{}: {}", origin, e)))
}

fn write_report<W: Write>(out: &mut W, report: &SaveReport) -> Result<()> {
    for file in &report.updated_files {
        let line = match report.changes.get(file).map(Vec::len) {
            Some(1) => format!("updated {} (1 change)", file),
            Some(n) => format!("updated {} ({} changes)", file, n),
            None => format!("updated {} (unchanged)", file),
        };
        emit(out, &line)?;
    }
    for failure in &report.failures {
        emit(out, &format!("failed  {}: {}", failure.file, failure.error))?;
    }
    emit(out, &report.message)
}

fn emit<W: Write>(out: &mut W, line: &str) -> Result<()> {
    writeln!(out, "{}", line).map_err(|e| Error::io("<stdout>", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;
    use std::ffi::OsString;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_edit_commands() {
        let cli = Cli::try_parse_from([
            "nocturne",
            "set",
            "site.css",
            ".nav a",
            "color",
            "#eee",
            "-v",
        ])
        .unwrap();
        assert!(cli.verbose);
        match cli.command {
            Command::Set {
                selector, value, ..
            } => {
                assert_eq!(selector, ".nav a");
                assert_eq!(value, "#eee");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn overrides_replace_config_paths() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("custom.yaml");
        fs::write(&config_path, "stylesheet_dir: from-file\ncolor_map: map.json\n").unwrap();

        let args: Vec<OsString> = vec![
            "nocturne".into(),
            "--config".into(),
            config_path.into_os_string(),
            "--stylesheet-dir".into(),
            "from-flag".into(),
            "show".into(),
        ];
        let cli = Cli::try_parse_from(args).unwrap();
        let config = cli.load_config().unwrap();

        assert_eq!(config.stylesheet_dir, PathBuf::from("from-flag"));
        assert_eq!(config.color_map, PathBuf::from("map.json"));
    }

    #[test]
    fn explicit_config_must_exist() {
        let cli =
            Cli::try_parse_from(["nocturne", "--config", "/nonexistent/nocturne.yaml", "show"])
                .unwrap();
        assert!(cli.load_config().unwrap_err().is_not_found());
    }
}
