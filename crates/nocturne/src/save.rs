//! The save request.
//!
//! A save takes a complete [`ColorMap`], persists it as the authoritative
//! record, reconciles every stylesheet it names, and notifies listeners.
//!
//! ```text
//! payload ──validate──▶ ColorMap ──persist──▶ dark-mode-colors.json
//!                          │
//!                          ├─▶ reconcile site.css   ─▶ write site.css
//!                          ├─▶ reconcile extra.css  ─▶ (parse error, skipped)
//!                          │
//!                          └─▶ broadcast {"type":"update"}
//! ```
//!
//! Stylesheets are handled independently: a missing or unparsable file is
//! reported in the [`SaveReport`] and the others are still written. Nothing is
//! rolled back.
//!
//! # Single-Writer Design
//!
//! Saving takes `&mut self`, so two reconciliations of the same file can never
//! interleave their read-modify-write cycles. Callers sharing a service across
//! threads wrap it in a `Mutex`.

use std::sync::Arc;

use indexmap::IndexMap;
use nocturne_css::{reconcile_with_changes, Change, ColorMap, SheetColors};
use serde::Serialize;
use serde_json::Value;

use crate::broadcast::{Broadcaster, StateEvent};
use crate::error::{Error, Result};
use crate::store::Store;

/// Outcome of a save or apply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReport {
    pub message: String,
    /// Stylesheets reconciled successfully, in map order.
    pub updated_files: Vec<String>,
    /// Stylesheets that could not be reconciled.
    pub failures: Vec<FileFailure>,
    /// Mutations made per stylesheet; sheets that were already up to date are
    /// absent.
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub changes: IndexMap<String, Vec<Change>>,
}

impl SaveReport {
    /// True when every stylesheet was reconciled.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileFailure {
    pub file: String,
    pub error: String,
}

pub struct SaveService {
    store: Store,
    broadcaster: Arc<Broadcaster>,
}

impl SaveService {
    pub fn new(store: Store, broadcaster: Arc<Broadcaster>) -> Self {
        Self { store, broadcaster }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    /// Handles a raw save payload.
    ///
    /// # Errors
    ///
    /// [`Error::Validation`] when the payload is not a color map; no file is
    /// touched in that case. Otherwise see [`SaveService::save`].
    pub fn save_payload(&mut self, payload: Value) -> Result<SaveReport> {
        let map = ColorMap::from_value(payload).map_err(|err| {
            tracing::error!("rejected save payload: {}", err);
            Error::from(err)
        })?;
        self.save(&map)
    }

    /// Persists `map`, reconciles each stylesheet it names and broadcasts an
    /// update.
    ///
    /// # Errors
    ///
    /// Fails only when the color map itself cannot be written. Per-stylesheet
    /// failures are listed in the report.
    pub fn save(&mut self, map: &ColorMap) -> Result<SaveReport> {
        if let Err(err) = self.store.save_color_map(map) {
            tracing::error!("failed to save color map: {}", err);
            return Err(err);
        }
        tracing::info!("{} updated", self.store.color_map_path().display());

        let mut report = self.apply(map);
        report.message = "Colors saved successfully.".to_string();

        self.broadcaster.publish(StateEvent::Update);
        Ok(report)
    }

    /// Reconciles each stylesheet named by `map` without persisting the map or
    /// broadcasting.
    pub fn apply(&mut self, map: &ColorMap) -> SaveReport {
        let mut report = SaveReport::default();
        for (name, colors) in map.sheets() {
            match self.apply_sheet(name, colors) {
                Ok(changes) => {
                    report.updated_files.push(name.to_string());
                    if !changes.is_empty() {
                        report.changes.insert(name.to_string(), changes);
                    }
                }
                Err(err) => {
                    if err.is_not_found() {
                        tracing::warn!("skipping {}: {}", name, err);
                    } else {
                        tracing::error!("failed to update {}: {}", name, err);
                    }
                    report.failures.push(FileFailure {
                        file: name.to_string(),
                        error: err.to_string(),
                    });
                }
            }
        }
        report.message = format!(
            "Updated {} of {} stylesheets.",
            report.updated_files.len(),
            report.updated_files.len() + report.failures.len()
        );
        report
    }

    fn apply_sheet(&self, name: &str, colors: &SheetColors) -> Result<Vec<Change>> {
        let css = self.store.read_stylesheet(name)?;
        let outcome = reconcile_with_changes(&css, colors).map_err(|source| Error::Parse {
            path: self.store.stylesheet_path(name).unwrap_or_else(|_| name.into()),
            source,
        })?;

        for change in &outcome.changes {
            tracing::debug!(sheet = name, "{}", change);
        }
        if outcome.is_changed() {
            self.store.write_stylesheet(name, &outcome.css)?;
            tracing::info!(
                changes = outcome.changes.len(),
                "updated dark mode styles in {}",
                name
            );
        } else {
            tracing::debug!("{} already up to date", name);
        }
        Ok(outcome.changes)
    }
}
