//! Debounced color editing.
//!
//! An editor produces a stream of single-attribute edits, often several per
//! second while a color picker is dragged. Saving each one would rewrite every
//! stylesheet each time, so an [`EditSession`] queues them and saves one merged
//! snapshot once the edits go quiet.
//!
//! The session never sleeps or spawns timers. Callers pass the current
//! [`Instant`] with every edit and call [`EditSession::poll`] whenever it suits
//! their event loop; [`EditSession::deadline`] says when the next poll will do
//! something.
//!
//! ```no_run
//! use std::sync::Arc;
//! use std::time::{Duration, Instant};
//! use nocturne::{AttributeKey, Broadcaster, Config, EditSession, SaveService, Store};
//!
//! let config = Config::default();
//! let service = SaveService::new(Store::new(&config), Arc::new(Broadcaster::new()));
//! let mut session = EditSession::open(service, config.debounce())?;
//!
//! let key: AttributeKey = "site.css||.title||color".parse()?;
//! session.set(key, "#e0e0e0", Instant::now());
//!
//! std::thread::sleep(Duration::from_millis(2000));
//! if let Some(report) = session.poll(Instant::now())? {
//!     println!("{}", report.message);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::VecDeque;
use std::mem;
use std::time::{Duration, Instant};

use indexmap::IndexMap;
use nocturne_css::{AttributeKey, ColorMap};

use crate::error::Result;
use crate::save::{SaveReport, SaveService};

/// Size of the recent-colors palette.
pub const RECENT_COLORS_CAPACITY: usize = 8;

/// One attribute edit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    Set { key: AttributeKey, value: String },
    Remove { key: AttributeKey },
}

impl Edit {
    fn into_parts(self) -> (AttributeKey, Option<String>) {
        match self {
            Edit::Set { key, value } => (key, Some(value)),
            Edit::Remove { key } => (key, None),
        }
    }
}

/// Edits waiting for a quiet period.
///
/// Each attribute keeps only its latest edit. The quiet period restarts on
/// every push.
#[derive(Debug, Clone)]
pub struct EditQueue {
    quiet: Duration,
    pending: IndexMap<AttributeKey, Option<String>>,
    last_edit: Option<Instant>,
}

impl EditQueue {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: IndexMap::new(),
            last_edit: None,
        }
    }

    pub fn push(&mut self, edit: Edit, now: Instant) {
        let (key, value) = edit.into_parts();
        self.pending.insert(key, value);
        self.last_edit = Some(now);
    }

    /// When the queue becomes due, if anything is queued.
    pub fn deadline(&self) -> Option<Instant> {
        if self.pending.is_empty() {
            return None;
        }
        self.last_edit.map(|at| at + self.quiet)
    }

    pub fn is_due(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// The queued value for `key`: `Some(None)` for a queued removal.
    pub fn get(&self, key: &AttributeKey) -> Option<Option<&str>> {
        self.pending.get(key).map(Option::as_deref)
    }

    /// Drains the queue, in first-edited order.
    pub fn take(&mut self) -> IndexMap<AttributeKey, Option<String>> {
        self.last_edit = None;
        mem::take(&mut self.pending)
    }
}

/// Most-recently-used colors, newest first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecentColors {
    colors: VecDeque<String>,
}

impl RecentColors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Moves `color` to the front, evicting the oldest past capacity.
    pub fn record(&mut self, color: &str) {
        if let Some(index) = self.colors.iter().position(|c| c == color) {
            self.colors.remove(index);
        }
        self.colors.push_front(color.to_string());
        self.colors.truncate(RECENT_COLORS_CAPACITY);
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.colors.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }
}

/// An editing session over the stored color map.
pub struct EditSession {
    map: ColorMap,
    queue: EditQueue,
    recent: RecentColors,
    service: SaveService,
}

impl EditSession {
    /// Loads the stored color map and starts an empty queue.
    pub fn open(service: SaveService, quiet: Duration) -> Result<Self> {
        let map = service.store().load_color_map()?;
        Ok(Self {
            map,
            queue: EditQueue::new(quiet),
            recent: RecentColors::new(),
            service,
        })
    }

    pub fn set(&mut self, key: AttributeKey, value: impl Into<String>, now: Instant) {
        let value = value.into();
        self.recent.record(&value);
        tracing::debug!("queued {} = {}", key, value);
        self.queue.push(Edit::Set { key, value }, now);
    }

    pub fn remove(&mut self, key: AttributeKey, now: Instant) {
        tracing::debug!("queued removal of {}", key);
        self.queue.push(Edit::Remove { key }, now);
    }

    /// The value an attribute will have after the next flush.
    pub fn value(&self, key: &AttributeKey) -> Option<&str> {
        match self.queue.get(key) {
            Some(queued) => queued,
            None => self.map.get(&key.sheet, &key.selector, &key.property),
        }
    }

    /// Flushes when the quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Result<Option<SaveReport>> {
        if !self.queue.is_due(now) {
            return Ok(None);
        }
        self.flush()
    }

    /// Merges every queued edit into the map and saves it once.
    ///
    /// Returns `None` when nothing was queued. If the save fails the merged
    /// edits stay in [`EditSession::map`] but are no longer queued.
    pub fn flush(&mut self) -> Result<Option<SaveReport>> {
        if self.queue.is_empty() {
            return Ok(None);
        }
        let edits = self.queue.take();
        tracing::debug!(edits = edits.len(), "flushing queued edits");
        for (key, value) in &edits {
            self.map.apply(key, value.as_deref());
        }
        self.service.save(&self.map).map(Some)
    }

    /// When the next [`poll`](EditSession::poll) will flush.
    pub fn deadline(&self) -> Option<Instant> {
        self.queue.deadline()
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// The map as of the last flush.
    pub fn map(&self) -> &ColorMap {
        &self.map
    }

    pub fn recent(&self) -> &RecentColors {
        &self.recent
    }

    pub fn service(&self) -> &SaveService {
        &self.service
    }
}
