//! State-changed notifications.
//!
//! After every successful save the [`Broadcaster`] tells each registered
//! listener that the stylesheets changed, so previews can reload. Delivery is
//! fire-and-forget: there is no acknowledgement, replay or ordering, and
//! listeners that hung up are dropped on the next publish.

use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Mutex, MutexGuard};

use serde::Serialize;

/// The notification payload. Serializes as `{"type":"update"}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum StateEvent {
    Update,
}

/// A dynamic set of listeners.
///
/// Shared between the save path and whoever registers listeners, typically
/// behind an `Arc`.
#[derive(Debug, Default)]
pub struct Broadcaster {
    listeners: Mutex<Vec<Sender<StateEvent>>>,
}

impl Broadcaster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a listener. Dropping the receiver unregisters it.
    pub fn subscribe(&self) -> Receiver<StateEvent> {
        let (tx, rx) = mpsc::channel();
        self.lock().push(tx);
        rx
    }

    /// Sends `event` to every live listener and returns how many received it.
    pub fn publish(&self, event: StateEvent) -> usize {
        let mut listeners = self.lock();
        listeners.retain(|tx| tx.send(event).is_ok());
        tracing::debug!(listeners = listeners.len(), "published {:?}", event);
        listeners.len()
    }

    /// Number of registered listeners, including ones that have hung up since
    /// the last publish.
    pub fn listener_count(&self) -> usize {
        self.lock().len()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Sender<StateEvent>>> {
        self.listeners
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
