//! # Player Events
//!
//! Notification surface mirroring the media-element event model: a small set
//! of event kinds with ordered listener dispatch. Listeners for a given kind
//! run in insertion order; no ordering is guaranteed across kinds.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

/// Kinds of notification the player emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayerEventKind {
    /// Fired once, shortly after construction, signaling the player is
    /// usable.
    LoadedData,
    /// Fired on each progress tick while playing and on each explicit
    /// transition.
    TimeUpdate,
    /// Fired when the track plays through to its natural end, before the
    /// user-supplied end callback runs.
    Ended,
}

/// A notification delivered to listeners.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerEvent {
    /// The notification kind.
    pub kind: PlayerEventKind,
    /// Track position at the time the event was emitted.
    pub position: Duration,
}

/// Handle identifying a registered listener, for later removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type Callback = Arc<dyn Fn(&PlayerEvent) + Send + Sync>;

struct Entry {
    id: ListenerId,
    kind: PlayerEventKind,
    callback: Callback,
}

/// Ordered listener registry shared between the player handle and its
/// background tasks.
#[derive(Clone)]
pub(crate) struct EventBus {
    entries: Arc<Mutex<Vec<Entry>>>,
    next_id: Arc<AtomicU64>,
}

impl EventBus {
    pub(crate) fn new() -> Self {
        Self {
            entries: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a listener for one event kind. Returns a handle for removal.
    pub(crate) fn subscribe(
        &self,
        kind: PlayerEventKind,
        callback: impl Fn(&PlayerEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.entries.lock().push(Entry {
            id,
            kind,
            callback: Arc::new(callback),
        });
        id
    }

    /// Remove a previously registered listener. Unknown ids are ignored.
    pub(crate) fn unsubscribe(&self, id: ListenerId) {
        self.entries.lock().retain(|entry| entry.id != id);
    }

    /// Dispatch an event to all listeners of its kind, in insertion order.
    ///
    /// Callbacks are cloned out of the registry and invoked without the lock
    /// held, so a listener may subscribe or unsubscribe reentrantly.
    pub(crate) fn emit(&self, event: PlayerEvent) {
        let callbacks: Vec<Callback> = self
            .entries
            .lock()
            .iter()
            .filter(|entry| entry.kind == event.kind)
            .map(|entry| Arc::clone(&entry.callback))
            .collect();

        for callback in callbacks {
            callback(&event);
        }
    }
}
