//! Registry of in-flight requests, one per [`DedupKey`].

use std::{
    collections::HashMap,
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;

use crate::event::{DedupKey, SharedEvent, StateEvent};

struct Registration {
    id: u64,
    cancel: watch::Sender<bool>,
}

/// Enforces at most one active operation per dedup key and publishes the
/// number of active keys.
///
/// The map and the published count are only touched while holding the map
/// lock, so observers never see a count that disagrees with the map.
pub struct EventTracker {
    active: Mutex<HashMap<DedupKey, Registration>>,
    active_jobs: watch::Sender<usize>,
    next_id: AtomicU64,
}

impl EventTracker {
    pub fn new() -> Self {
        let (active_jobs, _) = watch::channel(0);
        Self {
            active: Mutex::new(HashMap::new()),
            active_jobs,
            next_id: AtomicU64::new(1),
        }
    }

    /// Registers the event's key. Returns `false` when the same key is
    /// already active; the caller must then dispatch nothing.
    pub fn try_begin(&self, event: &dyn StateEvent) -> bool {
        self.register(event.dedup_key()).is_some()
    }

    /// Like [`try_begin`](Self::try_begin) but hands back a guard that
    /// releases the registration when dropped.
    pub fn begin(self: &Arc<Self>, event: SharedEvent) -> Option<ActiveEvent> {
        let key = event.dedup_key();
        let (id, cancel) = self.register(key.clone())?;
        Some(ActiveEvent {
            tracker: Arc::clone(self),
            event,
            key,
            id,
            cancel,
        })
    }

    /// Removes the event's key. Unknown keys are ignored.
    pub fn end(&self, event: &dyn StateEvent) {
        let key = event.dedup_key();
        let mut active = self.active.lock();
        if active.remove(&key).is_some() {
            self.active_jobs.send_replace(active.len());
            debug!(kind = key.kind, active = active.len(), "request released");
        }
    }

    pub fn is_active(&self, event: &dyn StateEvent) -> bool {
        self.active.lock().contains_key(&event.dedup_key())
    }

    pub fn active_count(&self) -> usize {
        *self.active_jobs.borrow()
    }

    pub fn subscribe_active_count(&self) -> watch::Receiver<usize> {
        self.active_jobs.subscribe()
    }

    /// Signals every active registration and clears the set. The count is
    /// zero when this returns, even if cancelled work is still unwinding.
    pub fn cancel_all(&self) {
        let mut active = self.active.lock();
        let cancelled = active.len();
        for (_, registration) in active.drain() {
            registration.cancel.send_replace(true);
        }
        self.active_jobs.send_replace(0);
        if cancelled > 0 {
            debug!(cancelled, "cancelled all active requests");
        }
    }

    fn register(&self, key: DedupKey) -> Option<(u64, CancelToken)> {
        let mut active = self.active.lock();
        if active.contains_key(&key) {
            return None;
        }
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (cancel, rx) = watch::channel(false);
        active.insert(key, Registration { id, cancel });
        self.active_jobs.send_replace(active.len());
        Some((id, CancelToken { rx }))
    }

    /// Releases `key` only if it still belongs to registration `id`, so a
    /// stale guard never removes a newer registration of the same key.
    fn release(&self, key: &DedupKey, id: u64) {
        let mut active = self.active.lock();
        if active.get(key).is_some_and(|registration| registration.id == id) {
            active.remove(key);
            self.active_jobs.send_replace(active.len());
            debug!(kind = key.kind, active = active.len(), "request released");
        }
    }
}

impl Default for EventTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for EventTracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let active = self.active.lock();
        f.debug_struct("EventTracker")
            .field("active", &active.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Scoped registration. Dropping it releases the key on every exit path.
pub struct ActiveEvent {
    tracker: Arc<EventTracker>,
    event: SharedEvent,
    key: DedupKey,
    id: u64,
    cancel: CancelToken,
}

impl ActiveEvent {
    pub fn event(&self) -> &SharedEvent {
        &self.event
    }

    pub fn key(&self) -> &DedupKey {
        &self.key
    }

    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Runs `deliver` under the registry lock if this registration is still
    /// the active one for its key. Returns whether it ran. A concurrent
    /// [`EventTracker::cancel_all`] either fully precedes or fully follows it.
    pub fn deliver_if_active(&self, deliver: impl FnOnce()) -> bool {
        let active = self.tracker.active.lock();
        let current = active
            .get(&self.key)
            .is_some_and(|registration| registration.id == self.id);
        if current {
            deliver();
        }
        current
    }
}

impl Drop for ActiveEvent {
    fn drop(&mut self) {
        self.tracker.release(&self.key, self.id);
    }
}

impl fmt::Debug for ActiveEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveEvent")
            .field("key", &self.key)
            .field("id", &self.id)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once the registration is cancelled. Never resolves for a
    /// registration that is released normally.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        loop {
            if *rx.borrow_and_update() {
                return;
            }
            if rx.changed().await.is_err() {
                std::future::pending::<()>().await;
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/tracker_tests.rs"]
mod tests;
