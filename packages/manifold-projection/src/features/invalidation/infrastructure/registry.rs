//! Listener registry
//!
//! The registry holds listeners weakly. A `Subscription` handle keeps its
//! listener alive and removes the entry when dropped, so delivery ends at
//! a defined point instead of whenever the listener happens to be
//! collected. Dead entries are pruned on every traversal.

use crate::features::invalidation::ports::{InvalidationListener, RefreshRequest};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

struct ListenerEntry {
    id: u64,
    /// Data address of the listener, for identity comparison
    addr: usize,
    early: bool,
    handles: usize,
    listener: Weak<dyn InvalidationListener>,
}

type Entries = RwLock<Vec<ListenerEntry>>;

fn addr_of(listener: &Arc<dyn InvalidationListener>) -> usize {
    Arc::as_ptr(listener) as *const () as usize
}

/// Live listeners split by notification phase, in subscription order
#[derive(Default)]
pub struct ListenerSnapshot {
    pub early: Vec<Arc<dyn InvalidationListener>>,
    pub late: Vec<Arc<dyn InvalidationListener>>,
}

impl ListenerSnapshot {
    pub fn is_empty(&self) -> bool {
        self.early.is_empty() && self.late.is_empty()
    }

    pub fn notify_early(&self, request: &RefreshRequest) {
        for listener in &self.early {
            listener.refreshed_types(request);
        }
    }

    pub fn notify_late(&self, request: &RefreshRequest) {
        for listener in &self.late {
            listener.refreshed_types(request);
        }
    }

    /// Blanket refresh, early listeners first
    pub fn notify_refreshed(&self) {
        for listener in self.early.iter().chain(&self.late) {
            listener.refreshed();
        }
    }
}

pub struct InvalidationRegistry {
    entries: Arc<Entries>,
    next_id: AtomicU64,
}

impl InvalidationRegistry {
    pub fn new() -> Self {
        Self {
            entries: Arc::new(RwLock::new(Vec::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register `listener`. Subscribing a listener that is already
    /// registered keeps the original entry and phase.
    pub fn subscribe(&self, listener: Arc<dyn InvalidationListener>, early: bool) -> Subscription {
        let addr = addr_of(&listener);
        let mut entries = self.entries.write();
        entries.retain(|e| e.listener.strong_count() > 0);

        let id = match entries.iter_mut().find(|e| e.addr == addr) {
            Some(existing) => {
                existing.handles += 1;
                tracing::debug!("Listener {} already subscribed", existing.id);
                existing.id
            }
            None => {
                let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                entries.push(ListenerEntry {
                    id,
                    addr,
                    early,
                    handles: 1,
                    listener: Arc::downgrade(&listener),
                });
                id
            }
        };

        Subscription {
            id,
            listener,
            entries: Arc::downgrade(&self.entries),
        }
    }

    /// Remove `listener` by identity; false if it was not registered
    pub fn unsubscribe(&self, listener: &Arc<dyn InvalidationListener>) -> bool {
        let addr = addr_of(listener);
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.listener.strong_count() > 0 && e.addr != addr);
        before != entries.len()
    }

    /// Upgrade live listeners and prune the dead ones
    pub fn snapshot(&self) -> ListenerSnapshot {
        let mut snapshot = ListenerSnapshot::default();
        let mut entries = self.entries.write();
        entries.retain(|entry| match entry.listener.upgrade() {
            Some(listener) => {
                if entry.early {
                    snapshot.early.push(listener);
                } else {
                    snapshot.late.push(listener);
                }
                true
            }
            None => false,
        });
        snapshot
    }

    /// Registered entries, dead ones included until the next traversal
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}

/// Keeps a listener registered. Dropping the last handle for a listener
/// removes it.
pub struct Subscription {
    id: u64,
    listener: Arc<dyn InvalidationListener>,
    entries: Weak<Entries>,
}

impl Subscription {
    pub fn listener(&self) -> &Arc<dyn InvalidationListener> {
        &self.listener
    }

    /// Whether the registry still delivers to this listener
    pub fn is_active(&self) -> bool {
        match self.entries.upgrade() {
            Some(entries) => entries.read().iter().any(|e| e.id == self.id),
            None => false,
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(entries) = self.entries.upgrade() else {
            return;
        };
        let mut entries = entries.write();
        if let Some(pos) = entries.iter().position(|e| e.id == self.id) {
            entries[pos].handles -= 1;
            if entries[pos].handles == 0 {
                entries.remove(pos);
            }
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.is_active())
            .finish()
    }
}
