//! The in-memory entry store and its invalidation consumer.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::entry::CacheEntry;
use crate::metrics;

/// Key → entry map guarded by a reader/writer lock.
///
/// Lookups take the shared lock, mutations the exclusive one, and neither
/// is held across I/O or an `.await`. Entries are published as whole
/// `Arc<CacheEntry>` values, so a reader either sees the previous entry or
/// the new one, never a partially built one.
///
/// Nothing expires on its own. Entries leave the store only through
/// [`invalidate`](Self::invalidate) or when the store is dropped.
#[derive(Debug, Default)]
pub struct CacheStore {
    entries: RwLock<HashMap<String, Arc<CacheEntry>>>,
}

impl CacheStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Looks up the entry stored under `key`.
    pub fn get(&self, key: &str) -> Option<Arc<CacheEntry>> {
        self.entries.read().get(key).cloned()
    }

    /// Stores `entry` under `key`, replacing any previous entry.
    pub fn put(&self, key: impl Into<String>, entry: CacheEntry) {
        let key = key.into();
        trace!(%key, "storing cache entry");
        self.entries.write().insert(key, Arc::new(entry));
    }

    /// Removes the entry stored under `key`.
    ///
    /// The empty key clears the whole store.
    pub fn invalidate(&self, key: &str) {
        if key.is_empty() {
            self.clear();
            return;
        }
        let removed = self.entries.write().remove(key);
        debug!(key, removed = removed.is_some(), "invalidated cache entry");
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        drop(entries);
        debug!(count, "cleared cache store");
    }

    /// Returns `true` if an entry is stored under `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of stored entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Returns `true` if nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

/// Spawns the background task applying invalidation messages to `store`.
///
/// Messages are applied one at a time in arrival order: an empty string
/// clears the store, anything else evicts that key. The task only holds a
/// weak reference, and exits when the channel closes or the store is gone.
///
/// # Panics
///
/// Panics if called outside of a tokio runtime.
pub fn spawn_invalidation(
    store: &Arc<CacheStore>,
    mut keys: mpsc::Receiver<String>,
) -> JoinHandle<()> {
    let store: Weak<CacheStore> = Arc::downgrade(store);
    tokio::spawn(async move {
        while let Some(key) = keys.recv().await {
            let Some(store) = store.upgrade() else {
                break;
            };
            store.invalidate(&key);
            metrics::record_invalidation(key.is_empty());
        }
        trace!("invalidation consumer stopped");
    })
}
