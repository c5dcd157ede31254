// ── Generic reactive entity collection ──
//
// Concurrent storage with O(1) lookups and push-based change
// notification via `watch` channels.

use std::hash::Hash;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::watch;

/// A concurrent, reactive collection for a single entity type.
///
/// Uses `DashMap` for O(1) concurrent lookups and `watch` channels
/// for push-based change notification. Every mutation bumps a version
/// counter and rebuilds the snapshot that subscribers receive. Snapshots
/// are ordered by key.
pub(crate) struct EntityCollection<K, T>
where
    K: Clone + Eq + Hash + Ord + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    by_key: DashMap<K, Arc<T>>,

    /// Version counter, bumped on every mutation.
    version: watch::Sender<u64>,

    /// Full snapshot, rebuilt on mutation for efficient subscription.
    snapshot: watch::Sender<Arc<Vec<Arc<T>>>>,
}

impl<K, T> EntityCollection<K, T>
where
    K: Clone + Eq + Hash + Ord + Send + Sync + 'static,
    T: Send + Sync + 'static,
{
    pub(crate) fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        let (snapshot, _) = watch::channel(Arc::new(Vec::new()));

        Self {
            by_key: DashMap::new(),
            version,
            snapshot,
        }
    }

    /// Insert or update an entity. Returns `true` if the key was new.
    pub(crate) fn upsert(&self, key: K, entity: T) -> bool {
        let is_new = self.by_key.insert(key, Arc::new(entity)).is_none();
        self.rebuild_snapshot();
        self.bump_version();
        is_new
    }

    /// Remove an entity by key. Returns the removed entity if it existed.
    pub(crate) fn remove(&self, key: &K) -> Option<Arc<T>> {
        let removed = self.by_key.remove(key).map(|(_, v)| v);
        if removed.is_some() {
            self.rebuild_snapshot();
            self.bump_version();
        }
        removed
    }

    pub(crate) fn get(&self, key: &K) -> Option<Arc<T>> {
        self.by_key.get(key).map(|r| Arc::clone(r.value()))
    }

    /// Get the current snapshot (cheap `Arc` clone).
    pub(crate) fn snapshot(&self) -> Arc<Vec<Arc<T>>> {
        self.snapshot.borrow().clone()
    }

    /// Subscribe to snapshot changes via a `watch::Receiver`.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Arc<Vec<Arc<T>>>> {
        self.snapshot.subscribe()
    }

    pub(crate) fn version(&self) -> u64 {
        *self.version.borrow()
    }

    pub(crate) fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Return all current keys matching `pred`.
    pub(crate) fn keys_where(&self, pred: impl Fn(&K) -> bool) -> Vec<K> {
        self.by_key
            .iter()
            .filter(|r| pred(r.key()))
            .map(|r| r.key().clone())
            .collect()
    }

    // ── Private helpers ──────────────────────────────────────────────

    /// Collect all values into a key-ordered snapshot and broadcast it.
    fn rebuild_snapshot(&self) {
        let mut entries: Vec<(K, Arc<T>)> = self
            .by_key
            .iter()
            .map(|r| (r.key().clone(), Arc::clone(r.value())))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        let values = entries.into_iter().map(|(_, v)| v).collect();
        // `send_modify` updates unconditionally, even with zero receivers.
        self.snapshot.send_modify(|snap| *snap = Arc::new(values));
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn upsert_reports_new_keys() {
        let col: EntityCollection<String, String> = EntityCollection::new();
        assert!(col.upsert("k".into(), "hello".into()));
        assert!(!col.upsert("k".into(), "world".into()));
        assert_eq!(*col.get(&"k".to_owned()).unwrap(), "world");
        assert_eq!(col.version(), 2);
    }

    #[test]
    fn remove_updates_snapshot() {
        let col: EntityCollection<String, String> = EntityCollection::new();
        col.upsert("a".into(), "x".into());
        col.upsert("b".into(), "y".into());
        assert_eq!(col.snapshot().len(), 2);

        assert_eq!(*col.remove(&"a".to_owned()).unwrap(), "x");
        assert!(col.remove(&"a".to_owned()).is_none());
        assert_eq!(col.len(), 1);
        assert_eq!(col.snapshot().len(), 1);
    }

    #[test]
    fn snapshot_is_key_ordered() {
        let col: EntityCollection<u32, &str> = EntityCollection::new();
        col.upsert(3, "c");
        col.upsert(1, "a");
        col.upsert(2, "b");
        let snap: Vec<&str> = col.snapshot().iter().map(|v| **v).collect();
        assert_eq!(snap, vec!["a", "b", "c"]);
    }

    #[test]
    fn keys_where_filters() {
        let col: EntityCollection<u32, ()> = EntityCollection::new();
        for k in 0..6 {
            col.upsert(k, ());
        }
        let mut even = col.keys_where(|k| k % 2 == 0);
        even.sort_unstable();
        assert_eq!(even, vec![0, 2, 4]);
    }
}
