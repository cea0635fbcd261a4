//! Insert-only loading cache

use std::hash::{BuildHasherDefault, Hash};
use std::sync::atomic::{AtomicUsize, Ordering};

use dashmap::DashMap;
use rustc_hash::FxHasher;

use crate::error::BindResult;

/// Concurrent map that computes missing entries on demand.
///
/// Entries are never updated or removed. A miss runs the loader outside any
/// shard lock, so two threads missing on the same key may both load; the
/// first insert wins and both callers get the stored value. A loader error
/// is returned to its caller and nothing is stored.
pub struct LoadingCache<K, V> {
    entries: DashMap<K, V, BuildHasherDefault<FxHasher>>,
    loads: AtomicUsize,
}

impl<K, V> LoadingCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    /// Create an empty cache
    pub fn new() -> Self {
        Self {
            entries: DashMap::default(),
            loads: AtomicUsize::new(0),
        }
    }

    /// Get the value for `key`, loading and storing it on a miss
    pub fn get_or_load<F>(&self, key: K, load: F) -> BindResult<V>
    where
        F: FnOnce() -> BindResult<V>,
    {
        if let Some(hit) = self.entries.get(&key) {
            tracing::trace!("cache hit");
            return Ok(hit.value().clone());
        }

        let loaded = load()?;
        self.loads.fetch_add(1, Ordering::Relaxed);
        Ok(self.entries.entry(key).or_insert(loaded).value().clone())
    }

    /// Get the value for `key` without loading
    pub fn get_if_present(&self, key: &K) -> Option<V> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check if nothing is stored
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of successful loads, including ones that lost an insert race
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::Relaxed)
    }
}

impl<K, V> Default for LoadingCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}
