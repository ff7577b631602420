//! Memoization caches
//!
//! Bounded LRU caches that persist dataset loads and fitted models across
//! page renders. Model entries are keyed by [`CacheKey`], a hash over every
//! input that affects the fit, so a changed widget value always retrains.

mod key;

pub use key::{CacheKey, CacheKeyBuilder};

use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::trace;

/// A cached value and its last-access tick
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    last_accessed: u64,
    access_count: u64,
}

/// Hit/miss counters of a [`MemoCache`]
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total > 0 {
            self.hits as f64 / total as f64
        } else {
            0.0
        }
    }
}

/// Thread-safe memoization cache with least-recently-used eviction
pub struct MemoCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    max_size: usize,
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    clock: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
}

impl<K, V> MemoCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Create a cache holding at most `max_size` entries
    pub fn new(max_size: usize) -> Self {
        let max_size = max_size.max(1);
        Self {
            max_size,
            entries: RwLock::new(HashMap::with_capacity(max_size)),
            clock: AtomicU64::new(0),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
        }
    }

    fn tick(&self) -> u64 {
        self.clock.fetch_add(1, Ordering::Relaxed)
    }

    /// Look up `key`, counting a hit or a miss
    pub fn get(&self, key: &K) -> Option<V> {
        let now = self.tick();
        let mut entries = self.entries.write();
        match entries.get_mut(key) {
            Some(entry) => {
                entry.last_accessed = now;
                entry.access_count += 1;
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Insert or replace an entry, evicting the least recently used one when full
    pub fn insert(&self, key: K, value: V) {
        let now = self.tick();
        let mut entries = self.entries.write();

        if !entries.contains_key(&key) && entries.len() >= self.max_size {
            let lru = entries
                .iter()
                .min_by_key(|(_, e)| e.last_accessed)
                .map(|(k, _)| k.clone());
            if let Some(lru) = lru {
                entries.remove(&lru);
                trace!("evicted least recently used cache entry");
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                last_accessed: now,
                access_count: 1,
            },
        );
    }

    /// Return the cached value for `key`, computing and storing it on a miss.
    ///
    /// The flag is `true` when the value came from the cache. A failed
    /// computation is returned as-is and nothing is stored.
    pub fn get_or_try_insert_with<E, F>(&self, key: K, compute: F) -> std::result::Result<(V, bool), E>
    where
        F: FnOnce() -> std::result::Result<V, E>,
    {
        if let Some(value) = self.get(&key) {
            return Ok((value, true));
        }
        let value = compute()?;
        self.insert(key, value.clone());
        Ok((value, false))
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.entries.write().remove(key).map(|e| e.value)
    }

    pub fn contains(&self, key: &K) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of reads served for `key` since it was inserted
    pub fn access_count(&self, key: &K) -> Option<u64> {
        self.entries.read().get(key).map(|e| e.access_count)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every entry. Counters are kept.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
