//! Fixed-capacity map with least-recently-used eviction

use crate::error::{WardenError, WardenResult};
use lru::LruCache;
use std::borrow::Borrow;
use std::hash::Hash;
use std::num::NonZeroUsize;

/// Default capacity for per-identifier tables
pub const DEFAULT_CAPACITY: usize = 5_000;

/// Key/value map holding at most `capacity` entries.
///
/// `get` and updating `set` promote an entry to most-recently-used.
/// `has` and `peek` leave the order alone, so existence checks cannot keep
/// stale entries alive.
#[derive(Debug)]
pub struct BoundedLruMap<K: Hash + Eq, V> {
    entries: LruCache<K, V>,
}

impl<K: Hash + Eq, V> BoundedLruMap<K, V> {
    /// Create a map; a capacity below 1 is a configuration error
    pub fn new(capacity: usize) -> WardenResult<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            WardenError::config_with_context(
                "bounded map capacity must be at least 1",
                format!("requested capacity {}", capacity),
            )
        })?;
        Ok(Self {
            entries: LruCache::new(capacity),
        })
    }

    pub fn with_default_capacity() -> Self {
        let capacity = NonZeroUsize::new(DEFAULT_CAPACITY).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Insert or update an entry.
    ///
    /// Returns the entry evicted to make room, if any.
    pub fn set(&mut self, key: K, value: V) -> Option<(K, V)> {
        if let Some(slot) = self.entries.get_mut(&key) {
            *slot = value;
            return None;
        }
        self.entries.push(key, value)
    }

    /// Look up an entry and mark it most-recently-used
    pub fn get<Q>(&mut self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get(key)
    }

    pub fn get_mut<Q>(&mut self, key: &Q) -> Option<&mut V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.get_mut(key)
    }

    /// Look up an entry without touching recency
    pub fn peek<Q>(&self, key: &Q) -> Option<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.peek(key)
    }

    pub fn has<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.contains(key)
    }

    pub fn delete<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.entries.pop(key)
    }

    /// Remove every entry whose key matches the predicate
    pub fn delete_where(&mut self, mut predicate: impl FnMut(&K) -> bool) -> usize
    where
        K: Clone,
    {
        let doomed: Vec<K> = self
            .entries
            .iter()
            .filter(|(key, _)| predicate(key))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &doomed {
            self.entries.pop(key);
        }
        doomed.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    /// Iterate entries from least- to most-recently-used
    pub fn iter(&self) -> impl Iterator<Item = (&K, &V)> {
        self.entries.iter().rev()
    }
}
