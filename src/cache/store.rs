//! Cache storage.
//!
//! [`CacheStore`] is the seam between the TTL logic and wherever values
//! live. [`MemoryStore`] keeps them in process for its whole lifetime.

use std::{
    collections::HashMap,
    sync::{Arc, RwLock},
    time::Duration,
};

use tokio::time::Instant;

use super::lock::{rw_read, rw_write};

const SOURCE: &str = "cache::store";

/// A stored value together with the moment it was produced.
#[derive(Debug)]
pub struct CacheEntry<T> {
    pub value: Arc<T>,
    pub stored_at: Instant,
}

impl<T> Clone for CacheEntry<T> {
    fn clone(&self) -> Self {
        Self {
            value: Arc::clone(&self.value),
            stored_at: self.stored_at,
        }
    }
}

impl<T> CacheEntry<T> {
    pub fn age(&self, now: Instant) -> Duration {
        now.saturating_duration_since(self.stored_at)
    }

    pub fn is_fresh(&self, now: Instant, ttl: Duration) -> bool {
        self.age(now) < ttl
    }
}

/// Key→entry storage. Writes replace whole values; nothing is mutated in place.
pub trait CacheStore<T>: Send + Sync {
    fn get(&self, key: &str) -> Option<CacheEntry<T>>;
    fn set(&self, key: &str, value: Arc<T>, stored_at: Instant);
}

/// Process-local store backed by a lock-protected map.
pub struct MemoryStore<T> {
    entries: RwLock<HashMap<String, CacheEntry<T>>>,
}

impl<T> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        rw_read(&self.entries, SOURCE, "len").len()
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Send + Sync> CacheStore<T> for MemoryStore<T> {
    fn get(&self, key: &str) -> Option<CacheEntry<T>> {
        rw_read(&self.entries, SOURCE, "get").get(key).cloned()
    }

    fn set(&self, key: &str, value: Arc<T>, stored_at: Instant) {
        rw_write(&self.entries, SOURCE, "set")
            .insert(key.to_string(), CacheEntry { value, stored_at });
    }
}
