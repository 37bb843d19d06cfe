//! Read-write locked map whose entries expire after a fixed time-to-live.
//!
//! Expired entries are kept until overwritten or cleared so that callers can
//! fall back to them when the upstream is unavailable.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{Duration, Instant};

use log::warn;

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Result of a cache lookup.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup<V> {
    Fresh(V),
    Stale(V),
    Miss,
}

pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, Entry<V>>>,
    ttl: Duration,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// A poisoned lock only means a writer panicked mid-insert; the map itself is intact.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.read().unwrap_or_else(|poisoned| {
            warn!("Market data cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<K, Entry<V>>> {
        self.entries.write().unwrap_or_else(|poisoned| {
            warn!("Market data cache lock was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    pub fn lookup(&self, key: &K) -> CacheLookup<V> {
        match self.read().get(key) {
            Some(entry) if entry.expires_at > Instant::now() => {
                CacheLookup::Fresh(entry.value.clone())
            }
            Some(entry) => CacheLookup::Stale(entry.value.clone()),
            None => CacheLookup::Miss,
        }
    }

    /// Unexpired value, if any.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.lookup(key) {
            CacheLookup::Fresh(value) => Some(value),
            _ => None,
        }
    }

    pub fn insert(&self, key: K, value: V) {
        let expires_at = Instant::now() + self.ttl;
        self.write().insert(key, Entry { value, expires_at });
    }

    pub fn clear(&self) {
        self.write().clear();
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
