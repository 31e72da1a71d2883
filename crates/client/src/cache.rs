// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Bounded key/value cache with idle expiry and LRU eviction.
//!
//! An entry expires once it has gone unread for the time-to-live. Expired
//! entries are never returned, and a background sweep removes them. When
//! the cache grows past its maximum size the least recently used entry is
//! evicted.

use lru::LruCache;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

struct Entry<V> {
    value: V,
    last_accessed: Instant,
}

pub struct BoundedCache<K: Hash + Eq, V> {
    entries: Mutex<LruCache<K, Entry<V>>>,
    ttl: Duration,
}

impl<K, V> BoundedCache<K, V>
where
    K: Eq + Hash + Clone + Send + 'static,
    V: Clone + Send + 'static,
{
    /// A zero `ttl` disables expiry; a zero `max_size` disables the bound.
    pub fn new(max_size: usize, ttl: Duration) -> Self {
        let entries = match NonZeroUsize::new(max_size) {
            Some(cap) => LruCache::new(cap),
            None => LruCache::unbounded(),
        };
        BoundedCache {
            entries: Mutex::new(entries),
            ttl,
        }
    }

    fn is_expired(&self, entry: &Entry<V>, now: Instant) -> bool {
        !self.ttl.is_zero() && now.duration_since(entry.last_accessed) >= self.ttl
    }

    /// Returns the value and refreshes its last access, unless expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let entry = entries.get_mut(key)?;
        if self.is_expired(entry, now) {
            entries.pop(key);
            return None;
        }
        entry.last_accessed = now;
        Some(entry.value.clone())
    }

    /// Inserts or replaces a value. A full cache evicts its least recently
    /// used entry.
    pub fn put(&self, key: K, value: V) {
        let entry = Entry {
            value,
            last_accessed: Instant::now(),
        };
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .put(key, entry);
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.pop(key).map(|entry| entry.value)
    }

    pub fn clear(&self) {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Removes expired entries, yielding between deletions.
    ///
    /// The lock is taken once to find candidates and again for each
    /// deletion, where expiry is re-checked in case the entry was read in
    /// between. Returns the number of entries removed.
    pub async fn sweep(&self) -> usize {
        if self.ttl.is_zero() {
            return 0;
        }
        let candidates: Vec<K> = {
            let now = Instant::now();
            let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
            entries
                .iter()
                .filter(|(_, entry)| self.is_expired(entry, now))
                .map(|(key, _)| key.clone())
                .collect()
        };

        let mut removed = 0;
        for key in candidates {
            {
                let now = Instant::now();
                let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
                // peek leaves the recency order alone
                let still_expired = entries
                    .peek(&key)
                    .is_some_and(|entry| self.is_expired(entry, now));
                if still_expired {
                    entries.pop(&key);
                    removed += 1;
                }
            }
            tokio::task::yield_now().await;
        }
        removed
    }

    /// Spawns the periodic sweep. Returns `None` when expiry or the sweep
    /// interval is disabled.
    pub fn spawn_sweeper(
        self: &Arc<Self>,
        interval: Duration,
        cancel: CancellationToken,
    ) -> Option<JoinHandle<()>> {
        if self.ttl.is_zero() || interval.is_zero() {
            return None;
        }
        let cache = Arc::clone(self);
        Some(tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = tokio::time::sleep(interval) => {}
                }
                let removed = cache.sweep().await;
                if removed > 0 {
                    tracing::debug!(removed, "cache sweep");
                }
            }
        }))
    }
}

#[cfg(test)]
#[path = "cache_tests.rs"]
mod tests;
