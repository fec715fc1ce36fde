// SPDX-FileCopyrightText: © 2025 StreamKit Contributors
//
// SPDX-License-Identifier: MPL-2.0

//! Advisory memoization of provider responses.
//!
//! Keyed by a digest of the normalized request payload. A miss must always be served by the
//! network path; concurrent identical requests are not coalesced, the cache only suppresses
//! later duplicates.
//!
//! # Example
//!
//! ```rust
//! use ccapi_core::cache::{CachePolicy, RequestCache};
//! use ccapi_core::clock::SystemClock;
//! use std::sync::Arc;
//!
//! let cache: RequestCache<String> =
//!     RequestCache::new(CachePolicy::default(), Arc::new(SystemClock));
//! let key = RequestCache::<String>::key_for(&serde_json::json!({"prompt": "cat"}));
//! cache.insert(key.clone(), "https://x/y.png".to_string());
//! assert_eq!(cache.get(&key).as_deref(), Some("https://x/y.png"));
//! ```

use crate::clock::Clock;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Size and age limits for a [`RequestCache`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachePolicy {
    pub max_entries: usize,
    pub max_age: Duration,
}

impl Default for CachePolicy {
    fn default() -> Self {
        Self { max_entries: 50, max_age: Duration::from_secs(3600) }
    }
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheInfo {
    pub total_entries: usize,
    pub valid_entries: usize,
    pub expired_entries: usize,
    pub max_entries: usize,
    pub max_age: Duration,
}

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

/// Bounded, time-limited cache with an injected clock.
pub struct RequestCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
    policy: CachePolicy,
    clock: Arc<dyn Clock>,
}

impl<V: Clone> RequestCache<V> {
    pub fn new(policy: CachePolicy, clock: Arc<dyn Clock>) -> Self {
        Self { entries: Mutex::new(HashMap::new()), policy, clock }
    }

    /// Digest of the canonical JSON form of `payload`.
    ///
    /// Object keys serialize in sorted order, so two payloads that differ only in key order map
    /// to the same key.
    pub fn key_for(payload: &serde_json::Value) -> String {
        let canonical = payload.to_string();
        hex::encode(Sha256::digest(canonical.as_bytes()))
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_expired(&self, entry: &CacheEntry<V>, now: Instant) -> bool {
        now.saturating_duration_since(entry.inserted_at) >= self.policy.max_age
    }

    /// Returns the cached value unless it has expired. Expired entries are removed.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut entries = self.lock();
        let expired = match entries.get(key) {
            Some(entry) if !self.is_expired(entry, now) => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            entries.remove(key);
            tracing::debug!(key, "Cache entry expired");
        }
        None
    }

    /// Inserts a value, sweeping expired entries and evicting the oldest ones over capacity.
    pub fn insert(&self, key: String, value: V) {
        let now = self.clock.now();
        let mut entries = self.lock();

        entries.retain(|_, entry| !self.is_expired(entry, now));
        entries.insert(key, CacheEntry { value, inserted_at: now });

        if entries.len() > self.policy.max_entries {
            let mut by_age: Vec<(String, Instant)> =
                entries.iter().map(|(k, e)| (k.clone(), e.inserted_at)).collect();
            by_age.sort_by_key(|(_, inserted_at)| *inserted_at);
            let excess = entries.len() - self.policy.max_entries;
            for (key, _) in by_age.into_iter().take(excess) {
                entries.remove(&key);
            }
            tracing::debug!(evicted = excess, "Evicted oldest cache entries");
        }
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn info(&self) -> CacheInfo {
        let now = self.clock.now();
        let entries = self.lock();
        let expired_entries = entries.values().filter(|e| self.is_expired(e, now)).count();
        CacheInfo {
            total_entries: entries.len(),
            valid_entries: entries.len() - expired_entries,
            expired_entries,
            max_entries: self.policy.max_entries,
            max_age: self.policy.max_age,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use serde_json::json;

    fn cache_with_clock(max_entries: usize) -> (RequestCache<u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let policy = CachePolicy { max_entries, max_age: Duration::from_secs(60) };
        (RequestCache::new(policy, clock.clone()), clock)
    }

    #[test]
    fn test_key_ignores_field_order() {
        let a = json!({"prompt": "cat", "size": "2048x2048"});
        let b = json!({"size": "2048x2048", "prompt": "cat"});
        assert_eq!(RequestCache::<u32>::key_for(&a), RequestCache::<u32>::key_for(&b));
        assert_ne!(
            RequestCache::<u32>::key_for(&a),
            RequestCache::<u32>::key_for(&json!({"prompt": "dog", "size": "2048x2048"}))
        );
    }

    #[test]
    fn test_entries_expire_with_clock() {
        let (cache, clock) = cache_with_clock(10);
        cache.insert("k".to_string(), 7);
        assert_eq!(cache.get("k"), Some(7));

        clock.advance(Duration::from_secs(59));
        assert_eq!(cache.get("k"), Some(7));

        clock.advance(Duration::from_secs(1));
        assert_eq!(cache.info().expired_entries, 1);
        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.info().total_entries, 0);
    }

    #[test]
    fn test_oldest_entries_evicted_over_capacity() {
        let (cache, clock) = cache_with_clock(2);
        cache.insert("a".to_string(), 1);
        clock.advance(Duration::from_secs(1));
        cache.insert("b".to_string(), 2);
        clock.advance(Duration::from_secs(1));
        cache.insert("c".to_string(), 3);

        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));
        assert_eq!(cache.get("c"), Some(3));
        assert_eq!(cache.info().total_entries, 2);
    }

    #[test]
    fn test_insert_sweeps_expired() {
        let (cache, clock) = cache_with_clock(10);
        cache.insert("old".to_string(), 1);
        clock.advance(Duration::from_secs(120));
        cache.insert("new".to_string(), 2);

        let info = cache.info();
        assert_eq!(info.total_entries, 1);
        assert_eq!(info.valid_entries, 1);
    }

    #[test]
    fn test_clear() {
        let (cache, _clock) = cache_with_clock(10);
        cache.insert("a".to_string(), 1);
        cache.clear();
        assert_eq!(cache.info().total_entries, 0);
    }
}
