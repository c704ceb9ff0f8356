//! In-process TTL result cache.
//!
//! Shared, concurrently accessed key→value store with fixed per-class TTLs
//! and no active invalidation: a visibility-changing write is reflected only
//! once the TTL expires. Expiry is evaluated lazily on read; there is no
//! eviction task. Racing misses for the same key may each compute and all
//! converge on overwriting the same value — correctness depends on eventual
//! consistency, not at-most-once computation.

use dashmap::DashMap;
use lazy_static::lazy_static;
use prometheus::{register_int_counter, IntCounter};
use std::future::Future;
use std::hash::Hash;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::error::Result;

lazy_static! {
    static ref CACHE_HIT: IntCounter = register_int_counter!(
        "feed_composer_cache_hit_total",
        "Total number of result cache hits"
    )
    .expect("Failed to register feed_composer_cache_hit_total");
    static ref CACHE_MISS: IntCounter = register_int_counter!(
        "feed_composer_cache_miss_total",
        "Total number of result cache misses"
    )
    .expect("Failed to register feed_composer_cache_miss_total");
}

#[derive(Debug, Clone)]
struct Entry<V> {
    value: V,
    expires_at: Instant,
}

impl<V> Entry<V> {
    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Concurrent memoization map with per-entry TTL.
pub struct TtlCache<K, V> {
    store: DashMap<K, Entry<V>>,
}

impl<K, V> Default for TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Return the live cached value, or run `compute` and memoize its result
    /// for `ttl`. A zero TTL bypasses the cache entirely.
    pub async fn get_or_compute<F, Fut>(&self, key: K, ttl: Duration, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(&key) {
            CACHE_HIT.inc();
            return Ok(value);
        }

        CACHE_MISS.inc();
        let value = compute().await?;

        if !ttl.is_zero() {
            self.insert(key, value.clone(), ttl);
        }
        Ok(value)
    }

    /// Live value for a key, evicting it when expired.
    pub fn get(&self, key: &K) -> Option<V> {
        match self.store.get(key) {
            Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
            Some(entry) => {
                drop(entry);
                self.store.remove(key);
                debug!("evicted expired cache entry");
                None
            }
            None => None,
        }
    }

    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        self.store.insert(
            key,
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}
