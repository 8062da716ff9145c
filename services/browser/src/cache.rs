//! Expiring memo for listing results.
//!
//! Entries older than their TTL are never served; the next lookup refetches
//! and replaces them. A failed load stores nothing, so an outage does not
//! linger past the outage itself.
//!
//! Keys can come from request paths, so every insert first prunes entries
//! expired under the inserting call's TTL, and the map never holds more than
//! `max_entries` (the oldest entry goes first).
//!
//! There is no single-flight: two callers that miss on the same key at the
//! same time will both run the loader, and the later result wins. Listing
//! traffic here is a handful of calls per page view, so duplicate fetches
//! on a cold key are accepted instead of coordinating waiters.

use crate::gateway::Partition;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;
use tracing::trace;

/// Default staleness tolerated for listings
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Upper bound on stored listings
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

/// What a cached listing answers
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Partitions,
    SamplesOf(Partition),
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    fetched_at: Instant,
}

/// Cache of loader results keyed by `K`, with a per-call TTL
pub struct TtlCache<K, V> {
    entries: RwLock<HashMap<K, CacheEntry<V>>>,
    max_entries: usize,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self::with_max_entries(DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Return the cached value for `key` if younger than `ttl`, otherwise
    /// run `loader` and cache what it returns
    pub async fn get_or_load<F, Fut, E>(&self, key: K, ttl: Duration, loader: F) -> Result<V, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V, E>>,
    {
        if let Some(value) = self.get_fresh(&key, ttl) {
            metrics::counter!("browser_cache_hits_total").increment(1);
            return Ok(value);
        }

        metrics::counter!("browser_cache_misses_total").increment(1);

        let value = loader().await?;

        self.store(key, value.clone(), ttl);

        Ok(value)
    }

    fn store(&self, key: K, value: V, ttl: Duration) {
        let mut entries = self.entries.write();

        let before = entries.len();
        entries.retain(|_, entry| entry.fetched_at.elapsed() < ttl);
        if entries.len() < before {
            trace!(pruned = before - entries.len(), "Pruned expired cache entries");
        }

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.fetched_at)
                .map(|(k, _)| k.clone());
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
                metrics::counter!("browser_cache_evictions_total").increment(1);
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                fetched_at: Instant::now(),
            },
        );
    }

    fn get_fresh(&self, key: &K, ttl: Duration) -> Option<V> {
        let entries = self.entries.read();
        let entry = entries.get(key)?;

        if entry.fetched_at.elapsed() < ttl {
            Some(entry.value.clone())
        } else {
            trace!("Cache entry expired");
            None
        }
    }

    /// Drop one entry so the next lookup refetches
    pub fn invalidate(&self, key: &K) -> bool {
        self.entries.write().remove(key).is_some()
    }

    /// Drop every entry
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
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

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn load_counted(
        cache: &TtlCache<CacheKey, Vec<String>>,
        key: CacheKey,
        ttl: Duration,
        calls: &AtomicUsize,
    ) -> Result<Vec<String>, String> {
        cache
            .get_or_load(key, ttl, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(vec!["hindi".to_string()])
            })
            .await
    }

    #[tokio::test(start_paused = true)]
    async fn test_hit_within_ttl_and_reload_after() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);

        load_counted(&cache, CacheKey::Partitions, DEFAULT_TTL, &calls).await.unwrap();
        tokio::time::advance(Duration::from_secs(299)).await;
        load_counted(&cache, CacheKey::Partitions, DEFAULT_TTL, &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        tokio::time::advance(Duration::from_secs(1)).await;
        load_counted(&cache, CacheKey::Partitions, DEFAULT_TTL, &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_failed_load_is_not_cached() {
        let cache: TtlCache<CacheKey, Vec<String>> = TtlCache::new();
        let calls = AtomicUsize::new(0);

        let result: Result<Vec<String>, String> = cache
            .get_or_load(CacheKey::Partitions, DEFAULT_TTL, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err("store unavailable".to_string())
            })
            .await;
        assert!(result.is_err());
        assert!(cache.is_empty());

        let value = load_counted(&cache, CacheKey::Partitions, DEFAULT_TTL, &calls)
            .await
            .unwrap();
        assert_eq!(value, vec!["hindi".to_string()]);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_do_not_collide() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);

        load_counted(&cache, CacheKey::Partitions, DEFAULT_TTL, &calls).await.unwrap();
        load_counted(
            &cache,
            CacheKey::SamplesOf(Partition::from("partitions")),
            DEFAULT_TTL,
            &calls,
        )
        .await
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_per_call_ttl_and_invalidate() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);
        let short = Duration::from_secs(10);

        load_counted(&cache, CacheKey::Partitions, short, &calls).await.unwrap();
        tokio::time::advance(Duration::from_secs(10)).await;
        load_counted(&cache, CacheKey::Partitions, short, &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(cache.invalidate(&CacheKey::Partitions));
        load_counted(&cache, CacheKey::Partitions, DEFAULT_TTL, &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_expired_keys_are_pruned_on_insert() {
        let cache = TtlCache::new();
        let calls = AtomicUsize::new(0);
        let ttl = Duration::from_secs(1);

        for i in 0..10_000 {
            let key = CacheKey::SamplesOf(Partition::new(format!("lang-{}", i)));
            load_counted(&cache, key, ttl, &calls).await.unwrap();
            tokio::time::advance(Duration::from_secs(2)).await;
        }

        assert_eq!(calls.load(Ordering::SeqCst), 10_000);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fresh_keys_are_capped_oldest_first() {
        let cache = TtlCache::with_max_entries(3);
        let calls = AtomicUsize::new(0);

        for name in ["assamese", "bodo", "dogri", "gujarati"] {
            let key = CacheKey::SamplesOf(Partition::from(name));
            load_counted(&cache, key, DEFAULT_TTL, &calls).await.unwrap();
            tokio::time::advance(Duration::from_secs(1)).await;
        }
        assert_eq!(cache.len(), 3);

        // "assamese" was evicted; "gujarati" is still served from the cache.
        let gujarati = CacheKey::SamplesOf(Partition::from("gujarati"));
        load_counted(&cache, gujarati, DEFAULT_TTL, &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);

        let assamese = CacheKey::SamplesOf(Partition::from("assamese"));
        load_counted(&cache, assamese, DEFAULT_TTL, &calls).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 5);
        assert_eq!(cache.len(), 3);
    }
}
