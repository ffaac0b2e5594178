//! Snapshot cache with explicit TTL and an injectable clock
//!
//! Values read from the chain are point-in-time snapshots. The cache only
//! shortens repeated reads inside the TTL window; callers that need a fresh
//! value pass `force_refresh`.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::RwLock;

/// Source of "now" for cache expiry
pub trait Clock: Send + Sync {
    fn now_millis(&self) -> u64;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Manually advanced clock for tests
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: AtomicU64,
}

impl ManualClock {
    pub fn new(start_millis: u64) -> Self {
        Self {
            millis: AtomicU64::new(start_millis),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.millis
            .fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> u64 {
        self.millis.load(Ordering::SeqCst)
    }
}

struct Entry<V> {
    value: V,
    stored_at: u64,
}

/// Keyed cache of snapshot values with a fixed time-to-live.
///
/// A TTL of zero disables caching entirely.
pub struct SnapshotCache<K, V> {
    ttl: Duration,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<K, Entry<V>>>,
}

impl<K, V> SnapshotCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new(ttl: Duration) -> Self {
        Self::with_clock(ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(ttl: Duration, clock: Arc<dyn Clock>) -> Self {
        Self {
            ttl,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Cache that never stores anything
    pub fn disabled() -> Self {
        Self::new(Duration::ZERO)
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn is_enabled(&self) -> bool {
        !self.ttl.is_zero()
    }

    /// Fresh value for `key`, if one is stored and not expired
    pub async fn get(&self, key: &K) -> Option<V> {
        if !self.is_enabled() {
            return None;
        }
        let now = self.clock.now_millis();
        let entries = self.entries.read().await;
        entries.get(key).and_then(|entry| {
            let age = now.saturating_sub(entry.stored_at);
            (age < self.ttl.as_millis() as u64).then(|| entry.value.clone())
        })
    }

    /// Store `value` under `key`. Expired entries are dropped on the way in,
    /// so the map never holds more than one TTL window of keys.
    pub async fn insert(&self, key: K, value: V) {
        if !self.is_enabled() {
            return;
        }
        let stored_at = self.clock.now_millis();
        let ttl_ms = self.ttl.as_millis() as u64;
        let mut entries = self.entries.write().await;
        entries.retain(|_, entry| stored_at.saturating_sub(entry.stored_at) < ttl_ms);
        entries.insert(key, Entry { value, stored_at });
    }

    pub async fn invalidate(&self, key: &K) {
        self.entries.write().await.remove(key);
    }

    /// Return the cached value, or run `fetch` and cache a `Some` result.
    ///
    /// `force_refresh` skips the lookup but still stores the new value.
    pub async fn get_or_fetch<E, F, Fut>(
        &self,
        key: K,
        force_refresh: bool,
        fetch: F,
    ) -> Result<Option<V>, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<V>, E>>,
    {
        if !force_refresh {
            if let Some(hit) = self.get(&key).await {
                return Ok(Some(hit));
            }
        }

        let fetched = fetch().await?;
        match &fetched {
            Some(value) => self.insert(key, value.clone()).await,
            // Absence is never cached: a pool may gain liquidity at any block
            None => self.invalidate(&key).await,
        }
        Ok(fetched)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cache_with_clock(ttl_ms: u64) -> (SnapshotCache<&'static str, u32>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(1_000));
        let cache = SnapshotCache::with_clock(Duration::from_millis(ttl_ms), clock.clone());
        (cache, clock)
    }

    #[tokio::test]
    async fn test_hit_within_ttl() {
        let (cache, clock) = cache_with_clock(500);
        cache.insert("a", 1).await;
        clock.advance(Duration::from_millis(499));
        assert_eq!(cache.get(&"a").await, Some(1));
    }

    #[tokio::test]
    async fn test_expires_after_ttl() {
        let (cache, clock) = cache_with_clock(500);
        cache.insert("a", 1).await;
        clock.advance(Duration::from_millis(500));
        assert_eq!(cache.get(&"a").await, None);
    }

    #[tokio::test]
    async fn test_expired_entries_evicted_on_insert() {
        let (cache, clock) = cache_with_clock(500);
        cache.insert("a", 1).await;
        cache.insert("b", 2).await;
        clock.advance(Duration::from_millis(300));
        cache.insert("c", 3).await;
        clock.advance(Duration::from_millis(200));
        cache.insert("d", 4).await;

        let entries = cache.entries.read().await;
        let mut keys: Vec<_> = entries.keys().copied().collect();
        keys.sort();
        assert_eq!(keys, vec!["c", "d"]);
    }

    #[tokio::test]
    async fn test_disabled_cache_never_hits() {
        let cache: SnapshotCache<&str, u32> = SnapshotCache::disabled();
        cache.insert("a", 1).await;
        assert_eq!(cache.get(&"a").await, None);
    }

    #[tokio::test]
    async fn test_get_or_fetch_and_force_refresh() {
        let (cache, _clock) = cache_with_clock(10_000);

        let first: Result<Option<u32>, ()> = cache.get_or_fetch("k", false, || async { Ok(Some(7)) }).await;
        assert_eq!(first.unwrap(), Some(7));

        // Served from cache, fetch is not consulted
        let cached: Result<Option<u32>, ()> = cache.get_or_fetch("k", false, || async { Ok(Some(99)) }).await;
        assert_eq!(cached.unwrap(), Some(7));

        let refreshed: Result<Option<u32>, ()> = cache.get_or_fetch("k", true, || async { Ok(Some(8)) }).await;
        assert_eq!(refreshed.unwrap(), Some(8));
        assert_eq!(cache.get(&"k").await, Some(8));
    }

    #[tokio::test]
    async fn test_absence_evicts() {
        let (cache, _clock) = cache_with_clock(10_000);
        cache.insert("k", 3).await;
        let gone: Result<Option<u32>, ()> = cache.get_or_fetch("k", true, || async { Ok(None) }).await;
        assert_eq!(gone.unwrap(), None);
        assert_eq!(cache.get(&"k").await, None);
    }
}
