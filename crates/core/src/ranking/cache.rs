use crate::domain::market::CapBucket;
use crate::domain::recommendation::Recommendation;
use crate::time::Clock;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TtlPolicy {
    pub all: Duration,
    pub cap: Duration,
}

impl Default for TtlPolicy {
    fn default() -> Self {
        Self {
            all: Duration::from_secs(900),
            cap: Duration::from_secs(300),
        }
    }
}

impl TtlPolicy {
    /// The "all" universe is large, so it gets the longer window.
    pub fn ttl_for(&self, key: &str) -> Duration {
        if key == CapBucket::All.as_str() {
            self.all
        } else {
            self.cap
        }
    }
}

/// A ranked list and the instant it was produced. Replaced wholesale, never mutated.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub items: Arc<Vec<Recommendation>>,
    pub produced_at: DateTime<Utc>,
}

type Slot = Arc<tokio::sync::Mutex<Option<CacheEntry>>>;

/// Per-universe TTL cache. Each key has its own async lock, held across the
/// freshness check and any recompute, so concurrent misses on one key
/// trigger a single recompute.
pub struct RankingCache {
    clock: Arc<dyn Clock>,
    ttl: TtlPolicy,
    slots: Mutex<HashMap<String, Slot>>,
}

impl RankingCache {
    pub fn new(clock: Arc<dyn Clock>, ttl: TtlPolicy) -> Self {
        Self {
            clock,
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn slot(&self, key: &str) -> Slot {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        slots.entry(key.to_string()).or_default().clone()
    }

    fn is_fresh(&self, key: &str, entry: &CacheEntry) -> bool {
        let age = self.clock.now() - entry.produced_at;
        match chrono::Duration::from_std(self.ttl.ttl_for(key)) {
            Ok(ttl) => age < ttl,
            Err(_) => true,
        }
    }

    /// Fresh entry for `key`, if any.
    pub async fn get(&self, key: &str) -> Option<CacheEntry> {
        let slot = self.slot(key);
        let guard = slot.lock().await;
        guard
            .as_ref()
            .filter(|entry| self.is_fresh(key, entry))
            .cloned()
    }

    /// Returns the fresh entry for `key` or runs `compute` and stores its result.
    /// The boolean is `true` on a cache hit.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> (CacheEntry, bool)
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Vec<Recommendation>>,
    {
        let slot = self.slot(key);
        let mut guard = slot.lock().await;

        if let Some(entry) = guard.as_ref() {
            if self.is_fresh(key, entry) {
                return (entry.clone(), true);
            }
        }

        let items = compute().await;
        let entry = CacheEntry {
            items: Arc::new(items),
            produced_at: self.clock.now(),
        };
        *guard = Some(entry.clone());
        (entry, false)
    }

    pub async fn invalidate(&self, key: &str) {
        let slot = self.slot(key);
        *slot.lock().await = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualClock;
    use chrono::TimeZone;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (Arc<ManualClock>, RankingCache) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 2, 2, 4, 0, 0).unwrap(),
        ));
        let cache = RankingCache::new(clock.clone(), TtlPolicy::default());
        (clock, cache)
    }

    #[tokio::test]
    async fn fresh_entry_is_returned_verbatim() {
        let (clock, cache) = setup();
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let compute = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Vec::<Recommendation>::new()
        };

        let (first, hit) = cache.get_or_compute("small", compute).await;
        assert!(!hit);

        clock.advance(chrono::Duration::seconds(299));
        let (second, hit) = cache.get_or_compute("small", compute).await;
        assert!(hit);
        assert!(Arc::ptr_eq(&first.items, &second.items));
        assert_eq!(first.produced_at, second.produced_at);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ttl_depends_on_key() {
        let (clock, cache) = setup();
        let calls = AtomicUsize::new(0);
        let counter = &calls;
        let compute = move || async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Vec::<Recommendation>::new()
        };

        cache.get_or_compute("mid", compute).await;
        cache.get_or_compute("all", compute).await;
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        clock.advance(chrono::Duration::seconds(300));
        let (_, mid_hit) = cache.get_or_compute("mid", compute).await;
        let (_, all_hit) = cache.get_or_compute("all", compute).await;
        assert!(!mid_hit);
        assert!(all_hit);

        clock.advance(chrono::Duration::seconds(600));
        let (entry, all_hit) = cache.get_or_compute("all", compute).await;
        assert!(!all_hit);
        assert_eq!(entry.produced_at, clock.now());
        assert_eq!(calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn get_ignores_stale_entries_and_invalidate_clears() {
        let (clock, cache) = setup();
        let empty = || async { Vec::<Recommendation>::new() };

        assert!(cache.get("large").await.is_none());
        cache.get_or_compute("large", empty).await;
        assert!(cache.get("large").await.is_some());

        cache.invalidate("large").await;
        assert!(cache.get("large").await.is_none());

        cache.get_or_compute("large", empty).await;
        clock.advance(chrono::Duration::seconds(301));
        assert!(cache.get("large").await.is_none());
    }
}
