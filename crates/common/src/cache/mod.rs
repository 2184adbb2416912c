//! Keyed cache with TTL expiry and a stale-while-revalidate mode.
//!
//! This is the generic engine `CachedSource` (in the core crate) builds its
//! read-through behavior on top of. It knows nothing about rows, sources,
//! or HTTP — only about entries, freshness windows, and which caller gets
//! to revalidate a stale entry.
//!
//! ```
//! use std::time::Duration;
//!
//! use pulsearc_common::cache::Cache;
//!
//! # tokio_test::block_on(async {
//! let cache: Cache<Vec<i32>> = Cache::new();
//! cache.set("key".to_string(), vec![1, 2, 3], Duration::from_secs(30));
//! # });
//! ```

mod entry;

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{Duration, Instant};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::debug;

pub use entry::{CacheEntry, CacheLookup};
use entry::Slot;

use crate::resilience::{Clock, SystemClock};

/// Default interval the background sweeper wakes up on to drop expired
/// entries. The sweeper is advisory: an expired entry that survived a sweep
/// cycle is still treated as a miss by `get`.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(30);

pub struct Cache<V, C: Clock = SystemClock> {
    entries: RwLock<HashMap<String, Slot<V>>>,
    clock: C,
    sweeper: std::sync::Mutex<Option<JoinHandle<()>>>,
    sweep_cancel: CancellationToken,
}

impl<V> Default for Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Cache<V>
where
    V: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl<V, C> Cache<V, C>
where
    V: Clone + Send + Sync + 'static,
    C: Clock + Clone,
{
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            clock,
            sweeper: std::sync::Mutex::new(None),
            sweep_cancel: CancellationToken::new(),
        }
    }

    /// Spawn the background sweeper. Idempotent: calling it twice has no
    /// additional effect beyond replacing the handle.
    pub fn start_sweeper(self: &std::sync::Arc<Self>, interval: Duration)
    where
        V: 'static,
        C: 'static,
    {
        let cache = self.clone();
        let cancel = self.sweep_cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = tokio::time::sleep(interval) => {
                        cache.sweep();
                    }
                    _ = cancel.cancelled() => break,
                }
            }
        });
        if let Ok(mut guard) = self.sweeper.lock() {
            *guard = Some(handle);
        }
    }

    fn sweep(&self) {
        let now = self.clock.now();
        let mut entries = match self.entries.write() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        };
        let before = entries.len();
        entries.retain(|_, slot| !slot.entry.is_expired(now));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(removed, "cache sweep evicted expired entries");
        }
    }

    /// Look up `key`. `wants_revalidate` is consulted, under the same lock
    /// that decided `stale`, to decide whether *this* caller should become
    /// the one background-revalidating caller for a stale entry; it must
    /// not block or perform I/O.
    pub fn get(&self, key: &str, wants_revalidate: impl FnOnce() -> bool) -> CacheLookup<V> {
        let now = self.clock.now();
        let mut entries = match self.entries.write() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        };
        let Some(slot) = entries.get_mut(key) else {
            return CacheLookup::Miss;
        };
        if slot.entry.is_expired(now) {
            entries.remove(key);
            return CacheLookup::Miss;
        }
        let stale = slot.entry.is_stale(now);
        let should_revalidate = stale && !slot.revalidating && wants_revalidate();
        if should_revalidate {
            slot.revalidating = true;
        }
        CacheLookup::Hit {
            value: slot.entry.value.clone(),
            stale,
            should_revalidate,
            age: now.saturating_duration_since(slot.entry.cached_at),
            expires_in: slot.entry.expires_at.saturating_duration_since(now),
        }
    }

    /// Clear the in-flight revalidation flag for `key`, regardless of
    /// whether the revalidation succeeded. Safe to call on a key that was
    /// since invalidated or overwritten.
    pub fn finish_revalidation(&self, key: &str) {
        let mut entries = match self.entries.write() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        };
        if let Some(slot) = entries.get_mut(key) {
            slot.revalidating = false;
        }
    }

    /// Insert `value` with a single TTL: `fresh_until == expires_at`.
    pub fn set(&self, key: String, value: V, ttl: Duration) {
        self.set_with_stale(key, value, ttl, ttl);
    }

    /// Insert `value` with a separate fresh and stale-but-servable window.
    pub fn set_with_stale(&self, key: String, value: V, fresh_after: Duration, expires_after: Duration) {
        let now = self.clock.now();
        let entry = CacheEntry {
            value,
            cached_at: now,
            fresh_until: now + fresh_after,
            expires_at: now + expires_after.max(fresh_after),
        };
        let mut entries = match self.entries.write() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        };
        entries.insert(key, Slot { entry, revalidating: false });
    }

    pub fn invalidate(&self, key: &str) {
        let mut entries = match self.entries.write() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        };
        entries.remove(key);
    }

    pub fn invalidate_all(&self) {
        let mut entries = match self.entries.write() {
            Ok(g) => g,
            Err(p) => p.into_inner(),
        };
        entries.clear();
    }

    /// Stop the background sweeper. Further `get`/`set` calls still work;
    /// only the periodic eviction stops.
    pub fn stop(&self) {
        self.sweep_cancel.cancel();
        if let Ok(mut guard) = self.sweeper.lock() {
            if let Some(handle) = guard.take() {
                handle.abort();
            }
        }
    }
}

/// Default sweep cadence exposed for callers that want `start_sweeper`'s
/// default without naming the constant.
pub fn default_sweep_interval() -> Duration {
    DEFAULT_SWEEP_INTERVAL
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::resilience::MockClock;

    #[test]
    fn miss_on_empty_cache() {
        let cache: Cache<i32> = Cache::new();
        assert!(matches!(cache.get("k", || false), CacheLookup::Miss));
    }

    #[test]
    fn simple_ttl_hit_then_miss() {
        let clock = MockClock::new();
        let cache: Cache<i32, MockClock> = Cache::with_clock(clock.clone());
        cache.set("k".into(), 42, Duration::from_millis(100));

        match cache.get("k", || false) {
            CacheLookup::Hit { value, stale, .. } => {
                assert_eq!(value, 42);
                assert!(!stale);
            }
            CacheLookup::Miss => panic!("expected hit"),
        }

        clock.advance_millis(150);
        assert!(matches!(cache.get("k", || false), CacheLookup::Miss));
    }

    #[test]
    fn swr_serves_stale_and_marks_exactly_one_revalidation() {
        let clock = MockClock::new();
        let cache: Cache<i32, MockClock> = Cache::with_clock(clock.clone());
        cache.set_with_stale("k".into(), 1, Duration::from_millis(50), Duration::from_millis(200));

        clock.advance_millis(100); // stale, not expired
        let first = cache.get("k", || true);
        let second = cache.get("k", || true);

        let mut revalidate_flags = vec![];
        for lookup in [first, second] {
            match lookup {
                CacheLookup::Hit { stale, should_revalidate, .. } => {
                    assert!(stale);
                    revalidate_flags.push(should_revalidate);
                }
                CacheLookup::Miss => panic!("expected hit"),
            }
        }
        assert_eq!(revalidate_flags.iter().filter(|&&r| r).count(), 1);
    }

    #[test]
    fn finish_revalidation_allows_a_future_trigger() {
        let clock = MockClock::new();
        let cache: Cache<i32, MockClock> = Cache::with_clock(clock.clone());
        cache.set_with_stale("k".into(), 1, Duration::from_millis(10), Duration::from_millis(200));
        clock.advance_millis(20);

        match cache.get("k", || true) {
            CacheLookup::Hit { should_revalidate, .. } => assert!(should_revalidate),
            CacheLookup::Miss => panic!("expected hit"),
        }
        cache.finish_revalidation("k");
        // Still stale; revalidation flag was cleared so a new one can fire.
        match cache.get("k", || true) {
            CacheLookup::Hit { should_revalidate, .. } => assert!(should_revalidate),
            CacheLookup::Miss => panic!("expected hit"),
        }
    }

    #[test]
    fn invalidate_removes_entry() {
        let cache: Cache<i32> = Cache::new();
        cache.set("k".into(), 1, Duration::from_secs(10));
        cache.invalidate("k");
        assert!(matches!(cache.get("k", || false), CacheLookup::Miss));
    }

    #[tokio::test]
    async fn sweeper_evicts_expired_entries() {
        let cache = Arc::new(Cache::<i32>::new());
        cache.set("k".into(), 1, Duration::from_millis(10));
        cache.start_sweeper(Duration::from_millis(20));
        tokio::time::sleep(Duration::from_millis(80)).await;
        cache.stop();
        // Sweeper runs against the system clock; give it ample margin.
        let entries = cache.entries.read().unwrap();
        assert!(entries.is_empty() || entries.get("k").is_none());
    }
}
