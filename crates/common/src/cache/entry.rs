use std::time::Instant;

/// A cached value plus the three timestamps that define its freshness
/// window. Invariant: `cached_at <= fresh_until <= expires_at`.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    pub value: V,
    pub cached_at: Instant,
    pub fresh_until: Instant,
    pub expires_at: Instant,
}

impl<V> CacheEntry<V> {
    pub fn is_stale(&self, now: Instant) -> bool {
        now >= self.fresh_until && now < self.expires_at
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

pub(super) struct Slot<V> {
    pub entry: CacheEntry<V>,
    pub revalidating: bool,
}

/// Outcome of a [`super::Cache::get`] lookup.
#[derive(Debug)]
pub enum CacheLookup<V> {
    Miss,
    Hit {
        value: V,
        stale: bool,
        /// `true` exactly once per stale period: the caller that sees this
        /// is responsible for kicking off the background revalidation.
        should_revalidate: bool,
        age: std::time::Duration,
        expires_in: std::time::Duration,
    },
}
