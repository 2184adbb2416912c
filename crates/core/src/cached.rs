//! The read-through / stale-while-revalidate wrapper every registered
//! source is served through.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use pulsearc_common::cache::{Cache, CacheLookup};
use pulsearc_domain::config::{CacheSpec, CacheStrategy};
use pulsearc_domain::{Row, SourceError, WriteAction, WriteError};
use tokio_util::sync::CancellationToken;
use tracing::{error, instrument};

use crate::source::{Source, WritableSource};

const REVALIDATION_TIMEOUT: Duration = pulsearc_domain::constants::REVALIDATION_TIMEOUT;

/// Point-in-time snapshot of a cached source's freshness, for rendering
/// in a template or diagnostics view.
#[derive(Debug, Clone, Default)]
pub struct CacheInfo {
    pub cached: bool,
    pub stale: bool,
    pub refreshing: bool,
    pub age: Option<Duration>,
    pub expires_in: Option<Duration>,
}

/// Wraps any [`Source`] (and, via the blanket impl below, any
/// [`WritableSource`]) with a read-through cache honoring the source's
/// [`CacheSpec`].
///
/// One `CachedSource` exclusively owns a [`CancellationToken`] scope:
/// dropping or calling `close` cancels every in-flight background
/// revalidation spawned from it before the inner source is closed.
pub struct CachedSource<S> {
    inner: Arc<S>,
    cache: Arc<Cache<Vec<Row>>>,
    key: String,
    spec: CacheSpec,
    cancel: CancellationToken,
    info: Mutex<CacheInfo>,
}

impl<S> CachedSource<S>
where
    S: Source + 'static,
{
    /// Wraps `inner`, keyed in `cache` under `inner.name()`.
    pub fn new(inner: Arc<S>, cache: Arc<Cache<Vec<Row>>>, spec: CacheSpec) -> Self {
        let key = inner.name().to_string();
        Self { inner, cache, key, spec, cancel: CancellationToken::new(), info: Mutex::new(CacheInfo::default()) }
    }

    /// Latest cache freshness snapshot, as of the last `fetch` call.
    pub fn cache_info(&self) -> CacheInfo {
        self.info.lock().map(|g| g.clone()).unwrap_or_default()
    }

    async fn fetch_and_cache(&self, cancel: &CancellationToken) -> Result<Vec<Row>, SourceError> {
        let mut rows = self.inner.fetch(cancel).await?;
        if self.spec.max_rows > 0 && rows.len() > self.spec.max_rows {
            rows.truncate(self.spec.max_rows);
        }
        if self.spec.max_bytes > 0 {
            while pulsearc_domain::value::row_byte_size_all(&rows) > self.spec.max_bytes {
                if rows.pop().is_none() {
                    break;
                }
            }
        }
        if self.spec.is_enabled() {
            match self.spec.strategy {
                CacheStrategy::Simple => {
                    self.cache.set(self.key.clone(), rows.clone(), self.spec.ttl);
                }
                CacheStrategy::StaleWhileRevalidate => {
                    self.cache.set_with_stale(self.key.clone(), rows.clone(), self.spec.ttl / 2, self.spec.ttl);
                }
            }
        }
        Ok(rows)
    }

    fn spawn_revalidation(&self) {
        let inner = Arc::clone(&self.inner);
        let cache = Arc::clone(&self.cache);
        let key = self.key.clone();
        let spec = self.spec.clone();
        let child = self.cancel.child_token();
        tokio::spawn(async move {
            let result = tokio::time::timeout(REVALIDATION_TIMEOUT, async {
                let mut rows = inner.fetch(&child).await?;
                if spec.max_rows > 0 && rows.len() > spec.max_rows {
                    rows.truncate(spec.max_rows);
                }
                if spec.max_bytes > 0 {
                    while pulsearc_domain::value::row_byte_size_all(&rows) > spec.max_bytes {
                        if rows.pop().is_none() {
                            break;
                        }
                    }
                }
                Ok::<_, SourceError>(rows)
            })
            .await;
            match result {
                Ok(Ok(rows)) => match spec.strategy {
                    CacheStrategy::Simple => cache.set(key.clone(), rows, spec.ttl),
                    CacheStrategy::StaleWhileRevalidate => {
                        cache.set_with_stale(key.clone(), rows, spec.ttl / 2, spec.ttl);
                    }
                },
                Ok(Err(err)) if !child.is_cancelled() => {
                    error!(source = %key, error = %err, "background revalidation failed");
                }
                Err(_) if !child.is_cancelled() => {
                    error!(source = %key, "background revalidation timed out");
                }
                _ => {}
            }
            cache.finish_revalidation(&key);
        });
    }
}

#[async_trait]
impl<S> Source for CachedSource<S>
where
    S: Source + 'static,
{
    fn name(&self) -> &str {
        self.inner.name()
    }

    #[instrument(skip(self, cancel), fields(source = %self.key))]
    async fn fetch(&self, cancel: &CancellationToken) -> Result<Vec<Row>, SourceError> {
        if cancel.is_cancelled() {
            return Err(SourceError::Source {
                source: self.key.clone(),
                operation: "fetch".to_string(),
                wrapped: "cancelled".to_string(),
                retryable: false,
            });
        }

        if !self.spec.is_enabled() {
            return self.fetch_and_cache(cancel).await;
        }

        let swr = self.spec.strategy == CacheStrategy::StaleWhileRevalidate;
        let lookup = self.cache.get(&self.key, || swr);
        match lookup {
            CacheLookup::Hit { value, stale, should_revalidate, age, expires_in } => {
                if let Ok(mut info) = self.info.lock() {
                    *info = CacheInfo {
                        cached: true,
                        stale,
                        refreshing: should_revalidate,
                        age: Some(age),
                        expires_in: Some(expires_in),
                    };
                }
                if should_revalidate {
                    self.spawn_revalidation();
                }
                Ok(value)
            }
            CacheLookup::Miss => {
                if let Ok(mut info) = self.info.lock() {
                    *info = CacheInfo::default();
                }
                self.fetch_and_cache(cancel).await
            }
        }
    }

    async fn close(&self) -> Result<(), SourceError> {
        self.cancel.cancel();
        self.inner.close().await
    }
}

#[async_trait]
impl<S> WritableSource for CachedSource<S>
where
    S: WritableSource + 'static,
{
    async fn write_item(&self, cancel: &CancellationToken, action: WriteAction) -> Result<(), WriteError> {
        self.inner.write_item(cancel, action).await?;
        self.cache.invalidate(&self.key);
        Ok(())
    }

    fn is_readonly(&self) -> bool {
        self.inner.is_readonly()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use pulsearc_domain::row_from_pairs;
    use serde_json::json;

    use super::*;

    struct CountingSource {
        name: String,
        calls: AtomicUsize,
        value: std::sync::Mutex<&'static str>,
    }

    #[async_trait]
    impl Source for CountingSource {
        fn name(&self) -> &str {
            &self.name
        }

        async fn fetch(&self, _cancel: &CancellationToken) -> Result<Vec<Row>, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let value = *self.value.lock().unwrap();
            Ok(vec![row_from_pairs([("v", json!(value))])])
        }

        async fn close(&self) -> Result<(), SourceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn simple_ttl_serves_from_cache_within_window() {
        let inner = Arc::new(CountingSource {
            name: "s".into(),
            calls: AtomicUsize::new(0),
            value: std::sync::Mutex::new("A"),
        });
        let cache = Arc::new(Cache::new());
        let spec = CacheSpec { ttl: Duration::from_secs(10), strategy: CacheStrategy::Simple, max_rows: 0, max_bytes: 0 };
        let cached = CachedSource::new(inner.clone(), cache, spec);
        let cancel = CancellationToken::new();

        cached.fetch(&cancel).await.unwrap();
        cached.fetch(&cancel).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn disabled_cache_fetches_every_time() {
        let inner = Arc::new(CountingSource {
            name: "s".into(),
            calls: AtomicUsize::new(0),
            value: std::sync::Mutex::new("A"),
        });
        let cache = Arc::new(Cache::new());
        let cached = CachedSource::new(inner.clone(), cache, CacheSpec::default());
        let cancel = CancellationToken::new();

        cached.fetch(&cancel).await.unwrap();
        cached.fetch(&cancel).await.unwrap();
        assert_eq!(inner.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn cancelled_token_short_circuits_before_touching_cache_or_inner() {
        let inner = Arc::new(CountingSource {
            name: "s".into(),
            calls: AtomicUsize::new(0),
            value: std::sync::Mutex::new("A"),
        });
        let cache = Arc::new(Cache::new());
        let cached = CachedSource::new(inner.clone(), cache, CacheSpec::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = cached.fetch(&cancel).await;
        assert!(result.is_err());
        assert_eq!(inner.calls.load(Ordering::SeqCst), 0);
    }
}
