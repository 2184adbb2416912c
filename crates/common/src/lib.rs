//! Resilience, caching, and storage primitives shared by the source
//! adapters in `tinkerdown-core`.
//!
//! This crate has no knowledge of rows, sites, or markdown — it is the same
//! kind of library-quality, domain-agnostic layer a retry engine or circuit
//! breaker should be: generic over the caller's error type, testable via a
//! [`resilience::Clock`] seam, and usable outside this workspace unchanged.

#![forbid(unsafe_code)]
#![warn(rust_2018_idioms)]
#![warn(clippy::all, clippy::perf, clippy::complexity, clippy::suspicious)]

pub mod cache;
pub mod error;
pub mod resilience;
pub mod storage;
pub mod time;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use cache::{Cache, CacheEntry, CacheLookup};
pub use error::{ErrorClassification, ErrorSeverity};
pub use resilience::{
    with_retry, CircuitBreaker, CircuitBreakerConfig, Clock, MockClock, ResilienceError,
    RetryConfig, RetryError, SystemClock,
};
pub use storage::{SqlitePool, SqlitePoolConfig, StorageError};
pub use time::{parse_duration, DurationParseError};
