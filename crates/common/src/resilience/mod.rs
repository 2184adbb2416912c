//! Fault-tolerance primitives shared by every source adapter: retry with
//! backoff ([`retry`]) and a rolling-window circuit breaker
//! ([`circuit_breaker`]).
//!
//! Both are generic over the operation's error type and a [`Clock`]
//! abstraction, so timing-sensitive behavior (backoff delays, breaker
//! state transitions) can be driven deterministically in tests via
//! [`MockClock`].

pub mod circuit_breaker;
pub mod retry;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitBreakerMetrics,
    CircuitState, Clock, ConfigError, ConfigResult, MockClock, ResilienceError, ResilienceResult,
    SystemClock,
};
pub use retry::{with_retry, RetryConfig, RetryConfigBuilder, RetryError, RetryResult};
