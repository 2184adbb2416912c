//! Circuit breaker over a rolling failure-time window.
//!
//! Unlike a consecutive-failure counter, this breaker counts only the
//! failures that happened within the last `failure_window`: a burst of
//! failures that cools down naturally does not trip the breaker just
//! because it never saw an intervening success.

use std::collections::VecDeque;
use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use thiserror::Error;
use tracing::{debug, info, instrument, warn};

/// Abstraction over time so breaker timing can be tested deterministically.
pub trait Clock: Send + Sync + 'static {
    /// Monotonic instant, used for all interval math.
    fn now(&self) -> Instant;
    /// Wall-clock time, exposed for logging/observability only.
    fn system_time(&self) -> SystemTime;

    fn millis_since_epoch(&self) -> u64 {
        self.system_time().duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

impl<T: Clock> Clock for Arc<T> {
    fn now(&self) -> Instant {
        (**self).now()
    }

    fn system_time(&self) -> SystemTime {
        (**self).system_time()
    }
}

/// Deterministic clock for tests: time only moves when told to.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    pub fn new() -> Self {
        Self { start: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    pub fn advance(&self, duration: Duration) {
        if let Ok(mut elapsed) = self.elapsed.lock() {
            *elapsed += duration;
        }
    }

    pub fn advance_millis(&self, millis: u64) {
        self.advance(Duration::from_millis(millis));
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.lock().map(|e| *e).unwrap_or(Duration::ZERO)
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        let elapsed = self.elapsed.lock().map(|e| *e).unwrap_or(Duration::ZERO);
        self.start + elapsed
    }

    fn system_time(&self) -> SystemTime {
        let elapsed = self.elapsed.lock().map(|e| *e).unwrap_or(Duration::ZERO);
        SystemTime::UNIX_EPOCH + elapsed
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid circuit breaker configuration: {message}")]
    Invalid { message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced by [`CircuitBreaker::call`].
#[derive(Debug, Error)]
pub enum ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    #[error("circuit breaker is open")]
    CircuitOpen,

    #[error("operation failed")]
    OperationFailed {
        #[source]
        source: E,
    },
}

pub type ResilienceResult<T, E> = Result<T, ResilienceError<E>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half-open"),
        }
    }
}

/// Tunables for one breaker instance. See module docs for the state
/// machine these drive.
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failures inside `failure_window` needed to trip the breaker.
    pub failure_threshold: usize,
    /// Consecutive half-open successes needed to close the breaker.
    pub success_threshold: u64,
    /// How long the breaker stays open before probing again.
    pub timeout: Duration,
    /// Width of the rolling window failures are counted over.
    pub failure_window: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(30),
            failure_window: Duration::from_secs(60),
        }
    }
}

impl CircuitBreakerConfig {
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::default()
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if self.failure_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "failure_threshold must be greater than 0".into(),
            });
        }
        if self.success_threshold == 0 {
            return Err(ConfigError::Invalid {
                message: "success_threshold must be greater than 0".into(),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl CircuitBreakerConfigBuilder {
    pub fn failure_threshold(mut self, n: usize) -> Self {
        self.config.failure_threshold = n;
        self
    }

    pub fn success_threshold(mut self, n: u64) -> Self {
        self.config.success_threshold = n;
        self
    }

    pub fn timeout(mut self, d: Duration) -> Self {
        self.config.timeout = d;
        self
    }

    pub fn failure_window(mut self, d: Duration) -> Self {
        self.config.failure_window = d;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }

    /// Attach a custom clock, producing a builder that yields a
    /// `CircuitBreaker<C>` instead of the default `CircuitBreaker<SystemClock>`.
    pub fn clock<C: Clock>(self, clock: C) -> CircuitBreakerBuilderWithClock<C> {
        CircuitBreakerBuilderWithClock { config: self.config, clock }
    }
}

pub struct CircuitBreakerBuilderWithClock<C: Clock> {
    config: CircuitBreakerConfig,
    clock: C,
}

impl<C: Clock> CircuitBreakerBuilderWithClock<C> {
    pub fn build(self) -> ConfigResult<CircuitBreaker<C>> {
        self.config.validate()?;
        Ok(CircuitBreaker::with_clock(self.config, self.clock))
    }
}

/// Point-in-time snapshot of a breaker's counters, for dashboards/logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct CircuitBreakerMetrics {
    pub total_calls: u64,
    pub total_failures: u64,
    pub total_successes: u64,
    pub rejected_calls: u64,
    pub state_transitions: u64,
}

struct Inner {
    state: RwLock<CircuitState>,
    /// Timestamps (clock-relative instants) of retryable failures inside the
    /// current window. Pruned lazily on every read/write.
    failure_window: Mutex<VecDeque<Instant>>,
    half_open_successes: AtomicU64,
    state_change_time: RwLock<Instant>,
    total_calls: AtomicU64,
    total_failures: AtomicU64,
    total_successes: AtomicU64,
    rejected_calls: AtomicU64,
    state_transitions: AtomicU64,
}

/// A per-source circuit breaker guarding calls to a flaky dependency.
///
/// Closed: calls pass through; retryable failures accumulate in a rolling
/// window and trip the breaker at `failure_threshold`. Open: calls are
/// rejected with [`ResilienceError::CircuitOpen`] until `timeout` elapses,
/// at which point the breaker probes with a single half-open call.
/// Half-open: `success_threshold` consecutive successes close the breaker;
/// any failure reopens it.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    clock: C,
    inner: Arc<Inner>,
    name: String,
}

impl CircuitBreaker<SystemClock> {
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }

    pub fn named(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        let mut breaker = Self::new(config);
        breaker.name = name.into();
        breaker
    }
}

impl<C: Clock> CircuitBreaker<C> {
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> Self {
        let now = clock.now();
        Self {
            config,
            inner: Arc::new(Inner {
                state: RwLock::new(CircuitState::Closed),
                failure_window: Mutex::new(VecDeque::new()),
                half_open_successes: AtomicU64::new(0),
                state_change_time: RwLock::new(now),
                total_calls: AtomicU64::new(0),
                total_failures: AtomicU64::new(0),
                total_successes: AtomicU64::new(0),
                rejected_calls: AtomicU64::new(0),
                state_transitions: AtomicU64::new(0),
            }),
            clock,
            name: String::new(),
        }
    }

    /// Current state without side effects (does not perform the
    /// open-to-half-open timeout check `call`/`can_execute` perform).
    pub fn state(&self) -> CircuitState {
        self.read_state()
    }

    fn read_state(&self) -> CircuitState {
        match self.inner.state.read() {
            Ok(guard) => *guard,
            Err(poisoned) => {
                warn!(source = %self.name, "circuit breaker state lock poisoned, recovering");
                *poisoned.into_inner()
            }
        }
    }

    fn set_state(&self, new: CircuitState) {
        let now = self.clock.now();
        match self.inner.state.write() {
            Ok(mut guard) => *guard = new,
            Err(poisoned) => *poisoned.into_inner() = new,
        }
        match self.inner.state_change_time.write() {
            Ok(mut guard) => *guard = now,
            Err(poisoned) => *poisoned.into_inner() = now,
        }
        self.inner.state_transitions.fetch_add(1, Ordering::Relaxed);
        info!(source = %self.name, state = %new, "circuit breaker transitioned");
    }

    fn state_change_time(&self) -> Instant {
        match self.inner.state_change_time.read() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    /// Returns whether a call is currently admitted, performing the
    /// open-to-half-open transition as a side effect when the timeout has
    /// elapsed. This is the single gate every `call`/`execute` passes
    /// through, so the transition and the "is admitted" answer are always
    /// consistent.
    pub fn can_execute(&self) -> bool {
        match self.read_state() {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => true,
            CircuitState::Open => {
                if self.clock.now().duration_since(self.state_change_time()) >= self.config.timeout
                {
                    debug!(source = %self.name, "open timeout elapsed, probing half-open");
                    self.set_state(CircuitState::HalfOpen);
                    true
                } else {
                    false
                }
            }
        }
    }

    fn prune_window(&self, now: Instant) -> usize {
        let mut window = match self.inner.failure_window.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        while let Some(&oldest) = window.front() {
            if now.duration_since(oldest) > self.config.failure_window {
                window.pop_front();
            } else {
                break;
            }
        }
        window.len()
    }

    fn record_success(&self) {
        self.inner.total_successes.fetch_add(1, Ordering::Relaxed);
        match self.read_state() {
            CircuitState::Closed => {
                if let Ok(mut window) = self.inner.failure_window.lock() {
                    window.clear();
                }
            }
            CircuitState::HalfOpen => {
                let successes = self.inner.half_open_successes.fetch_add(1, Ordering::SeqCst) + 1;
                if successes >= self.config.success_threshold {
                    self.inner.half_open_successes.store(0, Ordering::SeqCst);
                    self.set_state(CircuitState::Closed);
                }
            }
            CircuitState::Open => {}
        }
    }

    fn record_failure(&self, retryable: bool) {
        self.inner.total_failures.fetch_add(1, Ordering::Relaxed);
        if !retryable {
            return;
        }
        match self.read_state() {
            CircuitState::Closed => {
                let now = self.clock.now();
                let len = {
                    let mut window = match self.inner.failure_window.lock() {
                        Ok(guard) => guard,
                        Err(poisoned) => poisoned.into_inner(),
                    };
                    window.push_back(now);
                    drop(window);
                    self.prune_window(now)
                };
                if len >= self.config.failure_threshold {
                    self.set_state(CircuitState::Open);
                }
            }
            CircuitState::HalfOpen => {
                self.inner.half_open_successes.store(0, Ordering::SeqCst);
                self.set_state(CircuitState::Open);
            }
            CircuitState::Open => {}
        }
    }

    pub fn metrics(&self) -> CircuitBreakerMetrics {
        CircuitBreakerMetrics {
            total_calls: self.inner.total_calls.load(Ordering::Relaxed),
            total_failures: self.inner.total_failures.load(Ordering::Relaxed),
            total_successes: self.inner.total_successes.load(Ordering::Relaxed),
            rejected_calls: self.inner.rejected_calls.load(Ordering::Relaxed),
            state_transitions: self.inner.state_transitions.load(Ordering::Relaxed),
        }
    }

    pub fn reset(&self) {
        if let Ok(mut window) = self.inner.failure_window.lock() {
            window.clear();
        }
        self.inner.half_open_successes.store(0, Ordering::SeqCst);
        self.set_state(CircuitState::Closed);
    }

    /// Run an async operation through the breaker. `is_retryable` classifies
    /// the operation's error type so that only retryable failures count
    /// toward tripping the breaker (see module docs).
    #[instrument(skip(self, operation, is_retryable), fields(source = %self.name, state = %self.state()))]
    pub async fn execute<F, Fut, T, E>(
        &self,
        operation: F,
        is_retryable: impl Fn(&E) -> bool,
    ) -> ResilienceResult<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        self.inner.total_calls.fetch_add(1, Ordering::Relaxed);
        if !self.can_execute() {
            self.inner.rejected_calls.fetch_add(1, Ordering::Relaxed);
            return Err(ResilienceError::CircuitOpen);
        }
        match operation().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(err) => {
                self.record_failure(is_retryable(&err));
                Err(ResilienceError::OperationFailed { source: err })
            }
        }
    }
}

impl<C: Clock> Clone for CircuitBreaker<C>
where
    C: Clone,
{
    fn clone(&self) -> Self {
        Self { config: self.config.clone(), clock: self.clock.clone(), inner: self.inner.clone(), name: self.name.clone() }
    }
}
