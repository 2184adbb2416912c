//! End-to-end exercise of retry + circuit breaker working together, the way
//! a source adapter's `fetch` composes them.

use std::time::Duration;

use pulsearc_common::resilience::{CircuitBreaker, CircuitBreakerConfig, CircuitState, MockClock};
use pulsearc_common::{with_retry, RetryConfig, RetryError};
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
#[error("upstream unavailable")]
struct UpstreamError;

#[tokio::test]
async fn retry_then_circuit_breaker_trips_after_repeated_failures() {
    let clock = MockClock::new();
    let breaker = CircuitBreaker::with_clock(
        CircuitBreakerConfig { failure_threshold: 2, ..Default::default() },
        clock.clone(),
    );
    let cancel = CancellationToken::new();
    let retry_cfg = RetryConfig {
        max_retries: 0,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(1),
        multiplier: 1.0,
    };

    for _ in 0..2 {
        let result = breaker
            .execute(
                || async {
                    with_retry(&cancel, &retry_cfg, |_: &UpstreamError| true, || async {
                        Err::<(), _>(UpstreamError)
                    })
                    .await
                    .map_err(|_| UpstreamError)
                },
                |_| true,
            )
            .await;
        assert!(result.is_err());
    }

    assert_eq!(breaker.state(), CircuitState::Open);

    // Further calls are rejected without invoking the operation at all.
    let mut invoked = false;
    let _ = breaker
        .execute(
            || {
                invoked = true;
                async { Ok::<_, UpstreamError>(()) }
            },
            |_| true,
        )
        .await;
    assert!(!invoked);
}

#[tokio::test]
async fn retry_respects_cancellation_mid_backoff() {
    let cancel = CancellationToken::new();
    let cfg = RetryConfig {
        max_retries: 5,
        base_delay: Duration::from_secs(30),
        max_delay: Duration::from_secs(30),
        multiplier: 1.0,
    };
    let cancel_clone = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel_clone.cancel();
    });

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        with_retry(&cancel, &cfg, |_: &UpstreamError| true, || async {
            Err::<(), _>(UpstreamError)
        }),
    )
    .await
    .expect("with_retry should return promptly once cancelled, not hang on the 30s backoff");

    assert!(matches!(result, Err(RetryError::Cancelled)));
}
