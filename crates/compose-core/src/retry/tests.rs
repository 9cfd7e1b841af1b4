//! Tests for the complete retry execution flow

use std::io;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::retry::{ClosurePredicate, NeverRetry, RetryError, RetryExecutor, StatsObserver};
use crate::types::{RetryPolicy, RetryStrategy};

/// Create a test policy with short delays
fn quick_policy(max_attempts: u32) -> RetryPolicy {
    RetryPolicy {
        max_attempts,
        strategy: RetryStrategy::FixedDelay,
        backoff_multiplier: 2.0,
        initial_delay_ms: 1,
        max_delay_ms: 10,
    }
}

fn transient() -> io::Error {
    io::Error::new(io::ErrorKind::ConnectionReset, "connection reset")
}

#[tokio::test]
async fn test_immediate_success() {
    let observer = Arc::new(StatsObserver::new());

    let result: Result<&str, RetryError<io::Error>> = RetryExecutor::new(quick_policy(3))
        .with_observer(observer.clone())
        .execute(|| async { Ok("success") })
        .await;

    assert_eq!(result.unwrap(), "success");
    assert_eq!(observer.attempt_starts(), 1);
    assert_eq!(observer.successes(), 1);
    assert_eq!(observer.failures(), 0);
}

#[tokio::test]
async fn test_success_after_transient_failures() {
    let calls = Arc::new(AtomicU32::new(0));
    let observer = Arc::new(StatsObserver::new());

    let counter = calls.clone();
    let result = RetryExecutor::new(quick_policy(3))
        .with_observer(observer.clone())
        .execute(|| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(transient())
                } else {
                    Ok(42)
                }
            }
        })
        .await;

    assert_eq!(result.unwrap(), 42);
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(observer.failures(), 2);
    assert_eq!(observer.successes(), 1);
}

#[tokio::test]
async fn test_exhaustion_returns_last_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let observer = Arc::new(StatsObserver::new());

    let counter = calls.clone();
    let result: Result<(), _> = RetryExecutor::new(quick_policy(3))
        .with_observer(observer.clone())
        .execute(|| {
            let counter = counter.clone();
            async move {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                Err(io::Error::other(format!("failure {}", n)))
            }
        })
        .await;

    let err = result.unwrap_err();
    assert!(err.is_exhausted());
    assert_eq!(err.attempts(), 3);
    assert_eq!(err.into_source().to_string(), "failure 2");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(observer.exhaustions(), 1);
}

#[tokio::test]
async fn test_non_retryable_stops_immediately() {
    let calls = Arc::new(AtomicU32::new(0));
    let observer = Arc::new(StatsObserver::new());

    let counter = calls.clone();
    let result: Result<(), _> = RetryExecutor::new(quick_policy(5))
        .with_predicate(NeverRetry)
        .with_observer(observer.clone())
        .execute(|| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;

    assert!(result.unwrap_err().is_non_retryable());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(observer.cancellations(), 1);
}

#[tokio::test]
async fn test_predicate_distinguishes_errors() {
    let calls = Arc::new(AtomicU32::new(0));
    let predicate =
        ClosurePredicate::new(|e: &io::Error| e.kind() != io::ErrorKind::NotFound);

    let counter = calls.clone();
    let result: Result<(), _> = RetryExecutor::new(quick_policy(5))
        .with_predicate(predicate)
        .execute(|| {
            let counter = counter.clone();
            async move {
                if counter.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(transient())
                } else {
                    Err(io::Error::new(io::ErrorKind::NotFound, "gone"))
                }
            }
        })
        .await;

    assert!(result.unwrap_err().is_non_retryable());
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_zero_attempts_still_runs_once() {
    let calls = Arc::new(AtomicU32::new(0));

    let counter = calls.clone();
    let result: Result<(), _> = RetryExecutor::new(quick_policy(0))
        .with_jitter(false)
        .execute(|| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Err(transient()) }
        })
        .await;

    assert_eq!(result.unwrap_err().attempts(), 1);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}
