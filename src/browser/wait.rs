//! Polling waits and action retries.
//!
//! Two separate mechanisms live here:
//!
//! | Mechanism | Used for |
//! |-----------|----------|
//! | [`poll_until`] | Waiting for a condition (element exists, URL, script) |
//! | [`RetryPolicy`] | Re-attempting an action that failed (click, input) |
//!
//! Both treat recoverable errors (missing elements, destroyed execution
//! contexts, script failures) as "not yet" and give up on connection
//! errors immediately.

// ============================================================================
// Imports
// ============================================================================

use std::future::Future;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Default number of attempts for element actions.
pub const DEFAULT_RETRY_COUNT: u32 = 3;

/// Default pause between attempts.
pub const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

// ============================================================================
// poll_until
// ============================================================================

/// Polls `probe` every `interval` until it yields a value or `timeout`
/// elapses.
///
/// The probe returns `Ok(Some(value))` when satisfied and `Ok(None)` when
/// not yet. It always runs at least once.
///
/// # Errors
///
/// - [`Error::Timeout`] carrying `operation`, the limit and the elapsed time
/// - Any non-recoverable error returned by the probe, immediately
pub async fn poll_until<T, F, Fut>(
    operation: &str,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<Option<T>>>,
{
    let start = Instant::now();
    let mut attempts: u32 = 0;

    loop {
        attempts += 1;

        match probe().await {
            Ok(Some(value)) => {
                trace!(operation, attempts, "Wait satisfied");
                return Ok(value);
            }
            Ok(None) => {}
            Err(e) if e.is_connection_error() || !e.is_recoverable() => return Err(e),
            Err(e) => trace!(operation, error = %e, "Transient failure while polling"),
        }

        let elapsed = start.elapsed();
        if elapsed >= timeout {
            return Err(Error::timeout(
                operation,
                timeout.as_millis() as u64,
                elapsed.as_millis() as u64,
            ));
        }

        tokio::time::sleep(interval.min(timeout - elapsed)).await;
    }
}

/// Polls a boolean probe; see [`poll_until`].
///
/// # Errors
///
/// Same as [`poll_until`].
pub async fn poll_true<F, Fut>(
    operation: &str,
    timeout: Duration,
    interval: Duration,
    mut probe: F,
) -> Result<()>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<bool>>,
{
    poll_until(operation, timeout, interval, || {
        let fut = probe();
        async move { Ok(fut.await?.then_some(())) }
    })
    .await
}

// ============================================================================
// RetryPolicy
// ============================================================================

/// How many times, and how often, to re-attempt an action.
///
/// # Example
///
/// ```ignore
/// use std::time::Duration;
/// use cdp_driver::RetryPolicy;
///
/// let policy = RetryPolicy::new(5, Duration::from_millis(200));
/// driver.locate("#save").retry(policy).click().await?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, at least one is always made.
    pub count: u32,
    /// Pause between attempts.
    pub interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            count: DEFAULT_RETRY_COUNT,
            interval: DEFAULT_RETRY_INTERVAL,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy.
    #[inline]
    #[must_use]
    pub const fn new(count: u32, interval: Duration) -> Self {
        Self { count, interval }
    }

    /// A policy that makes a single attempt.
    #[inline]
    #[must_use]
    pub const fn once() -> Self {
        Self {
            count: 1,
            interval: Duration::ZERO,
        }
    }

    /// Upper bound on the time spent sleeping between attempts.
    #[inline]
    #[must_use]
    pub fn budget(&self) -> Duration {
        self.interval * self.count.saturating_sub(1)
    }

    /// Runs `action` until it succeeds, a non-recoverable error occurs, or
    /// the attempts are used up.
    ///
    /// # Errors
    ///
    /// Returns the last error once every attempt failed.
    pub async fn run<T, F, Fut>(&self, operation: &str, mut action: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let attempts = self.count.max(1);
        let mut attempt = 1;

        loop {
            match action().await {
                Ok(value) => return Ok(value),
                Err(e) if attempt >= attempts || e.is_connection_error() || !e.is_recoverable() => {
                    return Err(e);
                }
                Err(e) => {
                    trace!(operation, attempt, error = %e, "Retrying");
                    attempt += 1;
                    tokio::time::sleep(self.interval).await;
                }
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_poll_satisfied_after_some_attempts() {
        let calls = Arc::new(AtomicU32::new(0));

        let value = poll_until("counter", Duration::from_secs(1), Duration::from_millis(5), || {
            let calls = Arc::clone(&calls);
            async move {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                Ok((n >= 3).then_some(n))
            }
        })
        .await
        .expect("satisfied");

        assert_eq!(value, 3);
    }

    #[tokio::test]
    async fn test_poll_timeout_carries_timing() {
        let start = Instant::now();
        let err = poll_true("never", Duration::from_millis(120), Duration::from_millis(20), || async {
            Ok(false)
        })
        .await
        .unwrap_err();

        let waited = start.elapsed();
        assert!(waited >= Duration::from_millis(120));
        assert!(waited < Duration::from_millis(1000));

        match err {
            Error::Timeout {
                operation,
                timeout_ms,
                elapsed_ms,
            } => {
                assert_eq!(operation, "never");
                assert_eq!(timeout_ms, 120);
                assert!(elapsed_ms >= 120);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_poll_runs_once_with_zero_timeout() {
        let value = poll_until("now", Duration::ZERO, Duration::from_millis(10), || async {
            Ok(Some("ok"))
        })
        .await
        .expect("value");
        assert_eq!(value, "ok");
    }

    #[tokio::test]
    async fn test_poll_treats_transient_errors_as_not_yet() {
        let calls = Arc::new(AtomicU32::new(0));

        poll_true("ctx", Duration::from_secs(1), Duration::from_millis(5), || {
            let calls = Arc::clone(&calls);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(Error::protocol(
                        "Runtime.evaluate",
                        -32000,
                        "Execution context was destroyed.",
                    ))
                } else {
                    Ok(true)
                }
            }
        })
        .await
        .expect("recovered");

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_poll_aborts_on_connection_error() {
        let calls = Arc::new(AtomicU32::new(0));

        let err = poll_true("closed", Duration::from_secs(5), Duration::from_millis(5), || {
            let calls = Arc::clone(&calls);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(Error::ConnectionClosed)
            }
        })
        .await
        .unwrap_err();

        assert!(matches!(err, Error::ConnectionClosed));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retry_policy_retries_then_succeeds() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(3, Duration::from_millis(5));

        let result = policy
            .run("click", || {
                let calls = Arc::clone(&calls);
                async move {
                    if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                        Err(Error::element_not_found("#late"))
                    } else {
                        Ok("clicked")
                    }
                }
            })
            .await
            .expect("succeeds on third attempt");

        assert_eq!(result, "clicked");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_policy_gives_up() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy::new(2, Duration::from_millis(1));

        let err = policy
            .run("click", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Error::element_not_found("#gone"))
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::ElementNotFound { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_retry_policy_stops_on_fatal_error() {
        let calls = Arc::new(AtomicU32::new(0));

        let err = RetryPolicy::new(5, Duration::from_millis(1))
            .run("nav", || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(Error::invalid_argument("bad"))
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::InvalidArgument { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_policy_budget() {
        assert_eq!(RetryPolicy::new(4, Duration::from_millis(100)).budget(), Duration::from_millis(300));
        assert_eq!(RetryPolicy::once().budget(), Duration::ZERO);
        assert_eq!(RetryPolicy::new(0, Duration::from_secs(1)).budget(), Duration::ZERO);
    }
}
