//! Bounded polling with cancellation support.
//!
//! Provider deletions are asynchronous, so the teardown waits for a resource
//! listing to drain before moving on. Reaching the timeout is a normal
//! outcome that callers branch on, never an error.

use anyhow::Result;
use std::future::Future;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Fixed-interval polling bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollConfig {
    /// Delay between two consecutive checks
    pub interval: Duration,
    /// Total time after which waiting gives up
    pub timeout: Duration,
}

impl PollConfig {
    pub fn new(interval: Duration, timeout: Duration) -> Self {
        Self { interval, timeout }
    }
}

/// Poll `lister` until it reports zero remaining items.
///
/// Returns `true` as soon as a check reports zero, `false` once `timeout`
/// has elapsed without that happening (or when cancelled). A failed check is
/// logged and counts as "not empty yet"; it never aborts the wait.
///
/// # Example
/// ```ignore
/// let drained = wait_until_empty(
///     PollConfig::new(Duration::from_secs(2), Duration::from_secs(60)),
///     Some(&cancel_token),
///     || async { Ok(provider.list_dependents(ResourceKind::Subnet, "vpc-1").await?.len()) },
///     "subnets of vpc-1",
/// )
/// .await;
/// ```
pub async fn wait_until_empty<F, Fut>(
    config: PollConfig,
    cancel: Option<&CancellationToken>,
    lister: F,
    resource_name: &str,
) -> bool
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<usize>>,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    loop {
        attempts += 1;

        if cancel.is_some_and(CancellationToken::is_cancelled) {
            debug!(resource = %resource_name, attempts, "Wait cancelled");
            return false;
        }

        match lister().await {
            Ok(0) => {
                debug!(resource = %resource_name, attempts, "Nothing left");
                return true;
            }
            Ok(remaining) => {
                debug!(resource = %resource_name, attempt = attempts, remaining, "Still waiting");
            }
            Err(e) => {
                warn!(resource = %resource_name, attempt = attempts, error = ?e, "Check failed, will retry");
            }
        }

        let elapsed = start.elapsed();
        if elapsed >= config.timeout {
            warn!(
                resource = %resource_name,
                timeout = ?config.timeout,
                attempts,
                "Gave up waiting"
            );
            return false;
        }

        // Never sleep past the deadline: the last check lands on it exactly
        let delay = config.interval.min(config.timeout - elapsed);
        if !sleep_or_cancel(delay, cancel).await {
            debug!(resource = %resource_name, attempts, "Wait cancelled");
            return false;
        }
    }
}

/// Sleep for `duration` unless cancelled first.
///
/// Returns `true` if the full duration elapsed, `false` if cancelled.
pub async fn sleep_or_cancel(duration: Duration, cancel: Option<&CancellationToken>) -> bool {
    match cancel {
        Some(token) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => true,
                _ = token.cancelled() => false,
            }
        }
        None => {
            tokio::time::sleep(duration).await;
            true
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn poll(interval_secs: u64, timeout_secs: u64) -> PollConfig {
        PollConfig::new(
            Duration::from_secs(interval_secs),
            Duration::from_secs(timeout_secs),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_empty_on_first_check() {
        let start = Instant::now();
        let drained = wait_until_empty(poll(2, 10), None, || async { Ok(0) }, "test").await;

        assert!(drained);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_within_one_interval_of_draining() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let start = Instant::now();

        let drained = wait_until_empty(
            poll(2, 60),
            None,
            || {
                let c = counter_clone.clone();
                async move {
                    let count = c.fetch_add(1, Ordering::SeqCst);
                    // 3, 2, 1, then empty on the 4th check
                    Ok(3usize.saturating_sub(count as usize))
                }
            },
            "test",
        )
        .await;

        assert!(drained);
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert_eq!(start.elapsed(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_a_normal_outcome() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();
        let start = Instant::now();

        let drained = wait_until_empty(
            poll(2, 10),
            None,
            || {
                let c = counter_clone.clone();
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok(3)
                }
            },
            "test",
        )
        .await;

        let elapsed = start.elapsed();
        assert!(!drained);
        assert!(elapsed >= Duration::from_secs(10), "elapsed {elapsed:?}");
        assert!(elapsed <= Duration::from_secs(12), "elapsed {elapsed:?}");
        assert!(counter.load(Ordering::SeqCst) >= 5);
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_check_lands_on_deadline() {
        let start = Instant::now();
        let drained = wait_until_empty(poll(3, 10), None, || async { Ok(1) }, "test").await;

        assert!(!drained);
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_check_errors_do_not_abort() {
        let counter = Arc::new(AtomicU32::new(0));
        let counter_clone = counter.clone();

        let drained = wait_until_empty(
            poll(1, 30),
            None,
            || {
                let c = counter_clone.clone();
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) < 2 {
                        anyhow::bail!("list failed");
                    }
                    Ok(0)
                }
            },
            "test",
        )
        .await;

        assert!(drained);
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancellation_stops_waiting() {
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            cancel_clone.cancel();
        });

        let start = Instant::now();
        let drained = wait_until_empty(poll(2, 60), Some(&cancel), || async { Ok(1) }, "test").await;

        assert!(!drained);
        assert!(start.elapsed() < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_sleep_or_cancel() {
        assert!(sleep_or_cancel(Duration::from_secs(1), None).await);

        let cancel = CancellationToken::new();
        cancel.cancel();
        assert!(!sleep_or_cancel(Duration::from_secs(1), Some(&cancel)).await);
    }
}
