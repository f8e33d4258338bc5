//! Executes store calls under a [`RetryPolicy`].

use std::future::Future;

use tablemap_core::retry::RetryPolicy;
use tablemap_core::store::StoreResult;
use tablemap_core::{Result, TableError};

/// Runs `operation` until it succeeds, fails non-transiently, or the policy
/// gives up.
///
/// Non-transient failures are returned as [`TableError::Storage`] unchanged.
/// A transient failure the policy refuses to retry becomes
/// [`TableError::RetriesExhausted`].
pub async fn run_with_retry<T, F, Fut>(
    policy: &dyn RetryPolicy,
    operation_name: &str,
    mut operation: F,
) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = StoreResult<T>>,
{
    let mut attempt: u32 = 1;

    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if !err.is_transient() {
            return Err(TableError::Storage(err));
        }

        match policy.next_delay(attempt, &err) {
            Some(delay) => {
                tracing::debug!(
                    operation = operation_name,
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    error = %err,
                    "Retrying transient failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            None => {
                tracing::warn!(
                    operation = operation_name,
                    attempts = attempt,
                    error = %err,
                    "Giving up after transient failures"
                );
                return Err(TableError::RetriesExhausted {
                    attempts: attempt,
                    message: err.to_string(),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;
    use tablemap_core::retry::{ExponentialRetry, NoRetry};
    use tablemap_core::StoreError;

    fn fast_policy(max_attempts: u32) -> ExponentialRetry {
        ExponentialRetry::new(max_attempts, Duration::from_millis(1), Duration::from_millis(4))
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result = run_with_retry(&fast_policy(4), "test", move || async move {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            if n < 3 {
                Err(StoreError::Transient("throttled".to_string()))
            } else {
                Ok(n)
            }
        })
        .await;

        assert_eq!(result, Ok(3));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_policy_reports_attempts() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<()> = run_with_retry(&fast_policy(3), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Transient("timeout".to_string()))
        })
        .await;

        assert_eq!(
            result,
            Err(TableError::RetriesExhausted {
                attempts: 3,
                message: "Transient storage failure: timeout".to_string(),
            })
        );
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_fatal_error_is_not_retried() {
        let counter = AtomicU32::new(0);
        let calls = &counter;

        let result: Result<()> = run_with_retry(&fast_policy(5), "test", move || async move {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(StoreError::Conflict("exists".to_string()))
        })
        .await;

        assert_eq!(
            result,
            Err(TableError::Storage(StoreError::Conflict("exists".to_string())))
        );
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_escalates_first_transient_failure() {
        let result: Result<()> = run_with_retry(&NoRetry, "test", || async {
            Err(StoreError::Transient("busy".to_string()))
        })
        .await;

        assert!(matches!(
            result,
            Err(TableError::RetriesExhausted { attempts: 1, .. })
        ));
    }
}
