//! Bounded, cancellable retry wrapper.

use std::future::Future;

use backon::Retryable;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::{IndexerError, Result};

/// Runs `op` under a constant-interval backoff bounded by
/// [`RetryConfig::max_retries`].
///
/// Policy:
/// - Before every attempt the cancellation token is checked; once the token
///   is cancelled the wrapper resolves to `Ok(())` — shutdown in progress is
///   not a processing failure and must not surface as one.
/// - Only errors whose [`IndexerError::is_retryable`] is true are retried.
///   Terminal kinds (`BlobNotFound`, `InvalidTimestamp`, malformed data)
///   surface immediately instead of burning the retry budget.
/// - When the budget is exhausted the last error is returned.
pub async fn with_retry<F, Fut>(
    what: &'static str,
    cancel: &CancellationToken,
    policy: &RetryConfig,
    op: F,
) -> Result<()>
where
    F: Fn() -> Fut,
    Fut: Future<Output = Result<()>>,
{
    let op_ref = &op;
    let cancel_ref = cancel;

    let attempt = move || async move {
        if cancel_ref.is_cancelled() {
            return Err(IndexerError::Cancelled);
        }
        op_ref().await
    };

    let result = attempt
        .retry(policy.to_backoff_builder())
        .when(|err: &IndexerError| err.is_retryable())
        .notify(|err, delay| {
            warn!(error = %err, delay = ?delay, operation = what, "retrying after transient failure");
        })
        .await;

    match result {
        Err(IndexerError::Cancelled) => {
            debug!(operation = what, "shutdown in progress, abandoning operation");
            Ok(())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use alloy_primitives::B256;

    use super::*;

    fn fast_policy(max_retries: usize) -> RetryConfig {
        RetryConfig { max_retries, backoff_interval: Duration::from_millis(1) }
    }

    #[tokio::test]
    async fn retries_transient_failures_until_success() {
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);

        let result = with_retry("test op", &cancel, &fast_policy(5), || async {
            if attempts.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(IndexerError::Beacon("flaky".into()))
            } else {
                Ok(())
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn terminal_errors_short_circuit() {
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);

        let result = with_retry("test op", &cancel, &fast_policy(5), || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(IndexerError::BlobNotFound(B256::ZERO))
        })
        .await;

        assert!(matches!(result, Err(IndexerError::BlobNotFound(_))));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausted_budget_surfaces_the_last_error() {
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);

        let result = with_retry("test op", &cancel, &fast_policy(2), || async {
            attempts.fetch_add(1, Ordering::SeqCst);
            Err(IndexerError::Rpc("still down".into()))
        })
        .await;

        assert!(matches!(result, Err(IndexerError::Rpc(_))));
        // Initial attempt plus two retries.
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn cancellation_resolves_without_error() {
        let cancel = CancellationToken::new();
        let attempts = AtomicUsize::new(0);

        let result = with_retry("test op", &cancel, &fast_policy(10), || {
            // Cancel mid-retry: the first attempt fails, the second observes
            // the token and resolves cleanly.
            cancel.cancel();
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err(IndexerError::Rpc("interrupted".into()))
                } else {
                    panic!("operation must not run after cancellation");
                }
            }
        })
        .await;

        assert!(result.is_ok());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn already_cancelled_token_skips_the_operation() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = with_retry("test op", &cancel, &fast_policy(1), || async {
            unreachable!("operation must not run at all")
        })
        .await;

        assert!(result.is_ok());
    }
}
