//! Bounded retry for optimistic-lock conflicts.

use gateway_types::LedgerError;

/// Runs `op` up to `max_attempts` times, retrying only on
/// [`LedgerError::OptimisticLock`]. Every other error, and the final
/// conflict, is returned to the caller.
pub async fn with_optimistic_retry<T, F, Fut>(
    max_attempts: u32,
    mut op: F,
) -> Result<T, LedgerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LedgerError>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match op().await {
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                tracing::debug!(attempt, "optimistic lock conflict, retrying");
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retries_conflicts_then_succeeds() {
        let calls = AtomicU32::new(0);
        let result = with_optimistic_retry(5, || async {
            if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(LedgerError::optimistic_lock("account", "a"))
            } else {
                Ok(42)
            }
        })
        .await;
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausts_attempts() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_optimistic_retry(3, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::optimistic_lock("account", "a"))
        })
        .await;
        assert!(matches!(result, Err(LedgerError::OptimisticLock { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_errors_pass_through() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = with_optimistic_retry(3, || async {
            calls.fetch_add(1, Ordering::SeqCst);
            Err(LedgerError::NotFound)
        })
        .await;
        assert!(matches!(result, Err(LedgerError::NotFound)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
