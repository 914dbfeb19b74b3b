//! Timeout enforcement.
//!
//! # Responsibilities
//! - Wrap each outbound attempt with a deadline
//! - Report an elapsed deadline as `FetchError::Timeout`, which is retryable
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the inner future is dropped on expiry
//! - Timeout errors are distinct from other network errors

use std::future::Future;
use std::time::Duration;
use tokio::time::timeout;

use crate::error::FetchError;

/// Run `fut` with a deadline.
pub async fn with_timeout<F, T>(duration: Duration, fut: F) -> Result<T, FetchError>
where
    F: Future<Output = Result<T, FetchError>>,
{
    match timeout(duration, fut).await {
        Ok(result) => result,
        Err(_) => Err(FetchError::Timeout(duration)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_timeout_elapsed() {
        let result: Result<(), _> = with_timeout(Duration::from_millis(50), async {
            tokio::time::sleep(Duration::from_secs(10)).await;
            Ok(())
        })
        .await;

        let err = result.unwrap_err();
        assert!(matches!(err, FetchError::Timeout(d) if d == Duration::from_millis(50)));
        assert!(err.is_retryable());
    }

    #[tokio::test(start_paused = true)]
    async fn test_inner_result_passes_through() {
        let ok = with_timeout(Duration::from_secs(1), async { Ok::<_, FetchError>(7) }).await;
        assert_eq!(ok.unwrap(), 7);

        let err = with_timeout(Duration::from_secs(1), async {
            Err::<(), _>(FetchError::status(404, "missing"))
        })
        .await;
        assert_eq!(err.unwrap_err().status_code(), Some(404));
    }
}
