//! Timed waits that give way to shutdown.

use std::time::Duration;

use sunsink_domain::error::SunsinkError;
use tokio_util::sync::CancellationToken;

/// Sleep for `duration` unless `shutdown` fires first.
pub(crate) async fn pause(
    shutdown: &CancellationToken,
    duration: Duration,
) -> Result<(), SunsinkError> {
    tokio::select! {
        biased;
        () = shutdown.cancelled() => Err(SunsinkError::Cancelled),
        () = tokio::time::sleep(duration) => Ok(()),
    }
}

/// Drive `fut` to completion unless `shutdown` fires first.
pub(crate) async fn guarded<T>(
    shutdown: &CancellationToken,
    fut: impl Future<Output = T>,
) -> Result<T, SunsinkError> {
    tokio::select! {
        biased;
        () = shutdown.cancelled() => Err(SunsinkError::Cancelled),
        value = fut => Ok(value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn should_sleep_for_full_duration() {
        let token = CancellationToken::new();
        let start = tokio::time::Instant::now();

        pause(&token, Duration::from_secs(60)).await.unwrap();

        assert_eq!(start.elapsed(), Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn should_wake_early_when_cancelled() {
        let token = CancellationToken::new();
        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });
        let start = tokio::time::Instant::now();

        let result = pause(&token, Duration::from_secs(60)).await;

        assert!(matches!(result, Err(SunsinkError::Cancelled)));
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    #[tokio::test]
    async fn should_not_poll_future_once_cancelled() {
        let token = CancellationToken::new();
        token.cancel();

        let result = guarded(&token, async { 42 }).await;

        assert!(matches!(result, Err(SunsinkError::Cancelled)));
    }

    #[tokio::test]
    async fn should_return_future_output_when_not_cancelled() {
        let token = CancellationToken::new();
        assert_eq!(guarded(&token, async { 42 }).await.unwrap(), 42);
    }
}
