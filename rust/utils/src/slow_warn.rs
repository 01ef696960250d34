use std::future::Future;
use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{Level, warn};

/// Awaits `future`, logging a warning once it has been pending for longer than
/// `threshold` and again when it finally completes. The result is returned
/// unchanged.
///
/// `describe` is only evaluated when the warning is actually emitted.
pub async fn warn_if_slow<F, T, D>(describe: D, threshold: Duration, future: F) -> T
where
    F: Future<Output = T>,
    D: FnOnce() -> String,
{
    if !tracing::enabled!(Level::WARN) {
        return future.await;
    }

    let started = Instant::now();
    tokio::pin!(future);

    tokio::select! {
        biased;
        result = &mut future => result,
        _ = sleep(threshold) => {
            let what = describe();
            warn!(threshold_secs = threshold.as_secs_f32(), "still waiting on {what}");
            let result = future.await;
            warn!(elapsed_secs = started.elapsed().as_secs_f32(), "slow operation finished: {what}");
            result
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fast_future_returns_value() {
        let value = warn_if_slow(
            || unreachable!("fast futures never describe themselves"),
            Duration::from_secs(30),
            async { 7 },
        )
        .await;
        assert_eq!(value, 7);
    }

    #[tokio::test(start_paused = true)]
    async fn slow_future_still_completes() {
        let value = warn_if_slow(
            || "GET /rest/v1/events".to_string(),
            Duration::from_millis(10),
            async {
                sleep(Duration::from_millis(50)).await;
                "done"
            },
        )
        .await;
        assert_eq!(value, "done");
    }
}
