//! Utility functions shared by the producer and the detector.

use std::time::Duration;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::error::{HarnessError, HarnessResult};

/// Sleeps for the given duration unless the token is cancelled first.
pub async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> HarnessResult<()> {
    sleep_until_or_cancel(Instant::now() + duration, cancel).await
}

/// Sleeps until the given instant unless the token is cancelled first.
pub async fn sleep_until_or_cancel(
    deadline: Instant,
    cancel: &CancellationToken,
) -> HarnessResult<()> {
    if cancel.is_cancelled() {
        return Err(HarnessError::Cancelled);
    }
    if deadline <= Instant::now() {
        return Ok(());
    }

    tokio::select! {
        _ = cancel.cancelled() => Err(HarnessError::Cancelled),
        _ = tokio::time::sleep_until(deadline) => Ok(()),
    }
}

/// The instant at which the item at `index` is due when items start at `start` and follow each
/// other every `interval`.
pub fn scheduled_at(start: Instant, interval: Duration, index: u64) -> Instant {
    let slots = u32::try_from(index.saturating_sub(1)).unwrap_or(u32::MAX);
    start
        .checked_add(interval.saturating_mul(slots))
        .unwrap_or(start)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn items_follow_a_fixed_grid() {
        let start = Instant::now();
        let interval = Duration::from_secs(2);

        assert_eq!(scheduled_at(start, interval, 1), start);
        assert_eq!(scheduled_at(start, interval, 4), start + Duration::from_secs(6));
        assert_eq!(scheduled_at(start, Duration::ZERO, 4), start);
    }

    #[tokio::test(start_paused = true)]
    async fn past_deadline_returns_immediately() {
        let start = Instant::now();
        sleep_until_or_cancel(start, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(Instant::now(), start);
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_sleep() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = sleep_or_cancel(Duration::from_secs(1), &cancel)
            .await
            .unwrap_err();
        assert!(matches!(err, HarnessError::Cancelled));
    }
}
