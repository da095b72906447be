use crate::domain::error::IqmsError;
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Attempt ceiling and base delay for retried requests
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, retry_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            retry_delay,
        }
    }

    /// Wait before the attempt following `attempt` (1-based): `retry_delay * 2^(attempt-1)`
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        self.retry_delay.saturating_mul(1 << exponent)
    }
}

/// Race a future against cancellation
pub async fn cancellable<T, F>(cancel: &CancellationToken, fut: F) -> Result<T, IqmsError>
where
    F: Future<Output = Result<T, IqmsError>>,
{
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(IqmsError::Cancelled),
        result = fut => result,
    }
}

/// Run `op` until it succeeds, the attempts run out, or `cancel` fires
///
/// Cancellation is never retried and interrupts the backoff sleep as well as the
/// request in flight. Only the last failure is returned.
pub async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    cancel: &CancellationToken,
    label: &str,
    mut op: F,
) -> Result<T, IqmsError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, IqmsError>>,
{
    let mut attempt = 1;
    loop {
        let err = match cancellable(cancel, op()).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_cancelled() => return Err(e),
            Err(e) => e,
        };

        if attempt >= policy.max_attempts {
            warn!("{} failed after {} attempts: {}", label, attempt, err);
            return Err(err);
        }

        let delay = policy.delay_after(attempt);
        debug!(
            "{} attempt {}/{} failed: {}; retrying in {:?}",
            label, attempt, policy.max_attempts, err, delay
        );

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(IqmsError::Cancelled),
            _ = tokio::time::sleep(delay) => {}
        }
        attempt += 1;
    }
}
