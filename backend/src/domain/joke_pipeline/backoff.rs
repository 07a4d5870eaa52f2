//! Rate-limit backoff and steady-state pacing for name producers.
//!
//! Two delays govern a producer:
//! - pacing: a proactive pause after every successful fetch so the producers
//!   together stay under the upstream's aggregate per-minute quota;
//! - backoff: the upstream's `Retry-After` plus a fixed slop once the quota
//!   has been hit anyway.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::domain::Cancelled;
use crate::domain::cancellation::until_cancelled;

use super::{PipelineConfig, PipelineSleeper};

const MILLIS_PER_MINUTE: u64 = 60_000;

/// Delay policy derived from [`PipelineConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitBackoff {
    slop: Duration,
    pacing: Duration,
}

impl RateLimitBackoff {
    /// Build the policy for the configured producer count and budget.
    ///
    /// # Examples
    /// ```
    /// use std::time::Duration;
    /// use laff::domain::{PipelineConfig, RateLimitBackoff};
    ///
    /// let backoff = RateLimitBackoff::new(&PipelineConfig::uniform(3, 10));
    /// assert_eq!(backoff.pacing_interval(), Duration::from_secs(30));
    /// assert_eq!(
    ///     backoff.retry_delay(Duration::from_secs(2)),
    ///     Duration::from_secs(7)
    /// );
    /// ```
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            slop: config.rate_limit_slop,
            pacing: pacing_interval(config.requests_per_minute, config.producers),
        }
    }

    /// How long to wait after a rate-limit signal carrying `retry_after`.
    pub fn retry_delay(&self, retry_after: Duration) -> Duration {
        retry_after.saturating_add(self.slop)
    }

    /// Pause between successful fetches of one producer.
    pub fn pacing_interval(&self) -> Duration {
        self.pacing
    }
}

/// Spread `requests_per_minute` evenly across `producers`.
fn pacing_interval(requests_per_minute: u32, producers: usize) -> Duration {
    let producers = u64::try_from(producers.max(1)).unwrap_or(u64::MAX);
    let budget = u64::from(requests_per_minute.max(1));
    Duration::from_millis(MILLIS_PER_MINUTE.saturating_mul(producers) / budget)
}

/// Sleep for `duration` unless `cancel` fires first.
pub(super) async fn suspend(
    sleeper: &dyn PipelineSleeper,
    duration: Duration,
    cancel: &CancellationToken,
) -> Result<(), Cancelled> {
    until_cancelled(cancel, sleeper.sleep(duration)).await
}
