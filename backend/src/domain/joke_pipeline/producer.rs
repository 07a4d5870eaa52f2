//! Name producer loop.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::domain::Cancelled;
use crate::domain::cancellation::until_cancelled;
use crate::domain::ports::NameSource;

use super::backoff::suspend;
use super::{
    ErrorTally, ExitReason, JokeCache, PipelineSleeper, RateLimitBackoff, Stage, WorkerExit,
};

/// Keeps the name queue topped up at the paced rate.
pub(super) struct NameProducer {
    pub(super) slot: usize,
    pub(super) cache: Arc<JokeCache>,
    pub(super) source: Arc<dyn NameSource>,
    pub(super) sleeper: Arc<dyn PipelineSleeper>,
    pub(super) backoff: RateLimitBackoff,
}

impl NameProducer {
    pub(super) async fn run(self, cancel: CancellationToken) -> WorkerExit {
        let reason = match self.drive(&cancel).await {
            Ok(errors) => ExitReason::ErrorThreshold { errors },
            Err(Cancelled) => {
                debug!(slot = self.slot, "name producer cancelled");
                ExitReason::Cancelled
            }
        };
        WorkerExit {
            stage: Stage::Names,
            slot: self.slot,
            reason,
        }
    }

    /// Loop until cancelled or until the name stage trips. Returns the error
    /// count observed on a threshold exit.
    async fn drive(&self, cancel: &CancellationToken) -> Result<u32, Cancelled> {
        let slot = self.slot;
        loop {
            if let Some(errors) = self.cache.name_errors.tripped() {
                warn!(slot, errors, "name stage already tripped; producer stopping");
                return Ok(errors);
            }

            let err = match until_cancelled(cancel, self.source.fetch_name()).await? {
                Ok(name) => {
                    debug!(slot, name = %name, "fetched name");
                    self.cache.names.push(name, cancel).await?;
                    suspend(&*self.sleeper, self.backoff.pacing_interval(), cancel).await?;
                    continue;
                }
                Err(err) => err,
            };

            if let Some(retry_after) = err.retry_after() {
                let delay = self.backoff.retry_delay(retry_after);
                warn!(
                    slot,
                    retry_after_secs = retry_after.as_secs(),
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    "name service rate limited; backing off"
                );
                suspend(&*self.sleeper, delay, cancel).await?;
                continue;
            }

            match self.cache.name_errors.record_failure() {
                ErrorTally::Retry { errors } => {
                    warn!(slot, errors, error = %err, "name fetch failed; retrying");
                }
                ErrorTally::Exhausted { errors } => {
                    error!(slot, errors, error = %err, "name stage hit its error threshold");
                    return Ok(errors);
                }
            }
        }
    }
}
