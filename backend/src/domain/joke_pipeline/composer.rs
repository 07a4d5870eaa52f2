//! Joke composer loop.

use std::ops::ControlFlow;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::domain::Cancelled;
use crate::domain::cancellation::until_cancelled;
use crate::domain::ports::{JokeSource, JokeSourceError, NameRecord};

use super::{ErrorTally, ExitReason, JokeCache, Stage, WorkerExit};

/// Turns queued names into queued jokes.
pub(super) struct JokeComposer {
    pub(super) slot: usize,
    pub(super) cache: Arc<JokeCache>,
    pub(super) source: Arc<dyn JokeSource>,
    /// Child of the pipeline token shared by every composer. Cancelled when
    /// the joke stage trips so parked composers stop without taking a name.
    pub(super) halt: CancellationToken,
}

impl JokeComposer {
    pub(super) async fn run(self, cancel: CancellationToken) -> WorkerExit {
        let reason = match self.drive(&cancel).await {
            Ok(errors) => ExitReason::ErrorThreshold { errors },
            Err(Cancelled) => {
                debug!(slot = self.slot, "joke composer cancelled");
                ExitReason::Cancelled
            }
        };
        WorkerExit {
            stage: Stage::Jokes,
            slot: self.slot,
            reason,
        }
    }

    async fn drive(&self, cancel: &CancellationToken) -> Result<u32, Cancelled> {
        loop {
            // Leave queued names for the front door once the stage is done.
            if let Some(errors) = self.cache.joke_errors.tripped() {
                self.halt.cancel();
                warn!(slot = self.slot, errors, "joke stage already tripped; composer stopping");
                return Ok(errors);
            }
            let name = match self.cache.names.pop(&self.halt).await {
                Ok(name) => name,
                Err(Cancelled) if cancel.is_cancelled() => return Err(Cancelled),
                // `halt` only fires on its own once the stage has tripped.
                Err(Cancelled) => continue,
            };
            if let ControlFlow::Break(errors) = self.compose(name, cancel).await? {
                self.halt.cancel();
                return Ok(errors);
            }
        }
    }

    /// Fetch a joke for `name`, retrying the same name after failures.
    /// Breaks with the error count once the joke stage trips. A name that
    /// was never attempted goes back on the name queue.
    async fn compose(
        &self,
        name: NameRecord,
        cancel: &CancellationToken,
    ) -> Result<ControlFlow<u32>, Cancelled> {
        let slot = self.slot;
        let mut attempted = false;
        loop {
            if let Some(errors) = self.cache.joke_errors.tripped() {
                if !attempted {
                    debug!(slot, name = %name, "joke stage tripped; returning name");
                    self.cache.names.push(name, cancel).await?;
                }
                return Ok(ControlFlow::Break(errors));
            }

            attempted = true;
            let err = match until_cancelled(cancel, self.source.fetch_joke(&name)).await? {
                Ok(joke) => {
                    debug!(slot, name = %name, "composed joke");
                    self.cache.jokes.push(joke, cancel).await?;
                    return Ok(ControlFlow::Continue(()));
                }
                Err(err) => err,
            };

            match self.cache.joke_errors.record_failure() {
                ErrorTally::Exhausted { errors } => {
                    error!(slot, errors, error = %err, "joke stage hit its error threshold");
                    return Ok(ControlFlow::Break(errors));
                }
                ErrorTally::Retry { errors } => {
                    warn!(slot, errors, error = %err, "joke fetch failed");
                }
            }

            // Refused names are dropped, not retried.
            if matches!(err, JokeSourceError::InvalidName { .. }) {
                return Ok(ControlFlow::Continue(()));
            }
            if cancel.is_cancelled() {
                return Err(Cancelled);
            }
        }
    }
}
