//! Driving port for serving jokes to inbound adapters.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::Error;

/// Queue occupancy and stage error counts at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PipelineStatus {
    /// Names waiting in the name queue.
    pub cached_names: usize,
    /// Jokes waiting in the joke queue.
    pub cached_jokes: usize,
    /// Failures recorded by the name stage.
    pub name_errors: u32,
    /// Failures recorded by the joke stage.
    pub joke_errors: u32,
}

/// Port exposing the joke front door.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JokeQuery: Send + Sync {
    /// Return one personalised joke, or fail without retrying.
    async fn joke(&self, cancel: &CancellationToken) -> Result<String, Error>;

    /// Current pipeline status.
    fn status(&self) -> PipelineStatus;
}

/// Fixture implementation returning a fixed joke.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureJokeQuery;

#[async_trait]
impl JokeQuery for FixtureJokeQuery {
    async fn joke(&self, cancel: &CancellationToken) -> Result<String, Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok("Chuck Norris can divide by zero.".to_owned())
    }

    fn status(&self) -> PipelineStatus {
        PipelineStatus::default()
    }
}
