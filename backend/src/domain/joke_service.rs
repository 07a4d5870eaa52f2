//! Front door: serve a joke from the caches, falling back to upstream fetches.
//!
//! Lookup order:
//! 1. a pre-composed joke from the joke queue;
//! 2. a pre-fetched name from the name queue, composed synchronously;
//! 3. a synchronous name fetch followed by a joke fetch.
//!
//! Queue reads never wait. Upstream failures are returned to the caller
//! without retrying; retrying is the background workers' job.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::domain::Error;
use crate::domain::JokeCache;
use crate::domain::cancellation::until_cancelled;
use crate::domain::ports::{JokeQuery, JokeSource, NameSource, PipelineStatus};

/// Where a served joke came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JokeOrigin {
    /// Taken straight from the joke queue.
    CacheHit,
    /// Composed on demand from a queued name.
    NameHit,
    /// Both the name and the joke were fetched on demand.
    Miss,
}

impl fmt::Display for JokeOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CacheHit => "cache_hit",
            Self::NameHit => "name_hit",
            Self::Miss => "miss",
        })
    }
}

/// A joke together with how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServedJoke {
    pub joke: String,
    pub origin: JokeOrigin,
}

/// Cache-first joke service.
#[derive(Clone)]
pub struct JokeService {
    cache: Arc<JokeCache>,
    names: Arc<dyn NameSource>,
    jokes: Arc<dyn JokeSource>,
}

impl JokeService {
    /// Build a service over `cache` using the given upstream ports.
    pub fn new(
        cache: Arc<JokeCache>,
        names: Arc<dyn NameSource>,
        jokes: Arc<dyn JokeSource>,
    ) -> Self {
        Self {
            cache,
            names,
            jokes,
        }
    }

    /// Serve one joke and report its origin.
    ///
    /// A name taken from the name queue is not returned if the joke fetch
    /// fails or `cancel` fires while it is in flight.
    ///
    /// # Errors
    ///
    /// - [`Error::Cancelled`] when `cancel` fired before a joke was ready.
    /// - [`Error::RateLimited`] when the name upstream refused the fetch.
    /// - [`Error::Upstream`] for any other upstream failure.
    pub async fn serve(&self, cancel: &CancellationToken) -> Result<ServedJoke, Error> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }
        if let Some(joke) = self.cache.jokes.try_pop() {
            return Ok(self.served(joke, JokeOrigin::CacheHit));
        }

        let (name, origin) = match self.cache.names.try_pop() {
            Some(name) => (name, JokeOrigin::NameHit),
            None => {
                let name = until_cancelled(cancel, self.names.fetch_name()).await??;
                (name, JokeOrigin::Miss)
            }
        };
        let joke = until_cancelled(cancel, self.jokes.fetch_joke(&name)).await??;
        Ok(self.served(joke, origin))
    }

    /// Serve one joke.
    ///
    /// # Errors
    ///
    /// See [`JokeService::serve`].
    pub async fn joke(&self, cancel: &CancellationToken) -> Result<String, Error> {
        self.serve(cancel).await.map(|served| served.joke)
    }

    /// Current queue occupancy and stage error counts.
    pub fn status(&self) -> PipelineStatus {
        self.cache.status()
    }

    fn served(&self, joke: String, origin: JokeOrigin) -> ServedJoke {
        debug!(%origin, "serving joke");
        ServedJoke { joke, origin }
    }
}

#[async_trait]
impl JokeQuery for JokeService {
    async fn joke(&self, cancel: &CancellationToken) -> Result<String, Error> {
        JokeService::joke(self, cancel).await
    }

    fn status(&self) -> PipelineStatus {
        JokeService::status(self)
    }
}
