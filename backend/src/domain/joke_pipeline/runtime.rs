//! Port and runtime dependency bundles for the joke pipeline.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::domain::ports::{JokeSource, NameSource};

use super::PipelineSleeper;

/// Upstream ports required by the pipeline.
pub struct JokePipelinePorts {
    /// Name upstream adapter.
    pub names: Arc<dyn NameSource>,
    /// Joke upstream adapter.
    pub jokes: Arc<dyn JokeSource>,
}

impl JokePipelinePorts {
    /// Bundle the two upstream adapters.
    pub fn new(names: Arc<dyn NameSource>, jokes: Arc<dyn JokeSource>) -> Self {
        Self { names, jokes }
    }
}

/// Runtime helpers used for pacing and backoff.
pub struct JokePipelineRuntime {
    /// Async sleep implementation.
    pub sleeper: Arc<dyn PipelineSleeper>,
}

impl Default for JokePipelineRuntime {
    fn default() -> Self {
        Self {
            sleeper: Arc::new(TokioSleeper),
        }
    }
}

/// Tokio-based sleeper implementation.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl PipelineSleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
