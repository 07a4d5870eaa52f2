//! Two-stage prefetch pipeline feeding the joke front door.
//!
//! Name producers keep a bounded queue of names topped up while pacing
//! themselves under the name upstream's quota. Joke composers drain that
//! queue, personalise a joke for each name and push the result onto a second
//! bounded queue. [`JokeService`](crate::domain::JokeService) drains both
//! queues opportunistically.
//!
//! Every suspension point races the shared cancellation token, and each
//! worker reports why it stopped through [`WorkerExit`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::domain::BoundedQueue;
use crate::domain::JokeService;
use crate::domain::ports::{JokeSource, NameRecord, NameSource, PipelineStatus};

mod backoff;
mod composer;
mod counters;
mod producer;
mod runtime;

pub use backoff::RateLimitBackoff;
pub use counters::{ErrorTally, StageErrorCounter};
pub use runtime::{JokePipelinePorts, JokePipelineRuntime, TokioSleeper};

use composer::JokeComposer;
use producer::NameProducer;

/// Pipeline sizing, rate budget and failure threshold.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Number of name producer tasks.
    pub producers: usize,
    /// Number of joke composer tasks.
    pub composers: usize,
    /// Capacity of each of the two queues.
    pub queue_capacity: usize,
    /// Aggregate name fetches per minute shared by all producers.
    pub requests_per_minute: u32,
    /// Extra delay added to the upstream's `Retry-After`.
    pub rate_limit_slop: Duration,
    /// Failures after which every worker of a stage stops.
    pub max_errors: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            producers: 2,
            composers: 2,
            queue_capacity: 10,
            requests_per_minute: 6,
            rate_limit_slop: Duration::from_secs(5),
            max_errors: 50,
        }
    }
}

impl PipelineConfig {
    /// One composer per producer, `workers` of each.
    ///
    /// # Examples
    /// ```
    /// use laff::domain::PipelineConfig;
    ///
    /// let config = PipelineConfig::uniform(3, 10);
    /// assert_eq!((config.producers, config.composers), (3, 3));
    /// assert!(config.validate().is_ok());
    /// ```
    pub fn uniform(workers: usize, queue_capacity: usize) -> Self {
        Self {
            producers: workers,
            composers: workers,
            queue_capacity,
            ..Self::default()
        }
    }

    /// Check the sizing invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`PipelineConfigError`] found.
    pub fn validate(&self) -> Result<(), PipelineConfigError> {
        if self.producers == 0 {
            return Err(PipelineConfigError::NoProducers);
        }
        if self.composers == 0 {
            return Err(PipelineConfigError::NoComposers);
        }
        if self.queue_capacity == 0 {
            return Err(PipelineConfigError::ZeroCapacity);
        }
        if self.requests_per_minute == 0 {
            return Err(PipelineConfigError::ZeroRequestBudget);
        }
        if self.max_errors == 0 {
            return Err(PipelineConfigError::ZeroErrorThreshold);
        }
        Ok(())
    }
}

/// Invalid [`PipelineConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PipelineConfigError {
    #[error("at least one name producer is required")]
    NoProducers,
    #[error("at least one joke composer is required")]
    NoComposers,
    #[error("queue capacity must be at least 1")]
    ZeroCapacity,
    #[error("requests per minute must be at least 1")]
    ZeroRequestBudget,
    #[error("error threshold must be at least 1")]
    ZeroErrorThreshold,
}

/// Async sleeping abstraction used for pacing and backoff.
#[async_trait]
pub trait PipelineSleeper: Send + Sync {
    /// Suspend execution for `duration`.
    async fn sleep(&self, duration: Duration);
}

/// The two queues and stage counters shared by workers and the front door.
#[derive(Debug)]
pub struct JokeCache {
    pub(crate) names: BoundedQueue<NameRecord>,
    pub(crate) jokes: BoundedQueue<String>,
    pub(crate) name_errors: StageErrorCounter,
    pub(crate) joke_errors: StageErrorCounter,
}

impl JokeCache {
    /// Create empty queues of `config.queue_capacity`.
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            names: BoundedQueue::new(config.queue_capacity),
            jokes: BoundedQueue::new(config.queue_capacity),
            name_errors: StageErrorCounter::new(config.max_errors),
            joke_errors: StageErrorCounter::new(config.max_errors),
        }
    }

    /// Snapshot of queue occupancy and stage error counts.
    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            cached_names: self.names.len(),
            cached_jokes: self.jokes.len(),
            name_errors: self.name_errors.count(),
            joke_errors: self.joke_errors.count(),
        }
    }
}

/// Pipeline stage a worker belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    /// Name producers.
    Names,
    /// Joke composers.
    Jokes,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Names => "names",
            Self::Jokes => "jokes",
        })
    }
}

/// Why a worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitReason {
    /// The shared token fired.
    Cancelled,
    /// The stage's error counter reached the threshold.
    ErrorThreshold {
        /// Counter value observed on exit.
        errors: u32,
    },
    /// The worker task panicked or was aborted.
    Aborted,
}

/// Exit record for one worker task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    pub stage: Stage,
    /// Zero-based index of the worker within its stage.
    pub slot: usize,
    pub reason: ExitReason,
}

/// Exit records for every worker, ordered by stage then slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineReport {
    pub exits: Vec<WorkerExit>,
}

impl PipelineReport {
    /// Exits belonging to `stage`.
    pub fn stage(&self, stage: Stage) -> impl Iterator<Item = &WorkerExit> {
        self.exits.iter().filter(move |exit| exit.stage == stage)
    }

    /// Whether any worker ended abnormally.
    pub fn has_aborted(&self) -> bool {
        self.exits.iter().any(|exit| exit.reason == ExitReason::Aborted)
    }
}

/// Background pipeline owning the queues and the worker tasks.
pub struct JokePipeline {
    cache: Arc<JokeCache>,
    names: Arc<dyn NameSource>,
    jokes: Arc<dyn JokeSource>,
    sleeper: Arc<dyn PipelineSleeper>,
    backoff: RateLimitBackoff,
    config: PipelineConfig,
}

impl JokePipeline {
    /// Build a pipeline using Tokio timers.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineConfigError`] when `config` is invalid.
    pub fn new(
        ports: JokePipelinePorts,
        config: PipelineConfig,
    ) -> Result<Self, PipelineConfigError> {
        Self::with_runtime(ports, JokePipelineRuntime::default(), config)
    }

    /// Build a pipeline with injected runtime helpers.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineConfigError`] when `config` is invalid.
    pub fn with_runtime(
        ports: JokePipelinePorts,
        runtime: JokePipelineRuntime,
        config: PipelineConfig,
    ) -> Result<Self, PipelineConfigError> {
        config.validate()?;
        Ok(Self {
            cache: Arc::new(JokeCache::new(&config)),
            names: ports.names,
            jokes: ports.jokes,
            sleeper: runtime.sleeper,
            backoff: RateLimitBackoff::new(&config),
            config,
        })
    }

    /// Front door sharing this pipeline's queues and upstream ports.
    pub fn service(&self) -> JokeService {
        JokeService::new(
            Arc::clone(&self.cache),
            Arc::clone(&self.names),
            Arc::clone(&self.jokes),
        )
    }

    /// Current queue occupancy and error counts.
    pub fn status(&self) -> PipelineStatus {
        self.cache.status()
    }

    /// Spawn every worker and wait until all of them have exited.
    ///
    /// Workers stop when `cancel` fires or when their stage trips its error
    /// threshold. A stage that trips does not stop the other stage.
    pub async fn run(&self, cancel: CancellationToken) -> PipelineReport {
        let mut tasks = JoinSet::new();
        let mut slots = HashMap::new();

        for slot in 0..self.config.producers {
            let producer = NameProducer {
                slot,
                cache: Arc::clone(&self.cache),
                source: Arc::clone(&self.names),
                sleeper: Arc::clone(&self.sleeper),
                backoff: self.backoff,
            };
            let handle = tasks.spawn(producer.run(cancel.clone()));
            slots.insert(handle.id(), (Stage::Names, slot));
        }
        let jokes_halt = cancel.child_token();
        for slot in 0..self.config.composers {
            let composer = JokeComposer {
                slot,
                cache: Arc::clone(&self.cache),
                source: Arc::clone(&self.jokes),
                halt: jokes_halt.clone(),
            };
            let handle = tasks.spawn(composer.run(cancel.clone()));
            slots.insert(handle.id(), (Stage::Jokes, slot));
        }
        info!(
            producers = self.config.producers,
            composers = self.config.composers,
            capacity = self.config.queue_capacity,
            pacing_ms = u64::try_from(self.backoff.pacing_interval().as_millis())
                .unwrap_or(u64::MAX),
            "joke pipeline started"
        );

        let mut report = PipelineReport::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(exit) => report.exits.push(exit),
                Err(join_error) => {
                    let Some(&(stage, slot)) = slots.get(&join_error.id()) else {
                        error!(error = %join_error, "untracked pipeline task failed");
                        continue;
                    };
                    error!(%stage, slot, error = %join_error, "pipeline worker aborted");
                    report.exits.push(WorkerExit {
                        stage,
                        slot,
                        reason: ExitReason::Aborted,
                    });
                }
            }
        }
        report.exits.sort_by_key(|exit| (exit.stage, exit.slot));
        info!(workers = report.exits.len(), "joke pipeline stopped");
        report
    }
}
