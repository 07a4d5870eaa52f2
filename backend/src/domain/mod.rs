//! Domain core: queues, prefetch pipeline, front door and ports.
//!
//! Public surface:
//! - `BoundedQueue`: fixed-capacity FIFO with cancellable waits.
//! - `JokePipeline`: background name producers and joke composers.
//! - `JokeService`: cache-first front door implementing `ports::JokeQuery`.
//! - `Error` / `Cancelled`: caller-facing failures.

pub mod bounded_queue;
mod cancellation;
pub mod error;
pub mod joke_pipeline;
pub mod joke_service;
pub mod ports;

pub use self::bounded_queue::BoundedQueue;
pub use self::error::{Cancelled, Error};
pub use self::joke_pipeline::{
    ErrorTally, ExitReason, JokeCache, JokePipeline, JokePipelinePorts, JokePipelineRuntime,
    PipelineConfig, PipelineConfigError, PipelineReport, PipelineSleeper, RateLimitBackoff,
    Stage, StageErrorCounter, TokioSleeper, WorkerExit,
};
pub use self::joke_service::{JokeOrigin, JokeService, ServedJoke};
