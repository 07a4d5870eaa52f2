//! Domain-level error types.
//!
//! These errors are transport agnostic. The HTTP adapter maps them to status
//! codes and JSON bodies in `inbound::http::error`.

use std::time::Duration;

use thiserror::Error as ThisError;

use crate::domain::ports::{JokeSourceError, NameSourceError};

/// Outcome of a blocking operation interrupted by the shared cancellation
/// token.
///
/// # Examples
/// ```
/// use laff::domain::{Cancelled, Error};
///
/// let err: Error = Cancelled.into();
/// assert!(matches!(err, Error::Cancelled));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, ThisError)]
#[error("operation cancelled")]
pub struct Cancelled;

/// Failures surfaced to callers of the joke front door.
#[derive(Debug, Clone, PartialEq, Eq, ThisError)]
pub enum Error {
    /// An upstream quota is exhausted. Callers should back off for
    /// `retry_after` before asking again.
    #[error("rate limit exceeded, retry in {} seconds", .retry_after.as_secs())]
    RateLimited {
        /// Delay requested by the upstream.
        retry_after: Duration,
    },
    /// Any other upstream failure: transport, timeout, status or decode.
    #[error("{message}")]
    Upstream {
        /// Human-readable description of the failure.
        message: String,
    },
    /// The shared cancellation token fired before the request resolved.
    #[error("request cancelled")]
    Cancelled,
}

impl Error {
    /// Convenience constructor for [`Error::Upstream`].
    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream {
            message: message.into(),
        }
    }
}

impl From<Cancelled> for Error {
    fn from(_: Cancelled) -> Self {
        Self::Cancelled
    }
}

impl From<NameSourceError> for Error {
    fn from(err: NameSourceError) -> Self {
        match err {
            NameSourceError::RateLimited { retry_after } => Self::RateLimited { retry_after },
            other => Self::upstream(other.to_string()),
        }
    }
}

impl From<JokeSourceError> for Error {
    fn from(err: JokeSourceError) -> Self {
        Self::upstream(err.to_string())
    }
}
