//! Driven port for fetching a random person name.
//!
//! The name upstream enforces a strict aggregate quota, so its error type
//! carries a distinguished rate-limit variant with the delay the upstream
//! asked for.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;

use super::define_port_error;

/// One person-name record produced by the name upstream.
///
/// Values are opaque; only `first_name` and `last_name` matter for joke
/// composition. See [`NameRecord::is_composable`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NameRecord {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Gender as reported by the upstream.
    pub gender: String,
    /// Region as reported by the upstream.
    pub region: String,
}

impl NameRecord {
    /// Build a record with only the parts needed for composition.
    ///
    /// # Examples
    /// ```
    /// use laff::domain::ports::NameRecord;
    ///
    /// let name = NameRecord::new("Ryan", "Gonzalez");
    /// assert!(name.is_composable());
    /// assert!(name.gender.is_empty());
    /// ```
    pub fn new(first_name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            ..Self::default()
        }
    }

    /// Whether both name parts are non-blank and a joke can be composed.
    pub fn is_composable(&self) -> bool {
        !self.first_name.trim().is_empty() && !self.last_name.trim().is_empty()
    }
}

impl fmt::Display for NameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.first_name, self.last_name)
    }
}

define_port_error! {
    /// Errors surfaced while fetching a name.
    pub enum NameSourceError {
        /// The upstream quota is exhausted; retry no sooner than `retry_after`.
        RateLimited { retry_after: Duration } =>
            "name service rate limit exceeded, retry in {retry_after:?}",
        /// Network transport failed before a response arrived.
        Transport { message: String } =>
            "name service transport failed: {message}",
        /// The call exceeded the client timeout.
        Timeout { message: String } =>
            "name service timed out: {message}",
        /// The upstream answered with a non-success status.
        Status { status: u16, reason: String } =>
            "invoking name fetch got HTTP status {status} ({reason})",
        /// The response body could not be decoded.
        Decode { message: String } =>
            "name service response decode failed: {message}",
    }
}

impl NameSourceError {
    /// Return the retry delay when this is a rate-limit signal.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after } => Some(*retry_after),
            _ => None,
        }
    }
}

/// Port for fetching one random name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NameSource: Send + Sync {
    /// Fetch a single name record.
    async fn fetch_name(&self) -> Result<NameRecord, NameSourceError>;
}

/// Fixture implementation that always returns the same name.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureNameSource;

#[async_trait]
impl NameSource for FixtureNameSource {
    async fn fetch_name(&self) -> Result<NameRecord, NameSourceError> {
        Ok(NameRecord::new("Chuck", "Norris"))
    }
}
