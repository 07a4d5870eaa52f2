//! Driven port for composing a joke around a name.

use async_trait::async_trait;

use super::{NameRecord, define_port_error};

define_port_error! {
    /// Errors surfaced while fetching a joke.
    pub enum JokeSourceError {
        /// Network transport failed before a response arrived.
        Transport { message: String } =>
            "joke service transport failed: {message}",
        /// The call exceeded the client timeout.
        Timeout { message: String } =>
            "joke service timed out: {message}",
        /// The upstream answered with a non-success status.
        Status { status: u16, reason: String } =>
            "invoking joke fetch got HTTP status {status} ({reason})",
        /// The response body could not be decoded.
        Decode { message: String } =>
            "joke service response decode failed: {message}",
        /// The adapter refused the request before calling the upstream.
        InvalidName { message: String } =>
            "joke request invalid: {message}",
    }
}

/// Port for fetching a joke personalised with the given name.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait JokeSource: Send + Sync {
    /// Fetch a joke with `name` substituted in.
    async fn fetch_joke(&self, name: &NameRecord) -> Result<String, JokeSourceError>;
}

/// Fixture implementation that formats a fixed joke locally.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixtureJokeSource;

#[async_trait]
impl JokeSource for FixtureJokeSource {
    async fn fetch_joke(&self, name: &NameRecord) -> Result<String, JokeSourceError> {
        if !name.is_composable() {
            return Err(JokeSourceError::invalid_name("first and last name are required"));
        }
        Ok(format!("{name} can divide by zero."))
    }
}
