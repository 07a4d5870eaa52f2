//! Shared HTTP adapter state.
//!
//! HTTP handlers accept this state via `actix_web::web::Data` so they only
//! depend on the `JokeQuery` port and remain testable without I/O.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::domain::ports::JokeQuery;

/// Dependency bundle for HTTP handlers.
#[derive(Clone)]
pub struct HttpState {
    pub jokes: Arc<dyn JokeQuery>,
    /// Process-wide shutdown signal; in-flight requests give up when it fires.
    pub shutdown: CancellationToken,
}

impl HttpState {
    /// Bundle the front door with the shutdown token.
    ///
    /// # Examples
    /// ```
    /// use std::sync::Arc;
    /// use laff::domain::ports::FixtureJokeQuery;
    /// use laff::inbound::http::state::HttpState;
    /// use tokio_util::sync::CancellationToken;
    ///
    /// let state = HttpState::new(Arc::new(FixtureJokeQuery), CancellationToken::new());
    /// assert!(!state.shutdown.is_cancelled());
    /// ```
    pub fn new(jokes: Arc<dyn JokeQuery>, shutdown: CancellationToken) -> Self {
        Self { jokes, shutdown }
    }
}
