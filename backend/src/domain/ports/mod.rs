//! Domain ports and supporting types for the hexagonal boundary.
//!
//! Driven ports (`NameSource`, `JokeSource`) are implemented by the outbound
//! HTTP adapters. The driving port (`JokeQuery`) is what inbound adapters
//! call.

mod macros;
pub(crate) use macros::define_port_error;

mod joke_query;
mod joke_source;
mod name_source;

#[cfg(test)]
pub use joke_query::MockJokeQuery;
pub use joke_query::{FixtureJokeQuery, JokeQuery, PipelineStatus};
#[cfg(test)]
pub use joke_source::MockJokeSource;
pub use joke_source::{FixtureJokeSource, JokeSource, JokeSourceError};
#[cfg(test)]
pub use name_source::MockNameSource;
pub use name_source::{FixtureNameSource, NameRecord, NameSource, NameSourceError};
