//! Joke upstream adapter.
//!
//! Thin HTTP implementation of the `JokeSource` port.

mod dto;
mod http_source;

pub use http_source::JokeHttpSource;
