//! Outbound adapters implementing domain ports for the two upstreams.
//!
//! Adapters are thin translators between HTTP payloads and domain types.
//! They contain no retry or caching logic.

pub mod jokes;
pub mod names;
