//! Test utilities for the laff crate.
//!
//! Shared doubles for unit tests in `src/`. Only compiled when running tests.

pub mod joke_pipeline;
