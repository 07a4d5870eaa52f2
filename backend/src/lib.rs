//! Personalised joke service.
//!
//! Background workers keep a small cache of names and composed jokes warm
//! while the HTTP front door serves from it, falling back to live upstream
//! calls on a miss.

pub mod domain;
pub mod inbound;
pub mod middleware;
pub mod outbound;
pub mod settings;

#[cfg(test)]
pub(crate) mod test_support;
