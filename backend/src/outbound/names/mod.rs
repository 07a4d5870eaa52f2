//! Name upstream adapter.
//!
//! Thin HTTP implementation of the `NameSource` port.

mod dto;
mod http_source;

pub use http_source::NameHttpSource;
