//! Request middleware.
//!
//! Request logging with a per-request identifier, and the server-wide
//! inbound rate limit.

pub mod rate_limit;
pub mod request_log;

pub use rate_limit::InboundRateLimit;
pub use request_log::{RequestId, RequestLog};
