//! # HTTP Middleware
//!
//! Request metrics and per-client rate limiting. Authentication and
//! session middleware live in [`crate::auth`] and [`crate::session`].

pub mod metrics;
pub mod rate_limit;
