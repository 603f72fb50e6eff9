//! Pacegate - In-process Admission Control
//!
//! This crate provides two rate limiters that a host service embeds to decide,
//! per incoming request, whether to admit or reject it:
//!
//! - [`LeakyBucketRateLimiter`] queues requests in a bounded FIFO and releases
//!   one per tick, so callers wait for their turn.
//! - [`TokenBucketRateLimiter`] refills an atomic token counter every tick and
//!   answers immediately.
//!
//! Both implement [`RateLimiter`] and run their background worker on the
//! Tokio runtime they are created in.

pub mod config;
pub mod error;
pub mod ratelimit;

pub use error::{LimiterError, Result};
pub use ratelimit::{
    Frequency, LeakyBucketRateLimiter, LeakyBucketRequest, RateLimiter, TokenBucketRateLimiter,
    TokenBucketRequest,
};
