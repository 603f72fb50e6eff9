//! Rate limiter trait shared by the pacing and counter implementations.

use async_trait::async_trait;

use super::frequency::Frequency;
use crate::error::Result;

/// Trait for rate limiter implementations.
///
/// This trait abstracts over the `LeakyBucketRateLimiter` and the
/// `TokenBucketRateLimiter` so a host can hold either one. Each implementation
/// fixes the request shape it accepts through [`RateLimiter::Request`].
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// The request type admitted by this limiter.
    type Request: Send + 'static;

    /// Decide whether `request` may proceed.
    ///
    /// Returns `true` when the request is admitted and `false` when it is
    /// throttled. Depending on the implementation the call may wait for its
    /// turn before returning `true`.
    async fn allow_request(&self, request: Self::Request) -> bool;

    /// Replace the rate and restart the background worker with it.
    async fn set_frequency(&self, frequency: Frequency) -> Result<()>;
}
