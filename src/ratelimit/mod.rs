//! Rate limiters and the types they share.

mod backend;
mod frequency;
mod leaky_bucket;
mod token_bucket;
mod worker;

pub use backend::RateLimiter;
pub use frequency::Frequency;
pub use leaky_bucket::{LeakyBucketRateLimiter, LeakyBucketRequest};
pub use token_bucket::{TokenBucketRateLimiter, TokenBucketRequest};
