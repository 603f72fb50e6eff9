//! Error types for limiter construction and reconfiguration.

use std::time::Duration;
use thiserror::Error;

/// Main error type for pacegate operations.
///
/// Every variant describes a programmer or configuration mistake. Running out
/// of budget is never an error: `allow_request` simply returns `false`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LimiterError {
    /// The frequency unit is zero or does not fit the signed token counter
    #[error("Invalid frequency unit {0}: must be between 1 and {}", i64::MAX)]
    InvalidUnit(u64),

    /// The frequency interval is zero
    #[error("Invalid frequency interval {0:?}: must be greater than zero")]
    InvalidInterval(Duration),

    /// The leaky bucket paces exactly one request per tick
    #[error(
        "Frequency unit for LeakyBucketRateLimiter must be 1, got {0}. \
         To allow 100 requests per second, use Frequency::every(Duration::from_millis(10))"
    )]
    LeakyBucketUnit(u64),

    /// The leaky bucket queue must hold at least one request
    #[error("Invalid queue capacity {0}: must be greater than zero")]
    InvalidCapacity(usize),

    /// Configuration parsing errors
    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type alias for pacegate operations.
pub type Result<T> = std::result::Result<T, LimiterError>;
