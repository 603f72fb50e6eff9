//! Configuration for building limiters from a host's configuration file.
//!
//! The crate never reads files on its own; a host deserializes
//! [`LimiterConfig`] as part of its own configuration, or parses a YAML
//! snippet with [`LimiterConfig::from_yaml`].

use serde::Deserialize;
use tracing::info;

use crate::error::{LimiterError, Result};
use crate::ratelimit::{Frequency, LeakyBucketRateLimiter, TokenBucketRateLimiter};

/// Configuration for one limiter, tagged by algorithm.
///
/// ```yaml
/// algorithm: leaky_bucket
/// frequency:
///   unit: 1
///   interval: 10ms
/// capacity: 200
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum LimiterConfig {
    /// Queue requests and release one per tick
    LeakyBucket(LeakyBucketConfig),
    /// Refill a token counter once per tick
    TokenBucket(TokenBucketConfig),
}

/// Leaky bucket settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LeakyBucketConfig {
    /// Pacing rate; `unit` must be 1
    pub frequency: Frequency,
    /// Maximum number of queued requests
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

/// Token bucket settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TokenBucketConfig {
    /// Tokens granted per interval
    pub frequency: Frequency,
}

fn default_capacity() -> usize {
    100
}

impl LimiterConfig {
    /// Load configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml)
            .map_err(|e| LimiterError::Config(format!("Failed to parse limiter config: {}", e)))
    }

    /// The configured frequency, whichever the algorithm.
    pub fn frequency(&self) -> Frequency {
        match self {
            LimiterConfig::LeakyBucket(config) => config.frequency,
            LimiterConfig::TokenBucket(config) => config.frequency,
        }
    }
}

impl LeakyBucketConfig {
    /// Build and start the configured limiter.
    pub fn build(&self) -> Result<LeakyBucketRateLimiter> {
        info!(
            frequency = %self.frequency,
            capacity = self.capacity,
            "Building leaky bucket limiter from configuration"
        );
        LeakyBucketRateLimiter::new(self.frequency, self.capacity)
    }
}

impl TokenBucketConfig {
    /// Build and start the configured limiter.
    pub fn build(&self) -> Result<TokenBucketRateLimiter> {
        info!(frequency = %self.frequency, "Building token bucket limiter from configuration");
        TokenBucketRateLimiter::new(self.frequency)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_parse_leaky_bucket() {
        let yaml = r#"
algorithm: leaky_bucket
frequency:
  unit: 1
  interval: 10ms
capacity: 200
"#;

        let config = LimiterConfig::from_yaml(yaml).unwrap();
        assert_eq!(
            config,
            LimiterConfig::LeakyBucket(LeakyBucketConfig {
                frequency: Frequency::every(Duration::from_millis(10)),
                capacity: 200,
            })
        );
    }

    #[test]
    fn test_parse_leaky_bucket_default_capacity() {
        let yaml = r#"
algorithm: leaky_bucket
frequency:
  unit: 1
  interval: 1s
"#;

        match LimiterConfig::from_yaml(yaml).unwrap() {
            LimiterConfig::LeakyBucket(config) => assert_eq!(config.capacity, 100),
            other => panic!("unexpected config: {:?}", other),
        }
    }

    #[test]
    fn test_parse_token_bucket() {
        let yaml = r#"
algorithm: token_bucket
frequency:
  unit: 5
  interval: 10ms
"#;

        let config = LimiterConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.frequency(), Frequency::new(5, Duration::from_millis(10)));
        assert!(matches!(config, LimiterConfig::TokenBucket(_)));
    }

    #[test]
    fn test_parse_unknown_algorithm() {
        let yaml = r#"
algorithm: sliding_window
frequency:
  unit: 5
  interval: 10ms
"#;

        let err = LimiterConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, LimiterError::Config(_)));
    }

    #[tokio::test]
    async fn test_build_surfaces_validation_errors() {
        let config = LeakyBucketConfig {
            frequency: Frequency::new(2, Duration::from_millis(10)),
            capacity: 10,
        };
        assert_eq!(config.build().err(), Some(LimiterError::LeakyBucketUnit(2)));

        let config = TokenBucketConfig {
            frequency: Frequency::new(5, Duration::from_millis(10)),
        };
        let limiter = config.build().unwrap();
        assert_eq!(limiter.frequency(), config.frequency);
        limiter.stop().await;
    }
}
