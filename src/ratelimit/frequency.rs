//! Rate descriptor shared by every limiter.

use std::fmt;
use std::time::Duration;

use duration_str::deserialize_duration;
use serde::Deserialize;

use crate::error::{LimiterError, Result};

/// Admission budget: `unit` requests are permitted per `interval` elapsed.
///
/// A `Frequency { unit: 100, interval: Duration::from_secs(1) }` allows 100
/// requests per second.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Frequency {
    /// Number of admissions granted per interval
    pub unit: u64,
    /// Length of one tick of the background worker
    #[serde(deserialize_with = "deserialize_duration")]
    pub interval: Duration,
}

impl Frequency {
    /// Create a new frequency of `unit` admissions per `interval`.
    pub fn new(unit: u64, interval: Duration) -> Self {
        Self { unit, interval }
    }

    /// One admission every `interval`.
    pub fn every(interval: Duration) -> Self {
        Self::new(1, interval)
    }

    /// `unit` admissions per second.
    pub fn per_second(unit: u64) -> Self {
        Self::new(unit, Duration::from_secs(1))
    }

    /// Check the invariants every limiter relies on.
    pub fn validate(&self) -> Result<()> {
        if self.unit == 0 || self.unit > i64::MAX as u64 {
            return Err(LimiterError::InvalidUnit(self.unit));
        }
        if self.interval.is_zero() {
            return Err(LimiterError::InvalidInterval(self.interval));
        }
        Ok(())
    }

    /// The unit as the signed type of the token counter.
    ///
    /// Only meaningful after [`Frequency::validate`] succeeded.
    pub(crate) fn unit_as_tokens(&self) -> i64 {
        i64::try_from(self.unit).unwrap_or(i64::MAX)
    }
}

impl fmt::Display for Frequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} per {:?}", self.unit, self.interval)
    }
}
