//! Token bucket rate limiter.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use super::backend::RateLimiter;
use super::frequency::Frequency;
use super::worker::{Lifecycle, ShutdownSignal, Worker};
use crate::error::Result;

/// A request handled by [`TokenBucketRateLimiter`]. It carries no payload.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct TokenBucketRequest;

/// Token bucket rate limiter backed by an atomic counter.
///
/// Each admission consumes one token. A background worker tops the bucket up
/// once per interval. `allow_request` never waits: it either takes a token or
/// rejects.
///
/// The counter starts empty, so nothing is admitted before the first refill.
pub struct TokenBucketRateLimiter {
    /// Available tokens, shared with the refill worker
    tokens: Arc<AtomicI64>,
    /// The rate currently applied by the worker
    frequency: RwLock<Frequency>,
    /// Background worker state
    lifecycle: Mutex<Lifecycle>,
}

impl TokenBucketRateLimiter {
    /// Create a limiter with an empty bucket and start its refill worker.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn new(frequency: Frequency) -> Result<Self> {
        frequency.validate()?;

        let mut limiter = Self {
            tokens: Arc::new(AtomicI64::new(0)),
            frequency: RwLock::new(frequency),
            lifecycle: Mutex::new(Lifecycle::Stopped),
        };
        let worker = limiter.spawn_worker(frequency);
        *limiter.lifecycle.get_mut() = Lifecycle::Running(worker);

        debug!(frequency = %frequency, "Token bucket limiter started");
        Ok(limiter)
    }

    /// Take one token if any is available.
    ///
    /// This is the synchronous form of [`RateLimiter::allow_request`].
    pub fn try_acquire(&self) -> bool {
        let acquired = self
            .tokens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                (current > 0).then(|| current - 1)
            })
            .is_ok();

        trace!(acquired, "Token bucket decision");
        acquired
    }

    /// Number of tokens currently in the bucket.
    pub fn current_token(&self) -> i64 {
        self.tokens.load(Ordering::SeqCst)
    }

    /// The rate currently in effect.
    pub fn frequency(&self) -> Frequency {
        *self.frequency.read()
    }

    /// Whether the refill worker is running.
    pub async fn is_running(&self) -> bool {
        self.lifecycle.lock().await.is_running()
    }

    /// Stop the refill worker. The token count is left as is.
    ///
    /// Calling `stop` on a stopped limiter does nothing.
    pub async fn stop(&self) {
        if self.lifecycle.lock().await.stop().await {
            debug!(tokens = self.current_token(), "Token bucket limiter stopped");
        }
    }

    fn spawn_worker(&self, frequency: Frequency) -> Worker {
        let tokens = self.tokens.clone();
        let first_tick = Instant::now() + frequency.interval;
        Worker::spawn(move |shutdown| refill(tokens, first_tick, frequency, shutdown))
    }
}

#[async_trait]
impl RateLimiter for TokenBucketRateLimiter {
    type Request = TokenBucketRequest;

    async fn allow_request(&self, _request: TokenBucketRequest) -> bool {
        self.try_acquire()
    }

    async fn set_frequency(&self, frequency: Frequency) -> Result<()> {
        frequency.validate()?;

        let mut lifecycle = self.lifecycle.lock().await;
        lifecycle.stop().await;
        *self.frequency.write() = frequency;
        *lifecycle = Lifecycle::Running(self.spawn_worker(frequency));

        debug!(
            frequency = %frequency,
            tokens = self.current_token(),
            "Token bucket frequency updated"
        );
        Ok(())
    }
}

/// Tokens added by one refill tick.
///
/// A bucket at or below `unit` is topped up to exactly `unit`. A bucket
/// already above `unit` grows by a further `unit`.
pub(crate) fn refill_amount(current: i64, unit: i64) -> i64 {
    if current > unit {
        unit
    } else {
        unit - current
    }
}

/// Refill the bucket once per tick until shut down.
async fn refill(
    tokens: Arc<AtomicI64>,
    first_tick: Instant,
    frequency: Frequency,
    mut shutdown: ShutdownSignal,
) {
    let unit = frequency.unit_as_tokens();
    let mut ticker = interval_at(first_tick, frequency.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        // The closure always returns `Some`, so the update cannot fail.
        let previous = tokens
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(current.saturating_add(refill_amount(current, unit)))
            })
            .unwrap_or_else(|current| current);

        trace!(
            previous,
            added = refill_amount(previous, unit),
            "Token bucket refilled"
        );
    }
}
