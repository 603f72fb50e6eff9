//! Leaky bucket rate limiter.
//!
//! Accepted requests wait in a fixed-capacity FIFO queue. A background worker
//! releases one of them every tick, so admissions leave the bucket at a
//! constant pace no matter how bursty the arrivals are.

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot, Mutex};
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, trace};

use super::backend::RateLimiter;
use super::frequency::Frequency;
use super::worker::{Lifecycle, ShutdownSignal, Worker};
use crate::error::{LimiterError, Result};

/// A request handled by [`LeakyBucketRateLimiter`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LeakyBucketRequest {
    /// Caller-supplied identity, used for tracing only
    pub id: u64,
}

impl LeakyBucketRequest {
    /// Create a new request with the given identity.
    pub fn new(id: u64) -> Self {
        Self { id }
    }
}

/// A queued request and the rendezvous that admits it.
struct Pending {
    id: u64,
    admit: oneshot::Sender<()>,
}

/// Leaky bucket rate limiter pacing one admission per tick.
///
/// `allow_request` rejects immediately when the queue is full. Otherwise the
/// request is enqueued and the call waits until the worker dequeues it, which
/// happens strictly in arrival order.
///
/// Stopping or reconfiguring the limiter rejects every request still queued:
/// their callers return `false` instead of waiting forever.
pub struct LeakyBucketRateLimiter {
    /// Maximum number of queued requests, fixed at construction
    capacity: usize,
    /// The rate currently applied by the worker
    frequency: RwLock<Frequency>,
    /// Sending half of the live queue, `None` while stopped
    queue: RwLock<Option<mpsc::Sender<Pending>>>,
    /// Background worker state
    lifecycle: Mutex<Lifecycle>,
}

impl LeakyBucketRateLimiter {
    /// Create a limiter holding at most `capacity` pending requests and start
    /// its worker.
    ///
    /// `frequency.unit` must be 1. To allow 100 requests per second use
    /// `Frequency::every(Duration::from_millis(10))`.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub fn new(frequency: Frequency, capacity: usize) -> Result<Self> {
        validate(&frequency)?;
        if capacity == 0 {
            return Err(LimiterError::InvalidCapacity(capacity));
        }

        let mut limiter = Self {
            capacity,
            frequency: RwLock::new(frequency),
            queue: RwLock::new(None),
            lifecycle: Mutex::new(Lifecycle::Stopped),
        };
        let worker = limiter.spawn_worker(frequency);
        *limiter.lifecycle.get_mut() = Lifecycle::Running(worker);

        debug!(frequency = %frequency, capacity, "Leaky bucket limiter started");
        Ok(limiter)
    }

    /// Maximum number of requests the queue can hold.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Number of requests currently waiting in the queue.
    pub fn pending(&self) -> usize {
        self.queue
            .read()
            .as_ref()
            .map(|tx| tx.max_capacity() - tx.capacity())
            .unwrap_or(0)
    }

    /// The rate currently in effect.
    pub fn frequency(&self) -> Frequency {
        *self.frequency.read()
    }

    /// Whether the background worker is running.
    pub async fn is_running(&self) -> bool {
        self.lifecycle.lock().await.is_running()
    }

    /// Stop the background worker.
    ///
    /// Requests still queued are rejected. Calling `stop` on a stopped
    /// limiter does nothing.
    pub async fn stop(&self) {
        let mut lifecycle = self.lifecycle.lock().await;
        if self.stop_locked(&mut lifecycle).await {
            debug!("Leaky bucket limiter stopped");
        }
    }

    async fn stop_locked(&self, lifecycle: &mut Lifecycle) -> bool {
        // The worker closes its receiver before draining, which already makes
        // `try_send` fail; clearing the sender only drops the dead queue.
        let was_running = lifecycle.stop().await;
        self.queue.write().take();
        was_running
    }

    /// Install a fresh queue and spawn a worker leaking from it.
    fn spawn_worker(&self, frequency: Frequency) -> Worker {
        let (tx, rx) = mpsc::channel(self.capacity);
        *self.queue.write() = Some(tx);
        let first_tick = Instant::now() + frequency.interval;
        Worker::spawn(move |shutdown| leak(rx, first_tick, frequency, shutdown))
    }
}

#[async_trait]
impl RateLimiter for LeakyBucketRateLimiter {
    type Request = LeakyBucketRequest;

    async fn allow_request(&self, request: LeakyBucketRequest) -> bool {
        let (admit, admitted) = oneshot::channel();
        let pending = Pending {
            id: request.id,
            admit,
        };

        let enqueued = {
            let queue = self.queue.read();
            match queue.as_ref() {
                Some(tx) => tx.try_send(pending).is_ok(),
                None => false,
            }
        };
        if !enqueued {
            trace!(id = request.id, "Queue full or limiter stopped, rejecting request");
            return false;
        }

        trace!(id = request.id, "Request enqueued");
        // The sender is dropped without firing if the limiter stops first.
        admitted.await.is_ok()
    }

    async fn set_frequency(&self, frequency: Frequency) -> Result<()> {
        validate(&frequency)?;

        let mut lifecycle = self.lifecycle.lock().await;
        self.stop_locked(&mut lifecycle).await;
        *self.frequency.write() = frequency;
        *lifecycle = Lifecycle::Running(self.spawn_worker(frequency));

        debug!(frequency = %frequency, "Leaky bucket frequency updated");
        Ok(())
    }
}

fn validate(frequency: &Frequency) -> Result<()> {
    frequency.validate()?;
    if frequency.unit != 1 {
        return Err(LimiterError::LeakyBucketUnit(frequency.unit));
    }
    Ok(())
}

/// Release one queued request per tick until shut down.
async fn leak(
    mut queue: mpsc::Receiver<Pending>,
    first_tick: Instant,
    frequency: Frequency,
    mut shutdown: ShutdownSignal,
) {
    let mut ticker = interval_at(first_tick, frequency.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            _ = ticker.tick() => {}
        }

        let next = match queue.try_recv() {
            Ok(pending) => Some(pending),
            Err(TryRecvError::Disconnected) => None,
            Err(TryRecvError::Empty) => {
                let next = tokio::select! {
                    biased;
                    _ = &mut shutdown => break,
                    next = queue.recv() => next,
                };
                // Ticks that elapsed while idle are not banked: the next
                // admission comes one full interval after this one.
                ticker.reset();
                next
            }
        };

        let Some(pending) = next else {
            error!("Leaky bucket queue closed while the worker was running");
            panic!("leaky bucket queue closed while the worker was running");
        };

        if pending.admit.send(()).is_ok() {
            trace!(id = pending.id, "Request admitted");
        } else {
            trace!(id = pending.id, "Caller gave up before admission");
        }
    }

    queue.close();
    let mut dropped = 0usize;
    while queue.try_recv().is_ok() {
        dropped += 1;
    }
    if dropped > 0 {
        debug!(dropped, "Rejected pending requests on stop");
    }
}
