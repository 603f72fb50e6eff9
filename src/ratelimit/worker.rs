//! Background worker handle and the stopped/running state machine.

use std::future::Future;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::error;

/// Signal resolved when the owning limiter asks its worker to stop.
///
/// It also resolves if the owning [`Worker`] is dropped without a graceful
/// shutdown.
pub(crate) type ShutdownSignal = oneshot::Receiver<()>;

/// A spawned background task together with its shutdown trigger.
///
/// Dropping a `Worker` aborts the task, so a worker never outlives the
/// limiter that owns it.
pub(crate) struct Worker {
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl Worker {
    /// Spawn `task` on the current Tokio runtime.
    ///
    /// # Panics
    ///
    /// Panics when called outside of a Tokio runtime.
    pub(crate) fn spawn<F, Fut>(task: F) -> Self
    where
        F: FnOnce(ShutdownSignal) -> Fut,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let handle = tokio::spawn(task(rx));
        Self {
            shutdown: Some(tx),
            handle,
        }
    }

    /// Ask the task to stop and wait until it has returned.
    ///
    /// A panic inside the task is re-raised here.
    pub(crate) async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            // The task may already have exited on its own.
            let _ = tx.send(());
        }

        if let Err(e) = (&mut self.handle).await {
            if e.is_panic() {
                error!("Limiter worker panicked");
                std::panic::resume_unwind(e.into_panic());
            }
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Lifecycle of a limiter's background worker.
///
/// At most one worker exists per limiter; the state is kept behind an async
/// mutex so `stop` and `set_frequency` never interleave.
#[derive(Default)]
pub(crate) enum Lifecycle {
    #[default]
    Stopped,
    Running(Worker),
}

impl Lifecycle {
    pub(crate) fn is_running(&self) -> bool {
        matches!(self, Lifecycle::Running(_))
    }

    /// Transition to `Stopped`, shutting down the worker if there is one.
    ///
    /// Returns `true` if a worker was running.
    pub(crate) async fn stop(&mut self) -> bool {
        match std::mem::take(self) {
            Lifecycle::Running(worker) => {
                worker.shutdown().await;
                true
            }
            Lifecycle::Stopped => false,
        }
    }
}
