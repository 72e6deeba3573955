//! Background task execution
//!
//! The cache hands refill writes and async operations to an [`Executor`].
//! [`TokioExecutor`] runs them on a tokio runtime's blocking pool with a
//! bounded number of tasks running at once; [`InlineExecutor`] runs them
//! immediately on the caller's thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{Notify, Semaphore};
use tracing::warn;

/// A unit of background work
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Capability to run tasks off the caller's control flow
pub trait Executor: Send + Sync {
    /// Queues `task` for execution; fire-and-forget
    fn submit(&self, task: Task);
}

/// Runs every task synchronously inside `submit`
#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl Executor for InlineExecutor {
    fn submit(&self, task: Task) {
        task();
    }
}

/// Counts submitted tasks that have not finished yet
#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Executor backed by a tokio runtime
///
/// Tasks run on the runtime's blocking pool since cache work does
/// synchronous file I/O. At most `workers` tasks run at once; the rest wait
/// for a permit.
#[derive(Clone)]
pub struct TokioExecutor {
    handle: Handle,
    permits: Arc<Semaphore>,
    in_flight: Arc<InFlight>,
}

impl TokioExecutor {
    /// Creates an executor submitting onto `handle`
    ///
    /// A `workers` value of zero is raised to one.
    pub fn new(handle: Handle, workers: usize) -> Self {
        Self {
            handle,
            permits: Arc::new(Semaphore::new(workers.max(1))),
            in_flight: Arc::new(InFlight::default()),
        }
    }

    /// Creates an executor on the current runtime, if called inside one
    pub fn try_current(workers: usize) -> Option<Self> {
        Handle::try_current()
            .ok()
            .map(|handle| Self::new(handle, workers))
    }

    /// Number of submitted tasks that have not completed
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Waits until every submitted task has completed
    pub async fn wait_idle(&self) {
        loop {
            let notified = self.in_flight.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            notified.await;
        }
    }
}

impl Executor for TokioExecutor {
    fn submit(&self, task: Task) {
        self.in_flight.count.fetch_add(1, Ordering::SeqCst);
        let permits = Arc::clone(&self.permits);
        let in_flight = Arc::clone(&self.in_flight);

        self.handle.spawn(async move {
            let permit = permits.acquire_owned().await.ok();
            if let Err(e) = tokio::task::spawn_blocking(task).await {
                warn!(error = %e, "Background cache task failed");
            }
            drop(permit);

            if in_flight.count.fetch_sub(1, Ordering::SeqCst) == 1 {
                in_flight.idle.notify_waiters();
            }
        });
    }
}
