//! Bounded worker pool for one event run.
//!
//! Each submitted job holds a semaphore permit for its whole lifetime, so at
//! most `size` jobs run at once. [`WorkerPool::submit`] waits for a permit
//! before spawning; tokio's semaphore is fair, so jobs start in submission
//! order. Dropping the pool aborts every job still running.

use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

/// Bounded set of concurrently running jobs.
pub struct WorkerPool<T> {
    permits: Arc<Semaphore>,
    tasks: JoinSet<T>,
    size: usize,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// Create a pool running at most `size` jobs at once (minimum 1).
    #[must_use]
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            tasks: JoinSet::new(),
            size,
        }
    }

    /// Create a pool sized to the host's available parallelism.
    #[must_use]
    pub fn with_available_parallelism() -> Self {
        Self::new(available_parallelism())
    }

    /// Maximum number of concurrent jobs.
    #[must_use]
    pub fn size(&self) -> usize {
        self.size
    }

    /// Number of submitted jobs not yet collected by [`join_all`](Self::join_all).
    #[must_use]
    pub fn pending(&self) -> usize {
        self.tasks.len()
    }

    /// Start `job` once a slot is free.
    pub async fn submit<F>(&mut self, job: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let permit = Arc::clone(&self.permits).acquire_owned().await.ok();
        let _ = self.tasks.spawn(async move {
            let output = job.await;
            drop(permit);
            output
        });
    }

    /// Wait for every submitted job and collect their outputs.
    ///
    /// Outputs arrive in completion order. A job that panicked is logged and
    /// omitted.
    pub async fn join_all(mut self) -> Vec<T> {
        let mut outputs = Vec::with_capacity(self.tasks.len());
        while let Some(result) = self.tasks.join_next().await {
            match result {
                Ok(output) => outputs.push(output),
                Err(e) => warn!(error = %e, "hook worker task panicked"),
            }
        }
        debug!(completed = outputs.len(), "worker pool drained");
        outputs
    }
}

impl<T> std::fmt::Debug for WorkerPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.size)
            .field("running", &self.tasks.len())
            .finish()
    }
}

/// Worker count matching the host's CPUs, or 1 if unknown.
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}
