//! Bounded blocking-task pool

use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::error::{Error, Result};

/// Runs CPU-bound closures on the blocking thread pool, at most `workers` at a time.
///
/// PDF extraction, embedding inference and index build/search all go through here.
#[derive(Clone)]
pub struct ComputePool {
    permits: Arc<Semaphore>,
    workers: usize,
}

impl ComputePool {
    /// Create a pool admitting `workers` concurrent tasks
    pub fn new(workers: usize) -> Self {
        let workers = workers.max(1);
        Self {
            permits: Arc::new(Semaphore::new(workers)),
            workers,
        }
    }

    /// Number of concurrent tasks admitted
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Run `task` on a blocking thread once a permit is available
    pub async fn run<F, T>(&self, task: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| Error::Internal(format!("Compute pool closed: {}", e)))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            task()
        })
        .await
        .map_err(|e| Error::Internal(format!("Task join error: {}", e)))
    }
}

impl Default for ComputePool {
    fn default() -> Self {
        Self::new(num_cpus::get())
    }
}
