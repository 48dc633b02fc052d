//! Bounded pool for blocking backend calls
//!
//! Backend calls block on network I/O, so they run on tokio's blocking
//! threads. A semaphore caps how many run at once; further requests wait
//! for a permit in FIFO order.

use crate::error::{Error, Result};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::trace;

#[derive(Clone)]
pub struct WorkerPool {
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create a pool running at most `size` jobs concurrently
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(Error::Config("worker pool needs at least one worker".to_string()));
        }
        Ok(Self {
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Workers not currently running a job
    pub fn idle_workers(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Run `job` on a worker and wait for its result.
    ///
    /// The awaiting task yields while the job runs, so other sessions keep
    /// making progress.
    pub async fn run<F, T>(&self, job: F) -> Result<T>
    where
        F: FnOnce() -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| Error::Isolation(format!("Failed to acquire worker: {e}")))?;
        trace!(idle = self.semaphore.available_permits(), "Dispatching job to worker pool");

        let handle = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            job()
        });

        handle
            .await
            .map_err(|e| Error::Isolation(format!("Worker task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[test]
    fn test_zero_workers_rejected() {
        assert!(WorkerPool::new(0).is_err());
    }

    #[tokio::test]
    async fn test_returns_job_result() {
        let pool = WorkerPool::new(2).unwrap();
        let value = pool.run(|| Ok(21 * 2)).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(pool.idle_workers(), 2);
    }

    #[tokio::test]
    async fn test_job_error_passes_through() {
        let pool = WorkerPool::new(1).unwrap();
        let result: Result<()> = pool
            .run(|| Err(Error::Backend("unavailable".to_string())))
            .await;
        assert!(matches!(result, Err(Error::Backend(_))));
    }

    #[tokio::test]
    async fn test_panicking_job_becomes_isolation_error() {
        let pool = WorkerPool::new(1).unwrap();
        let result: Result<()> = pool.run(|| panic!("boom")).await;
        assert!(matches!(result, Err(Error::Isolation(_))));
        // The permit is released even though the job panicked
        assert_eq!(pool.idle_workers(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrency_is_bounded_by_pool_size() {
        let pool = WorkerPool::new(2).unwrap();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let mut handles = Vec::new();
        for _ in 0..6 {
            let pool = pool.clone();
            let running = running.clone();
            let peak = peak.clone();
            handles.push(tokio::spawn(async move {
                pool.run(move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(30));
                    running.fetch_sub(1, Ordering::SeqCst);
                    Ok(())
                })
                .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(pool.idle_workers(), 2);
    }
}
