//! Fixed-width worker pool.
//!
//! Every spawned task starts immediately on the runtime but waits for one of
//! `width` permits before running its body, so at most `width` bodies are in
//! flight. [`WorkerPool::drain`] joins every task.

use std::future::Future;
use std::sync::Arc;

use sheetmail_types::{Result, SheetMailError};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

pub const DEFAULT_WIDTH: usize = 2;

pub struct WorkerPool<T> {
    width: usize,
    semaphore: Arc<Semaphore>,
    tasks: JoinSet<T>,
}

impl<T: Send + 'static> WorkerPool<T> {
    /// A width of zero is treated as one.
    pub fn new(width: usize) -> Self {
        let width = width.max(1);
        Self {
            width,
            semaphore: Arc::new(Semaphore::new(width)),
            tasks: JoinSet::new(),
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of spawned tasks not yet joined.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = T> + Send + 'static,
    {
        let semaphore = Arc::clone(&self.semaphore);
        self.tasks.spawn(async move {
            // The semaphore is never closed, so the permit is always granted.
            let _permit = semaphore.acquire_owned().await.ok();
            task.await
        });
    }

    /// Wait for every task. Results come back in completion order; a task
    /// that panicked yields an error entry instead of stalling the drain.
    pub async fn drain(mut self) -> Vec<Result<T>> {
        let mut results = Vec::with_capacity(self.tasks.len());
        while let Some(joined) = self.tasks.join_next().await {
            results.push(joined.map_err(|e| {
                tracing::error!(error = %e, "Worker task did not complete");
                SheetMailError::Other(format!("Worker task failed: {e}"))
            }));
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn never_exceeds_width() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let mut pool = WorkerPool::new(2);

        for i in 0..8 {
            let in_flight = in_flight.clone();
            let peak = peak.clone();
            pool.spawn(async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                i
            });
        }

        let mut results: Vec<usize> = pool.drain().await.into_iter().map(|r| r.unwrap()).collect();
        results.sort();
        assert_eq!(results, (0..8).collect::<Vec<_>>());
        assert!(peak.load(Ordering::SeqCst) <= 2);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn zero_width_is_clamped() {
        let mut pool = WorkerPool::new(0);
        assert_eq!(pool.width(), 1);
        pool.spawn(async { 5 });
        assert_eq!(pool.len(), 1);
        let results = pool.drain().await;
        assert_eq!(results.len(), 1);
        assert_eq!(*results[0].as_ref().unwrap(), 5);
    }

    #[tokio::test]
    async fn panicking_task_does_not_block_drain() {
        let mut pool: WorkerPool<u8> = WorkerPool::new(1);
        pool.spawn(async { panic!("boom") });
        pool.spawn(async { 1u8 });
        let results = pool.drain().await;
        assert_eq!(results.len(), 2);
        assert_eq!(results.iter().filter(|r| r.is_err()).count(), 1);
        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    }

    #[tokio::test]
    async fn empty_pool_drains_immediately() {
        let pool: WorkerPool<()> = WorkerPool::new(DEFAULT_WIDTH);
        assert!(pool.is_empty());
        assert!(pool.drain().await.is_empty());
    }
}
