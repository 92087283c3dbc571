// Worker pool - Bounded execution of blocking operations

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::error;

use crate::domain::errors::DomainError;

/// Runs each operation on a blocking thread, at most `size` at a time
#[derive(Clone)]
pub struct WorkerPool {
    permits: Arc<Semaphore>,
    size: usize,
}

impl WorkerPool {
    /// Create pool; a size of 0 is raised to 1
    pub fn new(size: usize) -> Self {
        let size = size.max(1);
        Self {
            permits: Arc::new(Semaphore::new(size)),
            size,
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// Wait for a slot; async operations hold it while they run
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit, DomainError> {
        Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|e| DomainError::Io(format!("Worker pool closed: {}", e)))
    }

    /// Queue `job`; `on_abort` runs instead of or after it when it cannot finish
    pub fn spawn<F, A>(&self, job: F, on_abort: A) -> Result<(), DomainError>
    where
        F: FnOnce() + Send + 'static,
        A: FnOnce(String) + Send + 'static,
    {
        let handle = tokio::runtime::Handle::try_current()
            .map_err(|e| DomainError::Io(format!("No async runtime: {}", e)))?;
        let pool = self.clone();

        handle.spawn(async move {
            let _permit = match pool.acquire().await {
                Ok(permit) => permit,
                Err(err) => return on_abort(err.to_string()),
            };
            if let Err(err) = tokio::task::spawn_blocking(job).await {
                error!(error = %err, "Worker task did not complete");
                on_abort(format!("Operation aborted: {}", err));
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::sync::mpsc;

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrency_is_bounded() {
        let pool = WorkerPool::new(2);
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let (tx, mut rx) = mpsc::unbounded_channel();

        for _ in 0..6 {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            let tx = tx.clone();
            pool.spawn(
                move || {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    std::thread::sleep(Duration::from_millis(20));
                    running.fetch_sub(1, Ordering::SeqCst);
                    let _ = tx.send(());
                },
                |_| {},
            )
            .unwrap();
        }
        drop(tx);

        let mut finished = 0;
        while rx.recv().await.is_some() {
            finished += 1;
        }
        assert_eq!(finished, 6);
        assert!(peak.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn test_panicking_job_aborts() {
        let pool = WorkerPool::new(1);
        let (tx, mut rx) = mpsc::unbounded_channel();
        pool.spawn(
            || panic!("boom"),
            move |reason| {
                let _ = tx.send(reason);
            },
        )
        .unwrap();
        let reason = rx.recv().await.unwrap();
        assert!(reason.starts_with("Operation aborted"));
    }

    #[test]
    fn test_spawn_without_runtime_fails() {
        let pool = WorkerPool::new(0);
        assert_eq!(pool.size(), 1);
        assert!(pool.spawn(|| {}, |_| {}).is_err());
    }
}
