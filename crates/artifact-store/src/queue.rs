use crate::error::{Result, StoreError};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::task::{Context, Poll};
use tokio::sync::{mpsc, oneshot};

type Job = Pin<Box<dyn Future<Output = ()> + Send>>;

/// Strict FIFO with one execution slot.
///
/// A single worker task runs jobs one after another, so a job's whole chain
/// of awaits completes before the next job starts. Only serializes within one
/// process; a second store on the same root is not coordinated.
#[derive(Debug, Clone)]
pub struct WriteQueue {
    tx: mpsc::UnboundedSender<Job>,
    depth: Arc<AtomicUsize>,
}

impl WriteQueue {
    /// Spawns the worker. Must be called from within a tokio runtime.
    pub fn new() -> Self {
        let (tx, mut rx) = mpsc::unbounded_channel::<Job>();
        let depth = Arc::new(AtomicUsize::new(0));
        let worker_depth = Arc::clone(&depth);

        tokio::spawn(async move {
            while let Some(job) = rx.recv().await {
                // Run each job in its own task so a panic fails only that job
                if let Err(e) = tokio::spawn(job).await {
                    tracing::error!(error = %e, "write queue job panicked");
                }
                worker_depth.fetch_sub(1, Ordering::SeqCst);
            }
            tracing::debug!("write queue worker stopped");
        });

        Self { tx, depth }
    }

    /// Appends `task`; the handle resolves with its output once it has run.
    pub fn enqueue<F, T>(&self, task: F) -> QueueHandle<T>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let (done_tx, done_rx) = oneshot::channel();
        let job: Job = Box::pin(async move {
            let _ = done_tx.send(task.await);
        });

        self.depth.fetch_add(1, Ordering::SeqCst);
        if self.tx.send(job).is_err() {
            // The job (and its sender) were dropped, so the handle reports closed
            self.depth.fetch_sub(1, Ordering::SeqCst);
        }
        QueueHandle { rx: done_rx }
    }

    /// Jobs admitted but not yet finished, including the running one.
    pub fn pending(&self) -> usize {
        self.depth.load(Ordering::SeqCst)
    }
}

impl Default for WriteQueue {
    fn default() -> Self {
        Self::new()
    }
}

/// Settles when the enqueued task completes.
#[derive(Debug)]
pub struct QueueHandle<T> {
    rx: oneshot::Receiver<T>,
}

impl<T> Future for QueueHandle<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.map_err(|_| StoreError::QueueClosed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::time::Duration;

    #[tokio::test]
    async fn test_runs_in_admission_order() {
        let queue = WriteQueue::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..5u64)
            .map(|i| {
                let log = Arc::clone(&log);
                queue.enqueue(async move {
                    // Earlier jobs sleep longer; order must still hold
                    tokio::time::sleep(Duration::from_millis(25 - i * 5)).await;
                    log.lock().push(i);
                    i * 10
                })
            })
            .collect();

        let mut outputs = Vec::new();
        for handle in handles {
            outputs.push(handle.await.unwrap());
        }
        assert_eq!(outputs, vec![0, 10, 20, 30, 40]);
        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[tokio::test]
    async fn test_single_slot() {
        let queue = WriteQueue::new();
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let running = Arc::clone(&running);
                let peak = Arc::clone(&peak);
                queue.enqueue(async move {
                    let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(5)).await;
                    running.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(queue.pending(), 0);
    }

    #[tokio::test]
    async fn test_panicking_job_does_not_stop_queue() {
        let queue = WriteQueue::new();
        let failed = queue.enqueue(async {
            panic!("boom");
        });
        let ok = queue.enqueue(async { 7 });

        assert!(matches!(
            failed.await.unwrap_err(),
            StoreError::QueueClosed
        ));
        assert_eq!(ok.await.unwrap(), 7);
    }
}
