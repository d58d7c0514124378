use crate::error::{Result, StoreError};
use crate::types::WriteOutcome;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

struct Pending {
    generation: u64,
    timer: JoinHandle<()>,
    waiter: oneshot::Sender<Result<WriteOutcome>>,
}

/// Collapses bursts of writes to one path into a single deferred write
/// carrying the latest content.
pub struct DebounceCoalescer {
    window: Duration,
    pending: Arc<Mutex<HashMap<String, Pending>>>,
    next_generation: AtomicU64,
}

impl DebounceCoalescer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            pending: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Schedules `flush` to run once `key` has been quiet for the window.
    ///
    /// A pending request for the same key is cancelled and its caller
    /// resolved with [`WriteOutcome::Superseded`]. `flush` is not polled
    /// unless its timer fires, so superseded content is never written.
    pub fn schedule<F>(&self, key: String, flush: F) -> DebounceHandle
    where
        F: Future<Output = Result<WriteOutcome>> + Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);
        let window = self.window;
        let timer_key = key.clone();

        let mut map = self.pending.lock();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let waiter = {
                let mut map = pending.lock();
                let current = map
                    .get(&timer_key)
                    .is_some_and(|p| p.generation == generation);
                if current {
                    map.remove(&timer_key).map(|p| p.waiter)
                } else {
                    None
                }
            };
            let Some(waiter) = waiter else { return };
            tracing::debug!(artifact = %timer_key, "debounce window elapsed");
            let _ = waiter.send(flush.await);
        });

        if let Some(prev) = map.insert(
            key,
            Pending {
                generation,
                timer,
                waiter: tx,
            },
        ) {
            prev.timer.abort();
            let _ = prev.waiter.send(Ok(WriteOutcome::Superseded));
        }

        DebounceHandle { rx }
    }

    /// Keys with a live timer.
    pub fn pending_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.pending.lock().keys().cloned().collect();
        keys.sort();
        keys
    }
}

impl std::fmt::Debug for DebounceCoalescer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebounceCoalescer")
            .field("window", &self.window)
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}

/// Resolves when the debounced write settles or is superseded.
#[derive(Debug)]
pub struct DebounceHandle {
    rx: oneshot::Receiver<Result<WriteOutcome>>,
}

impl Future for DebounceHandle {
    type Output = Result<WriteOutcome>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|res| res.unwrap_or(Err(StoreError::QueueClosed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Action, Modality, WriteReceipt};
    use std::path::PathBuf;

    fn committed(tag: &str) -> WriteOutcome {
        WriteOutcome::Committed(WriteReceipt {
            artifact: tag.to_string(),
            absolute: PathBuf::from(tag),
            action: Action::Update,
            modality: Modality::Editor,
            size_bytes: 0,
        })
    }

    #[tokio::test]
    async fn test_latest_request_wins() {
        let debouncer = DebounceCoalescer::new(Duration::from_millis(50));
        let flushed = Arc::new(Mutex::new(Vec::new()));

        let handles: Vec<_> = (0..4)
            .map(|i| {
                let flushed = Arc::clone(&flushed);
                debouncer.schedule("a.md".to_string(), async move {
                    flushed.lock().push(i);
                    Ok(committed(&format!("write-{}", i)))
                })
            })
            .collect();

        let mut outcomes = Vec::new();
        for handle in handles {
            outcomes.push(handle.await.unwrap());
        }

        assert!(outcomes[..3].iter().all(WriteOutcome::is_superseded));
        assert_eq!(outcomes[3].receipt().unwrap().artifact, "write-3");
        assert_eq!(*flushed.lock(), vec![3]);
        assert!(debouncer.pending_keys().is_empty());
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let debouncer = DebounceCoalescer::new(Duration::from_millis(20));
        let a = debouncer.schedule("a.md".to_string(), async { Ok(committed("a")) });
        let b = debouncer.schedule("b.md".to_string(), async { Ok(committed("b")) });
        assert_eq!(debouncer.pending_keys(), vec!["a.md", "b.md"]);

        assert_eq!(a.await.unwrap().receipt().unwrap().artifact, "a");
        assert_eq!(b.await.unwrap().receipt().unwrap().artifact, "b");
    }

    #[tokio::test]
    async fn test_superseded_resolves_immediately() {
        let debouncer = DebounceCoalescer::new(Duration::from_secs(30));
        let first = debouncer.schedule("a.md".to_string(), async { Ok(committed("1")) });
        let _second = debouncer.schedule("a.md".to_string(), async { Ok(committed("2")) });

        let outcome = tokio::time::timeout(Duration::from_millis(100), first)
            .await
            .expect("superseded caller should not wait for the window")
            .unwrap();
        assert!(outcome.is_superseded());
    }

    #[tokio::test]
    async fn test_flush_error_reaches_caller() {
        let debouncer = DebounceCoalescer::new(Duration::from_millis(10));
        let handle = debouncer.schedule("a.md".to_string(), async {
            Err(StoreError::QueueClosed)
        });
        assert!(matches!(handle.await, Err(StoreError::QueueClosed)));
    }
}
