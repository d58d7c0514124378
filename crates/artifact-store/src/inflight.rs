use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Artifact paths this store instance is currently writing.
///
/// Entries are counted: a second write to the same path that starts inside
/// the first write's grace window keeps the path marked until its own grace
/// window ends.
#[derive(Debug, Default)]
pub struct InFlight {
    counts: Mutex<HashMap<String, usize>>,
}

impl InFlight {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark(&self, artifact: &str) {
        *self.counts.lock().entry(artifact.to_string()).or_insert(0) += 1;
    }

    pub fn release(&self, artifact: &str) {
        let mut counts = self.counts.lock();
        if let Some(count) = counts.get_mut(artifact) {
            *count -= 1;
            if *count == 0 {
                counts.remove(artifact);
            }
        }
    }

    /// Releases one mark on `artifact` once `delay` has elapsed.
    ///
    /// The delay is a heuristic: a watcher notification that arrives after it
    /// will be reported as an external edit.
    pub fn release_after(self: &Arc<Self>, artifact: &str, delay: Duration) {
        let this = Arc::clone(self);
        let artifact = artifact.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            this.release(&artifact);
        });
    }

    pub fn contains(&self, artifact: &str) -> bool {
        self.counts.lock().contains_key(artifact)
    }

    pub fn len(&self) -> usize {
        self.counts.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mark_and_release_counts() {
        let in_flight = InFlight::new();
        in_flight.mark("a.md");
        in_flight.mark("a.md");
        assert!(in_flight.contains("a.md"));

        in_flight.release("a.md");
        assert!(in_flight.contains("a.md"));
        in_flight.release("a.md");
        assert!(!in_flight.contains("a.md"));
        assert!(in_flight.is_empty());

        // Releasing an unknown path is a no-op
        in_flight.release("b.md");
        assert!(in_flight.is_empty());
    }

    #[tokio::test]
    async fn test_release_after_delay() {
        let in_flight = Arc::new(InFlight::new());
        in_flight.mark("a.md");
        in_flight.release_after("a.md", Duration::from_millis(50));

        assert!(in_flight.contains("a.md"));
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(!in_flight.contains("a.md"));
    }
}
