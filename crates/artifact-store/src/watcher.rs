//! External edit detection.
//!
//! Watches the project root with `notify` and reports files changed by
//! anything other than this store, for example an agent writing through its
//! own filesystem tools. Paths in the in-flight set are presumed to be echoes
//! of the store's own writes and are suppressed.
//!
//! Suppression relies on the writer's grace delay outliving the filesystem
//! event latency. An event delivered after the grace delay is reported as an
//! external edit, and an external edit landing inside a store write's grace
//! window is missed.

use crate::broadcast::ChangeBroadcaster;
use crate::config::WatcherConfig;
use crate::error::Result;
use crate::inflight::InFlight;
use crate::paths::{PathGuard, is_reserved};
use crate::types::Actor;
use crate::writer::TEMP_SUFFIX;
use notify::event::{CreateKind, ModifyKind};
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// Recursively watches the project root for external edits.
pub struct ExternalWatcher {
    guard: PathGuard,
    in_flight: Arc<InFlight>,
    broadcaster: ChangeBroadcaster,
    config: WatcherConfig,
}

impl ExternalWatcher {
    pub fn new(
        guard: PathGuard,
        in_flight: Arc<InFlight>,
        broadcaster: ChangeBroadcaster,
        config: WatcherConfig,
    ) -> Self {
        Self {
            guard,
            in_flight,
            broadcaster,
            config,
        }
    }

    /// Starts watching. Changes are forwarded to the broadcaster with actor
    /// [`Actor::Agent`] until the returned handle is stopped or dropped.
    pub fn start(self) -> Result<WatcherHandle> {
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let (event_tx, mut event_rx) = mpsc::channel::<PathBuf>(256);

        // notify calls back on its own thread, outside the runtime
        let mut watcher: RecommendedWatcher =
            notify::recommended_watcher(move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if is_content_change(&event.kind) {
                        for path in event.paths {
                            if event_tx.blocking_send(path).is_err() {
                                break;
                            }
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "watcher error");
                }
            })?;
        watcher.watch(self.guard.root(), RecursiveMode::Recursive)?;
        tracing::info!(root = %self.guard.root().display(), "watching for external edits");

        let handle = tokio::spawn(async move {
            let mut watcher = Some(watcher);
            let mut pending: HashMap<String, (PathBuf, Instant)> = HashMap::new();
            let mut tick = tokio::time::interval(self.config.poll_interval);

            loop {
                tokio::select! {
                    _ = stop_rx.recv() => {
                        break;
                    }

                    Some(path) = event_rx.recv() => {
                        if let Some(artifact) = self.classify(&path) {
                            pending.insert(artifact, (path, Instant::now()));
                        }
                    }

                    _ = tick.tick() => {
                        self.flush_quiet(&mut pending).await;
                    }
                }
            }

            drop(watcher.take());
            tracing::debug!("external watcher stopped");
        });

        Ok(WatcherHandle {
            stop_tx,
            _task: handle,
        })
    }

    /// Artifact path for a raw event path, or `None` when the event is store
    /// metadata or an echo of an in-flight write.
    fn classify(&self, path: &std::path::Path) -> Option<String> {
        let artifact = self.guard.artifact_of(path)?;
        if is_reserved(&artifact) {
            return None;
        }

        if self.in_flight.contains(&artifact) {
            tracing::trace!(artifact = %artifact, "suppressed self-write echo");
            return None;
        }
        Some(artifact)
    }

    /// True when `artifact` looks like the temp sibling of a path the store
    /// is writing right now.
    fn is_store_temp(&self, artifact: &str) -> bool {
        artifact
            .strip_suffix(TEMP_SUFFIX)
            .is_some_and(|target| self.in_flight.contains(target))
    }

    /// Reports paths that have been quiet for the configured period.
    async fn flush_quiet(&self, pending: &mut HashMap<String, (PathBuf, Instant)>) {
        let quiet = self.config.quiet_period;
        let ready: Vec<String> = pending
            .iter()
            .filter(|(_, (_, seen))| seen.elapsed() >= quiet)
            .map(|(artifact, _)| artifact.clone())
            .collect();

        for artifact in ready {
            let Some((path, _)) = pending.remove(&artifact) else {
                continue;
            };
            // The store may have started writing since the raw event arrived
            if self.in_flight.contains(&artifact) {
                continue;
            }
            // Temp files renamed away and directories are not artifacts
            match tokio::fs::metadata(&path).await {
                Ok(meta) if meta.is_file() => {}
                _ => continue,
            }
            // A surviving `.tmp` next to an in-flight write is either the
            // store's temp file or a real artifact; look again once the write
            // settles.
            if self.is_store_temp(&artifact) {
                pending.insert(artifact, (path, Instant::now()));
                continue;
            }
            tracing::info!(artifact = %artifact, "external edit detected");
            self.broadcaster.emit(&artifact, Actor::Agent);
        }
    }
}

fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(CreateKind::Folder) => false,
        EventKind::Create(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Handle to control a running watcher
pub struct WatcherHandle {
    stop_tx: mpsc::Sender<()>,
    _task: tokio::task::JoinHandle<()>,
}

impl WatcherHandle {
    /// Stop the watcher
    pub async fn stop(self) {
        let _ = self.stop_tx.send(()).await;
    }
}
