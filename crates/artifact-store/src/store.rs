use crate::audit::AuditLogger;
use crate::backup::BackupManager;
use crate::broadcast::{ChangeBroadcaster, Subscription};
use crate::config::StoreConfig;
use crate::debounce::DebounceCoalescer;
use crate::error::{Result, StoreError};
use crate::inflight::InFlight;
use crate::paths::{PathGuard, StoreLayout};
use crate::queue::WriteQueue;
use crate::types::{AuditRecord, BackupEntry, WriteOptions, WriteOutcome};
use crate::writer::AtomicWriter;
use std::path::Path;
use std::sync::Arc;

/// Serialized, versioned, audited writes to the artifacts under one project
/// root.
///
/// Cloning is cheap; clones share the same queue, in-flight set and event
/// channel. Only one store should own a given root: writes are serialized
/// within this instance, not across processes.
///
/// # Example
///
/// ```rust,no_run
/// use artifact_store::{ArtifactStore, StoreConfig, WriteOptions};
///
/// # async fn demo() -> artifact_store::Result<()> {
/// let store = ArtifactStore::open(StoreConfig::new("/path/to/project")).await?;
///
/// store
///     .write("docs/plan.md", "# Plan", WriteOptions::user("initial draft"))
///     .await?;
///
/// let bytes = store.read("docs/plan.md").await?;
/// assert_eq!(bytes, b"# Plan");
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    inner: Arc<StoreInner>,
}

#[derive(Debug)]
struct StoreInner {
    config: StoreConfig,
    guard: PathGuard,
    layout: StoreLayout,
    writer: Arc<AtomicWriter>,
    queue: WriteQueue,
    debouncer: DebounceCoalescer,
    broadcaster: ChangeBroadcaster,
    in_flight: Arc<InFlight>,
}

impl ArtifactStore {
    /// Opens a store rooted at `config.root`, creating the directory if
    /// needed. Spawns the write queue worker on the current runtime.
    pub async fn open(config: StoreConfig) -> Result<Self> {
        tokio::fs::create_dir_all(&config.root)
            .await
            .map_err(|e| StoreError::io(&config.root, e))?;
        let guard = PathGuard::new(&config.root)?;
        let layout = StoreLayout::new(guard.root());

        let broadcaster = ChangeBroadcaster::new(config.event_capacity);
        let in_flight = Arc::new(InFlight::new());
        let writer = AtomicWriter::new(
            BackupManager::new(layout.clone(), config.max_backups),
            AuditLogger::new(layout.events_log()),
            broadcaster.clone(),
            Arc::clone(&in_flight),
            config.grace_delay,
        );

        tracing::info!(root = %guard.root().display(), "artifact store opened");

        Ok(Self {
            inner: Arc::new(StoreInner {
                debouncer: DebounceCoalescer::new(config.debounce_window),
                queue: WriteQueue::new(),
                writer: Arc::new(writer),
                config,
                guard,
                layout,
                broadcaster,
                in_flight,
            }),
        })
    }

    /// Canonical project root.
    pub fn root(&self) -> &Path {
        self.inner.guard.root()
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    pub fn layout(&self) -> &StoreLayout {
        &self.inner.layout
    }

    /// Reads an artifact's current bytes. Not queued: may observe content
    /// from before or after a concurrent write.
    pub async fn read<P: AsRef<Path>>(&self, path: P) -> Result<Vec<u8>> {
        let target = self.inner.guard.resolve(path)?;
        tokio::fs::read(&target.absolute)
            .await
            .map_err(|source| StoreError::Read {
                path: target.absolute.clone(),
                source,
            })
    }

    /// Writes `content` to the artifact at `path`.
    ///
    /// Without `opts.debounce` the write is queued immediately and the call
    /// resolves once it commits or fails. With it, the write waits out the
    /// debounce window and resolves [`WriteOutcome::Superseded`] if a newer
    /// write to the same path arrives first.
    pub async fn write<P, C>(&self, path: P, content: C, opts: WriteOptions) -> Result<WriteOutcome>
    where
        P: AsRef<Path>,
        C: Into<Vec<u8>>,
    {
        let target = self.inner.guard.resolve(path)?;
        let content = content.into();

        if opts.debounce {
            let key = target.artifact.clone();
            let queue = self.inner.queue.clone();
            let writer = Arc::clone(&self.inner.writer);
            let opts = WriteOptions {
                debounce: false,
                ..opts
            };
            let flush = async move {
                queue
                    .enqueue(async move {
                        writer
                            .write(&target, &content, &opts)
                            .await
                            .map(WriteOutcome::Committed)
                    })
                    .await?
            };
            return self.inner.debouncer.schedule(key, flush).await;
        }

        let writer = Arc::clone(&self.inner.writer);
        self.inner
            .queue
            .enqueue(async move {
                writer
                    .write(&target, &content, &opts)
                    .await
                    .map(WriteOutcome::Committed)
            })
            .await?
    }

    /// Retained backup snapshots of an artifact, oldest first.
    pub async fn history<P: AsRef<Path>>(&self, path: P) -> Result<Vec<BackupEntry>> {
        let target = self.inner.guard.resolve(path)?;
        self.inner.writer.backups().list(&target.artifact).await
    }

    pub async fn read_backup<P: AsRef<Path>>(&self, path: P, version: &str) -> Result<Vec<u8>> {
        let target = self.inner.guard.resolve(path)?;
        self.inner
            .writer
            .backups()
            .read(&target.artifact, version)
            .await
    }

    /// Writes a snapshot's content back as the current artifact. The
    /// overwritten content is itself snapshotted and the restore audited.
    /// An empty `opts.reason` is recorded as `restore <version>`.
    pub async fn restore<P: AsRef<Path>>(
        &self,
        path: P,
        version: &str,
        mut opts: WriteOptions,
    ) -> Result<WriteOutcome> {
        let path = path.as_ref();
        let content = self.read_backup(path, version).await?;
        if opts.reason.is_empty() {
            opts.reason = format!("restore {}", version);
        }
        self.write(path, content, opts).await
    }

    /// Every audit record appended so far, oldest first.
    pub async fn audit_log(&self) -> Result<Vec<AuditRecord>> {
        self.inner.writer.audit().read_all().await
    }

    pub fn subscribe(&self) -> Subscription {
        self.inner.broadcaster.subscribe()
    }

    /// True while the artifact is being written by this store or is inside
    /// the post-write grace delay.
    pub fn is_in_flight<P: AsRef<Path>>(&self, path: P) -> Result<bool> {
        let target = self.inner.guard.resolve(path)?;
        Ok(self.inner.in_flight.contains(&target.artifact))
    }

    /// Writes queued and not yet finished.
    pub fn pending_writes(&self) -> usize {
        self.inner.queue.pending()
    }

    /// Starts reporting external edits under the root as
    /// [`StoreEvent`](crate::StoreEvent)s with actor `agent`.
    #[cfg(feature = "watcher")]
    pub fn watch(&self) -> Result<crate::watcher::WatcherHandle> {
        crate::watcher::ExternalWatcher::new(
            self.inner.guard.clone(),
            Arc::clone(&self.inner.in_flight),
            self.inner.broadcaster.clone(),
            self.inner.config.watcher.clone(),
        )
        .start()
    }
}
