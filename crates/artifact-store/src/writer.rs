//! Crash-safe artifact writes.
//!
//! Content goes to a sibling `<name>.tmp`, is synced to disk, then renamed
//! over the target. The rename is the only step that changes the visible
//! artifact, so a crash before it leaves the old content (or no file) in
//! place and a crash after it leaves the new content complete.

use crate::audit::AuditLogger;
use crate::backup::BackupManager;
use crate::broadcast::ChangeBroadcaster;
use crate::error::{Result, StoreError};
use crate::inflight::InFlight;
use crate::paths::ResolvedPath;
use crate::types::{Action, Modality, WriteOptions, WriteReceipt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs::{self, File};
use tokio::io::AsyncWriteExt;

/// Suffix of the temporary sibling written before the rename.
pub const TEMP_SUFFIX: &str = ".tmp";

/// Temp path used while writing `target`.
pub fn temp_path(target: &Path) -> PathBuf {
    let mut name = target
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(TEMP_SUFFIX);
    target.with_file_name(name)
}

#[derive(Debug)]
pub struct AtomicWriter {
    backups: BackupManager,
    audit: AuditLogger,
    broadcaster: ChangeBroadcaster,
    in_flight: Arc<InFlight>,
    grace_delay: Duration,
}

impl AtomicWriter {
    pub fn new(
        backups: BackupManager,
        audit: AuditLogger,
        broadcaster: ChangeBroadcaster,
        in_flight: Arc<InFlight>,
        grace_delay: Duration,
    ) -> Self {
        Self {
            backups,
            audit,
            broadcaster,
            in_flight,
            grace_delay,
        }
    }

    pub fn backups(&self) -> &BackupManager {
        &self.backups
    }

    pub fn audit(&self) -> &AuditLogger {
        &self.audit
    }

    /// Writes `content` to `target`. On error the artifact is unchanged.
    ///
    /// The path stays in the in-flight set for the grace delay after this
    /// returns, whether or not the write succeeded.
    pub async fn write(
        &self,
        target: &ResolvedPath,
        content: &[u8],
        opts: &WriteOptions,
    ) -> Result<WriteReceipt> {
        let artifact = target.artifact.as_str();
        self.in_flight.mark(artifact);

        let result = self.commit(target, content, opts).await;
        match &result {
            Ok(receipt) => {
                self.audit
                    .record(artifact, &target.absolute, opts, receipt.action)
                    .await;
                self.broadcaster.emit(artifact, opts.actor);
                tracing::info!(
                    artifact,
                    actor = %opts.actor,
                    action = %receipt.action,
                    size_bytes = receipt.size_bytes,
                    "artifact written"
                );
            }
            Err(e) => {
                tracing::error!(artifact, actor = %opts.actor, error = %e, "artifact write failed");
            }
        }

        self.in_flight.release_after(artifact, self.grace_delay);
        result
    }

    async fn commit(
        &self,
        target: &ResolvedPath,
        content: &[u8],
        opts: &WriteOptions,
    ) -> Result<WriteReceipt> {
        let path = &target.absolute;
        let existed = fs::try_exists(path)
            .await
            .map_err(|e| StoreError::io(path, e))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }

        if existed
            && !opts.skip_snapshot
            && let Err(e) = self.backups.snapshot(&target.artifact, path).await
        {
            tracing::warn!(artifact = %target.artifact, error = %e, "backup failed; continuing write");
        }

        let tmp = temp_path(path);
        if let Err(e) = write_synced(&tmp, content).await {
            discard(&tmp).await;
            return Err(e);
        }
        if let Err(e) = fs::rename(&tmp, path).await {
            discard(&tmp).await;
            return Err(StoreError::io(path, e));
        }
        tracing::debug!(artifact = %target.artifact, "temp file renamed into place");

        Ok(WriteReceipt {
            artifact: target.artifact.clone(),
            absolute: path.clone(),
            action: if existed { Action::Update } else { Action::Create },
            modality: Modality::from_path(path),
            size_bytes: content.len() as u64,
        })
    }
}

async fn write_synced(tmp: &Path, content: &[u8]) -> Result<()> {
    let mut file = File::create(tmp)
        .await
        .map_err(|e| StoreError::io(tmp, e))?;
    file.write_all(content)
        .await
        .map_err(|e| StoreError::io(tmp, e))?;
    file.sync_all().await.map_err(|e| StoreError::io(tmp, e))?;
    Ok(())
}

async fn discard(tmp: &Path) {
    if let Err(e) = fs::remove_file(tmp).await
        && e.kind() != std::io::ErrorKind::NotFound
    {
        tracing::warn!(path = %tmp.display(), error = %e, "failed to remove temp file");
    }
}
