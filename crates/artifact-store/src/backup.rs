use crate::error::{Result, StoreError};
use crate::paths::StoreLayout;
use crate::types::BackupEntry;
use chrono::{DateTime, SubsecRound, Utc};
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;

const BACKUP_EXT: &str = "bak";

/// Rolling per-artifact snapshots under `.store/artifacts/history/`.
#[derive(Debug)]
pub struct BackupManager {
    layout: StoreLayout,
    max_backups: usize,
    last_stamp: Mutex<Option<DateTime<Utc>>>,
}

impl BackupManager {
    pub fn new(layout: StoreLayout, max_backups: usize) -> Self {
        Self {
            layout,
            max_backups: max_backups.max(1),
            last_stamp: Mutex::new(None),
        }
    }

    pub fn max_backups(&self) -> usize {
        self.max_backups
    }

    /// Copies the current bytes of `source` into the artifact's history and
    /// evicts the oldest snapshots beyond the retention limit.
    pub async fn snapshot(&self, artifact: &str, source: &Path) -> Result<PathBuf> {
        let dir = self.layout.history_dir(artifact);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StoreError::io(&dir, e))?;

        let target = dir.join(format!("{}.{}", self.next_version(), BACKUP_EXT));
        fs::copy(source, &target)
            .await
            .map_err(|e| StoreError::io(&target, e))?;

        let evicted = self.prune(&dir).await?;
        tracing::debug!(
            artifact,
            backup = %target.display(),
            evicted,
            "backup snapshot written"
        );
        Ok(target)
    }

    /// Retained snapshots for `artifact`, oldest first.
    pub async fn list(&self, artifact: &str) -> Result<Vec<BackupEntry>> {
        let dir = self.layout.history_dir(artifact);
        let mut entries = Vec::new();
        for name in backup_names(&dir).await? {
            let path = dir.join(&name);
            let size_bytes = fs::metadata(&path)
                .await
                .map(|m| m.len())
                .map_err(|e| StoreError::io(&path, e))?;
            let version = name
                .strip_suffix(&format!(".{}", BACKUP_EXT))
                .unwrap_or(&name)
                .to_string();
            entries.push(BackupEntry {
                version,
                path,
                size_bytes,
            });
        }
        Ok(entries)
    }

    /// Reads one snapshot. `version` may be given with or without `.bak`.
    pub async fn read(&self, artifact: &str, version: &str) -> Result<Vec<u8>> {
        let not_found = || StoreError::BackupNotFound {
            artifact: artifact.to_string(),
            version: version.to_string(),
        };

        let stem = version
            .strip_suffix(&format!(".{}", BACKUP_EXT))
            .unwrap_or(version);
        if stem.is_empty() || stem.contains(['/', '\\']) || stem.contains("..") {
            return Err(not_found());
        }

        let path = self
            .layout
            .history_dir(artifact)
            .join(format!("{}.{}", stem, BACKUP_EXT));
        match fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(not_found()),
            Err(source) => Err(StoreError::Read { path, source }),
        }
    }

    async fn prune(&self, dir: &Path) -> Result<usize> {
        let names = backup_names(dir).await?;
        let excess = names.len().saturating_sub(self.max_backups);
        for name in &names[..excess] {
            let path = dir.join(name);
            fs::remove_file(&path)
                .await
                .map_err(|e| StoreError::io(&path, e))?;
        }
        Ok(excess)
    }

    /// Sortable version name, strictly increasing within this instance.
    fn next_version(&self) -> String {
        let now = Utc::now().trunc_subsecs(6);
        let mut last = self.last_stamp.lock();
        let stamp = match *last {
            Some(prev) if now <= prev => prev + chrono::Duration::microseconds(1),
            _ => now,
        };
        *last = Some(stamp);
        stamp.format("v%Y-%m-%dT%H-%M-%S%.6fZ").to_string()
    }
}

/// `.bak` file names in `dir`, ascending. Missing directory yields none.
async fn backup_names(dir: &Path) -> Result<Vec<String>> {
    let mut read_dir = match fs::read_dir(dir).await {
        Ok(rd) => rd,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(StoreError::io(dir, e)),
    };

    let mut names = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| StoreError::io(dir, e))?
    {
        let path = entry.path();
        if path.extension().and_then(|s| s.to_str()) == Some(BACKUP_EXT)
            && let Some(name) = path.file_name().and_then(|s| s.to_str())
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
