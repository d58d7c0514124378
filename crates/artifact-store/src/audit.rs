use crate::error::{Result, StoreError};
use crate::types::{Action, AuditRecord, WriteOptions};
use chrono::{SecondsFormat, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;

/// Append-only NDJSON log shared by all artifacts.
#[derive(Debug, Clone)]
pub struct AuditLogger {
    log_path: PathBuf,
}

impl AuditLogger {
    pub fn new<P: Into<PathBuf>>(log_path: P) -> Self {
        Self {
            log_path: log_path.into(),
        }
    }

    pub fn log_path(&self) -> &Path {
        &self.log_path
    }

    /// Appends one record for a committed write. Failures are logged and
    /// swallowed; the returned record is `None` when nothing was appended.
    pub async fn record(
        &self,
        artifact: &str,
        committed: &Path,
        opts: &WriteOptions,
        action: Action,
    ) -> Option<AuditRecord> {
        match self.try_record(artifact, committed, opts, action).await {
            Ok(record) => Some(record),
            Err(e) => {
                tracing::warn!(artifact, %action, error = %e, "audit append failed");
                None
            }
        }
    }

    async fn try_record(
        &self,
        artifact: &str,
        committed: &Path,
        opts: &WriteOptions,
        action: Action,
    ) -> Result<AuditRecord> {
        let size_bytes = fs::metadata(committed)
            .await
            .map_err(|e| StoreError::io(committed, e))?
            .len();

        let record = AuditRecord {
            ts: Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
            artifact: artifact.to_string(),
            action,
            actor: opts.actor,
            reason: opts.reason.clone(),
            tool_call_id: opts.tool_call_id.clone(),
            size_bytes,
        };

        let mut line = serde_json::to_string(&record)?;
        line.push('\n');

        if let Some(parent) = self.log_path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| StoreError::io(parent, e))?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_path)
            .await
            .map_err(|e| StoreError::io(&self.log_path, e))?;
        file.write_all(line.as_bytes())
            .await
            .map_err(|e| StoreError::io(&self.log_path, e))?;
        file.flush()
            .await
            .map_err(|e| StoreError::io(&self.log_path, e))?;

        Ok(record)
    }

    /// Reads every record back, skipping lines that fail to parse.
    pub async fn read_all(&self) -> Result<Vec<AuditRecord>> {
        let content = match fs::read_to_string(&self.log_path).await {
            Ok(c) => c,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Read {
                    path: self.log_path.clone(),
                    source,
                });
            }
        };

        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => {
                    tracing::warn!(line = idx + 1, error = %e, "skipping malformed audit line");
                }
            }
        }
        Ok(records)
    }
}
