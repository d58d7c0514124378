use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Path escapes project root: {0}")]
    PathEscape(PathBuf),

    #[error("Path is reserved for store metadata: {0}")]
    ReservedPath(String),

    #[error("Invalid artifact path: {0:?}")]
    InvalidPath(String),

    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read artifact {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Backup not found: {artifact}@{version}")]
    BackupNotFound { artifact: String, version: String },

    #[error("Write queue closed")]
    QueueClosed,

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Watcher error: {0}")]
    Watcher(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StoreError::Io {
            path: path.into(),
            source,
        }
    }

    /// True for errors raised before the filesystem was touched.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            StoreError::PathEscape(_) | StoreError::ReservedPath(_) | StoreError::InvalidPath(_)
        )
    }
}

#[cfg(feature = "watcher")]
impl From<notify::Error> for StoreError {
    fn from(e: notify::Error) -> Self {
        StoreError::Watcher(e.to_string())
    }
}
