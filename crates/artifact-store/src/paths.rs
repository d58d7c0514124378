use crate::error::{Result, StoreError};
use std::path::{Component, Path, PathBuf};

/// Name of the directory under the project root that holds store metadata.
pub const STORE_DIR: &str = ".store";

/// A caller path that passed the guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    /// Canonical absolute path under the project root
    pub absolute: PathBuf,
    /// Root-relative path with `/` separators
    pub artifact: String,
}

/// Resolves caller-supplied paths against the project root and rejects any
/// that land outside it or inside the store's own metadata directory.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    /// Creates a guard for `root`, which must already exist.
    pub fn new<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let root = root
            .canonicalize()
            .map_err(|e| StoreError::io(root, e))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn resolve<P: AsRef<Path>>(&self, input: P) -> Result<ResolvedPath> {
        let input = input.as_ref();
        if input.as_os_str().is_empty() {
            return Err(StoreError::InvalidPath(String::new()));
        }

        let joined = if input.is_absolute() {
            input.to_path_buf()
        } else {
            self.root.join(input)
        };
        let absolute = canonicalize_existing_prefix(&normalize(&joined));

        let relative = absolute
            .strip_prefix(&self.root)
            .map_err(|_| StoreError::PathEscape(input.to_path_buf()))?;

        let artifact = to_artifact_path(relative);
        if artifact.is_empty() {
            return Err(StoreError::InvalidPath(input.display().to_string()));
        }
        if is_reserved(&artifact) {
            return Err(StoreError::ReservedPath(artifact));
        }

        Ok(ResolvedPath { absolute, artifact })
    }

    /// Maps an absolute path reported by the filesystem back to an artifact
    /// path. Returns `None` for paths outside the root or the root itself.
    pub fn artifact_of(&self, absolute: &Path) -> Option<String> {
        let relative = absolute.strip_prefix(&self.root).ok()?;
        let artifact = to_artifact_path(relative);
        (!artifact.is_empty()).then_some(artifact)
    }
}

/// True when `artifact` lives under the store metadata directory.
pub fn is_reserved(artifact: &str) -> bool {
    artifact == STORE_DIR || artifact.starts_with(&format!("{}/", STORE_DIR))
}

/// On-disk locations of store metadata.
#[derive(Debug, Clone)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn artifacts_dir(&self) -> PathBuf {
        self.root.join(STORE_DIR).join("artifacts")
    }

    pub fn history_root(&self) -> PathBuf {
        self.artifacts_dir().join("history")
    }

    pub fn history_dir(&self, artifact: &str) -> PathBuf {
        artifact
            .split('/')
            .fold(self.history_root(), |dir, part| dir.join(part))
    }

    pub fn events_log(&self) -> PathBuf {
        self.artifacts_dir().join("events.ndjson")
    }
}

/// Folds `.` and `..` without touching the filesystem.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalizes the deepest ancestor that exists and re-appends the rest,
/// so symlinks inside the tree are followed even for files not yet created.
fn canonicalize_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path;
    let mut rest = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return rest
                .iter()
                .rev()
                .fold(canonical, |acc: PathBuf, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                rest.push(name.to_os_string());
                existing = parent;
            }
            _ => return path.to_path_buf(),
        }
    }
}

fn to_artifact_path(relative: &Path) -> String {
    relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
