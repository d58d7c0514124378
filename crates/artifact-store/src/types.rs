use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Origin of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Actor {
    User,
    Agent,
}

impl Actor {
    pub fn as_str(&self) -> &'static str {
        match self {
            Actor::User => "user",
            Actor::Agent => "agent",
        }
    }
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for Actor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "user" => Ok(Actor::User),
            "agent" => Ok(Actor::Agent),
            other => Err(format!("unknown actor: {}", other)),
        }
    }
}

/// Kind of mutation recorded in the audit log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Action {
    Create,
    Update,
    /// Reserved; the store never deletes artifacts itself.
    Delete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "CREATE",
            Action::Update => "UPDATE",
            Action::Delete => "DELETE",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Content category of an artifact, inferred from its file name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    Editor,
    Whiteboard,
    Presentation,
}

const WHITEBOARD_SUFFIXES: &[&str] = &[".excalidraw", ".tldr", ".canvas", ".whiteboard.json"];
const PRESENTATION_SUFFIXES: &[&str] = &[".slides.md", ".deck.json", ".pptx", ".key"];

impl Modality {
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let name = path
            .as_ref()
            .file_name()
            .map(|n| n.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();

        if WHITEBOARD_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            Modality::Whiteboard
        } else if PRESENTATION_SUFFIXES.iter().any(|s| name.ends_with(s)) {
            Modality::Presentation
        } else {
            Modality::Editor
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Editor => "editor",
            Modality::Whiteboard => "whiteboard",
            Modality::Presentation => "presentation",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// Per-call write options. Only embedded into the resulting audit record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOptions {
    pub actor: Actor,
    pub reason: String,
    /// Coalesce with other writes to the same path inside the debounce window.
    pub debounce: bool,
    /// Skip the pre-write backup snapshot.
    pub skip_snapshot: bool,
    pub tool_call_id: Option<String>,
}

impl WriteOptions {
    pub fn new(actor: Actor, reason: impl Into<String>) -> Self {
        Self {
            actor,
            reason: reason.into(),
            debounce: false,
            skip_snapshot: false,
            tool_call_id: None,
        }
    }

    pub fn user(reason: impl Into<String>) -> Self {
        Self::new(Actor::User, reason)
    }

    pub fn agent(reason: impl Into<String>) -> Self {
        Self::new(Actor::Agent, reason)
    }

    pub fn debounced(mut self) -> Self {
        self.debounce = true;
        self
    }

    pub fn without_snapshot(mut self) -> Self {
        self.skip_snapshot = true;
        self
    }

    pub fn with_tool_call_id(mut self, id: impl Into<String>) -> Self {
        self.tool_call_id = Some(id.into());
        self
    }
}

/// Details of a committed write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteReceipt {
    pub artifact: String,
    pub absolute: PathBuf,
    pub action: Action,
    pub modality: Modality,
    pub size_bytes: u64,
}

/// Result of a write request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum WriteOutcome {
    Committed(WriteReceipt),
    /// A newer debounced request for the same path replaced this one before
    /// it reached the write queue. Nothing was written on its behalf.
    Superseded,
}

impl WriteOutcome {
    pub fn receipt(&self) -> Option<&WriteReceipt> {
        match self {
            WriteOutcome::Committed(r) => Some(r),
            WriteOutcome::Superseded => None,
        }
    }

    pub fn is_superseded(&self) -> bool {
        matches!(self, WriteOutcome::Superseded)
    }
}

/// One line of `events.ndjson`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub ts: String,
    pub artifact: String,
    pub action: Action,
    pub actor: Actor,
    pub reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
    pub size_bytes: u64,
}

/// A retained backup snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BackupEntry {
    /// File stem, e.g. `v2026-01-29T10-00-00.000000Z`.
    pub version: String,
    pub path: PathBuf,
    pub size_bytes: u64,
}
