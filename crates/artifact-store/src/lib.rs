#![doc = include_str!("../README.md")]

pub mod audit;
pub mod backup;
pub mod broadcast;
pub mod config;
pub mod debounce;
pub mod error;
pub mod inflight;
pub mod paths;
pub mod queue;
pub mod store;
pub mod types;
#[cfg(feature = "watcher")]
pub mod watcher;
pub mod writer;

pub use audit::AuditLogger;
pub use backup::BackupManager;
pub use broadcast::{ChangeBroadcaster, StoreEvent, Subscription};
pub use config::{StoreConfig, WatcherConfig};
pub use debounce::{DebounceCoalescer, DebounceHandle};
pub use error::{Result, StoreError};
pub use inflight::InFlight;
pub use paths::{PathGuard, ResolvedPath, STORE_DIR, StoreLayout};
pub use queue::{QueueHandle, WriteQueue};
pub use store::ArtifactStore;
pub use types::{
    Action, Actor, AuditRecord, BackupEntry, Modality, WriteOptions, WriteOutcome, WriteReceipt,
};
#[cfg(feature = "watcher")]
pub use watcher::{ExternalWatcher, WatcherHandle};
pub use writer::AtomicWriter;
