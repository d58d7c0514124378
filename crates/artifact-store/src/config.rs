use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the external watcher
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// How long a path must stay quiet before its change is reported.
    /// One editor save usually produces several raw events.
    pub quiet_period: Duration,
    /// How often pending paths are checked against the quiet period
    pub poll_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            quiet_period: Duration::from_millis(100),
            poll_interval: Duration::from_millis(25),
        }
    }
}

/// Configuration for an [`ArtifactStore`](crate::ArtifactStore).
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Project root that owns every artifact
    pub root: PathBuf,
    /// Window in which debounced writes to one path collapse into one
    pub debounce_window: Duration,
    /// How long a path stays marked in-flight after its write settles
    pub grace_delay: Duration,
    /// Snapshots retained per artifact, at least 1
    pub max_backups: usize,
    /// Buffered events per subscriber before the oldest are dropped
    pub event_capacity: usize,
    pub watcher: WatcherConfig,
}

impl StoreConfig {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            debounce_window: Duration::from_millis(500),
            grace_delay: Duration::from_secs(1),
            max_backups: 20,
            event_capacity: 256,
            watcher: WatcherConfig::default(),
        }
    }

    pub fn with_debounce_window(mut self, window: Duration) -> Self {
        self.debounce_window = window;
        self
    }

    pub fn with_grace_delay(mut self, delay: Duration) -> Self {
        self.grace_delay = delay;
        self
    }

    pub fn with_max_backups(mut self, max: usize) -> Self {
        self.max_backups = max.max(1);
        self
    }

    pub fn with_event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    pub fn with_watcher(mut self, watcher: WatcherConfig) -> Self {
        self.watcher = watcher;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::new("/project");
        assert_eq!(config.root, PathBuf::from("/project"));
        assert_eq!(config.debounce_window, Duration::from_millis(500));
        assert_eq!(config.grace_delay, Duration::from_secs(1));
        assert_eq!(config.max_backups, 20);
        assert_eq!(config.watcher.quiet_period, Duration::from_millis(100));
        assert_eq!(config.watcher.poll_interval, Duration::from_millis(25));
    }

    #[test]
    fn test_builders() {
        let config = StoreConfig::new("/project")
            .with_debounce_window(Duration::from_millis(50))
            .with_grace_delay(Duration::from_millis(10))
            .with_max_backups(3)
            .with_event_capacity(0);
        assert_eq!(config.debounce_window, Duration::from_millis(50));
        assert_eq!(config.grace_delay, Duration::from_millis(10));
        assert_eq!(config.max_backups, 3);
        assert_eq!(config.event_capacity, 1);
    }

    #[test]
    fn test_max_backups_keeps_at_least_one() {
        let config = StoreConfig::new("/project").with_max_backups(0);
        assert_eq!(config.max_backups, 1);
    }
}
