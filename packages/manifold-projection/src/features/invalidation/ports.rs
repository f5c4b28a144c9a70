//! Ports - invalidation events and listener interfaces

use crate::features::projection_cache::ModuleId;
use crate::shared::models::Fqn;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File change reported by the watcher or the embedder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileChangeEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
}

impl FileChangeEvent {
    pub fn path(&self) -> &Path {
        match self {
            FileChangeEvent::Created(p) => p,
            FileChangeEvent::Modified(p) => p,
            FileChangeEvent::Deleted(p) => p,
        }
    }

    pub fn event_type(&self) -> &str {
        match self {
            FileChangeEvent::Created(_) => "created",
            FileChangeEvent::Modified(_) => "modified",
            FileChangeEvent::Deleted(_) => "deleted",
        }
    }

    pub fn refresh_kind(&self) -> RefreshKind {
        match self {
            FileChangeEvent::Created(_) => RefreshKind::Creation,
            FileChangeEvent::Modified(_) => RefreshKind::Modification,
            FileChangeEvent::Deleted(_) => RefreshKind::Deletion,
        }
    }

    /// Module descriptors reset the whole session
    pub fn is_module_descriptor(&self) -> bool {
        self.path()
            .file_name()
            .map(|name| name == "module-info.java")
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RefreshKind {
    Creation,
    Modification,
    Deletion,
}

/// Types in one module affected by one file event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub file: PathBuf,
    pub module: ModuleId,
    pub types: Vec<Fqn>,
    pub kind: RefreshKind,
}

/// Receives invalidation notifications. Implementations must not block.
pub trait InvalidationListener: Send + Sync {
    /// Types backed by a changed file
    fn refreshed_types(&self, request: &RefreshRequest);

    /// Every projection was dropped
    fn refreshed(&self);
}

/// Consumer of debounced file events
pub trait FileEventSink: Send + Sync {
    fn on_file_event(&self, event: FileChangeEvent);
}

/// File watcher settings
#[derive(Debug, Clone)]
pub struct WatchConfig {
    /// Directory to watch
    pub root_path: PathBuf,

    /// Extensions to report; empty reports every file
    pub extensions: Vec<String>,

    /// Repeated events for a path inside this window are dropped
    pub debounce_duration: Duration,

    /// Path substrings or `**/dir/**` patterns to ignore
    pub ignore_patterns: Vec<String>,

    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            root_path: PathBuf::from("."),
            extensions: vec!["java".to_string()],
            debounce_duration: Duration::from_millis(100),
            ignore_patterns: vec![
                "**/.git/**".to_string(),
                "**/target/**".to_string(),
                "**/build/**".to_string(),
                "**/out/**".to_string(),
            ],
            recursive: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_kinds() {
        let event = FileChangeEvent::Deleted(PathBuf::from("/src/a/A.java"));
        assert_eq!(event.event_type(), "deleted");
        assert_eq!(event.refresh_kind(), RefreshKind::Deletion);
        assert_eq!(event.path(), Path::new("/src/a/A.java"));
        assert!(!event.is_module_descriptor());
    }

    #[test]
    fn test_module_descriptor_detection() {
        let event = FileChangeEvent::Modified(PathBuf::from("/src/module-info.java"));
        assert!(event.is_module_descriptor());
    }
}
