//! ProjectionWatcher - notify-backed source watcher
//!
//! Watches a source root, filters by extension and ignore pattern,
//! coalesces bursts per path and forwards the settled events to a
//! `FileEventSink` (normally the session) on a background thread.

use crate::errors::{ProjectionError, Result};
use crate::features::invalidation::ports::{FileChangeEvent, FileEventSink, WatchConfig};
use notify::event::ModifyKind;
use notify::{Config as NotifyConfig, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

pub struct ProjectionWatcher {
    config: WatchConfig,
    sink: Arc<dyn FileEventSink>,
    watcher: Option<RecommendedWatcher>,
    processor: Option<thread::JoinHandle<()>>,
    running: Arc<AtomicBool>,
}

impl ProjectionWatcher {
    /// # Errors
    /// The root path is missing or not a directory.
    pub fn new(config: WatchConfig, sink: Arc<dyn FileEventSink>) -> Result<Self> {
        if !config.root_path.is_dir() {
            return Err(ProjectionError::watcher(format!(
                "Root path is not a directory: {}",
                config.root_path.display()
            )));
        }
        Ok(Self {
            config,
            sink,
            watcher: None,
            processor: None,
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Start watching; events are delivered from a background thread
    pub fn start(&mut self) -> Result<()> {
        if self.is_running() {
            return Err(ProjectionError::watcher("Watcher already running"));
        }

        let (event_tx, event_rx) = channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: std::result::Result<Event, notify::Error>| match res {
                Ok(event) => {
                    let _ = event_tx.send(event);
                }
                Err(e) => tracing::warn!("File watcher error: {}", e),
            },
            NotifyConfig::default(),
        )?;

        let mode = if self.config.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        watcher.watch(&self.config.root_path, mode)?;
        self.watcher = Some(watcher);

        self.running.store(true, Ordering::Release);
        let sink = self.sink.clone();
        let config = self.config.clone();
        let running = self.running.clone();
        self.processor = Some(thread::spawn(move || {
            Self::process_events(event_rx, sink, config, running);
        }));

        tracing::info!("Watching {}", self.config.root_path.display());
        Ok(())
    }

    /// Stop watching and join the processor thread
    pub fn stop(&mut self) -> Result<()> {
        if !self.is_running() {
            return Ok(());
        }
        self.running.store(false, Ordering::Release);
        self.watcher = None;
        if let Some(processor) = self.processor.take() {
            processor
                .join()
                .map_err(|_| ProjectionError::watcher("Failed to join processor thread"))?;
        }
        tracing::info!("Stopped watching {}", self.config.root_path.display());
        Ok(())
    }

    /// Trailing-edge debounce: each path holds its latest event until the
    /// path has been quiet for the debounce window. Whatever is still held
    /// when the channel closes or the watcher stops is flushed.
    fn process_events(
        event_rx: Receiver<Event>,
        sink: Arc<dyn FileEventSink>,
        config: WatchConfig,
        running: Arc<AtomicBool>,
    ) {
        // path -> pending event and when the path last changed
        let mut pending: HashMap<PathBuf, (FileChangeEvent, Instant)> = HashMap::new();
        let tick = config
            .debounce_duration
            .clamp(Duration::from_millis(1), Duration::from_millis(50));

        while running.load(Ordering::Acquire) {
            match event_rx.recv_timeout(tick) {
                Ok(event) => {
                    if let Some(change) = Self::convert_event(&event, &config) {
                        let path = change.path().to_path_buf();
                        let merged = match pending.remove(&path) {
                            Some((held, _)) => Self::coalesce(held, change),
                            None => change,
                        };
                        pending.insert(path, (merged, Instant::now()));
                    }
                }
                Err(RecvTimeoutError::Timeout) => {}
                Err(RecvTimeoutError::Disconnected) => break,
            }
            let now = Instant::now();
            Self::flush(&mut pending, sink.as_ref(), |seen| {
                now.duration_since(seen) >= config.debounce_duration
            });
        }
        Self::flush(&mut pending, sink.as_ref(), |_| true);
    }

    /// Combine a held event with a newer one for the same path
    fn coalesce(held: FileChangeEvent, next: FileChangeEvent) -> FileChangeEvent {
        match (held, next) {
            // Still new to every listener
            (FileChangeEvent::Created(path), FileChangeEvent::Modified(_)) => {
                FileChangeEvent::Created(path)
            }
            // Replaced in place
            (FileChangeEvent::Deleted(path), FileChangeEvent::Created(_)) => {
                FileChangeEvent::Modified(path)
            }
            (_, next) => next,
        }
    }

    /// Deliver held events whose last change satisfies `settled`, in path
    /// order
    fn flush(
        pending: &mut HashMap<PathBuf, (FileChangeEvent, Instant)>,
        sink: &dyn FileEventSink,
        settled: impl Fn(Instant) -> bool,
    ) {
        let mut ready: Vec<PathBuf> = pending
            .iter()
            .filter(|(_, (_, seen))| settled(*seen))
            .map(|(path, _)| path.clone())
            .collect();
        ready.sort();
        for path in ready {
            if let Some((change, _)) = pending.remove(&path) {
                tracing::debug!("File {}: {}", change.event_type(), change.path().display());
                sink.on_file_event(change);
            }
        }
    }

    fn convert_event(event: &Event, config: &WatchConfig) -> Option<FileChangeEvent> {
        let path = event.paths.first()?;

        if Self::should_ignore(path, &config.ignore_patterns) {
            return None;
        }
        if !config.extensions.is_empty() {
            let ext = path.extension()?.to_str()?;
            if !config.extensions.iter().any(|e| e == ext) {
                return None;
            }
        }

        match event.kind {
            EventKind::Create(_) => Some(FileChangeEvent::Created(path.clone())),
            EventKind::Modify(ModifyKind::Data(_)) => Some(FileChangeEvent::Modified(path.clone())),
            EventKind::Modify(ModifyKind::Name(_)) | EventKind::Modify(ModifyKind::Any) | EventKind::Any => {
                if path.exists() {
                    Some(FileChangeEvent::Modified(path.clone()))
                } else {
                    Some(FileChangeEvent::Deleted(path.clone()))
                }
            }
            EventKind::Remove(_) => Some(FileChangeEvent::Deleted(path.clone())),
            _ => None,
        }
    }

    /// `**/dir/**` matches a path component; other patterns match substrings
    fn should_ignore(path: &Path, ignore_patterns: &[String]) -> bool {
        let Some(path_str) = path.to_str() else {
            return false;
        };
        ignore_patterns.iter().any(|pattern| {
            if pattern.contains("**") {
                pattern
                    .split("**")
                    .map(|part| part.trim_matches('/'))
                    .filter(|part| !part.is_empty())
                    .any(|dir| {
                        path_str.contains(&format!("/{}/", dir))
                            || path_str.ends_with(&format!("/{}", dir))
                            || path_str.starts_with(&format!("{}/", dir))
                    })
            } else {
                path_str.contains(pattern.as_str())
            }
        })
    }
}

impl Drop for ProjectionWatcher {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}
