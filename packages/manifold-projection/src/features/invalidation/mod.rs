//! Invalidation
//!
//! File events flow in (from the watcher or the embedder), are resolved to
//! the affected (module, FQN) pairs, evict cache nodes and reach the
//! subscribed listeners in a fixed order.
//!
//! ## Structure
//! - `ports` - events, refresh requests, listener and sink traits
//! - `infrastructure/registry` - listener list with subscription handles
//! - `infrastructure/file_watcher` - notify-backed watcher feeding a sink

pub mod infrastructure;
pub mod ports;

pub use infrastructure::{InvalidationRegistry, ListenerSnapshot, ProjectionWatcher, Subscription};
pub use ports::{
    FileChangeEvent, FileEventSink, InvalidationListener, RefreshKind, RefreshRequest, WatchConfig,
};
