mod file_watcher;
mod registry;

pub use file_watcher::ProjectionWatcher;
pub use registry::{InvalidationRegistry, ListenerSnapshot, Subscription};
