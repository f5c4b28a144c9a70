//! Test fixtures
//!
//! `TestProject` wraps a session with one module backed by an in-memory
//! producer. Each type is stored under `/src/<package path>/<Name>.java`.

use manifold_projection::{
    Augmentation, FileChangeEvent, InMemorySourceProducer, InvalidationListener, ModuleId,
    Projection, ProjectionConfig, ProjectionSession, RefreshKind, RefreshRequest,
};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;

/// Source file backing `fqn`
pub fn file_for(fqn: &str) -> PathBuf {
    PathBuf::from(format!("/src/{}.java", fqn.replace('.', "/")))
}

pub struct TestProject {
    pub session: ProjectionSession,
    pub module: ModuleId,
    pub producer: Arc<InMemorySourceProducer>,
}

impl TestProject {
    pub fn new() -> Self {
        Self::with_config(ProjectionConfig::default())
    }

    pub fn with_config(config: ProjectionConfig) -> Self {
        let session = ProjectionSession::new(config).unwrap();
        let module = session.add_module("app");
        let producer = Arc::new(InMemorySourceProducer::primary("mem"));
        session.add_producer(module, producer.clone()).unwrap();
        Self {
            session,
            module,
            producer,
        }
    }

    /// Store (or replace) the source of `fqn`
    pub fn add(&self, fqn: &str, source: &str) -> PathBuf {
        let file = file_for(fqn);
        self.producer.insert(fqn, source, vec![file.clone()]);
        file
    }

    pub fn get(&self, fqn: &str) -> Arc<Projection> {
        self.session
            .get_projection(self.module, fqn)
            .unwrap_or_else(|| panic!("{} should resolve", fqn))
    }

    pub fn augment(&self, fqn: &str) -> Arc<Augmentation> {
        let projection = self.get(fqn);
        self.session.augmentation(&projection)
    }

    /// Replace the source of `fqn` and report the change
    pub fn edit(&self, fqn: &str, source: &str) -> Vec<RefreshRequest> {
        let file = self.add(fqn, source);
        self.session.dispatch(FileChangeEvent::Modified(file))
    }

    pub fn create(&self, fqn: &str, source: &str) -> Vec<RefreshRequest> {
        let file = self.add(fqn, source);
        self.session.dispatch(FileChangeEvent::Created(file))
    }

    pub fn delete(&self, fqn: &str) -> Vec<RefreshRequest> {
        let file = file_for(fqn);
        self.producer.remove(fqn);
        self.session.dispatch(FileChangeEvent::Deleted(file))
    }
}

/// One notification as seen by a `RecordingListener`
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heard {
    Types {
        listener: &'static str,
        kind: RefreshKind,
        types: Vec<String>,
    },
    All {
        listener: &'static str,
    },
}

pub type Journal = Arc<Mutex<Vec<Heard>>>;

pub fn journal() -> Journal {
    Arc::new(Mutex::new(Vec::new()))
}

/// Appends every notification to a shared journal
pub struct RecordingListener {
    name: &'static str,
    journal: Journal,
    /// Optional callback run on each per-type notification
    on_types: Option<Box<dyn Fn(&RefreshRequest) + Send + Sync>>,
}

impl RecordingListener {
    pub fn new(name: &'static str, journal: &Journal) -> Arc<dyn InvalidationListener> {
        Arc::new(Self {
            name,
            journal: journal.clone(),
            on_types: None,
        })
    }

    pub fn observing(
        name: &'static str,
        journal: &Journal,
        on_types: impl Fn(&RefreshRequest) + Send + Sync + 'static,
    ) -> Arc<dyn InvalidationListener> {
        Arc::new(Self {
            name,
            journal: journal.clone(),
            on_types: Some(Box::new(on_types)),
        })
    }
}

impl InvalidationListener for RecordingListener {
    fn refreshed_types(&self, request: &RefreshRequest) {
        if let Some(on_types) = &self.on_types {
            on_types(request);
        }
        self.journal.lock().push(Heard::Types {
            listener: self.name,
            kind: request.kind,
            types: request.types.iter().map(|t| t.to_string()).collect(),
        });
    }

    fn refreshed(&self) {
        self.journal.lock().push(Heard::All { listener: self.name });
    }
}

/// Listener names in delivery order
pub fn order(journal: &Journal) -> Vec<&'static str> {
    journal
        .lock()
        .iter()
        .map(|h| match h {
            Heard::Types { listener, .. } | Heard::All { listener } => *listener,
        })
        .collect()
}
