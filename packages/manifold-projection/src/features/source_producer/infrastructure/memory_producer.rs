//! In-memory producer
//!
//! Serves source text registered at runtime. Primary and Supplemental
//! producers return the registered text as-is; a Partial producer splices
//! its text in front of the closing brace of the prior output.

use crate::features::source_producer::ports::{
    ProduceError, ProducerKind, SourceProducer, TypeLookup,
};
use crate::shared::models::Fqn;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Callback run before text is returned, with the caller's lookup scope
pub type ProduceHook = Arc<dyn Fn(&Fqn, &dyn TypeLookup) + Send + Sync>;

#[derive(Clone)]
struct Entry {
    source: Result<String, String>,
    files: Vec<PathBuf>,
}

pub struct InMemorySourceProducer {
    name: String,
    kind: ProducerKind,
    types: RwLock<BTreeMap<Fqn, Entry>>,
    hook: RwLock<Option<ProduceHook>>,
    produce_calls: AtomicUsize,
}

impl InMemorySourceProducer {
    pub fn new(name: impl Into<String>, kind: ProducerKind) -> Self {
        Self {
            name: name.into(),
            kind,
            types: RwLock::new(BTreeMap::new()),
            hook: RwLock::new(None),
            produce_calls: AtomicUsize::new(0),
        }
    }

    pub fn primary(name: impl Into<String>) -> Self {
        Self::new(name, ProducerKind::Primary)
    }

    /// Register (or replace) a top-level type
    pub fn insert(&self, fqn: &str, source: impl Into<String>, files: Vec<PathBuf>) {
        self.types.write().insert(
            Fqn::new(fqn),
            Entry {
                source: Ok(source.into()),
                files,
            },
        );
    }

    /// Builder form of `insert`
    pub fn with_type(self, fqn: &str, source: impl Into<String>, file: impl Into<PathBuf>) -> Self {
        self.insert(fqn, source, vec![file.into()]);
        self
    }

    /// Register a type whose production fails
    pub fn insert_failing(&self, fqn: &str, message: impl Into<String>, files: Vec<PathBuf>) {
        self.types.write().insert(
            Fqn::new(fqn),
            Entry {
                source: Err(message.into()),
                files,
            },
        );
    }

    pub fn remove(&self, fqn: &str) -> bool {
        self.types.write().remove(&Fqn::new(fqn)).is_some()
    }

    pub fn set_hook(&self, hook: ProduceHook) {
        *self.hook.write() = Some(hook);
    }

    /// Number of `produce` invocations so far
    pub fn produce_calls(&self) -> usize {
        self.produce_calls.load(Ordering::SeqCst)
    }

    fn owner_of(&self, fqn: &Fqn) -> Option<Fqn> {
        let types = self.types.read();
        let mut candidate = Some(fqn.clone());
        while let Some(name) = candidate {
            if types.contains_key(&name) {
                return Some(name);
            }
            candidate = name.parent();
        }
        None
    }
}

impl SourceProducer for InMemorySourceProducer {
    fn name(&self) -> &str {
        &self.name
    }

    fn kind(&self) -> ProducerKind {
        self.kind
    }

    fn is_type(&self, fqn: &Fqn) -> bool {
        self.owner_of(fqn).is_some()
    }

    fn is_top_level_type(&self, fqn: &Fqn) -> bool {
        self.types.read().contains_key(fqn)
    }

    fn find_files_for_type(&self, fqn: &Fqn) -> Vec<PathBuf> {
        match self.owner_of(fqn) {
            Some(owner) => self
                .types
                .read()
                .get(&owner)
                .map(|e| e.files.clone())
                .unwrap_or_default(),
            None => Vec::new(),
        }
    }

    fn produce(
        &self,
        fqn: &Fqn,
        prior: Option<&str>,
        lookup: &dyn TypeLookup,
    ) -> Result<String, ProduceError> {
        self.produce_calls.fetch_add(1, Ordering::SeqCst);
        let hook = self.hook.read().clone();
        if let Some(hook) = hook {
            hook(fqn, lookup);
        }

        let entry = self
            .types
            .read()
            .get(fqn)
            .cloned()
            .ok_or_else(|| ProduceError::NotFound(fqn.clone()))?;
        let text = entry.source.map_err(ProduceError::Failed)?;

        match (self.kind, prior) {
            (ProducerKind::Partial, Some(prior)) => match prior.rfind('}') {
                Some(idx) => Ok(format!("{}{}\n{}", &prior[..idx], text, &prior[idx..])),
                None => Ok(format!("{}\n{}", prior, text)),
            },
            _ => Ok(text),
        }
    }

    fn types_for_file(&self, file: &Path) -> Vec<Fqn> {
        self.types
            .read()
            .iter()
            .filter(|(_, e)| e.files.iter().any(|f| f == file))
            .map(|(fqn, _)| fqn.clone())
            .collect()
    }

    fn all_type_names(&self) -> Vec<Fqn> {
        self.types.read().keys().cloned().collect()
    }
}
