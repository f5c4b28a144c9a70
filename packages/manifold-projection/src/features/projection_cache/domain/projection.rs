//! Projections and cache nodes
//!
//! A `Projection` owns its parsed declaration rather than wrapping a full
//! type interface: callers get the declaration, its backing files, its
//! validity, and lazily parsed extension classes from supplemental
//! producers.

use super::ModuleId;
use crate::features::source_producer::SourceProducer;
use crate::shared::models::{DeclId, Declaration, Diagnostic, Fingerprint, Fqn};
use once_cell::sync::OnceCell;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Cache entry for one (module, FQN). Absent keys have no entry.
#[derive(Debug, Clone)]
pub enum ProjectionNode {
    /// Looked up before; no producer claims the name
    Miss,
    Present(Arc<Projection>),
}

impl ProjectionNode {
    pub fn is_miss(&self) -> bool {
        matches!(self, ProjectionNode::Miss)
    }

    pub fn projection(&self) -> Option<&Arc<Projection>> {
        match self {
            ProjectionNode::Present(p) => Some(p),
            ProjectionNode::Miss => None,
        }
    }
}

/// Extension classes contributed by supplemental producers
#[derive(Debug, Default)]
pub struct ExtensionSet {
    pub classes: Vec<Arc<Declaration>>,
    pub diagnostics: Vec<Diagnostic>,
}

pub struct Projection {
    declaration: Arc<Declaration>,
    module: ModuleId,
    files: Vec<PathBuf>,
    valid: AtomicBool,
    supplements: Vec<Arc<dyn SourceProducer>>,
    extensions: OnceCell<ExtensionSet>,
}

impl Projection {
    pub fn new(
        declaration: Arc<Declaration>,
        module: ModuleId,
        files: Vec<PathBuf>,
        supplements: Vec<Arc<dyn SourceProducer>>,
    ) -> Self {
        Self {
            declaration,
            module,
            files,
            valid: AtomicBool::new(true),
            supplements,
            extensions: OnceCell::new(),
        }
    }

    pub fn declaration(&self) -> &Declaration {
        &self.declaration
    }

    pub fn declaration_arc(&self) -> Arc<Declaration> {
        self.declaration.clone()
    }

    pub fn id(&self) -> DeclId {
        self.declaration.id
    }

    pub fn fqn(&self) -> &Fqn {
        &self.declaration.fqn
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.declaration.fingerprint
    }

    /// Module whose cache holds this projection
    pub fn module(&self) -> ModuleId {
        self.module
    }

    /// Backing source files, for navigation and invalidation
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn is_valid(&self) -> bool {
        self.valid.load(Ordering::Acquire)
    }

    /// Mark stale; the next lookup recomputes instead of returning this
    pub fn invalidate(&self) {
        self.valid.store(false, Ordering::Release);
    }

    pub fn is_error(&self) -> bool {
        self.declaration.is_error()
    }

    pub fn supplements(&self) -> &[Arc<dyn SourceProducer>] {
        &self.supplements
    }

    /// Extension classes, computed at most once
    pub fn extensions_or_init(&self, init: impl FnOnce() -> ExtensionSet) -> &ExtensionSet {
        self.extensions.get_or_init(init)
    }
}

impl std::fmt::Debug for Projection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Projection")
            .field("fqn", self.fqn())
            .field("id", &self.id())
            .field("module", &self.module)
            .field("files", &self.files)
            .field("valid", &self.is_valid())
            .field("supplements", &self.supplements.len())
            .finish()
    }
}
