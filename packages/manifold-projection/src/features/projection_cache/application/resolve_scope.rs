//! Lookup scope
//!
//! One scope per top-level request. It carries the set of FQNs currently
//! being built on this call chain, so a producer or synthesis pass that
//! asks for the type under construction gets `InProgress` instead of
//! recursing. It also records which projections were consulted, which the
//! augmentation memo uses as its ancestry.

use super::ProjectionCache;
use crate::features::projection_cache::domain::{ModuleId, ModuleRegistry, Projection};
use crate::features::source_producer::TypeLookup;
use crate::shared::models::{DeclId, Fingerprint, Fqn};
use rustc_hash::FxHashSet;
use std::cell::RefCell;
use std::sync::Arc;

/// Outcome of a lookup
#[derive(Debug, Clone)]
pub enum Resolution {
    Found(Arc<Projection>),
    NotFound,
    /// The name is being built further up this call chain
    InProgress,
}

impl Resolution {
    pub fn found(&self) -> Option<&Arc<Projection>> {
        match self {
            Resolution::Found(p) => Some(p),
            _ => None,
        }
    }

    pub fn into_found(self) -> Option<Arc<Projection>> {
        match self {
            Resolution::Found(p) => Some(p),
            _ => None,
        }
    }

    pub fn is_found(&self) -> bool {
        matches!(self, Resolution::Found(_))
    }

    pub fn is_in_progress(&self) -> bool {
        matches!(self, Resolution::InProgress)
    }
}

/// A consulted name and the fingerprint it resolved to (`None` if absent)
pub type Ancestry = Vec<(Fqn, Option<Fingerprint>)>;

pub struct ResolveScope<'s> {
    cache: &'s ProjectionCache,
    modules: &'s ModuleRegistry,
    module: ModuleId,
    in_progress: RefCell<FxHashSet<Fqn>>,
    augmenting: RefCell<FxHashSet<DeclId>>,
    recording: RefCell<Vec<Ancestry>>,
}

/// Removes its FQN from the in-progress set on drop
pub struct InProgressGuard<'g> {
    set: &'g RefCell<FxHashSet<Fqn>>,
    fqn: Fqn,
}

impl Drop for InProgressGuard<'_> {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(&self.fqn);
    }
}

/// Removes its declaration from the augmenting set on drop
pub struct AugmentGuard<'g> {
    set: &'g RefCell<FxHashSet<DeclId>>,
    id: DeclId,
}

impl Drop for AugmentGuard<'_> {
    fn drop(&mut self) {
        self.set.borrow_mut().remove(&self.id);
    }
}

impl<'s> ResolveScope<'s> {
    pub fn new(cache: &'s ProjectionCache, modules: &'s ModuleRegistry, module: ModuleId) -> Self {
        Self {
            cache,
            modules,
            module,
            in_progress: RefCell::new(FxHashSet::default()),
            augmenting: RefCell::new(FxHashSet::default()),
            recording: RefCell::new(Vec::new()),
        }
    }

    /// Module lookups start from
    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn modules(&self) -> &'s ModuleRegistry {
        self.modules
    }

    pub fn cache(&self) -> &'s ProjectionCache {
        self.cache
    }

    pub fn resolve(&self, fqn: &str) -> Resolution {
        self.resolve_in(self.module, fqn)
    }

    pub fn resolve_in(&self, module: ModuleId, fqn: &str) -> Resolution {
        let resolution = self.cache.resolve(self, module, fqn);
        match &resolution {
            Resolution::Found(p) => self.record(p.fqn().clone(), Some(p.fingerprint())),
            Resolution::NotFound => {
                if let Some(fqn) = Fqn::parse(fqn) {
                    self.record(fqn, None);
                }
            }
            Resolution::InProgress => {}
        }
        resolution
    }

    pub fn is_in_progress(&self, fqn: &Fqn) -> bool {
        self.in_progress.borrow().contains(fqn)
    }

    /// Mark `fqn` as being built; `None` if it already is
    pub fn enter(&self, fqn: &Fqn) -> Option<InProgressGuard<'_>> {
        if !self.in_progress.borrow_mut().insert(fqn.clone()) {
            return None;
        }
        Some(InProgressGuard {
            set: &self.in_progress,
            fqn: fqn.clone(),
        })
    }

    /// Mark a declaration as being augmented; `None` if it already is
    pub fn enter_augmentation(&self, id: DeclId) -> Option<AugmentGuard<'_>> {
        if !self.augmenting.borrow_mut().insert(id) {
            return None;
        }
        Some(AugmentGuard {
            set: &self.augmenting,
            id,
        })
    }

    /// Start collecting consulted names into a new frame
    pub fn begin_recording(&self) {
        self.recording.borrow_mut().push(Vec::new());
    }

    /// Close the innermost frame. Its names also count as consulted by
    /// the enclosing frame.
    pub fn end_recording(&self) -> Ancestry {
        let mut frames = self.recording.borrow_mut();
        let frame = frames.pop().unwrap_or_default();
        if let Some(parent) = frames.last_mut() {
            parent.extend(frame.iter().cloned());
        }
        frame
    }

    /// Add names consulted elsewhere (e.g. by a memoized result)
    pub fn note_ancestry(&self, ancestry: &[(Fqn, Option<Fingerprint>)]) {
        if let Some(frame) = self.recording.borrow_mut().last_mut() {
            frame.extend(ancestry.iter().cloned());
        }
    }

    fn record(&self, fqn: Fqn, fingerprint: Option<Fingerprint>) {
        if let Some(frame) = self.recording.borrow_mut().last_mut() {
            frame.push((fqn, fingerprint));
        }
    }
}

impl TypeLookup for ResolveScope<'_> {
    fn lookup(&self, fqn: &str) -> Resolution {
        self.resolve(fqn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::projection_cache::ProjectionMetrics;
    use prometheus::Registry;

    fn fixture() -> (ProjectionCache, ModuleRegistry) {
        let metrics = ProjectionMetrics::new(&Registry::new(), "scope").unwrap();
        (ProjectionCache::new(Arc::new(metrics)), ModuleRegistry::new())
    }

    #[test]
    fn test_enter_is_exclusive_until_guard_drops() {
        let (cache, modules) = fixture();
        let module = modules.add_module("m");
        let scope = ResolveScope::new(&cache, &modules, module);
        let fqn = Fqn::new("a.A");
        {
            let _guard = scope.enter(&fqn).unwrap();
            assert!(scope.is_in_progress(&fqn));
            assert!(scope.enter(&fqn).is_none());
        }
        assert!(!scope.is_in_progress(&fqn));
        assert!(scope.enter(&fqn).is_some());
    }

    #[test]
    fn test_recording_frames_merge_into_parent() {
        let (cache, modules) = fixture();
        let module = modules.add_module("m");
        let scope = ResolveScope::new(&cache, &modules, module);

        scope.begin_recording();
        scope.resolve("a.Outer");
        scope.begin_recording();
        scope.resolve("a.Inner");
        let inner = scope.end_recording();
        let outer = scope.end_recording();

        assert_eq!(inner, vec![(Fqn::new("a.Inner"), None)]);
        assert_eq!(
            outer,
            vec![(Fqn::new("a.Outer"), None), (Fqn::new("a.Inner"), None)]
        );
    }

    #[test]
    fn test_invalid_names_are_not_recorded() {
        let (cache, modules) = fixture();
        let module = modules.add_module("m");
        let scope = ResolveScope::new(&cache, &modules, module);
        scope.begin_recording();
        assert!(!scope.resolve("not a name").is_found());
        assert!(scope.end_recording().is_empty());
    }
}
