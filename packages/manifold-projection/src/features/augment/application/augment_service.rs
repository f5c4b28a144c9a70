//! Augmentation service
//!
//! Runs the synthesis passes for a projection and memoizes the result per
//! declaration revision. A memo entry carries the ancestry recorded while
//! it was computed; it is served only while every consulted name still
//! resolves to the same fingerprint.

use crate::features::augment::domain::{Augmentation, MemberBody};
use crate::features::augment::infrastructure::{
    extension_members, load_extensions, DelegationLinker, ExplicitProperties, PropertyInference,
    Telescoper, TypeAliases, TypeHierarchy,
};
use crate::features::projection_cache::{
    Ancestry, Projection, ProjectionMetrics, Resolution, ResolveScope,
};
use crate::shared::models::{DeclId, Fqn, Method};
use dashmap::DashMap;
use rustc_hash::FxHashSet;
use std::sync::Arc;

/// Which synthesis passes run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SynthesisSettings {
    pub properties: bool,
    pub delegation: bool,
    pub params: bool,
    pub extensions: bool,
    pub aliases: bool,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            properties: true,
            delegation: true,
            params: true,
            extensions: true,
            aliases: true,
        }
    }
}

#[derive(Clone)]
struct MemoEntry {
    ancestry: Ancestry,
    augmentation: Arc<Augmentation>,
}

pub struct AugmentService {
    settings: SynthesisSettings,
    memo: DashMap<DeclId, MemoEntry>,
    metrics: Arc<ProjectionMetrics>,
}

impl AugmentService {
    pub fn new(settings: SynthesisSettings, metrics: Arc<ProjectionMetrics>) -> Self {
        Self {
            settings,
            memo: DashMap::new(),
            metrics,
        }
    }

    pub fn settings(&self) -> SynthesisSettings {
        self.settings
    }

    /// Synthetic members of `projection`, computed or served from the memo
    pub fn augment(&self, scope: &ResolveScope<'_>, projection: &Arc<Projection>) -> Arc<Augmentation> {
        if projection.is_error() {
            return Arc::new(Augmentation::default());
        }

        // Clone out so no map guard is held while re-resolving
        let cached = self.memo.get(&projection.id()).map(|e| e.value().clone());
        if let Some(entry) = cached {
            if projection.is_valid() && self.is_current(scope, projection, &entry.ancestry) {
                scope.note_ancestry(&entry.ancestry);
                self.metrics.memo_hits.inc();
                return entry.augmentation;
            }
            self.memo.remove(&projection.id());
        }

        let Some(_guard) = scope.enter_augmentation(projection.id()) else {
            tracing::trace!("Cyclic augmentation of {} short-circuited", projection.fqn());
            return Arc::new(Augmentation::default());
        };

        scope.begin_recording();
        let augmentation = Arc::new(self.compute(scope, projection));
        let ancestry = dedup(scope.end_recording());

        if projection.is_valid() {
            self.memo.insert(
                projection.id(),
                MemoEntry {
                    ancestry,
                    augmentation: augmentation.clone(),
                },
            );
        }
        self.metrics.memo_builds.inc();
        tracing::debug!(
            "Augmented {} with {} member(s), {} diagnostic(s)",
            projection.fqn(),
            augmentation.members.len(),
            augmentation.diagnostics.len()
        );
        augmentation
    }

    fn is_current(&self, scope: &ResolveScope<'_>, projection: &Projection, ancestry: &Ancestry) -> bool {
        ancestry.iter().all(|(fqn, fingerprint)| {
            match scope.resolve_in(projection.module(), fqn.as_str()) {
                Resolution::Found(p) => Some(p.fingerprint()) == *fingerprint,
                Resolution::NotFound => fingerprint.is_none(),
                Resolution::InProgress => false,
            }
        })
    }

    fn compute(&self, scope: &ResolveScope<'_>, projection: &Arc<Projection>) -> Augmentation {
        let hierarchy = TypeHierarchy::new(scope, projection.module());
        let mut out = Augmentation::default();

        let mut extension_methods: Vec<Method> = Vec::new();
        if self.settings.extensions {
            let set = load_extensions(projection, scope);
            let members = extension_members(set);
            extension_methods.extend(members.iter().filter_map(|m| match &m.body {
                MemberBody::Method(method) => Some(method.clone()),
                _ => None,
            }));
            out.members.extend(members);
            out.diagnostics.extend(set.diagnostics.iter().cloned());
        }
        if self.settings.params {
            out.extend(Telescoper::new(&hierarchy, projection).telescope());
        }
        if self.settings.delegation {
            out.extend(DelegationLinker::new(&hierarchy, projection).link());
        }
        let inherited = |ancestor: &Arc<Projection>| Some(self.augment(scope, ancestor));
        if self.settings.properties {
            out.extend(ExplicitProperties::new(&hierarchy, projection, &inherited).generate());
            out.extend(PropertyInference::new(&hierarchy, projection, &inherited).infer(&extension_methods));
        }
        if self.settings.aliases {
            out.extend(TypeAliases::new(&hierarchy, projection, &inherited).project());
        }
        out
    }

    /// Drop the memo entry for one declaration revision
    pub fn forget(&self, id: DeclId) -> bool {
        self.memo.remove(&id).is_some()
    }

    pub fn clear(&self) {
        self.memo.clear();
    }

    pub fn len(&self) -> usize {
        self.memo.len()
    }

    pub fn is_empty(&self) -> bool {
        self.memo.is_empty()
    }
}

fn dedup(ancestry: Ancestry) -> Ancestry {
    let mut seen: FxHashSet<Fqn> = FxHashSet::default();
    ancestry
        .into_iter()
        .filter(|(fqn, _)| seen.insert(fqn.clone()))
        .collect()
}
