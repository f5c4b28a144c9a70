//! Projection lookup and build
//!
//! `resolve` answers from the miss-aware maps when it can (cached
//! projection, cached miss), otherwise asks the visible modules' producers,
//! parses the produced text and publishes every type it declares.
//!
//! Failures stay scoped to the FQN being built: conflicting producers and
//! failed producers become error declarations, malformed text leaves the
//! key absent.

use super::ResolveScope;
use super::Resolution;
use crate::features::parsing::DeclarationParser;
use crate::features::projection_cache::domain::{
    ModuleId, ModuleRegistry, Projection, ProjectionNode,
};
use crate::features::projection_cache::infrastructure::{FqnCache, ProjectionMetrics};
use crate::features::source_producer::{ProducerKind, SourceProducer};
use crate::shared::models::{Declaration, Diagnostic, DiagnosticCode, Fqn, Span};
use dashmap::DashMap;
use rustc_hash::FxHashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicU64;
use std::sync::Arc;

pub struct ProjectionCache {
    modules: DashMap<ModuleId, Arc<FqnCache>>,
    /// Removal counter shared by every module's map
    generation: Arc<AtomicU64>,
    /// Backing file -> cached (module, FQN) pairs, nested types included
    by_file: DashMap<PathBuf, FxHashSet<(ModuleId, Fqn)>>,
    parser: DeclarationParser,
    metrics: Arc<ProjectionMetrics>,
}

impl ProjectionCache {
    pub fn new(metrics: Arc<ProjectionMetrics>) -> Self {
        Self {
            modules: DashMap::new(),
            generation: Arc::new(AtomicU64::new(0)),
            by_file: DashMap::new(),
            parser: DeclarationParser::new(),
            metrics,
        }
    }

    pub fn parser(&self) -> &DeclarationParser {
        &self.parser
    }

    pub fn metrics(&self) -> &ProjectionMetrics {
        &self.metrics
    }

    fn fqn_cache(&self, module: ModuleId) -> Arc<FqnCache> {
        self.modules
            .entry(module)
            .or_insert_with(|| Arc::new(FqnCache::with_generation(module, self.generation.clone())))
            .clone()
    }

    /// Current node for `(module, fqn)` without building or walking
    /// dependencies
    pub fn peek(&self, module: ModuleId, fqn: &Fqn) -> Option<ProjectionNode> {
        self.modules.get(&module)?.get(fqn)
    }

    pub fn resolve(&self, scope: &ResolveScope<'_>, module: ModuleId, name: &str) -> Resolution {
        let Some(fqn) = Fqn::parse(name) else {
            return Resolution::NotFound;
        };
        let Some(_guard) = scope.enter(&fqn) else {
            tracing::trace!("Reentrant lookup of {} short-circuited", fqn);
            self.metrics.reentrant.inc();
            return Resolution::InProgress;
        };

        match self.cached(scope.modules(), module, &fqn) {
            Some(ProjectionNode::Present(projection)) => {
                tracing::debug!("Cache hit for {} in {}", fqn, projection.module());
                self.metrics.hits.inc();
                Resolution::Found(projection)
            }
            Some(ProjectionNode::Miss) => {
                self.metrics.cached_misses.inc();
                Resolution::NotFound
            }
            None => {
                self.metrics.misses.inc();
                let resolution = self.build(scope, module, &fqn);
                self.metrics.entries.set(self.len() as i64);
                resolution
            }
        }
    }

    /// Valid projection in any visible module, or a miss cached in `start`
    fn cached(&self, modules: &ModuleRegistry, start: ModuleId, fqn: &Fqn) -> Option<ProjectionNode> {
        for module in modules.lookup_order(start) {
            let Some(cache) = self.modules.get(&module).map(|c| c.clone()) else {
                continue;
            };
            match cache.get(fqn) {
                Some(ProjectionNode::Present(p)) if p.is_valid() => {
                    return Some(ProjectionNode::Present(p));
                }
                Some(ProjectionNode::Miss) if module == start => {
                    return Some(ProjectionNode::Miss);
                }
                _ => {}
            }
        }
        None
    }

    fn build(&self, scope: &ResolveScope<'_>, module: ModuleId, fqn: &Fqn) -> Resolution {
        let modules = scope.modules();
        // Read before any producer is consulted
        let started = self.fqn_cache(module).generation();
        let Some((owner, claimants)) = modules.claimants(module, fqn) else {
            tracing::debug!("No producer claims {}; caching miss in {}", fqn, module);
            self.fqn_cache(module).record_miss(fqn.clone(), started);
            return Resolution::NotFound;
        };

        let top = top_level_name(claimants[0].as_ref(), fqn);
        let _top_guard = if &top != fqn {
            match scope.enter(&top) {
                Some(guard) => Some(guard),
                None => return Resolution::InProgress,
            }
        } else {
            None
        };

        let files = backing_files(&claimants, &top);
        let names = claimants
            .iter()
            .map(|p| p.name().to_string())
            .collect::<Vec<_>>()
            .join(", ");

        let has_primary = claimants.iter().any(|p| p.kind() == ProducerKind::Primary);
        if claimants.len() > 1 && has_primary {
            tracing::warn!("Conflicting producers for {}: {}", fqn, names);
            self.metrics.conflicts.inc();
            let diagnostic = Diagnostic::error(
                DiagnosticCode::ConflictingProducers,
                fqn,
                Span::zero(),
                format!("The type {} has conflicting producers: {}", fqn, names),
            );
            return self.publish_error(owner, fqn, diagnostic, files, started);
        }

        let mut text: Option<String> = None;
        for producer in &claimants {
            match producer.produce(&top, text.as_deref(), scope) {
                Ok(output) => text = Some(output),
                Err(err) => {
                    tracing::warn!("Producer {} failed for {}: {}", producer.name(), top, err);
                    self.metrics.producer_failures.inc();
                    let diagnostic = Diagnostic::error(
                        DiagnosticCode::ProducerFailed,
                        fqn,
                        Span::zero(),
                        format!("Producer {} failed for {}: {}", producer.name(), top, err),
                    );
                    return self.publish_error(owner, fqn, diagnostic, files, started);
                }
            }
        }
        let Some(text) = text else {
            return Resolution::NotFound;
        };

        let unit = match self.parser.parse(&text) {
            Ok(unit) => unit,
            Err(err) => {
                tracing::warn!("Malformed source for {} from {}: {}", top, names, err);
                self.metrics.malformed.inc();
                return Resolution::NotFound;
            }
        };

        let cache = self.fqn_cache(owner);
        let mut result = None;
        for decl in unit.types {
            let decl_fqn = decl.fqn.clone();
            let supplements = modules.supplements(owner, &decl_fqn);
            let projection = Arc::new(Projection::new(
                Arc::new(decl),
                owner,
                files.clone(),
                supplements,
            ));
            let published = cache.publish(decl_fqn.clone(), projection, started);
            if published.is_valid() {
                self.index_files(owner, &decl_fqn, &files);
            }
            if &decl_fqn == fqn {
                result = Some(published);
            }
        }
        self.metrics.builds.inc();
        tracing::debug!("Built projection(s) for {} in {} from {}", top, owner, names);

        match result {
            Some(projection) => Resolution::Found(projection),
            None => {
                self.fqn_cache(module).record_miss(fqn.clone(), started);
                Resolution::NotFound
            }
        }
    }

    fn publish_error(
        &self,
        owner: ModuleId,
        fqn: &Fqn,
        diagnostic: Diagnostic,
        files: Vec<PathBuf>,
        started: u64,
    ) -> Resolution {
        let decl = Declaration::error_stub(self.parser.next_id(), fqn.clone(), diagnostic);
        let projection = Arc::new(Projection::new(Arc::new(decl), owner, files.clone(), Vec::new()));
        let published = self.fqn_cache(owner).publish(fqn.clone(), projection, started);
        if published.is_valid() {
            self.index_files(owner, fqn, &files);
        }
        Resolution::Found(published)
    }

    fn index_files(&self, module: ModuleId, fqn: &Fqn, files: &[PathBuf]) {
        for file in files {
            self.by_file
                .entry(file.clone())
                .or_default()
                .insert((module, fqn.clone()));
        }
    }

    /// Cached (module, FQN) pairs backed by `file`
    pub fn nodes_for_file(&self, file: &Path) -> Vec<(ModuleId, Fqn)> {
        self.by_file
            .get(file)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Remove `fqn` from `module`, marking a present projection invalid.
    /// Returns the removed projection, if any.
    pub fn evict(&self, module: ModuleId, fqn: &Fqn) -> Option<Arc<Projection>> {
        let node = self.modules.get(&module)?.remove(fqn)?;
        self.metrics.evictions.inc();
        let projection = node.projection().cloned()?;
        projection.invalidate();
        for file in projection.files() {
            if let Some(mut set) = self.by_file.get_mut(file) {
                set.remove(&(module, fqn.clone()));
            }
        }
        self.by_file.retain(|_, set| !set.is_empty());
        Some(projection)
    }

    /// Drop cached misses for `fqn` in the given modules
    pub fn evict_misses(&self, fqn: &Fqn, modules: &[ModuleId]) -> usize {
        let mut removed = 0;
        for module in modules {
            if let Some(cache) = self.modules.get(module) {
                if cache.remove_miss(fqn) {
                    removed += 1;
                }
            }
        }
        self.metrics.evictions.inc_by(removed as u64);
        removed
    }

    /// Erase every node in every module. Returns the projections dropped.
    pub fn clear(&self) -> Vec<Arc<Projection>> {
        let mut dropped = Vec::new();
        for entry in self.modules.iter() {
            dropped.extend(entry.value().clear());
        }
        for projection in &dropped {
            projection.invalidate();
        }
        self.by_file.clear();
        self.metrics.entries.set(0);
        dropped
    }

    /// Total nodes (projections and misses) across modules
    pub fn len(&self) -> usize {
        self.modules.iter().map(|entry| entry.value().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Strip trailing segments until the producer reports a top-level type
fn top_level_name(producer: &dyn SourceProducer, fqn: &Fqn) -> Fqn {
    let mut candidate = fqn.clone();
    loop {
        if producer.is_top_level_type(&candidate) {
            return candidate;
        }
        match candidate.parent() {
            Some(parent) => candidate = parent,
            None => return fqn.clone(),
        }
    }
}

fn backing_files(claimants: &[Arc<dyn SourceProducer>], top: &Fqn) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for producer in claimants {
        for file in producer.find_files_for_type(top) {
            if !files.contains(&file) {
                files.push(file);
            }
        }
    }
    files
}
