//! Projection session
//!
//! One session per project. It owns the module graph, the projection
//! cache, the augmentation memo, the listener registry and the metrics
//! registry, and is passed explicitly to every operation. File events go
//! through `dispatch`, which evicts the affected projections and notifies
//! listeners in phase order:
//! - creation: evict, early listeners, late listeners
//! - modification/deletion: late listeners, evict, early listeners

use crate::config::ProjectionConfig;
use crate::errors::Result;
use crate::features::augment::{AugmentService, Augmentation, MemberKind, SyntheticMember};
use crate::features::invalidation::{
    FileChangeEvent, FileEventSink, InvalidationListener, InvalidationRegistry, RefreshKind,
    RefreshRequest, Subscription,
};
use crate::features::projection_cache::{
    ModuleId, ModuleRegistry, Projection, ProjectionCache, ProjectionMetrics, Resolution,
    ResolveScope,
};
use crate::features::source_producer::SourceProducer;
use crate::shared::models::Fqn;
use prometheus::Registry;
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use uuid::Uuid;

pub struct ProjectionSession {
    id: Uuid,
    config: ProjectionConfig,
    modules: ModuleRegistry,
    cache: ProjectionCache,
    registry: InvalidationRegistry,
    augments: AugmentService,
    metrics_registry: Registry,
    metrics: Arc<ProjectionMetrics>,
    disposed: AtomicBool,
}

impl ProjectionSession {
    pub fn new(config: ProjectionConfig) -> Result<Self> {
        config.validate()?;
        let metrics_registry = Registry::new();
        // Unexported counters go to a private registry
        let target = if config.cache.metrics {
            metrics_registry.clone()
        } else {
            Registry::new()
        };
        let metrics = Arc::new(ProjectionMetrics::new(
            &target,
            &config.cache.metrics_namespace,
        )?);
        let id = Uuid::new_v4();
        tracing::info!(
            "Projection session {} created (preset: {})",
            id,
            config.get_preset()
        );
        Ok(Self {
            id,
            modules: ModuleRegistry::new(),
            cache: ProjectionCache::new(metrics.clone()),
            registry: InvalidationRegistry::new(),
            augments: AugmentService::new(config.synthesis_settings(), metrics.clone()),
            config,
            metrics_registry,
            metrics,
            disposed: AtomicBool::new(false),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &ProjectionConfig {
        &self.config
    }

    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    pub fn cache(&self) -> &ProjectionCache {
        &self.cache
    }

    pub fn metrics(&self) -> &ProjectionMetrics {
        &self.metrics
    }

    /// Registry holding every metric of this session, for export
    pub fn metrics_registry(&self) -> &Registry {
        &self.metrics_registry
    }

    pub fn add_module(&self, name: impl Into<String>) -> ModuleId {
        self.modules.add_module(name)
    }

    pub fn add_producer(&self, module: ModuleId, producer: Arc<dyn SourceProducer>) -> Result<()> {
        self.modules.add_producer(module, producer)
    }

    /// `from` depends on `to`; `exported` makes `to` visible to modules
    /// depending on `from`
    pub fn add_dependency(&self, from: ModuleId, to: ModuleId, exported: bool) -> Result<()> {
        self.modules.add_dependency(from, to, exported)
    }

    /// Fresh lookup scope starting at `module`
    pub fn scope(&self, module: ModuleId) -> ResolveScope<'_> {
        ResolveScope::new(&self.cache, &self.modules, module)
    }

    pub fn resolve(&self, module: ModuleId, fqn: &str) -> Resolution {
        if self.is_disposed() {
            return Resolution::NotFound;
        }
        self.scope(module).resolve(fqn)
    }

    /// Projection of `fqn` as seen from `module`, built on first request
    pub fn get_projection(&self, module: ModuleId, fqn: &str) -> Option<Arc<Projection>> {
        self.resolve(module, fqn).into_found()
    }

    pub fn augmentation(&self, projection: &Arc<Projection>) -> Arc<Augmentation> {
        let scope = self.scope(projection.module());
        self.augments.augment(&scope, projection)
    }

    /// Synthetic members of one kind
    pub fn get_augmented_members(&self, projection: &Arc<Projection>, kind: MemberKind) -> Vec<SyntheticMember> {
        self.augmentation(projection)
            .members_of(kind)
            .cloned()
            .collect()
    }

    pub fn subscribe(&self, listener: Arc<dyn InvalidationListener>, notify_early: bool) -> Subscription {
        self.registry.subscribe(listener, notify_early)
    }

    pub fn unsubscribe(&self, listener: &Arc<dyn InvalidationListener>) -> bool {
        self.registry.unsubscribe(listener)
    }

    /// Every type name the producers visible from `module` can supply
    pub fn all_type_names(&self, module: ModuleId) -> Vec<Fqn> {
        let names: BTreeSet<Fqn> = self
            .modules
            .lookup_order(module)
            .into_iter()
            .filter_map(|id| self.modules.module(id))
            .flat_map(|m| m.producers())
            .flat_map(|p| p.all_type_names())
            .collect();
        names.into_iter().collect()
    }

    /// Apply one file event. Returns the per-module requests delivered to
    /// listeners.
    pub fn dispatch(&self, event: FileChangeEvent) -> Vec<RefreshRequest> {
        if self.is_disposed() {
            return Vec::new();
        }
        if event.is_module_descriptor() {
            tracing::info!("Module descriptor {} changed", event.path().display());
            self.refresh_all();
            return Vec::new();
        }

        let requests = self.requests_for(&event);
        if requests.is_empty() {
            tracing::trace!("No projections backed by {}", event.path().display());
            return requests;
        }
        let listeners = self.registry.snapshot();
        match event.refresh_kind() {
            RefreshKind::Creation => {
                requests.iter().for_each(|r| self.evict(r));
                requests.iter().for_each(|r| listeners.notify_early(r));
                requests.iter().for_each(|r| listeners.notify_late(r));
            }
            RefreshKind::Modification | RefreshKind::Deletion => {
                requests.iter().for_each(|r| listeners.notify_late(r));
                requests.iter().for_each(|r| self.evict(r));
                requests.iter().for_each(|r| listeners.notify_early(r));
            }
        }
        tracing::debug!(
            "Dispatched {} event for {} to {} module(s)",
            event.event_type(),
            event.path().display(),
            requests.len()
        );
        requests
    }

    /// Affected types per module: what the producers map the file to, plus
    /// whatever the cache has indexed under it
    fn requests_for(&self, event: &FileChangeEvent) -> Vec<RefreshRequest> {
        let path = event.path();
        let mut targets: BTreeMap<ModuleId, BTreeSet<Fqn>> = BTreeMap::new();
        for module_id in self.modules.module_ids() {
            let Some(module) = self.modules.module(module_id) else {
                continue;
            };
            for producer in module.producers() {
                for fqn in producer.types_for_file(path) {
                    targets.entry(module_id).or_default().insert(fqn);
                }
            }
        }
        for (module, fqn) in self.cache.nodes_for_file(path) {
            targets.entry(module).or_default().insert(fqn);
        }

        targets
            .into_iter()
            .map(|(module, types)| RefreshRequest {
                file: path.to_path_buf(),
                module,
                types: types.into_iter().collect(),
                kind: event.refresh_kind(),
            })
            .collect()
    }

    fn evict(&self, request: &RefreshRequest) {
        let dependents = self.modules.dependents(request.module);
        for fqn in &request.types {
            self.evict_tree(request.module, fqn);
            self.cache.evict_misses(fqn, &dependents);
        }
        self.metrics.entries.set(self.cache.len() as i64);
    }

    /// Evict a projection and the nested types parsed with it
    fn evict_tree(&self, module: ModuleId, fqn: &Fqn) {
        let Some(projection) = self.cache.evict(module, fqn) else {
            return;
        };
        self.augments.forget(projection.id());
        tracing::debug!("Evicted {} from {}", fqn, module);
        for nested in &projection.declaration().nested {
            self.evict_tree(module, nested);
        }
    }

    /// Drop every projection in every module and notify all listeners
    pub fn refresh_all(&self) {
        let dropped = self.cache.clear();
        self.augments.clear();
        self.metrics.refreshes.inc();
        tracing::info!("Refreshed all projections ({} dropped)", dropped.len());
        self.registry.snapshot().notify_refreshed();
    }

    /// Tear the session down: projections, memo and listeners are
    /// released and later lookups find nothing
    pub fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cache.clear();
        self.augments.clear();
        self.registry.clear();
        tracing::info!("Projection session {} disposed", self.id);
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    /// Whether `file` currently backs any cached projection
    pub fn is_tracked(&self, file: &Path) -> bool {
        !self.cache.nodes_for_file(file).is_empty()
    }
}

impl FileEventSink for ProjectionSession {
    fn on_file_event(&self, event: FileChangeEvent) {
        self.dispatch(event);
    }
}

impl std::fmt::Debug for ProjectionSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProjectionSession")
            .field("id", &self.id)
            .field("modules", &self.modules.module_ids().len())
            .field("entries", &self.cache.len())
            .field("listeners", &self.registry.len())
            .finish()
    }
}
