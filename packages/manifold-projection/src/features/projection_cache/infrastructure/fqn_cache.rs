//! Per-module FQN map
//!
//! Lock-free reads and writes through DashMap. Builds for the same key may
//! race; `publish` keeps an already visible valid projection and hands it
//! back so the losing builder can drop its own.
//!
//! Every removal bumps a generation counter first. A build reads the
//! counter before asking producers; if a removal happened since, its
//! result may predate the change and is not stored.

use crate::features::projection_cache::domain::{ModuleId, Projection, ProjectionNode};
use crate::shared::models::Fqn;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

pub struct FqnCache {
    module: ModuleId,
    nodes: DashMap<Fqn, ProjectionNode>,
    /// Removal counter, possibly shared with other modules' caches
    generation: Arc<AtomicU64>,
}

impl FqnCache {
    pub fn new(module: ModuleId) -> Self {
        Self::with_generation(module, Arc::new(AtomicU64::new(0)))
    }

    pub fn with_generation(module: ModuleId, generation: Arc<AtomicU64>) -> Self {
        Self {
            module,
            nodes: DashMap::new(),
            generation,
        }
    }

    /// Read before a build; pass to `publish` and `record_miss`
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn bump(&self) {
        self.generation.fetch_add(1, Ordering::AcqRel);
    }

    fn is_stale(&self, started: u64) -> bool {
        self.generation() != started
    }

    pub fn module(&self) -> ModuleId {
        self.module
    }

    pub fn get(&self, fqn: &Fqn) -> Option<ProjectionNode> {
        self.nodes.get(fqn).map(|n| n.value().clone())
    }

    /// Cache a miss unless something was removed since `started`
    pub fn record_miss(&self, fqn: Fqn, started: u64) -> bool {
        let entry = self.nodes.entry(fqn);
        if self.is_stale(started) {
            return false;
        }
        entry.or_insert(ProjectionNode::Miss);
        true
    }

    /// Store `projection` unless a valid one is already visible; returns
    /// the projection that ended up in the map. A build that started
    /// before the latest removal is handed back invalidated and not stored.
    pub fn publish(&self, fqn: Fqn, projection: Arc<Projection>, started: u64) -> Arc<Projection> {
        // The entry guard keeps a concurrent removal of this key waiting
        let entry = self.nodes.entry(fqn);
        if self.is_stale(started) {
            tracing::debug!("Dropping stale build of {}", projection.fqn());
            projection.invalidate();
            return projection;
        }
        match entry {
            Entry::Occupied(mut entry) => {
                if let ProjectionNode::Present(existing) = entry.get() {
                    if existing.is_valid() && existing.fingerprint() == projection.fingerprint() {
                        return existing.clone();
                    }
                }
                entry.insert(ProjectionNode::Present(projection.clone()));
                projection
            }
            Entry::Vacant(entry) => {
                entry.insert(ProjectionNode::Present(projection.clone()));
                projection
            }
        }
    }

    pub fn remove(&self, fqn: &Fqn) -> Option<ProjectionNode> {
        self.bump();
        self.nodes.remove(fqn).map(|(_, node)| node)
    }

    /// Remove `fqn` only if it is a cached miss
    pub fn remove_miss(&self, fqn: &Fqn) -> bool {
        self.bump();
        self.nodes
            .remove_if(fqn, |_, node| node.is_miss())
            .is_some()
    }

    /// Drop every node; returns the projections that were present
    pub fn clear(&self) -> Vec<Arc<Projection>> {
        let present: Vec<_> = self
            .nodes
            .iter()
            .filter_map(|entry| entry.value().projection().cloned())
            .collect();
        self.bump();
        self.nodes.clear();
        present
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn fqns(&self) -> Vec<Fqn> {
        self.nodes.iter().map(|entry| entry.key().clone()).collect()
    }
}
