//! Modules and their dependency graph
//!
//! A module is a compilation boundary owning source producers. Edges point
//! from a module to the modules it depends on and carry an `exported` flag:
//! lookups from a start module see its direct dependencies, and beyond
//! those only exported edges.

use crate::errors::{ProjectionError, Result};
use crate::features::source_producer::{ProducerKind, SourceProducer};
use crate::shared::models::Fqn;
use parking_lot::RwLock;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use rustc_hash::FxHashSet;
use std::collections::VecDeque;
use std::sync::Arc;

/// Stable module identity for the lifetime of a session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleId(pub u32);

impl ModuleId {
    fn index(self) -> NodeIndex {
        NodeIndex::new(self.0 as usize)
    }
}

impl std::fmt::Display for ModuleId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "module#{}", self.0)
    }
}

pub struct Module {
    pub id: ModuleId,
    pub name: String,
    producers: RwLock<Vec<Arc<dyn SourceProducer>>>,
}

impl Module {
    pub fn producers(&self) -> Vec<Arc<dyn SourceProducer>> {
        self.producers.read().clone()
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("producers", &self.producers.read().len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy)]
struct Dependency {
    exported: bool,
}

/// Registry of modules plus the dependency graph between them
pub struct ModuleRegistry {
    graph: RwLock<DiGraph<Arc<Module>, Dependency>>,
}

impl ModuleRegistry {
    pub fn new() -> Self {
        Self {
            graph: RwLock::new(DiGraph::new()),
        }
    }

    pub fn add_module(&self, name: impl Into<String>) -> ModuleId {
        let mut graph = self.graph.write();
        let id = ModuleId(graph.node_count() as u32);
        graph.add_node(Arc::new(Module {
            id,
            name: name.into(),
            producers: RwLock::new(Vec::new()),
        }));
        id
    }

    pub fn module(&self, id: ModuleId) -> Option<Arc<Module>> {
        self.graph.read().node_weight(id.index()).cloned()
    }

    pub fn module_ids(&self) -> Vec<ModuleId> {
        (0..self.graph.read().node_count() as u32).map(ModuleId).collect()
    }

    pub fn add_producer(&self, id: ModuleId, producer: Arc<dyn SourceProducer>) -> Result<()> {
        let module = self
            .module(id)
            .ok_or_else(|| ProjectionError::unknown_module(id))?;
        module.producers.write().push(producer);
        Ok(())
    }

    /// `from` depends on `to`
    pub fn add_dependency(&self, from: ModuleId, to: ModuleId, exported: bool) -> Result<()> {
        let mut graph = self.graph.write();
        for id in [from, to] {
            if graph.node_weight(id.index()).is_none() {
                return Err(ProjectionError::unknown_module(id));
            }
        }
        graph.add_edge(from.index(), to.index(), Dependency { exported });
        Ok(())
    }

    /// Direct dependencies in insertion order
    fn dependencies(&self, id: ModuleId) -> Vec<(ModuleId, bool)> {
        let graph = self.graph.read();
        let mut edges: Vec<_> = graph
            .edges_directed(id.index(), Direction::Outgoing)
            .map(|e| (e.id(), ModuleId(e.target().index() as u32), e.weight().exported))
            .collect();
        edges.sort_by_key(|(edge, _, _)| *edge);
        edges.into_iter().map(|(_, m, exported)| (m, exported)).collect()
    }

    /// Modules visible from `start`, in lookup order (depth-first)
    pub fn lookup_order(&self, start: ModuleId) -> Vec<ModuleId> {
        let mut order = Vec::new();
        let mut visited = FxHashSet::default();
        self.visit(start, start, &mut visited, &mut order);
        order
    }

    fn visit(
        &self,
        start: ModuleId,
        module: ModuleId,
        visited: &mut FxHashSet<ModuleId>,
        order: &mut Vec<ModuleId>,
    ) {
        if !visited.insert(module) {
            return;
        }
        order.push(module);
        for (dep, exported) in self.dependencies(module) {
            if module == start || exported {
                self.visit(start, dep, visited, order);
            }
        }
    }

    /// `module` plus every module that (transitively) depends on it
    pub fn dependents(&self, module: ModuleId) -> Vec<ModuleId> {
        let graph = self.graph.read();
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::new();
        let mut out = Vec::new();
        seen.insert(module);
        queue.push_back(module);
        while let Some(current) = queue.pop_front() {
            out.push(current);
            for neighbor in graph.neighbors_directed(current.index(), Direction::Incoming) {
                let id = ModuleId(neighbor.index() as u32);
                if seen.insert(id) {
                    queue.push_back(id);
                }
            }
        }
        out
    }

    /// First visible module with non-supplemental claimants for `fqn`,
    /// claimants ordered Primary before Partial
    pub fn claimants(
        &self,
        start: ModuleId,
        fqn: &Fqn,
    ) -> Option<(ModuleId, Vec<Arc<dyn SourceProducer>>)> {
        for module_id in self.lookup_order(start) {
            let Some(module) = self.module(module_id) else {
                continue;
            };
            let mut claimants: Vec<_> = module
                .producers()
                .into_iter()
                .filter(|p| p.kind() != ProducerKind::Supplemental && p.is_type(fqn))
                .collect();
            if !claimants.is_empty() {
                claimants.sort_by_key(|p| p.kind().priority());
                return Some((module_id, claimants));
            }
        }
        None
    }

    /// Supplemental producers visible from `start` claiming `fqn`
    pub fn supplements(&self, start: ModuleId, fqn: &Fqn) -> Vec<Arc<dyn SourceProducer>> {
        self.lookup_order(start)
            .into_iter()
            .filter_map(|id| self.module(id))
            .flat_map(|m| m.producers())
            .filter(|p| p.kind() == ProducerKind::Supplemental && p.is_type(fqn))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::source_producer::InMemorySourceProducer;

    #[test]
    fn test_lookup_order_follows_exported_edges_only_beyond_start() {
        let registry = ModuleRegistry::new();
        let app = registry.add_module("app");
        let lib = registry.add_module("lib");
        let core = registry.add_module("core");
        let hidden = registry.add_module("hidden");
        registry.add_dependency(app, lib, false).unwrap();
        registry.add_dependency(lib, core, true).unwrap();
        registry.add_dependency(lib, hidden, false).unwrap();

        assert_eq!(registry.lookup_order(app), vec![app, lib, core]);
        assert_eq!(registry.lookup_order(lib), vec![lib, core, hidden]);
    }

    #[test]
    fn test_cyclic_dependencies_terminate() {
        let registry = ModuleRegistry::new();
        let a = registry.add_module("a");
        let b = registry.add_module("b");
        registry.add_dependency(a, b, true).unwrap();
        registry.add_dependency(b, a, true).unwrap();
        assert_eq!(registry.lookup_order(a), vec![a, b]);
        let mut dependents = registry.dependents(b);
        dependents.sort();
        assert_eq!(dependents, vec![a, b]);
    }

    #[test]
    fn test_claimants_prefer_primary_and_first_module() {
        let registry = ModuleRegistry::new();
        let app = registry.add_module("app");
        let lib = registry.add_module("lib");
        registry.add_dependency(app, lib, false).unwrap();

        let partial = InMemorySourceProducer::new("partial", ProducerKind::Partial)
            .with_type("x.A", "int y;", "/x/A.java");
        let primary = InMemorySourceProducer::primary("primary")
            .with_type("x.A", "class A {}", "/x/A.java");
        registry.add_producer(lib, Arc::new(partial)).unwrap();
        registry.add_producer(lib, Arc::new(primary)).unwrap();

        let (owner, claimants) = registry.claimants(app, &Fqn::new("x.A")).unwrap();
        assert_eq!(owner, lib);
        let names: Vec<_> = claimants.iter().map(|p| p.name().to_string()).collect();
        assert_eq!(names, vec!["primary", "partial"]);
        assert!(registry.claimants(app, &Fqn::new("x.B")).is_none());
    }

    #[test]
    fn test_unknown_module_rejected() {
        let registry = ModuleRegistry::new();
        let a = registry.add_module("a");
        assert!(registry.add_dependency(a, ModuleId(7), false).is_err());
    }
}
