//! FQN Projection Cache
//!
//! Per-module map from FQN to projection node, built lazily from source
//! producers and evicted by the invalidation registry.
//!
//! ## Structure
//! - `domain/` - modules, projections, cache nodes
//! - `application/` - lookup algorithm and reentrancy scope
//! - `infrastructure/` - concurrent per-module maps, prometheus metrics

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{Ancestry, ProjectionCache, Resolution, ResolveScope};
pub use domain::{ExtensionSet, Module, ModuleId, ModuleRegistry, Projection, ProjectionNode};
pub use infrastructure::{FqnCache, ProjectionMetrics};
