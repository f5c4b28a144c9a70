//! Domain - modules and projections

mod module;
mod projection;

pub use module::{Module, ModuleId, ModuleRegistry};
pub use projection::{ExtensionSet, Projection, ProjectionNode};
