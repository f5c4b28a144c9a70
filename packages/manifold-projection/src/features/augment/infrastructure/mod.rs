//! Synthesis passes over a projection's resolved hierarchy

mod delegation;
mod explicit_properties;
mod extensions;
mod property_inference;
mod telescoping;
mod type_alias;
mod type_hierarchy;

pub use delegation::{DelegationLinker, Link};
pub use explicit_properties::ExplicitProperties;
pub use extensions::{extension_members, load_extensions};
pub use property_inference::{InheritedLookup, PropertyInference};
pub use telescoping::{holder_name, literal_type, Telescoper};
pub use type_alias::TypeAliases;
pub use type_hierarchy::{InterfaceRef, TypeHierarchy};
