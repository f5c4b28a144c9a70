//! Member augmentation
//!
//! Synthesizes the members a full compile would add to a projected class:
//! extension methods from supplemental producers, optional-parameter
//! holders and overloads, delegation stubs and inferred property fields.
//! Results are memoized per declaration revision and re-validated against
//! the projections they consulted.
//!
//! ## Structure
//! - `domain/` - synthetic member model, property naming
//! - `infrastructure/` - hierarchy queries and the individual passes
//! - `application/` - memoizing service that runs the passes in order

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{AugmentService, SynthesisSettings};
pub use domain::{
    derive_property_name, is_reserved_word, AccessorPrefix, Augmentation, FieldAdjustment,
    GenerationKind, HolderType, MemberBody, MemberKind, Origin, PropertyAccess, SyntheticMember,
};
pub use infrastructure::TypeHierarchy;
