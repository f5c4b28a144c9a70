//! Shared domain models
//!
//! - `fqn`         : dotted type names
//! - `types`       : textual type references (name, generic args, dims)
//! - `declaration` : parsed declaration model
//! - `diagnostic`  : error/warning attached to a declaration location
//! - `fingerprint` : blake3 digest of producer text
//! - `span`        : source positions

pub mod declaration;
pub mod diagnostic;
pub mod fingerprint;
pub mod fqn;
pub mod span;
pub mod types;

pub use declaration::{
    Annotation, AnnotationValue, DeclId, DeclKind, Declaration, Field, Method,
    Modifiers, Param, Visibility, PROPERTY_ANNOTATIONS,
};
pub use diagnostic::{Diagnostic, DiagnosticCode, Severity};
pub use fingerprint::Fingerprint;
pub use fqn::Fqn;
pub use span::Span;
pub use types::TypeRef;
