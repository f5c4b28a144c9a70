//! Diagnostics attached to declarations by synthesis passes

use super::{Fqn, Span};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

/// Stable identifiers for every diagnostic the engine reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DiagnosticCode {
    // Projection cache
    ConflictingProducers,
    ProducerFailed,
    MalformedSource,

    // Delegation linking
    SuperclassNotPart,
    LinkStaticField,
    LinkModifierNotAllowed,
    LinkModifierRedundant,
    LinkTargetNotInterface,
    LinkNoCommonInterfaces,
    LinkInterfaceNotShared,
    LinkFieldNotAssignable,
    InterfaceOverlap,
    InterfaceMultipleShares,
    MethodOverlap,
    MethodMultipleShares,

    // Optional-parameter telescoping
    TelescopeClash,
    TelescopeClashesWithPhysical,
    TelescopeOverridesInherited,
    IncompatibleDefault,

    // Explicit properties
    AbstractPropertyInConcreteClass,
    FinalAbstractProperty,
    FinalStaticProperty,
    AccessorWeakerThanProperty,
    ReadOnlyOverridesWritable,
    WriteOnlyOverridesReadable,
    GetterOnWriteOnly,
    SetterOnReadOnly,
    AbstractWritableInitializer,
    MissingStaticAccessor,
    AccessorConflict,
    AccessorStaticMismatch,
    AccessorErasureMatch,
    PropertyOverridesNothing,
    MissingOverride,
    CannotOverrideStatic,
    PropertyReturnClash,
    StaticInterfaceProperty,
}

impl DiagnosticCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ConflictingProducers => "conflicting-producers",
            Self::ProducerFailed => "producer-failed",
            Self::MalformedSource => "malformed-source",
            Self::SuperclassNotPart => "superclass-not-part",
            Self::LinkStaticField => "link-static-field",
            Self::LinkModifierNotAllowed => "link-modifier-not-allowed",
            Self::LinkModifierRedundant => "link-modifier-redundant",
            Self::LinkTargetNotInterface => "link-target-not-interface",
            Self::LinkNoCommonInterfaces => "link-no-common-interfaces",
            Self::LinkInterfaceNotShared => "link-interface-not-shared",
            Self::LinkFieldNotAssignable => "link-field-not-assignable",
            Self::InterfaceOverlap => "interface-overlap",
            Self::InterfaceMultipleShares => "interface-multiple-shares",
            Self::MethodOverlap => "method-overlap",
            Self::MethodMultipleShares => "method-multiple-shares",
            Self::TelescopeClash => "telescope-clash",
            Self::TelescopeClashesWithPhysical => "telescope-clashes-with-physical",
            Self::TelescopeOverridesInherited => "telescope-overrides-inherited",
            Self::IncompatibleDefault => "incompatible-default",
            Self::AbstractPropertyInConcreteClass => "abstract-property-in-concrete-class",
            Self::FinalAbstractProperty => "final-abstract-property",
            Self::FinalStaticProperty => "final-static-property",
            Self::AccessorWeakerThanProperty => "accessor-weaker-than-property",
            Self::ReadOnlyOverridesWritable => "read-only-overrides-writable",
            Self::WriteOnlyOverridesReadable => "write-only-overrides-readable",
            Self::GetterOnWriteOnly => "getter-on-write-only",
            Self::SetterOnReadOnly => "setter-on-read-only",
            Self::AbstractWritableInitializer => "abstract-writable-initializer",
            Self::MissingStaticAccessor => "missing-static-accessor",
            Self::AccessorConflict => "accessor-conflict",
            Self::AccessorStaticMismatch => "accessor-static-mismatch",
            Self::AccessorErasureMatch => "accessor-erasure-match",
            Self::PropertyOverridesNothing => "property-overrides-nothing",
            Self::MissingOverride => "missing-override",
            Self::CannotOverrideStatic => "cannot-override-static",
            Self::PropertyReturnClash => "property-return-clash",
            Self::StaticInterfaceProperty => "static-interface-property",
        }
    }
}

/// Error or warning at a location inside a projected declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: DiagnosticCode,
    pub message: String,
    /// Declaration the location belongs to
    pub declaration: Fqn,
    pub span: Span,
}

impl Diagnostic {
    pub fn error(
        code: DiagnosticCode,
        declaration: &Fqn,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Error,
            code,
            message: message.into(),
            declaration: declaration.clone(),
            span,
        }
    }

    pub fn warning(
        code: DiagnosticCode,
        declaration: &Fqn,
        span: Span,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            message: message.into(),
            declaration: declaration.clone(),
            span,
        }
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let level = match self.severity {
            Severity::Error => "error",
            Severity::Warning => "warning",
        };
        write!(
            f,
            "{}[{}] {}@{}: {}",
            level,
            self.code.as_str(),
            self.declaration,
            self.span,
            self.message
        )
    }
}
