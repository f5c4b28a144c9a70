//! Synthetic member model

use crate::shared::models::{
    Annotation, Diagnostic, Field, Fqn, Method, Modifiers, Span, TypeRef, Visibility,
};
use serde::{Deserialize, Serialize};

/// Member category requested by `get_augmented_members`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MemberKind {
    Field,
    Method,
    Type,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PropertyAccess {
    ReadWrite,
    ReadOnly,
    WriteOnly,
}

/// Which pass produced a member, and from what
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GenerationKind {
    InferredProperty {
        access: PropertyAccess,
        getter: Option<String>,
        setter: Option<String>,
    },
    DelegationStub {
        link: String,
        interface: Fqn,
    },
    /// Holder type for a method with default-valued parameters
    ParamsHolder {
        target: String,
    },
    /// Overload taking the holder as its only argument
    ParamsForwarder {
        target: String,
    },
    /// Overload with trailing optional parameters omitted
    TelescopedOverload {
        target: String,
        arity: usize,
    },
    Extension {
        source: Fqn,
    },
    /// Accessor generated for an `@var`/`@val`/`@get` field
    ExplicitGetter {
        field: String,
    },
    /// Accessor generated for an `@var`/`@set` field
    ExplicitSetter {
        field: String,
    },
    /// Member a `@TypeAlias` class shares with the type it aliases
    AliasedMember {
        target: Fqn,
    },
}

/// Static nested class synthesized for optional parameters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolderType {
    pub name: String,
    pub type_params: Vec<String>,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub constructor: Method,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MemberBody {
    Field(Field),
    Method(Method),
    Type(HolderType),
    /// Existing nested type visible through an alias
    NestedRef(Fqn),
}

/// Navigation target of a synthetic member
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Origin {
    /// Declaration holding the originating element
    pub declaration: Fqn,
    /// Originating member name (accessor, link field, method, extension)
    pub member: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticMember {
    pub name: String,
    pub body: MemberBody,
    pub generation: GenerationKind,
    pub origin: Origin,
}

impl SyntheticMember {
    pub fn kind(&self) -> MemberKind {
        match self.body {
            MemberBody::Field(_) => MemberKind::Field,
            MemberBody::Method(_) => MemberKind::Method,
            MemberBody::Type(_) | MemberBody::NestedRef(_) => MemberKind::Type,
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match &self.body {
            MemberBody::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_method(&self) -> Option<&Method> {
        match &self.body {
            MemberBody::Method(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_type(&self) -> Option<&HolderType> {
        match &self.body {
            MemberBody::Type(t) => Some(t),
            _ => None,
        }
    }

    /// Type of a field, return type of a method
    pub fn value_type(&self) -> Option<&TypeRef> {
        match &self.body {
            MemberBody::Field(f) => Some(&f.ty),
            MemberBody::Method(m) => m.return_type.as_ref(),
            MemberBody::Type(_) | MemberBody::NestedRef(_) => None,
        }
    }

    pub fn as_nested_ref(&self) -> Option<&Fqn> {
        match &self.body {
            MemberBody::NestedRef(fqn) => Some(fqn),
            _ => None,
        }
    }

    /// Field an explicit-property accessor was generated for
    pub fn accessor_of(&self) -> Option<&str> {
        match &self.generation {
            GenerationKind::ExplicitGetter { field } | GenerationKind::ExplicitSetter { field } => {
                Some(field.as_str())
            }
            _ => None,
        }
    }

    pub fn is_aliased(&self) -> bool {
        matches!(self.generation, GenerationKind::AliasedMember { .. })
    }

    pub fn is_property(&self) -> bool {
        matches!(self.generation, GenerationKind::InferredProperty { .. })
    }

    pub fn property_access(&self) -> Option<PropertyAccess> {
        match &self.generation {
            GenerationKind::InferredProperty { access, .. } => Some(*access),
            _ => None,
        }
    }
}

/// A physical field reused as a property with a widened visibility
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldAdjustment {
    pub field: String,
    pub declared: Visibility,
    pub effective: Visibility,
    pub access: PropertyAccess,
    pub getter: Option<String>,
    pub setter: Option<String>,
}

/// Everything synthesized for one declaration revision
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Augmentation {
    pub members: Vec<SyntheticMember>,
    pub adjustments: Vec<FieldAdjustment>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Augmentation {
    pub fn members_of(&self, kind: MemberKind) -> impl Iterator<Item = &SyntheticMember> {
        self.members.iter().filter(move |m| m.kind() == kind)
    }

    pub fn member(&self, name: &str, kind: MemberKind) -> Option<&SyntheticMember> {
        self.members_of(kind).find(|m| m.name == name)
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Method> + 'a {
        self.members
            .iter()
            .filter_map(|m| m.as_method())
            .filter(move |m| m.name == name)
    }

    pub fn adjustment(&self, field: &str) -> Option<&FieldAdjustment> {
        self.adjustments.iter().find(|a| a.field == field)
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty() && self.adjustments.is_empty() && self.diagnostics.is_empty()
    }

    pub fn extend(&mut self, other: Augmentation) {
        self.members.extend(other.members);
        self.adjustments.extend(other.adjustments);
        self.diagnostics.extend(other.diagnostics);
    }
}
