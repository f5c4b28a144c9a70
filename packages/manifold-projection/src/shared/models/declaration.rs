//! Parsed declaration model
//!
//! A `Declaration` is the type a producer's text compiles to: one class,
//! interface, enum, record or annotation type. Nested types are separate
//! declarations addressed by their dotted FQN; `nested` lists them.

use super::{Diagnostic, Fingerprint, Fqn, Span, TypeRef};
use serde::{Deserialize, Serialize};

/// Revision id of a parsed declaration. A rebuilt projection gets a new id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeclKind {
    Class,
    Interface,
    Enum,
    Record,
    Annotation,
    /// Stand-in for a type that could not be produced
    Error,
}

/// Java access levels, ordered from most restrictive to most permissive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Visibility {
    Private,
    Package,
    Protected,
    Public,
}

impl Visibility {
    /// The more permissive of two access levels
    pub fn weakest(self, other: Visibility) -> Visibility {
        self.max(other)
    }

    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Visibility::Private => Some("private"),
            Visibility::Package => None,
            Visibility::Protected => Some("protected"),
            Visibility::Public => Some("public"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub visibility: Visibility,
    /// True only when the visibility keyword was written
    pub explicit_visibility: bool,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
    pub is_default: bool,
}

impl Default for Modifiers {
    fn default() -> Self {
        Self {
            visibility: Visibility::Package,
            explicit_visibility: false,
            is_static: false,
            is_final: false,
            is_abstract: false,
            is_default: false,
        }
    }
}

impl Modifiers {
    pub fn public() -> Self {
        Self {
            visibility: Visibility::Public,
            explicit_visibility: true,
            ..Self::default()
        }
    }

    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnnotationValue {
    Bool(bool),
    Str(String),
    ClassLit(TypeRef),
    Array(Vec<AnnotationValue>),
    Other(String),
}

impl AnnotationValue {
    /// Class literals in a single value or an array
    pub fn class_literals(&self) -> Vec<&TypeRef> {
        match self {
            AnnotationValue::ClassLit(ty) => vec![ty],
            AnnotationValue::Array(items) => items.iter().flat_map(|v| v.class_literals()).collect(),
            _ => Vec::new(),
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AnnotationValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Simple names of enum constants, e.g. `PropOption.Public` gives `Public`
    pub fn constant_names(&self) -> Vec<&str> {
        match self {
            AnnotationValue::Other(text) => {
                vec![text.rsplit('.').next().unwrap_or(text).trim()]
            }
            AnnotationValue::Array(items) => items.iter().flat_map(|v| v.constant_names()).collect(),
            _ => Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annotation {
    /// Name as written, possibly qualified
    pub name: String,
    pub args: Vec<(String, AnnotationValue)>,
}

impl Annotation {
    pub fn marker(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_value(name: impl Into<String>, value: AnnotationValue) -> Self {
        Self {
            name: name.into(),
            args: vec![("value".to_string(), value)],
        }
    }

    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    pub fn arg(&self, key: &str) -> Option<&AnnotationValue> {
        self.args.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

/// Annotations that declare an explicit property on a field
pub const PROPERTY_ANNOTATIONS: [&str; 4] = ["var", "val", "get", "set"];

/// Annotation lookup by simple name, shared by every annotated element
pub fn find_annotation<'a>(annotations: &'a [Annotation], simple_name: &str) -> Option<&'a Annotation> {
    annotations.iter().find(|a| a.simple_name() == simple_name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
    /// Initializer text of a default-valued parameter
    pub default_value: Option<String>,
    pub varargs: bool,
    pub annotations: Vec<Annotation>,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            default_value: None,
            varargs: false,
            annotations: Vec::new(),
        }
    }

    pub fn is_optional(&self) -> bool {
        self.default_value.is_some()
    }

    pub fn has_annotation(&self, simple_name: &str) -> bool {
        find_annotation(&self.annotations, simple_name).is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub ty: TypeRef,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub has_initializer: bool,
    pub span: Span,
}

impl Field {
    pub fn annotation(&self, simple_name: &str) -> Option<&Annotation> {
        find_annotation(&self.annotations, simple_name)
    }

    pub fn has_annotation(&self, simple_name: &str) -> bool {
        self.annotation(simple_name).is_some()
    }

    /// The first `@var`, `@val`, `@get` or `@set` on the field
    pub fn property_annotation(&self) -> Option<&Annotation> {
        self.annotations
            .iter()
            .find(|a| PROPERTY_ANNOTATIONS.contains(&a.simple_name()))
    }

    pub fn is_explicit_property(&self) -> bool {
        self.property_annotation().is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Method {
    pub name: String,
    /// `None` for constructors
    pub return_type: Option<TypeRef>,
    pub params: Vec<Param>,
    pub type_params: Vec<String>,
    pub throws: Vec<TypeRef>,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub is_constructor: bool,
    pub has_body: bool,
    pub span: Span,
}

impl Method {
    pub fn annotation(&self, simple_name: &str) -> Option<&Annotation> {
        find_annotation(&self.annotations, simple_name)
    }

    pub fn has_annotation(&self, simple_name: &str) -> bool {
        self.annotation(simple_name).is_some()
    }

    pub fn returns_void(&self) -> bool {
        self.return_type.as_ref().map_or(true, |t| t.is_void())
    }

    /// Erased parameter list, e.g. `(String,int[])`
    pub fn erased_params(&self, class_type_params: &[String]) -> Vec<String> {
        let vars = self.visible_type_vars(class_type_params);
        self.params.iter().map(|p| p.ty.erasure(&vars)).collect()
    }

    /// Name plus erased parameter list; equal keys are override-equivalent
    pub fn signature_key(&self, class_type_params: &[String]) -> String {
        format!("{}({})", self.name, self.erased_params(class_type_params).join(","))
    }

    fn visible_type_vars(&self, class_type_params: &[String]) -> Vec<String> {
        let mut vars = self.type_params.clone();
        vars.extend(class_type_params.iter().cloned());
        vars
    }
}

impl std::fmt::Display for Method {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}(", self.name)?;
        for (i, param) in self.params.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{} {}", param.ty, param.name)?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: DeclId,
    pub fqn: Fqn,
    pub kind: DeclKind,
    pub package: String,
    /// Single-type and on-demand (`a.b.*`) imports, static imports excluded
    pub imports: Vec<String>,
    pub modifiers: Modifiers,
    pub annotations: Vec<Annotation>,
    pub type_params: Vec<String>,
    pub superclass: Option<TypeRef>,
    pub interfaces: Vec<TypeRef>,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
    /// Directly nested types
    pub nested: Vec<Fqn>,
    pub enclosing: Option<Fqn>,
    pub span: Span,
    pub fingerprint: Fingerprint,
    pub diagnostics: Vec<Diagnostic>,
}

impl Declaration {
    /// Stand-in declaration for a type that could not be produced
    pub fn error_stub(id: DeclId, fqn: Fqn, diagnostic: Diagnostic) -> Self {
        Self {
            id,
            package: fqn.namespace().to_string(),
            fingerprint: Fingerprint::compute(diagnostic.message.as_bytes()),
            fqn,
            kind: DeclKind::Error,
            imports: Vec::new(),
            modifiers: Modifiers::public(),
            annotations: Vec::new(),
            type_params: Vec::new(),
            superclass: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
            enclosing: None,
            span: Span::zero(),
            diagnostics: vec![diagnostic],
        }
    }

    pub fn simple_name(&self) -> &str {
        self.fqn.simple_name()
    }

    pub fn is_interface(&self) -> bool {
        matches!(self.kind, DeclKind::Interface | DeclKind::Annotation)
    }

    pub fn is_error(&self) -> bool {
        self.kind == DeclKind::Error
    }

    pub fn annotation(&self, simple_name: &str) -> Option<&Annotation> {
        find_annotation(&self.annotations, simple_name)
    }

    pub fn has_annotation(&self, simple_name: &str) -> bool {
        self.annotation(simple_name).is_some()
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Method> + 'a {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn constructors(&self) -> impl Iterator<Item = &Method> {
        self.methods.iter().filter(|m| m.is_constructor)
    }
}
