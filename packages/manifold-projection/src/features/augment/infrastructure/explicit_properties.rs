//! Explicit properties
//!
//! A field annotated `@var`, `@val`, `@get` or `@set` declares a property.
//! Accessors the class does not write itself are generated; written ones
//! are checked against the property's modifiers instead. Accessor options
//! (`PropOption.Protected`, `Abstract`, `Final`) come from the annotation
//! arguments. A private property with no written accessor stays a plain
//! field.

use super::{InheritedLookup, TypeHierarchy};
use crate::features::augment::domain::{
    capitalize, Augmentation, GenerationKind, MemberBody, Origin, SyntheticMember,
};
use crate::features::projection_cache::Projection;
use crate::shared::models::{
    Annotation, Declaration, Diagnostic, DiagnosticCode, Field, Method, Modifiers, Param, TypeRef,
    Visibility,
};
use std::sync::Arc;

const OVERRIDE_ANNOTATION: &str = "override";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Get,
    Set,
}

impl Side {
    fn label(self) -> &'static str {
        match self {
            Side::Get => "get",
            Side::Set => "set",
        }
    }
}

/// Accessor switches written in a property annotation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct AccessorOptions {
    access: Option<Visibility>,
    is_abstract: bool,
    is_final: bool,
}

impl AccessorOptions {
    fn parse(annotation: &Annotation) -> Self {
        let names: Vec<&str> = annotation
            .args
            .iter()
            .flat_map(|(_, value)| value.constant_names())
            .collect();
        let has = |option: &str| names.contains(&option);
        let access = if has("Public") {
            Some(Visibility::Public)
        } else if has("Protected") {
            Some(Visibility::Protected)
        } else if has("Package") {
            Some(Visibility::Package)
        } else if has("Private") {
            Some(Visibility::Private)
        } else {
            None
        };
        Self {
            access,
            is_abstract: has("Abstract"),
            is_final: has("Final"),
        }
    }
}

/// Facts about one property field shared by both accessors
struct Property<'f> {
    field: &'f Field,
    is_static: bool,
    is_final: bool,
    /// Accessors are abstract unless the options say otherwise
    implicit_abstract: bool,
    /// Field access, public when no keyword is written
    access: Visibility,
}

impl Property<'_> {
    fn getter_name(&self) -> String {
        let name = &self.field.name;
        let ty = &self.field.ty;
        if ty.name == "boolean" && ty.dims == 0 {
            let mut rest = name.chars().skip(2);
            if name.starts_with("is") && rest.next().is_some_and(char::is_uppercase) {
                return name.clone();
            }
            return format!("is{}", capitalize(name));
        }
        format!("get{}", capitalize(name))
    }

    fn setter_name(&self) -> String {
        format!("set{}", capitalize(&self.field.name))
    }

    fn accessor_name(&self, side: Side) -> String {
        match side {
            Side::Get => self.getter_name(),
            Side::Set => self.setter_name(),
        }
    }
}

fn same_type(a: &TypeRef, b: &TypeRef) -> bool {
    a.dims == b.dims
        && a.simple_name() == b.simple_name()
        && a.wildcard == b.wildcard
        && a.args.len() == b.args.len()
        && a.args.iter().zip(&b.args).all(|(x, y)| same_type(x, y))
}

fn erased(ty: &TypeRef) -> TypeRef {
    TypeRef {
        args: Vec::new(),
        ..ty.clone()
    }
}

pub struct ExplicitProperties<'h, 'a> {
    hierarchy: &'h TypeHierarchy<'a>,
    projection: &'h Arc<Projection>,
    inherited: InheritedLookup<'h>,
}

impl<'h, 'a> ExplicitProperties<'h, 'a> {
    pub fn new(
        hierarchy: &'h TypeHierarchy<'a>,
        projection: &'h Arc<Projection>,
        inherited: InheritedLookup<'h>,
    ) -> Self {
        Self {
            hierarchy,
            projection,
            inherited,
        }
    }

    fn declaration(&self) -> &Declaration {
        self.projection.declaration()
    }

    fn is_interface(&self) -> bool {
        self.declaration().is_interface()
    }

    /// Accessors and diagnostics for every property field of the class
    pub fn generate(&self) -> Augmentation {
        let mut out = Augmentation::default();
        for field in self.declaration().fields.iter().filter(|f| f.is_explicit_property()) {
            self.property(field, &mut out);
        }
        if !out.members.is_empty() {
            tracing::trace!(
                "Generated {} property accessor(s) on {}",
                out.members.len(),
                self.projection.fqn()
            );
        }
        out
    }

    fn error(&self, out: &mut Augmentation, code: DiagnosticCode, field: &Field, message: String) {
        out.diagnostics
            .push(Diagnostic::error(code, self.projection.fqn(), field.span, message));
    }

    fn property(&self, field: &Field, out: &mut Augmentation) {
        let decl = self.declaration();
        let is_interface = self.is_interface();
        let get = field.annotation("get");
        let set = field.annotation("set");
        let val = field.annotation("val");
        let var = field.annotation("var");
        let readable = get.or(val).or(var);
        let writable = set.or(var);

        let is_static = field.modifiers.is_static;
        let is_abstract = field.modifiers.is_abstract || field.has_annotation("Abstract");
        let is_final = field.modifiers.is_final || field.has_annotation("Final");
        if let Some((code, message)) = self.modifier_conflict(is_abstract, is_final, is_static) {
            self.error(out, code, field, message);
            return;
        }

        let prop = Property {
            field,
            is_static,
            is_final,
            implicit_abstract: is_abstract
                || (is_interface && !is_static && !field.has_initializer),
            access: if field.modifiers.explicit_visibility {
                field.modifiers.visibility
            } else {
                Visibility::Public
            },
        };
        let mut make_property = field.modifiers.visibility != Visibility::Private;

        let mut getter = None;
        if let Some(annotation) = readable {
            let options = self.options(annotation);
            self.check_access(&prop, Side::Get, &options, out);
            if writable.is_none() && !is_static {
                if let Some((_, writer)) = self.super_accessor(&prop, Side::Set) {
                    if !writer.modifiers.is_static {
                        self.error(
                            out,
                            DiagnosticCode::ReadOnlyOverridesWritable,
                            field,
                            format!("Read-only property '{}' cannot override a writable '{}'", field.name, field.name),
                        );
                    }
                }
            }
            let get_abstract = prop.implicit_abstract || options.is_abstract;
            let get_final = prop.is_final || options.is_final;
            match self.modifier_conflict(get_abstract, get_final, is_static) {
                Some((code, message)) => self.error(out, code, field, message),
                None => {
                    getter = self.add_accessor(&prop, Side::Get, get_abstract, get_final, options.access, out);
                    if getter.is_none() {
                        make_property = true;
                    }
                }
            }
        } else if let Some(existing) = self.existing_accessor(&prop, Side::Get, out) {
            self.error(
                out,
                DiagnosticCode::GetterOnWriteOnly,
                field,
                format!("Getter '{}' is defined for write-only property '{}'", existing.name, field.name),
            );
        }

        let mut setter = None;
        if let Some(annotation) = writable {
            let options = self.options(annotation);
            let set_abstract = prop.implicit_abstract || is_interface || options.is_abstract;
            let set_final = prop.is_final || options.is_final;
            if field.has_initializer && set_abstract && !is_interface {
                self.error(
                    out,
                    DiagnosticCode::AbstractWritableInitializer,
                    field,
                    format!("Writable abstract property '{}' cannot have an initializer", field.name),
                );
            }
            self.check_access(&prop, Side::Set, &options, out);
            if readable.is_none() && !is_static {
                if let Some((_, reader)) = self.super_accessor(&prop, Side::Get) {
                    if !reader.modifiers.is_static {
                        self.error(
                            out,
                            DiagnosticCode::WriteOnlyOverridesReadable,
                            field,
                            format!("Write-only property '{}' cannot override a readable '{}'", field.name, field.name),
                        );
                    }
                }
            }
            match self.modifier_conflict(set_abstract, set_final, is_static) {
                Some((code, message)) => self.error(out, code, field, message),
                None => {
                    setter = self.add_accessor(&prop, Side::Set, set_abstract, set_final, options.access, out);
                    if setter.is_none() {
                        make_property = true;
                    }
                }
            }
        } else if let Some(existing) = self.existing_accessor(&prop, Side::Set, out) {
            self.error(
                out,
                DiagnosticCode::SetterOnReadOnly,
                field,
                format!("Setter '{}' is defined for read-only property '{}'", existing.name, field.name),
            );
        }

        self.verify_override(&prop, readable.is_some(), writable.is_some(), out);

        if !make_property {
            return;
        }
        if (getter.is_some() || setter.is_some()) && is_interface && is_static {
            self.error(
                out,
                DiagnosticCode::StaticInterfaceProperty,
                field,
                format!("Static interface property '{}' must not be field-backed", field.name),
            );
            return;
        }
        for (method, side) in [(getter, Side::Get), (setter, Side::Set)] {
            let Some(method) = method else { continue };
            let generation = match side {
                Side::Get => GenerationKind::ExplicitGetter {
                    field: field.name.clone(),
                },
                Side::Set => GenerationKind::ExplicitSetter {
                    field: field.name.clone(),
                },
            };
            out.members.push(SyntheticMember {
                name: method.name.clone(),
                body: MemberBody::Method(method),
                generation,
                origin: Origin {
                    declaration: decl.fqn.clone(),
                    member: field.name.clone(),
                    span: field.span,
                },
            });
        }
    }

    /// Generated accessors in interfaces are always public
    fn options(&self, annotation: &Annotation) -> AccessorOptions {
        let mut options = AccessorOptions::parse(annotation);
        if self.is_interface() {
            options.access = Some(Visibility::Public);
        }
        options
    }

    fn modifier_conflict(
        &self,
        is_abstract: bool,
        is_final: bool,
        is_static: bool,
    ) -> Option<(DiagnosticCode, String)> {
        if is_final && is_abstract {
            return Some((
                DiagnosticCode::FinalAbstractProperty,
                "'final' is not allowed on an abstract property".to_string(),
            ));
        }
        if is_final && is_static {
            return Some((
                DiagnosticCode::FinalStaticProperty,
                "'final' is not allowed on a static property".to_string(),
            ));
        }
        if is_abstract && !self.is_interface() && !self.declaration().modifiers.is_abstract {
            return Some((
                DiagnosticCode::AbstractPropertyInConcreteClass,
                format!("Abstract property in non-abstract class {}", self.projection.fqn()),
            ));
        }
        None
    }

    fn check_access(&self, prop: &Property<'_>, side: Side, options: &AccessorOptions, out: &mut Augmentation) {
        if self.is_interface() {
            return;
        }
        if let Some(access) = options.access {
            if access > prop.access {
                self.error(
                    out,
                    DiagnosticCode::AccessorWeakerThanProperty,
                    prop.field,
                    format!(
                        "The {} accessor's access cannot be weaker than the property's ({:?})",
                        side.label(),
                        prop.access
                    ),
                );
            }
        }
    }

    fn make_accessor(
        &self,
        prop: &Property<'_>,
        side: Side,
        is_abstract: bool,
        is_final: bool,
        access: Option<Visibility>,
    ) -> Method {
        let visibility = access.unwrap_or(prop.access);
        let field = prop.field;
        let (return_type, params) = match side {
            Side::Get => (field.ty.clone(), Vec::new()),
            Side::Set => (TypeRef::void(), vec![Param::new("value", field.ty.clone())]),
        };
        Method {
            name: prop.accessor_name(side),
            return_type: Some(return_type),
            params,
            type_params: Vec::new(),
            throws: Vec::new(),
            modifiers: Modifiers {
                visibility,
                explicit_visibility: visibility != Visibility::Package,
                is_static: prop.is_static,
                is_final,
                is_abstract,
                is_default: self.is_interface() && !is_abstract && !prop.is_static,
            },
            annotations: Vec::new(),
            is_constructor: false,
            has_body: !is_abstract,
            span: field.span,
        }
    }

    /// `None` when the class already writes the accessor
    fn add_accessor(
        &self,
        prop: &Property<'_>,
        side: Side,
        is_abstract: bool,
        is_final: bool,
        access: Option<Visibility>,
        out: &mut Augmentation,
    ) -> Option<Method> {
        if let Some(existing) = self.existing_accessor(prop, side, out) {
            self.verify_accessor(prop, existing, is_abstract, is_final, access, out);
            return None;
        }
        let field = prop.field;
        if self.is_interface() && prop.is_static && !field.has_initializer {
            let signature = match side {
                Side::Get => format!("{}() : {}", prop.getter_name(), field.ty),
                Side::Set => format!("{}({})", prop.setter_name(), field.ty),
            };
            self.error(
                out,
                DiagnosticCode::MissingStaticAccessor,
                field,
                format!(
                    "{} must define {} for static property '{}'",
                    self.projection.fqn(),
                    signature,
                    field.name
                ),
            );
        }
        Some(self.make_accessor(prop, side, is_abstract, is_final, access))
    }

    /// Own method with the accessor's name and parameter types. A match on
    /// erased parameter types only is accepted with a warning.
    fn existing_accessor<'d>(&'d self, prop: &Property<'_>, side: Side, out: &mut Augmentation) -> Option<&'d Method> {
        let decl = self.declaration();
        let name = prop.accessor_name(side);
        let expected: Vec<&TypeRef> = match side {
            Side::Get => Vec::new(),
            Side::Set => vec![&prop.field.ty],
        };
        'methods: for method in decl.methods.iter().filter(|m| !m.is_constructor) {
            if method.name != name || method.params.len() != expected.len() {
                continue;
            }
            let mut warnings = Vec::new();
            for (param, want) in method.params.iter().zip(&expected) {
                if same_type(want, &param.ty) {
                    continue;
                }
                if want.erasure(&decl.type_params) != param.ty.erasure(&decl.type_params) {
                    continue 'methods;
                }
                warnings.push(Diagnostic::warning(
                    DiagnosticCode::AccessorErasureMatch,
                    self.projection.fqn(),
                    method.span,
                    format!(
                        "'{}' parameter type {} matches property '{}' of type {} only after erasure",
                        method.name, param.ty, prop.field.name, want
                    ),
                ));
            }
            out.diagnostics.extend(warnings);
            return Some(method);
        }
        None
    }

    fn verify_accessor(
        &self,
        prop: &Property<'_>,
        existing: &Method,
        is_abstract: bool,
        is_final: bool,
        access: Option<Visibility>,
        out: &mut Augmentation,
    ) {
        let field = prop.field;
        let conflict = |what: &str| {
            format!(
                "Property '{}' conflicts with method '{}' on {}",
                field.name, existing.name, what
            )
        };
        if is_abstract != existing.modifiers.is_abstract && !self.is_interface() {
            self.error(out, DiagnosticCode::AccessorConflict, field, conflict("'abstract'"));
        }
        if is_final != existing.modifiers.is_final {
            self.error(out, DiagnosticCode::AccessorConflict, field, conflict("'final'"));
        }
        let expected = access.unwrap_or(prop.access);
        if existing.modifiers.visibility != expected {
            self.error(
                out,
                DiagnosticCode::AccessorConflict,
                field,
                conflict(&format!("{:?} access", expected)),
            );
        }
        if existing.modifiers.is_static != prop.is_static {
            let message = if existing.modifiers.is_static {
                format!("Static method '{}' cannot access non-static property '{}'", existing.name, field.name)
            } else {
                format!("Non-static method '{}' cannot access static property '{}'", existing.name, field.name)
            };
            self.error(out, DiagnosticCode::AccessorStaticMismatch, field, message);
        }
    }

    /// Nearest supertype method the accessor would override, including
    /// accessors synthesized on the supertype. Static interface methods
    /// and private methods are not inherited.
    fn super_accessor(&self, prop: &Property<'_>, side: Side) -> Option<(Arc<Projection>, Method)> {
        let name = prop.accessor_name(side);
        let params: Vec<String> = match side {
            Side::Get => Vec::new(),
            Side::Set => vec![prop.field.ty.erasure(&self.declaration().type_params)],
        };
        for ancestor in self.hierarchy.ancestors(self.projection) {
            let decl = ancestor.declaration();
            let augmentation = (self.inherited)(&ancestor);
            let synthesized = augmentation
                .as_deref()
                .into_iter()
                .flat_map(|a| a.members.iter().filter_map(|m| m.as_method()));
            let found = decl
                .methods
                .iter()
                .filter(|m| !m.is_constructor)
                .chain(synthesized)
                .find(|m| {
                    m.name == name
                        && m.modifiers.visibility != Visibility::Private
                        && !(decl.is_interface() && m.modifiers.is_static)
                        && m.erased_params(&decl.type_params) == params
                })
                .cloned();
            if let Some(method) = found {
                return Some((ancestor, method));
            }
        }
        None
    }

    fn verify_override(&self, prop: &Property<'_>, readable: bool, writable: bool, out: &mut Augmentation) {
        let field = prop.field;
        let overrides_nothing = format!("Property '{}' does not override anything", field.name);
        let cannot_override = |method: &Method| {
            format!("Property '{}' cannot override static method '{}'", field.name, method.name)
        };

        if !field.has_annotation(OVERRIDE_ANNOTATION) {
            if prop.is_static {
                return;
            }
            let sides = [(readable, Side::Get), (writable, Side::Set)];
            for (present, side) in sides {
                if !present {
                    continue;
                }
                if let Some((_, method)) = self.super_accessor(prop, side) {
                    if method.modifiers.is_static {
                        self.error(out, DiagnosticCode::CannotOverrideStatic, field, cannot_override(&method));
                    } else {
                        self.error(
                            out,
                            DiagnosticCode::MissingOverride,
                            field,
                            format!("Property '{}' overrides a supertype property; add @override", field.name),
                        );
                    }
                    return;
                }
            }
            return;
        }

        if prop.is_static {
            self.error(out, DiagnosticCode::PropertyOverridesNothing, field, overrides_nothing);
            return;
        }
        if readable {
            match self.super_accessor(prop, Side::Get) {
                Some((_, reader)) if reader.modifiers.is_static => {
                    self.error(out, DiagnosticCode::CannotOverrideStatic, field, cannot_override(&reader));
                }
                Some((owner, reader)) => {
                    let compatible = reader.return_type.as_ref().is_some_and(|ret| {
                        self.hierarchy.is_assignable(
                            self.declaration(),
                            &erased(ret),
                            &erased(&field.ty),
                            &owner.declaration().type_params,
                        )
                    });
                    if !compatible {
                        self.error(
                            out,
                            DiagnosticCode::PropertyReturnClash,
                            field,
                            format!(
                                "Property '{}' in {} clashes with the return type of '{}' in {}",
                                field.name,
                                self.projection.fqn(),
                                reader.name,
                                owner.fqn()
                            ),
                        );
                    }
                }
                None if writable => match self.super_accessor(prop, Side::Set) {
                    Some((_, writer)) if writer.modifiers.is_static => {
                        self.error(out, DiagnosticCode::CannotOverrideStatic, field, cannot_override(&writer));
                    }
                    Some(_) => {}
                    None => self.error(out, DiagnosticCode::PropertyOverridesNothing, field, overrides_nothing),
                },
                None => self.error(out, DiagnosticCode::PropertyOverridesNothing, field, overrides_nothing),
            }
        } else if writable {
            match self.super_accessor(prop, Side::Set) {
                Some((_, writer)) if writer.modifiers.is_static => {
                    self.error(out, DiagnosticCode::CannotOverrideStatic, field, cannot_override(&writer));
                }
                Some(_) => {}
                None => self.error(out, DiagnosticCode::PropertyOverridesNothing, field, overrides_nothing),
            }
        }
    }
}
