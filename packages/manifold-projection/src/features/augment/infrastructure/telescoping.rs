//! Optional-parameter telescoping
//!
//! For `foo(String a, int b = 1, int c = 2)` this generates:
//! - a holder type `$foo__a` whose constructor takes every argument plus a
//!   presence flag ahead of each optional one,
//! - a forwarder `foo($foo__a args)`,
//! - the overloads `foo(String)` and `foo(String, int)`.

use super::TypeHierarchy;
use crate::features::augment::domain::{
    capitalize, decapitalize, GenerationKind, HolderType, MemberBody, Origin, SyntheticMember,
};
use crate::features::augment::Augmentation;
use crate::features::projection_cache::Projection;
use crate::shared::models::{
    Annotation, AnnotationValue, Diagnostic, DiagnosticCode, Method, Modifiers, Param, TypeRef,
    Visibility,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

const CONSTRUCTOR_NAME: &str = "constructor";
const PARAMS_ANNOTATION: &str = "params";

/// Type of a default-value literal, `None` when it is not a plain literal
pub fn literal_type(text: &str) -> Option<TypeRef> {
    let text = text.trim();
    match text {
        "" => return None,
        "null" => return Some(TypeRef::simple("null")),
        "true" | "false" => return Some(TypeRef::boolean()),
        _ => {}
    }
    if text.starts_with('"') {
        return Some(TypeRef::simple("String"));
    }
    if text.starts_with('\'') {
        return Some(TypeRef::simple("char"));
    }
    let digits = text.strip_prefix('-').unwrap_or(text);
    if !digits.starts_with(|c: char| c.is_ascii_digit() || c == '.') {
        return None;
    }
    if !digits
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_' || c == '+' || c == '-')
    {
        return None;
    }
    let lower = digits.to_ascii_lowercase();
    let is_hex = lower.starts_with("0x");
    let name = if lower.ends_with('l') {
        "long"
    } else if !is_hex && lower.ends_with('f') {
        "float"
    } else if !is_hex && (lower.ends_with('d') || lower.contains('.') || lower.contains('e')) {
        "double"
    } else {
        "int"
    };
    Some(TypeRef::simple(name))
}

/// `@params` value: `_a` for required, `_opt$b` for optional parameters
fn params_signature(method: &Method) -> String {
    method
        .params
        .iter()
        .map(|p| {
            if p.is_optional() {
                format!("_opt${}", p.name)
            } else {
                format!("_{}", p.name)
            }
        })
        .collect()
}

fn params_annotation(method: &Method) -> Annotation {
    Annotation::with_value(
        PARAMS_ANNOTATION,
        AnnotationValue::Str(params_signature(method)),
    )
}

pub fn holder_name(method: &Method) -> String {
    let base = if method.is_constructor {
        CONSTRUCTOR_NAME
    } else {
        method.name.as_str()
    };
    let required: String = method
        .params
        .iter()
        .filter(|p| !p.is_optional())
        .map(|p| format!("_{}", p.name))
        .collect();
    format!("${}_{}", base, required)
}

fn required(param: &Param) -> Param {
    Param {
        default_value: None,
        ..param.clone()
    }
}

pub struct Telescoper<'h, 'a> {
    hierarchy: &'h TypeHierarchy<'a>,
    projection: &'h Arc<Projection>,
}

impl<'h, 'a> Telescoper<'h, 'a> {
    pub fn new(hierarchy: &'h TypeHierarchy<'a>, projection: &'h Arc<Projection>) -> Self {
        Self {
            hierarchy,
            projection,
        }
    }

    pub fn telescope(&self) -> Augmentation {
        let decl = self.projection.declaration();
        let class_vars = &decl.type_params;
        let mut out = Augmentation::default();

        let physical: FxHashSet<String> = decl
            .methods
            .iter()
            .map(|m| m.signature_key(class_vars))
            .collect();
        let inherited: FxHashSet<String> = self
            .hierarchy
            .inherited_methods(self.projection)
            .into_iter()
            .filter(|(_, m)| {
                !m.modifiers.is_static
                    && m.modifiers.visibility != Visibility::Private
                    && !m.has_annotation(PARAMS_ANNOTATION)
            })
            .map(|(owner, m)| m.signature_key(&owner.declaration().type_params))
            .collect();
        // overload signature -> index of the method that generated it
        let mut generated: FxHashMap<String, usize> = FxHashMap::default();

        for (index, method) in decl.methods.iter().enumerate() {
            if !method.params.iter().any(Param::is_optional) {
                continue;
            }
            self.check_defaults(method, &mut out);
            self.emit_holder(method, &mut out);
            self.emit_forwarder(method, &mut out);

            let optional_count = method.params.iter().filter(|p| p.is_optional()).count();
            for kept in 0..optional_count {
                let overload = overload(method, kept);
                let key = overload.signature_key(class_vars);
                if physical.contains(&key) {
                    out.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::TelescopeClashesWithPhysical,
                        self.projection.fqn(),
                        method.span,
                        format!("Telescoped overload {} clashes with an existing method", key),
                    ));
                    continue;
                }
                match generated.get(&key) {
                    Some(&owner) if owner != index => {
                        out.diagnostics.push(Diagnostic::error(
                            DiagnosticCode::TelescopeClash,
                            self.projection.fqn(),
                            method.span,
                            format!(
                                "Telescoped overload {} clashes with one generated for another method",
                                key
                            ),
                        ));
                        continue;
                    }
                    Some(_) => continue,
                    None => {}
                }
                if !method.is_constructor && inherited.contains(&key) {
                    out.diagnostics.push(Diagnostic::warning(
                        DiagnosticCode::TelescopeOverridesInherited,
                        self.projection.fqn(),
                        method.span,
                        format!("Telescoped overload {} overrides an inherited method", key),
                    ));
                }
                generated.insert(key, index);
                out.members.push(SyntheticMember {
                    name: overload.name.clone(),
                    generation: GenerationKind::TelescopedOverload {
                        target: method.name.clone(),
                        arity: overload.params.len(),
                    },
                    body: MemberBody::Method(overload),
                    origin: self.origin(method),
                });
            }
        }
        out
    }

    fn origin(&self, method: &Method) -> Origin {
        Origin {
            declaration: self.projection.fqn().clone(),
            member: method.name.clone(),
            span: method.span,
        }
    }

    fn check_defaults(&self, method: &Method, out: &mut Augmentation) {
        let decl = self.projection.declaration();
        let mut vars = method.type_params.clone();
        vars.extend(decl.type_params.iter().cloned());
        for param in method.params.iter().filter(|p| p.is_optional()) {
            let Some(value) = param.default_value.as_deref() else {
                continue;
            };
            let Some(literal) = literal_type(value) else {
                continue;
            };
            let narrowed = literal.name == "int"
                && matches!(
                    param.ty.simple_name(),
                    "byte" | "short" | "char" | "Byte" | "Short" | "Character"
                )
                && param.ty.dims == 0;
            if narrowed || self.hierarchy.is_assignable(decl, &param.ty, &literal, &vars) {
                continue;
            }
            out.diagnostics.push(Diagnostic::error(
                DiagnosticCode::IncompatibleDefault,
                self.projection.fqn(),
                method.span,
                format!(
                    "Default value {} is not assignable to parameter {} of type {}",
                    value, param.name, param.ty
                ),
            ));
        }
    }

    fn holder_type_params(&self, method: &Method) -> Vec<String> {
        let mut vars = method.type_params.clone();
        if !method.modifiers.is_static {
            for var in &self.projection.declaration().type_params {
                if !vars.contains(var) {
                    vars.push(var.clone());
                }
            }
        }
        vars
    }

    fn emit_holder(&self, method: &Method, out: &mut Augmentation) {
        let decl = self.projection.declaration();
        let name = holder_name(method);
        let mut params = Vec::new();
        if !method.modifiers.is_static && !method.is_constructor {
            let class_type = TypeRef::simple(decl.simple_name()).with_args(
                decl.type_params.iter().map(TypeRef::simple).collect(),
            );
            params.push(Param::new(format!("${}", decapitalize(decl.simple_name())), class_type));
        }
        for param in &method.params {
            if param.is_optional() {
                params.push(Param::new(
                    format!("$is{}", capitalize(&param.name)),
                    TypeRef::boolean(),
                ));
            }
            params.push(required(param));
        }
        let constructor = Method {
            name: name.clone(),
            return_type: None,
            params,
            type_params: Vec::new(),
            throws: Vec::new(),
            modifiers: Modifiers::public(),
            annotations: Vec::new(),
            is_constructor: true,
            has_body: true,
            span: method.span,
        };
        out.members.push(SyntheticMember {
            name: name.clone(),
            body: MemberBody::Type(HolderType {
                name,
                type_params: self.holder_type_params(method),
                modifiers: Modifiers::public().with_static(true),
                annotations: vec![params_annotation(method)],
                constructor,
            }),
            generation: GenerationKind::ParamsHolder {
                target: method.name.clone(),
            },
            origin: self.origin(method),
        });
    }

    fn emit_forwarder(&self, method: &Method, out: &mut Augmentation) {
        let holder = TypeRef::simple(holder_name(method)).with_args(
            self.holder_type_params(method)
                .iter()
                .map(TypeRef::simple)
                .collect(),
        );
        let mut annotations = method.annotations.clone();
        annotations.push(params_annotation(method));
        let forwarder = Method {
            params: vec![Param::new("args", holder)],
            annotations,
            has_body: true,
            ..method.clone()
        };
        out.members.push(SyntheticMember {
            name: forwarder.name.clone(),
            body: MemberBody::Method(forwarder),
            generation: GenerationKind::ParamsForwarder {
                target: method.name.clone(),
            },
            origin: self.origin(method),
        });
    }
}

/// Required parameters plus the first `kept` optional ones, in order
fn overload(method: &Method, kept: usize) -> Method {
    let mut seen_optional = 0;
    let params = method
        .params
        .iter()
        .filter(|p| {
            if !p.is_optional() {
                return true;
            }
            seen_optional += 1;
            seen_optional <= kept
        })
        .map(required)
        .collect();
    Method {
        params,
        has_body: true,
        ..method.clone()
    }
}
