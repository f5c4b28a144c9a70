//! Property inference
//!
//! Getter/setter methods (own and extension) are grouped by derived
//! property name. Each name yields at most one property: read-write when
//! some getter/setter pair agrees on static-ness and the setter accepts the
//! getter's type, otherwise read-only or write-only when only one side
//! exists. An existing compatible field is reused instead of declaring a
//! second one.

use super::TypeHierarchy;
use crate::features::augment::domain::{
    capitalize, derive_property_name, AccessorPrefix, Augmentation, FieldAdjustment,
    GenerationKind, MemberBody, Origin, PropertyAccess, SyntheticMember,
};
use crate::features::projection_cache::Projection;
use crate::shared::models::{Field, Method, Modifiers, TypeRef, Visibility};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// Augmentation of an ancestor, used to see its inferred property fields
pub type InheritedLookup<'f> = &'f dyn Fn(&Arc<Projection>) -> Option<Arc<Augmentation>>;

#[derive(Debug, Clone)]
struct Accessor {
    property: String,
    ty: TypeRef,
    method: Method,
}

impl Accessor {
    fn is_static(&self) -> bool {
        self.method.modifiers.is_static
    }

    fn visibility(&self) -> Visibility {
        self.method.modifiers.visibility
    }
}

#[derive(Default)]
struct Group {
    getters: Vec<Accessor>,
    setters: Vec<Accessor>,
}

/// A same-named field found in the class or its ancestry
enum ExistingField {
    Own(Field),
    Ancestor {
        field: Field,
        owner_is_interface: bool,
        inferred: Option<PropertyAccess>,
    },
    /// Present but not visible from the class
    Inaccessible,
}

enum Outcome {
    /// Declare a field with this visibility; carries the access of an
    /// ancestor property being redeclared
    Create(Visibility, Option<PropertyAccess>),
    /// Reused, explicit or conflicting; declare nothing
    Skip,
}

/// What a synthesized property is built from
struct Candidate<'g> {
    name: &'g str,
    ty: TypeRef,
    is_static: bool,
    visibility: Visibility,
    access: PropertyAccess,
    getter: Option<&'g Accessor>,
    setter: Option<&'g Accessor>,
    /// Accessor the property navigates to: the getter when there is one
    origin: &'g Accessor,
}

/// Access an `@var`/`@val`/`@get`/`@set` field declares
pub(crate) fn explicit_access(field: &Field) -> PropertyAccess {
    let has = |a: &str| field.has_annotation(a);
    if has("var") || (has("get") && has("set")) {
        PropertyAccess::ReadWrite
    } else if has("set") {
        PropertyAccess::WriteOnly
    } else {
        PropertyAccess::ReadOnly
    }
}

fn is_getter_shape(method: &Method) -> bool {
    !method.is_constructor && method.params.is_empty() && !method.returns_void()
}

fn is_setter_shape(method: &Method) -> bool {
    !method.is_constructor && method.params.len() == 1 && method.returns_void()
}

pub struct PropertyInference<'h, 'a> {
    hierarchy: &'h TypeHierarchy<'a>,
    projection: &'h Arc<Projection>,
    inherited: InheritedLookup<'h>,
}

impl<'h, 'a> PropertyInference<'h, 'a> {
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

    /// Infer properties from the class's own methods plus `extra` methods
    /// (extension methods already projected onto the class)
    pub fn infer(&self, extra: &[Method]) -> Augmentation {
        let decl = self.projection.declaration();
        let methods: Vec<&Method> = decl
            .methods
            .iter()
            .chain(extra.iter())
            .filter(|m| !m.is_constructor && !m.has_annotation("propgen"))
            .collect();

        let (order, groups) = gather(&methods);
        let mut out = Augmentation::default();
        for name in &order {
            let Some(group) = groups.get(name) else {
                continue;
            };
            match (group.getters.first(), group.setters.first()) {
                (Some(_), Some(_)) => {
                    if let Some((getter, setter)) = self.pair(group) {
                        let candidate = Candidate {
                            name,
                            ty: self.more_specific(getter, setter),
                            is_static: getter.is_static(),
                            visibility: getter.visibility().weakest(setter.visibility()),
                            access: PropertyAccess::ReadWrite,
                            getter: Some(getter),
                            setter: Some(setter),
                            origin: getter,
                        };
                        self.make(candidate, &mut out);
                    }
                }
                (Some(getter), None) => {
                    let candidate = Candidate {
                        name,
                        ty: getter.ty.clone(),
                        is_static: getter.is_static(),
                        visibility: getter.visibility(),
                        access: PropertyAccess::ReadOnly,
                        getter: Some(getter),
                        setter: None,
                        origin: getter,
                    };
                    self.make(candidate, &mut out);
                }
                (None, Some(setter)) => {
                    let candidate = Candidate {
                        name,
                        ty: setter.ty.clone(),
                        is_static: setter.is_static(),
                        visibility: setter.visibility(),
                        access: PropertyAccess::WriteOnly,
                        getter: None,
                        setter: Some(setter),
                        origin: setter,
                    };
                    self.make(candidate, &mut out);
                }
                (None, None) => {}
            }
        }
        out
    }

    fn type_vars(&self, method: &Method) -> Vec<String> {
        let mut vars = method.type_params.clone();
        vars.extend(self.projection.declaration().type_params.iter().cloned());
        vars
    }

    fn assignable(&self, to: &TypeRef, from: &TypeRef, method: &Method) -> bool {
        self.hierarchy
            .is_assignable(self.projection.declaration(), to, from, &self.type_vars(method))
    }

    /// First getter/setter pair in declaration order that agrees on
    /// static-ness and whose setter accepts the getter's type
    fn pair<'g>(&self, group: &'g Group) -> Option<(&'g Accessor, &'g Accessor)> {
        group.getters.iter().find_map(|getter| {
            group
                .setters
                .iter()
                .find(|setter| {
                    getter.is_static() == setter.is_static()
                        && self.assignable(&setter.ty, &getter.ty, &setter.method)
                })
                .map(|setter| (getter, setter))
        })
    }

    fn more_specific(&self, getter: &Accessor, setter: &Accessor) -> TypeRef {
        if getter.ty == setter.ty || self.assignable(&setter.ty, &getter.ty, &setter.method) {
            getter.ty.clone()
        } else {
            setter.ty.clone()
        }
    }

    fn make(&self, candidate: Candidate<'_>, out: &mut Augmentation) {
        let Outcome::Create(visibility, inherited) = self.handle_existing(&candidate, out) else {
            return;
        };
        // Redeclaring an ancestor property keeps the side the ancestor adds
        let access = match (candidate.access, inherited) {
            (PropertyAccess::ReadOnly, Some(PropertyAccess::ReadWrite | PropertyAccess::WriteOnly))
            | (PropertyAccess::WriteOnly, Some(PropertyAccess::ReadWrite | PropertyAccess::ReadOnly)) => {
                PropertyAccess::ReadWrite
            }
            (access, _) => access,
        };

        let origin = candidate.origin;
        let field = Field {
            name: candidate.name.to_string(),
            ty: candidate.ty.clone(),
            modifiers: Modifiers {
                visibility,
                explicit_visibility: true,
                is_static: candidate.is_static,
                ..Modifiers::default()
            },
            annotations: Vec::new(),
            has_initializer: false,
            span: origin.method.span,
        };
        out.members.push(SyntheticMember {
            name: candidate.name.to_string(),
            body: MemberBody::Field(field),
            generation: GenerationKind::InferredProperty {
                access,
                getter: candidate.getter.map(|g| g.method.name.clone()),
                setter: candidate.setter.map(|s| s.method.name.clone()),
            },
            origin: Origin {
                declaration: self.projection.fqn().clone(),
                member: origin.method.name.clone(),
                span: origin.method.span,
            },
        });
    }

    fn handle_existing(&self, candidate: &Candidate<'_>, out: &mut Augmentation) -> Outcome {
        let Some(existing) = self.find_existing(candidate.name) else {
            return Outcome::Create(candidate.visibility, None);
        };
        let (field, owner_is_interface, inferred, own) = match existing {
            ExistingField::Inaccessible => return Outcome::Create(candidate.visibility, None),
            ExistingField::Own(field) => (field, false, None, true),
            ExistingField::Ancestor {
                field,
                owner_is_interface,
                inferred,
            } => (field, owner_is_interface, inferred, false),
        };

        let explicit = field.is_explicit_property();
        let is_property = inferred.is_some() || explicit;
        let compatible = self.assignable(&candidate.ty, &field.ty, &candidate.origin.method)
            && field.modifiers.is_static == candidate.is_static
            && (field.modifiers.visibility != Visibility::Public || is_property)
            && (!candidate.is_static || !owner_is_interface);
        if !compatible {
            tracing::trace!(
                "Field {} on {} conflicts with inferred property",
                field.name,
                self.projection.fqn()
            );
            return Outcome::Skip;
        }

        let declared = if explicit && !field.modifiers.explicit_visibility {
            Visibility::Public
        } else {
            field.modifiers.visibility
        };
        let effective = declared.weakest(candidate.visibility);

        if own {
            if !explicit {
                out.adjustments.push(FieldAdjustment {
                    field: field.name.clone(),
                    declared,
                    effective,
                    access: candidate.access,
                    getter: candidate.getter.map(|g| g.method.name.clone()),
                    setter: candidate.setter.map(|s| s.method.name.clone()),
                });
            }
            return Outcome::Skip;
        }
        if is_property {
            let ancestor_access = inferred.unwrap_or_else(|| explicit_access(&field));
            return Outcome::Create(effective, Some(ancestor_access));
        }
        Outcome::Skip
    }

    /// Own fields, then the superclass chain, then non-static fields of
    /// implemented interfaces
    fn find_existing(&self, name: &str) -> Option<ExistingField> {
        if let Some(field) = self.projection.declaration().field(name) {
            return Some(ExistingField::Own(field.clone()));
        }
        for ancestor in self.hierarchy.superclass_chain(self.projection) {
            if let Some(hit) = self.field_in(&ancestor, name, false) {
                return Some(hit);
            }
        }
        for iface in self.hierarchy.interfaces_of(self.projection) {
            match self.field_in(&iface.projection, name, true) {
                Some(ExistingField::Ancestor { field, .. }) if field.modifiers.is_static => {}
                Some(hit) => return Some(hit),
                None => {}
            }
        }
        None
    }

    fn field_in(&self, owner: &Arc<Projection>, name: &str, owner_is_interface: bool) -> Option<ExistingField> {
        let decl = owner.declaration();
        let (field, inferred) = match decl.field(name) {
            Some(field) => (field.clone(), None),
            None => {
                let augmentation = (self.inherited)(owner)?;
                let member = augmentation
                    .members
                    .iter()
                    .find(|m| m.is_property() && m.name == name)?;
                (member.as_field()?.clone(), member.property_access())
            }
        };
        let visible = match field.modifiers.visibility {
            Visibility::Public | Visibility::Protected => true,
            Visibility::Package => decl.package == self.projection.declaration().package,
            Visibility::Private => false,
        };
        if !visible {
            return Some(ExistingField::Inaccessible);
        }
        Some(ExistingField::Ancestor {
            field,
            owner_is_interface,
            inferred,
        })
    }
}

/// Group accessors by property name, keeping first-seen order
fn gather(methods: &[&Method]) -> (Vec<String>, FxHashMap<String, Group>) {
    let get_roots: FxHashSet<String> = methods
        .iter()
        .filter(|m| is_getter_shape(m))
        .filter_map(|m| derive_property_name(&m.name, AccessorPrefix::Get))
        .collect();

    let mut order = Vec::new();
    let mut groups: FxHashMap<String, Group> = FxHashMap::default();
    let mut add = |accessor: Accessor, setter: bool| {
        let group = groups.entry(accessor.property.clone()).or_insert_with(|| {
            order.push(accessor.property.clone());
            Group::default()
        });
        if setter {
            group.setters.push(accessor);
        } else {
            group.getters.push(accessor);
        }
    };

    for method in methods {
        if is_getter_shape(method) {
            let ty = method.return_type.clone().unwrap_or_else(TypeRef::void);
            let property = match derive_property_name(&method.name, AccessorPrefix::Get) {
                Some(name) => Some(name),
                None if ty.is_boolean() => derive_property_name(&method.name, AccessorPrefix::Is)
                    .map(|root| {
                        // `isX` keeps its prefix only when `getX` also exists
                        if get_roots.contains(&root) {
                            format!("is{}", capitalize(&root))
                        } else {
                            root
                        }
                    }),
                None => None,
            };
            if let Some(property) = property {
                add(
                    Accessor {
                        property,
                        ty,
                        method: (*method).clone(),
                    },
                    false,
                );
            }
        }
        if is_setter_shape(method) {
            if let Some(property) = derive_property_name(&method.name, AccessorPrefix::Set) {
                add(
                    Accessor {
                        property,
                        ty: method.params[0].ty.clone(),
                        method: (*method).clone(),
                    },
                    true,
                );
            }
        }
    }
    (order, groups)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::projection_cache::{
        ModuleId, ModuleRegistry, ProjectionCache, ProjectionMetrics, ResolveScope,
    };
    use crate::features::source_producer::InMemorySourceProducer;
    use crate::shared::models::Fqn;
    use pretty_assertions::assert_eq;
    use prometheus::Registry;

    struct Env {
        cache: ProjectionCache,
        modules: ModuleRegistry,
        module: ModuleId,
    }

    fn env(types: &[(&str, &str)]) -> Env {
        let metrics = ProjectionMetrics::new(&Registry::new(), "props").unwrap();
        let modules = ModuleRegistry::new();
        let module = modules.add_module("m");
        let producer = InMemorySourceProducer::primary("mem");
        for (fqn, src) in types {
            producer.insert(fqn, *src, vec![]);
        }
        modules.add_producer(module, Arc::new(producer)).unwrap();
        Env {
            cache: ProjectionCache::new(Arc::new(metrics)),
            modules,
            module,
        }
    }

    fn infer(env: &Env, fqn: &str) -> Augmentation {
        let scope = ResolveScope::new(&env.cache, &env.modules, env.module);
        let hierarchy = TypeHierarchy::new(&scope, env.module);
        let projection = hierarchy.resolve_fqn(fqn).unwrap();
        let none = |_: &Arc<Projection>| -> Option<Arc<Augmentation>> { None };
        PropertyInference::new(&hierarchy, &projection, &none).infer(&[])
    }

    fn field<'a>(aug: &'a Augmentation, name: &str) -> &'a SyntheticMember {
        aug.members.iter().find(|m| m.name == name).unwrap()
    }

    #[test]
    fn test_getter_setter_pair_is_read_write_with_weakest_visibility() {
        let env = env(&[(
            "a.Bean",
            "package a; public class Bean {\n\
               protected String getFoo() { return null; }\n\
               public void setFoo(String s) {}\n\
             }",
        )]);
        let aug = infer(&env, "a.Bean");
        assert_eq!(aug.members.len(), 1);
        let foo = field(&aug, "foo");
        let f = foo.as_field().unwrap();
        assert_eq!(f.ty, TypeRef::simple("String"));
        assert_eq!(f.modifiers.visibility, Visibility::Public);
        assert_eq!(foo.property_access(), Some(PropertyAccess::ReadWrite));
    }

    #[test]
    fn test_is_getter_alone_is_read_only_without_prefix() {
        let env = env(&[(
            "a.Task",
            "package a; class Task { boolean isReady() { return true; } }",
        )]);
        let aug = infer(&env, "a.Task");
        let ready = field(&aug, "ready");
        assert_eq!(ready.property_access(), Some(PropertyAccess::ReadOnly));
        assert_eq!(ready.as_field().unwrap().ty, TypeRef::boolean());
        assert!(aug.members.iter().all(|m| m.name != "isReady"));
    }

    #[test]
    fn test_is_getter_keeps_prefix_next_to_get_getter() {
        let env = env(&[(
            "a.Shelf",
            "package a; class Shelf {\n\
               Book getBook() { return null; }\n\
               boolean isBook() { return false; }\n\
             }\n\
             class Book {}",
        )]);
        let aug = infer(&env, "a.Shelf");
        let names: Vec<_> = aug.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["book", "isBook"]);
    }

    #[test]
    fn test_setter_only_is_write_only() {
        let env = env(&[("a.Sink", "package a; class Sink { void setLevel(int l) {} }")]);
        let aug = infer(&env, "a.Sink");
        assert_eq!(
            field(&aug, "level").property_access(),
            Some(PropertyAccess::WriteOnly)
        );
    }

    #[test]
    fn test_property_navigates_to_getter_else_setter() {
        let env = env(&[(
            "a.Panel",
            "package a; class Panel {\n\
               void setWidth(int w) {}\n\
               int getWidth() { return 0; }\n\
               void setHeight(int h) {}\n\
             }",
        )]);
        let aug = infer(&env, "a.Panel");
        assert_eq!(field(&aug, "width").origin.member, "getWidth");
        assert_eq!(field(&aug, "height").origin.member, "setHeight");
        assert_eq!(field(&aug, "height").origin.declaration, Fqn::new("a.Panel"));
    }

    #[test]
    fn test_mismatched_static_or_type_yields_nothing() {
        let env = env(&[(
            "a.Odd",
            "package a; class Odd {\n\
               static String getName() { return null; }\n\
               void setName(String n) {}\n\
               String getCount() { return null; }\n\
               void setCount(int c) {}\n\
             }",
        )]);
        assert!(infer(&env, "a.Odd").members.is_empty());
    }

    #[test]
    fn test_existing_private_field_is_adjusted_not_duplicated() {
        let env = env(&[(
            "a.Holder",
            "package a; public class Holder {\n\
               private String name;\n\
               public String getName() { return name; }\n\
             }",
        )]);
        let aug = infer(&env, "a.Holder");
        assert!(aug.members.is_empty());
        let adj = aug.adjustment("name").unwrap();
        assert_eq!(adj.declared, Visibility::Private);
        assert_eq!(adj.effective, Visibility::Public);
        assert_eq!(adj.access, PropertyAccess::ReadOnly);
    }

    #[test]
    fn test_public_field_conflicts() {
        let env = env(&[(
            "a.Open",
            "package a; public class Open {\n\
               public String name;\n\
               public String getName() { return name; }\n\
             }",
        )]);
        let aug = infer(&env, "a.Open");
        assert!(aug.is_empty());
    }

    #[test]
    fn test_propgen_and_reserved_names_skipped() {
        let env = env(&[(
            "a.Gen",
            "package a; class Gen {\n\
               @propgen(name = \"x\") int getX() { return 0; }\n\
               Object getClass2() { return null; }\n\
               String getDefault() { return null; }\n\
             }",
        )]);
        let aug = infer(&env, "a.Gen");
        let names: Vec<_> = aug.members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["class2"]);
    }

    #[test]
    fn test_ancestor_property_is_redeclared_writable() {
        let env = env(&[
            (
                "a.Base",
                "package a; public class Base { public void setTitle(String t) {} }",
            ),
            (
                "a.Derived",
                "package a; public class Derived extends Base { public String getTitle() { return null; } }",
            ),
        ]);
        let scope = ResolveScope::new(&env.cache, &env.modules, env.module);
        let hierarchy = TypeHierarchy::new(&scope, env.module);
        let derived = hierarchy.resolve_fqn("a.Derived").unwrap();
        let lookup = |p: &Arc<Projection>| {
            let none = |_: &Arc<Projection>| -> Option<Arc<Augmentation>> { None };
            Some(Arc::new(PropertyInference::new(&hierarchy, p, &none).infer(&[])))
        };
        let aug = PropertyInference::new(&hierarchy, &derived, &lookup).infer(&[]);
        let title = field(&aug, "title");
        assert_eq!(title.property_access(), Some(PropertyAccess::ReadWrite));
        assert_eq!(title.as_field().unwrap().modifiers.visibility, Visibility::Public);
    }
}
