//! Type aliases
//!
//! A class annotated `@TypeAlias(Target.class)` shares the members of the
//! aliased type: fields, methods and nested types, including the
//! non-private ones the target inherits and those synthesized on it.
//! Constructors come from the target alone and take the alias's name.
//! Without arguments the annotation aliases the superclass.

use super::{InheritedLookup, TypeHierarchy};
use crate::features::augment::domain::{
    Augmentation, GenerationKind, MemberBody, Origin, SyntheticMember,
};
use crate::features::projection_cache::Projection;
use crate::shared::models::{Declaration, Fqn, Modifiers, Visibility};
use rustc_hash::FxHashSet;
use std::iter;
use std::sync::Arc;

const TYPE_ALIAS_ANNOTATION: &str = "TypeAlias";

/// Names and signatures already present on the alias
#[derive(Default)]
struct Taken {
    fields: FxHashSet<String>,
    methods: FxHashSet<String>,
    constructors: FxHashSet<String>,
    nested: FxHashSet<String>,
}

pub struct TypeAliases<'h, 'a> {
    hierarchy: &'h TypeHierarchy<'a>,
    projection: &'h Arc<Projection>,
    inherited: InheritedLookup<'h>,
}

impl<'h, 'a> TypeAliases<'h, 'a> {
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

    /// Type named by the `@TypeAlias` annotation; only a leading `value`
    /// argument is understood
    pub fn aliased_type(&self) -> Option<Arc<Projection>> {
        let decl = self.projection.declaration();
        let annotation = decl.annotation(TYPE_ALIAS_ANNOTATION)?;
        let target = match annotation.args.first() {
            None => {
                let superclass = decl.superclass.as_ref()?;
                self.hierarchy.resolve_type(decl, superclass)?
            }
            Some((key, value)) if key == "value" => {
                let literal = value.class_literals().into_iter().next()?;
                self.hierarchy.resolve_type(decl, literal)?
            }
            Some(_) => return None,
        };
        (target.fqn() != self.projection.fqn()).then_some(target)
    }

    pub fn project(&self) -> Augmentation {
        let mut out = Augmentation::default();
        let Some(target) = self.aliased_type() else {
            return out;
        };
        let decl = self.projection.declaration();
        let keeps_abstract = decl.modifiers.is_abstract || decl.is_interface();
        let admits = |modifiers: &Modifiers, inherited: bool| {
            (keeps_abstract || !modifiers.is_abstract)
                && !(inherited && modifiers.visibility == Visibility::Private)
        };
        let mut taken = Self::taken(decl);

        let target_decl = target.declaration();
        for ctor in target_decl.constructors() {
            let key = ctor.erased_params(&target_decl.type_params).join(",");
            if !admits(&ctor.modifiers, false) || !taken.constructors.insert(key) {
                continue;
            }
            let mut renamed = ctor.clone();
            renamed.name = decl.simple_name().to_string();
            out.members.push(self.aliased(
                target.fqn(),
                MemberBody::Method(renamed),
                Origin {
                    declaration: target.fqn().clone(),
                    member: ctor.name.clone(),
                    span: ctor.span,
                },
            ));
        }

        let sources = iter::once(target.clone()).chain(self.hierarchy.ancestors(&target));
        for (depth, owner) in sources.enumerate() {
            let inherited = depth > 0;
            let owner_decl = owner.declaration();
            let origin = |member: &str, span| Origin {
                declaration: owner.fqn().clone(),
                member: member.to_string(),
                span,
            };

            for field in &owner_decl.fields {
                if admits(&field.modifiers, inherited) && taken.fields.insert(field.name.clone()) {
                    out.members.push(self.aliased(
                        target.fqn(),
                        MemberBody::Field(field.clone()),
                        origin(&field.name, field.span),
                    ));
                }
            }
            for method in owner_decl.methods.iter().filter(|m| !m.is_constructor) {
                let key = method.signature_key(&owner_decl.type_params);
                if admits(&method.modifiers, inherited) && taken.methods.insert(key) {
                    out.members.push(self.aliased(
                        target.fqn(),
                        MemberBody::Method(method.clone()),
                        origin(&method.name, method.span),
                    ));
                }
            }

            if let Some(augmentation) = (self.inherited)(&owner) {
                for member in &augmentation.members {
                    let admitted = match &member.body {
                        MemberBody::Field(field) => {
                            admits(&field.modifiers, inherited) && taken.fields.insert(field.name.clone())
                        }
                        MemberBody::Method(method) if !method.is_constructor => {
                            admits(&method.modifiers, inherited)
                                && taken
                                    .methods
                                    .insert(method.signature_key(&owner_decl.type_params))
                        }
                        _ => false,
                    };
                    if admitted {
                        out.members.push(self.aliased(
                            target.fqn(),
                            member.body.clone(),
                            member.origin.clone(),
                        ));
                    }
                }
            }

            for nested in &owner_decl.nested {
                if taken.nested.insert(nested.simple_name().to_string()) {
                    out.members.push(self.aliased(
                        target.fqn(),
                        MemberBody::NestedRef(nested.clone()),
                        origin(nested.simple_name(), owner_decl.span),
                    ));
                }
            }
        }

        tracing::debug!(
            "Alias {} shares {} member(s) of {}",
            self.projection.fqn(),
            out.members.len(),
            target.fqn()
        );
        out
    }

    /// The alias's own members shadow aliased ones
    fn taken(decl: &Declaration) -> Taken {
        let vars = &decl.type_params;
        Taken {
            fields: decl.fields.iter().map(|f| f.name.clone()).collect(),
            methods: decl
                .methods
                .iter()
                .filter(|m| !m.is_constructor)
                .map(|m| m.signature_key(vars))
                .collect(),
            constructors: decl
                .constructors()
                .map(|c| c.erased_params(vars).join(","))
                .collect(),
            nested: decl.nested.iter().map(|n| n.simple_name().to_string()).collect(),
        }
    }

    fn aliased(&self, target: &Fqn, body: MemberBody, origin: Origin) -> SyntheticMember {
        let name = match &body {
            MemberBody::Field(f) => f.name.clone(),
            MemberBody::Method(m) => m.name.clone(),
            MemberBody::Type(t) => t.name.clone(),
            MemberBody::NestedRef(fqn) => fqn.simple_name().to_string(),
        };
        SyntheticMember {
            name,
            body,
            generation: GenerationKind::AliasedMember {
                target: target.clone(),
            },
            origin,
        }
    }
}
