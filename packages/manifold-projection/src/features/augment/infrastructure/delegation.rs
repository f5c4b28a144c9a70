//! Delegation linking
//!
//! A `@link` field forwards a set of the enclosing class's interfaces to
//! its value. Targets come from `@link(value = ...)` or, when absent, from
//! the interfaces the field type and the class have in common. Interfaces
//! and methods claimed by more than one link are arbitrated through the
//! `share` flag; whatever survives becomes placeholder stubs on the class.

use super::{InterfaceRef, TypeHierarchy};
use crate::features::augment::domain::{GenerationKind, MemberBody, Origin, SyntheticMember};
use crate::features::augment::Augmentation;
use crate::features::projection_cache::Projection;
use crate::shared::models::{
    AnnotationValue, Diagnostic, DiagnosticCode, Field, Fqn, Method, Modifiers, Visibility,
};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;

/// A validated `@link` field
#[derive(Debug, Clone)]
pub struct Link {
    pub field: Field,
    pub targets: Vec<InterfaceRef>,
    pub share_all: bool,
    pub shared: FxHashSet<Fqn>,
    /// Surviving (interface, stub) pairs after method arbitration
    pub stubs: Vec<(Fqn, Method)>,
}

impl Link {
    pub fn shares(&self, iface: &Fqn) -> bool {
        self.share_all || self.shared.contains(iface)
    }

    pub fn provides(&self, iface: &Fqn) -> bool {
        self.targets.iter().any(|t| t.fqn() == iface)
    }
}

/// Outcome of arbitrating one contested key between links
enum Arbitration {
    Winner(usize),
    NoWinner { multiple_shares: bool },
}

fn arbitrate(sharing: &[usize]) -> Arbitration {
    match sharing {
        [winner] => Arbitration::Winner(*winner),
        [] => Arbitration::NoWinner {
            multiple_shares: false,
        },
        _ => Arbitration::NoWinner {
            multiple_shares: true,
        },
    }
}

pub struct DelegationLinker<'h, 'a> {
    hierarchy: &'h TypeHierarchy<'a>,
    projection: &'h Arc<Projection>,
}

impl<'h, 'a> DelegationLinker<'h, 'a> {
    pub fn new(hierarchy: &'h TypeHierarchy<'a>, projection: &'h Arc<Projection>) -> Self {
        Self {
            hierarchy,
            projection,
        }
    }

    fn fqn(&self) -> &Fqn {
        self.projection.fqn()
    }

    pub fn link(&self) -> Augmentation {
        let decl = self.projection.declaration();
        let mut out = Augmentation::default();
        let is_part = decl.has_annotation("part");
        if is_part {
            self.check_superclass(&mut out);
        }

        let class_ifaces = self.hierarchy.interfaces_of(self.projection);
        let mut links: Vec<Link> = decl
            .fields
            .iter()
            .filter(|f| f.has_annotation("link"))
            .filter_map(|f| self.validate_link(f, is_part, &class_ifaces, &mut out))
            .collect();
        if links.is_empty() {
            return out;
        }

        self.resolve_interface_overlap(&class_ifaces, &mut links, &mut out);
        self.collect_stubs(&mut links);
        self.resolve_method_overlap(&mut links, &mut out);

        for link in &links {
            for (iface, method) in &link.stubs {
                out.members.push(SyntheticMember {
                    name: method.name.clone(),
                    body: MemberBody::Method(method.clone()),
                    generation: GenerationKind::DelegationStub {
                        link: link.field.name.clone(),
                        interface: iface.clone(),
                    },
                    origin: Origin {
                        declaration: self.fqn().clone(),
                        member: link.field.name.clone(),
                        span: link.field.span,
                    },
                });
            }
        }
        tracing::debug!(
            "Linked {} delegation stub(s) on {} from {} link(s)",
            out.members.len(),
            self.fqn(),
            links.len()
        );
        out
    }

    fn check_superclass(&self, out: &mut Augmentation) {
        let decl = self.projection.declaration();
        let Some(superclass) = &decl.superclass else {
            return;
        };
        if matches!(superclass.name.as_str(), "Object" | "java.lang.Object") {
            return;
        }
        let is_part = self
            .hierarchy
            .resolve_type(decl, superclass)
            .map_or(false, |p| p.declaration().has_annotation("part"));
        if !is_part {
            out.diagnostics.push(Diagnostic::error(
                DiagnosticCode::SuperclassNotPart,
                self.fqn(),
                decl.span,
                format!("Superclass {} of a part class must also be a part class", superclass),
            ));
        }
    }

    fn validate_link(
        &self,
        field: &Field,
        is_part: bool,
        class_ifaces: &[InterfaceRef],
        out: &mut Augmentation,
    ) -> Option<Link> {
        let decl = self.projection.declaration();
        let span = field.span;
        if field.modifiers.is_static {
            out.diagnostics.push(Diagnostic::error(
                DiagnosticCode::LinkStaticField,
                self.fqn(),
                span,
                format!("Link field {} cannot be static", field.name),
            ));
            return None;
        }
        if is_part && field.modifiers.explicit_visibility {
            match field.modifiers.visibility {
                Visibility::Public | Visibility::Protected => {
                    out.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::LinkModifierNotAllowed,
                        self.fqn(),
                        span,
                        format!("Link field {} cannot be public or protected", field.name),
                    ));
                }
                Visibility::Private => out.diagnostics.push(Diagnostic::warning(
                    DiagnosticCode::LinkModifierRedundant,
                    self.fqn(),
                    span,
                    format!("Link field {} is private by default", field.name),
                )),
                Visibility::Package => {}
            }
        }
        if is_part && field.modifiers.is_final {
            out.diagnostics.push(Diagnostic::warning(
                DiagnosticCode::LinkModifierRedundant,
                self.fqn(),
                span,
                format!("Link field {} is final by default", field.name),
            ));
        }

        let annotation = field.annotation("link")?;
        let explicit = annotation
            .arg("value")
            .map(|v| v.class_literals())
            .unwrap_or_default();

        let mut targets = Vec::new();
        if explicit.is_empty() {
            targets = self.inferred_targets(field, class_ifaces);
        } else {
            for literal in explicit {
                let resolved = self
                    .hierarchy
                    .resolve_type(decl, literal)
                    .filter(|p| p.declaration().is_interface());
                let Some(target) = resolved else {
                    out.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::LinkTargetNotInterface,
                        self.fqn(),
                        span,
                        format!("Link target {} is not an interface", literal),
                    ));
                    continue;
                };
                if !self.hierarchy.is_assignable(decl, literal, &field.ty, &[]) {
                    out.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::LinkFieldNotAssignable,
                        self.fqn(),
                        span,
                        format!("Link field type {} does not implement {}", field.ty, literal),
                    ));
                    continue;
                }
                if let Some(iface) = class_ifaces.iter().find(|i| i.fqn() == target.fqn()) {
                    if !targets.iter().any(|t: &InterfaceRef| t.fqn() == iface.fqn()) {
                        targets.push(iface.clone());
                    }
                }
            }
        }
        if targets.is_empty() {
            out.diagnostics.push(Diagnostic::error(
                DiagnosticCode::LinkNoCommonInterfaces,
                self.fqn(),
                span,
                format!(
                    "Link field {} shares no interfaces with {}",
                    field.name,
                    decl.simple_name()
                ),
            ));
            return None;
        }

        let mut share_all = annotation
            .arg("shareAll")
            .and_then(AnnotationValue::as_bool)
            .unwrap_or(false);
        let mut shared = FxHashSet::default();
        match annotation.arg("share") {
            Some(AnnotationValue::Bool(flag)) => share_all |= *flag,
            Some(value) => {
                for literal in value.class_literals() {
                    let target = self
                        .hierarchy
                        .resolve_type(decl, literal)
                        .filter(|p| targets.iter().any(|t| t.fqn() == p.fqn()));
                    match target {
                        Some(p) => {
                            shared.insert(p.fqn().clone());
                        }
                        None => out.diagnostics.push(Diagnostic::warning(
                            DiagnosticCode::LinkInterfaceNotShared,
                            self.fqn(),
                            span,
                            format!("Shared interface {} is not provided by link {}", literal, field.name),
                        )),
                    }
                }
            }
            None => {}
        }

        Some(Link {
            field: field.clone(),
            targets,
            share_all,
            shared,
            stubs: Vec::new(),
        })
    }

    /// Interfaces the field type and the class have in common; a
    /// structural interface type maps every class interface
    fn inferred_targets(&self, field: &Field, class_ifaces: &[InterfaceRef]) -> Vec<InterfaceRef> {
        let decl = self.projection.declaration();
        let structural = self
            .hierarchy
            .resolve_type(decl, &field.ty)
            .map_or(false, |p| {
                p.declaration().is_interface() && p.declaration().has_annotation("Structural")
            });
        if structural {
            return class_ifaces.to_vec();
        }
        let field_ifaces: FxHashSet<Fqn> = self
            .hierarchy
            .all_interfaces(decl, &field.ty)
            .into_iter()
            .map(|i| i.fqn().clone())
            .collect();
        class_ifaces
            .iter()
            .filter(|i| field_ifaces.contains(i.fqn()))
            .cloned()
            .collect()
    }

    fn resolve_interface_overlap(
        &self,
        class_ifaces: &[InterfaceRef],
        links: &mut [Link],
        out: &mut Augmentation,
    ) {
        let mut dropped: Vec<(usize, Fqn)> = Vec::new();
        for iface in class_ifaces {
            let fqn = iface.fqn();
            let claimants: Vec<usize> = (0..links.len()).filter(|&i| links[i].provides(fqn)).collect();
            if claimants.len() < 2 {
                continue;
            }
            let sharing: Vec<usize> = claimants
                .iter()
                .copied()
                .filter(|&i| links[i].shares(fqn))
                .collect();
            let winner = match arbitrate(&sharing) {
                Arbitration::Winner(w) => Some(w),
                Arbitration::NoWinner { multiple_shares } => {
                    if multiple_shares {
                        for &i in &sharing {
                            out.diagnostics.push(Diagnostic::error(
                                DiagnosticCode::InterfaceMultipleShares,
                                self.fqn(),
                                links[i].field.span,
                                format!(
                                    "Interface {} is shared by more than one link; implement it directly",
                                    fqn
                                ),
                            ));
                        }
                    }
                    None
                }
            };
            for &i in &claimants {
                if Some(i) == winner {
                    continue;
                }
                if !sharing.contains(&i) || winner.is_some() {
                    out.diagnostics.push(Diagnostic::warning(
                        DiagnosticCode::InterfaceOverlap,
                        self.fqn(),
                        links[i].field.span,
                        format!(
                            "Interface {} overlaps with another link and is dropped from {}",
                            fqn, links[i].field.name
                        ),
                    ));
                }
                dropped.push((i, fqn.clone()));
            }
        }
        for (i, fqn) in dropped {
            links[i].targets.retain(|t| t.fqn() != &fqn);
        }
    }

    /// Candidate stubs per link: interface methods the class does not
    /// already implement, with the link's type arguments substituted
    fn collect_stubs(&self, links: &mut [Link]) {
        let decl = self.projection.declaration();
        let class_vars = &decl.type_params;
        let mut implemented: FxHashSet<String> = decl
            .methods
            .iter()
            .filter(|m| !m.is_constructor)
            .map(|m| m.signature_key(class_vars))
            .collect();
        for ancestor in self.hierarchy.superclass_chain(self.projection) {
            let ancestor_decl = ancestor.declaration();
            implemented.extend(
                ancestor_decl
                    .methods
                    .iter()
                    .filter(|m| !m.is_constructor && !m.modifiers.is_abstract && m.has_body)
                    .map(|m| m.signature_key(&ancestor_decl.type_params)),
            );
        }

        for link in links.iter_mut() {
            let mut seen = FxHashSet::default();
            let mut stubs = Vec::new();
            for target in &link.targets {
                for method in target.own_methods() {
                    let stub = stub_for(method, target);
                    let key = stub.signature_key(class_vars);
                    if implemented.contains(&key) || !seen.insert(key) {
                        continue;
                    }
                    stubs.push((target.fqn().clone(), stub));
                }
            }
            link.stubs = stubs;
        }
    }

    fn resolve_method_overlap(&self, links: &mut [Link], out: &mut Augmentation) {
        let class_vars = self.projection.declaration().type_params.clone();
        let mut order: Vec<String> = Vec::new();
        let mut claims: FxHashMap<String, Vec<usize>> = FxHashMap::default();
        for (i, link) in links.iter().enumerate() {
            for (_, stub) in &link.stubs {
                let key = stub.signature_key(&class_vars);
                let entry = claims.entry(key.clone()).or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                });
                if !entry.contains(&i) {
                    entry.push(i);
                }
            }
        }

        let mut dropped: Vec<(usize, String)> = Vec::new();
        for key in order {
            let Some(claimants) = claims.get(&key) else {
                continue;
            };
            if claimants.len() < 2 {
                continue;
            }
            let sharing: Vec<usize> = claimants
                .iter()
                .copied()
                .filter(|&i| {
                    links[i]
                        .stubs
                        .iter()
                        .any(|(iface, m)| m.signature_key(&class_vars) == key && links[i].shares(iface))
                })
                .collect();
            let winner = match arbitrate(&sharing) {
                Arbitration::Winner(w) => Some(w),
                Arbitration::NoWinner { multiple_shares } => {
                    if multiple_shares {
                        for &i in &sharing {
                            out.diagnostics.push(Diagnostic::error(
                                DiagnosticCode::MethodMultipleShares,
                                self.fqn(),
                                links[i].field.span,
                                format!(
                                    "Method {} is shared by more than one link; implement it directly",
                                    key
                                ),
                            ));
                        }
                    }
                    None
                }
            };
            for &i in claimants {
                if Some(i) == winner {
                    continue;
                }
                if !sharing.contains(&i) || winner.is_some() {
                    out.diagnostics.push(Diagnostic::warning(
                        DiagnosticCode::MethodOverlap,
                        self.fqn(),
                        links[i].field.span,
                        format!(
                            "Method {} overlaps with another link and is dropped from {}",
                            key, links[i].field.name
                        ),
                    ));
                }
                dropped.push((i, key.clone()));
            }
        }
        for (i, key) in dropped {
            links[i]
                .stubs
                .retain(|(_, m)| m.signature_key(&class_vars) != key);
        }
    }
}

/// Public placeholder implementation of an interface method
fn stub_for(method: &Method, target: &InterfaceRef) -> Method {
    let mut stub = method.clone();
    stub.return_type = stub.return_type.map(|t| t.substitute(&target.bindings));
    stub.throws = stub.throws.iter().map(|t| t.substitute(&target.bindings)).collect();
    for param in &mut stub.params {
        param.ty = param.ty.substitute(&target.bindings);
        param.default_value = None;
    }
    stub.modifiers = Modifiers::public();
    stub.has_body = true;
    stub
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::projection_cache::{
        ModuleId, ModuleRegistry, ProjectionCache, ProjectionMetrics, ResolveScope,
    };
    use crate::features::source_producer::InMemorySourceProducer;
    use crate::shared::models::{Severity, TypeRef};
    use prometheus::Registry;

    const SHAPES: &[(&str, &str)] = &[
        (
            "s.Shape",
            "package s; public interface Shape { double area(); String name(); }",
        ),
        ("s.Named", "package s; public interface Named { String name(); }"),
        (
            "s.Box",
            "package s; public interface Box<T> { T get(); void put(T value); }",
        ),
        (
            "s.Circle",
            "package s; public class Circle implements Shape {\n\
               public double area() { return 0; }\n\
               public String name() { return null; }\n\
             }",
        ),
        (
            "s.Square",
            "package s; public class Square implements Shape, Named {\n\
               public double area() { return 0; }\n\
               public String name() { return null; }\n\
             }",
        ),
        (
            "s.IntBox",
            "package s; public class IntBox implements Box<Integer> {\n\
               public Integer get() { return null; }\n\
               public void put(Integer value) {}\n\
             }",
        ),
    ];

    fn run(class: &str, source: &str) -> Augmentation {
        let metrics = ProjectionMetrics::new(&Registry::new(), "link").unwrap();
        let cache = ProjectionCache::new(Arc::new(metrics));
        let modules = ModuleRegistry::new();
        let module: ModuleId = modules.add_module("m");
        let producer = InMemorySourceProducer::primary("mem");
        for (fqn, src) in SHAPES {
            producer.insert(fqn, *src, vec![]);
        }
        producer.insert(class, source, vec![]);
        modules.add_producer(module, Arc::new(producer)).unwrap();

        let scope = ResolveScope::new(&cache, &modules, module);
        let hierarchy = TypeHierarchy::new(&scope, module);
        let projection = hierarchy.resolve_fqn(class).unwrap();
        DelegationLinker::new(&hierarchy, &projection).link()
    }

    fn codes(aug: &Augmentation, severity: Severity) -> Vec<DiagnosticCode> {
        aug.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .map(|d| d.code)
            .collect()
    }

    fn stub_names(aug: &Augmentation, link: &str) -> Vec<String> {
        aug.members
            .iter()
            .filter(|m| matches!(&m.generation, GenerationKind::DelegationStub { link: l, .. } if l == link))
            .map(|m| m.name.clone())
            .collect()
    }

    #[test]
    fn test_single_link_generates_stubs() {
        let aug = run(
            "s.Widget",
            "package s; @part public class Widget implements Shape {\n\
               @link Circle circle;\n\
             }",
        );
        assert!(aug.diagnostics.is_empty(), "{:?}", aug.diagnostics);
        assert_eq!(stub_names(&aug, "circle"), vec!["area", "name"]);
        let area = aug.methods_named("area").next().unwrap();
        assert_eq!(area.modifiers.visibility, Visibility::Public);
        assert!(!area.modifiers.is_abstract);
        assert_eq!(aug.members[0].origin.member, "circle");
    }

    #[test]
    fn test_already_implemented_methods_are_skipped() {
        let aug = run(
            "s.Widget",
            "package s; public class Widget implements Shape {\n\
               @link Circle circle;\n\
               public String name() { return \"w\"; }\n\
             }",
        );
        assert_eq!(stub_names(&aug, "circle"), vec!["area"]);
    }

    #[test]
    fn test_two_plain_links_both_lose_interface() {
        let aug = run(
            "s.Widget",
            "package s; @part public class Widget implements Shape {\n\
               @link Circle a;\n\
               @link Square b;\n\
             }",
        );
        assert!(aug.members.is_empty());
        assert_eq!(
            codes(&aug, Severity::Warning),
            vec![DiagnosticCode::InterfaceOverlap, DiagnosticCode::InterfaceOverlap]
        );
        assert!(codes(&aug, Severity::Error).is_empty());
    }

    #[test]
    fn test_two_sharing_links_are_errors() {
        let aug = run(
            "s.Widget",
            "package s; @part public class Widget implements Shape {\n\
               @link(share = true) Circle a;\n\
               @link(share = true) Square b;\n\
             }",
        );
        assert!(aug.members.is_empty());
        assert_eq!(
            codes(&aug, Severity::Error),
            vec![
                DiagnosticCode::InterfaceMultipleShares,
                DiagnosticCode::InterfaceMultipleShares
            ]
        );
    }

    #[test]
    fn test_single_sharing_link_wins() {
        let aug = run(
            "s.Widget",
            "package s; @part public class Widget implements Shape {\n\
               @link(share = {Shape.class}) Circle a;\n\
               @link Square b;\n\
             }",
        );
        assert_eq!(stub_names(&aug, "a"), vec!["area", "name"]);
        assert!(stub_names(&aug, "b").is_empty());
        assert_eq!(codes(&aug, Severity::Warning), vec![DiagnosticCode::InterfaceOverlap]);
    }

    #[test]
    fn test_method_overlap_across_interfaces() {
        let aug = run(
            "s.Widget",
            "package s; public class Widget implements Shape, Named {\n\
               @link(Shape.class) Circle a;\n\
               @link(Named.class) Square b;\n\
             }",
        );
        assert_eq!(stub_names(&aug, "a"), vec!["area"]);
        assert!(stub_names(&aug, "b").is_empty());
        assert_eq!(
            codes(&aug, Severity::Warning),
            vec![DiagnosticCode::MethodOverlap, DiagnosticCode::MethodOverlap]
        );
    }

    #[test]
    fn test_generic_interface_is_substituted() {
        let aug = run(
            "s.Holder",
            "package s; public class Holder implements Box<Integer> {\n\
               @link IntBox box;\n\
             }",
        );
        let get = aug.methods_named("get").next().unwrap();
        assert_eq!(get.return_type, Some(TypeRef::simple("Integer")));
        let put = aug.methods_named("put").next().unwrap();
        assert_eq!(put.params[0].ty, TypeRef::simple("Integer"));
    }

    #[test]
    fn test_link_field_validation() {
        let aug = run(
            "s.Widget",
            "package s; @part public class Widget extends Circle implements Shape, Named {\n\
               @link static Circle s;\n\
               @link public Square p;\n\
               @link private final Square q;\n\
               @link(String.class) Square r;\n\
             }",
        );
        let errors = codes(&aug, Severity::Error);
        assert!(errors.contains(&DiagnosticCode::SuperclassNotPart));
        assert!(errors.contains(&DiagnosticCode::LinkStaticField));
        assert!(errors.contains(&DiagnosticCode::LinkModifierNotAllowed));
        assert!(errors.contains(&DiagnosticCode::LinkTargetNotInterface));
        let warnings = codes(&aug, Severity::Warning);
        assert_eq!(
            warnings
                .iter()
                .filter(|c| **c == DiagnosticCode::LinkModifierRedundant)
                .count(),
            2
        );
    }

    #[test]
    fn test_unrelated_field_type_has_no_common_interfaces() {
        let aug = run(
            "s.Widget",
            "package s; public class Widget implements Named {\n\
               @link Circle c;\n\
             }",
        );
        assert_eq!(codes(&aug, Severity::Error), vec![DiagnosticCode::LinkNoCommonInterfaces]);
    }
}
