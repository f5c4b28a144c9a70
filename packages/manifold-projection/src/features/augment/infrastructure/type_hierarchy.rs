//! Name resolution, supertypes and assignability over projections
//!
//! Every lookup goes through the caller's `ResolveScope`, so types under
//! construction come back as absent instead of recursing, and every
//! consulted projection lands in the scope's ancestry record.

use crate::features::projection_cache::{ModuleId, Projection, ResolveScope};
use crate::shared::models::{Declaration, Fqn, Method, TypeRef};
use rustc_hash::FxHashSet;
use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

const BOXES: [(&str, &str); 8] = [
    ("boolean", "Boolean"),
    ("byte", "Byte"),
    ("char", "Character"),
    ("short", "Short"),
    ("int", "Integer"),
    ("long", "Long"),
    ("float", "Float"),
    ("double", "Double"),
];

fn widens_to(from: &str, to: &str) -> bool {
    let targets: &[&str] = match from {
        "byte" => &["short", "int", "long", "float", "double"],
        "short" | "char" => &["int", "long", "float", "double"],
        "int" => &["long", "float", "double"],
        "long" => &["float", "double"],
        "float" => &["double"],
        _ => &[],
    };
    targets.contains(&to)
}

fn boxed(primitive: &str) -> Option<&'static str> {
    BOXES.iter().find(|(p, _)| *p == primitive).map(|(_, b)| *b)
}

fn unboxed(simple: &str) -> Option<&'static str> {
    BOXES.iter().find(|(_, b)| *b == simple).map(|(p, _)| *p)
}

fn is_object(ty: &TypeRef) -> bool {
    ty.dims == 0 && (ty.name == "Object" || ty.name == "java.lang.Object")
}

/// An interface reached from some type, with the type arguments bound
/// along the path
#[derive(Debug, Clone)]
pub struct InterfaceRef {
    pub projection: Arc<Projection>,
    pub bindings: HashMap<String, TypeRef>,
}

impl InterfaceRef {
    pub fn fqn(&self) -> &Fqn {
        self.projection.fqn()
    }

    pub fn declaration(&self) -> &Declaration {
        self.projection.declaration()
    }

    /// Instance methods declared directly on the interface
    pub fn own_methods(&self) -> impl Iterator<Item = &Method> {
        self.declaration()
            .methods
            .iter()
            .filter(|m| !m.modifiers.is_static && !m.is_constructor)
    }
}

pub struct TypeHierarchy<'a> {
    scope: &'a ResolveScope<'a>,
    module: ModuleId,
}

impl<'a> TypeHierarchy<'a> {
    pub fn new(scope: &'a ResolveScope<'a>, module: ModuleId) -> Self {
        Self { scope, module }
    }

    pub fn scope(&self) -> &'a ResolveScope<'a> {
        self.scope
    }

    pub fn resolve_fqn(&self, fqn: &str) -> Option<Arc<Projection>> {
        self.scope.resolve_in(self.module, fqn).into_found()
    }

    /// Resolve a name as written inside `ctx`: qualified, single-type
    /// imports, nested types of the enclosing chain, same package,
    /// on-demand imports, then `java.lang`
    pub fn resolve_name(&self, ctx: &Declaration, name: &str) -> Option<Arc<Projection>> {
        if let Some((head, tail)) = name.split_once('.') {
            if let Some(found) = self.resolve_fqn(name) {
                return Some(found);
            }
            let outer = self.resolve_name(ctx, head)?;
            return self.resolve_fqn(outer.fqn().child(tail).as_str());
        }

        for import in ctx.imports.iter().filter(|i| !i.ends_with(".*")) {
            if import.rsplit('.').next() == Some(name) {
                if let Some(found) = self.resolve_fqn(import) {
                    return Some(found);
                }
            }
        }

        if let Some(found) = self.resolve_nested(ctx, name) {
            return Some(found);
        }

        let same_package = if ctx.package.is_empty() {
            name.to_string()
        } else {
            format!("{}.{}", ctx.package, name)
        };
        if let Some(found) = self.resolve_fqn(&same_package) {
            return Some(found);
        }

        for import in ctx.imports.iter().filter_map(|i| i.strip_suffix(".*")) {
            if let Some(found) = self.resolve_fqn(&format!("{}.{}", import, name)) {
                return Some(found);
            }
        }

        self.resolve_fqn(&format!("java.lang.{}", name))
    }

    fn resolve_nested(&self, ctx: &Declaration, name: &str) -> Option<Arc<Projection>> {
        if ctx.simple_name() == name {
            return self.resolve_fqn(ctx.fqn.as_str());
        }
        let candidate = ctx.fqn.child(name);
        if ctx.nested.contains(&candidate) {
            return self.resolve_fqn(candidate.as_str());
        }
        let mut enclosing = ctx.enclosing.clone();
        while let Some(outer_fqn) = enclosing {
            let outer = self.resolve_fqn(outer_fqn.as_str())?;
            if outer.declaration().simple_name() == name {
                return Some(outer);
            }
            let candidate = outer_fqn.child(name);
            if outer.declaration().nested.contains(&candidate) {
                return self.resolve_fqn(candidate.as_str());
            }
            enclosing = outer.declaration().enclosing.clone();
        }
        None
    }

    /// Projection for a reference type written in `ctx`; `None` for
    /// primitives, arrays, wildcards and type variables
    pub fn resolve_type(&self, ctx: &Declaration, ty: &TypeRef) -> Option<Arc<Projection>> {
        if ty.is_primitive() || ty.is_void() || ty.is_array() || ty.is_wildcard() {
            return None;
        }
        if ctx.type_params.iter().any(|v| v == &ty.name) {
            return None;
        }
        self.resolve_name(ctx, &ty.name)
    }

    /// Direct supertypes of a projection, resolved in its own context
    pub fn supertypes(&self, projection: &Projection) -> Vec<Arc<Projection>> {
        let decl = projection.declaration();
        decl.superclass
            .iter()
            .chain(decl.interfaces.iter())
            .filter_map(|ty| self.resolve_type(decl, ty))
            .collect()
    }

    /// Superclass chain, nearest first, cycle-safe
    pub fn superclass_chain(&self, projection: &Projection) -> Vec<Arc<Projection>> {
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        seen.insert(projection.fqn().clone());
        let mut current = projection.declaration().superclass.clone().and_then(|ty| {
            self.resolve_type(projection.declaration(), &ty)
        });
        while let Some(next) = current {
            if !seen.insert(next.fqn().clone()) {
                break;
            }
            current = next
                .declaration()
                .superclass
                .clone()
                .and_then(|ty| self.resolve_type(next.declaration(), &ty));
            chain.push(next);
        }
        chain
    }

    /// Every proper supertype, breadth-first, each once
    pub fn ancestors(&self, projection: &Projection) -> Vec<Arc<Projection>> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        seen.insert(projection.fqn().clone());
        let mut queue: VecDeque<Arc<Projection>> = self.supertypes(projection).into();
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.fqn().clone()) {
                continue;
            }
            queue.extend(self.supertypes(&next));
            out.push(next);
        }
        out
    }

    /// Methods declared on proper supertypes, with their owner
    pub fn inherited_methods(&self, projection: &Projection) -> Vec<(Arc<Projection>, Method)> {
        self.ancestors(projection)
            .into_iter()
            .flat_map(|owner| {
                owner
                    .declaration()
                    .methods
                    .iter()
                    .filter(|m| !m.is_constructor)
                    .cloned()
                    .map(|m| (owner.clone(), m))
                    .collect::<Vec<_>>()
            })
            .collect()
    }

    /// Whether `sub` is `target` or one of its subtypes
    pub fn is_subtype(&self, sub: &Arc<Projection>, target: &Fqn) -> bool {
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([sub.clone()]);
        while let Some(next) = queue.pop_front() {
            if next.fqn() == target {
                return true;
            }
            if seen.insert(next.fqn().clone()) {
                queue.extend(self.supertypes(&next));
            }
        }
        false
    }

    /// Whether a value of type `from` can be assigned to `to`, both written
    /// in `ctx`. Generic arguments are not compared; type variables in
    /// `type_vars` (or declared on `ctx`) are accepted leniently.
    pub fn is_assignable(&self, ctx: &Declaration, to: &TypeRef, from: &TypeRef, type_vars: &[String]) -> bool {
        let is_var = |t: &TypeRef| {
            t.dims == 0
                && (type_vars.iter().any(|v| v == &t.name)
                    || ctx.type_params.iter().any(|v| v == &t.name))
        };
        if to.is_void() || from.is_void() {
            return false;
        }
        if from.name == "null" && from.dims == 0 {
            return !to.is_primitive();
        }
        if to.dims == from.dims && to.simple_name() == from.simple_name() {
            return true;
        }
        if is_var(to) || is_var(from) || to.is_wildcard() || from.is_wildcard() {
            return true;
        }
        if is_object(to) {
            return !from.is_primitive();
        }

        match (to.is_primitive(), from.is_primitive()) {
            (true, true) => return widens_to(&from.name, &to.name),
            (false, true) => {
                let Some(box_name) = boxed(&from.name) else {
                    return false;
                };
                return to.dims == 0
                    && (to.simple_name() == box_name
                        || matches!(to.simple_name(), "Serializable" | "Comparable")
                        || (to.simple_name() == "Number" && from.name != "boolean" && from.name != "char"));
            }
            (true, false) => {
                return match unboxed(from.simple_name()) {
                    Some(prim) if from.dims == 0 => prim == to.name || widens_to(prim, &to.name),
                    _ => false,
                };
            }
            (false, false) => {}
        }

        if from.is_array() || to.is_array() {
            if to.dims == 0 {
                return matches!(to.simple_name(), "Cloneable" | "Serializable");
            }
            if to.dims != from.dims || to.component().is_primitive() || from.component().is_primitive() {
                return false;
            }
            return self.is_assignable(ctx, &to.component(), &from.component(), type_vars);
        }

        let Some(source) = self.resolve_type(ctx, from) else {
            return false;
        };
        match self.resolve_type(ctx, to) {
            Some(target) => self.is_subtype(&source, target.fqn()),
            None => self.names_supertype(&source, to.simple_name()),
        }
    }

    /// Supertype walk comparing written simple names, for targets that do
    /// not resolve to a projection
    fn names_supertype(&self, source: &Arc<Projection>, simple: &str) -> bool {
        let mut seen = FxHashSet::default();
        let mut queue = VecDeque::from([source.clone()]);
        while let Some(next) = queue.pop_front() {
            if !seen.insert(next.fqn().clone()) {
                continue;
            }
            let decl = next.declaration();
            if decl
                .superclass
                .iter()
                .chain(decl.interfaces.iter())
                .any(|ty| ty.simple_name() == simple)
            {
                return true;
            }
            queue.extend(self.supertypes(&next));
        }
        false
    }

    /// Interfaces reachable from `ty` (written in `ctx`), including `ty`
    /// itself when it is an interface, with type arguments substituted
    pub fn all_interfaces(&self, ctx: &Declaration, ty: &TypeRef) -> Vec<InterfaceRef> {
        let mut out = Vec::new();
        if let Some(projection) = self.resolve_type(ctx, ty) {
            let bindings = bind(projection.declaration(), &ty.args);
            self.collect_interfaces(projection, bindings, &mut FxHashSet::default(), &mut out);
        }
        out
    }

    /// Interfaces a projected class implements, transitively
    pub fn interfaces_of(&self, projection: &Arc<Projection>) -> Vec<InterfaceRef> {
        let mut out = Vec::new();
        self.collect_interfaces(
            projection.clone(),
            HashMap::new(),
            &mut FxHashSet::default(),
            &mut out,
        );
        out
    }

    fn collect_interfaces(
        &self,
        projection: Arc<Projection>,
        bindings: HashMap<String, TypeRef>,
        seen: &mut FxHashSet<Fqn>,
        out: &mut Vec<InterfaceRef>,
    ) {
        if !seen.insert(projection.fqn().clone()) {
            return;
        }
        let decl = projection.declaration_arc();
        let supers: Vec<&TypeRef> = if decl.is_interface() {
            decl.interfaces.iter().collect()
        } else {
            decl.superclass.iter().chain(decl.interfaces.iter()).collect()
        };
        if decl.is_interface() {
            out.push(InterfaceRef {
                projection: projection.clone(),
                bindings: bindings.clone(),
            });
        }
        for super_ty in supers {
            let Some(super_projection) = self.resolve_type(&decl, super_ty) else {
                continue;
            };
            let args: Vec<TypeRef> = super_ty.args.iter().map(|a| a.substitute(&bindings)).collect();
            let super_bindings = bind(super_projection.declaration(), &args);
            self.collect_interfaces(super_projection, super_bindings, seen, out);
        }
    }
}

/// Bind a declaration's type parameters to written arguments; raw uses
/// bind nothing
fn bind(decl: &Declaration, args: &[TypeRef]) -> HashMap<String, TypeRef> {
    if args.len() != decl.type_params.len() {
        return HashMap::new();
    }
    decl.type_params
        .iter()
        .cloned()
        .zip(args.iter().cloned())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::projection_cache::{ModuleRegistry, ProjectionCache, ProjectionMetrics};
    use crate::features::source_producer::InMemorySourceProducer;
    use prometheus::Registry;

    fn setup(types: &[(&str, &str)]) -> (ProjectionCache, ModuleRegistry, ModuleId) {
        let metrics = ProjectionMetrics::new(&Registry::new(), "hierarchy").unwrap();
        let cache = ProjectionCache::new(Arc::new(metrics));
        let modules = ModuleRegistry::new();
        let module = modules.add_module("m");
        let producer = InMemorySourceProducer::primary("mem");
        for (fqn, src) in types {
            producer.insert(fqn, *src, vec![]);
        }
        modules.add_producer(module, Arc::new(producer)).unwrap();
        (cache, modules, module)
    }

    #[test]
    fn test_primitive_and_boxing_rules() {
        let (cache, modules, module) = setup(&[("a.A", "package a; class A {}")]);
        let scope = ResolveScope::new(&cache, &modules, module);
        let h = TypeHierarchy::new(&scope, module);
        let a = h.resolve_fqn("a.A").unwrap();
        let ctx = a.declaration();
        let t = TypeRef::parse;

        assert!(h.is_assignable(ctx, &t("long"), &t("int"), &[]));
        assert!(!h.is_assignable(ctx, &t("int"), &t("long"), &[]));
        assert!(h.is_assignable(ctx, &t("Integer"), &t("int"), &[]));
        assert!(h.is_assignable(ctx, &t("long"), &t("Integer"), &[]));
        assert!(h.is_assignable(ctx, &t("Object"), &t("String"), &[]));
        assert!(!h.is_assignable(ctx, &t("int"), &t("null"), &[]));
        assert!(h.is_assignable(ctx, &t("String"), &t("null"), &[]));
        assert!(h.is_assignable(ctx, &t("T"), &t("String"), &["T".to_string()]));
        assert!(!h.is_assignable(ctx, &t("String"), &t("Integer"), &[]));
        assert!(h.is_assignable(ctx, &t("java.util.List<String>"), &t("List<Integer>"), &[]));
    }

    #[test]
    fn test_supertype_walk_and_imports() {
        let (cache, modules, module) = setup(&[
            ("a.Base", "package a; public class Base implements b.Marker {}"),
            ("a.Sub", "package a; import b.Marker; public class Sub extends Base {}"),
            ("b.Marker", "package b; public interface Marker {}"),
        ]);
        let scope = ResolveScope::new(&cache, &modules, module);
        let h = TypeHierarchy::new(&scope, module);
        let sub = h.resolve_fqn("a.Sub").unwrap();
        let ctx = sub.declaration();

        assert_eq!(h.resolve_name(ctx, "Marker").unwrap().fqn(), &Fqn::new("b.Marker"));
        assert_eq!(h.resolve_name(ctx, "Base").unwrap().fqn(), &Fqn::new("a.Base"));
        assert!(h.is_assignable(ctx, &TypeRef::parse("Marker"), &TypeRef::parse("Sub"), &[]));
        assert!(!h.is_assignable(ctx, &TypeRef::parse("Sub"), &TypeRef::parse("Base"), &[]));
        let ancestors: Vec<_> = h.ancestors(&sub).iter().map(|p| p.fqn().to_string()).collect();
        assert_eq!(ancestors, vec!["a.Base", "b.Marker"]);
    }

    #[test]
    fn test_cyclic_hierarchy_terminates() {
        let (cache, modules, module) = setup(&[
            ("a.X", "package a; interface X extends Y {}"),
            ("a.Y", "package a; interface Y extends X {}"),
        ]);
        let scope = ResolveScope::new(&cache, &modules, module);
        let h = TypeHierarchy::new(&scope, module);
        let x = h.resolve_fqn("a.X").unwrap();
        assert_eq!(h.interfaces_of(&x).len(), 2);
        assert!(!h.is_subtype(&x, &Fqn::new("a.Z")));
    }

    #[test]
    fn test_interface_bindings_follow_arguments() {
        let (cache, modules, module) = setup(&[
            ("a.Source", "package a; interface Source<T> { T next(); }"),
            ("a.Named", "package a; interface Named<N> extends Source<N> {}"),
            ("a.Impl", "package a; class Impl implements Named<String> {}"),
        ]);
        let scope = ResolveScope::new(&cache, &modules, module);
        let h = TypeHierarchy::new(&scope, module);
        let imp = h.resolve_fqn("a.Impl").unwrap();
        let interfaces = h.interfaces_of(&imp);
        let source = interfaces
            .iter()
            .find(|i| i.fqn().as_str() == "a.Source")
            .unwrap();
        assert_eq!(source.bindings.get("T"), Some(&TypeRef::parse("String")));
    }

    #[test]
    fn test_nested_names_resolve_through_enclosing_chain() {
        let (cache, modules, module) = setup(&[(
            "a.Outer",
            "package a; class Outer { static class Left {} static class Right { Left l; } }",
        )]);
        let scope = ResolveScope::new(&cache, &modules, module);
        let h = TypeHierarchy::new(&scope, module);
        let right = h.resolve_fqn("a.Outer.Right").unwrap();
        let left = h.resolve_name(right.declaration(), "Left").unwrap();
        assert_eq!(left.fqn(), &Fqn::new("a.Outer.Left"));
    }
}
