//! Extension classes from supplemental producers

use crate::features::augment::domain::{GenerationKind, MemberBody, Origin, SyntheticMember};
use crate::features::projection_cache::{ExtensionSet, Projection, ResolveScope};
use crate::shared::models::{Diagnostic, DiagnosticCode, Method, Span, Visibility};
use std::sync::Arc;

/// Parse every supplemental producer's output for `projection`, at most
/// once per projection
pub fn load_extensions<'p>(projection: &'p Projection, scope: &ResolveScope<'_>) -> &'p ExtensionSet {
    projection.extensions_or_init(|| {
        let mut set = ExtensionSet::default();
        for producer in projection.supplements() {
            let text = match producer.produce(projection.fqn(), None, scope) {
                Ok(text) => text,
                Err(err) => {
                    tracing::warn!(
                        "Supplemental producer {} failed for {}: {}",
                        producer.name(),
                        projection.fqn(),
                        err
                    );
                    set.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::ProducerFailed,
                        projection.fqn(),
                        Span::zero(),
                        format!("Producer {} failed: {}", producer.name(), err),
                    ));
                    continue;
                }
            };
            match scope.cache().parser().parse(&text) {
                Ok(unit) => set.classes.extend(
                    unit.types
                        .into_iter()
                        .filter(|decl| decl.enclosing.is_none())
                        .map(Arc::new),
                ),
                Err(err) => {
                    tracing::warn!(
                        "Malformed extension source for {} from {}: {}",
                        projection.fqn(),
                        producer.name(),
                        err
                    );
                    set.diagnostics.push(Diagnostic::error(
                        DiagnosticCode::MalformedSource,
                        projection.fqn(),
                        Span::zero(),
                        format!("Malformed extension source from {}: {}", producer.name(), err),
                    ));
                }
            }
        }
        tracing::debug!(
            "Loaded {} extension class(es) for {}",
            set.classes.len(),
            projection.fqn()
        );
        set
    })
}

/// Members contributed by extension classes. A static method whose first
/// parameter is annotated `@This` becomes an instance method without that
/// parameter; other static methods stay static.
pub fn extension_members(set: &ExtensionSet) -> Vec<SyntheticMember> {
    let mut members = Vec::new();
    for class in &set.classes {
        for method in &class.methods {
            if method.is_constructor
                || !method.modifiers.is_static
                || method.modifiers.visibility == Visibility::Private
            {
                continue;
            }
            let mut projected: Method = method.clone();
            if projected.params.first().map_or(false, |p| p.has_annotation("This")) {
                projected.params.remove(0);
                projected.modifiers.is_static = false;
            }
            members.push(SyntheticMember {
                name: projected.name.clone(),
                body: MemberBody::Method(projected),
                generation: GenerationKind::Extension {
                    source: class.fqn.clone(),
                },
                origin: Origin {
                    declaration: class.fqn.clone(),
                    member: method.name.clone(),
                    span: method.span,
                },
            });
        }
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::parsing::DeclarationParser;

    fn set_from(source: &str) -> ExtensionSet {
        let unit = DeclarationParser::new().parse(source).unwrap();
        ExtensionSet {
            classes: unit.types.into_iter().map(Arc::new).collect(),
            diagnostics: Vec::new(),
        }
    }

    #[test]
    fn test_this_parameter_makes_instance_method() {
        let set = set_from(
            "package ext; public class StrExt {\n\
               public static String shout(@This String self, int times) { return self; }\n\
               public static String empty() { return \"\"; }\n\
               private static void hidden(@This String self) {}\n\
               public void notStatic() {}\n\
             }",
        );
        let members = extension_members(&set);
        let names: Vec<_> = members.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["shout", "empty"]);

        let shout = members[0].as_method().unwrap();
        assert!(!shout.modifiers.is_static);
        assert_eq!(shout.params.len(), 1);
        assert_eq!(shout.params[0].name, "times");
        assert!(members[1].as_method().unwrap().modifiers.is_static);
        assert!(matches!(
            &members[0].generation,
            GenerationKind::Extension { source } if source.as_str() == "ext.StrExt"
        ));
    }
}
