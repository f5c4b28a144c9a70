//! Custom assertions for synthesis results

use manifold_projection::{
    Augmentation, DiagnosticCode, GenerationKind, MemberKind, PropertyAccess, Severity,
};

pub fn codes(aug: &Augmentation, severity: Severity) -> Vec<DiagnosticCode> {
    aug.diagnostics
        .iter()
        .filter(|d| d.severity == severity)
        .map(|d| d.code)
        .collect()
}

/// Assert the augmentation carries no diagnostics at all
pub fn assert_clean(aug: &Augmentation) {
    assert!(
        aug.diagnostics.is_empty(),
        "Expected no diagnostics, got: {:?}",
        aug.diagnostics
    );
}

pub fn assert_property(aug: &Augmentation, name: &str, access: PropertyAccess) {
    let member = aug.member(name, MemberKind::Field).unwrap_or_else(|| {
        panic!(
            "Expected property '{name}', fields: {:?}",
            aug.members_of(MemberKind::Field).map(|m| &m.name).collect::<Vec<_>>()
        )
    });
    assert_eq!(member.property_access(), Some(access), "access of '{name}'");
}

/// Names of delegation stubs forwarding through `link`
pub fn stubs_for(aug: &Augmentation, link: &str) -> Vec<String> {
    aug.members
        .iter()
        .filter(|m| matches!(&m.generation, GenerationKind::DelegationStub { link: l, .. } if l == link))
        .map(|m| m.name.clone())
        .collect()
}

/// Signature keys of telescoped overloads
pub fn overload_keys(aug: &Augmentation) -> Vec<String> {
    aug.members
        .iter()
        .filter(|m| matches!(m.generation, GenerationKind::TelescopedOverload { .. }))
        .filter_map(|m| m.as_method())
        .map(|m| m.signature_key(&[]))
        .collect()
}
