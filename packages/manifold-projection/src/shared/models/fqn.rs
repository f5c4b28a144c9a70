//! Fully qualified type names
//!
//! An FQN is the cache's primary key component. Nested types use the
//! dotted form (`a.b.Outer.Inner`), so namespace and simple name are
//! always split at the last dot.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

static VALID_FQN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[\p{L}_$][\p{L}\p{N}_$]*(\.[\p{L}_$][\p{L}\p{N}_$]*)*$")
        .expect("static FQN pattern compiles")
});

/// Interned dotted type name
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Fqn(Arc<str>);

impl Fqn {
    /// Wrap a name without validation
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self(name.into())
    }

    /// Wrap a name only if it is a valid FQN
    pub fn parse(name: &str) -> Option<Self> {
        Self::is_valid(name).then(|| Self::new(name))
    }

    /// Java identifiers separated by single dots
    pub fn is_valid(name: &str) -> bool {
        VALID_FQN.is_match(name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Everything before the last dot (empty for the default package)
    pub fn namespace(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[..idx],
            None => "",
        }
    }

    pub fn simple_name(&self) -> &str {
        match self.0.rfind('.') {
            Some(idx) => &self.0[idx + 1..],
            None => &self.0,
        }
    }

    /// Strip the last segment
    pub fn parent(&self) -> Option<Fqn> {
        self.0.rfind('.').map(|idx| Fqn::new(&self.0[..idx]))
    }

    /// Append a nested segment
    pub fn child(&self, name: &str) -> Fqn {
        if self.0.is_empty() {
            Fqn::new(name)
        } else {
            Fqn::new(format!("{}.{}", self.0, name))
        }
    }
}

impl std::fmt::Display for Fqn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Fqn {
    fn from(value: &str) -> Self {
        Fqn::new(value)
    }
}

impl AsRef<str> for Fqn {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_split_namespace_and_simple_name() {
        let fqn = Fqn::new("com.acme.Outer.Inner");
        assert_eq!(fqn.namespace(), "com.acme.Outer");
        assert_eq!(fqn.simple_name(), "Inner");
        assert_eq!(fqn.parent(), Some(Fqn::new("com.acme.Outer")));

        let bare = Fqn::new("Widget");
        assert_eq!(bare.namespace(), "");
        assert_eq!(bare.simple_name(), "Widget");
        assert_eq!(bare.parent(), None);
    }

    #[test]
    fn test_validity() {
        assert!(Fqn::is_valid("java.lang.String"));
        assert!(Fqn::is_valid("$Gen_1.a$b"));
        assert!(!Fqn::is_valid(""));
        assert!(!Fqn::is_valid("a..b"));
        assert!(!Fqn::is_valid("a.b."));
        assert!(!Fqn::is_valid("1abc"));
        assert!(!Fqn::is_valid("a.b<T>"));
        assert!(Fqn::parse("a b").is_none());
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let fqn = Fqn::new("com.acme.Widget");
        let yaml = serde_yaml::to_string(&fqn).unwrap();
        assert_eq!(yaml.trim(), "com.acme.Widget");

        let back: Fqn = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(back, fqn);
        assert_eq!(back.simple_name(), "Widget");
    }

    proptest! {
        #[test]
        fn test_child_then_parent_roundtrip(
            ns in "[a-z][a-z0-9]{0,6}(\\.[a-z][a-z0-9]{0,6}){0,3}",
            name in "[A-Z][A-Za-z0-9_]{0,8}",
        ) {
            let outer = Fqn::new(ns.as_str());
            let nested = outer.child(&name);
            prop_assert!(Fqn::is_valid(nested.as_str()));
            prop_assert_eq!(nested.simple_name(), name.as_str());
            prop_assert_eq!(nested.parent(), Some(outer));
        }
    }
}
