//! Property names derived from accessor names

use once_cell::sync::Lazy;
use rustc_hash::FxHashSet;

static RESERVED: Lazy<FxHashSet<&'static str>> = Lazy::new(|| {
    [
        "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char", "class",
        "const", "continue", "default", "do", "double", "else", "enum", "extends", "final",
        "finally", "float", "for", "goto", "if", "implements", "import", "instanceof", "int",
        "interface", "long", "native", "new", "package", "private", "protected", "public",
        "return", "short", "static", "strictfp", "super", "switch", "synchronized", "this",
        "throw", "throws", "transient", "try", "void", "volatile", "while", "true", "false",
        "null", "var", "record", "yield", "sealed", "permits",
    ]
    .into_iter()
    .collect()
});

pub fn is_reserved_word(name: &str) -> bool {
    RESERVED.contains(name)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessorPrefix {
    Get,
    Is,
    Set,
}

impl AccessorPrefix {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessorPrefix::Get => "get",
            AccessorPrefix::Is => "is",
            AccessorPrefix::Set => "set",
        }
    }
}

/// Property name for `method_name` under `prefix`, e.g. `getFooBar` ->
/// `fooBar`, `get_foo` -> `foo`, `isReady` -> `ready`. `None` when the name
/// does not follow the accessor pattern or derives a reserved word.
pub fn derive_property_name(method_name: &str, prefix: AccessorPrefix) -> Option<String> {
    let rest = method_name.strip_prefix(prefix.as_str())?;
    let first = rest.chars().next()?;
    let name = if first.is_uppercase() || first == '$' {
        decapitalize(rest)
    } else if first == '_' {
        let stripped = rest.trim_start_matches('_');
        if stripped.is_empty() {
            return None;
        }
        stripped.to_string()
    } else {
        return None;
    };
    (!is_reserved_word(&name)).then_some(name)
}

/// Lower-case the first character only, so acronyms keep the rest of
/// their case: `Url` becomes `url`, `URL` becomes `uRL`
pub fn decapitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn capitalize(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_get_and_set_prefixes() {
        assert_eq!(derive_property_name("getFoo", AccessorPrefix::Get).as_deref(), Some("foo"));
        assert_eq!(derive_property_name("setFooBar", AccessorPrefix::Set).as_deref(), Some("fooBar"));
        assert_eq!(derive_property_name("getURL", AccessorPrefix::Get).as_deref(), Some("uRL"));
        assert_eq!(derive_property_name("get$x", AccessorPrefix::Get).as_deref(), Some("$x"));
        assert!(derive_property_name("getter", AccessorPrefix::Get).is_none());
        assert!(derive_property_name("get", AccessorPrefix::Get).is_none());
    }

    #[test]
    fn test_is_prefix_strips_prefix() {
        assert_eq!(derive_property_name("isReady", AccessorPrefix::Is).as_deref(), Some("ready"));
        assert!(derive_property_name("isolate", AccessorPrefix::Is).is_none());
    }

    #[test]
    fn test_underscore_names_strip_underscores() {
        assert_eq!(derive_property_name("get__name", AccessorPrefix::Get).as_deref(), Some("name"));
        assert!(derive_property_name("get__", AccessorPrefix::Get).is_none());
    }

    #[test]
    fn test_reserved_words_rejected() {
        assert!(derive_property_name("getClass", AccessorPrefix::Get).is_none());
        assert!(derive_property_name("setDefault", AccessorPrefix::Set).is_none());
    }

    #[test]
    fn test_capitalize_roundtrip() {
        assert_eq!(capitalize("foo"), "Foo");
        assert_eq!(decapitalize("Foo"), "foo");
        assert_eq!(capitalize(""), "");
    }

    #[test]
    fn test_decapitalize_touches_first_char_only() {
        assert_eq!(decapitalize("URL"), "uRL");
        assert_eq!(decapitalize("XMLParser"), "xMLParser");
        assert_eq!(decapitalize("x"), "x");
        assert_eq!(decapitalize(""), "");
        assert_eq!(capitalize(&decapitalize("URL")), "URL");
    }

    proptest! {
        #[test]
        fn test_derived_names_are_never_reserved(root in "[A-Z][a-zA-Z0-9]{0,12}") {
            for prefix in [AccessorPrefix::Get, AccessorPrefix::Is, AccessorPrefix::Set] {
                let name = format!("{}{}", prefix.as_str(), root);
                if let Some(derived) = derive_property_name(&name, prefix) {
                    prop_assert!(!is_reserved_word(&derived));
                    prop_assert!(!derived.is_empty());
                }
            }
        }
    }
}
