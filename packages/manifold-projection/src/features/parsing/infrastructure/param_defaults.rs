//! Default-valued parameter pre-scan
//!
//! `void foo(int a, int b = 1)` is not Java, so the tree-sitter grammar
//! rejects it. Before parsing, initializers in member-level parameter lists
//! are blanked with spaces (newlines kept, byte offsets unchanged) and the
//! initializer text is recorded per parameter list.
//!
//! Member-level means directly inside a type body or at file level. Method
//! bodies, annotation arguments, strings, chars and comments are skipped.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Brace {
    TypeBody,
    Block,
}

/// Cleaned source plus the initializers removed from it
#[derive(Debug, Default)]
pub struct ParamDefaults {
    pub cleaned: String,
    /// Keyed by byte offset of the list's opening parenthesis;
    /// values are `(parameter index, initializer text)`
    by_list: HashMap<usize, Vec<(usize, String)>>,
}

impl ParamDefaults {
    pub fn default_for(&self, open_paren: usize, index: usize) -> Option<&str> {
        self.by_list
            .get(&open_paren)?
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, text)| text.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.by_list.is_empty()
    }

    pub fn list_count(&self) -> usize {
        self.by_list.len()
    }
}

pub fn extract_param_defaults(source: &str) -> ParamDefaults {
    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut by_list = HashMap::new();
    let mut braces: Vec<Brace> = Vec::new();
    let mut pending_type_body = false;
    let mut prev_significant = 0u8;
    let mut i = 0;

    while i < bytes.len() {
        if let Some(next) = skip_trivia(bytes, i) {
            if bytes[i] == b'"' || bytes[i] == b'\'' {
                prev_significant = bytes[i];
            }
            i = next;
            continue;
        }

        let c = bytes[i];
        let member_level = matches!(braces.last(), None | Some(Brace::TypeBody));
        match c {
            b'{' => {
                braces.push(if pending_type_body {
                    Brace::TypeBody
                } else {
                    Brace::Block
                });
                pending_type_body = false;
            }
            b'}' => {
                braces.pop();
            }
            b';' => pending_type_body = false,
            b'(' if member_level => {
                i = if is_annotation_args(bytes, i) {
                    skip_balanced(bytes, i)
                } else {
                    scan_param_list(source, &mut out, i, &mut by_list)
                };
                prev_significant = b')';
                continue;
            }
            c if is_ident_byte(c) && !c.is_ascii_digit() => {
                let start = i;
                while i < bytes.len() && is_ident_byte(bytes[i]) {
                    i += 1;
                }
                let word = &source[start..i];
                if member_level
                    && prev_significant != b'.'
                    && matches!(word, "class" | "interface" | "enum" | "record")
                {
                    pending_type_body = true;
                }
                prev_significant = bytes[i - 1];
                continue;
            }
            _ => {}
        }
        if !c.is_ascii_whitespace() {
            prev_significant = c;
        }
        i += 1;
    }

    ParamDefaults {
        cleaned: String::from_utf8_lossy(&out).into_owned(),
        by_list,
    }
}

/// Scan one parameter list starting at `open`; returns the index after `)`
fn scan_param_list(
    source: &str,
    out: &mut [u8],
    open: usize,
    by_list: &mut HashMap<usize, Vec<(usize, String)>>,
) -> usize {
    let bytes = source.as_bytes();
    let mut depth = 1usize;
    let mut angle = 0usize;
    let mut index = 0usize;
    let mut segment_start = open + 1;
    let mut defaults = Vec::new();
    let mut j = open + 1;

    while j < bytes.len() {
        if let Some(next) = skip_trivia(bytes, j) {
            j = next;
            continue;
        }
        match bytes[j] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            b'<' if depth == 1 => angle += 1,
            b'>' if depth == 1 && angle > 0 => angle -= 1,
            b',' if depth == 1 && angle == 0 => {
                index += 1;
                segment_start = j + 1;
            }
            b'=' if depth == 1 && angle == 0 && is_assignment(bytes, j) => {
                if looks_like_declaration(&source[segment_start..j]) {
                    let end = scan_initializer_end(bytes, j + 1);
                    defaults.push((index, source[j + 1..end].trim().to_string()));
                    for b in &mut out[j..end] {
                        if *b != b'\n' && *b != b'\r' {
                            *b = b' ';
                        }
                    }
                    j = end;
                    continue;
                }
            }
            _ => {}
        }
        j += 1;
    }

    if !defaults.is_empty() {
        by_list.insert(open, defaults);
    }
    j + 1
}

/// Index of the `,` or `)` that ends an initializer starting at `start`
fn scan_initializer_end(bytes: &[u8], start: usize) -> usize {
    let mut depth = 0usize;
    let mut angle = 0usize;
    let mut j = start;
    while j < bytes.len() {
        if let Some(next) = skip_trivia(bytes, j) {
            j = next;
            continue;
        }
        match bytes[j] {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => {
                if depth == 0 {
                    return j;
                }
                depth -= 1;
            }
            // `new HashMap<K, V>()`: only an angle glued to an identifier opens
            b'<' if j > 0 && is_ident_byte(bytes[j - 1]) => angle += 1,
            b'>' if angle > 0 => angle -= 1,
            b',' if depth == 0 && angle == 0 => return j,
            _ => {}
        }
        j += 1;
    }
    bytes.len()
}

/// `Type name` before the `=`, as opposed to a call argument like `x = 3`
fn looks_like_declaration(segment: &str) -> bool {
    let trimmed = segment.trim_end();
    let name_start = trimmed
        .rfind(|c: char| !(c.is_alphanumeric() || c == '_' || c == '$'))
        .map_or(0, |i| i + 1);
    let name = &trimmed[name_start..];
    let type_part = trimmed[..name_start].trim();
    !name.is_empty() && !type_part.is_empty()
}

fn is_assignment(bytes: &[u8], j: usize) -> bool {
    let next_is_eq = bytes.get(j + 1) == Some(&b'=');
    let prev_is_op = j > 0 && matches!(bytes[j - 1], b'=' | b'!' | b'<' | b'>');
    !next_is_eq && !prev_is_op
}

/// `@Name(` or `@a.b.Name (`
fn is_annotation_args(bytes: &[u8], open: usize) -> bool {
    let mut k = open;
    while k > 0 && bytes[k - 1].is_ascii_whitespace() {
        k -= 1;
    }
    let name_end = k;
    while k > 0 && (is_ident_byte(bytes[k - 1]) || bytes[k - 1] == b'.') {
        k -= 1;
    }
    if k == name_end {
        return false;
    }
    while k > 0 && bytes[k - 1].is_ascii_whitespace() {
        k -= 1;
    }
    k > 0 && bytes[k - 1] == b'@'
}

fn skip_balanced(bytes: &[u8], open: usize) -> usize {
    let mut depth = 0usize;
    let mut j = open;
    while j < bytes.len() {
        if let Some(next) = skip_trivia(bytes, j) {
            j = next;
            continue;
        }
        match bytes[j] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return j + 1;
                }
            }
            _ => {}
        }
        j += 1;
    }
    bytes.len()
}

/// If a comment, string, text block or char literal starts at `i`,
/// the index just past it
fn skip_trivia(bytes: &[u8], i: usize) -> Option<usize> {
    match (bytes[i], bytes.get(i + 1).copied()) {
        (b'/', Some(b'/')) => {
            let end = bytes[i..].iter().position(|&b| b == b'\n');
            Some(end.map_or(bytes.len(), |p| i + p))
        }
        (b'/', Some(b'*')) => {
            let end = bytes[i + 2..].windows(2).position(|w| w == b"*/");
            Some(end.map_or(bytes.len(), |p| i + 2 + p + 2))
        }
        (b'"', _) if bytes[i..].starts_with(b"\"\"\"") => {
            let mut j = i + 3;
            while j < bytes.len() {
                if bytes[j] == b'\\' {
                    j += 2;
                    continue;
                }
                if bytes[j..].starts_with(b"\"\"\"") {
                    return Some(j + 3);
                }
                j += 1;
            }
            Some(bytes.len())
        }
        (quote @ (b'"' | b'\''), _) => {
            let mut j = i + 1;
            while j < bytes.len() && bytes[j] != quote && bytes[j] != b'\n' {
                if bytes[j] == b'\\' {
                    j += 1;
                }
                j += 1;
            }
            Some((j + 1).min(bytes.len()))
        }
        _ => None,
    }
}

fn is_ident_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b >= 0x80
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_blanks_defaults_and_keeps_offsets() {
        let src = "class A { void foo(int a, int b = 1, String c = \"x, y\") {} }";
        let defaults = extract_param_defaults(src);
        assert_eq!(defaults.cleaned.len(), src.len());
        assert_eq!(
            defaults.cleaned,
            "class A { void foo(int a, int b    , String c         ) {} }"
        );
        let open = src.find('(').unwrap();
        assert_eq!(defaults.default_for(open, 1), Some("1"));
        assert_eq!(defaults.default_for(open, 2), Some("\"x, y\""));
        assert_eq!(defaults.default_for(open, 0), None);
    }

    #[test]
    fn test_generic_commas_do_not_advance_index() {
        let src = "class A { void put(Map<String, Integer> m, int n = 2) {} }";
        let defaults = extract_param_defaults(src);
        let open = src.find('(').unwrap();
        assert_eq!(defaults.default_for(open, 1), Some("2"));
    }

    #[test]
    fn test_initializer_with_generic_constructor() {
        let src = "class A { void f(Map<String, Integer> m = new HashMap<String, Integer>(), int k = 3) {} }";
        let defaults = extract_param_defaults(src);
        let open = src.find('(').unwrap();
        assert_eq!(
            defaults.default_for(open, 0),
            Some("new HashMap<String, Integer>()")
        );
        assert_eq!(defaults.default_for(open, 1), Some("3"));
    }

    #[test]
    fn test_ignores_method_bodies_annotations_and_comments() {
        let src = r#"
@Ann(value = 1)
class A {
    // void commented(int a = 1)
    void body() { call(x = 2); if (a == b) {} }
    @Meta(flag = true) void g(@Named(v = "q") int a) {}
}
"#;
        let defaults = extract_param_defaults(src);
        assert!(defaults.is_empty());
        assert_eq!(defaults.cleaned, src);
    }

    #[test]
    fn test_nested_type_bodies_are_member_level() {
        let src = "class A { static class B { B(int x = 5) {} } void m() { new Object() { }; } }";
        let defaults = extract_param_defaults(src);
        assert_eq!(defaults.list_count(), 1);
        let open = src.find("B(").unwrap() + 1;
        assert_eq!(defaults.default_for(open, 0), Some("5"));
    }

    #[test]
    fn test_field_initializer_calls_are_not_defaults() {
        let src = "class A { int x = compute(y = 3); String s = A.class.getName(); }";
        let defaults = extract_param_defaults(src);
        assert!(defaults.is_empty());
    }
}
