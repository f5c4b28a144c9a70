//! Textual type references
//!
//! Types in producer output are kept as written (`List<String>[]`,
//! `java.util.Map.Entry<K, V>`, `? extends T`). Resolution to projections
//! happens later in the type hierarchy; this module only parses, prints,
//! erases and substitutes.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub const PRIMITIVES: [&str; 8] = [
    "boolean", "byte", "short", "char", "int", "long", "float", "double",
];

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Wildcard {
    Unbounded,
    Extends(Box<TypeRef>),
    Super(Box<TypeRef>),
}

/// A type as written: dotted name, generic arguments, array dimensions
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    /// `?` for wildcards
    pub name: String,
    pub args: Vec<TypeRef>,
    pub dims: u32,
    pub wildcard: Option<Wildcard>,
}

impl TypeRef {
    pub fn simple(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            dims: 0,
            wildcard: None,
        }
    }

    pub fn void() -> Self {
        Self::simple("void")
    }

    pub fn boolean() -> Self {
        Self::simple("boolean")
    }

    pub fn object() -> Self {
        Self::simple("java.lang.Object")
    }

    pub fn with_args(mut self, args: Vec<TypeRef>) -> Self {
        self.args = args;
        self
    }

    pub fn array(mut self, dims: u32) -> Self {
        self.dims += dims;
        self
    }

    /// Element type of an array, or `self` for non-arrays
    pub fn component(&self) -> TypeRef {
        let mut component = self.clone();
        component.dims = component.dims.saturating_sub(1);
        component
    }

    /// Parse a type as written. Leading annotations are dropped; text that
    /// does not follow the type grammar is kept verbatim as the name.
    pub fn parse(text: &str) -> TypeRef {
        let chars: Vec<char> = text.chars().collect();
        let mut parser = TypeParser { chars: &chars, pos: 0 };
        match parser.parse_type() {
            Some(ty) if parser.at_end() => ty,
            _ => TypeRef::simple(text.trim()),
        }
    }

    pub fn is_void(&self) -> bool {
        self.dims == 0 && self.name == "void"
    }

    pub fn is_primitive(&self) -> bool {
        self.dims == 0 && PRIMITIVES.contains(&self.name.as_str())
    }

    pub fn is_array(&self) -> bool {
        self.dims > 0
    }

    pub fn is_wildcard(&self) -> bool {
        self.wildcard.is_some()
    }

    pub fn is_boolean(&self) -> bool {
        self.dims == 0 && (self.name == "boolean" || self.name == "Boolean" || self.name == "java.lang.Boolean")
    }

    /// Last dotted segment of the name
    pub fn simple_name(&self) -> &str {
        self.name.rsplit('.').next().unwrap_or(&self.name)
    }

    /// Erased form used for signature comparison. Type variables erase to
    /// `Object`; qualified and simple spellings of a name compare equal.
    pub fn erasure(&self, type_vars: &[String]) -> String {
        let base = if self.is_wildcard() || type_vars.iter().any(|v| v == &self.name) {
            "Object"
        } else {
            self.simple_name()
        };
        let mut out = String::with_capacity(base.len() + 2 * self.dims as usize);
        out.push_str(base);
        for _ in 0..self.dims {
            out.push_str("[]");
        }
        out
    }

    /// Replace type variables by name
    pub fn substitute(&self, bindings: &HashMap<String, TypeRef>) -> TypeRef {
        if bindings.is_empty() {
            return self.clone();
        }
        if let Some(wildcard) = &self.wildcard {
            let wildcard = match wildcard {
                Wildcard::Unbounded => Wildcard::Unbounded,
                Wildcard::Extends(bound) => Wildcard::Extends(Box::new(bound.substitute(bindings))),
                Wildcard::Super(bound) => Wildcard::Super(Box::new(bound.substitute(bindings))),
            };
            return TypeRef {
                wildcard: Some(wildcard),
                ..self.clone()
            };
        }
        if self.args.is_empty() {
            if let Some(bound) = bindings.get(&self.name) {
                return bound.clone().array(self.dims);
            }
        }
        TypeRef {
            name: self.name.clone(),
            args: self.args.iter().map(|a| a.substitute(bindings)).collect(),
            dims: self.dims,
            wildcard: None,
        }
    }
}

impl std::fmt::Display for TypeRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.wildcard {
            Some(Wildcard::Unbounded) => f.write_str("?")?,
            Some(Wildcard::Extends(bound)) => write!(f, "? extends {}", bound)?,
            Some(Wildcard::Super(bound)) => write!(f, "? super {}", bound)?,
            None => {
                f.write_str(&self.name)?;
                if !self.args.is_empty() {
                    f.write_str("<")?;
                    for (i, arg) in self.args.iter().enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    f.write_str(">")?;
                }
            }
        }
        for _ in 0..self.dims {
            f.write_str("[]")?;
        }
        Ok(())
    }
}

struct TypeParser<'a> {
    chars: &'a [char],
    pos: usize,
}

impl<'a> TypeParser<'a> {
    fn at_end(&mut self) -> bool {
        self.skip_ws();
        self.pos >= self.chars.len()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    fn eat(&mut self, c: char) -> bool {
        self.skip_ws();
        if self.peek() == Some(c) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn ident(&mut self) -> Option<String> {
        self.skip_ws();
        let start = self.pos;
        while matches!(self.peek(), Some(c) if c.is_alphanumeric() || c == '_' || c == '$') {
            self.pos += 1;
        }
        (self.pos > start).then(|| self.chars[start..self.pos].iter().collect())
    }

    fn keyword(&mut self, word: &str) -> bool {
        let save = self.pos;
        match self.ident() {
            Some(id) if id == word => true,
            _ => {
                self.pos = save;
                false
            }
        }
    }

    fn skip_annotations(&mut self) {
        loop {
            self.skip_ws();
            if self.peek() != Some('@') {
                return;
            }
            self.pos += 1;
            let _ = self.dotted();
            self.skip_ws();
            if self.peek() == Some('(') {
                let mut depth = 0usize;
                while let Some(c) = self.peek() {
                    self.pos += 1;
                    match c {
                        '(' => depth += 1,
                        ')' => {
                            depth -= 1;
                            if depth == 0 {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
        }
    }

    fn dotted(&mut self) -> Option<String> {
        let mut name = self.ident()?;
        loop {
            let save = self.pos;
            if self.eat('.') {
                if let Some(next) = self.ident() {
                    name.push('.');
                    name.push_str(&next);
                    continue;
                }
            }
            self.pos = save;
            return Some(name);
        }
    }

    fn parse_type(&mut self) -> Option<TypeRef> {
        self.skip_annotations();
        if self.eat('?') {
            let wildcard = if self.keyword("extends") {
                Wildcard::Extends(Box::new(self.parse_type()?))
            } else if self.keyword("super") {
                Wildcard::Super(Box::new(self.parse_type()?))
            } else {
                Wildcard::Unbounded
            };
            return Some(TypeRef {
                name: "?".to_string(),
                args: Vec::new(),
                dims: 0,
                wildcard: Some(wildcard),
            });
        }

        let mut name = self.dotted()?;
        let mut args = Vec::new();
        // `Outer<A>.Inner<B>` keeps the innermost arguments
        loop {
            if self.eat('<') {
                args.clear();
                if !self.eat('>') {
                    loop {
                        args.push(self.parse_type()?);
                        if self.eat(',') {
                            continue;
                        }
                        if self.eat('>') {
                            break;
                        }
                        return None;
                    }
                }
            }
            let save = self.pos;
            if self.eat('.') {
                if let Some(next) = self.ident() {
                    name.push('.');
                    name.push_str(&next);
                    continue;
                }
            }
            self.pos = save;
            break;
        }

        let mut dims = 0;
        loop {
            self.skip_annotations();
            if self.eat('[') {
                if !self.eat(']') {
                    return None;
                }
                dims += 1;
                continue;
            }
            let save = self.pos;
            if self.eat('.') && self.eat('.') && self.eat('.') {
                dims += 1;
                continue;
            }
            self.pos = save;
            break;
        }

        Some(TypeRef {
            name,
            args,
            dims,
            wildcard: None,
        })
    }
}
