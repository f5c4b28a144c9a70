//! Producer text -> `Declaration` via tree-sitter-java
//!
//! Every type in the compilation unit (nested ones included) becomes its
//! own `Declaration`. A unit with any syntax error is rejected as a whole.

use super::param_defaults::{extract_param_defaults, ParamDefaults};
use crate::features::parsing::ParseError;
use crate::shared::models::{
    Annotation, AnnotationValue, DeclId, DeclKind, Declaration, Field, Fingerprint, Fqn, Method,
    Modifiers, Param, Span, TypeRef, Visibility, PROPERTY_ANNOTATIONS,
};
use std::sync::atomic::{AtomicU64, Ordering};
use tree_sitter::{Node as TSNode, Parser};

/// Span conversion for tree-sitter nodes
pub trait SpanExt {
    fn to_span(&self) -> Span;
}

impl SpanExt for TSNode<'_> {
    fn to_span(&self) -> Span {
        let start = self.start_position();
        let end = self.end_position();
        Span::new(
            start.row as u32,
            start.column as u32,
            end.row as u32,
            end.column as u32,
        )
    }
}

/// All declarations parsed from one producer output
#[derive(Debug, Clone)]
pub struct ParsedUnit {
    pub package: String,
    pub imports: Vec<String>,
    /// Top-level types first in source order, each followed by its nested types
    pub types: Vec<Declaration>,
}

impl ParsedUnit {
    pub fn find(&self, fqn: &Fqn) -> Option<&Declaration> {
        self.types.iter().find(|d| &d.fqn == fqn)
    }
}

/// Parses producer output. Declaration ids are unique per parser instance.
pub struct DeclarationParser {
    next_id: AtomicU64,
}

impl DeclarationParser {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate an id for a declaration built outside the parser
    pub fn next_id(&self) -> DeclId {
        DeclId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    pub fn parse(&self, source: &str) -> Result<ParsedUnit, ParseError> {
        let defaults = extract_param_defaults(source);

        let mut parser = Parser::new();
        parser
            .set_language(&tree_sitter_java::language())
            .map_err(|e| ParseError::Language(e.to_string()))?;
        let tree = parser
            .parse(&defaults.cleaned, None)
            .ok_or(ParseError::NoTree)?;
        let root = tree.root_node();
        if root.has_error() {
            let (line, column) = first_error(root).unwrap_or((0, 0));
            return Err(ParseError::Syntax { line, column });
        }

        let mut walker = UnitWalker {
            src: &defaults.cleaned,
            defaults: &defaults,
            parser: self,
            fingerprint: Fingerprint::compute(source.as_bytes()),
            package: String::new(),
            imports: Vec::new(),
            types: Vec::new(),
        };
        walker.walk(root);

        if walker.types.is_empty() {
            return Err(ParseError::NoTypes);
        }
        Ok(ParsedUnit {
            package: walker.package,
            imports: walker.imports,
            types: walker.types,
        })
    }
}

struct UnitWalker<'a> {
    src: &'a str,
    defaults: &'a ParamDefaults,
    parser: &'a DeclarationParser,
    fingerprint: Fingerprint,
    package: String,
    imports: Vec<String>,
    types: Vec<Declaration>,
}

#[derive(Clone, Copy)]
struct Container {
    /// Interface or annotation body: members are implicitly public
    interface_like: bool,
}

impl<'a> UnitWalker<'a> {
    fn text(&self, node: TSNode) -> &'a str {
        self.src.get(node.byte_range()).unwrap_or("")
    }

    fn walk(&mut self, root: TSNode) {
        for child in named_children(root) {
            match child.kind() {
                "package_declaration" => {
                    self.package = named_children(child)
                        .into_iter()
                        .find(|n| matches!(n.kind(), "scoped_identifier" | "identifier"))
                        .map(|n| self.text(n).to_string())
                        .unwrap_or_default();
                }
                "import_declaration" => {
                    if let Some(import) = self.import_path(child) {
                        self.imports.push(import);
                    }
                }
                kind if is_type_declaration(kind) => {
                    self.visit_type(child, None, None);
                }
                _ => {}
            }
        }
    }

    fn import_path(&self, node: TSNode) -> Option<String> {
        let mut cursor = node.walk();
        let is_static = node.children(&mut cursor).any(|c| c.kind() == "static");
        if is_static {
            return None;
        }
        let text: String = self
            .text(node)
            .trim_start_matches("import")
            .trim_end_matches(';')
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();
        (!text.is_empty()).then_some(text)
    }

    fn visit_type(
        &mut self,
        node: TSNode,
        enclosing: Option<&Fqn>,
        container: Option<Container>,
    ) -> Option<Fqn> {
        let name = self.text(node.child_by_field_name("name")?);
        let fqn = match enclosing {
            Some(outer) => outer.child(name),
            None if self.package.is_empty() => Fqn::new(name),
            None => Fqn::new(format!("{}.{}", self.package, name)),
        };
        let kind = match node.kind() {
            "interface_declaration" => DeclKind::Interface,
            "enum_declaration" => DeclKind::Enum,
            "record_declaration" => DeclKind::Record,
            "annotation_type_declaration" => DeclKind::Annotation,
            _ => DeclKind::Class,
        };

        let (mut modifiers, annotations) = self.modifiers(node);
        if let Some(container) = container {
            if container.interface_like {
                if !modifiers.explicit_visibility {
                    modifiers.visibility = Visibility::Public;
                }
                modifiers.is_static = true;
            }
            if kind != DeclKind::Class {
                modifiers.is_static = true;
            }
        }

        let superclass = node
            .child_by_field_name("superclass")
            .and_then(|n| named_children(n).into_iter().next())
            .map(|n| TypeRef::parse(self.text(n)));

        let mut interfaces = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if matches!(child.kind(), "super_interfaces" | "extends_interfaces") {
                for list in named_children(child) {
                    if list.kind() == "type_list" {
                        interfaces.extend(
                            named_children(list)
                                .into_iter()
                                .map(|t| TypeRef::parse(self.text(t))),
                        );
                    }
                }
            }
        }

        let index = self.types.len();
        self.types.push(Declaration {
            id: self.parser.next_id(),
            fqn: fqn.clone(),
            kind,
            package: self.package.clone(),
            imports: self.imports.clone(),
            modifiers,
            annotations,
            type_params: self.type_params(node),
            superclass,
            interfaces,
            fields: Vec::new(),
            methods: Vec::new(),
            nested: Vec::new(),
            enclosing: enclosing.cloned(),
            span: node.to_span(),
            fingerprint: self.fingerprint,
            diagnostics: Vec::new(),
        });

        let mut members = Members::default();
        if kind == DeclKind::Record {
            if let Some(params) = node.child_by_field_name("parameters") {
                for component in self.params(params) {
                    members.fields.push(Field {
                        name: component.name.clone(),
                        ty: component.ty.clone(),
                        modifiers: Modifiers {
                            visibility: Visibility::Private,
                            is_final: true,
                            ..Modifiers::default()
                        },
                        annotations: component.annotations.clone(),
                        has_initializer: false,
                        span: params.to_span(),
                    });
                    members.record_components.push(component);
                }
            }
        }

        let body_container = Container {
            interface_like: matches!(kind, DeclKind::Interface | DeclKind::Annotation),
        };
        if let Some(body) = node.child_by_field_name("body") {
            self.visit_body(body, &fqn, body_container, &mut members);
        }

        // Records get an accessor per component unless one is declared
        for component in members.record_components.drain(..) {
            let declared = members
                .methods
                .iter()
                .any(|m| m.name == component.name && m.params.is_empty());
            if !declared {
                members.methods.push(Method {
                    name: component.name.clone(),
                    return_type: Some(component.ty.clone()),
                    params: Vec::new(),
                    type_params: Vec::new(),
                    throws: Vec::new(),
                    modifiers: Modifiers::public(),
                    annotations: Vec::new(),
                    is_constructor: false,
                    has_body: true,
                    span: node.to_span(),
                });
            }
        }

        let decl = &mut self.types[index];
        decl.fields = members.fields;
        decl.methods = members.methods;
        decl.nested = members.nested;
        Some(fqn)
    }

    fn visit_body(
        &mut self,
        body: TSNode,
        owner: &Fqn,
        container: Container,
        members: &mut Members,
    ) {
        for child in named_children(body) {
            match child.kind() {
                "field_declaration" | "constant_declaration" => {
                    members.fields.extend(self.fields(child, container));
                }
                "method_declaration" | "annotation_type_element_declaration" => {
                    members.methods.push(self.method(child, container, false));
                }
                "constructor_declaration" => {
                    members.methods.push(self.method(child, container, true));
                }
                "enum_constant" => {
                    if let Some(name) = child.child_by_field_name("name") {
                        members.fields.push(Field {
                            name: self.text(name).to_string(),
                            ty: TypeRef::simple(owner.simple_name()),
                            modifiers: Modifiers {
                                is_static: true,
                                is_final: true,
                                ..Modifiers::public()
                            },
                            annotations: self.modifiers(child).1,
                            has_initializer: true,
                            span: child.to_span(),
                        });
                    }
                }
                "enum_body_declarations" => {
                    self.visit_body(child, owner, container, members);
                }
                kind if is_type_declaration(kind) => {
                    if let Some(nested) = self.visit_type(child, Some(owner), Some(container)) {
                        members.nested.push(nested);
                    }
                }
                _ => {}
            }
        }
    }

    fn fields(&self, node: TSNode, container: Container) -> Vec<Field> {
        let (mut modifiers, annotations) = self.modifiers(node);
        let is_property = annotations
            .iter()
            .any(|a| PROPERTY_ANNOTATIONS.contains(&a.simple_name()));
        if container.interface_like {
            modifiers.visibility = Visibility::Public;
            // Interface properties are instance members unless written static
            if !is_property {
                modifiers.is_static = true;
                modifiers.is_final = true;
            }
        }
        let base = node
            .child_by_field_name("type")
            .map(|t| TypeRef::parse(self.text(t)))
            .unwrap_or_else(|| TypeRef::simple("Object"));

        let mut fields = Vec::new();
        let mut cursor = node.walk();
        for declarator in node.children_by_field_name("declarator", &mut cursor) {
            let Some(name) = declarator.child_by_field_name("name") else {
                continue;
            };
            let dims = declarator
                .child_by_field_name("dimensions")
                .map_or(0, |d| count_dims(self.text(d)));
            fields.push(Field {
                name: self.text(name).to_string(),
                ty: base.clone().array(dims),
                modifiers: modifiers.clone(),
                annotations: annotations.clone(),
                has_initializer: declarator.child_by_field_name("value").is_some(),
                span: declarator.to_span(),
            });
        }
        fields
    }

    fn method(&self, node: TSNode, container: Container, is_constructor: bool) -> Method {
        let (mut modifiers, annotations) = self.modifiers(node);
        let has_body = node.child_by_field_name("body").is_some();
        if container.interface_like {
            if modifiers.visibility != Visibility::Private {
                modifiers.visibility = Visibility::Public;
            }
            if !has_body && !modifiers.is_static && !modifiers.is_default {
                modifiers.is_abstract = true;
            }
        }

        let name = node
            .child_by_field_name("name")
            .map(|n| self.text(n).to_string())
            .unwrap_or_default();
        let return_type = if is_constructor {
            None
        } else {
            node.child_by_field_name("type")
                .map(|t| TypeRef::parse(self.text(t)))
        };
        let params = node
            .child_by_field_name("parameters")
            .map(|p| self.params(p))
            .unwrap_or_default();

        let mut throws = Vec::new();
        let mut cursor = node.walk();
        for child in node.children(&mut cursor) {
            if child.kind() == "throws" {
                throws.extend(
                    named_children(child)
                        .into_iter()
                        .map(|t| TypeRef::parse(self.text(t))),
                );
            }
        }

        Method {
            name,
            return_type,
            params,
            type_params: self.type_params(node),
            throws,
            modifiers,
            annotations,
            is_constructor,
            has_body,
            span: node.to_span(),
        }
    }

    fn params(&self, list: TSNode) -> Vec<Param> {
        let open = list.start_byte();
        let mut params = Vec::new();
        let mut index = 0;
        for child in named_children(list) {
            match child.kind() {
                "formal_parameter" => {
                    let (_, annotations) = self.modifiers(child);
                    let dims = child
                        .child_by_field_name("dimensions")
                        .map_or(0, |d| count_dims(self.text(d)));
                    let ty = child
                        .child_by_field_name("type")
                        .map(|t| TypeRef::parse(self.text(t)))
                        .unwrap_or_else(|| TypeRef::simple("Object"))
                        .array(dims);
                    let name = child
                        .child_by_field_name("name")
                        .map(|n| self.text(n).to_string())
                        .unwrap_or_default();
                    params.push(Param {
                        name,
                        ty,
                        default_value: self.defaults.default_for(open, index).map(str::to_string),
                        varargs: false,
                        annotations,
                    });
                    index += 1;
                }
                "spread_parameter" => {
                    let (_, annotations) = self.modifiers(child);
                    let mut ty = None;
                    let mut name = String::new();
                    for part in named_children(child) {
                        match part.kind() {
                            "modifiers" => {}
                            "variable_declarator" => {
                                name = part
                                    .child_by_field_name("name")
                                    .map(|n| self.text(n).to_string())
                                    .unwrap_or_default();
                            }
                            _ if ty.is_none() => ty = Some(TypeRef::parse(self.text(part))),
                            _ => {}
                        }
                    }
                    params.push(Param {
                        name,
                        ty: ty.unwrap_or_else(|| TypeRef::simple("Object")).array(1),
                        default_value: None,
                        varargs: true,
                        annotations,
                    });
                    index += 1;
                }
                "receiver_parameter" => index += 1,
                _ => {}
            }
        }
        params
    }

    fn type_params(&self, node: TSNode) -> Vec<String> {
        let Some(list) = node.child_by_field_name("type_parameters") else {
            return Vec::new();
        };
        named_children(list)
            .into_iter()
            .filter(|n| n.kind() == "type_parameter")
            .filter_map(|n| {
                named_children(n)
                    .into_iter()
                    .find(|c| matches!(c.kind(), "type_identifier" | "identifier"))
                    .map(|c| self.text(c).to_string())
            })
            .collect()
    }

    fn modifiers(&self, node: TSNode) -> (Modifiers, Vec<Annotation>) {
        let mut modifiers = Modifiers::default();
        let mut annotations = Vec::new();
        let mut cursor = node.walk();
        let Some(list) = node.children(&mut cursor).find(|c| c.kind() == "modifiers") else {
            return (modifiers, annotations);
        };
        let mut cursor = list.walk();
        for child in list.children(&mut cursor) {
            match child.kind() {
                "public" => {
                    modifiers.visibility = Visibility::Public;
                    modifiers.explicit_visibility = true;
                }
                "protected" => {
                    modifiers.visibility = Visibility::Protected;
                    modifiers.explicit_visibility = true;
                }
                "private" => {
                    modifiers.visibility = Visibility::Private;
                    modifiers.explicit_visibility = true;
                }
                "static" => modifiers.is_static = true,
                "final" => modifiers.is_final = true,
                "abstract" => modifiers.is_abstract = true,
                "default" => modifiers.is_default = true,
                "annotation" | "marker_annotation" => {
                    if let Some(annotation) = self.annotation(child) {
                        annotations.push(annotation);
                    }
                }
                _ => {}
            }
        }
        (modifiers, annotations)
    }

    fn annotation(&self, node: TSNode) -> Option<Annotation> {
        let name = self.text(node.child_by_field_name("name")?).to_string();
        let mut args = Vec::new();
        if let Some(list) = node.child_by_field_name("arguments") {
            for arg in named_children(list) {
                if arg.kind() == "element_value_pair" {
                    let key = arg
                        .child_by_field_name("key")
                        .map(|k| self.text(k).to_string())
                        .unwrap_or_default();
                    if let Some(value) = arg.child_by_field_name("value") {
                        args.push((key, self.annotation_value(value)));
                    }
                } else {
                    args.push(("value".to_string(), self.annotation_value(arg)));
                }
            }
        }
        Some(Annotation { name, args })
    }

    fn annotation_value(&self, node: TSNode) -> AnnotationValue {
        match node.kind() {
            "class_literal" => {
                let ty = named_children(node)
                    .into_iter()
                    .next()
                    .map(|t| self.text(t))
                    .unwrap_or_else(|| self.text(node).trim_end_matches(".class"));
                AnnotationValue::ClassLit(TypeRef::parse(ty))
            }
            "true" => AnnotationValue::Bool(true),
            "false" => AnnotationValue::Bool(false),
            "string_literal" => {
                AnnotationValue::Str(self.text(node).trim_matches('"').to_string())
            }
            "element_value_array_initializer" => AnnotationValue::Array(
                named_children(node)
                    .into_iter()
                    .map(|v| self.annotation_value(v))
                    .collect(),
            ),
            _ => AnnotationValue::Other(self.text(node).to_string()),
        }
    }
}

#[derive(Default)]
struct Members {
    fields: Vec<Field>,
    methods: Vec<Method>,
    nested: Vec<Fqn>,
    record_components: Vec<Param>,
}

fn is_type_declaration(kind: &str) -> bool {
    matches!(
        kind,
        "class_declaration"
            | "interface_declaration"
            | "enum_declaration"
            | "record_declaration"
            | "annotation_type_declaration"
    )
}

/// Named children without comments
fn named_children(node: TSNode) -> Vec<TSNode> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor)
        .filter(|n| !matches!(n.kind(), "line_comment" | "block_comment"))
        .collect()
}

fn count_dims(text: &str) -> u32 {
    text.matches('[').count() as u32
}

/// 1-based position of the first error or missing node
fn first_error(node: TSNode) -> Option<(usize, usize)> {
    if node.is_error() || node.is_missing() {
        let pos = node.start_position();
        return Some((pos.row + 1, pos.column + 1));
    }
    let mut cursor = node.walk();
    let children: Vec<_> = node.children(&mut cursor).collect();
    children
        .into_iter()
        .filter(|c| c.has_error() || c.is_missing())
        .find_map(first_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(src: &str) -> ParsedUnit {
        DeclarationParser::new().parse(src).unwrap()
    }

    #[test]
    fn test_class_header() {
        let unit = parse(
            r#"
package com.acme;

import java.util.List;
import java.util.function.*;
import static java.util.Objects.requireNonNull;

@part
public abstract class Widget<T extends Number> extends Base<T> implements Runnable, java.io.Serializable {
}
"#,
        );
        assert_eq!(unit.package, "com.acme");
        assert_eq!(unit.imports, vec!["java.util.List", "java.util.function.*"]);
        let decl = &unit.types[0];
        assert_eq!(decl.fqn, Fqn::new("com.acme.Widget"));
        assert_eq!(decl.kind, DeclKind::Class);
        assert_eq!(decl.type_params, vec!["T"]);
        assert_eq!(decl.superclass.as_ref().unwrap().to_string(), "Base<T>");
        let ifaces: Vec<_> = decl.interfaces.iter().map(|i| i.to_string()).collect();
        assert_eq!(ifaces, vec!["Runnable", "java.io.Serializable"]);
        assert!(decl.has_annotation("part"));
        assert!(decl.modifiers.is_abstract);
        assert_eq!(decl.modifiers.visibility, Visibility::Public);
    }

    #[test]
    fn test_members_and_defaults() {
        let unit = parse(
            r#"
package a;
class Config {
    private static final int LIMIT = 3, OTHER[] = {};
    @link(value = Runnable.class, share = true) Runnable task;

    Config(String name, int size = 10) {}

    public <R> R get(String key, boolean strict = false) throws java.io.IOException { return null; }
    void log(String fmt, Object... args) {}
}
"#,
        );
        let decl = &unit.types[0];
        assert_eq!(decl.fields.len(), 3);
        assert_eq!(decl.fields[1].name, "OTHER");
        assert_eq!(decl.fields[1].ty.to_string(), "int[]");
        assert!(decl.fields[0].modifiers.is_static);

        let link = decl.field("task").unwrap().annotation("link").unwrap();
        assert_eq!(
            link.arg("value"),
            Some(&AnnotationValue::ClassLit(TypeRef::simple("Runnable")))
        );
        assert_eq!(link.arg("share"), Some(&AnnotationValue::Bool(true)));

        let ctor = decl.constructors().next().unwrap();
        assert_eq!(ctor.params[1].default_value.as_deref(), Some("10"));
        assert!(ctor.return_type.is_none());

        let get = decl.methods_named("get").next().unwrap();
        assert_eq!(get.type_params, vec!["R"]);
        assert_eq!(get.params[1].default_value.as_deref(), Some("false"));
        assert_eq!(get.throws[0].to_string(), "java.io.IOException");

        let log = decl.methods_named("log").next().unwrap();
        assert!(log.params[1].varargs);
        assert_eq!(log.params[1].ty.to_string(), "Object[]");
    }

    #[test]
    fn test_nested_types_and_interface_defaults() {
        let unit = parse(
            r#"
package a;
public interface Shape {
    int SIDES = 0;
    double area();
    default String label() { return "shape"; }
    class Impl implements Shape { public double area() { return 0; } }
}
"#,
        );
        assert_eq!(unit.types.len(), 2);
        let shape = unit.find(&Fqn::new("a.Shape")).unwrap();
        assert_eq!(shape.nested, vec![Fqn::new("a.Shape.Impl")]);
        assert!(shape.fields[0].modifiers.is_static);
        let area = shape.methods_named("area").next().unwrap();
        assert!(area.modifiers.is_abstract);
        assert_eq!(area.modifiers.visibility, Visibility::Public);
        let label = shape.methods_named("label").next().unwrap();
        assert!(!label.modifiers.is_abstract);

        let imp = unit.find(&Fqn::new("a.Shape.Impl")).unwrap();
        assert_eq!(imp.enclosing, Some(Fqn::new("a.Shape")));
        assert!(imp.modifiers.is_static);
        assert_eq!(imp.modifiers.visibility, Visibility::Public);
    }

    #[test]
    fn test_interface_property_field_keeps_written_modifiers() {
        let unit = parse(
            r#"
package a;
public interface Named {
    @var String name;
    @val static int LIMIT = 3;
    int PLAIN = 1;
}
"#,
        );
        let named = unit.find(&Fqn::new("a.Named")).unwrap();
        let name = named.field("name").unwrap();
        assert!(!name.modifiers.is_static);
        assert!(!name.modifiers.is_final);
        assert_eq!(name.modifiers.visibility, Visibility::Public);
        assert!(named.field("LIMIT").unwrap().modifiers.is_static);
        let plain = named.field("PLAIN").unwrap();
        assert!(plain.modifiers.is_static && plain.modifiers.is_final);
    }

    #[test]
    fn test_enum_and_record() {
        let unit = parse(
            r#"
package a;
enum Color { RED, GREEN; int code() { return 0; } }
record Point(int x, int y) { public int x() { return x; } }
"#,
        );
        let color = unit.find(&Fqn::new("a.Color")).unwrap();
        let names: Vec<_> = color.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["RED", "GREEN"]);
        assert_eq!(color.methods.len(), 1);

        let point = unit.find(&Fqn::new("a.Point")).unwrap();
        assert_eq!(point.kind, DeclKind::Record);
        assert_eq!(point.fields.len(), 2);
        assert_eq!(point.methods_named("x").count(), 1);
        assert_eq!(point.methods_named("y").count(), 1);
    }

    #[test]
    fn test_syntax_error_rejected() {
        let err = DeclarationParser::new()
            .parse("package a; class Broken { void f( }")
            .unwrap_err();
        assert!(matches!(err, ParseError::Syntax { .. }));
    }

    #[test]
    fn test_no_types_rejected() {
        let err = DeclarationParser::new().parse("package a;").unwrap_err();
        assert!(matches!(err, ParseError::NoTypes));
    }

    #[test]
    fn test_ids_are_unique() {
        let parser = DeclarationParser::new();
        let a = parser.parse("class A {}").unwrap();
        let b = parser.parse("class A {}").unwrap();
        assert_ne!(a.types[0].id, b.types[0].id);
        assert_eq!(a.types[0].fingerprint, b.types[0].fingerprint);
    }
}
