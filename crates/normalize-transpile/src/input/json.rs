//! JSON resolved-AST reader.

use super::ast::AstDocument;
use super::builder;
use crate::ir::TranslationUnit;
use crate::traits::{ReadError, Reader};

/// Static instance of the JSON reader for registry.
pub static JSON_READER: JsonReader = JsonReader;

/// Reader for the front end's JSON documents.
pub struct JsonReader;

impl Reader for JsonReader {
    fn format(&self) -> &'static str {
        "json"
    }

    fn read(&self, unit: &str, source: &str) -> Result<TranslationUnit, ReadError> {
        read_json(unit, source)
    }
}

/// Parse a JSON document into Translation IR.
pub fn read_json(unit: &str, source: &str) -> Result<TranslationUnit, ReadError> {
    let document: AstDocument = serde_json::from_str(source)?;
    builder::build(document, unit)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DeclKind, FunctionRole, Stmt, TypeRef, UnsupportedKind};

    const SHAPES: &str = r#"{
        "unit": "shapes.cpp",
        "declarations": [
            { "kind": "namespace", "name": "Geo", "line": 1, "children": [
                { "kind": "class", "name": "Circle", "line": 2, "has_destructor": true,
                  "bases": [ { "name": "Geo::Shape" } ],
                  "children": [
                    { "kind": "field", "name": "radius", "type": "double", "line": 3 },
                    { "kind": "constructor", "name": "Circle", "line": 4,
                      "params": [ { "name": "r", "type": "double" } ],
                      "initializers": [ { "member": "radius", "args": [ { "kind": "ident", "name": "r" } ] } ],
                      "body": [] },
                    { "kind": "method", "name": "area", "return_type": "double", "const": true, "line": 5,
                      "body": [ { "kind": "return", "value": { "kind": "ident", "name": "radius" } } ] },
                    { "kind": "destructor", "name": "~Circle", "line": 6, "body": [] }
                  ] },
                { "kind": "function", "name": "unit_circle", "return_type": "Geo::Circle", "line": 8 },
                { "kind": "union", "name": "Raw", "line": 9 }
            ] }
        ]
    }"#;

    #[test]
    fn builds_qualified_tree() {
        let unit = read_json("fallback.cpp", SHAPES).unwrap();
        assert_eq!(unit.id, "shapes.cpp");
        let geo = &unit.declarations[0];
        assert!(matches!(geo.kind, DeclKind::Namespace));
        let circle = &geo.children[0];
        assert_eq!(circle.qualified_name, "Geo::Circle");
        assert_eq!(circle.location.line, 2);
        assert_eq!(circle.location.file, "shapes.cpp");
        let class = circle.as_class().unwrap();
        assert!(class.has_user_destructor);
        assert_eq!(class.bases[0].name, "Geo::Shape");

        let radius = circle.children[0].as_field().unwrap();
        assert_eq!(radius.ty, TypeRef::primitive("double"));
        let roles: Vec<_> = circle.methods().map(|(_, f)| f.role).collect();
        assert_eq!(
            roles,
            [FunctionRole::Constructor, FunctionRole::Method, FunctionRole::Destructor]
        );
        let (_, area) = circle.methods().nth(1).unwrap();
        assert!(area.is_const);
        assert!(matches!(area.body.as_deref(), Some([Stmt::Return { .. }])));

        let free = geo.children[1].as_function().unwrap();
        assert_eq!(free.role, FunctionRole::Free);
        assert!(free.body.is_none());
        assert!(matches!(
            &geo.children[2].kind,
            DeclKind::Unsupported(u) if u.construct == UnsupportedKind::Union
        ));
    }

    #[test]
    fn ids_follow_document_order() {
        let unit = read_json("x", SHAPES).unwrap();
        let mut ids = Vec::new();
        unit.walk(&mut |d| ids.push(d.id.0));
        let mut sorted = ids.clone();
        sorted.sort_unstable();
        assert_eq!(ids, sorted);
    }

    #[test]
    fn specializations_fold_into_templates() {
        let source = r#"{ "declarations": [
            { "kind": "class_template", "name": "Box", "template_params": [ { "name": "T" } ],
              "children": [ { "kind": "field", "name": "value", "type": "T" } ] },
            { "kind": "specialization", "template": "Box", "args": ["int"],
              "decl": { "kind": "class", "name": "Box" } },
            { "kind": "specialization", "template": "Other::Pair", "args": ["int", "int"],
              "decl": { "kind": "class", "name": "Pair" } }
        ] }"#;
        let unit = read_json("box.cpp", source).unwrap();
        assert_eq!(unit.id, "box.cpp");
        assert_eq!(unit.declarations.len(), 1);
        let DeclKind::Template(template) = &unit.declarations[0].kind else {
            panic!("expected a template");
        };
        assert_eq!(template.params[0].name, "T");
        assert_eq!(template.specializations.len(), 1);
        assert_eq!(template.specializations[0].args, [TypeRef::primitive("int")]);
        assert_eq!(unit.external_specializations.len(), 1);
        assert_eq!(unit.external_specializations[0].template, "Other::Pair");
    }

    #[test]
    fn malformed_documents_are_errors() {
        assert!(matches!(
            read_json("a", "{ not json"),
            Err(ReadError::Malformed(_))
        ));
        assert!(matches!(
            read_json("a", r#"{ "declarations": [ { "kind": "lambda" } ] }"#),
            Err(ReadError::Malformed(_))
        ));
        let bad_type = r#"{ "declarations": [ { "kind": "field", "name": "x", "type": "std::vector<int" } ] }"#;
        assert!(matches!(read_json("a", bad_type), Err(ReadError::Type { .. })));
    }
}
