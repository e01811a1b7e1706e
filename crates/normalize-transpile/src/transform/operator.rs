//! Operator overloads.
//!
//! A fixed table maps each operator kind to a method shape. Kinds outside
//! the table are errors; flexible mode keeps a stub under a descriptive name.

use super::class::{body_or_stub, lower_params};
use super::types::map_type;
use super::{Cx, Halt, Scope};
use crate::ir::{Declaration, Expr, Function, OperatorKind, Stmt, TypeRef};
use crate::names;
use crate::target::{
    JavaExpr, JavaLiteral, JavaStmt, JavaType, MethodDecl, Modifiers, Param, TypeDecl,
};
use normalize_transpile_report::ConstructKind;
use std::collections::BTreeSet;

/// Target shape of an operator kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shape {
    /// Named method returning a new instance
    Binary(&'static str),
    Unary(&'static str),
    /// `equals` override plus a consistent `hashCode`
    Equality,
    /// `!=` is expressed through `equals`
    FoldedIntoEquals,
    /// `get(index)`, plus `set(index, value)` for mutable element access
    Index,
    /// `isValid()` predicate
    Validity,
    /// Copy assignment; target assignment copies references
    DroppedAssignment,
    Unmapped,
}

pub(crate) fn shape(kind: OperatorKind) -> Shape {
    match kind {
        OperatorKind::Add => Shape::Binary("plus"),
        OperatorKind::Sub => Shape::Binary("minus"),
        OperatorKind::Mul => Shape::Binary("times"),
        OperatorKind::Div => Shape::Binary("div"),
        OperatorKind::Mod => Shape::Binary("rem"),
        OperatorKind::Negate => Shape::Unary("negate"),
        OperatorKind::Equal => Shape::Equality,
        OperatorKind::NotEqual => Shape::FoldedIntoEquals,
        OperatorKind::Index => Shape::Index,
        OperatorKind::BoolConversion => Shape::Validity,
        OperatorKind::Assign => Shape::DroppedAssignment,
        _ => Shape::Unmapped,
    }
}

/// Method name an operator lowers to, including the placeholder name of
/// unmapped kinds.
pub(crate) fn method_name(kind: OperatorKind, spelling: &str) -> String {
    let name = match shape(kind) {
        Shape::Binary(name) | Shape::Unary(name) => name,
        Shape::Equality | Shape::FoldedIntoEquals => "equals",
        Shape::Index => "get",
        Shape::Validity => "isValid",
        Shape::DroppedAssignment => "assign",
        Shape::Unmapped => return fallback_name(kind, spelling),
    };
    name.to_string()
}

fn fallback_name(kind: OperatorKind, spelling: &str) -> String {
    let name = match kind {
        OperatorKind::Less => "lessThan",
        OperatorKind::Greater => "greaterThan",
        OperatorKind::LessEqual => "lessOrEqual",
        OperatorKind::GreaterEqual => "greaterOrEqual",
        OperatorKind::Spaceship => "compareTo",
        OperatorKind::Call => "invoke",
        OperatorKind::Conversion => "convert",
        OperatorKind::Increment => "increment",
        OperatorKind::Decrement => "decrement",
        OperatorKind::Not => "not",
        OperatorKind::BitAnd => "and",
        OperatorKind::BitOr => "or",
        OperatorKind::BitXor => "xor",
        OperatorKind::BitNot => "inverse",
        OperatorKind::ShiftLeft => "shiftLeft",
        OperatorKind::ShiftRight => "shiftRight",
        OperatorKind::LogicalAnd => "logicalAnd",
        OperatorKind::LogicalOr => "logicalOr",
        OperatorKind::Arrow => "arrow",
        OperatorKind::Deref => "dereference",
        OperatorKind::AddressOf => "addressOf",
        OperatorKind::Comma => "comma",
        OperatorKind::New => "allocate",
        OperatorKind::Delete => "deallocate",
        OperatorKind::UnaryPlus => "unaryPlus",
        OperatorKind::CompoundAssign => return compound_name(spelling),
        _ => "operator",
    };
    name.to_string()
}

/// `operator+=` to `plusAssign`.
fn compound_name(spelling: &str) -> String {
    let symbol = spelling
        .trim_start_matches("operator")
        .trim()
        .trim_end_matches('=');
    let base = match symbol {
        "+" => "plus",
        "-" => "minus",
        "*" => "times",
        "/" => "div",
        "%" => "rem",
        "&" => "and",
        "|" => "or",
        "^" => "xor",
        "<<" => "shiftLeft",
        ">>" => "shiftRight",
        _ => "compound",
    };
    format!("{base}Assign")
}

/// A resolved member operator call.
pub(crate) fn call_site(
    kind: OperatorKind,
    spelling: &str,
    receiver: JavaExpr,
    mut args: Vec<JavaExpr>,
) -> JavaExpr {
    match shape(kind) {
        Shape::FoldedIntoEquals => JavaExpr::not(JavaExpr::call(receiver, "equals", args)),
        Shape::Validity => JavaExpr::call(receiver, "isValid", Vec::new()),
        Shape::DroppedAssignment if args.len() == 1 => {
            JavaExpr::assign(receiver, args.remove(0))
        }
        _ => JavaExpr::call(receiver, method_name(kind, spelling), args),
    }
}

/// A resolved call of a free operator function living in a utility class.
pub(crate) fn free_call_site(
    kind: OperatorKind,
    spelling: &str,
    util: JavaType,
    args: Vec<JavaExpr>,
) -> JavaExpr {
    match shape(kind) {
        Shape::FoldedIntoEquals => JavaExpr::not(JavaExpr::static_call(util, "equals", args)),
        _ => JavaExpr::static_call(util, method_name(kind, spelling), args),
    }
}

/// The class an operator member belongs to.
pub(crate) struct Owner<'s> {
    pub decl: &'s Declaration,
    pub this_type: &'s JavaType,
    pub scope: &'s Scope,
}

/// Lower a member operator into `target`.
pub(crate) fn lower_member(
    decl: &Declaration,
    function: &Function,
    kind: OperatorKind,
    owner: &Owner,
    cx: &mut Cx,
    target: &mut TypeDecl,
) -> Result<(), Halt> {
    let scope = owner.scope;
    let symbols = cx.symbols;
    let returns = map_type(&function.return_type, scope, symbols);
    match shape(kind) {
        Shape::Binary(name) | Shape::Unary(name) => {
            let params = lower_params(&function.params, scope, symbols);
            let body = body_or_stub(decl, function, scope, cx);
            target.push_method(MethodDecl::new(name, returns, params).with_body(body));
        }
        Shape::Equality => {
            target.push_method(equals(decl, function, owner, cx));
            target.push_method(hash_code(function, owner));
        }
        Shape::FoldedIntoEquals => {
            cx.info(
                ConstructKind::Operator,
                &decl.location,
                format!("{} folds into equals", decl.name),
            );
        }
        Shape::Index => index(decl, function, returns, scope, cx, target),
        Shape::Validity => {
            let body = body_or_stub(decl, function, scope, cx);
            target.push_method(
                MethodDecl::new("isValid", JavaType::primitive("boolean"), Vec::new())
                    .with_body(body),
            );
        }
        Shape::DroppedAssignment => {
            cx.warn(
                ConstructKind::Operator,
                &decl.location,
                format!(
                    "copy assignment of {} dropped; assignment copies the reference",
                    names::simple_name(&owner.decl.qualified_name)
                ),
            );
        }
        Shape::Unmapped => {
            let message = unmapped_message(decl, kind);
            cx.error(ConstructKind::Operator, &decl.location, message.clone())?;
            let params = lower_params(&function.params, scope, symbols);
            target.push_method(MethodDecl::stub(
                method_name(kind, &decl.name),
                returns,
                params,
                message,
            ));
        }
    }
    Ok(())
}

/// Lower a free operator function to a static utility method.
pub(crate) fn lower_free(
    decl: &Declaration,
    function: &Function,
    kind: OperatorKind,
    scope: &Scope,
    cx: &mut Cx,
) -> Result<Option<MethodDecl>, Halt> {
    let symbols = cx.symbols;
    let returns = map_type(&function.return_type, scope, symbols);
    let params = lower_params(&function.params, scope, symbols);
    let name = method_name(kind, &decl.name);
    match shape(kind) {
        Shape::FoldedIntoEquals => {
            cx.info(
                ConstructKind::Operator,
                &decl.location,
                format!("{} folds into equals", decl.name),
            );
            Ok(None)
        }
        Shape::Unmapped | Shape::DroppedAssignment => {
            let message = unmapped_message(decl, kind);
            cx.error(ConstructKind::Operator, &decl.location, message.clone())?;
            let mut stub = MethodDecl::stub(name, returns, params, message);
            stub.modifiers = Modifiers::public_static();
            Ok(Some(stub))
        }
        _ => {
            let body = body_or_stub(decl, function, scope, cx);
            let mut method = MethodDecl::new(name, returns, params).with_body(body);
            method.modifiers = Modifiers::public_static();
            Ok(Some(method))
        }
    }
}

fn unmapped_message(decl: &Declaration, kind: OperatorKind) -> String {
    format!(
        "{} ({}) has no target mapping",
        decl.name,
        kind.spelling()
    )
}

/// Parameter name of the `Object` argument, clear of the source parameter.
fn object_param(source: &str) -> &'static str {
    if source == "o" { "obj" } else { "o" }
}

fn equals(decl: &Declaration, function: &Function, owner: &Owner, cx: &mut Cx) -> MethodDecl {
    let this_type = owner.this_type;
    let other = function
        .params
        .first()
        .map(|p| p.name.as_str())
        .unwrap_or("other");
    let other_name = names::escape_identifier(other);
    let object = object_param(&other_name);

    // instanceof needs the erased type
    let raw = this_type.clone().with_args(Vec::new());
    let mut body = vec![
        JavaStmt::If {
            cond: JavaExpr::binary(JavaExpr::This, "==", JavaExpr::ident(object)),
            then: vec![JavaStmt::Return(Some(JavaExpr::bool(true)))],
            otherwise: None,
        },
        JavaStmt::If {
            cond: JavaExpr::not(JavaExpr::InstanceOf {
                value: Box::new(JavaExpr::ident(object)),
                ty: raw,
            }),
            then: vec![JavaStmt::Return(Some(JavaExpr::bool(false)))],
            otherwise: None,
        },
        JavaStmt::Local {
            ty: this_type.clone(),
            name: other_name.clone(),
            init: Some(JavaExpr::Cast {
                ty: this_type.clone(),
                value: Box::new(JavaExpr::ident(object)),
            }),
        },
    ];
    if function.body.is_some() {
        body.extend(body_or_stub(decl, function, owner.scope, cx));
    } else {
        body.push(JavaStmt::Return(Some(fieldwise_equality(owner, &other_name))));
    }
    MethodDecl::new(
        "equals",
        JavaType::primitive("boolean"),
        vec![Param::new(object, JavaType::object())],
    )
    .with_body(body)
    .overriding()
}

fn fieldwise_equality(owner: &Owner, other: &str) -> JavaExpr {
    let is_primitive = |ty: &TypeRef| matches!(ty.value_type(), TypeRef::Primitive(_));
    owner
        .decl
        .fields()
        .filter(|(_, f)| !f.is_static)
        .map(|(d, f)| {
            let name = names::escape_identifier(&d.name);
            let mine = JavaExpr::this_field(name.clone());
            let theirs = JavaExpr::field(JavaExpr::ident(other), name);
            if is_primitive(&f.ty) {
                JavaExpr::binary(mine, "==", theirs)
            } else {
                JavaExpr::static_call(
                    JavaType::class("java.util", "Objects"),
                    "equals",
                    vec![mine, theirs],
                )
            }
        })
        .reduce(|acc, next| JavaExpr::binary(acc, "&&", next))
        .unwrap_or_else(|| JavaExpr::bool(true))
}

/// `hashCode` over the fields `equals` compares, or every instance field
/// when the comparison is not visible.
fn hash_code(function: &Function, owner: &Owner) -> MethodDecl {
    let instance: Vec<&str> = owner
        .decl
        .fields()
        .filter(|(_, f)| !f.is_static)
        .map(|(d, _)| d.name.as_str())
        .collect();
    let compared = function
        .body
        .as_deref()
        .map(|body| compared_fields(body, &instance))
        .unwrap_or_default();
    let fields: Vec<JavaExpr> = instance
        .iter()
        .filter(|f| compared.is_empty() || compared.contains(**f))
        .map(|f| JavaExpr::ident(names::escape_identifier(f)))
        .collect();
    let hash = if fields.is_empty() {
        JavaExpr::Literal(JavaLiteral::Int(0))
    } else {
        JavaExpr::static_call(JavaType::class("java.util", "Objects"), "hash", fields)
    };
    MethodDecl::new("hashCode", JavaType::primitive("int"), Vec::new())
        .with_body(vec![JavaStmt::Return(Some(hash))])
        .overriding()
}

fn compared_fields<'b>(body: &'b [Stmt], fields: &[&str]) -> BTreeSet<&'b str> {
    let mut seen = BTreeSet::new();
    for stmt in body {
        stmt.walk_exprs(&mut |e| {
            let name = match e {
                Expr::Ident { name } => name.as_str(),
                Expr::Member { member, .. } => member.as_str(),
                _ => return,
            };
            if fields.contains(&name) {
                seen.insert(name);
            }
        });
    }
    seen
}

fn index(
    decl: &Declaration,
    function: &Function,
    returns: JavaType,
    scope: &Scope,
    cx: &mut Cx,
    target: &mut TypeDecl,
) {
    let symbols = cx.symbols;
    let params = lower_params(&function.params, scope, symbols);
    let body = body_or_stub(decl, function, scope, cx);
    target.push_method(MethodDecl::new("get", returns.clone(), params.clone()).with_body(body));

    let mutable = matches!(function.return_type, TypeRef::Reference(ref inner) if !matches!(**inner, TypeRef::Const(_)));
    if !mutable {
        return;
    }
    let value = if function.params.iter().any(|p| p.name == "value") {
        "newValue"
    } else {
        "value"
    };
    let mut set_params = params;
    set_params.push(Param::new(value, returns));

    let element = match function.body.as_deref() {
        Some([Stmt::Return { value: Some(element) }]) => Some(element),
        _ => None,
    };
    let set = match element {
        Some(element) => {
            let mut lowering = super::body::BodyLowering::new(cx, scope, &decl.location);
            for param in &function.params {
                lowering.declare(&param.name, &param.ty);
            }
            lowering.declare(value, &function.return_type);
            let store = lowering.expr(&Expr::assign(element.clone(), Expr::ident(value)));
            MethodDecl::new("set", JavaType::Void, set_params).with_body(vec![JavaStmt::expr(store)])
        }
        None => {
            let message = format!("{}: element store of {} needs a manual set", decl.name, decl.qualified_name);
            cx.warn_manual(ConstructKind::Operator, &decl.location, message.clone());
            MethodDecl::stub("set", JavaType::Void, set_params, message)
        }
    };
    target.push_method(set);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ClassLike, DeclId, DeclKind, Field, FunctionRole, Param as IrParam, TranslationUnit};
    use crate::transform::test_support::{lower_one, symbols_for};
    use normalize_transpile_report::{Diagnostic, Mode, Severity};

    fn lower_class(members: Vec<Declaration>) -> (TypeDecl, Vec<Diagnostic>) {
        let decl = Declaration::new(DeclId(1), "Grid", DeclKind::ClassLike(ClassLike::default()))
            .with_children(members);
        let symbols = symbols_for(&[TranslationUnit::new("grid.cpp", vec![decl.clone()])]);
        let (files, diags) = lower_one(&decl, &symbols, Mode::Strict);
        (files.unwrap().remove(0).decl, diags)
    }

    fn cells() -> Declaration {
        Declaration::new(DeclId(2), "cells", DeclKind::Field(Field::new("int[4]".parse().unwrap())))
    }

    #[test]
    fn const_index_is_read_only() {
        let at = Function::new(
            FunctionRole::Method,
            "const int&".parse().unwrap(),
            vec![IrParam::new("i", TypeRef::primitive("int"))],
        )
        .with_body(vec![Stmt::ret(Some(Expr::ident("i")))]);
        let (grid, diags) = lower_class(vec![
            cells(),
            Declaration::new(DeclId(3), "operator[]", DeclKind::Function(at)),
        ]);
        assert!(grid.has_method("get(int)"));
        assert!(grid.method("set").is_none());
        assert!(diags.iter().all(|d| d.severity < Severity::Error));
    }

    #[test]
    fn bool_conversion_is_is_valid() {
        let truthy = Function::new(FunctionRole::Method, TypeRef::primitive("bool"), vec![])
            .with_body(vec![Stmt::ret(Some(Expr::ident("ready")))]);
        let ready = Declaration::new(DeclId(2), "ready", DeclKind::Field(Field::new(TypeRef::primitive("bool"))));
        let (grid, _) = lower_class(vec![
            ready,
            Declaration::new(DeclId(3), "operator bool", DeclKind::Function(truthy)),
        ]);
        let valid = grid.method("isValid").unwrap();
        assert_eq!(valid.return_type, Some(JavaType::primitive("boolean")));
        assert!(valid.params.is_empty());
        assert!(!valid.is_stub());
    }

    #[test]
    fn table_shapes() {
        assert_eq!(shape(OperatorKind::Add), Shape::Binary("plus"));
        assert_eq!(shape(OperatorKind::Mod), Shape::Binary("rem"));
        assert_eq!(shape(OperatorKind::Equal), Shape::Equality);
        assert_eq!(shape(OperatorKind::BoolConversion), Shape::Validity);
        assert_eq!(shape(OperatorKind::ShiftLeft), Shape::Unmapped);
        assert_eq!(shape(OperatorKind::Spaceship), Shape::Unmapped);
    }

    #[test]
    fn placeholder_names() {
        assert_eq!(method_name(OperatorKind::CompoundAssign, "operator+="), "plusAssign");
        assert_eq!(method_name(OperatorKind::CompoundAssign, "operator<<="), "shiftLeftAssign");
        assert_eq!(method_name(OperatorKind::Less, "operator<"), "lessThan");
        assert_eq!(method_name(OperatorKind::Index, "operator[]"), "get");
    }

    #[test]
    fn not_equal_call_negates_equals() {
        let call = call_site(
            OperatorKind::NotEqual,
            "operator!=",
            JavaExpr::ident("a"),
            vec![JavaExpr::ident("b")],
        );
        let JavaExpr::Unary { operand, .. } = call else {
            panic!("expected negation");
        };
        assert!(matches!(*operand, JavaExpr::Call { ref name, .. } if name == "equals"));
    }
}
