//! Constants: `#define`, `const` and `constexpr` with a literal value.
//!
//! Initializers are folded at conversion time. A value that folds becomes a
//! `static final` field holding the literal; anything that depends on
//! runtime state keeps a non-final field for manual initialization.

use super::types::map_type;
use super::{Cx, Scope};
use crate::ir::{BinaryOp, Constant, DeclKind, Declaration, Expr, Literal, TypeRef, UnaryOp};
use crate::names;
use crate::symbols::SymbolTable;
use crate::target::{FieldDecl, JavaExpr, JavaLiteral, JavaType, Modifiers};
use normalize_transpile_report::ConstructKind;

const MAX_DEPTH: usize = 16;

/// A folded constant value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Value {
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

impl Value {
    fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Int(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    fn truthy(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Float(f) => Some(*f != 0.0),
            Value::Str(_) => None,
        }
    }

    /// Target type for a constant declared without one.
    fn inferred_type(&self) -> JavaType {
        match self {
            Value::Bool(_) => JavaType::primitive("boolean"),
            Value::Int(i) if i32::try_from(*i).is_err() => JavaType::primitive("long"),
            Value::Int(_) => JavaType::primitive("int"),
            Value::Float(_) => JavaType::primitive("double"),
            Value::Str(_) => JavaType::string(),
        }
    }
}

pub(crate) fn lower(decl: &Declaration, constant: &Constant, scope: &Scope, cx: &mut Cx) -> FieldDecl {
    let symbols = cx.symbols;
    let name = names::upper_snake(&decl.name);
    let declared = constant.ty.as_ref().map(|ty| map_type(ty, scope, symbols));

    let folded = fold(&constant.init, scope, symbols, 0)
        .and_then(|value| literal(&value, declared.as_ref()).map(|init| (value, init)));
    match folded {
        Some((value, init)) => {
            let ty = declared.unwrap_or_else(|| value.inferred_type());
            FieldDecl::new(name, ty, Modifiers::constant()).with_init(init)
        }
        None => {
            cx.warn_manual(
                ConstructKind::Constant,
                &decl.location,
                format!(
                    "initializer of {} is not a compile-time constant; the field is left non-final",
                    decl.qualified_name
                ),
            );
            let ty = declared.unwrap_or_else(JavaType::object);
            let mut field = FieldDecl::new(name, ty, Modifiers::public_static());
            field.comment = Some(format!("deferred initialization of {}", decl.name));
            field
        }
    }
}

/// Literal for a folded value, converted to the declared type.
fn literal(value: &Value, declared: Option<&JavaType>) -> Option<JavaExpr> {
    let primitive = match declared {
        Some(JavaType::Primitive(p)) => Some(p.as_str()),
        _ => None,
    };
    let lit = match (value, primitive) {
        (Value::Str(s), None) => JavaLiteral::String(s.clone()),
        (Value::Str(_), Some(_)) => return None,
        (v, Some("boolean")) => JavaLiteral::Bool(v.truthy()?),
        (v, Some("float")) => {
            return Some(JavaExpr::Cast {
                ty: JavaType::primitive("float"),
                value: Box::new(JavaExpr::Literal(JavaLiteral::Float(v.as_f64()?))),
            });
        }
        (v, Some("double")) => JavaLiteral::Float(v.as_f64()?),
        (Value::Float(f), Some(_)) => int_literal(*f as i64),
        (Value::Int(i), _) => int_literal(*i),
        (Value::Bool(b), Some(_)) => int_literal(i64::from(*b)),
        (Value::Bool(b), None) => JavaLiteral::Bool(*b),
        (Value::Float(f), None) => JavaLiteral::Float(*f),
    };
    Some(JavaExpr::Literal(lit))
}

fn int_literal(value: i64) -> JavaLiteral {
    if i32::try_from(value).is_ok() {
        JavaLiteral::Int(value)
    } else {
        JavaLiteral::Long(value)
    }
}

/// Fold an initializer to a value, following references to other constants.
pub(crate) fn fold(expr: &Expr, scope: &Scope, symbols: &SymbolTable, depth: usize) -> Option<Value> {
    if depth > MAX_DEPTH {
        return None;
    }
    match expr {
        Expr::Literal { value } => match value {
            Literal::Null => None,
            Literal::Bool(b) => Some(Value::Bool(*b)),
            Literal::Int(i) => Some(Value::Int(*i)),
            Literal::Float(f) => Some(Value::Float(*f)),
            Literal::String(s) => Some(Value::Str(s.clone())),
        },
        Expr::Ident { name } => {
            let symbol = symbols.resolve(name, scope.lookup_scope())?;
            match &symbol.decl.kind {
                DeclKind::Constant(c) => fold(&c.init, scope, symbols, depth + 1),
                _ => None,
            }
        }
        Expr::Unary { op, operand } => {
            let value = fold(operand, scope, symbols, depth + 1)?;
            match (op, value) {
                (UnaryOp::Neg, Value::Int(i)) => i.checked_neg().map(Value::Int),
                (UnaryOp::Neg, Value::Float(f)) => Some(Value::Float(-f)),
                (UnaryOp::Not, v) => v.truthy().map(|b| Value::Bool(!b)),
                (UnaryOp::BitNot, Value::Int(i)) => Some(Value::Int(!i)),
                _ => None,
            }
        }
        Expr::Binary { op, left, right } => {
            let left = fold(left, scope, symbols, depth + 1)?;
            let right = fold(right, scope, symbols, depth + 1)?;
            binary(*op, left, right)
        }
        Expr::Cast { ty, value } => {
            let target = cast_target(ty)?;
            convert(fold(value, scope, symbols, depth + 1)?, target)
        }
        // Functional cast: `int(x)`
        Expr::Construct { ty, args } if args.len() == 1 => {
            let target = cast_target(ty)?;
            convert(fold(&args[0], scope, symbols, depth + 1)?, target)
        }
        Expr::Conditional {
            cond,
            then,
            otherwise,
        } => {
            let cond = fold(cond, scope, symbols, depth + 1)?.truthy()?;
            let branch = if cond { then } else { otherwise };
            fold(branch, scope, symbols, depth + 1)
        }
        _ => None,
    }
}

#[derive(Clone, Copy)]
enum Target {
    Bool,
    Int,
    Float,
}

fn cast_target(ty: &TypeRef) -> Option<Target> {
    match ty.value_type() {
        TypeRef::Primitive(p) => Some(match p.as_str() {
            "bool" => Target::Bool,
            "float" | "double" | "long double" => Target::Float,
            _ => Target::Int,
        }),
        _ => None,
    }
}

fn convert(value: Value, target: Target) -> Option<Value> {
    Some(match target {
        Target::Bool => Value::Bool(value.truthy()?),
        Target::Float => Value::Float(value.as_f64()?),
        Target::Int => match value {
            Value::Int(i) => Value::Int(i),
            Value::Float(f) => Value::Int(f as i64),
            Value::Bool(b) => Value::Int(i64::from(b)),
            Value::Str(_) => return None,
        },
    })
}

fn binary(op: BinaryOp, left: Value, right: Value) -> Option<Value> {
    use BinaryOp::*;
    if let (Value::Int(l), Value::Int(r)) = (&left, &right) {
        let (l, r) = (*l, *r);
        return Some(match op {
            Add => Value::Int(l.checked_add(r)?),
            Sub => Value::Int(l.checked_sub(r)?),
            Mul => Value::Int(l.checked_mul(r)?),
            Div => Value::Int(l.checked_div(r)?),
            Mod => Value::Int(l.checked_rem(r)?),
            BitAnd => Value::Int(l & r),
            BitOr => Value::Int(l | r),
            BitXor => Value::Int(l ^ r),
            Shl => Value::Int(l.checked_shl(u32::try_from(r).ok()?)?),
            Shr => Value::Int(l.checked_shr(u32::try_from(r).ok()?)?),
            Eq => Value::Bool(l == r),
            Ne => Value::Bool(l != r),
            Lt => Value::Bool(l < r),
            Le => Value::Bool(l <= r),
            Gt => Value::Bool(l > r),
            Ge => Value::Bool(l >= r),
            And => Value::Bool(l != 0 && r != 0),
            Or => Value::Bool(l != 0 || r != 0),
        });
    }
    if let (Value::Str(l), Value::Str(r)) = (&left, &right) {
        return match op {
            // Adjacent string literals
            Add => Some(Value::Str(format!("{l}{r}"))),
            Eq => Some(Value::Bool(l == r)),
            Ne => Some(Value::Bool(l != r)),
            _ => None,
        };
    }
    if matches!(op, And | Or) {
        let (l, r) = (left.truthy()?, right.truthy()?);
        return Some(Value::Bool(if op == And { l && r } else { l || r }));
    }
    let (l, r) = (left.as_f64()?, right.as_f64()?);
    Some(match op {
        Add => Value::Float(l + r),
        Sub => Value::Float(l - r),
        Mul => Value::Float(l * r),
        Div => Value::Float(l / r),
        Eq => Value::Bool(l == r),
        Ne => Value::Bool(l != r),
        Lt => Value::Bool(l < r),
        Le => Value::Bool(l <= r),
        Gt => Value::Bool(l > r),
        Ge => Value::Bool(l >= r),
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ConstantOrigin, DeclId, TranslationUnit};
    use crate::transform::test_support::symbols_for;
    use normalize_transpile_report::Mode;

    fn constant(id: u32, name: &str, ty: Option<&str>, init: Expr) -> Declaration {
        Declaration::new(
            DeclId(id),
            name,
            DeclKind::Constant(Constant {
                origin: if ty.is_some() { ConstantOrigin::Constexpr } else { ConstantOrigin::Define },
                ty: ty.map(|t| t.parse().unwrap()),
                init,
            }),
        )
    }

    fn lower_constant(decl: &Declaration, others: Vec<Declaration>) -> (FieldDecl, usize) {
        let symbols = symbols_for(&[TranslationUnit::new("c.cpp", others)]);
        let mut cx = Cx::new(&symbols, Mode::Strict, "c.cpp");
        let DeclKind::Constant(c) = &decl.kind else {
            unreachable!()
        };
        let field = lower(decl, c, &Scope::default(), &mut cx);
        (field, cx.diagnostics().len())
    }

    #[test]
    fn define_with_arithmetic_folds() {
        let decl = constant(
            1,
            "BufferSize",
            None,
            Expr::binary(Expr::int(4), BinaryOp::Mul, Expr::int(1024)),
        );
        let (field, diags) = lower_constant(&decl, vec![]);
        assert_eq!(field.name, "BUFFER_SIZE");
        assert_eq!(field.ty, JavaType::primitive("int"));
        assert!(field.modifiers.is_final && field.modifiers.is_static);
        assert_eq!(field.init, Some(JavaExpr::Literal(JavaLiteral::Int(4096))));
        assert_eq!(diags, 0);
    }

    #[test]
    fn references_to_other_constants_fold() {
        let base = constant(1, "BASE", Some("int"), Expr::int(10));
        let derived = constant(
            2,
            "LIMIT",
            Some("long long"),
            Expr::binary(Expr::ident("BASE"), BinaryOp::Mul, Expr::int(1_000_000_000)),
        );
        let (field, _) = lower_constant(&derived, vec![base]);
        assert_eq!(field.ty, JavaType::primitive("long"));
        assert_eq!(field.init, Some(JavaExpr::Literal(JavaLiteral::Long(10_000_000_000))));
    }

    #[test]
    fn float_constants_are_cast() {
        let decl = constant(1, "RATIO", Some("float"), Expr::float(0.5));
        let (field, _) = lower_constant(&decl, vec![]);
        assert!(matches!(field.init, Some(JavaExpr::Cast { .. })));
    }

    #[test]
    fn runtime_initializer_is_deferred() {
        let decl = constant(
            1,
            "START",
            Some("long"),
            Expr::Call {
                callee: "time".into(),
                args: vec![Expr::Literal { value: Literal::Null }],
            },
        );
        let (field, diags) = lower_constant(&decl, vec![]);
        assert!(!field.modifiers.is_final);
        assert!(field.init.is_none());
        assert!(field.comment.is_some());
        assert_eq!(diags, 1);
    }
}
