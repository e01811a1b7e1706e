//! Scoped resources: destructor-bearing objects on the stack.
//!
//! A stack object whose class declares a destructor is released on every exit
//! from its scope. The body lowering wraps the rest of the scope after its
//! declaration in `try { ... } finally { x.close(); }`, unless the object
//! escapes the scope.

use crate::ir::{Expr, Stmt, UnaryOp};
use crate::target::{JavaExpr, JavaStmt};

/// Container methods that store their argument.
const STORING_METHODS: &[&str] = &[
    "push_back",
    "emplace_back",
    "push_front",
    "emplace_front",
    "insert",
    "emplace",
    "add",
    "push",
];

/// Release call for a scoped resource.
pub(crate) fn release(name: &str) -> JavaStmt {
    JavaStmt::expr(JavaExpr::call(JavaExpr::ident(name), "close", Vec::new()))
}

/// Wrap the statements following a resource declaration.
pub(crate) fn scoped(name: &str, body: Vec<JavaStmt>) -> JavaStmt {
    JavaStmt::TryFinally {
        body,
        finally: vec![release(name)],
    }
}

/// True if the local `name` outlives the statements `rest`: returned, moved
/// out, or stored into a field or container.
pub(crate) fn escapes(name: &str, rest: &[Stmt], is_field: &dyn Fn(&str) -> bool) -> bool {
    rest.iter().any(|stmt| stmt_escapes(name, stmt, is_field))
}

fn stmt_escapes(name: &str, stmt: &Stmt, is_field: &dyn Fn(&str) -> bool) -> bool {
    if let Stmt::Return { value: Some(value) } = stmt {
        if names_local(value, name) {
            return true;
        }
    }
    let nested = match stmt {
        Stmt::If {
            then, otherwise, ..
        } => {
            escapes(name, then, is_field)
                || otherwise
                    .as_deref()
                    .is_some_and(|o| escapes(name, o, is_field))
        }
        Stmt::While { body, .. } | Stmt::Block { body } | Stmt::For { body, .. } => {
            escapes(name, body, is_field)
        }
        _ => false,
    };
    if nested {
        return true;
    }

    let mut stored = false;
    // Only this statement's own expressions; nested statements were handled above
    let own_exprs: Vec<&Expr> = match stmt {
        Stmt::Expr { expr } => vec![expr],
        Stmt::Local { init: Some(init), .. } => vec![init],
        Stmt::Return { value: Some(value) } => vec![value],
        Stmt::Throw { value } => vec![value],
        _ => Vec::new(),
    };
    for expr in own_exprs {
        expr.walk(&mut |e| match e {
            Expr::Assign { target, value } if names_local(value, name) => {
                let into_field = match target.as_ref() {
                    Expr::Member { .. } | Expr::Index { .. } => true,
                    Expr::Ident { name: target } => is_field(target),
                    _ => false,
                };
                stored |= into_field;
            }
            Expr::MethodCall { method, args, .. }
                if STORING_METHODS.contains(&method.as_str())
                    && args.iter().any(|a| names_local(a, name)) =>
            {
                stored = true;
            }
            _ => {}
        });
    }
    stored
}

/// `x`, `std::move(x)` or `&x`.
fn names_local(expr: &Expr, name: &str) -> bool {
    match expr {
        Expr::Ident { name: n } => n == name,
        Expr::Call { callee, args } if callee == "std::move" || callee == "move" => {
            args.first().is_some_and(|a| names_local(a, name))
        }
        Expr::Unary {
            op: UnaryOp::AddressOf,
            operand,
        } => names_local(operand, name),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn no_fields(_: &str) -> bool {
        false
    }

    #[test]
    fn returning_the_object_escapes() {
        let rest = vec![Stmt::ret(Some(Expr::ident("f")))];
        assert!(escapes("f", &rest, &no_fields));
        let moved = vec![Stmt::ret(Some(Expr::Call {
            callee: "std::move".into(),
            args: vec![Expr::ident("f")],
        }))];
        assert!(escapes("f", &moved, &no_fields));
    }

    #[test]
    fn returning_something_else_does_not_escape() {
        let rest = vec![
            Stmt::if_stmt(
                Expr::ident("bad"),
                vec![Stmt::ret(Some(Expr::int(-1)))],
                None,
            ),
            Stmt::ret(Some(Expr::method_call(Expr::ident("f"), "size", vec![]))),
        ];
        assert!(!escapes("f", &rest, &no_fields));
    }

    #[test]
    fn storing_into_a_field_escapes() {
        let rest = vec![Stmt::expr(Expr::assign(
            Expr::member(Expr::This, "file"),
            Expr::ident("f"),
        ))];
        assert!(escapes("f", &rest, &no_fields));

        let bare = vec![Stmt::expr(Expr::assign(Expr::ident("file"), Expr::ident("f")))];
        assert!(escapes("f", &bare, &|n| n == "file"));
        assert!(!escapes("f", &bare, &no_fields));
    }

    #[test]
    fn nested_return_escapes() {
        let rest = vec![Stmt::While {
            cond: Expr::ident("more"),
            body: vec![Stmt::ret(Some(Expr::ident("f")))],
        }];
        assert!(escapes("f", &rest, &no_fields));
    }

    #[test]
    fn pushing_into_a_container_escapes() {
        let rest = vec![Stmt::expr(Expr::method_call(
            Expr::ident("files"),
            "push_back",
            vec![Expr::ident("f")],
        ))];
        assert!(escapes("f", &rest, &no_fields));
    }
}
