//! Function bodies: statements and expressions.
//!
//! Bodies arrive from the front end already resolved: member calls carry an
//! explicit receiver, overloaded-operator invocations are `OperatorCall`
//! nodes, and constructions name their class.

use super::TypeRef;
use serde::{Deserialize, Serialize};

/// A literal value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

/// Binary operators on builtin types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    #[serde(rename = "+")]
    Add,
    #[serde(rename = "-")]
    Sub,
    #[serde(rename = "*")]
    Mul,
    #[serde(rename = "/")]
    Div,
    #[serde(rename = "%")]
    Mod,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    Ne,
    #[serde(rename = "<")]
    Lt,
    #[serde(rename = "<=")]
    Le,
    #[serde(rename = ">")]
    Gt,
    #[serde(rename = ">=")]
    Ge,
    #[serde(rename = "&&")]
    And,
    #[serde(rename = "||")]
    Or,
    #[serde(rename = "&")]
    BitAnd,
    #[serde(rename = "|")]
    BitOr,
    #[serde(rename = "^")]
    BitXor,
    #[serde(rename = "<<")]
    Shl,
    #[serde(rename = ">>")]
    Shr,
}

impl BinaryOp {
    pub fn is_arithmetic(&self) -> bool {
        matches!(
            self,
            BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Mod
        )
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Mod => "%",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
            BinaryOp::And => "&&",
            BinaryOp::Or => "||",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
        }
    }
}

/// Unary operators on builtin types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    #[serde(rename = "-")]
    Neg,
    #[serde(rename = "!")]
    Not,
    #[serde(rename = "~")]
    BitNot,
    #[serde(rename = "*")]
    Deref,
    #[serde(rename = "&")]
    AddressOf,
    #[serde(rename = "++")]
    Inc,
    #[serde(rename = "--")]
    Dec,
}

/// An expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Literal {
        value: Literal,
    },
    Ident {
        name: String,
    },
    This,
    /// `object.member` or `object->member`
    Member {
        object: Box<Expr>,
        member: String,
    },
    /// Call of a free or static function by qualified name
    Call {
        callee: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    MethodCall {
        receiver: Box<Expr>,
        method: String,
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// Value construction `T(args)`
    Construct {
        ty: TypeRef,
        #[serde(default)]
        args: Vec<Expr>,
    },
    /// Heap construction `new T(args)`
    New {
        ty: TypeRef,
        #[serde(default)]
        args: Vec<Expr>,
    },
    Binary {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Expr>,
    },
    Assign {
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Index {
        object: Box<Expr>,
        index: Box<Expr>,
    },
    Cast {
        ty: TypeRef,
        value: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
    /// Invocation of a user-defined operator, resolved by the front end
    OperatorCall {
        operator: String,
        receiver: Box<Expr>,
        #[serde(default)]
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn ident(name: impl Into<String>) -> Self {
        Expr::Ident { name: name.into() }
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal {
            value: Literal::Int(value),
        }
    }

    pub fn float(value: f64) -> Self {
        Expr::Literal {
            value: Literal::Float(value),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        Expr::Literal {
            value: Literal::String(value.into()),
        }
    }

    pub fn member(object: Expr, member: impl Into<String>) -> Self {
        Expr::Member {
            object: Box::new(object),
            member: member.into(),
        }
    }

    pub fn binary(left: Expr, op: BinaryOp, right: Expr) -> Self {
        Expr::Binary {
            op,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn assign(target: Expr, value: Expr) -> Self {
        Expr::Assign {
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    pub fn method_call(receiver: Expr, method: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::MethodCall {
            receiver: Box::new(receiver),
            method: method.into(),
            args,
        }
    }

    pub fn construct(ty: TypeRef, args: Vec<Expr>) -> Self {
        Expr::Construct { ty, args }
    }

    pub fn operator_call(operator: impl Into<String>, receiver: Expr, args: Vec<Expr>) -> Self {
        Expr::OperatorCall {
            operator: operator.into(),
            receiver: Box::new(receiver),
            args,
        }
    }

    /// Name of the identifier, if this is a bare identifier.
    pub fn as_ident(&self) -> Option<&str> {
        match self {
            Expr::Ident { name } => Some(name),
            _ => None,
        }
    }

    /// Visit this expression and every subexpression, parents first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Literal { .. } | Expr::Ident { .. } | Expr::This => {}
            Expr::Member { object, .. } => object.walk(f),
            Expr::Call { args, .. } | Expr::Construct { args, .. } | Expr::New { args, .. } => {
                args.iter().for_each(|a| a.walk(f))
            }
            Expr::MethodCall { receiver, args, .. } | Expr::OperatorCall { receiver, args, .. } => {
                receiver.walk(f);
                args.iter().for_each(|a| a.walk(f));
            }
            Expr::Binary { left, right, .. } => {
                left.walk(f);
                right.walk(f);
            }
            Expr::Unary { operand, .. } => operand.walk(f),
            Expr::Assign { target, value } => {
                target.walk(f);
                value.walk(f);
            }
            Expr::Index { object, index } => {
                object.walk(f);
                index.walk(f);
            }
            Expr::Cast { value, .. } => value.walk(f),
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                cond.walk(f);
                then.walk(f);
                otherwise.walk(f);
            }
        }
    }
}

/// A statement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stmt {
    /// Local variable; a class-typed local with an initializer is a stack object
    Local {
        name: String,
        ty: TypeRef,
        #[serde(default)]
        init: Option<Expr>,
    },
    Expr {
        expr: Expr,
    },
    Return {
        #[serde(default)]
        value: Option<Expr>,
    },
    If {
        cond: Expr,
        then: Vec<Stmt>,
        #[serde(default)]
        otherwise: Option<Vec<Stmt>>,
    },
    While {
        cond: Expr,
        body: Vec<Stmt>,
    },
    For {
        #[serde(default)]
        init: Option<Box<Stmt>>,
        #[serde(default)]
        cond: Option<Expr>,
        #[serde(default)]
        step: Option<Expr>,
        body: Vec<Stmt>,
    },
    Block {
        body: Vec<Stmt>,
    },
    Throw {
        value: Expr,
    },
    Delete {
        value: Expr,
    },
    Break,
    Continue,
}

impl Stmt {
    pub fn local(name: impl Into<String>, ty: TypeRef, init: Option<Expr>) -> Self {
        Stmt::Local {
            name: name.into(),
            ty,
            init,
        }
    }

    pub fn expr(expr: Expr) -> Self {
        Stmt::Expr { expr }
    }

    pub fn ret(value: Option<Expr>) -> Self {
        Stmt::Return { value }
    }

    pub fn if_stmt(cond: Expr, then: Vec<Stmt>, otherwise: Option<Vec<Stmt>>) -> Self {
        Stmt::If {
            cond,
            then,
            otherwise,
        }
    }

    /// Visit every expression in this statement, recursing into nested statements.
    pub fn walk_exprs<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        match self {
            Stmt::Local { init, .. } => {
                if let Some(init) = init {
                    init.walk(f);
                }
            }
            Stmt::Expr { expr } => expr.walk(f),
            Stmt::Return { value } => {
                if let Some(value) = value {
                    value.walk(f);
                }
            }
            Stmt::If {
                cond,
                then,
                otherwise,
            } => {
                cond.walk(f);
                then.iter().for_each(|s| s.walk_exprs(f));
                if let Some(otherwise) = otherwise {
                    otherwise.iter().for_each(|s| s.walk_exprs(f));
                }
            }
            Stmt::While { cond, body } => {
                cond.walk(f);
                body.iter().for_each(|s| s.walk_exprs(f));
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                if let Some(init) = init {
                    init.walk_exprs(f);
                }
                if let Some(cond) = cond {
                    cond.walk(f);
                }
                if let Some(step) = step {
                    step.walk(f);
                }
                body.iter().for_each(|s| s.walk_exprs(f));
            }
            Stmt::Block { body } => body.iter().for_each(|s| s.walk_exprs(f)),
            Stmt::Throw { value } | Stmt::Delete { value } => value.walk(f),
            Stmt::Break | Stmt::Continue => {}
        }
    }

    /// Visit every local declaration in this statement, including nested ones.
    pub fn walk_locals<'a>(&'a self, f: &mut impl FnMut(&'a str, &'a TypeRef)) {
        match self {
            Stmt::Local { name, ty, .. } => f(name.as_str(), ty),
            Stmt::If {
                then, otherwise, ..
            } => {
                then.iter().for_each(|s| s.walk_locals(f));
                if let Some(otherwise) = otherwise {
                    otherwise.iter().for_each(|s| s.walk_locals(f));
                }
            }
            Stmt::While { body, .. } | Stmt::Block { body } => {
                body.iter().for_each(|s| s.walk_locals(f))
            }
            Stmt::For { init, body, .. } => {
                if let Some(init) = init {
                    init.walk_locals(f);
                }
                body.iter().for_each(|s| s.walk_locals(f));
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_operator_symbols() {
        let json = r#"{"kind":"binary","op":"+","left":{"kind":"ident","name":"x"},"right":{"kind":"literal","value":1}}"#;
        let expr: Expr = serde_json::from_str(json).unwrap();
        assert_eq!(expr, Expr::binary(Expr::ident("x"), BinaryOp::Add, Expr::int(1)));
    }

    #[test]
    fn literal_variants() {
        let parse = |s: &str| serde_json::from_str::<Literal>(s).unwrap();
        assert_eq!(parse("null"), Literal::Null);
        assert_eq!(parse("true"), Literal::Bool(true));
        assert_eq!(parse("3"), Literal::Int(3));
        assert_eq!(parse("2.5"), Literal::Float(2.5));
        assert_eq!(parse("\"hi\""), Literal::String("hi".into()));
    }

    #[test]
    fn local_parses_type_spelling() {
        let json = r#"{"kind":"local","name":"f","ty":"const File&"}"#;
        let stmt: Stmt = serde_json::from_str(json).unwrap();
        let Stmt::Local { ty, init, .. } = stmt else {
            panic!("expected local");
        };
        assert!(ty.is_reference());
        assert!(init.is_none());
    }

    #[test]
    fn walk_visits_nested_expressions() {
        let stmt = Stmt::if_stmt(
            Expr::ident("ok"),
            vec![Stmt::ret(Some(Expr::method_call(Expr::This, "get", vec![Expr::ident("i")])))],
            None,
        );
        let mut idents = Vec::new();
        stmt.walk_exprs(&mut |e| {
            if let Some(name) = e.as_ident() {
                idents.push(name);
            }
        });
        assert_eq!(idents, ["ok", "i"]);
    }
}
