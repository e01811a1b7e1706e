//! Function bodies: statements and expressions.
//!
//! Besides the structural mapping this is where stack resources get their
//! scoped release, resolved operator calls become method calls, and content
//! equality on value objects becomes `Objects.equals`.

use super::operator;
use super::resource;
use super::types::{self, map_type};
use super::{Cx, Holder, Scope};
use crate::ir::{BinaryOp, DeclKind, Expr, Literal, OperatorKind, Stmt, TypeRef, UnaryOp};
use crate::names;
use crate::symbols::{Symbol, SymbolTable};
use crate::target::{JavaExpr, JavaLiteral, JavaStmt, JavaType};
use normalize_transpile_report::{ConstructKind, Location};
use std::collections::BTreeMap;

const SMART_POINTERS: &[&str] = &["std::unique_ptr", "std::shared_ptr", "std::weak_ptr"];

/// Lowers the statements of one function.
pub(crate) struct BodyLowering<'x, 'a> {
    cx: &'x mut Cx<'a>,
    scope: &'x Scope,
    location: Location,
    locals: Vec<BTreeMap<String, TypeRef>>,
}

impl<'x, 'a> BodyLowering<'x, 'a> {
    pub fn new(cx: &'x mut Cx<'a>, scope: &'x Scope, location: &Location) -> Self {
        Self {
            cx,
            scope,
            location: location.clone(),
            locals: vec![BTreeMap::new()],
        }
    }

    fn symbols(&self) -> &'a SymbolTable {
        self.cx.symbols
    }

    pub fn declare(&mut self, name: &str, ty: &TypeRef) {
        if let Some(frame) = self.locals.last_mut() {
            frame.insert(name.to_string(), ty.clone());
        }
    }

    fn local_type(&self, name: &str) -> Option<&TypeRef> {
        self.locals.iter().rev().find_map(|frame| frame.get(name))
    }

    fn field_type(&self, name: &str) -> Option<&TypeRef> {
        self.scope.class.as_ref()?.fields.get(name)
    }

    fn map(&self, ty: &TypeRef) -> JavaType {
        map_type(ty, self.scope, self.symbols())
    }

    pub fn block(&mut self, stmts: &[Stmt]) -> Vec<JavaStmt> {
        self.locals.push(BTreeMap::new());
        let out = self.sequence(stmts);
        self.locals.pop();
        out
    }

    /// Statements of one scope; a stack resource wraps everything after it.
    fn sequence(&mut self, stmts: &[Stmt]) -> Vec<JavaStmt> {
        let mut out = Vec::with_capacity(stmts.len());
        for (i, stmt) in stmts.iter().enumerate() {
            if let Stmt::Local { name, ty, .. } = stmt {
                if let Some(class) = self.stack_resource(ty) {
                    out.push(self.stmt(stmt));
                    let rest = &stmts[i + 1..];
                    let scope = self.scope;
                    let is_field =
                        |n: &str| scope.class.as_ref().is_some_and(|c| c.fields.contains_key(n));
                    if resource::escapes(name, rest, &is_field) {
                        self.cx.warn_manual(
                            ConstructKind::Resource,
                            &self.location,
                            format!(
                                "{} escapes its scope; the lifetime of {} must be managed manually",
                                name, class
                            ),
                        );
                        continue;
                    }
                    tracing::debug!(local = %name, class = %class, "scoped resource");
                    let body = self.sequence(rest);
                    out.push(resource::scoped(&names::escape_identifier(name), body));
                    return out;
                }
            }
            out.push(self.stmt(stmt));
        }
        out
    }

    /// Qualified class name if `ty` is a stack object of a resource class.
    fn stack_resource(&self, ty: &TypeRef) -> Option<String> {
        if ty.is_pointer() || ty.is_reference() {
            return None;
        }
        let class = self.class_of(ty)?;
        self.symbols().is_resource(&class).then_some(class)
    }

    fn stmt(&mut self, stmt: &Stmt) -> JavaStmt {
        match stmt {
            Stmt::Local { name, ty, init } => {
                let init = match init {
                    Some(init) => Some(self.expr(init)),
                    None => self.default_init(ty),
                };
                self.declare(name, ty);
                JavaStmt::Local {
                    ty: self.map(ty),
                    name: names::escape_identifier(name),
                    init,
                }
            }
            Stmt::Expr { expr } => JavaStmt::Expr(self.expr(expr)),
            Stmt::Return { value } => JavaStmt::Return(value.as_ref().map(|v| self.expr(v))),
            Stmt::If {
                cond,
                then,
                otherwise,
            } => JavaStmt::If {
                cond: self.condition(cond),
                then: self.block(then),
                otherwise: otherwise.as_ref().map(|o| self.block(o)),
            },
            Stmt::While { cond, body } => JavaStmt::While {
                cond: self.condition(cond),
                body: self.block(body),
            },
            Stmt::For {
                init,
                cond,
                step,
                body,
            } => {
                self.locals.push(BTreeMap::new());
                let init = init.as_ref().map(|s| Box::new(self.stmt(s)));
                let cond = cond.as_ref().map(|c| self.condition(c));
                let step = step.as_ref().map(|s| self.expr(s));
                let body = self.block(body);
                self.locals.pop();
                JavaStmt::For {
                    init,
                    cond,
                    step,
                    body,
                }
            }
            Stmt::Block { body } => JavaStmt::Block(self.block(body)),
            Stmt::Throw { value } => JavaStmt::Throw(self.expr(value)),
            Stmt::Delete { value } => self.delete(value),
            Stmt::Break => JavaStmt::Break,
            Stmt::Continue => JavaStmt::Continue,
        }
    }

    /// `delete p` releases a resource; any other delete is left to the collector.
    fn delete(&mut self, value: &Expr) -> JavaStmt {
        let resource = self
            .static_type(value)
            .and_then(|ty| self.class_of(&ty))
            .is_some_and(|class| self.symbols().is_resource(&class));
        if resource {
            return JavaStmt::expr(JavaExpr::call(self.expr(value), "close", Vec::new()));
        }
        self.cx.info(
            ConstructKind::Resource,
            &self.location,
            "delete removed; memory is reclaimed by the garbage collector",
        );
        JavaStmt::Comment("delete removed".to_string())
    }

    /// Initializer for a local declared without one: value objects are
    /// default-constructed, primitives stay unassigned.
    fn default_init(&self, ty: &TypeRef) -> Option<JavaExpr> {
        if ty.is_pointer() || ty.is_reference() {
            return None;
        }
        if let TypeRef::Array(element, Some(len)) = ty.value_type() {
            return Some(JavaExpr::NewArray {
                element: self.map(element),
                len: Box::new(int_literal(*len as i64)),
            });
        }
        let mapped = self.map(ty);
        let JavaType::Class { package, name, .. } = &mapped else {
            return None;
        };
        if name == "String" {
            return Some(JavaExpr::string(""));
        }
        // Library collections, or classes known to the symbol table
        let constructible = package == "java.util" || self.class_of(ty).is_some();
        constructible.then(|| JavaExpr::New {
            ty: instantiable(mapped.clone()),
            args: Vec::new(),
        })
    }

    /// Branch conditions: pointers test against null, integers against zero.
    pub fn condition(&self, cond: &Expr) -> JavaExpr {
        let lowered = self.expr(cond);
        match self.static_type(cond) {
            Some(ty) if ty.is_pointer() || is_smart_pointer(&ty) => {
                JavaExpr::binary(lowered, "!=", JavaExpr::Literal(JavaLiteral::Null))
            }
            Some(ty) => match ty.value_type() {
                TypeRef::Primitive(p) if !matches!(p.as_str(), "bool" | "float" | "double") => {
                    JavaExpr::binary(lowered, "!=", int_literal(0))
                }
                _ => lowered,
            },
            None => lowered,
        }
    }

    pub fn expr(&self, expr: &Expr) -> JavaExpr {
        match expr {
            Expr::Literal { value } => literal(value),
            Expr::Ident { name } => self.ident(name),
            Expr::This => JavaExpr::This,
            Expr::Member { object, member } => {
                JavaExpr::field(self.expr(object), names::escape_identifier(member))
            }
            Expr::Call { callee, args } => self.call(callee, args),
            Expr::MethodCall {
                receiver,
                method,
                args,
            } => self.method_call(receiver, method, args),
            Expr::Construct { ty, args } => self.construct(ty, args),
            Expr::New { ty, args } => self.heap_new(ty, args),
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::Unary { op, operand } => {
                let operand = self.expr(operand);
                let symbol = match op {
                    UnaryOp::Neg => "-",
                    UnaryOp::Not => "!",
                    UnaryOp::BitNot => "~",
                    UnaryOp::Inc => "++",
                    UnaryOp::Dec => "--",
                    // Pointers and references are erased
                    UnaryOp::Deref | UnaryOp::AddressOf => return operand,
                };
                JavaExpr::Unary {
                    op: symbol.to_string(),
                    operand: Box::new(operand),
                }
            }
            Expr::Assign { target, value } => self.assign(target, value),
            Expr::Index { object, index } => {
                if self.static_type(object).is_some_and(|t| is_library_container(&t)) {
                    return JavaExpr::call(self.expr(object), "get", vec![self.expr(index)]);
                }
                JavaExpr::Index {
                    array: Box::new(self.expr(object)),
                    index: Box::new(self.expr(index)),
                }
            }
            Expr::Cast { ty, value } => JavaExpr::Cast {
                ty: self.map(ty),
                value: Box::new(self.expr(value)),
            },
            Expr::Conditional {
                cond,
                then,
                otherwise,
            } => JavaExpr::Conditional {
                cond: Box::new(self.condition(cond)),
                then: Box::new(self.expr(then)),
                otherwise: Box::new(self.expr(otherwise)),
            },
            Expr::OperatorCall {
                operator,
                receiver,
                args,
            } => self.operator_call(operator, receiver, args),
        }
    }

    fn lower_all(&self, args: &[Expr]) -> Vec<JavaExpr> {
        args.iter().map(|a| self.expr(a)).collect()
    }

    fn ident(&self, name: &str) -> JavaExpr {
        if !name.contains("::") {
            if self.local_type(name).is_some() || self.field_type(name).is_some() {
                return JavaExpr::ident(names::escape_identifier(name));
            }
            if let Some(target) = self
                .scope
                .class
                .as_ref()
                .and_then(|c| c.constants.get(name))
            {
                return JavaExpr::ident(target.clone());
            }
        }

        let symbols = self.symbols();
        if let Some(symbol) = symbols.resolve(name, self.scope.lookup_scope()) {
            match &symbol.decl.kind {
                DeclKind::Constant(_) => {
                    let constant = names::upper_snake(&symbol.decl.name);
                    return static_member(symbol, constant, Holder::Constants, symbols);
                }
                DeclKind::Field(_) => {
                    let field = names::escape_identifier(&symbol.decl.name);
                    return static_member(symbol, field, Holder::Globals, symbols);
                }
                _ => {}
            }
        }

        // `Owner::member`: enumerator or static member
        let owner = names::scope_of(name);
        if !owner.is_empty() {
            if let Some(symbol) = symbols.resolve(owner, self.scope.lookup_scope()) {
                if symbol.is_type() {
                    return JavaExpr::StaticField {
                        class: JavaType::class(&symbol.package, &symbol.target_name),
                        name: names::escape_identifier(names::simple_name(name)),
                    };
                }
            }
        }
        JavaExpr::ident(names::escape_identifier(names::simple_name(name)))
    }

    fn call(&self, callee: &str, args: &[Expr]) -> JavaExpr {
        if matches!(callee, "std::move" | "std::forward") {
            if let Some(first) = args.first() {
                return self.expr(first);
            }
        }
        let lowered = self.lower_all(args);
        let symbols = self.symbols();
        if let Some(symbol) = symbols.resolve(callee, self.scope.lookup_scope()) {
            match &symbol.decl.kind {
                DeclKind::Function(_) => {
                    return JavaExpr::static_call(
                        Holder::Util.java_type(&symbol.package, symbols),
                        names::escape_identifier(&symbol.decl.name),
                        lowered,
                    );
                }
                DeclKind::Template(template)
                    if matches!(template.pattern.kind, DeclKind::Function(_)) =>
                {
                    return JavaExpr::static_call(
                        Holder::Util.java_type(&symbol.package, symbols),
                        names::escape_identifier(&symbol.decl.name),
                        lowered,
                    );
                }
                DeclKind::ClassLike(_) => {
                    return JavaExpr::New {
                        ty: JavaType::class(&symbol.package, &symbol.target_name),
                        args: lowered,
                    };
                }
                _ => {}
            }
        }

        let owner = names::scope_of(callee);
        if !owner.is_empty() {
            if let Some(symbol) = symbols.resolve(owner, self.scope.lookup_scope()) {
                if symbol.is_type() {
                    return JavaExpr::static_call(
                        JavaType::class(&symbol.package, &symbol.target_name),
                        names::escape_identifier(names::simple_name(callee)),
                        lowered,
                    );
                }
            }
        }
        if let Some(math) = math_function(callee) {
            return JavaExpr::static_call(JavaType::simple("Math"), math, lowered);
        }
        JavaExpr::Call {
            target: None,
            name: names::escape_identifier(names::simple_name(callee)),
            args: lowered,
        }
    }

    fn method_call(&self, receiver: &Expr, method: &str, args: &[Expr]) -> JavaExpr {
        let lowered = self.lower_all(args);
        if let Some(ty) = self.static_type(receiver) {
            if let Some((name, _)) = ty.as_named() {
                if let Some(mapped) = library_method(name, self.expr(receiver), method, &lowered) {
                    return mapped;
                }
            }
        }
        let target = match receiver {
            Expr::This => None,
            other => Some(Box::new(self.expr(other))),
        };
        JavaExpr::Call {
            target,
            name: names::escape_identifier(method),
            args: lowered,
        }
    }

    fn construct(&self, ty: &TypeRef, args: &[Expr]) -> JavaExpr {
        let mapped = self.map(ty);
        let mut lowered = self.lower_all(args);
        match mapped {
            JavaType::Primitive(_) => match lowered.pop() {
                Some(value) if args.len() == 1 => JavaExpr::Cast {
                    ty: mapped,
                    value: Box::new(value),
                },
                _ => mapped.default_value(),
            },
            JavaType::Class { ref name, .. } if name == "String" && args.len() <= 1 => {
                lowered.pop().unwrap_or_else(|| JavaExpr::string(""))
            }
            other => JavaExpr::New {
                ty: instantiable(other),
                args: lowered,
            },
        }
    }

    fn heap_new(&self, ty: &TypeRef, args: &[Expr]) -> JavaExpr {
        if let TypeRef::Array(element, len) = ty {
            let len = match (args.first(), len) {
                (Some(first), _) => self.expr(first),
                (None, Some(len)) => int_literal(*len as i64),
                (None, None) => int_literal(0),
            };
            return JavaExpr::NewArray {
                element: self.map(element),
                len: Box::new(len),
            };
        }
        self.construct(ty, args)
    }

    fn binary(&self, op: BinaryOp, left: &Expr, right: &Expr) -> JavaExpr {
        if matches!(op, BinaryOp::Eq | BinaryOp::Ne)
            && !is_null(left)
            && !is_null(right)
            && (self.is_value_object(left) || self.is_value_object(right))
        {
            let equals = JavaExpr::static_call(
                JavaType::class("java.util", "Objects"),
                "equals",
                vec![self.expr(left), self.expr(right)],
            );
            return if op == BinaryOp::Ne {
                JavaExpr::not(equals)
            } else {
                equals
            };
        }
        JavaExpr::binary(self.expr(left), op.symbol(), self.expr(right))
    }

    fn is_value_object(&self, expr: &Expr) -> bool {
        self.static_type(expr)
            .is_some_and(|ty| types::is_value_object(&ty, self.scope, self.symbols()))
    }

    fn assign(&self, target: &Expr, value: &Expr) -> JavaExpr {
        match target {
            Expr::OperatorCall {
                operator,
                receiver,
                args,
            } if OperatorKind::from_name(names::simple_name(operator), args.len())
                == Some(OperatorKind::Index) =>
            {
                let mut lowered = self.lower_all(args);
                lowered.push(self.expr(value));
                JavaExpr::call(self.expr(receiver), "set", lowered)
            }
            Expr::Index { object, index }
                if self.static_type(object).is_some_and(|t| is_library_container(&t)) =>
            {
                let method = if self
                    .static_type(object)
                    .and_then(|t| t.as_named().map(|(n, _)| n.to_string()))
                    .is_some_and(|n| n.contains("map"))
                {
                    "put"
                } else {
                    "set"
                };
                JavaExpr::call(
                    self.expr(object),
                    method,
                    vec![self.expr(index), self.expr(value)],
                )
            }
            _ => JavaExpr::assign(self.expr(target), self.expr(value)),
        }
    }

    fn operator_call(&self, operator: &str, receiver: &Expr, args: &[Expr]) -> JavaExpr {
        let symbols = self.symbols();
        let spelling = names::simple_name(operator);
        let Some(kind) = OperatorKind::from_name(spelling, args.len()) else {
            return JavaExpr::call(
                self.expr(receiver),
                names::escape_identifier(spelling),
                self.lower_all(args),
            );
        };

        // Free operator functions live in the package's utility class
        if let Some(symbol) = symbols.resolve(operator, self.scope.lookup_scope()) {
            if matches!(symbol.decl.kind, DeclKind::Function(_)) {
                let mut lowered = vec![self.expr(receiver)];
                lowered.extend(self.lower_all(args));
                return operator::free_call_site(
                    kind,
                    spelling,
                    Holder::Util.java_type(&symbol.package, symbols),
                    lowered,
                );
            }
        }
        operator::call_site(kind, spelling, self.expr(receiver), self.lower_all(args))
    }

    /// Best-effort static type of an expression.
    pub fn static_type(&self, expr: &Expr) -> Option<TypeRef> {
        let symbols = self.symbols();
        match expr {
            Expr::Ident { name } => self
                .local_type(name)
                .or_else(|| self.field_type(name))
                .cloned()
                .or_else(|| {
                    let symbol = symbols.resolve(name, self.scope.lookup_scope())?;
                    match &symbol.decl.kind {
                        DeclKind::Field(field) => Some(field.ty.clone()),
                        DeclKind::Constant(constant) => constant.ty.clone(),
                        _ => None,
                    }
                }),
            Expr::This => {
                let class = self.scope.class.as_ref()?;
                Some(TypeRef::Pointer(Box::new(TypeRef::named(class.qualified.clone()))))
            }
            Expr::Member { object, member } => {
                if matches!(object.as_ref(), Expr::This) {
                    return self.field_type(member).cloned();
                }
                let class = self.class_of(&self.static_type(object)?)?;
                let decl = symbols.class(&class)?;
                decl.fields()
                    .find(|(d, _)| d.name == *member)
                    .map(|(_, f)| f.ty.clone())
            }
            Expr::MethodCall {
                receiver, method, ..
            } => {
                let class = match receiver.as_ref() {
                    Expr::This => self.scope.class.as_ref()?.qualified.clone(),
                    other => self.class_of(&self.static_type(other)?)?,
                };
                let decl = symbols.class(&class)?;
                decl.methods()
                    .find(|(d, _)| d.name == *method)
                    .map(|(_, f)| f.return_type.clone())
            }
            Expr::OperatorCall {
                operator, receiver, ..
            } => {
                let class = self.class_of(&self.static_type(receiver)?)?;
                let decl = symbols.class(&class)?;
                let spelling = names::simple_name(operator);
                decl.methods()
                    .find(|(d, _)| d.name == spelling)
                    .map(|(_, f)| f.return_type.clone())
            }
            Expr::Call { callee, .. } => {
                let symbol = symbols.resolve(callee, self.scope.lookup_scope())?;
                match &symbol.decl.kind {
                    DeclKind::Function(f) => Some(f.return_type.clone()),
                    DeclKind::ClassLike(_) => Some(TypeRef::named(symbol.decl.qualified_name.clone())),
                    _ => None,
                }
            }
            Expr::Construct { ty, .. } | Expr::Cast { ty, .. } => Some(ty.clone()),
            Expr::New { ty, .. } => Some(TypeRef::Pointer(Box::new(ty.clone()))),
            Expr::Index { object, .. } => match self.static_type(object)?.value_type() {
                TypeRef::Pointer(inner) | TypeRef::Array(inner, _) => Some(inner.as_ref().clone()),
                TypeRef::Named { args, .. } => args.last().cloned(),
                _ => None,
            },
            Expr::Binary { op, left, .. } => {
                if op.is_arithmetic() || matches!(op, BinaryOp::BitAnd | BinaryOp::BitOr | BinaryOp::BitXor | BinaryOp::Shl | BinaryOp::Shr) {
                    self.static_type(left)
                } else {
                    Some(TypeRef::primitive("bool"))
                }
            }
            Expr::Unary { op, operand } => match op {
                UnaryOp::Not => Some(TypeRef::primitive("bool")),
                UnaryOp::Deref => match self.static_type(operand)?.value_type() {
                    TypeRef::Pointer(inner) => Some(inner.as_ref().clone()),
                    _ => None,
                },
                UnaryOp::AddressOf => Some(TypeRef::Pointer(Box::new(self.static_type(operand)?))),
                _ => self.static_type(operand),
            },
            Expr::Assign { target, .. } => self.static_type(target),
            Expr::Conditional { then, .. } => self.static_type(then),
            Expr::Literal { value } => match value {
                Literal::Bool(_) => Some(TypeRef::primitive("bool")),
                Literal::Int(_) => Some(TypeRef::primitive("int")),
                Literal::Float(_) => Some(TypeRef::primitive("double")),
                Literal::Null | Literal::String(_) => None,
            },
        }
    }

    /// Qualified name of the class behind a value, pointer or smart pointer type.
    fn class_of(&self, ty: &TypeRef) -> Option<String> {
        let inner = match ty.value_type() {
            TypeRef::Pointer(inner) => inner.value_type(),
            other => other,
        };
        let (name, args) = inner.as_named()?;
        if SMART_POINTERS.contains(&name) {
            return self.class_of(args.first()?);
        }
        if self.scope.is_type_param(name) {
            return None;
        }
        let symbol = self.symbols().resolve(name, self.scope.lookup_scope())?;
        matches!(symbol.decl.kind, DeclKind::ClassLike(_) | DeclKind::Template(_))
            .then(|| symbol.decl.qualified_name.clone())
    }
}

fn static_member(symbol: &Symbol, member: String, holder: Holder, symbols: &SymbolTable) -> JavaExpr {
    // Class members are registered as `Owner.member`
    let class = match symbol.target_name.rsplit_once('.') {
        Some((owner, _)) => JavaType::class(&symbol.package, owner),
        None => holder.java_type(&symbol.package, symbols),
    };
    JavaExpr::StaticField {
        class,
        name: member,
    }
}

pub(crate) fn literal(value: &Literal) -> JavaExpr {
    JavaExpr::Literal(match value {
        Literal::Null => JavaLiteral::Null,
        Literal::Bool(b) => JavaLiteral::Bool(*b),
        Literal::Int(i) if i32::try_from(*i).is_err() => JavaLiteral::Long(*i),
        Literal::Int(i) => JavaLiteral::Int(*i),
        Literal::Float(f) => JavaLiteral::Float(*f),
        Literal::String(s) => JavaLiteral::String(s.clone()),
    })
}

fn int_literal(value: i64) -> JavaExpr {
    JavaExpr::Literal(JavaLiteral::Int(value))
}

fn is_null(expr: &Expr) -> bool {
    matches!(
        expr,
        Expr::Literal {
            value: Literal::Null
        }
    ) || expr.as_ident() == Some("nullptr")
        || expr.as_ident() == Some("NULL")
}

fn is_smart_pointer(ty: &TypeRef) -> bool {
    ty.as_named().is_some_and(|(name, _)| SMART_POINTERS.contains(&name))
}

fn is_library_container(ty: &TypeRef) -> bool {
    ty.as_named().is_some_and(|(name, _)| {
        matches!(
            name,
            "std::vector" | "std::deque" | "std::map" | "std::unordered_map"
        )
    })
}

/// Concrete class for instantiating a collection interface.
fn instantiable(ty: JavaType) -> JavaType {
    match ty {
        JavaType::Class {
            package,
            name,
            args,
        } if package == "java.util" => {
            let concrete = match name.as_str() {
                "List" => "ArrayList",
                "Map" => "HashMap",
                "Set" => "HashSet",
                other => other,
            };
            JavaType::class("java.util", concrete).with_args(args)
        }
        other => other,
    }
}

fn math_function(callee: &str) -> Option<&'static str> {
    let name = callee.strip_prefix("std::").unwrap_or(callee);
    Some(match name {
        "max" | "fmax" => "max",
        "min" | "fmin" => "min",
        "abs" | "fabs" | "labs" => "abs",
        "sqrt" => "sqrt",
        "pow" => "pow",
        "floor" => "floor",
        "ceil" => "ceil",
        "round" => "round",
        "sin" => "sin",
        "cos" => "cos",
        "tan" => "tan",
        "exp" => "exp",
        "log" => "log",
        _ => return None,
    })
}

/// Standard container and string methods with a differently named counterpart.
fn library_method(
    class: &str,
    receiver: JavaExpr,
    method: &str,
    args: &[JavaExpr],
) -> Option<JavaExpr> {
    let call = |name: &str, args: Vec<JavaExpr>| Some(JavaExpr::call(receiver.clone(), name, args));
    match class {
        "std::string" | "std::wstring" => match method {
            "size" | "length" => call("length", Vec::new()),
            "empty" => call("isEmpty", Vec::new()),
            "c_str" | "data" => Some(receiver.clone()),
            "at" => call("charAt", args.to_vec()),
            "substr" => match args {
                [start, len] => call(
                    "substring",
                    vec![
                        start.clone(),
                        JavaExpr::binary(start.clone(), "+", len.clone()),
                    ],
                ),
                _ => call("substring", args.to_vec()),
            },
            "find" => call("indexOf", args.to_vec()),
            _ => None,
        },
        "std::vector" | "std::list" | "std::deque" => match method {
            "push_back" | "emplace_back" => call("add", args.to_vec()),
            "empty" => call("isEmpty", Vec::new()),
            "at" => call("get", args.to_vec()),
            "front" => call("get", vec![int_literal(0)]),
            _ => None,
        },
        "std::map" | "std::unordered_map" => match method {
            "count" | "contains" => call("containsKey", args.to_vec()),
            "at" => call("get", args.to_vec()),
            "empty" => call("isEmpty", Vec::new()),
            "erase" => call("remove", args.to_vec()),
            _ => None,
        },
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{ClassLike, DeclId, Declaration, Function, FunctionRole, TranslationUnit};
    use crate::transform::ClassScope;
    use crate::transform::test_support::symbols_for;
    use normalize_transpile_report::Mode;

    fn file_class() -> Declaration {
        let dtor = Declaration::new(
            DeclId(2),
            "~File",
            DeclKind::Function(Function::new(FunctionRole::Destructor, TypeRef::Void, vec![])),
        );
        Declaration::new(DeclId(1), "File", DeclKind::ClassLike(ClassLike::default()))
            .with_children(vec![dtor])
    }

    fn file_ty() -> TypeRef {
        TypeRef::named("File")
    }

    fn lower(stmts: &[Stmt]) -> (Vec<JavaStmt>, usize) {
        let symbols = symbols_for(&[TranslationUnit::new("io.cpp", vec![file_class()])]);
        let mut cx = Cx::new(&symbols, Mode::Flexible, "io.cpp");
        let scope = Scope::default();
        let out = BodyLowering::new(&mut cx, &scope, &Location::new("io.cpp", 1)).block(stmts);
        let warnings = cx.diagnostics().len();
        (out, warnings)
    }

    fn count_close(stmts: &[JavaStmt]) -> usize {
        stmts
            .iter()
            .map(|s| match s {
                JavaStmt::Expr(JavaExpr::Call { name, .. }) if name == "close" => 1,
                JavaStmt::TryFinally { body, finally } => count_close(body) + count_close(finally),
                JavaStmt::If {
                    then, otherwise, ..
                } => count_close(then) + otherwise.as_deref().map_or(0, count_close),
                JavaStmt::Block(body) => count_close(body),
                _ => 0,
            })
            .sum()
    }

    #[test]
    fn stack_resource_is_released_on_every_exit() {
        let stmts = vec![
            Stmt::local("f", file_ty(), Some(Expr::construct(file_ty(), vec![Expr::string("a.txt")]))),
            Stmt::if_stmt(
                Expr::method_call(Expr::ident("f"), "bad", vec![]),
                vec![Stmt::ret(Some(Expr::int(-1)))],
                None,
            ),
            Stmt::ret(Some(Expr::int(0))),
        ];
        let (out, diagnostics) = lower(&stmts);
        assert_eq!(diagnostics, 0);
        assert_eq!(out.len(), 2);
        let JavaStmt::TryFinally { body, finally } = &out[1] else {
            panic!("expected scoped block, got {:?}", out[1]);
        };
        // Both the early return and the fall-through return are inside the try
        assert!(matches!(body[0], JavaStmt::If { .. }));
        assert!(matches!(body[1], JavaStmt::Return(Some(_))));
        assert_eq!(count_close(finally), 1);
    }

    #[test]
    fn escaping_resource_is_not_released() {
        let stmts = vec![
            Stmt::local("f", file_ty(), None),
            Stmt::ret(Some(Expr::ident("f"))),
        ];
        let (out, diagnostics) = lower(&stmts);
        assert_eq!(diagnostics, 1);
        assert_eq!(count_close(&out), 0);
        assert!(!out.iter().any(|s| matches!(s, JavaStmt::TryFinally { .. })));
        // Default construction is explicit
        let JavaStmt::Local { init: Some(JavaExpr::New { .. }), .. } = &out[0] else {
            panic!("expected default construction");
        };
    }

    #[test]
    fn value_equality_uses_objects_equals() {
        let symbols = symbols_for(&[]);
        let mut cx = Cx::new(&symbols, Mode::Flexible, "a.cpp");
        let scope = Scope::default();
        let mut body = BodyLowering::new(&mut cx, &scope, &Location::default());
        body.declare("a", &TypeRef::named("std::string"));
        body.declare("n", &TypeRef::primitive("int"));
        let eq = body.expr(&Expr::binary(Expr::ident("a"), BinaryOp::Ne, Expr::string("x")));
        let JavaExpr::Unary { op, operand } = eq else {
            panic!("expected negation");
        };
        assert_eq!(op, "!");
        assert!(matches!(*operand, JavaExpr::StaticCall { ref name, .. } if name == "equals"));

        let plain = body.expr(&Expr::binary(Expr::ident("n"), BinaryOp::Eq, Expr::int(1)));
        assert!(matches!(plain, JavaExpr::Binary { ref op, .. } if op == "=="));
    }

    #[test]
    fn resolved_operator_calls_become_methods() {
        let symbols = symbols_for(&[]);
        let mut cx = Cx::new(&symbols, Mode::Flexible, "a.cpp");
        let scope = Scope::default();
        let body = BodyLowering::new(&mut cx, &scope, &Location::default());

        let sum = body.expr(&Expr::operator_call("operator+", Expr::ident("a"), vec![Expr::ident("b")]));
        assert!(matches!(sum, JavaExpr::Call { ref name, .. } if name == "plus"));

        let store = body.expr(&Expr::assign(
            Expr::operator_call("operator[]", Expr::ident("v"), vec![Expr::ident("i")]),
            Expr::ident("x"),
        ));
        let JavaExpr::Call { name, args, .. } = store else {
            panic!("expected set call");
        };
        assert_eq!(name, "set");
        assert_eq!(args.len(), 2);

        let valid = body.expr(&Expr::operator_call("operator bool", Expr::ident("h"), vec![]));
        assert!(matches!(valid, JavaExpr::Call { ref name, .. } if name == "isValid"));
    }

    #[test]
    fn pointer_conditions_compare_with_null() {
        let symbols = symbols_for(&[]);
        let mut cx = Cx::new(&symbols, Mode::Flexible, "a.cpp");
        let scope = Scope {
            class: Some(ClassScope {
                qualified: "Node".into(),
                fields: BTreeMap::from([("next".to_string(), "Node*".parse().unwrap())]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let body = BodyLowering::new(&mut cx, &scope, &Location::default());
        let cond = body.condition(&Expr::ident("next"));
        assert!(matches!(cond, JavaExpr::Binary { ref op, .. } if op == "!="));
    }

    #[test]
    fn delete_of_plain_pointer_is_removed() {
        let stmts = vec![
            Stmt::local("p", "int*".parse().unwrap(), Some(Expr::New { ty: TypeRef::primitive("int"), args: vec![] })),
            Stmt::Delete { value: Expr::ident("p") },
        ];
        let (out, diagnostics) = lower(&stmts);
        assert_eq!(diagnostics, 1);
        assert!(matches!(out[1], JavaStmt::Comment(_)));
    }
}
