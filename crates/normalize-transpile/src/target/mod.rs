//! Target IR: declarations already shaped for the managed target language.
//!
//! Names are fully resolved: class types carry their package, so the writer
//! only has to print simple names and the import list.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Packages that never need an import.
const IMPLICIT_PACKAGES: &[&str] = &["", "java.lang"];

/// A target type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JavaType {
    Void,
    Primitive(String),
    /// Class, interface, enum or type variable; `name` may be dotted for nested types
    Class {
        package: String,
        name: String,
        args: Vec<JavaType>,
    },
    Array(Box<JavaType>),
}

impl JavaType {
    pub fn primitive(name: &str) -> Self {
        JavaType::Primitive(name.to_string())
    }

    pub fn class(package: &str, name: &str) -> Self {
        JavaType::Class {
            package: package.to_string(),
            name: name.to_string(),
            args: Vec::new(),
        }
    }

    /// Type variable or `java.lang` class.
    pub fn simple(name: &str) -> Self {
        Self::class("", name)
    }

    pub fn string() -> Self {
        Self::simple("String")
    }

    pub fn object() -> Self {
        Self::simple("Object")
    }

    pub fn with_args(mut self, new_args: Vec<JavaType>) -> Self {
        if let JavaType::Class { args, .. } = &mut self {
            *args = new_args;
        }
        self
    }

    pub fn is_primitive(&self) -> bool {
        matches!(self, JavaType::Primitive(_))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, JavaType::Void)
    }

    /// Wrapper class for primitives; other types are returned unchanged.
    pub fn boxed(self) -> Self {
        match &self {
            JavaType::Primitive(name) => {
                let wrapper = match name.as_str() {
                    "int" => "Integer",
                    "long" => "Long",
                    "short" => "Short",
                    "byte" => "Byte",
                    "char" => "Character",
                    "boolean" => "Boolean",
                    "float" => "Float",
                    "double" => "Double",
                    _ => return self,
                };
                JavaType::simple(wrapper)
            }
            _ => self,
        }
    }

    /// Simple spelling as it appears in source, imports assumed.
    pub fn spelling(&self) -> String {
        match self {
            JavaType::Void => "void".to_string(),
            JavaType::Primitive(name) => name.clone(),
            JavaType::Class { name, args, .. } => {
                if args.is_empty() {
                    name.clone()
                } else {
                    let args: Vec<String> = args.iter().map(JavaType::spelling).collect();
                    format!("{}<{}>", name, args.join(", "))
                }
            }
            JavaType::Array(inner) => format!("{}[]", inner.spelling()),
        }
    }

    /// Default value of an uninitialized field of this type.
    pub fn default_value(&self) -> JavaExpr {
        match self {
            JavaType::Primitive(name) => match name.as_str() {
                "boolean" => JavaExpr::Literal(JavaLiteral::Bool(false)),
                "float" | "double" => JavaExpr::Literal(JavaLiteral::Float(0.0)),
                "char" => JavaExpr::Literal(JavaLiteral::Char('\0')),
                _ => JavaExpr::Literal(JavaLiteral::Int(0)),
            },
            _ => JavaExpr::Literal(JavaLiteral::Null),
        }
    }

    fn collect_imports(&self, imports: &mut BTreeSet<String>) {
        match self {
            JavaType::Void | JavaType::Primitive(_) => {}
            JavaType::Class {
                package,
                name,
                args,
            } => {
                if !IMPLICIT_PACKAGES.contains(&package.as_str()) {
                    let outer = name.split('.').next().unwrap_or(name);
                    imports.insert(format!("{}.{}", package, outer));
                }
                for arg in args {
                    arg.collect_imports(imports);
                }
            }
            JavaType::Array(inner) => inner.collect_imports(imports),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    /// No modifier
    Package,
    Private,
}

impl Visibility {
    pub fn keyword(&self) -> Option<&'static str> {
        match self {
            Visibility::Public => Some("public"),
            Visibility::Protected => Some("protected"),
            Visibility::Package => None,
            Visibility::Private => Some("private"),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub visibility: Visibility,
    pub is_static: bool,
    pub is_final: bool,
    pub is_abstract: bool,
}

impl Modifiers {
    pub fn public() -> Self {
        Self::default()
    }

    pub fn private() -> Self {
        Self {
            visibility: Visibility::Private,
            ..Self::default()
        }
    }

    pub fn public_static() -> Self {
        Self {
            is_static: true,
            ..Self::default()
        }
    }

    pub fn constant() -> Self {
        Self {
            is_static: true,
            is_final: true,
            ..Self::default()
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JavaLiteral {
    Null,
    Bool(bool),
    Int(i64),
    /// Integer literal needing an `L` suffix
    Long(i64),
    Float(f64),
    Char(char),
    String(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JavaExpr {
    Literal(JavaLiteral),
    Ident(String),
    This,
    Super,
    Field {
        object: Box<JavaExpr>,
        name: String,
    },
    /// Static member of a class (`Constants.MAX_SIZE`)
    StaticField {
        class: JavaType,
        name: String,
    },
    Call {
        target: Option<Box<JavaExpr>>,
        name: String,
        args: Vec<JavaExpr>,
    },
    StaticCall {
        class: JavaType,
        name: String,
        args: Vec<JavaExpr>,
    },
    New {
        ty: JavaType,
        args: Vec<JavaExpr>,
    },
    NewArray {
        element: JavaType,
        len: Box<JavaExpr>,
    },
    Binary {
        op: String,
        left: Box<JavaExpr>,
        right: Box<JavaExpr>,
    },
    Unary {
        op: String,
        operand: Box<JavaExpr>,
    },
    Assign {
        target: Box<JavaExpr>,
        value: Box<JavaExpr>,
    },
    Index {
        array: Box<JavaExpr>,
        index: Box<JavaExpr>,
    },
    Cast {
        ty: JavaType,
        value: Box<JavaExpr>,
    },
    InstanceOf {
        value: Box<JavaExpr>,
        ty: JavaType,
    },
    Conditional {
        cond: Box<JavaExpr>,
        then: Box<JavaExpr>,
        otherwise: Box<JavaExpr>,
    },
}

impl JavaExpr {
    pub fn ident(name: impl Into<String>) -> Self {
        JavaExpr::Ident(name.into())
    }

    pub fn string(value: impl Into<String>) -> Self {
        JavaExpr::Literal(JavaLiteral::String(value.into()))
    }

    pub fn bool(value: bool) -> Self {
        JavaExpr::Literal(JavaLiteral::Bool(value))
    }

    pub fn field(object: JavaExpr, name: impl Into<String>) -> Self {
        JavaExpr::Field {
            object: Box::new(object),
            name: name.into(),
        }
    }

    pub fn this_field(name: impl Into<String>) -> Self {
        Self::field(JavaExpr::This, name)
    }

    pub fn call(target: JavaExpr, name: impl Into<String>, args: Vec<JavaExpr>) -> Self {
        JavaExpr::Call {
            target: Some(Box::new(target)),
            name: name.into(),
            args,
        }
    }

    pub fn static_call(class: JavaType, name: impl Into<String>, args: Vec<JavaExpr>) -> Self {
        JavaExpr::StaticCall {
            class,
            name: name.into(),
            args,
        }
    }

    pub fn binary(left: JavaExpr, op: &str, right: JavaExpr) -> Self {
        JavaExpr::Binary {
            op: op.to_string(),
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn not(operand: JavaExpr) -> Self {
        JavaExpr::Unary {
            op: "!".to_string(),
            operand: Box::new(operand),
        }
    }

    pub fn assign(target: JavaExpr, value: JavaExpr) -> Self {
        JavaExpr::Assign {
            target: Box::new(target),
            value: Box::new(value),
        }
    }

    fn collect_imports(&self, imports: &mut BTreeSet<String>) {
        match self {
            JavaExpr::Literal(_) | JavaExpr::Ident(_) | JavaExpr::This | JavaExpr::Super => {}
            JavaExpr::Field { object, .. } => object.collect_imports(imports),
            JavaExpr::StaticField { class, .. } => class.collect_imports(imports),
            JavaExpr::Call { target, args, .. } => {
                if let Some(target) = target {
                    target.collect_imports(imports);
                }
                args.iter().for_each(|a| a.collect_imports(imports));
            }
            JavaExpr::StaticCall { class, args, .. } | JavaExpr::New { ty: class, args } => {
                class.collect_imports(imports);
                args.iter().for_each(|a| a.collect_imports(imports));
            }
            JavaExpr::NewArray { element, len } => {
                element.collect_imports(imports);
                len.collect_imports(imports);
            }
            JavaExpr::Binary { left, right, .. } => {
                left.collect_imports(imports);
                right.collect_imports(imports);
            }
            JavaExpr::Unary { operand, .. } => operand.collect_imports(imports),
            JavaExpr::Assign { target, value } => {
                target.collect_imports(imports);
                value.collect_imports(imports);
            }
            JavaExpr::Index { array, index } => {
                array.collect_imports(imports);
                index.collect_imports(imports);
            }
            JavaExpr::Cast { ty, value } | JavaExpr::InstanceOf { value, ty } => {
                ty.collect_imports(imports);
                value.collect_imports(imports);
            }
            JavaExpr::Conditional {
                cond,
                then,
                otherwise,
            } => {
                cond.collect_imports(imports);
                then.collect_imports(imports);
                otherwise.collect_imports(imports);
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum JavaStmt {
    Local {
        ty: JavaType,
        name: String,
        init: Option<JavaExpr>,
    },
    Expr(JavaExpr),
    Return(Option<JavaExpr>),
    If {
        cond: JavaExpr,
        then: Vec<JavaStmt>,
        otherwise: Option<Vec<JavaStmt>>,
    },
    While {
        cond: JavaExpr,
        body: Vec<JavaStmt>,
    },
    For {
        init: Option<Box<JavaStmt>>,
        cond: Option<JavaExpr>,
        step: Option<JavaExpr>,
        body: Vec<JavaStmt>,
    },
    Block(Vec<JavaStmt>),
    Throw(JavaExpr),
    Break,
    Continue,
    /// Scoped acquisition: `finally` runs on every exit from `body`
    TryFinally {
        body: Vec<JavaStmt>,
        finally: Vec<JavaStmt>,
    },
    Comment(String),
    /// Placeholder for a construct that needs manual completion
    Stub(String),
}

impl JavaStmt {
    pub fn expr(expr: JavaExpr) -> Self {
        JavaStmt::Expr(expr)
    }

    fn collect_imports(&self, imports: &mut BTreeSet<String>) {
        let all = |stmts: &[JavaStmt], imports: &mut BTreeSet<String>| {
            stmts.iter().for_each(|s| s.collect_imports(imports))
        };
        match self {
            JavaStmt::Local { ty, init, .. } => {
                ty.collect_imports(imports);
                if let Some(init) = init {
                    init.collect_imports(imports);
                }
            }
            JavaStmt::Expr(expr) | JavaStmt::Throw(expr) => expr.collect_imports(imports),
            JavaStmt::Return(value) => {
                if let Some(value) = value {
                    value.collect_imports(imports);
                }
            }
            JavaStmt::If {
                cond,
                then,
                otherwise,
            } => {
                cond.collect_imports(imports);
                all(then, imports);
                if let Some(otherwise) = otherwise {
                    all(otherwise, imports);
                }
            }
            JavaStmt::While { cond, body } => {
                cond.collect_imports(imports);
                all(body, imports);
            }
            JavaStmt::For {
                init,
                cond,
                step,
                body,
            } => {
                if let Some(init) = init {
                    init.collect_imports(imports);
                }
                if let Some(cond) = cond {
                    cond.collect_imports(imports);
                }
                if let Some(step) = step {
                    step.collect_imports(imports);
                }
                all(body, imports);
            }
            JavaStmt::Block(body) => all(body, imports),
            JavaStmt::TryFinally { body, finally } => {
                all(body, imports);
                all(finally, imports);
            }
            JavaStmt::Break | JavaStmt::Continue | JavaStmt::Comment(_) | JavaStmt::Stub(_) => {}
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TypeParam {
    pub name: String,
    pub bound: Option<JavaType>,
}

impl TypeParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            bound: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldDecl {
    pub name: String,
    pub ty: JavaType,
    pub modifiers: Modifiers,
    pub init: Option<JavaExpr>,
    pub comment: Option<String>,
}

impl FieldDecl {
    pub fn new(name: impl Into<String>, ty: JavaType, modifiers: Modifiers) -> Self {
        Self {
            name: name.into(),
            ty,
            modifiers,
            init: None,
            comment: None,
        }
    }

    pub fn with_init(mut self, init: JavaExpr) -> Self {
        self.init = Some(init);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: JavaType,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: JavaType) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MethodDecl {
    pub name: String,
    pub modifiers: Modifiers,
    pub type_params: Vec<TypeParam>,
    /// `None` for constructors
    pub return_type: Option<JavaType>,
    pub params: Vec<Param>,
    /// `None` for abstract and interface methods
    pub body: Option<Vec<JavaStmt>>,
    pub is_override: bool,
    pub comment: Option<String>,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, return_type: JavaType, params: Vec<Param>) -> Self {
        Self {
            name: name.into(),
            modifiers: Modifiers::public(),
            type_params: Vec::new(),
            return_type: Some(return_type),
            params,
            body: Some(Vec::new()),
            is_override: false,
            comment: None,
        }
    }

    pub fn constructor(name: impl Into<String>, params: Vec<Param>) -> Self {
        Self {
            return_type: None,
            ..Self::new(name, JavaType::Void, params)
        }
    }

    /// A method whose body is a manual-fix placeholder.
    pub fn stub(
        name: impl Into<String>,
        return_type: JavaType,
        params: Vec<Param>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            body: Some(vec![JavaStmt::Stub(message.into())]),
            ..Self::new(name, return_type, params)
        }
    }

    pub fn with_body(mut self, body: Vec<JavaStmt>) -> Self {
        self.body = Some(body);
        self
    }

    pub fn overriding(mut self) -> Self {
        self.is_override = true;
        self
    }

    pub fn is_stub(&self) -> bool {
        matches!(self.body.as_deref(), Some([JavaStmt::Stub(_)]))
    }

    /// Name and parameter types: what makes two methods collide.
    pub fn signature(&self) -> String {
        let params: Vec<String> = self.params.iter().map(|p| p.ty.spelling()).collect();
        format!("{}({})", self.name, params.join(", "))
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeKind {
    #[default]
    Class,
    Interface,
    Enum,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EnumConstant {
    pub name: String,
    pub args: Vec<JavaExpr>,
}

/// A class, interface or enum.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TypeDecl {
    pub kind: TypeKind,
    pub name: String,
    pub modifiers: Modifiers,
    pub type_params: Vec<TypeParam>,
    pub extends: Option<JavaType>,
    pub implements: Vec<JavaType>,
    pub constants: Vec<EnumConstant>,
    pub fields: Vec<FieldDecl>,
    pub methods: Vec<MethodDecl>,
    pub nested: Vec<TypeDecl>,
    /// Leading comment lines (review notes, manual-fix markers)
    pub notes: Vec<String>,
}

impl TypeDecl {
    pub fn class(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn interface(name: impl Into<String>) -> Self {
        Self {
            kind: TypeKind::Interface,
            ..Self::class(name)
        }
    }

    pub fn method(&self, name: &str) -> Option<&MethodDecl> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&FieldDecl> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn has_method(&self, signature: &str) -> bool {
        self.methods.iter().any(|m| m.signature() == signature)
    }

    /// Add a method unless one with the same signature exists.
    pub fn push_method(&mut self, method: MethodDecl) -> bool {
        if self.has_method(&method.signature()) {
            return false;
        }
        self.methods.push(method);
        true
    }

    fn collect_imports(&self, imports: &mut BTreeSet<String>) {
        for param in &self.type_params {
            if let Some(bound) = &param.bound {
                bound.collect_imports(imports);
            }
        }
        if let Some(extends) = &self.extends {
            extends.collect_imports(imports);
        }
        for ty in &self.implements {
            ty.collect_imports(imports);
        }
        for constant in &self.constants {
            constant.args.iter().for_each(|a| a.collect_imports(imports));
        }
        for field in &self.fields {
            field.ty.collect_imports(imports);
            if let Some(init) = &field.init {
                init.collect_imports(imports);
            }
        }
        for method in &self.methods {
            for param in &method.type_params {
                if let Some(bound) = &param.bound {
                    bound.collect_imports(imports);
                }
            }
            if let Some(ty) = &method.return_type {
                ty.collect_imports(imports);
            }
            for param in &method.params {
                param.ty.collect_imports(imports);
            }
            if let Some(body) = &method.body {
                body.iter().for_each(|s| s.collect_imports(imports));
            }
        }
        for nested in &self.nested {
            nested.collect_imports(imports);
        }
    }
}

/// One output compilation unit: a package, its imports and one top-level type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetFile {
    pub package: String,
    pub imports: BTreeSet<String>,
    pub decl: TypeDecl,
}

impl TargetFile {
    /// Build a file, computing imports from every type the declaration uses.
    pub fn new(package: impl Into<String>, decl: TypeDecl) -> Self {
        let package = package.into();
        let mut imports = BTreeSet::new();
        decl.collect_imports(&mut imports);
        imports.retain(|import| import.rsplit_once('.').is_none_or(|(pkg, _)| pkg != package));
        Self {
            package,
            imports,
            decl,
        }
    }

    /// Relative output path (`geo/shapes/Circle.java` style, without extension).
    pub fn path_stem(&self) -> String {
        if self.package.is_empty() {
            self.decl.name.clone()
        } else {
            format!("{}/{}", self.package.replace('.', "/"), self.decl.name)
        }
    }
}

/// Target IR for one translation unit.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetUnit {
    pub unit: String,
    pub files: Vec<TargetFile>,
}

impl TargetUnit {
    pub fn file(&self, name: &str) -> Option<&TargetFile> {
        self.files.iter().find(|f| f.decl.name == name)
    }

    pub fn class(&self, name: &str) -> Option<&TypeDecl> {
        self.file(name).map(|f| &f.decl)
    }
}
