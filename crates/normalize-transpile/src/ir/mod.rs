//! Translation IR: the language-neutral tree the validator and transformer work on.
//!
//! The tree is strictly hierarchical. A [`Declaration`] owns its children;
//! cross references (base classes, called functions, specialized templates)
//! are qualified names resolved through the [`SymbolTable`](crate::symbols::SymbolTable).
//!
//! ```text
//! TranslationUnit
//! └── Declaration (Namespace)
//!     ├── Declaration (ClassLike)
//!     │   ├── Declaration (Field)
//!     │   └── Declaration (Function, role = Method)
//!     └── Declaration (Template) ── pattern: Declaration (ClassLike)
//! ```

mod body;
mod operator;
mod types;

pub use body::{BinaryOp, Expr, Literal, Stmt, UnaryOp};
pub use operator::OperatorKind;
pub use types::{TypeParseError, TypeRef};

use normalize_transpile_report::Location;
use serde::{Deserialize, Serialize};

/// Stable identifier of a declaration within a conversion run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DeclId(pub u32);

/// One input file's declaration forest.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranslationUnit {
    /// Unit identifier (usually the source path)
    pub id: String,
    pub declarations: Vec<Declaration>,
    /// Specializations whose primary template lives in another unit
    #[serde(default)]
    pub external_specializations: Vec<ExternalSpecialization>,
}

/// A specialization detached from its primary template, keyed by the
/// template's qualified name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExternalSpecialization {
    pub template: String,
    pub specialization: Specialization,
}

impl TranslationUnit {
    pub fn new(id: impl Into<String>, declarations: Vec<Declaration>) -> Self {
        Self {
            id: id.into(),
            declarations,
            external_specializations: Vec::new(),
        }
    }

    /// Visit every declaration, parents before children.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Declaration)) {
        for decl in &self.declarations {
            decl.walk(f);
        }
        for external in &self.external_specializations {
            external.specialization.decl.walk(f);
        }
    }

    /// Visit every declaration mutably, parents before children.
    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Declaration)) {
        for decl in &mut self.declarations {
            decl.walk_mut(f);
        }
        for external in &mut self.external_specializations {
            external.specialization.decl.walk_mut(f);
        }
    }
}

/// Validator annotations on a declaration.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub has_multiple_bases: bool,
    pub is_template: bool,
    pub has_destructor: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator: Option<OperatorKind>,
    pub has_specializations: bool,
    pub has_partial_specialization: bool,
}

/// A declaration node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    pub id: DeclId,
    /// Unqualified name (empty for anonymous namespaces)
    pub name: String,
    /// Fully qualified name (`Geo::Shapes::Circle`)
    pub qualified_name: String,
    pub location: Location,
    #[serde(default)]
    pub capabilities: Capabilities,
    pub kind: DeclKind,
    #[serde(default)]
    pub children: Vec<Declaration>,
}

impl Declaration {
    pub fn new(id: DeclId, name: impl Into<String>, kind: DeclKind) -> Self {
        let name = name.into();
        Self {
            id,
            qualified_name: name.clone(),
            name,
            location: Location::default(),
            capabilities: Capabilities::default(),
            kind,
            children: Vec::new(),
        }
    }

    pub fn with_children(mut self, children: Vec<Declaration>) -> Self {
        self.children = children;
        self
    }

    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    pub fn qualified(mut self, qualified_name: impl Into<String>) -> Self {
        self.qualified_name = qualified_name.into();
        self
    }

    pub fn as_class(&self) -> Option<&ClassLike> {
        match &self.kind {
            DeclKind::ClassLike(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_function(&self) -> Option<&Function> {
        match &self.kind {
            DeclKind::Function(function) => Some(function),
            _ => None,
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match &self.kind {
            DeclKind::Field(field) => Some(field),
            _ => None,
        }
    }

    /// Member functions of a class, in declaration order.
    pub fn methods(&self) -> impl Iterator<Item = (&Declaration, &Function)> {
        self.children
            .iter()
            .filter_map(|c| c.as_function().map(|f| (c, f)))
    }

    /// Member fields of a class, in declaration order.
    pub fn fields(&self) -> impl Iterator<Item = (&Declaration, &Field)> {
        self.children
            .iter()
            .filter_map(|c| c.as_field().map(|f| (c, f)))
    }

    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Declaration)) {
        f(self);
        if let DeclKind::Template(template) = &self.kind {
            template.pattern.walk(f);
            for spec in &template.specializations {
                spec.decl.walk(f);
            }
        }
        for child in &self.children {
            child.walk(f);
        }
    }

    pub fn walk_mut(&mut self, f: &mut impl FnMut(&mut Declaration)) {
        f(self);
        if let DeclKind::Template(template) = &mut self.kind {
            template.pattern.walk_mut(f);
            for spec in &mut template.specializations {
                spec.decl.walk_mut(f);
            }
        }
        for child in &mut self.children {
            child.walk_mut(f);
        }
    }
}

/// The closed set of declaration kinds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DeclKind {
    Namespace,
    ClassLike(ClassLike),
    Function(Function),
    Field(Field),
    Constant(Constant),
    Template(TemplateDecl),
    Enum(EnumDecl),
    Alias(Alias),
    Unsupported(Unsupported),
}

/// Member access level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Access {
    #[default]
    Public,
    Protected,
    Private,
}

/// Reference to a base class, by qualified name.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BaseRef {
    pub name: String,
    #[serde(default)]
    pub args: Vec<TypeRef>,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub is_virtual: bool,
}

impl BaseRef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            access: Access::Public,
            is_virtual: false,
        }
    }
}

/// A class, struct or union-free aggregate. Members live in `Declaration::children`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClassLike {
    /// Bases in declaration order: the first is the primary base
    #[serde(default)]
    pub bases: Vec<BaseRef>,
    #[serde(default)]
    pub is_struct: bool,
    #[serde(default)]
    pub is_final: bool,
    /// Explicit destructor presence, as reported by the front end
    #[serde(default)]
    pub has_user_destructor: bool,
    /// Template parameters when the class itself is a template pattern
    #[serde(default)]
    pub template_params: Vec<TemplateParam>,
}

impl ClassLike {
    pub fn primary_base(&self) -> Option<&BaseRef> {
        self.bases.first()
    }

    pub fn secondary_bases(&self) -> &[BaseRef] {
        self.bases.get(1..).unwrap_or(&[])
    }

    pub fn is_template(&self) -> bool {
        !self.template_params.is_empty()
    }
}

/// What a function is to its enclosing scope.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FunctionRole {
    #[default]
    Free,
    Method,
    Constructor,
    Destructor,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: TypeRef,
}

impl Param {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// Constructor member initializer (`: x(x)` or `: Base(args)`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemberInit {
    pub member: String,
    #[serde(default)]
    pub args: Vec<Expr>,
    /// Initializes a base class rather than a field
    #[serde(default)]
    pub is_base: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Function {
    #[serde(default)]
    pub role: FunctionRole,
    pub return_type: TypeRef,
    #[serde(default)]
    pub params: Vec<Param>,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub is_virtual: bool,
    #[serde(default)]
    pub is_pure: bool,
    #[serde(default)]
    pub is_const: bool,
    #[serde(default)]
    pub initializers: Vec<MemberInit>,
    /// `None` for declarations without a definition
    #[serde(default)]
    pub body: Option<Vec<Stmt>>,
}

impl Function {
    pub fn new(role: FunctionRole, return_type: TypeRef, params: Vec<Param>) -> Self {
        Self {
            role,
            return_type,
            params,
            access: Access::Public,
            is_static: false,
            is_virtual: false,
            is_pure: false,
            is_const: false,
            initializers: Vec::new(),
            body: None,
        }
    }

    pub fn with_body(mut self, body: Vec<Stmt>) -> Self {
        self.body = Some(body);
        self
    }

    /// Operands besides the receiver, as counted for operator classification.
    pub fn operand_count(&self) -> usize {
        match self.role {
            FunctionRole::Free => self.params.len().saturating_sub(1),
            _ if self.is_static => self.params.len().saturating_sub(1),
            _ => self.params.len(),
        }
    }

    /// The operator this function overloads, judged by its name.
    pub fn operator_kind(&self, name: &str) -> Option<OperatorKind> {
        OperatorKind::from_name(name, self.operand_count())
    }

    /// Parameter types with references and `const` stripped: the part of a
    /// signature that decides whether two methods collide.
    pub fn signature_key(&self, name: &str) -> String {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|p| p.ty.value_type().to_string())
            .collect();
        format!("{}({})", name, params.join(", "))
    }
}

/// A data member or namespace-level variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub ty: TypeRef,
    #[serde(default)]
    pub access: Access,
    #[serde(default)]
    pub is_static: bool,
    #[serde(default)]
    pub init: Option<Expr>,
}

impl Field {
    pub fn new(ty: TypeRef) -> Self {
        Self {
            ty,
            access: Access::Private,
            is_static: false,
            init: None,
        }
    }
}

/// Where a constant came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstantOrigin {
    /// Object-like `#define`
    Define,
    #[default]
    Const,
    Constexpr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Constant {
    #[serde(default)]
    pub origin: ConstantOrigin,
    /// Declared type; `#define` constants have none
    #[serde(default)]
    pub ty: Option<TypeRef>,
    pub init: Expr,
}

/// A template parameter.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateParam {
    pub name: String,
    /// Type of a non-type parameter (`int N`); `None` for `typename T`
    #[serde(default)]
    pub value_type: Option<TypeRef>,
}

impl TemplateParam {
    pub fn type_param(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value_type: None,
        }
    }

    pub fn is_type(&self) -> bool {
        self.value_type.is_none()
    }
}

/// A class or function template with its specializations.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TemplateDecl {
    pub params: Vec<TemplateParam>,
    /// The generic pattern (a `ClassLike` or `Function`)
    pub pattern: Box<Declaration>,
    #[serde(default)]
    pub specializations: Vec<Specialization>,
}

/// An explicit (full) or partial specialization of a template.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Specialization {
    /// Arguments in parameter order; partial specializations may name their
    /// own remaining parameters here
    pub args: Vec<TypeRef>,
    #[serde(default)]
    pub partial: bool,
    /// Parameters still open in a partial specialization
    #[serde(default)]
    pub params: Vec<TemplateParam>,
    pub decl: Declaration,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Enumerator {
    pub name: String,
    #[serde(default)]
    pub value: Option<i64>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct EnumDecl {
    pub enumerators: Vec<Enumerator>,
    #[serde(default)]
    pub scoped: bool,
}

/// `typedef` / `using` alias.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Alias {
    pub target: TypeRef,
}

/// Source constructs with no general target mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UnsupportedKind {
    Union,
    InlineAsm,
    Goto,
    Friend,
    FunctionMacro,
}

impl UnsupportedKind {
    pub fn describe(&self) -> &'static str {
        match self {
            UnsupportedKind::Union => "union",
            UnsupportedKind::InlineAsm => "inline assembly",
            UnsupportedKind::Goto => "goto",
            UnsupportedKind::Friend => "friend declaration",
            UnsupportedKind::FunctionMacro => "function-like macro",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Unsupported {
    pub construct: UnsupportedKind,
    /// Original text, kept for the stub comment
    #[serde(default)]
    pub text: String,
}
