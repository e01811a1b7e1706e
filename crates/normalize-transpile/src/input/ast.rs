//! Shape of the resolved-AST document the front end hands over.
//!
//! Names are already qualified where they refer elsewhere (bases, templates,
//! callees) and types are resolved spellings. Bodies use the IR's own
//! statement and expression nodes.

use crate::ir::{Access, ConstantOrigin, Enumerator, Expr, MemberInit, Stmt};
use serde::{Deserialize, Serialize};

/// One translation unit as produced by the front end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AstDocument {
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub declarations: Vec<AstNode>,
}

/// A declaration node with the fields every kind shares.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstNode {
    #[serde(flatten)]
    pub kind: AstKind,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub line: u32,
    #[serde(default)]
    pub column: Option<u32>,
    #[serde(default)]
    pub children: Vec<AstNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AstKind {
    Namespace,
    Class(AstClass),
    ClassTemplate(AstClass),
    Union(AstText),
    Method(AstFunction),
    Constructor(AstFunction),
    Destructor(AstFunction),
    Function(AstFunction),
    FunctionTemplate(AstFunction),
    Field(AstVariable),
    Variable(AstVariable),
    Constant(AstConstant),
    Enum(AstEnum),
    Specialization(AstSpecialization),
    Typedef(AstTypedef),
    Macro(AstText),
    Friend(AstText),
    Asm(AstText),
    Goto(AstText),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AstBase {
    pub name: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub access: Access,
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AstTemplateParam {
    pub name: String,
    /// Type of a non-type parameter
    #[serde(default, rename = "type")]
    pub ty: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AstClass {
    #[serde(default)]
    pub bases: Vec<AstBase>,
    #[serde(default, rename = "struct")]
    pub is_struct: bool,
    #[serde(default, rename = "final")]
    pub is_final: bool,
    #[serde(default)]
    pub has_destructor: bool,
    #[serde(default)]
    pub template_params: Vec<AstTemplateParam>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AstParam {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AstFunction {
    #[serde(default = "void")]
    pub return_type: String,
    #[serde(default)]
    pub params: Vec<AstParam>,
    #[serde(default)]
    pub access: Access,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default, rename = "virtual")]
    pub is_virtual: bool,
    #[serde(default, rename = "pure")]
    pub is_pure: bool,
    #[serde(default, rename = "const")]
    pub is_const: bool,
    #[serde(default)]
    pub initializers: Vec<MemberInit>,
    #[serde(default)]
    pub body: Option<Vec<Stmt>>,
    #[serde(default)]
    pub template_params: Vec<AstTemplateParam>,
}

fn void() -> String {
    "void".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstVariable {
    #[serde(rename = "type")]
    pub ty: String,
    /// Defaults to private for class fields and public elsewhere
    #[serde(default)]
    pub access: Option<Access>,
    #[serde(default, rename = "static")]
    pub is_static: bool,
    #[serde(default)]
    pub init: Option<Expr>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstConstant {
    #[serde(default)]
    pub origin: ConstantOrigin,
    #[serde(default, rename = "type")]
    pub ty: Option<String>,
    pub value: Expr,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AstEnum {
    #[serde(default)]
    pub enumerators: Vec<Enumerator>,
    #[serde(default)]
    pub scoped: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstSpecialization {
    /// Qualified name of the primary template
    pub template: String,
    pub args: Vec<String>,
    #[serde(default)]
    pub partial: bool,
    /// Parameters a partial specialization leaves open
    #[serde(default)]
    pub params: Vec<AstTemplateParam>,
    /// The specialized class or function
    pub decl: Box<AstNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstTypedef {
    pub target: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AstText {
    #[serde(default)]
    pub text: String,
}
