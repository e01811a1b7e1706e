//! IR Builder: resolved-AST document to Translation IR.
//!
//! Assigns declaration ids in document order, computes qualified names and
//! folds specialization nodes into their primary templates. Specializations
//! whose template is not in the same document are kept on the unit for the
//! symbol table to attach.

use super::ast::{
    AstClass, AstDocument, AstFunction, AstKind, AstNode, AstSpecialization, AstTemplateParam,
    AstVariable,
};
use crate::ir::{
    Access, Alias, BaseRef, ClassLike, Constant, DeclId, DeclKind, Declaration, EnumDecl,
    ExternalSpecialization, Field, Function, FunctionRole, Param, Specialization, TemplateDecl,
    TemplateParam, TranslationUnit, TypeRef, Unsupported, UnsupportedKind,
};
use crate::names;
use crate::traits::ReadError;
use normalize_transpile_report::Location;

/// Lower a parsed document. `fallback_unit` names the unit when the document does not.
pub fn build(document: AstDocument, fallback_unit: &str) -> Result<TranslationUnit, ReadError> {
    let unit = if document.unit.is_empty() {
        fallback_unit.to_string()
    } else {
        document.unit
    };
    let mut builder = Builder {
        unit: unit.clone(),
        next_id: 0,
        specializations: Vec::new(),
    };
    let mut declarations = Vec::new();
    for node in &document.declarations {
        if let Some(decl) = builder.node(node, "", Context::Namespace)? {
            declarations.push(decl);
        }
    }

    let mut translation = TranslationUnit::new(unit, declarations);
    for (template, specialization) in builder.specializations {
        if let Some(specialization) = attach(&mut translation.declarations, &template, specialization) {
            tracing::debug!(unit = %translation.id, template = %template, "specialization of a template in another unit");
            translation.external_specializations.push(ExternalSpecialization {
                template,
                specialization,
            });
        }
    }
    Ok(translation)
}

/// Add `spec` to the template named `template`; hands it back when absent.
fn attach(decls: &mut [Declaration], template: &str, spec: Specialization) -> Option<Specialization> {
    let mut pending = Some(spec);
    for decl in decls {
        decl.walk_mut(&mut |d| {
            if d.qualified_name != template {
                return;
            }
            if let DeclKind::Template(t) = &mut d.kind {
                if let Some(spec) = pending.take() {
                    t.specializations.push(spec);
                }
            }
        });
        if pending.is_none() {
            return None;
        }
    }
    pending
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    Namespace,
    Class,
    Struct,
}

struct Builder {
    unit: String,
    next_id: u32,
    specializations: Vec<(String, Specialization)>,
}

impl Builder {
    fn id(&mut self) -> DeclId {
        let id = DeclId(self.next_id);
        self.next_id += 1;
        id
    }

    fn location(&self, node: &AstNode) -> Location {
        match node.column {
            Some(column) => Location::with_column(&self.unit, node.line, column),
            None => Location::new(&self.unit, node.line),
        }
    }

    fn ty(&self, spelling: &str) -> Result<TypeRef, ReadError> {
        spelling.parse().map_err(|source| ReadError::Type {
            unit: self.unit.clone(),
            source,
        })
    }

    fn invalid(&self, message: impl Into<String>) -> ReadError {
        ReadError::Invalid {
            unit: self.unit.clone(),
            message: message.into(),
        }
    }

    fn node(&mut self, node: &AstNode, scope: &str, context: Context) -> Result<Option<Declaration>, ReadError> {
        let id = self.id();
        let qualified = names::qualify(scope, &node.name);
        let location = self.location(node);
        let decl = |kind: DeclKind| {
            Declaration::new(id, node.name.clone(), kind)
                .qualified(qualified.clone())
                .at(location.clone())
        };

        let built = match &node.kind {
            AstKind::Namespace => {
                let inner = if node.name.is_empty() { scope } else { qualified.as_str() };
                let children = self.children(&node.children, inner, Context::Namespace)?;
                decl(DeclKind::Namespace).with_children(children)
            }
            AstKind::Class(class) | AstKind::ClassTemplate(class) => {
                let is_template = matches!(node.kind, AstKind::ClassTemplate(_))
                    || !class.template_params.is_empty();
                if is_template {
                    let pattern_id = self.id();
                    let (kind, children) = self.class(node, class, &qualified)?;
                    let pattern = Declaration::new(pattern_id, node.name.clone(), kind)
                        .qualified(qualified.clone())
                        .at(location.clone())
                        .with_children(children);
                    let params = self.template_params(&class.template_params)?;
                    decl(template(params, pattern))
                } else {
                    let (kind, children) = self.class(node, class, &qualified)?;
                    decl(kind).with_children(children)
                }
            }
            AstKind::Method(f) | AstKind::Function(f) => {
                let role = match (&node.kind, context) {
                    (AstKind::Function(_), Context::Namespace) => FunctionRole::Free,
                    _ => FunctionRole::Method,
                };
                decl(DeclKind::Function(self.function(f, role)?))
            }
            AstKind::Constructor(f) => decl(DeclKind::Function(self.function(f, FunctionRole::Constructor)?)),
            AstKind::Destructor(f) => decl(DeclKind::Function(self.function(f, FunctionRole::Destructor)?)),
            AstKind::FunctionTemplate(f) => {
                let role = match context {
                    Context::Namespace => FunctionRole::Free,
                    Context::Class | Context::Struct => FunctionRole::Method,
                };
                let pattern_id = self.id();
                let pattern = Declaration::new(pattern_id, node.name.clone(), DeclKind::Function(self.function(f, role)?))
                    .qualified(qualified.clone())
                    .at(location.clone());
                let params = self.template_params(&f.template_params)?;
                decl(template(params, pattern))
            }
            AstKind::Field(v) | AstKind::Variable(v) => decl(DeclKind::Field(self.variable(v, context)?)),
            AstKind::Constant(c) => decl(DeclKind::Constant(Constant {
                origin: c.origin,
                ty: c.ty.as_deref().map(|t| self.ty(t)).transpose()?,
                init: c.value.clone(),
            })),
            AstKind::Enum(e) => decl(DeclKind::Enum(EnumDecl {
                enumerators: e.enumerators.clone(),
                scoped: e.scoped,
            })),
            AstKind::Typedef(t) => decl(DeclKind::Alias(Alias {
                target: self.ty(&t.target)?,
            })),
            AstKind::Specialization(spec) => {
                self.specialization(spec, scope)?;
                return Ok(None);
            }
            AstKind::Union(t) => decl(unsupported(UnsupportedKind::Union, &t.text)),
            AstKind::Macro(t) => decl(unsupported(UnsupportedKind::FunctionMacro, &t.text)),
            AstKind::Friend(t) => decl(unsupported(UnsupportedKind::Friend, &t.text)),
            AstKind::Asm(t) => decl(unsupported(UnsupportedKind::InlineAsm, &t.text)),
            AstKind::Goto(t) => decl(unsupported(UnsupportedKind::Goto, &t.text)),
        };
        Ok(Some(built))
    }

    fn children(&mut self, nodes: &[AstNode], scope: &str, context: Context) -> Result<Vec<Declaration>, ReadError> {
        let mut out = Vec::with_capacity(nodes.len());
        for node in nodes {
            if let Some(decl) = self.node(node, scope, context)? {
                out.push(decl);
            }
        }
        Ok(out)
    }

    fn class(&mut self, node: &AstNode, class: &AstClass, qualified: &str) -> Result<(DeclKind, Vec<Declaration>), ReadError> {
        let mut bases = Vec::with_capacity(class.bases.len());
        for base in &class.bases {
            if base.name.is_empty() {
                return Err(self.invalid(format!("base of {} has no name", qualified)));
            }
            bases.push(BaseRef {
                name: base.name.trim_start_matches("::").to_string(),
                args: base.args.iter().map(|a| self.ty(a)).collect::<Result<_, _>>()?,
                access: base.access,
                is_virtual: base.is_virtual,
            });
        }
        let context = if class.is_struct { Context::Struct } else { Context::Class };
        let children = self.children(&node.children, qualified, context)?;
        let kind = DeclKind::ClassLike(ClassLike {
            bases,
            is_struct: class.is_struct,
            is_final: class.is_final,
            has_user_destructor: class.has_destructor,
            template_params: self.template_params(&class.template_params)?,
        });
        Ok((kind, children))
    }

    fn function(&self, f: &AstFunction, role: FunctionRole) -> Result<Function, ReadError> {
        let return_type = match role {
            FunctionRole::Constructor | FunctionRole::Destructor => TypeRef::Void,
            _ => self.ty(&f.return_type)?,
        };
        let mut params = Vec::with_capacity(f.params.len());
        for p in &f.params {
            params.push(Param::new(p.name.clone(), self.ty(&p.ty)?));
        }
        Ok(Function {
            role,
            return_type,
            params,
            access: f.access,
            is_static: f.is_static,
            is_virtual: f.is_virtual || f.is_pure,
            is_pure: f.is_pure,
            is_const: f.is_const,
            initializers: f.initializers.clone(),
            body: f.body.clone(),
        })
    }

    fn variable(&self, v: &AstVariable, context: Context) -> Result<Field, ReadError> {
        let access = v.access.unwrap_or(match context {
            Context::Class => Access::Private,
            Context::Struct | Context::Namespace => Access::Public,
        });
        Ok(Field {
            ty: self.ty(&v.ty)?,
            access,
            is_static: v.is_static || context == Context::Namespace,
            init: v.init.clone(),
        })
    }

    fn template_params(&self, params: &[AstTemplateParam]) -> Result<Vec<TemplateParam>, ReadError> {
        params
            .iter()
            .map(|p| {
                Ok(TemplateParam {
                    name: p.name.clone(),
                    value_type: p.ty.as_deref().map(|t| self.ty(t)).transpose()?,
                })
            })
            .collect()
    }

    fn specialization(&mut self, spec: &AstSpecialization, scope: &str) -> Result<(), ReadError> {
        let template = spec.template.trim_start_matches("::").to_string();
        if template.is_empty() {
            return Err(self.invalid("specialization without a template name"));
        }
        let args = spec.args.iter().map(|a| self.ty(a)).collect::<Result<Vec<_>, _>>()?;
        let params = self.template_params(&spec.params)?;
        let owner_scope = match names::scope_of(&template) {
            "" => scope,
            s => s,
        };
        let Some(mut decl) = self.node(&spec.decl, owner_scope, Context::Namespace)? else {
            return Err(self.invalid(format!("specialization of {} wraps another specialization", template)));
        };
        decl.name = names::simple_name(&template).to_string();
        decl.qualified_name = template.clone();
        if !matches!(decl.kind, DeclKind::ClassLike(_) | DeclKind::Function(_)) {
            return Err(self.invalid(format!(
                "specialization of {} must be a class or function",
                template
            )));
        }
        self.specializations.push((
            template,
            Specialization {
                args,
                partial: spec.partial,
                params,
                decl,
            },
        ));
        Ok(())
    }
}

fn template(params: Vec<TemplateParam>, pattern: Declaration) -> DeclKind {
    DeclKind::Template(TemplateDecl {
        params,
        pattern: Box::new(pattern),
        specializations: Vec::new(),
    })
}

fn unsupported(construct: UnsupportedKind, text: &str) -> DeclKind {
    DeclKind::Unsupported(Unsupported {
        construct,
        text: text.to_string(),
    })
}
