//! Classes, free functions, globals and enums.

use super::body::BodyLowering;
use super::inheritance::{self, Delegate};
use super::operator::{self, Owner};
use super::types::map_type;
use super::{constant, template, unsupported_stub};
use super::{ClassScope, Cx, Halt, Lowered, Scope};
use crate::ir::{
    Access, ClassLike, DeclKind, Declaration, EnumDecl, Field, Function, FunctionRole,
    MemberInit, OperatorKind, Param, TypeRef,
};
use crate::names;
use crate::symbols::{SymbolTable, declares_destructor};
use crate::target::{
    EnumConstant, FieldDecl, JavaExpr, JavaLiteral, JavaStmt, JavaType, MethodDecl, Modifiers,
    TypeDecl, TypeKind, TypeParam, Visibility,
};
use normalize_transpile_report::ConstructKind;
use std::collections::BTreeMap;

/// Name and generic shape of the class being emitted. Templates and their
/// specializations reuse the class rule with a different shape.
#[derive(Debug, Clone, Default)]
pub(crate) struct Shape {
    pub name: String,
    pub type_params: Vec<TypeParam>,
    pub notes: Vec<String>,
    /// Fields standing in for non-type template parameters
    pub value_fields: Vec<FieldDecl>,
}

impl Shape {
    pub fn plain(decl: &Declaration) -> Self {
        Self {
            name: names::escape_identifier(&decl.name),
            ..Self::default()
        }
    }
}

pub(crate) fn visibility(access: Access) -> Visibility {
    match access {
        Access::Public => Visibility::Public,
        Access::Protected => Visibility::Protected,
        Access::Private => Visibility::Private,
    }
}

pub(crate) fn param_name(param: &Param, index: usize) -> String {
    if param.name.is_empty() {
        format!("arg{index}")
    } else {
        names::escape_identifier(&param.name)
    }
}

pub(crate) fn lower_params(
    params: &[Param],
    scope: &Scope,
    symbols: &SymbolTable,
) -> Vec<crate::target::Param> {
    params
        .iter()
        .enumerate()
        .map(|(i, p)| crate::target::Param::new(param_name(p, i), map_type(&p.ty, scope, symbols)))
        .collect()
}

/// Lowered body of a function, or a manual-fix stub when only its
/// declaration is known.
pub(crate) fn body_or_stub(
    decl: &Declaration,
    function: &Function,
    scope: &Scope,
    cx: &mut Cx,
) -> Vec<JavaStmt> {
    match &function.body {
        Some(body) => {
            let mut lowering = BodyLowering::new(cx, scope, &decl.location);
            for param in &function.params {
                lowering.declare(&param.name, &param.ty);
            }
            lowering.block(body)
        }
        None => {
            cx.warn_manual(
                ConstructKind::Function,
                &decl.location,
                format!("definition of {} is not available", decl.qualified_name),
            );
            vec![JavaStmt::Stub(format!("implement {}", decl.qualified_name))]
        }
    }
}

/// Operator kind of a function: the validator's annotation, else its name.
fn operator_kind(decl: &Declaration, function: &Function) -> Option<OperatorKind> {
    decl.capabilities
        .operator
        .or_else(|| function.operator_kind(&decl.name))
}

/// Lower a class, struct or template pattern.
pub(crate) fn lower(
    decl: &Declaration,
    class: &ClassLike,
    scope: &Scope,
    cx: &mut Cx,
    shape: Shape,
) -> Result<Lowered, Halt> {
    let symbols = cx.symbols;
    let this_name = match scope.class.as_ref().and_then(|c| c.this_type.as_ref()) {
        Some(JavaType::Class { name, .. }) => format!("{}.{}", name, shape.name),
        _ => shape.name.clone(),
    };
    let this_type = JavaType::class(&scope.package, &this_name).with_args(
        shape
            .type_params
            .iter()
            .map(|p| JavaType::simple(&p.name))
            .collect(),
    );
    let class_scope = Scope {
        namespace: scope.namespace.clone(),
        package: scope.package.clone(),
        class: Some(ClassScope {
            qualified: decl.qualified_name.clone(),
            this_type: Some(this_type.clone()),
            fields: decl
                .fields()
                .map(|(d, f)| (d.name.clone(), f.ty.clone()))
                .collect(),
            constants: decl
                .children
                .iter()
                .filter(|d| matches!(d.kind, DeclKind::Constant(_)))
                .map(|d| (d.name.clone(), names::upper_snake(&d.name)))
                .collect(),
        }),
        type_params: scope.type_params.clone(),
    }
    .with_type_params(shape.type_params.iter().map(|p| p.name.clone()));

    let mut target = TypeDecl::class(shape.name.clone());
    target.type_params = shape.type_params;
    target.notes = shape.notes;
    target.modifiers.is_final = class.is_final;
    target.modifiers.is_abstract = decl.methods().any(|(_, f)| f.is_pure);
    target.modifiers.is_static = scope.class.is_some();
    let mut extra = Vec::new();

    // Primary base
    let mut inherits_close = false;
    if let Some(primary) = class.primary_base() {
        let base_ty = TypeRef::Named {
            name: primary.name.clone(),
            args: primary.args.clone(),
        };
        match symbols.resolve(&primary.name, scope.lookup_scope()) {
            Some(symbol) => {
                inherits_close = symbols.is_resource(&symbol.decl.qualified_name);
            }
            None if primary.name.starts_with("std::") => {}
            None => cx.warn(
                ConstructKind::Class,
                &decl.location,
                format!(
                    "base {} of {} is not known; extends is kept by name",
                    primary.name, decl.name
                ),
            ),
        }
        target.extends = Some(map_type(&base_ty, &class_scope, symbols));
    }

    // Secondary bases
    let mut delegates = Vec::new();
    if class.bases.len() > 1 {
        let secondaries = inheritance::lower(decl, class, &class_scope, cx)?;
        target.implements = secondaries.implements;
        extra.extend(secondaries.interfaces);
        delegates = secondaries.delegates;
        for method in secondaries.methods {
            target.push_method(method);
        }
    }

    let constructors: Vec<(&Declaration, &Function)> = decl
        .methods()
        .filter(|(_, f)| f.role == FunctionRole::Constructor)
        .collect();

    // Fields
    target.fields.extend(shape.value_fields);
    for (d, field) in decl.fields() {
        let initialized_everywhere = !constructors.is_empty()
            && constructors
                .iter()
                .all(|(_, c)| c.initializers.iter().any(|i| !i.is_base && i.member == d.name));
        target
            .fields
            .push(member_field(d, field, initialized_everywhere, &class_scope, cx));
    }
    for delegate in &delegates {
        let mut field = FieldDecl::new(delegate.field.clone(), delegate.ty.clone(), Modifiers::private());
        if !delegate.is_abstract {
            field.modifiers.is_final = true;
            if constructors.is_empty() {
                field.init = Some(JavaExpr::New {
                    ty: delegate.ty.clone(),
                    args: Vec::new(),
                });
            }
        }
        target.fields.push(field);
    }

    // Members in declaration order
    let owner = Owner {
        decl,
        this_type: &this_type,
        scope: &class_scope,
    };
    let mut has_close = false;
    for child in &decl.children {
        match &child.kind {
            DeclKind::Function(function) => match function.role {
                FunctionRole::Constructor => {
                    let ctor = constructor(child, function, class, &shape.name, &delegates, &class_scope, cx);
                    target.methods.push(ctor);
                }
                FunctionRole::Destructor => {
                    has_close = true;
                    let mut body = body_or_stub(child, function, &class_scope, cx);
                    if inherits_close {
                        body.push(JavaStmt::expr(JavaExpr::Call {
                            target: Some(Box::new(JavaExpr::Super)),
                            name: "close".into(),
                            args: Vec::new(),
                        }));
                    }
                    target.push_method(
                        MethodDecl::new("close", JavaType::Void, Vec::new())
                            .with_body(body)
                            .overriding(),
                    );
                }
                FunctionRole::Method | FunctionRole::Free => {
                    if let Some(kind) = operator_kind(child, function) {
                        operator::lower_member(child, function, kind, &owner, cx, &mut target)?;
                    } else {
                        let method = method(child, function, decl, &class_scope, cx);
                        target.push_method(method);
                    }
                }
            },
            DeclKind::Constant(c) => {
                target.fields.push(constant::lower(child, c, &class_scope, cx));
            }
            DeclKind::ClassLike(nested) => {
                let lowered = lower(child, nested, &class_scope, cx, Shape::plain(child))?;
                target.nested.push(lowered.decl);
                extra.extend(lowered.extra);
            }
            DeclKind::Enum(e) => {
                let mut nested = lower_enum(child, e);
                nested.modifiers.is_static = true;
                target.nested.push(nested);
            }
            DeclKind::Template(t) => match t.pattern.kind {
                DeclKind::Function(_) => {
                    for method in template::generic_methods(child, t, &class_scope, cx)? {
                        target.push_method(method);
                    }
                }
                _ => {
                    for lowered in template::class_templates(child, t, &class_scope, cx)? {
                        target.nested.push(lowered.decl);
                        extra.extend(lowered.extra);
                    }
                }
            },
            DeclKind::Unsupported(u) => {
                if let Some(mut stub) = unsupported_stub(child, u.construct, cx)? {
                    stub.modifiers.is_static = true;
                    target.nested.push(stub);
                }
            }
            DeclKind::Alias(alias) => cx.info(
                ConstructKind::Alias,
                &child.location,
                format!(
                    "member alias {} resolves to {}",
                    child.name, alias.target
                ),
            ),
            DeclKind::Field(_) | DeclKind::Namespace => {}
        }
    }

    if declares_destructor(decl) && !inherits_close {
        target.implements.push(JavaType::simple("AutoCloseable"));
        if !has_close {
            target.push_method(MethodDecl::new("close", JavaType::Void, Vec::new()).overriding());
        }
    }

    tracing::debug!(class = %decl.qualified_name, name = %target.name, "lowered class");
    Ok(Lowered {
        decl: target,
        extra,
    })
}

fn member_field(
    decl: &Declaration,
    field: &Field,
    initialized_everywhere: bool,
    scope: &Scope,
    cx: &mut Cx,
) -> FieldDecl {
    let ty = map_type(&field.ty, scope, cx.symbols);
    let is_const = matches!(field.ty, TypeRef::Const(_));
    let init = field.init.as_ref().map(|init| {
        BodyLowering::new(cx, scope, &decl.location).expr(init)
    });
    let modifiers = Modifiers {
        visibility: visibility(field.access),
        is_static: field.is_static,
        is_final: is_const && (init.is_some() || (!field.is_static && initialized_everywhere)),
        is_abstract: false,
    };
    FieldDecl {
        init,
        ..FieldDecl::new(names::escape_identifier(&decl.name), ty, modifiers)
    }
}

fn method(
    decl: &Declaration,
    function: &Function,
    class: &Declaration,
    scope: &Scope,
    cx: &mut Cx,
) -> MethodDecl {
    let symbols = cx.symbols;
    let mut method = MethodDecl::new(
        names::escape_identifier(&decl.name),
        map_type(&function.return_type, scope, symbols),
        lower_params(&function.params, scope, symbols),
    );
    method.modifiers.visibility = visibility(function.access);
    method.modifiers.is_static = function.is_static;
    method.is_override = !function.is_static
        && symbols.inherits_method(&class.qualified_name, &function.signature_key(&decl.name));
    if function.is_pure && function.body.is_none() {
        method.modifiers.is_abstract = true;
        method.body = None;
    } else {
        method.body = Some(body_or_stub(decl, function, scope, cx));
    }
    method
}

fn constructor(
    decl: &Declaration,
    function: &Function,
    class: &ClassLike,
    name: &str,
    delegates: &[Delegate],
    scope: &Scope,
    cx: &mut Cx,
) -> MethodDecl {
    let symbols = cx.symbols;
    let params = lower_params(&function.params, scope, symbols);
    let mut ctor = MethodDecl::constructor(name, params);
    ctor.modifiers.visibility = visibility(function.access);

    if function.body.is_none() && function.initializers.is_empty() && !function.params.is_empty() {
        cx.warn_manual(
            ConstructKind::Function,
            &decl.location,
            format!("definition of {} is not available", decl.qualified_name),
        );
        ctor.body = Some(vec![JavaStmt::Stub(format!("implement {}", decl.qualified_name))]);
        return ctor;
    }

    let fields: BTreeMap<&str, &TypeRef> = scope
        .class
        .as_ref()
        .map(|c| c.fields.iter().map(|(k, v)| (k.as_str(), v)).collect())
        .unwrap_or_default();

    let mut lowering = BodyLowering::new(cx, scope, &decl.location);
    for param in &function.params {
        lowering.declare(&param.name, &param.ty);
    }
    let mut body = Vec::new();
    let mut delegate_args: BTreeMap<&str, &[crate::ir::Expr]> = BTreeMap::new();
    for init in &function.initializers {
        if init.is_base {
            if is_base(init, class.primary_base().map(|b| b.name.as_str())) {
                let args = init.args.iter().map(|a| lowering.expr(a)).collect();
                body.insert(
                    0,
                    JavaStmt::expr(JavaExpr::Call {
                        target: None,
                        name: "super".into(),
                        args,
                    }),
                );
            } else {
                delegate_args.insert(names::simple_name(&init.member), &init.args);
            }
            continue;
        }
        let value = member_init(init, fields.get(init.member.as_str()).copied(), &lowering, scope);
        body.push(JavaStmt::expr(JavaExpr::assign(
            JavaExpr::this_field(names::escape_identifier(&init.member)),
            value,
        )));
    }
    for delegate in delegates.iter().filter(|d| !d.is_abstract) {
        let args = delegate_args
            .get(names::simple_name(&delegate.base))
            .map(|args| args.iter().map(|a| lowering.expr(a)).collect())
            .unwrap_or_default();
        body.push(JavaStmt::expr(JavaExpr::assign(
            JavaExpr::this_field(delegate.field.clone()),
            JavaExpr::New {
                ty: delegate.ty.clone(),
                args,
            },
        )));
    }
    if let Some(stmts) = &function.body {
        body.extend(lowering.block(stmts));
    }
    ctor.body = Some(body);
    ctor
}

fn is_base(init: &MemberInit, primary: Option<&str>) -> bool {
    primary.is_some_and(|p| p == init.member || names::simple_name(p) == names::simple_name(&init.member))
}

/// Value of a member initializer: a single argument is assigned directly,
/// several construct the field's class.
fn member_init(
    init: &MemberInit,
    field_ty: Option<&TypeRef>,
    lowering: &BodyLowering,
    scope: &Scope,
) -> JavaExpr {
    match init.args.as_slice() {
        [single] => lowering.expr(single),
        [] => field_ty
            .map(|ty| lowering.expr(&crate::ir::Expr::Construct {
                ty: ty.value_type().clone(),
                args: Vec::new(),
            }))
            .unwrap_or(JavaExpr::Literal(JavaLiteral::Null)),
        args => {
            let ty = field_ty.cloned().unwrap_or_else(|| TypeRef::named(scope.lookup_scope()));
            lowering.expr(&crate::ir::Expr::Construct {
                ty: ty.value_type().clone(),
                args: args.to_vec(),
            })
        }
    }
}

/// A namespace-level function, as a static member of the utility class.
pub(crate) fn free_function(
    decl: &Declaration,
    function: &Function,
    scope: &Scope,
    cx: &mut Cx,
) -> Result<Option<MethodDecl>, Halt> {
    if let Some(kind) = operator_kind(decl, function) {
        return operator::lower_free(decl, function, kind, scope, cx);
    }
    if function.body.is_none() {
        cx.info(
            ConstructKind::Function,
            &decl.location,
            format!("{} is only declared here; no method emitted", decl.qualified_name),
        );
        return Ok(None);
    }
    let symbols = cx.symbols;
    let mut method = MethodDecl::new(
        names::escape_identifier(&decl.name),
        map_type(&function.return_type, scope, symbols),
        lower_params(&function.params, scope, symbols),
    );
    method.modifiers = Modifiers::public_static();
    method.body = Some(body_or_stub(decl, function, scope, cx));
    Ok(Some(method))
}

/// A namespace-level variable, as a static field of the globals class.
pub(crate) fn global_variable(
    decl: &Declaration,
    field: &Field,
    scope: &Scope,
    cx: &mut Cx,
) -> FieldDecl {
    let ty = map_type(&field.ty, scope, cx.symbols);
    let init = field
        .init
        .as_ref()
        .map(|init| BodyLowering::new(cx, scope, &decl.location).expr(init));
    let mut global = FieldDecl::new(names::escape_identifier(&decl.name), ty, Modifiers::public_static());
    global.modifiers.is_final = matches!(field.ty, TypeRef::Const(_)) && init.is_some();
    global.init = init;
    global
}

pub(crate) fn lower_enum(decl: &Declaration, e: &EnumDecl) -> TypeDecl {
    let mut target = TypeDecl {
        kind: TypeKind::Enum,
        ..TypeDecl::class(names::escape_identifier(&decl.name))
    };
    let valued = e.enumerators.iter().any(|en| en.value.is_some());
    let mut next = 0i64;
    for enumerator in &e.enumerators {
        let value = enumerator.value.unwrap_or(next);
        next = value + 1;
        let args = if valued {
            vec![JavaExpr::Literal(JavaLiteral::Int(value))]
        } else {
            Vec::new()
        };
        target.constants.push(EnumConstant {
            name: names::escape_identifier(&enumerator.name),
            args,
        });
    }
    if valued {
        let int = JavaType::primitive("int");
        let mut value = FieldDecl::new("value", int.clone(), Modifiers::private());
        value.modifiers.is_final = true;
        target.fields.push(value);

        let mut ctor = MethodDecl::constructor(
            target.name.clone(),
            vec![crate::target::Param::new("value", int.clone())],
        )
        .with_body(vec![JavaStmt::expr(JavaExpr::assign(
            JavaExpr::this_field("value"),
            JavaExpr::ident("value"),
        ))]);
        ctor.modifiers = Modifiers::private();
        target.methods.push(ctor);
        target.methods.push(
            MethodDecl::new("getValue", int, Vec::new())
                .with_body(vec![JavaStmt::Return(Some(JavaExpr::ident("value")))]),
        );
    }
    target
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BaseRef, DeclId, Enumerator, Expr, MemberInit, Stmt, TranslationUnit};
    use crate::transform::test_support::{lower_one, symbols_for};
    use normalize_transpile_report::{Mode, Severity};

    fn field(id: u32, name: &str, ty: &str) -> Declaration {
        Declaration::new(DeclId(id), name, DeclKind::Field(Field::new(ty.parse().unwrap())))
    }

    fn class_with(name: &str, bases: &[&str], children: Vec<Declaration>) -> Declaration {
        let class = ClassLike {
            bases: bases.iter().map(|b| BaseRef::new(*b)).collect(),
            ..ClassLike::default()
        };
        Declaration::new(DeclId(100), name, DeclKind::ClassLike(class)).with_children(children)
    }

    #[test]
    fn single_base_extends_without_interfaces() {
        let base = class_with("Shape", &[], vec![]);
        let circle = class_with("Circle", &["Shape"], vec![field(1, "radius", "double")]);
        let unit = TranslationUnit::new("shapes.cpp", vec![base, circle.clone()]);
        let symbols = symbols_for(&[unit]);
        let (files, diags) = lower_one(&circle, &symbols, Mode::Strict);
        let files = files.unwrap();
        assert_eq!(files.len(), 1);
        let decl = &files[0].decl;
        assert_eq!(decl.extends, Some(JavaType::class("", "Shape")));
        assert!(decl.implements.is_empty());
        assert_eq!(decl.fields.len(), 1);
        assert!(diags.is_empty());
    }

    #[test]
    fn constructor_initializers_assign_fields() {
        let mut ctor = Function::new(
            FunctionRole::Constructor,
            TypeRef::Void,
            vec![Param::new("r", TypeRef::primitive("double"))],
        )
        .with_body(vec![]);
        ctor.initializers = vec![
            MemberInit {
                member: "Shape".into(),
                args: vec![Expr::string("circle")],
                is_base: true,
            },
            MemberInit {
                member: "radius".into(),
                args: vec![Expr::ident("r")],
                is_base: false,
            },
        ];
        let circle = class_with(
            "Circle",
            &["Shape"],
            vec![
                field(1, "radius", "const double"),
                Declaration::new(DeclId(2), "Circle", DeclKind::Function(ctor)),
            ],
        );
        let unit = TranslationUnit::new("shapes.cpp", vec![class_with("Shape", &[], vec![]), circle.clone()]);
        let symbols = symbols_for(&[unit]);
        let (files, _) = lower_one(&circle, &symbols, Mode::Strict);
        let files = files.unwrap();
        let decl = &files[0].decl;
        assert!(decl.field("radius").unwrap().modifiers.is_final);
        let body = decl.methods[0].body.as_ref().unwrap();
        assert!(matches!(&body[0], JavaStmt::Expr(JavaExpr::Call { name, .. }) if name == "super"));
        assert!(matches!(&body[1], JavaStmt::Expr(JavaExpr::Assign { .. })));
    }

    #[test]
    fn destructor_becomes_close() {
        let dtor = Function::new(FunctionRole::Destructor, TypeRef::Void, vec![]).with_body(vec![
            Stmt::expr(Expr::Call {
                callee: "fclose".into(),
                args: vec![Expr::ident("handle")],
            }),
        ]);
        let file = class_with(
            "File",
            &[],
            vec![
                field(1, "handle", "void*"),
                Declaration::new(DeclId(2), "~File", DeclKind::Function(dtor)),
            ],
        );
        let symbols = symbols_for(&[TranslationUnit::new("io.cpp", vec![file.clone()])]);
        let (files, _) = lower_one(&file, &symbols, Mode::Strict);
        let files = files.unwrap();
        let decl = &files[0].decl;
        assert_eq!(decl.implements, [JavaType::simple("AutoCloseable")]);
        let close = decl.method("close").unwrap();
        assert!(close.is_override);
    }

    #[test]
    fn missing_method_definition_is_a_manual_stub() {
        let area = Function::new(FunctionRole::Method, TypeRef::primitive("double"), vec![]);
        let shape = class_with(
            "Circle",
            &[],
            vec![Declaration::new(DeclId(1), "area", DeclKind::Function(area))],
        );
        let symbols = symbols_for(&[]);
        let (files, diags) = lower_one(&shape, &symbols, Mode::Strict);
        assert!(files.unwrap()[0].decl.method("area").unwrap().is_stub());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].severity, Severity::Warning);
        assert!(diags[0].manual_fix_required);
    }

    #[test]
    fn valued_enum_carries_values() {
        let e = EnumDecl {
            enumerators: vec![
                Enumerator { name: "Red".into(), value: Some(1) },
                Enumerator { name: "Green".into(), value: None },
            ],
            scoped: true,
        };
        let decl = Declaration::new(DeclId(1), "Color", DeclKind::Enum(e.clone()));
        let target = lower_enum(&decl, &e);
        assert_eq!(target.kind, TypeKind::Enum);
        assert_eq!(target.constants[1].args, [JavaExpr::Literal(JavaLiteral::Int(2))]);
        assert!(target.method("getValue").is_some());
    }

    #[test]
    fn free_functions_land_in_util() {
        let f = Function::new(FunctionRole::Free, TypeRef::primitive("int"), vec![])
            .with_body(vec![Stmt::ret(Some(Expr::int(1)))]);
        let decl = Declaration::new(DeclId(1), "answer", DeclKind::Function(f));
        let symbols = symbols_for(&[]);
        let (files, _) = lower_one(&decl, &symbols, Mode::Strict);
        let files = files.unwrap();
        let util = &files[0].decl;
        assert_eq!(util.name, "Util");
        assert!(util.modifiers.is_final);
        let answer = util.method("answer").unwrap();
        assert!(answer.modifiers.is_static);
    }
}
