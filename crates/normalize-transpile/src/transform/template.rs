//! Class and function templates.
//!
//! Type parameters become generic parameters. Each specialization becomes
//! its own concretely named class (or overload), and the primary template
//! stays as the generic fallback.

use super::class::{self, Shape, body_or_stub, lower_params, visibility};
use super::types::map_type;
use super::{Cx, Halt, Holder, Lowered, Member, Output, Scope};
use crate::ir::{
    DeclKind, Declaration, Expr, ExternalSpecialization, Function, Specialization,
    TemplateDecl, TemplateParam, TypeRef, UnaryOp,
};
use crate::names;
use crate::target::{FieldDecl, JavaType, MethodDecl, Modifiers, TypeParam};
use normalize_transpile_report::ConstructKind;
use std::collections::BTreeSet;

/// How a template body uses one type parameter.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Usage {
    arithmetic: bool,
    pointer: bool,
}

pub(crate) fn lower(
    decl: &Declaration,
    template: &TemplateDecl,
    scope: &Scope,
    cx: &mut Cx,
    out: &mut Output,
) -> Result<(), Halt> {
    match template.pattern.kind {
        DeclKind::Function(_) => {
            for method in generic_methods(decl, template, scope, cx)? {
                out.push_member(&scope.package, Holder::Util, Member::Method(method));
            }
        }
        _ => {
            for lowered in class_templates(decl, template, scope, cx)? {
                out.push_class(&scope.package, lowered);
            }
        }
    }
    Ok(())
}

/// The generic class followed by one class per in-unit specialization.
pub(crate) fn class_templates(
    decl: &Declaration,
    template: &TemplateDecl,
    scope: &Scope,
    cx: &mut Cx,
) -> Result<Vec<Lowered>, Halt> {
    let pattern = template.pattern.as_ref();
    let DeclKind::ClassLike(class) = &pattern.kind else {
        return Ok(Vec::new());
    };

    let mut shape = Shape::plain(decl);
    for param in &template.params {
        match &param.value_type {
            None => {
                let mut generic = TypeParam::new(param.name.clone());
                let usage = usage(pattern, &param.name);
                if usage.arithmetic {
                    cx.error(
                        ConstructKind::Template,
                        &decl.location,
                        format!(
                            "arithmetic on type parameter {} of {} has no generic equivalent",
                            param.name, decl.name
                        ),
                    )?;
                    generic.bound = Some(JavaType::simple("Number"));
                    shape.notes.push(format!(
                        "MANUAL FIX: {} is bounded by Number; arithmetic needs explicit conversions",
                        param.name
                    ));
                }
                if usage.pointer {
                    pointer_warning(decl, &param.name, cx);
                }
                shape.type_params.push(generic);
            }
            Some(ty) => {
                cx.warn(
                    ConstructKind::Template,
                    &decl.location,
                    format!(
                        "non-type template parameter {} of {} is lowered to an instance field",
                        param.name, decl.name
                    ),
                );
                shape.value_fields.push(FieldDecl::new(
                    names::escape_identifier(&param.name),
                    map_type(ty, scope, cx.symbols),
                    Modifiers::private(),
                ));
            }
        }
    }

    let specializations = specializations_in_unit(template);
    if !specializations.is_empty() {
        cx.warn(
            ConstructKind::Specialization,
            &decl.location,
            format!(
                "{} has {} specialization(s) emitted as separate classes; review call sites relying on compile-time selection",
                decl.name,
                specializations.len()
            ),
        );
        shape.notes.push(format!(
            "Specializations of {} are emitted as separate classes; selection between them needs manual review",
            decl.name
        ));
    }

    let mut lowered = vec![class::lower(pattern, class, scope, cx, shape)?];
    for spec in specializations {
        if let Some(spec_class) = specialization_class(&decl.name, spec, scope, cx)? {
            lowered.push(spec_class);
        }
    }
    Ok(lowered)
}

fn specializations_in_unit(template: &TemplateDecl) -> Vec<&Specialization> {
    template
        .specializations
        .iter()
        .filter(|s| matches!(s.decl.kind, DeclKind::ClassLike(_)))
        .collect()
}

fn pointer_warning(decl: &Declaration, param: &str, cx: &mut Cx) {
    cx.warn(
        ConstructKind::Template,
        &decl.location,
        format!(
            "pointer to type parameter {} in {} is erased to a reference",
            param, decl.name
        ),
    );
}

/// A class specialization as its own class.
fn specialization_class(
    template: &str,
    spec: &Specialization,
    scope: &Scope,
    cx: &mut Cx,
) -> Result<Option<Lowered>, Halt> {
    let DeclKind::ClassLike(class) = &spec.decl.kind else {
        return Ok(None);
    };
    let name = names::specialization_name(template, &spec.args, &spec.params);
    let args: Vec<String> = spec.args.iter().map(ToString::to_string).collect();
    let shape = Shape {
        name: names::escape_identifier(&name),
        type_params: spec
            .params
            .iter()
            .filter(|p| p.is_type())
            .map(|p| TypeParam::new(p.name.clone()))
            .collect(),
        notes: vec![format!(
            "{} specialization of {}<{}>",
            if spec.partial { "Partial" } else { "Full" },
            names::simple_name(template),
            args.join(", ")
        )],
        value_fields: Vec::new(),
    };
    tracing::debug!(template, class = %shape.name, "specialization class");
    class::lower(&spec.decl, class, scope, cx, shape).map(Some)
}

/// A function template as a generic method, plus one overload per specialization.
pub(crate) fn generic_methods(
    decl: &Declaration,
    template: &TemplateDecl,
    scope: &Scope,
    cx: &mut Cx,
) -> Result<Vec<MethodDecl>, Halt> {
    let pattern = template.pattern.as_ref();
    let DeclKind::Function(function) = &pattern.kind else {
        return Ok(Vec::new());
    };

    let type_params: Vec<&TemplateParam> = template.params.iter().filter(|p| p.is_type()).collect();
    let generic_scope = scope
        .clone()
        .with_type_params(type_params.iter().map(|p| p.name.clone()));
    let mut generics = Vec::new();
    for param in &type_params {
        let mut generic = TypeParam::new(param.name.clone());
        let usage = usage(pattern, &param.name);
        if usage.arithmetic {
            cx.error(
                ConstructKind::Template,
                &decl.location,
                format!(
                    "arithmetic on type parameter {} of {} has no generic equivalent",
                    param.name, decl.name
                ),
            )?;
            generic.bound = Some(JavaType::simple("Number"));
        }
        if usage.pointer {
            pointer_warning(decl, &param.name, cx);
        }
        generics.push(generic);
    }

    let symbols = cx.symbols;
    let mut params = Vec::new();
    for value in template.params.iter().filter(|p| !p.is_type()) {
        cx.warn(
            ConstructKind::Template,
            &decl.location,
            format!(
                "non-type template parameter {} of {} is passed as an argument",
                value.name, decl.name
            ),
        );
        if let Some(ty) = &value.value_type {
            params.push(crate::target::Param::new(
                names::escape_identifier(&value.name),
                map_type(ty, scope, symbols),
            ));
        }
    }
    params.extend(lower_params(&function.params, &generic_scope, symbols));

    let mut generic = MethodDecl::new(
        names::escape_identifier(&decl.name),
        map_type(&function.return_type, &generic_scope, symbols),
        params,
    );
    generic.type_params = generics;
    generic.modifiers = method_modifiers(function, scope);
    generic.body = Some(body_or_stub(pattern, function, &generic_scope, cx));

    let mut methods = vec![generic];
    for spec in &template.specializations {
        if let DeclKind::Function(f) = &spec.decl.kind {
            methods.push(overload(&decl.name, &spec.decl, f, scope, cx));
        }
    }
    Ok(methods)
}

fn method_modifiers(function: &Function, scope: &Scope) -> Modifiers {
    if scope.class.is_none() {
        return Modifiers::public_static();
    }
    Modifiers {
        visibility: visibility(function.access),
        is_static: function.is_static,
        ..Modifiers::default()
    }
}

/// Function specialization as a concrete overload.
fn overload(name: &str, decl: &Declaration, function: &Function, scope: &Scope, cx: &mut Cx) -> MethodDecl {
    let symbols = cx.symbols;
    let mut method = MethodDecl::new(
        names::escape_identifier(name),
        map_type(&function.return_type, scope, symbols),
        lower_params(&function.params, scope, symbols),
    );
    method.modifiers = method_modifiers(function, scope);
    method.body = Some(body_or_stub(decl, function, scope, cx));
    method
}

/// Specializations declared in another unit than their template.
pub(crate) fn lower_external(
    external: &ExternalSpecialization,
    cx: &mut Cx,
    out: &mut Output,
) -> Result<(), Halt> {
    let symbols = cx.symbols;
    let Some(symbol) = symbols.get(&external.template) else {
        cx.warn(
            ConstructKind::Specialization,
            &external.specialization.decl.location,
            format!("specialization of unknown template {}", external.template),
        );
        return Ok(());
    };
    let scope = Scope::namespace(&symbol.namespace, symbol.package.clone());
    let spec = &external.specialization;
    match &spec.decl.kind {
        DeclKind::Function(f) => {
            let method = overload(&symbol.decl.name, &spec.decl, f, &scope, cx);
            out.push_member(&scope.package, Holder::Util, Member::Method(method));
        }
        _ => {
            if let Some(lowered) = specialization_class(&external.template, spec, &scope, cx)? {
                out.push_class(&scope.package, lowered);
            }
        }
    }
    Ok(())
}

/// Scan a template pattern for arithmetic and pointer use of `param`.
fn usage(pattern: &Declaration, param: &str) -> Usage {
    let mut usage = Usage::default();
    let fields: BTreeSet<&str> = pattern
        .fields()
        .filter(|(_, f)| f.ty.value_type().as_named().is_some_and(|(n, _)| n == param))
        .map(|(d, _)| d.name.as_str())
        .collect();
    usage.pointer = pattern.fields().any(|(_, f)| f.ty.points_to(param));

    let functions: Vec<&Function> = match &pattern.kind {
        DeclKind::Function(f) => vec![f],
        _ => pattern.methods().map(|(_, f)| f).collect(),
    };
    for function in functions {
        let is_param_type = |ty: &TypeRef| ty.value_type().as_named().is_some_and(|(n, _)| n == param);
        let mut typed: BTreeSet<&str> = fields.clone();
        typed.extend(
            function
                .params
                .iter()
                .filter(|p| is_param_type(&p.ty))
                .map(|p| p.name.as_str()),
        );
        usage.pointer |= function.return_type.points_to(param)
            || function.params.iter().any(|p| p.ty.points_to(param));
        let Some(body) = &function.body else {
            continue;
        };
        for stmt in body {
            stmt.walk_locals(&mut |name, ty| {
                if is_param_type(ty) {
                    typed.insert(name);
                }
                usage.pointer |= ty.points_to(param);
            });
        }
        for stmt in body {
            stmt.walk_exprs(&mut |e| {
                usage.arithmetic |= is_arithmetic_on(e, &typed);
            });
        }
    }
    usage
}

fn is_arithmetic_on(expr: &Expr, typed: &BTreeSet<&str>) -> bool {
    let is_typed = |e: &Expr| match e {
        Expr::Ident { name } => typed.contains(name.as_str()),
        Expr::Member { object, member } => {
            matches!(object.as_ref(), Expr::This) && typed.contains(member.as_str())
        }
        _ => false,
    };
    match expr {
        Expr::Binary { op, left, right } => op.is_arithmetic() && (is_typed(left) || is_typed(right)),
        Expr::Unary {
            op: UnaryOp::Neg | UnaryOp::Inc | UnaryOp::Dec,
            operand,
        } => is_typed(operand),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryOp, ClassLike, DeclId, Field, FunctionRole, Param, Stmt, TranslationUnit};
    use crate::transform::test_support::{lower_one, symbols_for};
    use normalize_transpile_report::{Mode, Severity};

    fn template_class(body: Vec<Stmt>, specializations: Vec<Specialization>) -> Declaration {
        let get = Function::new(FunctionRole::Method, "T".parse().unwrap(), vec![])
            .with_body(body);
        let pattern = Declaration::new(
            DeclId(2),
            "Box",
            DeclKind::ClassLike(ClassLike {
                template_params: vec![TemplateParam::type_param("T")],
                ..ClassLike::default()
            }),
        )
        .with_children(vec![
            Declaration::new(DeclId(3), "value", DeclKind::Field(Field::new("T".parse().unwrap()))),
            Declaration::new(DeclId(4), "get", DeclKind::Function(get)),
        ]);
        Declaration::new(
            DeclId(1),
            "Box",
            DeclKind::Template(TemplateDecl {
                params: vec![TemplateParam::type_param("T")],
                pattern: Box::new(pattern),
                specializations,
            }),
        )
    }

    fn int_box() -> Specialization {
        Specialization {
            args: vec![TypeRef::primitive("int")],
            partial: false,
            params: vec![],
            decl: Declaration::new(DeclId(5), "Box", DeclKind::ClassLike(ClassLike::default())),
        }
    }

    #[test]
    fn type_parameters_become_generics() {
        let decl = template_class(vec![Stmt::ret(Some(Expr::ident("value")))], vec![]);
        let symbols = symbols_for(&[TranslationUnit::new("box.cpp", vec![decl.clone()])]);
        let (files, diags) = lower_one(&decl, &symbols, Mode::Strict);
        let files = files.unwrap();
        let class = &files[0].decl;
        assert_eq!(class.type_params, [TypeParam::new("T")]);
        assert_eq!(class.field("value").unwrap().ty, JavaType::simple("T"));
        assert!(diags.is_empty());
    }

    #[test]
    fn specializations_become_named_classes() {
        let decl = template_class(vec![Stmt::ret(Some(Expr::ident("value")))], vec![int_box()]);
        let symbols = symbols_for(&[TranslationUnit::new("box.cpp", vec![decl.clone()])]);
        let (files, diags) = lower_one(&decl, &symbols, Mode::Flexible);
        let files = files.unwrap();
        let names: Vec<_> = files.iter().map(|f| f.decl.name.as_str()).collect();
        assert_eq!(names, ["Box", "BoxInt"]);
        assert!(!files[0].decl.notes.is_empty());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].construct, ConstructKind::Specialization);
    }

    #[test]
    fn arithmetic_on_parameter_is_an_error() {
        let doubled = vec![Stmt::ret(Some(Expr::binary(
            Expr::ident("value"),
            BinaryOp::Add,
            Expr::ident("value"),
        )))];
        let decl = template_class(doubled, vec![]);
        let symbols = symbols_for(&[TranslationUnit::new("box.cpp", vec![decl.clone()])]);

        let (files, diags) = lower_one(&decl, &symbols, Mode::Flexible);
        let files = files.unwrap();
        assert_eq!(
            files[0].decl.type_params[0].bound,
            Some(JavaType::simple("Number"))
        );
        assert_eq!(diags[0].severity, Severity::Error);

        let (strict, _) = lower_one(&decl, &symbols, Mode::Strict);
        assert!(strict.is_err());
    }

    fn template_with_fields(params: Vec<TemplateParam>, fields: &[(&str, &str)]) -> Declaration {
        let children = fields
            .iter()
            .enumerate()
            .map(|(i, (name, ty))| {
                Declaration::new(DeclId(10 + i as u32), *name, DeclKind::Field(Field::new(ty.parse().unwrap())))
            })
            .collect();
        let pattern = Declaration::new(
            DeclId(2),
            "Buffer",
            DeclKind::ClassLike(ClassLike {
                template_params: params.clone(),
                ..ClassLike::default()
            }),
        )
        .with_children(children);
        Declaration::new(
            DeclId(1),
            "Buffer",
            DeclKind::Template(TemplateDecl {
                params,
                pattern: Box::new(pattern),
                specializations: vec![],
            }),
        )
    }

    #[test]
    fn pointer_to_parameter_warns() {
        let decl = template_with_fields(vec![TemplateParam::type_param("T")], &[("head", "T*")]);
        let symbols = symbols_for(&[TranslationUnit::new("buffer.cpp", vec![decl.clone()])]);
        let (files, diags) = lower_one(&decl, &symbols, Mode::Strict);
        let files = files.unwrap();
        assert_eq!(files[0].decl.type_params, [TypeParam::new("T")]);
        assert!(diags.iter().all(|d| d.severity < Severity::Error));
        assert!(diags.iter().any(|d| d.severity == Severity::Warning
            && d.construct == ConstructKind::Template
            && d.message.contains("pointer to type parameter T")));
    }

    #[test]
    fn non_type_parameter_becomes_field() {
        let size = TemplateParam {
            name: "N".into(),
            value_type: Some(TypeRef::primitive("int")),
        };
        let decl = template_with_fields(vec![TemplateParam::type_param("T"), size], &[("first", "T")]);
        let symbols = symbols_for(&[TranslationUnit::new("buffer.cpp", vec![decl.clone()])]);
        let (files, diags) = lower_one(&decl, &symbols, Mode::Strict);
        let files = files.unwrap();
        let class = &files[0].decl;
        assert_eq!(class.type_params, [TypeParam::new("T")]);
        assert_eq!(class.field("N").unwrap().ty, JavaType::primitive("int"));
        assert!(diags.iter().any(|d| d.severity == Severity::Warning
            && d.message.contains("non-type template parameter N")));
    }

    #[test]
    fn function_template_is_generic_static_method() {
        let max = Function::new(
            FunctionRole::Free,
            "const T&".parse().unwrap(),
            vec![
                Param::new("a", "const T&".parse().unwrap()),
                Param::new("b", "const T&".parse().unwrap()),
            ],
        )
        .with_body(vec![Stmt::ret(Some(Expr::ident("a")))]);
        let decl = Declaration::new(
            DeclId(1),
            "pick",
            DeclKind::Template(TemplateDecl {
                params: vec![TemplateParam::type_param("T")],
                pattern: Box::new(Declaration::new(DeclId(2), "pick", DeclKind::Function(max))),
                specializations: vec![],
            }),
        );
        let symbols = symbols_for(&[]);
        let (files, _) = lower_one(&decl, &symbols, Mode::Strict);
        let files = files.unwrap();
        let pick = files[0].decl.method("pick").unwrap();
        assert_eq!(pick.type_params.len(), 1);
        assert!(pick.modifiers.is_static);
        assert_eq!(pick.params[0].ty, JavaType::simple("T"));
    }
}
