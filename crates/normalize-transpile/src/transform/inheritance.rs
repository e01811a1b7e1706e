//! Multiple inheritance: interface extraction plus delegation.
//!
//! The primary base stays a superclass. Each secondary base contributes a
//! generated interface with its method signatures, which the derived class
//! implements by forwarding to a delegate field holding the base's
//! implementation. Two secondaries declaring the same signature conflict.

use super::class::param_name;
use super::types::{is_value_argument, map_type, substitute};
use super::{ClassScope, Cx, Halt, Scope};
use crate::ir::{Access, BaseRef, ClassLike, Declaration, Function, FunctionRole, OperatorKind, TypeRef};
use crate::names;
use crate::symbols::{Symbol, SymbolTable};
use crate::target::{JavaExpr, JavaStmt, JavaType, MethodDecl, Modifiers, Param, TypeDecl, TypeParam};
use normalize_transpile_report::{ConstructKind, Diagnostic};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Field holding a secondary base's implementation.
#[derive(Debug, Clone)]
pub(crate) struct Delegate {
    /// Base name as written in the base list
    pub base: String,
    pub field: String,
    pub ty: JavaType,
    /// Abstract bases cannot be instantiated; the field is left for manual setup
    pub is_abstract: bool,
}

/// Everything the secondary bases add to a derived class.
#[derive(Debug, Default)]
pub(crate) struct Secondaries {
    pub implements: Vec<JavaType>,
    pub delegates: Vec<Delegate>,
    pub methods: Vec<MethodDecl>,
    /// Generated interfaces with their packages
    pub interfaces: Vec<(String, TypeDecl)>,
}

struct Resolved<'s> {
    base: &'s BaseRef,
    symbol: &'s Symbol,
    bindings: BTreeMap<String, TypeRef>,
    /// Scope of the base's own declaration
    scope: Scope,
    interface: String,
    /// Instance methods of the base and its ancestors, nearest first
    members: Vec<Member<'s>>,
}

/// A method reachable through a secondary base.
struct Member<'s> {
    decl: &'s Declaration,
    function: &'s Function,
    /// Ancestor parameters in terms of the secondary base's own parameters
    lineage: BTreeMap<String, TypeRef>,
    /// Scope of the declaring class
    scope: Scope,
}

impl Member<'_> {
    fn lift(&self, ty: &TypeRef) -> TypeRef {
        substitute(ty, &self.lineage)
    }

    fn is_interface_method(&self) -> bool {
        let f = self.function;
        f.role == FunctionRole::Method
            && !f.is_static
            && f.access == Access::Public
            && self.decl.capabilities.operator.is_none()
            && OperatorKind::from_name(&self.decl.name, f.params.len()).is_none()
    }
}

impl Resolved<'_> {
    /// Signature key with template arguments substituted.
    fn key(&self, member: &Member) -> String {
        let params: Vec<String> = member
            .function
            .params
            .iter()
            .map(|p| substitute(&member.lift(&p.ty), &self.bindings).value_type().to_string())
            .collect();
        format!("{}({})", member.decl.name, params.join(", "))
    }

    fn interface_methods(&self) -> impl Iterator<Item = &Member<'_>> {
        self.members.iter().filter(|m| m.is_interface_method())
    }

    /// Interface signature, generic over the base's own parameters.
    fn interface_method(&self, member: &Member, symbols: &SymbolTable) -> MethodDecl {
        let returns = map_type(&member.lift(&member.function.return_type), &member.scope, symbols);
        let params = member
            .function
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| Param::new(param_name(p, i), map_type(&member.lift(&p.ty), &member.scope, symbols)))
            .collect();
        let mut method = MethodDecl::new(names::escape_identifier(&member.decl.name), returns, params);
        method.body = None;
        method
    }

    /// Signature of a base method as seen by the derived class.
    fn concrete_method(&self, member: &Member, symbols: &SymbolTable) -> MethodDecl {
        let concrete = |ty: &TypeRef| substitute(&member.lift(ty), &self.bindings);
        let returns = map_type(&concrete(&member.function.return_type), &member.scope, symbols);
        let params = member
            .function
            .params
            .iter()
            .enumerate()
            .map(|(i, p)| Param::new(param_name(p, i), map_type(&concrete(&p.ty), &member.scope, symbols)))
            .collect();
        MethodDecl::new(names::escape_identifier(&member.decl.name), returns, params)
    }
}

pub(crate) fn lower(
    decl: &Declaration,
    class: &ClassLike,
    scope: &Scope,
    cx: &mut Cx,
) -> Result<Secondaries, Halt> {
    let symbols = cx.symbols;
    let mut out = Secondaries::default();

    let mut resolved = Vec::new();
    for base in class.secondary_bases() {
        match resolve(base, scope, symbols) {
            Some(r) => resolved.push(r),
            None => cx.error(
                ConstructKind::MultipleInheritance,
                &decl.location,
                format!(
                    "secondary base {} of {} cannot be resolved",
                    base.name, decl.name
                ),
            )?,
        }
    }

    let own: BTreeSet<String> = decl
        .methods()
        .map(|(d, f)| f.signature_key(&d.name))
        .collect();

    // Signature to the secondaries declaring it
    let mut declared: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (i, r) in resolved.iter().enumerate() {
        for m in r.interface_methods() {
            let owners = declared.entry(r.key(m)).or_default();
            if !owners.contains(&i) {
                owners.push(i);
            }
        }
    }
    let conflicts: BTreeMap<&String, &Vec<usize>> = declared
        .iter()
        .filter(|(key, owners)| owners.len() > 1 && !own.contains(*key))
        .collect();
    for (key, owners) in &conflicts {
        let bases: Vec<&str> = owners.iter().map(|&i| resolved[i].base.name.as_str()).collect();
        let mut diag = Diagnostic::error(
            ConstructKind::MultipleInheritance,
            format!(
                "{} inherits {} from {}; manual resolution required",
                decl.name,
                key,
                bases.join(" and ")
            ),
        )
        .at(decl.location.clone());
        for base in &bases {
            diag = diag.with_related(*base);
        }
        cx.report(diag)?;
    }

    for (i, r) in resolved.iter().enumerate() {
        let mut interface = TypeDecl::interface(r.interface.clone());
        interface.type_params = r.scope.type_params.iter().map(TypeParam::new).collect();
        interface.notes.push(format!("Extracted from {}", r.symbol.decl.qualified_name));
        for m in r.interface_methods() {
            interface.push_method(r.interface_method(m, symbols));
        }
        tracing::debug!(class = %decl.qualified_name, interface = %r.interface, "extracted interface");

        let args: Vec<JavaType> = r
            .base
            .args
            .iter()
            .filter(|a| !is_value_argument(a))
            .map(|a| map_type(a, scope, symbols).boxed())
            .collect();
        out.implements
            .push(JavaType::class(&r.symbol.package, &r.interface).with_args(args));
        out.interfaces.push((r.symbol.package.clone(), interface));

        let delegate = delegate(r, scope, symbols);
        if delegate.is_abstract {
            cx.warn_manual(
                ConstructKind::MultipleInheritance,
                &decl.location,
                format!(
                    "{} is abstract; {}.{} must be assigned an implementation manually",
                    r.base.name, decl.name, delegate.field
                ),
            );
        }

        for m in r.interface_methods() {
            let key = r.key(m);
            if own.contains(&key) {
                continue;
            }
            if let Some(&owners) = conflicts.get(&key) {
                // One stub per conflict, emitted with the first owner
                if owners.first() == Some(&i) {
                    let stub = r.concrete_method(m, symbols);
                    let message = format!("manual resolution required: {key} is inherited from several bases");
                    out.methods.push(
                        MethodDecl::stub(stub.name, stub.return_type.unwrap_or(JavaType::Void), stub.params, message)
                            .overriding(),
                    );
                }
                continue;
            }
            if let Some(primary) = class.primary_base() {
                if primary_declares(primary, &key, scope, symbols) {
                    cx.warn(
                        ConstructKind::MultipleInheritance,
                        &decl.location,
                        format!(
                            "{} of {} shadows the method inherited from {}; the superclass method is kept",
                            key, r.base.name, primary.name
                        ),
                    );
                    continue;
                }
            }
            out.methods.push(forward(r.concrete_method(m, symbols), &delegate.field));
        }
        out.delegates.push(delegate);
    }
    Ok(out)
}

fn resolve<'s>(base: &'s BaseRef, scope: &Scope, symbols: &'s SymbolTable) -> Option<Resolved<'s>> {
    let symbol = symbols.resolve(&base.name, scope.lookup_scope())?;
    let decl = symbols.class(&symbol.decl.qualified_name)?;
    let params = symbols
        .template_params(&symbol.decl.qualified_name)
        .unwrap_or(&[]);
    let bindings = params
        .iter()
        .zip(&base.args)
        .filter(|(p, _)| p.is_type())
        .map(|(p, a)| (p.name.clone(), a.clone()))
        .collect();
    let interface = format!(
        "{}{}",
        symbols.naming().interface_prefix,
        symbol.target_name.replace('.', "")
    );
    let scope = declaring_scope(symbol, symbols);
    let members = reachable_methods(decl, &scope, symbols);
    Some(Resolved {
        base,
        symbol,
        bindings,
        scope,
        interface,
        members,
    })
}

fn declaring_scope(symbol: &Symbol, symbols: &SymbolTable) -> Scope {
    Scope {
        namespace: symbol.namespace.clone(),
        package: symbol.package.clone(),
        class: Some(ClassScope {
            qualified: symbol.decl.qualified_name.clone(),
            ..ClassScope::default()
        }),
        type_params: symbols
            .template_params(&symbol.decl.qualified_name)
            .unwrap_or(&[])
            .iter()
            .filter(|p| p.is_type())
            .map(|p| p.name.clone())
            .collect(),
    }
}

/// Instance methods of `decl` and every ancestor, breadth first. A signature
/// already seen closer to `decl` hides the ancestor's declaration.
fn reachable_methods<'s>(decl: &'s Declaration, scope: &Scope, symbols: &'s SymbolTable) -> Vec<Member<'s>> {
    let mut out: Vec<Member<'s>> = Vec::new();
    let mut keys = BTreeSet::new();
    let mut visited = BTreeSet::from([decl.qualified_name.clone()]);
    let mut queue = VecDeque::from([(decl, scope.clone(), BTreeMap::new())]);
    while let Some((class_decl, class_scope, lineage)) = queue.pop_front() {
        for (d, f) in class_decl.methods() {
            if f.role != FunctionRole::Method || f.is_static {
                continue;
            }
            let member = Member {
                decl: d,
                function: f,
                lineage: lineage.clone(),
                scope: class_scope.clone(),
            };
            let params: Vec<String> = f
                .params
                .iter()
                .map(|p| member.lift(&p.ty).value_type().to_string())
                .collect();
            if keys.insert(format!("{}({})", d.name, params.join(", "))) {
                out.push(member);
            }
        }
        let Some(class) = class_decl.as_class() else {
            continue;
        };
        for base in &class.bases {
            let Some(symbol) = symbols.resolve(&base.name, class_scope.lookup_scope()) else {
                continue;
            };
            if !visited.insert(symbol.decl.qualified_name.clone()) {
                continue;
            }
            let Some(base_decl) = symbols.class(&symbol.decl.qualified_name) else {
                continue;
            };
            let base_lineage = symbols
                .template_params(&symbol.decl.qualified_name)
                .unwrap_or(&[])
                .iter()
                .zip(&base.args)
                .filter(|(p, _)| p.is_type())
                .map(|(p, a)| (p.name.clone(), substitute(a, &lineage)))
                .collect();
            let mut base_scope = declaring_scope(symbol, symbols);
            base_scope.type_params.extend(scope.type_params.iter().cloned());
            queue.push_back((base_decl, base_scope, base_lineage));
        }
    }
    out
}

fn delegate(r: &Resolved, scope: &Scope, symbols: &SymbolTable) -> Delegate {
    let ty = map_type(
        &TypeRef::Named {
            name: r.base.name.clone(),
            args: r.base.args.clone(),
        },
        scope,
        symbols,
    );
    Delegate {
        base: r.base.name.clone(),
        field: format!("{}Delegate", names::lower_camel(names::simple_name(&r.base.name))),
        ty,
        is_abstract: r.members.iter().any(|m| m.function.is_pure),
    }
}

/// True if the primary base or one of its ancestors declares `key`.
fn primary_declares(primary: &BaseRef, key: &str, scope: &Scope, symbols: &SymbolTable) -> bool {
    let Some(symbol) = symbols.resolve(&primary.name, scope.lookup_scope()) else {
        return false;
    };
    let qualified = &symbol.decl.qualified_name;
    symbols
        .class(qualified)
        .is_some_and(|d| d.methods().any(|(m, f)| f.signature_key(&m.name) == key))
        || symbols.inherits_method(qualified, key)
}

/// Delegating method: forward the call to the delegate field.
fn forward(method: MethodDecl, field: &str) -> MethodDecl {
    let args = method
        .params
        .iter()
        .map(|p| JavaExpr::ident(p.name.clone()))
        .collect();
    let call = JavaExpr::call(JavaExpr::this_field(field), method.name.clone(), args);
    let returns_value = method.return_type.as_ref().is_some_and(|t| !t.is_void());
    let body = if returns_value {
        vec![JavaStmt::Return(Some(call))]
    } else {
        vec![JavaStmt::expr(call)]
    };
    MethodDecl {
        modifiers: Modifiers::public(),
        ..method
    }
    .with_body(body)
    .overriding()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{DeclId, DeclKind, TranslationUnit};
    use crate::transform::test_support::symbols_for;
    use normalize_transpile_report::{Mode, Severity};

    fn method(id: u32, name: &str) -> Declaration {
        Declaration::new(
            DeclId(id),
            name,
            DeclKind::Function(Function::new(FunctionRole::Method, TypeRef::primitive("int"), vec![])),
        )
    }

    fn class(id: u32, name: &str, bases: &[&str], methods: Vec<Declaration>) -> Declaration {
        let class = ClassLike {
            bases: bases.iter().map(|b| BaseRef::new(*b)).collect(),
            ..ClassLike::default()
        };
        Declaration::new(DeclId(id), name, DeclKind::ClassLike(class)).with_children(methods)
    }

    fn derived_scope(name: &str) -> Scope {
        Scope {
            class: Some(ClassScope {
                qualified: name.to_string(),
                ..ClassScope::default()
            }),
            ..Scope::default()
        }
    }

    #[test]
    fn each_secondary_gets_interface_and_delegate() {
        let unit = TranslationUnit::new(
            "a.cpp",
            vec![
                class(1, "Base", &[], vec![]),
                class(2, "Printable", &[], vec![method(3, "print")]),
                class(4, "Serializable", &[], vec![method(5, "save")]),
                class(6, "Doc", &["Base", "Printable", "Serializable"], vec![]),
            ],
        );
        let symbols = symbols_for(std::slice::from_ref(&unit));
        let mut cx = Cx::new(&symbols, Mode::Flexible, "a.cpp");
        let doc = &unit.declarations[3];
        let out = lower(doc, doc.as_class().unwrap(), &derived_scope("Doc"), &mut cx).unwrap();

        let names: Vec<_> = out.interfaces.iter().map(|(_, i)| i.name.as_str()).collect();
        assert_eq!(names, ["IPrintable", "ISerializable"]);
        assert_eq!(out.delegates.len(), 2);
        assert_eq!(out.delegates[0].field, "printableDelegate");
        assert_eq!(out.methods.len(), 2);
        assert!(out.methods.iter().all(|m| m.is_override && !m.is_stub()));
        assert!(cx.diagnostics().is_empty());
    }

    #[test]
    fn shared_signature_conflicts() {
        let unit = TranslationUnit::new(
            "a.cpp",
            vec![
                class(1, "Base", &[], vec![]),
                class(2, "Circle", &[], vec![method(3, "area")]),
                class(4, "Square", &[], vec![method(5, "area")]),
                class(6, "Shape", &["Base", "Circle", "Square"], vec![]),
            ],
        );
        let symbols = symbols_for(std::slice::from_ref(&unit));
        let shape = &unit.declarations[3];

        let mut cx = Cx::new(&symbols, Mode::Flexible, "a.cpp");
        let out = lower(shape, shape.as_class().unwrap(), &derived_scope("Shape"), &mut cx).unwrap();
        assert_eq!(out.methods.len(), 1);
        assert!(out.methods[0].is_stub());
        let errors: Vec<_> = cx
            .diagnostics()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].related, ["Circle", "Square"]);

        let mut strict = Cx::new(&symbols, Mode::Strict, "a.cpp");
        assert!(lower(shape, shape.as_class().unwrap(), &derived_scope("Shape"), &mut strict).is_err());
    }

    #[test]
    fn overridden_methods_are_not_delegated() {
        let unit = TranslationUnit::new(
            "a.cpp",
            vec![
                class(1, "Base", &[], vec![]),
                class(2, "Circle", &[], vec![method(3, "area")]),
                class(4, "Square", &[], vec![method(5, "area")]),
                class(6, "Shape", &["Base", "Circle", "Square"], vec![method(7, "area")]),
            ],
        );
        let symbols = symbols_for(std::slice::from_ref(&unit));
        let shape = &unit.declarations[3];
        let mut cx = Cx::new(&symbols, Mode::Strict, "a.cpp");
        let out = lower(shape, shape.as_class().unwrap(), &derived_scope("Shape"), &mut cx).unwrap();
        assert!(out.methods.is_empty());
        assert!(cx.diagnostics().is_empty());
    }

    #[test]
    fn ancestor_shared_by_two_secondaries_conflicts() {
        let unit = TranslationUnit::new(
            "a.cpp",
            vec![
                class(1, "Base", &[], vec![]),
                class(2, "Shape", &[], vec![method(3, "area")]),
                class(4, "Circle", &["Shape"], vec![]),
                class(5, "Square", &["Shape"], vec![]),
                class(6, "Blob", &["Base", "Circle", "Square"], vec![]),
            ],
        );
        let symbols = symbols_for(std::slice::from_ref(&unit));
        let blob = &unit.declarations[4];

        let mut cx = Cx::new(&symbols, Mode::Flexible, "a.cpp");
        let out = lower(blob, blob.as_class().unwrap(), &derived_scope("Blob"), &mut cx).unwrap();
        assert!(out.interfaces.iter().all(|(_, i)| i.has_method("area()")));
        assert_eq!(out.methods.len(), 1);
        assert!(out.methods[0].is_stub());
        let errors: Vec<_> = cx
            .diagnostics()
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].related, ["Circle", "Square"]);

        let mut strict = Cx::new(&symbols, Mode::Strict, "a.cpp");
        assert!(lower(blob, blob.as_class().unwrap(), &derived_scope("Blob"), &mut strict).is_err());
    }

    #[test]
    fn inherited_methods_are_forwarded() {
        let unit = TranslationUnit::new(
            "a.cpp",
            vec![
                class(1, "Base", &[], vec![]),
                class(2, "Printable", &[], vec![method(3, "print")]),
                class(4, "Report", &["Printable"], vec![method(5, "title"), method(6, "print")]),
                class(7, "Doc", &["Base", "Report"], vec![]),
            ],
        );
        let symbols = symbols_for(std::slice::from_ref(&unit));
        let doc = &unit.declarations[3];
        let mut cx = Cx::new(&symbols, Mode::Strict, "a.cpp");
        let out = lower(doc, doc.as_class().unwrap(), &derived_scope("Doc"), &mut cx).unwrap();

        let interface = &out.interfaces[0].1;
        assert_eq!(interface.methods.len(), 2);
        let forwarded: Vec<_> = out.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(forwarded, ["title", "print"]);
        assert!(cx.diagnostics().is_empty());
    }

    #[test]
    fn unresolved_secondary_is_an_error() {
        let unit = TranslationUnit::new(
            "a.cpp",
            vec![class(1, "Base", &[], vec![]), class(2, "Doc", &["Base", "Missing"], vec![])],
        );
        let symbols = symbols_for(std::slice::from_ref(&unit));
        let doc = &unit.declarations[1];
        let mut cx = Cx::new(&symbols, Mode::Flexible, "a.cpp");
        let out = lower(doc, doc.as_class().unwrap(), &derived_scope("Doc"), &mut cx).unwrap();
        assert!(out.interfaces.is_empty());
        assert_eq!(cx.diagnostics()[0].severity, Severity::Error);
    }
}
