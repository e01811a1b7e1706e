//! The rule engine: Translation IR to Target IR.
//!
//! One rule per declaration kind, dispatched by [`lower_decl`]. Rules read the
//! node, the shared [`SymbolTable`] and the run [`Mode`], and write target
//! nodes plus diagnostics. A strict-mode error is a [`Halt`], propagated with
//! `?` up to [`transform`], which then discards the unit's partial output.

mod body;
mod class;
mod constant;
mod inheritance;
mod namespace;
mod operator;
mod resource;
mod template;
mod types;

use crate::ir::{DeclKind, Declaration, TranslationUnit, TypeRef, UnsupportedKind};
use crate::names;
use crate::symbols::SymbolTable;
use crate::target::{FieldDecl, JavaType, MethodDecl, Modifiers, TargetFile, TargetUnit, TypeDecl};
use normalize_transpile_report::{ConstructKind, Diagnostic, Location, Mode, Severity};
use std::collections::{BTreeMap, BTreeSet};

/// Strict-mode abort of the current unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Halt;

/// Result of transforming one unit.
#[derive(Debug, Clone)]
pub struct TransformOutput {
    /// `None` when strict mode halted the unit
    pub target: Option<TargetUnit>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Transform one validated unit.
pub fn transform(unit: &TranslationUnit, symbols: &SymbolTable, mode: Mode) -> TransformOutput {
    let mut cx = Cx::new(symbols, mode, &unit.id);
    let result = lower_unit(unit, &mut cx);
    let diagnostics = cx.diagnostics;
    match result {
        Ok(files) => TransformOutput {
            target: Some(TargetUnit {
                unit: unit.id.clone(),
                files,
            }),
            diagnostics,
        },
        Err(Halt) => {
            tracing::warn!(unit = %unit.id, "strict mode: unit halted, partial output discarded");
            TransformOutput {
                target: None,
                diagnostics,
            }
        }
    }
}

fn lower_unit(unit: &TranslationUnit, cx: &mut Cx) -> Result<Vec<TargetFile>, Halt> {
    let root = Scope::namespace("", cx.symbols.package_for_namespace(""));
    let mut out = Output::default();
    for decl in &unit.declarations {
        lower_decl(decl, &root, cx, &mut out)?;
    }
    for external in &unit.external_specializations {
        template::lower_external(external, cx, &mut out)?;
    }
    Ok(out.finish(cx.symbols))
}

/// Rule dispatch: one rule per declaration kind.
pub(crate) fn lower_decl(
    decl: &Declaration,
    scope: &Scope,
    cx: &mut Cx,
    out: &mut Output,
) -> Result<(), Halt> {
    match &decl.kind {
        DeclKind::Namespace => namespace::lower(decl, scope, cx, out),
        DeclKind::ClassLike(class) => {
            let lowered = class::lower(decl, class, scope, cx, class::Shape::plain(decl))?;
            out.push_class(&scope.package, lowered);
            Ok(())
        }
        DeclKind::Template(template) => template::lower(decl, template, scope, cx, out),
        DeclKind::Function(function) => {
            if let Some(method) = class::free_function(decl, function, scope, cx)? {
                out.push_member(&scope.package, Holder::Util, Member::Method(method));
            }
            Ok(())
        }
        DeclKind::Field(field) => {
            let global = class::global_variable(decl, field, scope, cx);
            out.push_member(&scope.package, Holder::Globals, Member::Field(global));
            Ok(())
        }
        DeclKind::Constant(constant) => {
            let field = constant::lower(decl, constant, scope, cx);
            out.push_member(&scope.package, Holder::Constants, Member::Field(field));
            Ok(())
        }
        DeclKind::Enum(decl_enum) => {
            out.push_type(&scope.package, class::lower_enum(decl, decl_enum));
            Ok(())
        }
        DeclKind::Alias(alias) => {
            cx.info(
                ConstructKind::Alias,
                &decl.location,
                format!(
                    "alias {} resolves to {}; uses are rewritten to the aliased type",
                    decl.name, alias.target
                ),
            );
            Ok(())
        }
        DeclKind::Unsupported(unsupported) => {
            if let Some(stub) = unsupported_stub(decl, unsupported.construct, cx)? {
                out.push_type(&scope.package, stub);
            }
            Ok(())
        }
    }
}

/// Flexible-mode placeholder for constructs the validator rejected.
///
/// The validator already reported the construct, so strict mode halts here
/// without a second diagnostic.
pub(crate) fn unsupported_stub(
    decl: &Declaration,
    construct: UnsupportedKind,
    cx: &mut Cx,
) -> Result<Option<TypeDecl>, Halt> {
    match construct {
        UnsupportedKind::Friend | UnsupportedKind::FunctionMacro => Ok(None),
        UnsupportedKind::Union | UnsupportedKind::InlineAsm | UnsupportedKind::Goto => {
            cx.halt_if_strict()?;
            let name = if decl.name.is_empty() {
                format!("Unsupported{}", decl.location.line)
            } else {
                names::escape_identifier(&decl.name)
            };
            let mut stub = TypeDecl::class(name);
            stub.notes.push(format!(
                "MANUAL FIX: {} {} has no target equivalent",
                construct.describe(),
                decl.name
            ));
            Ok(Some(stub))
        }
    }
}

/// Shared state of one unit's transformation: inputs plus the diagnostic sink.
pub(crate) struct Cx<'a> {
    pub symbols: &'a SymbolTable,
    pub mode: Mode,
    unit: &'a str,
    diagnostics: Vec<Diagnostic>,
    reported_packages: BTreeSet<String>,
}

impl<'a> Cx<'a> {
    pub fn new(symbols: &'a SymbolTable, mode: Mode, unit: &'a str) -> Self {
        Self {
            symbols,
            mode,
            unit,
            diagnostics: Vec::new(),
            reported_packages: BTreeSet::new(),
        }
    }

    /// Record a diagnostic; a strict-mode error halts the unit.
    pub fn report(&mut self, diag: Diagnostic) -> Result<(), Halt> {
        let halts = self.mode == Mode::Strict && diag.severity >= Severity::Error;
        tracing::debug!(unit = self.unit, severity = %diag.severity, construct = %diag.construct, "{}", diag.message);
        self.diagnostics.push(diag.in_unit(self.unit));
        if halts { Err(Halt) } else { Ok(()) }
    }

    pub fn error(
        &mut self,
        construct: ConstructKind,
        location: &Location,
        message: impl Into<String>,
    ) -> Result<(), Halt> {
        self.report(Diagnostic::error(construct, message).at(location.clone()))
    }

    pub fn warn(&mut self, construct: ConstructKind, location: &Location, message: impl Into<String>) {
        self.push(Diagnostic::warning(construct, message).at(location.clone()));
    }

    /// A warning whose output needs a manual edit.
    pub fn warn_manual(
        &mut self,
        construct: ConstructKind,
        location: &Location,
        message: impl Into<String>,
    ) {
        self.push(
            Diagnostic::warning(construct, message)
                .at(location.clone())
                .manual_fix(),
        );
    }

    pub fn info(&mut self, construct: ConstructKind, location: &Location, message: impl Into<String>) {
        self.push(Diagnostic::info(construct, message).at(location.clone()));
    }

    /// Push a diagnostic below error level.
    fn push(&mut self, diag: Diagnostic) {
        debug_assert!(diag.severity < Severity::Error);
        self.diagnostics.push(diag.in_unit(self.unit));
    }

    pub fn halt_if_strict(&self) -> Result<(), Halt> {
        if self.mode == Mode::Strict { Err(Halt) } else { Ok(()) }
    }

    /// True the first time a package is seen in this unit.
    pub fn first_report_for(&mut self, package: &str) -> bool {
        self.reported_packages.insert(package.to_string())
    }

    #[cfg(test)]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }
}

/// Lexical position of a rule: namespace, package and enclosing class.
#[derive(Debug, Clone, Default)]
pub(crate) struct Scope {
    /// Qualified namespace chain
    pub namespace: String,
    pub package: String,
    pub class: Option<ClassScope>,
    /// Template parameters visible here
    pub type_params: Vec<String>,
}

/// Members of the enclosing class, as seen from its bodies.
#[derive(Debug, Clone, Default)]
pub(crate) struct ClassScope {
    pub qualified: String,
    /// Target type of `this`
    pub this_type: Option<JavaType>,
    pub fields: BTreeMap<String, TypeRef>,
    /// Source name to target name of member constants
    pub constants: BTreeMap<String, String>,
}

impl Scope {
    pub fn namespace(chain: &str, package: String) -> Self {
        Self {
            namespace: chain.to_string(),
            package,
            ..Self::default()
        }
    }

    /// Innermost scope to resolve names from.
    pub fn lookup_scope(&self) -> &str {
        match &self.class {
            Some(class) => &class.qualified,
            None => &self.namespace,
        }
    }

    pub fn is_type_param(&self, name: &str) -> bool {
        self.type_params.iter().any(|p| p == name)
    }

    pub fn with_type_params(mut self, params: impl IntoIterator<Item = String>) -> Self {
        self.type_params.extend(params);
        self
    }
}

/// Per-package holder classes for namespace-level members.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Holder {
    Util,
    Constants,
    Globals,
}

impl Holder {
    pub fn class_name(self, symbols: &SymbolTable) -> &str {
        let naming = symbols.naming();
        match self {
            Holder::Util => &naming.utility_class,
            Holder::Constants => &naming.constants_class,
            Holder::Globals => &naming.globals_class,
        }
    }

    pub fn java_type(self, package: &str, symbols: &SymbolTable) -> JavaType {
        JavaType::class(package, self.class_name(symbols))
    }
}

pub(crate) enum Member {
    Method(MethodDecl),
    Field(FieldDecl),
}

/// A lowered class plus generated types that live next to it.
pub(crate) struct Lowered {
    pub decl: TypeDecl,
    /// Generated interfaces, with their packages
    pub extra: Vec<(String, TypeDecl)>,
}

/// Accumulated target declarations of one unit.
#[derive(Default)]
pub(crate) struct Output {
    types: Vec<(String, TypeDecl)>,
    holders: BTreeMap<(String, Holder), Vec<Member>>,
}

impl Output {
    /// Add a top-level type; a second type with the same package and name is dropped.
    pub fn push_type(&mut self, package: &str, decl: TypeDecl) {
        if self
            .types
            .iter()
            .any(|(p, d)| p == package && d.name == decl.name)
        {
            return;
        }
        self.types.push((package.to_string(), decl));
    }

    pub fn push_class(&mut self, package: &str, lowered: Lowered) {
        self.push_type(package, lowered.decl);
        for (package, extra) in lowered.extra {
            self.push_type(&package, extra);
        }
    }

    pub fn push_member(&mut self, package: &str, holder: Holder, member: Member) {
        self.holders
            .entry((package.to_string(), holder))
            .or_default()
            .push(member);
    }

    fn finish(self, symbols: &SymbolTable) -> Vec<TargetFile> {
        let mut files: Vec<TargetFile> = self
            .types
            .into_iter()
            .map(|(package, decl)| TargetFile::new(package, decl))
            .collect();
        for ((package, holder), members) in self.holders {
            let name = holder.class_name(symbols).to_string();
            let mut decl = TypeDecl::class(name.clone());
            decl.modifiers.is_final = true;
            let mut constructor = MethodDecl::constructor(name, Vec::new());
            constructor.modifiers = Modifiers::private();
            decl.methods.push(constructor);
            for member in members {
                match member {
                    Member::Method(method) => {
                        decl.push_method(method);
                    }
                    Member::Field(field) => decl.fields.push(field),
                }
            }
            files.push(TargetFile::new(package, decl));
        }
        files
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::config::{NamingConfig, PackageConfig};

    pub fn symbols_for(units: &[TranslationUnit]) -> SymbolTable {
        SymbolTable::build(units, &NamingConfig::default(), &PackageConfig::default())
    }

    pub fn lower_one(
        decl: &Declaration,
        symbols: &SymbolTable,
        mode: Mode,
    ) -> (Result<Vec<TargetFile>, Halt>, Vec<Diagnostic>) {
        let mut cx = Cx::new(symbols, mode, "test.cpp");
        let mut out = Output::default();
        let root = Scope::namespace("", String::new());
        let result = lower_decl(decl, &root, &mut cx, &mut out).map(|()| out.finish(symbols));
        (result, cx.diagnostics().to_vec())
    }
}
