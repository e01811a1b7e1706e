//! Validator: one pass over a unit, annotating capabilities and flagging
//! constructs that have no mapping or map with caveats.
//!
//! The pass never stops early. Every node is visited so the transformer can
//! decide per mode what to do with each flagged construct. Operators outside
//! the mapping table are left to the transformer, which reports them once
//! at the point it has to emit something for them.

use crate::ir::{DeclKind, Declaration, OperatorKind, TranslationUnit, UnsupportedKind};
use crate::symbols::{SymbolTable, declares_destructor};
use normalize_transpile_report::{ConstructKind, Diagnostic};
use std::collections::BTreeMap;

/// Annotate `unit` in place and return what the pass found.
pub fn validate(unit: &mut TranslationUnit, symbols: &SymbolTable) -> Vec<Diagnostic> {
    let unit_id = unit.id.clone();
    let mut diagnostics = Vec::new();
    unit.walk_mut(&mut |decl| annotate(decl, symbols, &mut diagnostics));
    tracing::debug!(unit = %unit_id, diagnostics = diagnostics.len(), "validated");
    diagnostics
        .into_iter()
        .map(|d: Diagnostic| d.in_unit(&unit_id))
        .collect()
}

fn annotate(decl: &mut Declaration, symbols: &SymbolTable, out: &mut Vec<Diagnostic>) {
    let has_destructor = declares_destructor(decl);
    match &decl.kind {
        DeclKind::ClassLike(class) => {
            decl.capabilities.has_multiple_bases = class.bases.len() > 1;
            decl.capabilities.has_destructor = has_destructor;
            decl.capabilities.is_template = class.is_template();
            check_overload_sets(decl, out);
        }
        DeclKind::Function(function) => {
            decl.capabilities.operator = function.operator_kind(&decl.name);
        }
        DeclKind::Template(template) => {
            let partial = template
                .specializations
                .iter()
                .chain(symbols.specializations(&decl.qualified_name))
                .filter(|s| s.partial)
                .count();
            decl.capabilities.is_template = true;
            decl.capabilities.has_specializations = !template.specializations.is_empty()
                || !symbols.specializations(&decl.qualified_name).is_empty();
            decl.capabilities.has_partial_specialization = partial > 0;
            if partial > 0 {
                out.push(
                    Diagnostic::warning(
                        ConstructKind::Specialization,
                        format!(
                            "{} has partial specialization; the specialized class keeps its open parameters as generics",
                            decl.qualified_name
                        ),
                    )
                    .at(decl.location.clone()),
                );
            }
        }
        DeclKind::Unsupported(unsupported) => {
            out.push(unsupported_diagnostic(decl, unsupported.construct, &unsupported.text));
        }
        DeclKind::Namespace
        | DeclKind::Field(_)
        | DeclKind::Constant(_)
        | DeclKind::Enum(_)
        | DeclKind::Alias(_) => {}
    }
}

fn unsupported_diagnostic(decl: &Declaration, construct: UnsupportedKind, text: &str) -> Diagnostic {
    let what = if text.is_empty() {
        construct.describe().to_string()
    } else {
        format!("{} `{}`", construct.describe(), text.trim())
    };
    let diag = match construct {
        UnsupportedKind::Union | UnsupportedKind::InlineAsm | UnsupportedKind::Goto => {
            Diagnostic::error(ConstructKind::Unsupported, format!("{} has no target mapping", what))
        }
        UnsupportedKind::Friend => Diagnostic::warning(
            ConstructKind::Unsupported,
            format!("{} dropped; access is widened to package level where needed", what),
        ),
        UnsupportedKind::FunctionMacro => Diagnostic::warning(
            ConstructKind::Unsupported,
            format!("{} dropped; expand its uses by hand", what),
        )
        .manual_fix(),
    };
    diag.at(decl.location.clone())
}

/// One overload per operator kind survives in the target; extra const/non-const
/// forms of the same operator collapse into it.
fn check_overload_sets(decl: &Declaration, out: &mut Vec<Diagnostic>) {
    let mut seen: BTreeMap<OperatorKind, usize> = BTreeMap::new();
    for (child, function) in decl.methods() {
        if let Some(kind) = function.operator_kind(&child.name) {
            *seen.entry(kind).or_default() += 1;
        }
    }
    for (kind, count) in seen {
        if count > 1 {
            out.push(
                Diagnostic::info(
                    ConstructKind::Operator,
                    format!(
                        "{} overloads {} {} times; overloads are merged into one target method",
                        decl.qualified_name,
                        kind.spelling(),
                        count
                    ),
                )
                .at(decl.location.clone()),
            );
        }
    }
}
