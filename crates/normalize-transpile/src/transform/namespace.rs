//! Namespaces to packages.

use super::{Cx, Halt, Output, Scope, lower_decl};
use crate::ir::Declaration;
use normalize_transpile_report::{ConstructKind, Diagnostic};

pub(crate) fn lower(decl: &Declaration, scope: &Scope, cx: &mut Cx, out: &mut Output) -> Result<(), Halt> {
    if decl.name.is_empty() {
        cx.info(
            ConstructKind::Namespace,
            &decl.location,
            "anonymous namespace members are emitted into the enclosing package",
        );
        for child in &decl.children {
            lower_decl(child, scope, cx, out)?;
        }
        return Ok(());
    }

    let symbols = cx.symbols;
    let chain = decl.qualified_name.trim_start_matches("::");
    let package = symbols.package_for_namespace(chain);
    if let Some(chains) = symbols.package_collision(&package) {
        if cx.first_report_for(&package) {
            let diag = Diagnostic::error(
                ConstructKind::Namespace,
                format!(
                    "namespaces {} all map to package {}",
                    chains.join(", "),
                    display_package(&package)
                ),
            )
            .at(decl.location.clone());
            cx.report(chains.iter().fold(diag, |d, c| d.with_related(*c)))?;
        }
        tracing::debug!(package = %package, namespace = chain, "colliding namespace skipped");
        return Ok(());
    }

    tracing::trace!(namespace = chain, package = %package, "entering namespace");
    let inner = Scope::namespace(chain, package);
    for child in &decl.children {
        lower_decl(child, &inner, cx, out)?;
    }
    Ok(())
}

fn display_package(package: &str) -> &str {
    if package.is_empty() { "<default>" } else { package }
}
