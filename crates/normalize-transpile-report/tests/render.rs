//! Snapshot tests for the text rendering of reports.

use normalize_transpile_report::{
    ConstructKind, Diagnostic, Location, Mode, Severity, summarize,
};

#[test]
fn renders_units_and_totals() {
    let report = summarize(
        Mode::Flexible,
        ["shapes.cpp", "vector.cpp"],
        [
            Diagnostic::error(
                ConstructKind::MultipleInheritance,
                "method area() declared by both Circle and Square",
            )
            .at(Location::new("shapes.cpp", 14))
            .in_unit("shapes.cpp")
            .with_related("Circle")
            .with_related("Square"),
            Diagnostic::new(
                Severity::Warning,
                ConstructKind::Specialization,
                "partial specialization Box<T*>",
            )
            .at(Location::with_column("shapes.cpp", 3, 1))
            .in_unit("shapes.cpp"),
        ],
    );

    insta::assert_snapshot!(report.render_text(), @r"
== shapes.cpp [partial]
  shapes.cpp:3:1: warning[specialization]: partial specialization Box<T*>
  shapes.cpp:14: error[multiple-inheritance]: method area() declared by both Circle and Square (manual fix)
== vector.cpp [passed]
2 units (flexible): 1 passed, 1 partial, 0 failed | 0 fatal, 1 error, 1 warning, 0 info | 1 manual-fix
");
}

#[test]
fn skipped_units_are_rendered_after_processed_ones() {
    let report = summarize(Mode::Strict, ["a.cpp"], Vec::<Diagnostic>::new())
        .with_skipped(vec!["b.cpp".to_string()]);
    let text = report.render_text();
    assert!(text.contains("== a.cpp [passed]\n== b.cpp [skipped]\n"));
    assert!(text.trim_end().ends_with("| cancelled"));
}
