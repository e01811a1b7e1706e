//! Conversion report: the one artifact external tooling consumes.
//!
//! [`summarize`] groups diagnostics by translation unit, sorts them into a
//! deterministic order (unit id, then source location, then detection order)
//! and derives a pass/partial/fail status per unit. Repeated runs over the
//! same input produce byte-identical JSON.

use crate::{ConstructKind, Diagnostic, Mode, Severity};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write;

/// Outcome of converting one translation unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitStatus {
    /// Fully converted
    Passed,
    /// Converted, with manual-fix items
    Partial,
    /// Dropped; no output emitted
    Failed,
}

impl UnitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitStatus::Passed => "passed",
            UnitStatus::Partial => "partial",
            UnitStatus::Failed => "failed",
        }
    }
}

/// Derive a unit's status from its diagnostics.
///
/// - any `Fatal` fails the unit
/// - in `Strict` mode any `Error` fails the unit (its output was discarded)
/// - in `Flexible` mode an `Error` or any manual-fix item makes it partial
pub fn unit_status(mode: Mode, diagnostics: &[Diagnostic]) -> UnitStatus {
    let worst = diagnostics.iter().map(|d| d.severity).max();
    match worst {
        Some(Severity::Fatal) => UnitStatus::Failed,
        Some(Severity::Error) if mode == Mode::Strict => UnitStatus::Failed,
        Some(Severity::Error) => UnitStatus::Partial,
        _ if diagnostics.iter().any(|d| d.manual_fix_required) => UnitStatus::Partial,
        _ => UnitStatus::Passed,
    }
}

/// Per-unit entry of the report.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitReport {
    pub unit: String,
    pub status: UnitStatus,
    pub diagnostics: Vec<Diagnostic>,
}

/// Run-level aggregate counts.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Totals {
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_construct: BTreeMap<ConstructKind, usize>,
    pub passed: usize,
    pub partial: usize,
    pub failed: usize,
    /// Diagnostics that require a manual edit of the output
    pub manual_fix: usize,
}

impl Totals {
    pub fn count(&self, severity: Severity) -> usize {
        self.by_severity.get(&severity).copied().unwrap_or(0)
    }
}

/// Structured record of a conversion run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversionReport {
    pub mode: Mode,
    /// The run was cancelled before every unit was processed
    pub cancelled: bool,
    /// The run was aborted by a fatal ingestion failure
    pub aborted: bool,
    pub totals: Totals,
    pub units: Vec<UnitReport>,
    /// Units never processed because of cancellation or abort
    #[serde(default)]
    pub skipped: Vec<String>,
}

/// Build a report from the diagnostics of a run.
///
/// `units` lists every unit that was processed, so units without any
/// diagnostic still appear as `Passed`. Diagnostics for units not listed are
/// included as well.
pub fn summarize<U, D>(mode: Mode, units: U, diagnostics: D) -> ConversionReport
where
    U: IntoIterator,
    U::Item: Into<String>,
    D: IntoIterator<Item = Diagnostic>,
{
    let mut grouped: BTreeMap<String, Vec<Diagnostic>> = BTreeMap::new();
    for unit in units {
        grouped.entry(unit.into()).or_default();
    }
    for diag in diagnostics {
        grouped.entry(diag.unit.clone()).or_default().push(diag);
    }

    let mut totals = Totals::default();
    let mut entries = Vec::with_capacity(grouped.len());
    for (unit, mut diagnostics) in grouped {
        // Stable: ties keep detection order.
        diagnostics.sort_by(|a, b| a.location.cmp(&b.location));

        for diag in &diagnostics {
            *totals.by_severity.entry(diag.severity).or_default() += 1;
            *totals.by_construct.entry(diag.construct).or_default() += 1;
            if diag.manual_fix_required {
                totals.manual_fix += 1;
            }
        }

        let status = unit_status(mode, &diagnostics);
        match status {
            UnitStatus::Passed => totals.passed += 1,
            UnitStatus::Partial => totals.partial += 1,
            UnitStatus::Failed => totals.failed += 1,
        }
        entries.push(UnitReport {
            unit,
            status,
            diagnostics,
        });
    }

    ConversionReport {
        mode,
        cancelled: false,
        aborted: false,
        totals,
        units: entries,
        skipped: Vec::new(),
    }
}

impl ConversionReport {
    /// Report for a run aborted during ingestion.
    pub fn aborted(mode: Mode, fatal: Diagnostic, skipped: Vec<String>) -> Self {
        let unit = fatal.unit.clone();
        let mut report = summarize(mode, [unit.clone()], [fatal]);
        report.aborted = true;
        report.skipped = skipped.into_iter().filter(|u| *u != unit).collect();
        report.skipped.sort();
        report
    }

    /// Record units that were never processed.
    pub fn with_skipped(mut self, mut skipped: Vec<String>) -> Self {
        skipped.sort();
        self.cancelled = !skipped.is_empty() || self.cancelled;
        self.skipped = skipped;
        self
    }

    pub fn unit(&self, unit: &str) -> Option<&UnitReport> {
        self.units.iter().find(|u| u.unit == unit)
    }

    /// All diagnostics in report order.
    pub fn diagnostics(&self) -> impl Iterator<Item = &Diagnostic> {
        self.units.iter().flat_map(|u| u.diagnostics.iter())
    }

    pub fn has_failures(&self) -> bool {
        self.aborted || self.totals.failed > 0
    }

    /// Serialize as pretty JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Render as plain text, one line per diagnostic.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        for unit in &self.units {
            let _ = writeln!(out, "== {} [{}]", unit.unit, unit.status.as_str());
            for diag in &unit.diagnostics {
                let _ = writeln!(out, "  {}", diag);
            }
        }
        for unit in &self.skipped {
            let _ = writeln!(out, "== {} [skipped]", unit);
        }
        let t = &self.totals;
        let _ = write!(
            out,
            "{} units ({}): {} passed, {} partial, {} failed | {} fatal, {} error, {} warning, {} info | {} manual-fix",
            self.units.len(),
            self.mode,
            t.passed,
            t.partial,
            t.failed,
            t.count(Severity::Fatal),
            t.count(Severity::Error),
            t.count(Severity::Warning),
            t.count(Severity::Info),
            t.manual_fix,
        );
        if self.aborted {
            out.push_str(" | aborted");
        } else if self.cancelled {
            out.push_str(" | cancelled");
        }
        out.push('\n');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Location;

    fn diag(unit: &str, severity: Severity, line: u32, msg: &str) -> Diagnostic {
        Diagnostic::new(severity, ConstructKind::Class, msg)
            .at(Location::new(unit, line))
            .in_unit(unit)
    }

    #[test]
    fn units_without_diagnostics_pass() {
        let report = summarize(Mode::Strict, ["a.cpp", "b.cpp"], Vec::<Diagnostic>::new());
        assert_eq!(report.units.len(), 2);
        assert!(report.units.iter().all(|u| u.status == UnitStatus::Passed));
        assert_eq!(report.totals.passed, 2);
    }

    #[test]
    fn strict_error_fails_flexible_error_is_partial() {
        let diags = vec![diag("a.cpp", Severity::Error, 3, "no mapping")];
        let strict = summarize(Mode::Strict, ["a.cpp"], diags.clone());
        let flexible = summarize(Mode::Flexible, ["a.cpp"], diags);
        assert_eq!(strict.units[0].status, UnitStatus::Failed);
        assert_eq!(flexible.units[0].status, UnitStatus::Partial);
    }

    #[test]
    fn manual_fix_warning_is_partial() {
        let d = diag("a.cpp", Severity::Warning, 1, "review").manual_fix();
        let report = summarize(Mode::Strict, ["a.cpp"], [d]);
        assert_eq!(report.units[0].status, UnitStatus::Partial);
        assert_eq!(report.totals.manual_fix, 1);
    }

    #[test]
    fn ordering_is_independent_of_arrival_order() {
        let d1 = diag("b.cpp", Severity::Warning, 9, "late");
        let d2 = diag("a.cpp", Severity::Info, 4, "second");
        let d3 = diag("a.cpp", Severity::Info, 2, "first");

        let r1 = summarize(Mode::Flexible, ["a.cpp", "b.cpp"], [d1.clone(), d2.clone(), d3.clone()]);
        let r2 = summarize(Mode::Flexible, ["b.cpp", "a.cpp"], [d3, d1, d2]);

        assert_eq!(r1.to_json().unwrap(), r2.to_json().unwrap());
        let messages: Vec<_> = r1.diagnostics().map(|d| d.message.as_str()).collect();
        assert_eq!(messages, ["first", "second", "late"]);
    }

    #[test]
    fn ties_keep_detection_order() {
        let a = diag("a.cpp", Severity::Warning, 5, "detected first");
        let b = diag("a.cpp", Severity::Error, 5, "detected second");
        let report = summarize(Mode::Flexible, ["a.cpp"], [a, b]);
        assert_eq!(report.units[0].diagnostics[0].message, "detected first");
    }

    #[test]
    fn counts_by_severity_and_construct() {
        let report = summarize(
            Mode::Flexible,
            ["a.cpp"],
            [
                diag("a.cpp", Severity::Warning, 1, "w"),
                diag("a.cpp", Severity::Warning, 2, "w"),
                Diagnostic::error(ConstructKind::Operator, "e").in_unit("a.cpp"),
            ],
        );
        assert_eq!(report.totals.count(Severity::Warning), 2);
        assert_eq!(report.totals.count(Severity::Error), 1);
        assert_eq!(report.totals.by_construct[&ConstructKind::Class], 2);
        assert_eq!(report.totals.by_construct[&ConstructKind::Operator], 1);
    }

    #[test]
    fn json_roundtrip() {
        let report = summarize(
            Mode::Strict,
            ["a.cpp"],
            [diag("a.cpp", Severity::Warning, 1, "w")],
        )
        .with_skipped(vec!["z.cpp".into()]);
        let json = report.to_json().unwrap();
        assert!(json.contains("\"by_severity\""));
        assert_eq!(ConversionReport::from_json(&json).unwrap(), report);
        assert!(report.cancelled);
    }

    #[test]
    fn aborted_report_lists_fatal_unit() {
        let fatal = Diagnostic::fatal(ConstructKind::Ingestion, "bad json").in_unit("b.cpp");
        let report = ConversionReport::aborted(
            Mode::Flexible,
            fatal,
            vec!["c.cpp".into(), "b.cpp".into(), "a.cpp".into()],
        );
        assert!(report.aborted);
        assert!(report.has_failures());
        assert_eq!(report.units[0].status, UnitStatus::Failed);
        assert_eq!(report.skipped, ["a.cpp", "c.cpp"]);
    }
}
