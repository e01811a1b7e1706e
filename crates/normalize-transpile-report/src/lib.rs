//! Diagnostics and conversion reports for `normalize-transpile`.
//!
//! This crate defines the data exchanged between the conversion engine and
//! whatever consumes its results (CI, editors, dashboards):
//!
//! ```text
//! validator ─┐
//!            ├─> Diagnostic* ──> summarize() ──> ConversionReport ──> JSON / text
//! transformer┘
//! ```
//!
//! A report is deterministic: units are ordered by id, diagnostics by source
//! location with detection order breaking ties.

mod diagnostic;
mod report;

pub use diagnostic::{ConstructKind, Diagnostic, Location, Mode, Severity};
pub use report::{ConversionReport, Totals, UnitReport, UnitStatus, summarize, unit_status};
