//! Diagnostic output from the validator and transformer.
//!
//! Every decision or failure during a conversion run becomes a [`Diagnostic`]
//! value. Diagnostics are never thrown past a pass boundary: they are
//! collected, sorted, and summarized into a [`ConversionReport`](crate::ConversionReport).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity level for a diagnostic.
///
/// Ordered from least to most severe, so `max()` over a set of diagnostics
/// yields the level that decides how a node or unit is handled.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Informational note
    Info,
    /// Mapped with caveats; output works but may need review
    Warning,
    /// No safe mapping found; handling depends on the conversion mode
    Error,
    /// Ingestion failure; aborts the whole run
    Fatal,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Info => "info",
            Severity::Warning => "warning",
            Severity::Error => "error",
            Severity::Fatal => "fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The source construct a diagnostic is about.
///
/// Used for per-construct statistics in the report.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConstructKind {
    Ingestion,
    Namespace,
    Class,
    MultipleInheritance,
    Template,
    Specialization,
    Resource,
    Operator,
    Constant,
    Function,
    Field,
    Enum,
    Alias,
    Unsupported,
}

impl ConstructKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConstructKind::Ingestion => "ingestion",
            ConstructKind::Namespace => "namespace",
            ConstructKind::Class => "class",
            ConstructKind::MultipleInheritance => "multiple-inheritance",
            ConstructKind::Template => "template",
            ConstructKind::Specialization => "specialization",
            ConstructKind::Resource => "resource",
            ConstructKind::Operator => "operator",
            ConstructKind::Constant => "constant",
            ConstructKind::Function => "function",
            ConstructKind::Field => "field",
            ConstructKind::Enum => "enum",
            ConstructKind::Alias => "alias",
            ConstructKind::Unsupported => "unsupported",
        }
    }
}

impl fmt::Display for ConstructKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A source code location.
///
/// Field order matters: the derived `Ord` sorts by file, then line, then column.
#[derive(Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Location {
    /// File path as reported by the front end
    pub file: String,
    /// Line number (1-indexed)
    pub line: u32,
    /// Column number (1-indexed, optional)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
}

impl Location {
    /// Create a location with file and line
    pub fn new(file: &str, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column: None,
        }
    }

    /// Create a location with file, line, and column
    pub fn with_column(file: &str, line: u32, column: u32) -> Self {
        Self {
            file: file.into(),
            line,
            column: Some(column),
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)?;
        if let Some(column) = self.column {
            write!(f, ":{}", column)?;
        }
        Ok(())
    }
}

/// A diagnostic recorded during a conversion run.
///
/// Immutable once pushed into a report; the builder methods below are only
/// used while constructing it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Translation unit that produced this diagnostic
    pub unit: String,
    /// Severity level
    pub severity: Severity,
    /// Construct the diagnostic is about
    pub construct: ConstructKind,
    /// Human-readable message
    pub message: String,
    /// Primary location
    pub location: Location,
    /// Whether the generated output needs a manual edit
    pub manual_fix_required: bool,
    /// Related names (e.g. the bases involved in a conflict)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related: Vec<String>,
}

impl Diagnostic {
    /// Create a new diagnostic.
    ///
    /// `Error` and `Fatal` diagnostics require a manual fix by default.
    pub fn new(severity: Severity, construct: ConstructKind, message: impl Into<String>) -> Self {
        Self {
            unit: String::new(),
            severity,
            construct,
            message: message.into(),
            location: Location::default(),
            manual_fix_required: severity >= Severity::Error,
            related: Vec::new(),
        }
    }

    pub fn info(construct: ConstructKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Info, construct, message)
    }

    pub fn warning(construct: ConstructKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, construct, message)
    }

    pub fn error(construct: ConstructKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Error, construct, message)
    }

    pub fn fatal(construct: ConstructKind, message: impl Into<String>) -> Self {
        Self::new(Severity::Fatal, construct, message)
    }

    /// Set the primary location
    pub fn at(mut self, location: Location) -> Self {
        self.location = location;
        self
    }

    /// Set the owning translation unit
    pub fn in_unit(mut self, unit: &str) -> Self {
        self.unit = unit.into();
        self
    }

    /// Mark the diagnostic as requiring a manual fix in the output
    pub fn manual_fix(mut self) -> Self {
        self.manual_fix_required = true;
        self
    }

    /// Add a related name
    pub fn with_related(mut self, name: impl Into<String>) -> Self {
        self.related.push(name.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {}[{}]: {}",
            self.location, self.severity, self.construct, self.message
        )?;
        if self.manual_fix_required {
            f.write_str(" (manual fix)")?;
        }
        Ok(())
    }
}

/// Conversion mode, fixed for the whole run.
///
/// `Strict` drops a unit on its first error; `Flexible` replaces the failing
/// construct with a stub and keeps going.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Strict,
    Flexible,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Strict => write!(f, "strict"),
            Mode::Flexible => write!(f, "flexible"),
        }
    }
}

impl std::str::FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "strict" => Ok(Mode::Strict),
            "flexible" => Ok(Mode::Flexible),
            other => Err(format!("unknown mode '{}' (expected strict or flexible)", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_orders_by_impact() {
        assert!(Severity::Info < Severity::Warning);
        assert!(Severity::Warning < Severity::Error);
        assert!(Severity::Error < Severity::Fatal);
        let worst = [Severity::Warning, Severity::Error, Severity::Info]
            .into_iter()
            .max();
        assert_eq!(worst, Some(Severity::Error));
    }

    #[test]
    fn errors_require_manual_fix_by_default() {
        assert!(Diagnostic::error(ConstructKind::Operator, "x").manual_fix_required);
        assert!(!Diagnostic::warning(ConstructKind::Operator, "x").manual_fix_required);
        assert!(
            Diagnostic::warning(ConstructKind::Template, "x")
                .manual_fix()
                .manual_fix_required
        );
    }

    #[test]
    fn display_includes_location_and_construct() {
        let diag = Diagnostic::error(ConstructKind::MultipleInheritance, "conflict")
            .at(Location::with_column("shapes.h", 12, 3))
            .in_unit("shapes.cpp");
        assert_eq!(
            diag.to_string(),
            "shapes.h:12:3: error[multiple-inheritance]: conflict (manual fix)"
        );
    }

    #[test]
    fn mode_parses_case_insensitively() {
        assert_eq!("Strict".parse::<Mode>(), Ok(Mode::Strict));
        assert_eq!("flexible".parse::<Mode>(), Ok(Mode::Flexible));
        assert!("lenient".parse::<Mode>().is_err());
    }

    #[test]
    fn severity_serializes_lowercase() {
        let json = serde_json::to_string(&Severity::Warning).unwrap();
        assert_eq!(json, "\"warning\"");
    }
}
