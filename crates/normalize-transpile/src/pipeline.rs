//! Two-phase conversion run.
//!
//! Phase 1 registers every unit in the [`SymbolTable`], sequentially, so later
//! units are visible to earlier ones. Phase 2 validates, transforms and
//! renders each unit independently against the now read-only table, across
//! rayon workers when `pipeline.parallel` is set. Results are sorted by unit
//! id afterwards, so completion order never shows in the output.

use crate::config::TranspileConfig;
use crate::ir::TranslationUnit;
use crate::registry;
use crate::symbols::SymbolTable;
use crate::target::TargetUnit;
use crate::traits::{Reader, WriteOptions, Writer};
use crate::transform::transform;
use crate::validate::validate;
use normalize_transpile_report::{
    ConstructKind, ConversionReport, Diagnostic, Location, Mode, Severity, summarize,
};
use rayon::prelude::*;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Error setting up a pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("no reader registered for format '{0}'")]
    UnknownReader(String),

    #[error("no writer registered for language '{0}'")]
    UnknownWriter(String),
}

/// Run-level cancellation flag, checked before each unit of phase 2.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Rendered source for one target file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    /// Relative path, extension included (`geo/shapes/Circle.java`)
    pub path: String,
    pub contents: String,
}

/// Everything phase 2 produced for one unit.
#[derive(Debug, Clone)]
pub struct UnitOutput {
    pub unit: String,
    /// `None` when the unit failed
    pub target: Option<TargetUnit>,
    pub files: Vec<GeneratedFile>,
}

/// Result of a run: per-unit output plus the report.
#[derive(Debug, Clone)]
pub struct ConversionOutput {
    pub targets: Vec<UnitOutput>,
    pub report: ConversionReport,
}

impl ConversionOutput {
    pub fn unit(&self, unit: &str) -> Option<&UnitOutput> {
        self.targets.iter().find(|t| t.unit == unit)
    }
}

/// A configured conversion run.
pub struct Pipeline {
    config: TranspileConfig,
    reader: &'static dyn Reader,
    writer: &'static dyn Writer,
    cancellation: CancellationToken,
}

impl Pipeline {
    pub fn new(config: TranspileConfig) -> Result<Self, PipelineError> {
        let reader = registry::reader_for_format(&config.input.format)
            .ok_or_else(|| PipelineError::UnknownReader(config.input.format.clone()))?;
        let writer = registry::writer_for_language(&config.output.language)
            .ok_or_else(|| PipelineError::UnknownWriter(config.output.language.clone()))?;
        Ok(Self {
            config,
            reader,
            writer,
            cancellation: CancellationToken::default(),
        })
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation = token;
        self
    }

    pub fn mode(&self) -> Mode {
        self.config.mode
    }

    /// Ingest front-end documents, then run. The first document that fails to
    /// read aborts the whole run with a fatal diagnostic.
    pub fn run_sources(&self, sources: &[(&str, &str)]) -> ConversionOutput {
        let mut units = Vec::with_capacity(sources.len());
        for (unit, source) in sources {
            match self.reader.read(unit, source) {
                Ok(translation) => units.push(translation),
                Err(err) => {
                    tracing::error!(unit = %unit, error = %err, "ingestion failed, aborting run");
                    let fatal = Diagnostic::fatal(ConstructKind::Ingestion, err.to_string())
                        .at(Location::new(unit, 0))
                        .in_unit(unit);
                    let skipped = sources.iter().map(|(u, _)| u.to_string()).collect();
                    return ConversionOutput {
                        targets: Vec::new(),
                        report: ConversionReport::aborted(self.config.mode, fatal, skipped),
                    };
                }
            }
        }
        self.run(units)
    }

    /// Convert already-ingested units.
    pub fn run(&self, units: Vec<TranslationUnit>) -> ConversionOutput {
        tracing::info!(units = units.len(), "phase 1: building symbol table");
        let symbols = SymbolTable::build(&units, &self.config.naming, &self.config.packages);

        tracing::info!(
            units = units.len(),
            parallel = self.config.pipeline.parallel,
            mode = %self.config.mode,
            "phase 2: validate, transform, generate"
        );
        let process = |unit: TranslationUnit| -> Result<(UnitOutput, Vec<Diagnostic>), String> {
            if self.cancellation.is_cancelled() {
                return Err(unit.id);
            }
            Ok(self.process_unit(unit, &symbols))
        };
        let mut results: Vec<_> = if self.config.pipeline.parallel {
            units.into_par_iter().map(process).collect()
        } else {
            units.into_iter().map(process).collect()
        };
        results.sort_by(|a, b| result_id(a).cmp(result_id(b)));

        let mut targets = Vec::new();
        let mut diagnostics = Vec::new();
        let mut skipped = Vec::new();
        for result in results {
            match result {
                Ok((output, diags)) => {
                    targets.push(output);
                    diagnostics.extend(diags);
                }
                Err(unit) => skipped.push(unit),
            }
        }
        if !skipped.is_empty() {
            tracing::warn!(skipped = skipped.len(), "run cancelled; remaining units skipped");
        }

        let processed: Vec<String> = targets.iter().map(|t| t.unit.clone()).collect();
        let report = summarize(self.config.mode, processed, diagnostics).with_skipped(skipped);
        tracing::info!(
            passed = report.totals.passed,
            partial = report.totals.partial,
            failed = report.totals.failed,
            "conversion finished"
        );
        ConversionOutput { targets, report }
    }

    fn process_unit(&self, mut unit: TranslationUnit, symbols: &SymbolTable) -> (UnitOutput, Vec<Diagnostic>) {
        let _span = tracing::info_span!("unit", id = %unit.id).entered();
        let mode = self.config.mode;
        let mut diagnostics = validate(&mut unit, symbols);
        let transformed = transform(&unit, symbols, mode);
        diagnostics.extend(transformed.diagnostics);

        let mut target = transformed.target;
        if mode == Mode::Strict && diagnostics.iter().any(|d| d.severity >= Severity::Error) {
            tracing::warn!("strict mode: unit failed, output dropped");
            target = None;
        }

        let options = WriteOptions {
            indent: self.config.output.indent,
        };
        let files = target
            .as_ref()
            .map(|t| {
                t.files
                    .iter()
                    .map(|file| GeneratedFile {
                        path: format!("{}.{}", file.path_stem(), self.writer.extension()),
                        contents: self.writer.write(file, &options),
                    })
                    .collect()
            })
            .unwrap_or_default();
        tracing::debug!(files = target.as_ref().map_or(0, |t| t.files.len()), "unit done");
        (
            UnitOutput {
                unit: unit.id,
                target,
                files,
            },
            diagnostics,
        )
    }
}

fn result_id(result: &Result<(UnitOutput, Vec<Diagnostic>), String>) -> &str {
    match result {
        Ok((output, _)) => &output.unit,
        Err(unit) => unit,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancellation_token_is_shared() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());
        token.cancel();
        assert!(clone.is_cancelled());
    }

    #[test]
    fn unknown_writer_is_an_error() {
        let mut config = TranspileConfig::default();
        config.output.language = "cobol".into();
        assert!(matches!(
            Pipeline::new(config),
            Err(PipelineError::UnknownWriter(lang)) if lang == "cobol"
        ));
    }

    #[test]
    fn cancelled_run_skips_every_unit() {
        let token = CancellationToken::new();
        token.cancel();
        let pipeline = Pipeline::new(TranspileConfig::default())
            .unwrap()
            .with_cancellation(token);
        let output = pipeline.run(vec![
            TranslationUnit::new("b.cpp", vec![]),
            TranslationUnit::new("a.cpp", vec![]),
        ]);
        assert!(output.targets.is_empty());
        assert!(output.report.cancelled);
        assert_eq!(output.report.skipped, ["a.cpp", "b.cpp"]);
    }
}
