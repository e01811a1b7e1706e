//! Semantic translation of class-based native code into Java.
//!
//! `normalize-transpile` maps object-oriented C++ constructs (multiple
//! inheritance, templates, operator overloads, destructor-scoped resources,
//! namespaces, free constants) onto their Java counterparts. Unlike a
//! surface-level syntax swap, every construct goes through a rule that
//! either produces an equivalent target shape or records a diagnostic.
//!
//! # Architecture
//!
//! ```text
//! resolved AST ─> IR Builder ─> Validator ─> Transformer ─> Target IR ─> Writer
//!   (input/)        (input/)    (validate)   (transform/)    (target/)   (output/)
//!                                   │             │
//!                                   └──── Diagnostics ────> ConversionReport
//! ```
//!
//! A [`SymbolTable`] built over every unit before transformation provides
//! cross-unit lookups (bases, packages, specializations). The [`Pipeline`]
//! drives the two phases and collects the report.
//!
//! # Example
//!
//! ```ignore
//! use normalize_transpile::{Pipeline, TranspileConfig};
//!
//! let pipeline = Pipeline::new(TranspileConfig::default())?;
//! let output = pipeline.run_sources(&[("vec.cpp", json)]);
//! for file in &output.targets[0].files {
//!     println!("{}:\n{}", file.path, file.contents);
//! }
//! println!("{}", output.report.render_text());
//! ```
//!
//! # Modes
//!
//! In [`Mode::Strict`] the first error in a unit drops that unit's output.
//! In [`Mode::Flexible`] errors become stub nodes marked `MANUAL FIX` and
//! conversion continues; the report lists every item to review.

pub mod config;
pub mod input;
pub mod ir;
pub mod names;
pub mod output;
pub mod pipeline;
pub mod registry;
pub mod symbols;
pub mod target;
pub mod traits;
pub mod transform;
pub mod validate;

// Re-exports: report
pub use normalize_transpile_report::{
    ConstructKind, ConversionReport, Diagnostic, Location, Mode, Severity, UnitStatus, summarize,
};

// Re-exports: IR and target
pub use ir::{Declaration, DeclKind, OperatorKind, TranslationUnit, TypeRef};
pub use target::{TargetFile, TargetUnit};

// Re-exports: stages
pub use config::{ConfigError, TranspileConfig};
pub use pipeline::{CancellationToken, ConversionOutput, GeneratedFile, Pipeline, PipelineError};
pub use symbols::SymbolTable;
pub use transform::{TransformOutput, transform};
pub use validate::validate;

// Re-exports: Traits
pub use traits::{ReadError, Reader, WriteOptions, Writer};

// Re-exports: Registry
pub use registry::{reader_for_format, register_reader, register_writer, writer_for_language};

// Re-exports: Built-in readers
#[cfg(feature = "read-json")]
pub use input::{JsonReader, read_json};

// Re-exports: Built-in writers
#[cfg(feature = "write-java")]
pub use output::{JavaWriter, JavaWriterImpl};
