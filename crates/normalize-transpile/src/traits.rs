//! Traits for AST readers and target-language writers.

use crate::ir::{TranslationUnit, TypeParseError};
use crate::target::TargetFile;

/// Error that can occur when reading a front-end document into IR.
#[derive(Debug, thiserror::Error)]
pub enum ReadError {
    #[error("malformed document: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("{unit}: {source}")]
    Type {
        unit: String,
        #[source]
        source: TypeParseError,
    },

    #[error("{unit}: {message}")]
    Invalid { unit: String, message: String },
}

/// A reader ingests one resolved-AST document into a translation unit.
pub trait Reader: Send + Sync {
    /// Format identifier (e.g., "json").
    fn format(&self) -> &'static str;

    /// Build the unit's IR. `unit` is used when the document names none.
    fn read(&self, unit: &str, source: &str) -> Result<TranslationUnit, ReadError>;
}

/// Rendering options shared by writers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteOptions {
    /// Spaces per indentation level
    pub indent: usize,
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self { indent: 4 }
    }
}

/// A writer renders one target file as source text.
pub trait Writer: Send + Sync {
    /// Language identifier (e.g., "java").
    fn language(&self) -> &'static str;

    /// File extension for output (e.g., "java").
    fn extension(&self) -> &'static str;

    /// Emit the file as source code.
    fn write(&self, file: &TargetFile, options: &WriteOptions) -> String;
}
