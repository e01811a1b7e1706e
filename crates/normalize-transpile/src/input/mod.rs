//! Input readers - ingest resolved ASTs into IR.

pub mod ast;
pub mod builder;

#[cfg(feature = "read-json")]
pub mod json;

#[cfg(feature = "read-json")]
pub use json::{JSON_READER, JsonReader, read_json};
