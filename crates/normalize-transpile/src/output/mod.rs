//! Output writers - emit Target IR as source code.

#[cfg(feature = "write-java")]
pub mod java;

#[cfg(feature = "write-java")]
pub use java::{JAVA_WRITER, JavaWriter, JavaWriterImpl};
