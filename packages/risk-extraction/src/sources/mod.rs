//! Document source implementations.

pub mod file;

pub use file::FileDocumentSource;
