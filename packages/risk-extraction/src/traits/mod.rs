//! Core trait abstractions for the extraction library.
//!
//! These traits are the collaborators the pipeline consumes: a source of
//! document text, a structured-output model, and a store for records.

pub mod extractor;
pub mod source;
pub mod store;
