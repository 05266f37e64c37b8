//! Data types for the extract-verify-aggregate pipeline.

pub mod chunk;
pub mod claim;
pub mod config;
pub mod document;
pub mod record;
pub mod stats;
