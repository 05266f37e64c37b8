//! Record storage implementations.
//!
//! Available backends:
//! - `MemoryRecordStore` - In-memory storage (tests and development)
//! - `FileRecordStore` - One JSON document per subject in a directory
//!
//! `AggregateFile` keeps a single JSON array of every record in a batch.

pub mod file;
pub mod memory;

pub use file::{AggregateFile, FileRecordStore};
pub use memory::MemoryRecordStore;
