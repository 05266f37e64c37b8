//! Credential handling.

pub mod credentials;

pub use credentials::{ExtractorCredentials, DEFAULT_MODEL};
