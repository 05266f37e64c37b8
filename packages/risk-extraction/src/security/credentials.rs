//! Credential handling with secure memory.
//!
//! Uses the `secrecy` crate to prevent accidental logging of sensitive values.

use secrecy::{ExposeSecret, SecretString};
use std::time::Duration;

use crate::error::{ExtractionError, Result};

/// Model used when none is configured.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Credentials and connection settings for a hosted extractor.
///
/// The API key is held as a [`SecretString`] and never appears in debug
/// output.
#[derive(Debug)]
pub struct ExtractorCredentials {
    api_key: SecretString,

    /// Model identifier
    pub model: String,

    /// API base URL (optional)
    pub base_url: Option<String>,

    /// Per-request timeout
    pub timeout: Duration,
}

impl ExtractorCredentials {
    /// Create new credentials for `model`.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            model: model.into(),
            base_url: None,
            timeout: Duration::from_secs(120),
        }
    }

    /// Read `OPENAI_API_KEY`, `OPENAI_BASE_URL` and `RISK_MODEL`.
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("OPENAI_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ExtractionError::config("OPENAI_API_KEY not set"))?;
        let model = std::env::var("RISK_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let mut credentials = Self::new(api_key, model);
        if let Ok(url) = std::env::var("OPENAI_BASE_URL") {
            credentials = credentials.with_base_url(url);
        }
        Ok(credentials)
    }

    /// Set the base URL.
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// Set the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Expose the API key.
    ///
    /// Only call this when actually using the key (e.g., building a client).
    pub fn expose_api_key(&self) -> &str {
        self.api_key.expose_secret()
    }
}
