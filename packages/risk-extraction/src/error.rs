//! Typed errors for the risk extraction library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling.
//!
//! Claims that fail quote verification or quality rules are *not* errors.
//! Those rejections are ordinary values (see [`crate::pipeline::verify`] and
//! [`crate::pipeline::quality`]) and are only counted.

use thiserror::Error;

/// Errors that can occur during extraction and scoring.
#[derive(Debug, Error)]
pub enum ExtractionError {
    /// Document text could not be obtained from the document source.
    ///
    /// Surfaced to the caller; the subject is skipped.
    #[error("failed to retrieve document {source_ref}: {reason}")]
    Retrieval { source_ref: String, reason: String },

    /// The model response held no parseable JSON object.
    ///
    /// Caught per chunk; the chunk is skipped.
    #[error("malformed model output: {reason}")]
    MalformedOutput { reason: String },

    /// The model rejected the chunk as exceeding its context window.
    ///
    /// Caught per chunk; the chunk is skipped and never re-split.
    #[error("chunk of {chunk_chars} chars exceeds model context: {message}")]
    ContextTooLarge { chunk_chars: usize, message: String },

    /// AI service unavailable or failed
    #[error("AI service error: {0}")]
    AI(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Storage operation failed
    #[error("storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Verified claim data is internally inconsistent.
    ///
    /// Indicates a bug in the verification or quality filters. Fatal.
    #[error("aggregation invariant violated: {reason}")]
    Aggregation { reason: String },

    /// Configuration error
    #[error("config error: {reason}")]
    Config { reason: String },

    /// JSON parsing error
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    /// Filesystem error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ExtractionError {
    /// Build a retrieval error for a document reference.
    pub fn retrieval(source_ref: impl Into<String>, reason: impl ToString) -> Self {
        Self::Retrieval {
            source_ref: source_ref.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a malformed-output error.
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedOutput {
            reason: reason.into(),
        }
    }

    /// Build a configuration error.
    pub fn config(reason: impl Into<String>) -> Self {
        Self::Config {
            reason: reason.into(),
        }
    }

    /// Whether this error aborts only the current chunk.
    ///
    /// Everything an extractor call can fail with is chunk-local, except
    /// for aggregation invariant violations and configuration errors.
    pub fn is_chunk_local(&self) -> bool {
        !matches!(self, Self::Aggregation { .. } | Self::Config { .. })
    }
}

/// Result type alias for extraction operations.
pub type Result<T> = std::result::Result<T, ExtractionError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = ExtractionError::ContextTooLarge {
            chunk_chars: 5000,
            message: "maximum context length is 4096 tokens".to_string(),
        };
        assert!(err.to_string().contains("5000 chars"));

        let err = ExtractionError::retrieval("bills/hr1.txt", "not found");
        assert_eq!(
            err.to_string(),
            "failed to retrieve document bills/hr1.txt: not found"
        );
    }

    #[test]
    fn test_chunk_local_classification() {
        assert!(ExtractionError::malformed("no JSON").is_chunk_local());
        assert!(ExtractionError::AI("timeout".into()).is_chunk_local());
        assert!(!ExtractionError::Aggregation {
            reason: "tariff without value".into()
        }
        .is_chunk_local());
        assert!(!ExtractionError::config("overlap too large").is_chunk_local());
    }
}
