//! Error types for OpenAI client.

use thiserror::Error;

/// Result type for OpenAI client operations.
pub type Result<T> = std::result::Result<T, OpenAIError>;

/// OpenAI client errors.
#[derive(Debug, Error)]
pub enum OpenAIError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// The prompt does not fit the model's context window
    #[error("Context length exceeded: {0}")]
    ContextLengthExceeded(String),

    /// API error (non-2xx response, rate limit, invalid request)
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The model declined to answer
    #[error("Model refused: {0}")]
    Refused(String),

    /// Parse error (invalid JSON, unexpected response format)
    #[error("Parse error: {0}")]
    Parse(String),
}

impl OpenAIError {
    /// Classify a non-2xx response body.
    pub(crate) fn from_response(status: u16, body: String) -> Self {
        let lowered = body.to_lowercase();
        if lowered.contains("context_length_exceeded") || lowered.contains("maximum context length")
        {
            return Self::ContextLengthExceeded(body);
        }
        Self::Api {
            status,
            message: body,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_context_length_detected() {
        let body = r#"{"error": {"message": "This model's maximum context length is 128000 tokens", "code": "context_length_exceeded"}}"#;
        assert!(matches!(
            OpenAIError::from_response(400, body.to_string()),
            OpenAIError::ContextLengthExceeded(_)
        ));
    }

    #[test]
    fn test_other_errors_keep_status() {
        match OpenAIError::from_response(429, "rate limited".to_string()) {
            OpenAIError::Api { status, message } => {
                assert_eq!(status, 429);
                assert_eq!(message, "rate limited");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
