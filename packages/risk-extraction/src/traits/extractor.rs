//! Structured-output model trait.
//!
//! The extractor is untrusted: whatever it returns is parsed, checked
//! against the chunk that produced it, and dropped if it does not hold up.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;

/// A single structured-output call.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    /// System prompt for the claim schema
    pub system: String,

    /// User prompt: subject context plus the chunk text
    pub user: String,

    /// Name of the response schema
    pub schema_name: String,

    /// JSON Schema the response should follow
    pub schema: Value,

    /// Response token budget, if the provider supports one
    pub max_tokens: Option<u32>,
}

impl ExtractionRequest {
    /// Create a new request.
    pub fn new(
        system: impl Into<String>,
        user: impl Into<String>,
        schema_name: impl Into<String>,
        schema: Value,
    ) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            schema_name: schema_name.into(),
            schema,
            max_tokens: None,
        }
    }

    /// Set the response token budget.
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// A model that answers prompts with (ideally) JSON text.
///
/// Implementations return the raw response text. They should map the
/// provider's context-window rejection to
/// [`ExtractionError::ContextTooLarge`](crate::error::ExtractionError::ContextTooLarge)
/// so the pipeline can skip the chunk without retrying.
#[async_trait]
pub trait StructuredExtractor: Send + Sync {
    /// Run one structured-output call and return the raw response text.
    async fn extract_structured(&self, request: &ExtractionRequest) -> Result<String>;
}

#[async_trait]
impl<T: StructuredExtractor + ?Sized> StructuredExtractor for Arc<T> {
    async fn extract_structured(&self, request: &ExtractionRequest) -> Result<String> {
        (**self).extract_structured(request).await
    }
}
