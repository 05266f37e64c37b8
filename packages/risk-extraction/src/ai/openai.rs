//! OpenAI implementation of the StructuredExtractor trait.
//!
//! # Example
//!
//! ```rust,ignore
//! use risk_extraction::ai::OpenAIExtractor;
//! use risk_extraction::security::ExtractorCredentials;
//!
//! let extractor = OpenAIExtractor::new(&ExtractorCredentials::from_env()?)?;
//! let pipeline = Pipeline::new(source, extractor, PipelineConfig::default())?;
//! ```

use async_trait::async_trait;
use openai_client::{strict_schema, OpenAIClient, OpenAIError, StructuredRequest};

use crate::error::{ExtractionError, Result};
use crate::security::credentials::ExtractorCredentials;
use crate::traits::extractor::{ExtractionRequest, StructuredExtractor};

/// Sampling temperature for extraction calls.
pub const DEFAULT_TEMPERATURE: f32 = 0.05;

/// OpenAI-backed structured extractor.
///
/// Uses JSON-object mode by default. With [`with_strict_schema`](Self::with_strict_schema)
/// the request carries the claim schema in strict mode instead.
#[derive(Debug, Clone)]
pub struct OpenAIExtractor {
    client: OpenAIClient,
    model: String,
    temperature: f32,
    strict: bool,
}

impl OpenAIExtractor {
    /// Create an extractor from credentials.
    pub fn new(credentials: &ExtractorCredentials) -> Result<Self> {
        let mut client = OpenAIClient::new(credentials.expose_api_key())
            .with_timeout(credentials.timeout)
            .map_err(|e| ExtractionError::config(e.to_string()))?;
        if let Some(url) = &credentials.base_url {
            client = client.with_base_url(url);
        }
        Ok(Self::from_client(client, &credentials.model))
    }

    /// Wrap an existing client.
    pub fn from_client(client: OpenAIClient, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
            temperature: DEFAULT_TEMPERATURE,
            strict: false,
        }
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Send the response schema in strict mode.
    pub fn with_strict_schema(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn build_request(&self, request: &ExtractionRequest) -> StructuredRequest {
        let structured = if self.strict {
            StructuredRequest::new(
                &self.model,
                &request.system,
                &request.user,
                strict_schema(request.schema.clone()),
            )
            .schema_name(&request.schema_name)
        } else {
            StructuredRequest::json_object(&self.model, &request.system, &request.user)
        };

        let structured = structured.temperature(self.temperature);
        match request.max_tokens {
            Some(limit) => structured.token_limit(limit),
            None => structured,
        }
    }
}

fn map_error(error: OpenAIError, request: &ExtractionRequest) -> ExtractionError {
    match error {
        OpenAIError::ContextLengthExceeded(message) => ExtractionError::ContextTooLarge {
            chunk_chars: request.user.chars().count(),
            message,
        },
        other => ExtractionError::AI(Box::new(other)),
    }
}

#[async_trait]
impl StructuredExtractor for OpenAIExtractor {
    async fn extract_structured(&self, request: &ExtractionRequest) -> Result<String> {
        self.client
            .structured_output(self.build_request(request))
            .await
            .map_err(|e| map_error(e, request))
    }
}
