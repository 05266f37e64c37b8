//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the extraction library
//! without making real model calls or touching the filesystem.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{ExtractionError, Result};
use crate::traits::{
    extractor::{ExtractionRequest, StructuredExtractor},
    source::DocumentSource,
};
use crate::types::document::{DocumentRef, SubjectContext};

/// How a mock extractor call should fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockFailure {
    /// Respond with prose and no JSON
    Malformed,

    /// Reject the prompt as exceeding the context window
    ContextTooLarge,

    /// Fail as if the service were unreachable
    Unavailable,
}

/// A mock structured extractor for testing.
///
/// Responses are chosen by matching a marker against the user prompt (which
/// carries the chunk text). Cloning shares the configuration and call log.
#[derive(Clone, Default)]
pub struct MockExtractor {
    /// (marker, response) pairs, first match wins
    responses: Arc<RwLock<Vec<(String, String)>>>,

    /// (marker, failure) pairs, checked before responses
    failures: Arc<RwLock<Vec<(String, MockFailure)>>>,

    /// Response when nothing matches
    default_response: Arc<RwLock<Option<String>>>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<ExtractionRequest>>>,
}

impl MockExtractor {
    /// Create a mock that answers every call with an empty object.
    pub fn new() -> Self {
        Self::default()
    }

    /// Respond with `response` when the user prompt contains `marker`.
    pub fn with_response(self, marker: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap()
            .push((marker.into(), response.into()));
        self
    }

    /// Fail when the user prompt contains `marker`.
    pub fn with_failure(self, marker: impl Into<String>, failure: MockFailure) -> Self {
        self.failures.write().unwrap().push((marker.into(), failure));
        self
    }

    /// Respond with `response` when nothing else matches.
    pub fn with_default_response(self, response: impl Into<String>) -> Self {
        *self.default_response.write().unwrap() = Some(response.into());
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<ExtractionRequest> {
        self.calls.read().unwrap().clone()
    }

    /// Number of calls made to this mock.
    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }
}

#[async_trait]
impl StructuredExtractor for MockExtractor {
    async fn extract_structured(&self, request: &ExtractionRequest) -> Result<String> {
        self.calls.write().unwrap().push(request.clone());

        let failure = self
            .failures
            .read()
            .unwrap()
            .iter()
            .find(|(marker, _)| request.user.contains(marker.as_str()))
            .map(|(_, failure)| *failure);

        match failure {
            Some(MockFailure::Malformed) => {
                return Ok("I'm sorry, I could not find any impacts in this text.".to_string())
            }
            Some(MockFailure::ContextTooLarge) => {
                return Err(ExtractionError::ContextTooLarge {
                    chunk_chars: request.user.chars().count(),
                    message: "maximum context length exceeded".to_string(),
                })
            }
            Some(MockFailure::Unavailable) => {
                return Err(ExtractionError::AI(Box::new(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    "Mock connection refused",
                ))))
            }
            None => {}
        }

        let response = self
            .responses
            .read()
            .unwrap()
            .iter()
            .find(|(marker, _)| request.user.contains(marker.as_str()))
            .map(|(_, response)| response.clone());

        Ok(response
            .or_else(|| self.default_response.read().unwrap().clone())
            .unwrap_or_else(|| "{}".to_string()))
    }
}

/// A mock document source for testing.
#[derive(Clone, Default)]
pub struct MockDocumentSource {
    /// Document text by reference
    documents: Arc<RwLock<HashMap<String, String>>>,

    /// References that should fail
    fail_refs: Arc<RwLock<Vec<String>>>,

    /// Call tracking
    calls: Arc<RwLock<Vec<String>>>,
}

impl MockDocumentSource {
    /// Create an empty source.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a document.
    pub fn with_document(self, source_ref: impl Into<String>, text: impl Into<String>) -> Self {
        self.documents
            .write()
            .unwrap()
            .insert(source_ref.into(), text.into());
        self
    }

    /// Mark a reference as failing.
    pub fn fail_ref(self, source_ref: impl Into<String>) -> Self {
        self.fail_refs.write().unwrap().push(source_ref.into());
        self
    }

    /// Get all references requested from this source.
    pub fn calls(&self) -> Vec<String> {
        self.calls.read().unwrap().clone()
    }
}

#[async_trait]
impl DocumentSource for MockDocumentSource {
    async fn get_document_text(&self, source_ref: &str) -> Result<String> {
        self.calls.write().unwrap().push(source_ref.to_string());

        if self
            .fail_refs
            .read()
            .unwrap()
            .iter()
            .any(|r| r == source_ref)
        {
            return Err(ExtractionError::retrieval(source_ref, "mock retrieval failure"));
        }

        self.documents
            .read()
            .unwrap()
            .get(source_ref)
            .cloned()
            .ok_or_else(|| ExtractionError::retrieval(source_ref, "document not found"))
    }
}

/// Builder for creating test scenarios.
pub struct TestScenario {
    subject: SubjectContext,
    source: MockDocumentSource,
    extractor: MockExtractor,
    documents: Vec<DocumentRef>,
}

impl TestScenario {
    /// Create a scenario for a subject.
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: SubjectContext::new(subject),
            source: MockDocumentSource::new(),
            extractor: MockExtractor::new(),
            documents: Vec::new(),
        }
    }

    /// Add a document with its text.
    pub fn with_document(mut self, document: DocumentRef, text: &str) -> Self {
        self.source = self.source.with_document(&document.source_ref, text);
        self.documents.push(document);
        self
    }

    /// Respond with `response` for chunks containing `marker`.
    pub fn with_response(mut self, marker: &str, response: &str) -> Self {
        self.extractor = self.extractor.with_response(marker, response);
        self
    }

    /// Get the subject, documents, source and extractor.
    pub fn build(
        self,
    ) -> (
        SubjectContext,
        Vec<DocumentRef>,
        MockDocumentSource,
        MockExtractor,
    ) {
        (self.subject, self.documents, self.source, self.extractor)
    }
}
