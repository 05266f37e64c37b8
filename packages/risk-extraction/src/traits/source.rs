//! Document text source trait.

use async_trait::async_trait;

use crate::error::Result;

/// Supplies the full text of a document.
///
/// Retrieval failures surface as
/// [`ExtractionError::Retrieval`](crate::error::ExtractionError::Retrieval);
/// the subject that needed the document is skipped.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Get the text of a document by its opaque reference.
    async fn get_document_text(&self, source_ref: &str) -> Result<String>;
}
