//! Local text files as a document source.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::debug;

use crate::error::{ExtractionError, Result};
use crate::traits::source::DocumentSource;

/// Reads UTF-8 text documents from under a root directory.
///
/// References are paths relative to the root. Absolute paths and `..`
/// components are refused.
#[derive(Debug, Clone)]
pub struct FileDocumentSource {
    root: PathBuf,
}

impl FileDocumentSource {
    /// Create a source rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a reference to a path under the root.
    pub fn resolve(&self, source_ref: &str) -> Result<PathBuf> {
        let relative = Path::new(source_ref);
        let escapes = relative.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });
        if source_ref.is_empty() || escapes {
            return Err(ExtractionError::retrieval(
                source_ref,
                "reference must be a relative path inside the document root",
            ));
        }
        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl DocumentSource for FileDocumentSource {
    async fn get_document_text(&self, source_ref: &str) -> Result<String> {
        let path = self.resolve(source_ref)?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ExtractionError::retrieval(source_ref, e))?;
        let text = String::from_utf8(bytes)
            .map_err(|e| ExtractionError::retrieval(source_ref, format!("not UTF-8 text: {}", e)))?;

        debug!(source_ref, chars = text.chars().count(), "Read document");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_reads_relative_document() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("bills")).unwrap();
        std::fs::write(dir.path().join("bills/hr1.txt"), "A duty of 25 percent.").unwrap();

        let source = FileDocumentSource::new(dir.path());
        let text = source.get_document_text("bills/hr1.txt").await.unwrap();
        assert_eq!(text, "A duty of 25 percent.");
    }

    #[tokio::test]
    async fn test_missing_document_is_retrieval_error() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileDocumentSource::new(dir.path());
        assert!(matches!(
            source.get_document_text("missing.txt").await,
            Err(ExtractionError::Retrieval { .. })
        ));
    }

    #[tokio::test]
    async fn test_escaping_reference_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let source = FileDocumentSource::new(dir.path().join("docs"));
        for source_ref in ["../secret.txt", "/etc/passwd", "bills/../../x.txt", ""] {
            assert!(matches!(
                source.get_document_text(source_ref).await,
                Err(ExtractionError::Retrieval { .. })
            ));
        }
    }

    #[tokio::test]
    async fn test_non_utf8_rejected() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("bin.dat"), [0xff, 0xfe, 0x00]).unwrap();
        let source = FileDocumentSource::new(dir.path());
        assert!(source.get_document_text("bin.dat").await.is_err());
    }
}
