//! Citation-Verified Risk Extraction Library
//!
//! Extracts quantitative facts from long documents (regulatory filings,
//! legislative bills, supplier profiles) with a language model, verifies
//! every fact against the text it was taken from, and turns the verified
//! facts into deterministic, auditable risk scores.
//!
//! # Design Philosophy
//!
//! **"The model proposes, the text disposes"**
//!
//! - The extractor is untrusted; its output is parsed into typed claims
//! - Every claim must quote its chunk verbatim or it is discarded
//! - Scoring is a pure function of verified claims, stable under reordering
//! - Failures are scoped: a bad chunk never sinks a subject
//!
//! # Usage
//!
//! ```rust,ignore
//! use risk_extraction::{DocumentRef, Pipeline, PipelineConfig, Subject, SubjectContext};
//! use risk_extraction::sources::FileDocumentSource;
//! use risk_extraction::testing::MockExtractor;
//!
//! let pipeline = Pipeline::new(
//!     FileDocumentSource::new("data"),
//!     MockExtractor::new(),
//!     PipelineConfig::default(),
//! )?;
//!
//! let subject = Subject::new("ACME", SubjectContext::new("Acme Corp"))
//!     .with_document(DocumentRef::bill("bills/hr-1234.txt"));
//! let record = pipeline.run(&subject).await?;
//! println!("direct risk {}", record.direct_risk);
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Collaborator abstractions (StructuredExtractor, DocumentSource, RecordStore)
//! - [`types`] - Chunks, claims, configuration and records
//! - [`pipeline`] - Chunk, extract, verify, filter, aggregate
//! - [`ai`] - Extractor implementations (rate limiting, OpenAI)
//! - [`sources`] - Document sources (FileDocumentSource)
//! - [`stores`] - Record storage (MemoryRecordStore, FileRecordStore)
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod ai;
pub mod error;
pub mod pipeline;
pub mod security;
pub mod sources;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{ExtractionError, Result};
pub use pipeline::{BatchReport, Pipeline, SkippedSubject};
pub use traits::{
    extractor::{ExtractionRequest, StructuredExtractor},
    source::DocumentSource,
    store::RecordStore,
};
pub use types::{
    chunk::Chunk,
    claim::{
        Claim, Criticality, ImpactClaim, MetricClaim, SchemaKind, SupplierClaim, Timeframe,
        VerifiedClaim,
    },
    config::PipelineConfig,
    document::{DocumentKind, DocumentRef, KnownEntity, Subject, SubjectContext},
    record::{ImpactCitation, MetricCitation, Overview, RiskRecord, RiskScore, SupplierCitation},
    stats::PipelineStats,
};
