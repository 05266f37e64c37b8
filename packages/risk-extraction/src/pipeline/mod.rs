//! Extraction pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Chunking documents into overlapping, offset-tracked windows
//! - Schema-constrained extraction, one model call per chunk
//! - Quote verification against the producing chunk
//! - Quality rules and per-subject accumulation
//! - Deterministic aggregation into a risk record

pub mod accumulator;
pub mod aggregate;
pub mod chunker;
pub mod extract;
pub mod prompts;
pub mod quality;
pub mod run;
pub mod verify;

pub use accumulator::ClaimAccumulator;
pub use aggregate::{aggregate, direction, is_direct, time_factor, Direction, NO_IMPACT_KEYPOINT};
pub use chunker::{is_boilerplate, Chunker, Chunks};
pub use extract::{
    find_json_object, parse_claims, response_schema, response_schema_name, ExtractorClient,
    ParsedClaims, RawImpact, RawMetric, RawSupplier,
};
pub use prompts::{
    format_user_prompt, max_tokens, prompt_fingerprint, system_prompt, IMPACT_PROMPT,
    METRIC_PROMPT, SUPPLIER_PROMPT, USER_PROMPT,
};
pub use quality::{QualityFilter, QualityRejection};
pub use run::{BatchReport, Pipeline, SkippedSubject};
pub use verify::{QuoteRejection, QuoteVerifier};
