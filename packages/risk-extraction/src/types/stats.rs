//! Pipeline counters.

use serde::{Deserialize, Serialize};

/// Counters collected while processing one subject.
///
/// Rejections are not errors; they only show up here and in debug logs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub documents_processed: usize,

    /// Windows produced by the chunker, including skipped ones
    pub chunks_total: usize,
    pub chunks_extracted: usize,
    pub chunks_skipped_empty: usize,
    pub chunks_skipped_boilerplate: usize,

    // Per-chunk failures
    pub chunks_malformed: usize,
    pub chunks_context_too_large: usize,
    pub chunks_failed: usize,

    /// Items found in model output, before any check
    pub claims_proposed: usize,
    pub claims_schema_rejected: usize,
    pub claims_quote_rejected: usize,
    pub claims_quality_rejected: usize,
    pub claims_duplicate: usize,
    pub claims_accepted: usize,
}

impl PipelineStats {
    /// Add another set of counters into this one.
    pub fn merge(&mut self, other: &PipelineStats) {
        self.documents_processed += other.documents_processed;
        self.chunks_total += other.chunks_total;
        self.chunks_extracted += other.chunks_extracted;
        self.chunks_skipped_empty += other.chunks_skipped_empty;
        self.chunks_skipped_boilerplate += other.chunks_skipped_boilerplate;
        self.chunks_malformed += other.chunks_malformed;
        self.chunks_context_too_large += other.chunks_context_too_large;
        self.chunks_failed += other.chunks_failed;
        self.claims_proposed += other.claims_proposed;
        self.claims_schema_rejected += other.claims_schema_rejected;
        self.claims_quote_rejected += other.claims_quote_rejected;
        self.claims_quality_rejected += other.claims_quality_rejected;
        self.claims_duplicate += other.claims_duplicate;
        self.claims_accepted += other.claims_accepted;
    }

    /// Chunks that produced no claims because the call failed.
    pub fn chunk_failures(&self) -> usize {
        self.chunks_malformed + self.chunks_context_too_large + self.chunks_failed
    }

    /// Claims dropped for any reason.
    pub fn claims_rejected(&self) -> usize {
        self.claims_schema_rejected
            + self.claims_quote_rejected
            + self.claims_quality_rejected
            + self.claims_duplicate
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_and_totals() {
        let mut a = PipelineStats {
            chunks_malformed: 1,
            claims_quote_rejected: 2,
            claims_accepted: 3,
            ..Default::default()
        };
        let b = PipelineStats {
            chunks_context_too_large: 1,
            claims_duplicate: 1,
            claims_accepted: 1,
            ..Default::default()
        };
        a.merge(&b);

        assert_eq!(a.chunk_failures(), 2);
        assert_eq!(a.claims_rejected(), 3);
        assert_eq!(a.claims_accepted, 4);
    }
}
