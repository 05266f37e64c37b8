//! Per-subject claim accumulator.
//!
//! Each subject owns one accumulator, passed explicitly through the
//! pipeline. It is append-only: claims are admitted after verification
//! and never removed.

use std::collections::HashSet;
use tracing::debug;

use crate::pipeline::extract::ParsedClaims;
use crate::pipeline::quality::QualityFilter;
use crate::pipeline::verify::QuoteVerifier;
use crate::types::chunk::Chunk;
use crate::types::claim::{SupplierClaim, VerifiedClaim};
use crate::types::stats::PipelineStats;

/// Verified claims and counters for one subject.
#[derive(Debug, Default)]
pub struct ClaimAccumulator {
    claims: Vec<VerifiedClaim>,
    seen: HashSet<(String, String)>,
    stats: PipelineStats,
}

impl ClaimAccumulator {
    /// Create an empty accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Verify and filter the claims parsed from one chunk, keeping the
    /// survivors. Returns the number of claims admitted.
    pub fn admit(
        &mut self,
        document: &str,
        chunk: &Chunk,
        parsed: ParsedClaims,
        verifier: &QuoteVerifier,
        filter: &QualityFilter<'_>,
    ) -> usize {
        self.stats.claims_proposed += parsed.proposed;
        self.stats.claims_schema_rejected += parsed.schema_rejected;

        let mut admitted = 0;
        for claim in parsed.claims {
            if let Err(rejection) = verifier.check(&claim, &chunk.text) {
                debug!(
                    document,
                    chunk = chunk.sequence_index,
                    kind = %claim.kind(),
                    reason = %rejection,
                    "Quote verification failed"
                );
                self.stats.claims_quote_rejected += 1;
                continue;
            }

            if let Err(rejection) = filter.check(&claim) {
                debug!(
                    document,
                    chunk = chunk.sequence_index,
                    kind = %claim.kind(),
                    reason = %rejection,
                    "Quality rule failed"
                );
                self.stats.claims_quality_rejected += 1;
                continue;
            }

            if self.push(VerifiedClaim::new(claim, document, chunk)) {
                admitted += 1;
            }
        }
        admitted
    }

    /// Append a verified claim unless an identical one from the same
    /// document is already held (overlapping windows repeat facts).
    fn push(&mut self, claim: VerifiedClaim) -> bool {
        let key = (
            claim.source_document().to_string(),
            claim.claim().identity(),
        );
        if !self.seen.insert(key) {
            self.stats.claims_duplicate += 1;
            return false;
        }
        self.stats.claims_accepted += 1;
        self.claims.push(claim);
        true
    }

    /// Verified claims in admission order.
    pub fn claims(&self) -> &[VerifiedClaim] {
        &self.claims
    }

    /// Verified suppliers in admission order.
    pub fn suppliers(&self) -> impl Iterator<Item = &SupplierClaim> {
        self.claims.iter().filter_map(|c| c.claim().as_supplier())
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    pub fn stats_mut(&mut self) -> &mut PipelineStats {
        &mut self.stats
    }

    /// Consume the accumulator.
    pub fn into_parts(self) -> (Vec<VerifiedClaim>, PipelineStats) {
        (self.claims, self.stats)
    }
}
