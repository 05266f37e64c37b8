//! Configuration types for the extract-verify-aggregate pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{ExtractionError, Result};

/// Configuration for the extraction pipeline.
///
/// Every field has a default, so a partial JSON document deserializes into a
/// complete config.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    /// Maximum characters per chunk window.
    ///
    /// Large enough to keep most facts inside one window, small enough
    /// that the extractor never truncates silently. Default: 5000.
    pub max_chunk_chars: usize,

    /// Characters shared by consecutive chunks. Default: 200.
    pub overlap_chars: usize,

    /// Minimum quote length in characters. Default: 20.
    pub quote_min_length: usize,

    /// Targets that never identify a concrete entity (compared lowercase).
    pub vague_target_set: Vec<String>,

    /// Impact types that push the risk sign negative (substring match).
    pub negative_keywords: Vec<String>,

    /// Impact types that push the risk sign positive (substring match).
    pub positive_keywords: Vec<String>,

    /// Maximum metric citations carried into the record overview. Default: 15.
    pub top_n_citations: usize,

    /// Impact types that require a quantitative value.
    pub financial_impact_types: Vec<String>,

    /// Quote prefixes that indicate an echoed heading, not a fact.
    pub structural_markers: Vec<String>,

    /// Target substrings that mark an impact as direct.
    pub direct_markers: Vec<String>,

    /// Cap on known entities included in a prompt. Default: 20.
    pub max_context_entities: usize,

    /// Character budget for the record summary. Default: 200.
    pub summary_max_chars: usize,

    /// Impact fragments joined into the summary. Default: 2.
    pub summary_points: usize,

    /// Keypoints taken from direct impacts. Default: 3.
    pub max_direct_keypoints: usize,

    /// Keypoints taken from indirect impacts. Default: 2.
    pub max_indirect_keypoints: usize,

    /// Overall keypoint cap. Default: 5.
    pub max_keypoints: usize,

    /// Extractor calls in flight per document. Default: 1 (sequential).
    pub chunk_concurrency: usize,

    /// Mark table-of-contents and page-number chunks as skippable.
    ///
    /// Default: true.
    pub skip_boilerplate: bool,
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_chunk_chars: 5000,
            overlap_chars: 200,
            quote_min_length: 20,
            vague_target_set: strings(&[
                "company",
                "supplier",
                "various",
                "multiple",
                "company/supplier_name",
            ]),
            negative_keywords: strings(&["tariff", "tax", "ban", "restriction", "penalty", "fee"]),
            positive_keywords: strings(&["subsidy", "tax credit", "incentive", "support", "grant"]),
            top_n_citations: 15,
            financial_impact_types: strings(&["tariff", "tax", "subsidy"]),
            structural_markers: strings(&["section", "chapter", "article", "subsection"]),
            direct_markers: strings(&["direct", "primary", "specific"]),
            max_context_entities: 20,
            summary_max_chars: 200,
            summary_points: 2,
            max_direct_keypoints: 3,
            max_indirect_keypoints: 2,
            max_keypoints: 5,
            chunk_concurrency: 1,
            skip_boilerplate: true,
        }
    }
}

impl PipelineConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set chunk window size and overlap.
    pub fn with_chunking(mut self, max_chunk_chars: usize, overlap_chars: usize) -> Self {
        self.max_chunk_chars = max_chunk_chars;
        self.overlap_chars = overlap_chars;
        self
    }

    /// Set the minimum quote length.
    pub fn with_quote_min_length(mut self, length: usize) -> Self {
        self.quote_min_length = length;
        self
    }

    /// Replace the vague target set.
    pub fn with_vague_targets(mut self, targets: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.vague_target_set = targets.into_iter().map(|t| t.into()).collect();
        self
    }

    /// Replace the sign keyword sets.
    pub fn with_keywords(
        mut self,
        negative: impl IntoIterator<Item = impl Into<String>>,
        positive: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.negative_keywords = negative.into_iter().map(|k| k.into()).collect();
        self.positive_keywords = positive.into_iter().map(|k| k.into()).collect();
        self
    }

    /// Set the metric citation cap.
    pub fn with_top_n_citations(mut self, n: usize) -> Self {
        self.top_n_citations = n;
        self
    }

    /// Set per-document extractor concurrency.
    pub fn with_chunk_concurrency(mut self, concurrency: usize) -> Self {
        self.chunk_concurrency = concurrency;
        self
    }

    /// Disable the boilerplate chunk heuristic.
    pub fn without_boilerplate_filter(mut self) -> Self {
        self.skip_boilerplate = false;
        self
    }

    /// Check internal consistency.
    pub fn validate(&self) -> Result<()> {
        if self.max_chunk_chars == 0 {
            return Err(ExtractionError::config("max_chunk_chars must be > 0"));
        }
        if self.overlap_chars >= self.max_chunk_chars {
            return Err(ExtractionError::config(format!(
                "overlap_chars ({}) must be smaller than max_chunk_chars ({})",
                self.overlap_chars, self.max_chunk_chars
            )));
        }
        if self.chunk_concurrency == 0 {
            return Err(ExtractionError::config("chunk_concurrency must be > 0"));
        }
        Ok(())
    }

    /// Whether a target names no concrete entity.
    pub fn is_vague_target(&self, target: &str) -> bool {
        let target = target.trim().to_lowercase();
        self.vague_target_set.iter().any(|v| v.to_lowercase() == target)
    }

    /// Whether an impact type requires a quantitative value.
    pub fn is_financial_impact(&self, impact_type: &str) -> bool {
        let impact_type = impact_type.trim().to_lowercase();
        self.financial_impact_types
            .iter()
            .any(|t| t.to_lowercase() == impact_type)
    }
}
