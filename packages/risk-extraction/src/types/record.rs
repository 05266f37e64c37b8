//! Risk record types - the per-subject output of a pipeline run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::claim::{Criticality, Timeframe};
use crate::types::stats::PipelineStats;

/// Deterministic scoring output for one subject.
///
/// A pure function of the verified claim set; see
/// [`crate::pipeline::aggregate::aggregate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    /// In [-2, 2]; negative means the subject is harmed
    pub direct_risk: f64,

    /// In [-2, 2]; effects on related entities
    pub indirect_risk: f64,

    /// In [0.75, 1.0]; urgency of the impacts
    pub time_factor: f64,

    /// Bounded natural-language summary
    pub summary: String,

    /// Bounded list of short findings
    pub keypoints: Vec<String>,

    /// Counts and citations backing the score
    pub overview: Overview,
}

/// The final, immutable output per analyzed subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskRecord {
    pub subject_id: String,

    /// Unique id of the run that produced this record
    pub run_id: Uuid,

    pub generated_at: DateTime<Utc>,

    pub direct_risk: f64,
    pub indirect_risk: f64,
    pub time_factor: f64,
    pub summary: String,
    pub keypoints: Vec<String>,
    pub overview: Overview,

    /// Pipeline counters for the run
    pub stats: PipelineStats,

    /// Hash of the prompt templates in use.
    ///
    /// Records produced under different prompts are not comparable.
    pub prompt_fingerprint: String,
}

impl RiskRecord {
    /// Stamp a score with run metadata.
    pub fn new(
        subject_id: impl Into<String>,
        score: RiskScore,
        stats: PipelineStats,
        prompt_fingerprint: impl Into<String>,
    ) -> Self {
        Self {
            subject_id: subject_id.into(),
            run_id: Uuid::now_v7(),
            generated_at: Utc::now(),
            direct_risk: score.direct_risk,
            indirect_risk: score.indirect_risk,
            time_factor: score.time_factor,
            summary: score.summary,
            keypoints: score.keypoints,
            overview: score.overview,
            stats,
            prompt_fingerprint: prompt_fingerprint.into(),
        }
    }

    /// The scoring part of the record, without run metadata.
    pub fn score(&self) -> RiskScore {
        RiskScore {
            direct_risk: self.direct_risk,
            indirect_risk: self.indirect_risk,
            time_factor: self.time_factor,
            summary: self.summary.clone(),
            keypoints: self.keypoints.clone(),
            overview: self.overview.clone(),
        }
    }

    /// Every quote cited by the record, with its document and chunk index.
    pub fn cited_quotes(&self) -> impl Iterator<Item = (&str, usize, &str)> {
        let metrics = self
            .overview
            .metric_citations
            .iter()
            .map(|m| (m.document.as_str(), m.chunk_index, m.exact_quote.as_str()));
        let impacts = self
            .overview
            .direct_impacts
            .iter()
            .chain(&self.overview.indirect_impacts)
            .map(|i| (i.document.as_str(), i.chunk_index, i.exact_quote.as_str()));
        metrics.chain(impacts)
    }
}

/// Audit trail behind a score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Overview {
    /// Legislative documents analyzed for this subject
    pub total_documents_analyzed: usize,

    /// De-duplicated, in canonical claim order
    pub documents_with_direct_impact: Vec<String>,
    pub documents_with_indirect_impact: Vec<String>,

    pub direct_impact_count: usize,
    pub indirect_impact_count: usize,

    /// Capped at `top_n_citations`
    pub metric_citations: Vec<MetricCitation>,

    pub direct_impacts: Vec<ImpactCitation>,
    pub indirect_impacts: Vec<ImpactCitation>,
    pub suppliers_identified: Vec<SupplierCitation>,
}

/// A verified metric, with its full quote.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricCitation {
    pub metric: String,
    pub value: f64,
    pub unit: Option<String>,
    pub exact_quote: String,
    pub document: String,
    pub chunk_index: usize,
    pub chunk_char_offset: usize,
}

/// A verified legislative impact, with its full quote and reasoning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactCitation {
    pub target: String,
    pub supplier_country: Option<String>,
    pub impact_type: String,
    pub affected_geography: String,
    pub quantitative_value: Option<f64>,
    pub unit: Option<String>,
    pub severity: f64,
    pub timeframe: Timeframe,
    pub exact_quote: String,
    pub reasoning: Option<String>,
    pub document: String,
    pub chunk_index: usize,
    pub chunk_char_offset: usize,
}

/// A verified supplier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierCitation {
    pub name: String,
    pub country: Option<String>,
    pub criticality: Criticality,
    pub document: String,
}
