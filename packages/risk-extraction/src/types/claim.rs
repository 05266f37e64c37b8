//! Claim types - candidate facts proposed by the extractor and the
//! verified facts that survive quote verification and quality rules.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::types::chunk::Chunk;

/// Which extraction schema a claim was produced under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchemaKind {
    /// Quantitative metrics from filings
    Metric,

    /// Named suppliers and their locations
    Supplier,

    /// Effects of legislation on the subject or related entities
    LegislativeImpact,
}

impl SchemaKind {
    /// Key of the claim array in the model's JSON object.
    pub fn collection_key(self) -> &'static str {
        match self {
            Self::Metric => "metrics",
            Self::Supplier => "suppliers",
            Self::LegislativeImpact => "impacts",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Metric => "metric",
            Self::Supplier => "supplier",
            Self::LegislativeImpact => "legislative_impact",
        }
    }
}

impl fmt::Display for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How critical a supplier is to the subject.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Criticality {
    High,
    #[default]
    Medium,
    Low,
}

impl Criticality {
    /// Lenient parse of model output; unknown values are `None`.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "high" => Some(Self::High),
            "medium" => Some(Self::Medium),
            "low" => Some(Self::Low),
            _ => None,
        }
    }
}

/// When a legislative impact takes effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Timeframe {
    #[serde(rename = "immediate")]
    Immediate,
    #[serde(rename = "short-term")]
    ShortTerm,
    #[serde(rename = "long-term")]
    LongTerm,
}

impl Timeframe {
    /// Lenient parse of model output.
    ///
    /// Accepts `short-term`, `short term` and `short_term` spellings.
    pub fn parse(value: &str) -> Option<Self> {
        let normalized = value.trim().to_lowercase().replace(['_', ' '], "-");
        match normalized.as_str() {
            "immediate" => Some(Self::Immediate),
            "short-term" => Some(Self::ShortTerm),
            "long-term" => Some(Self::LongTerm),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Immediate => "immediate",
            Self::ShortTerm => "short-term",
            Self::LongTerm => "long-term",
        }
    }
}

impl fmt::Display for Timeframe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A quantitative metric reported in a filing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricClaim {
    /// e.g. "supplier_concentration", "geographic", "customer", "financial"
    pub metric_type: String,
    pub value: f64,
    #[serde(default)]
    pub unit: Option<String>,
    pub exact_quote: String,
}

/// A supplier of the subject.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupplierClaim {
    pub name: String,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub criticality: Criticality,
    /// Supporting quote; optional for suppliers, verified when present.
    #[serde(default)]
    pub exact_quote: Option<String>,
}

/// The effect of a piece of legislation on a named target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImpactClaim {
    /// Affected entity: the subject itself or a related third party
    pub target: String,

    #[serde(default)]
    pub supplier_country: Option<String>,

    /// e.g. "tariff", "tax", "subsidy", "ban", "regulation"
    pub impact_type: String,

    pub affected_geography: String,

    /// Required when `impact_type` is a financial kind
    #[serde(default)]
    pub quantitative_value: Option<f64>,

    #[serde(default)]
    pub unit: Option<String>,

    /// In [0, 1]
    pub severity: f64,

    pub exact_quote: String,

    pub timeframe: Timeframe,

    #[serde(default)]
    pub reasoning: Option<String>,
}

impl ImpactClaim {
    /// Severity after weighting percentage-based effects.
    ///
    /// A `percent` value scales severity by `min(2, 1 + value/100)`, so a
    /// reduction lowers the weight and an increase raises it up to twice
    /// the base. Reductions beyond 100 percent weigh zero.
    pub fn effective_severity(&self) -> f64 {
        match (self.quantitative_value, self.unit.as_deref()) {
            (Some(value), Some(unit)) if unit.trim().eq_ignore_ascii_case("percent") => {
                let multiplier = f64::min(2.0, 1.0 + value / 100.0).max(0.0);
                self.severity * multiplier
            }
            _ => self.severity,
        }
    }

    /// `"{value}{unit} "` prefix used in summaries, empty when no value.
    pub fn value_fragment(&self) -> String {
        match self.quantitative_value {
            Some(value) => format!("{}{} ", value, self.unit.as_deref().unwrap_or("")),
            None => String::new(),
        }
    }
}

/// A candidate fact proposed by the extractor.
///
/// Untrusted until it passes quote verification and quality rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Claim {
    Metric(MetricClaim),
    Supplier(SupplierClaim),
    LegislativeImpact(ImpactClaim),
}

impl Claim {
    /// The schema this claim belongs to.
    pub fn kind(&self) -> SchemaKind {
        match self {
            Self::Metric(_) => SchemaKind::Metric,
            Self::Supplier(_) => SchemaKind::Supplier,
            Self::LegislativeImpact(_) => SchemaKind::LegislativeImpact,
        }
    }

    /// The supporting quotation, if any.
    pub fn exact_quote(&self) -> Option<&str> {
        match self {
            Self::Metric(m) => Some(&m.exact_quote),
            Self::Supplier(s) => s.exact_quote.as_deref(),
            Self::LegislativeImpact(i) => Some(&i.exact_quote),
        }
    }

    /// Whether the claim cannot be accepted without a quote.
    pub fn requires_quote(&self) -> bool {
        !matches!(self, Self::Supplier(_))
    }

    /// The entity the claim is about, where the kind has one.
    pub fn target(&self) -> Option<&str> {
        match self {
            Self::Metric(_) => None,
            Self::Supplier(s) => Some(&s.name),
            Self::LegislativeImpact(i) => Some(&i.target),
        }
    }

    /// Borrow the impact payload.
    pub fn as_impact(&self) -> Option<&ImpactClaim> {
        match self {
            Self::LegislativeImpact(i) => Some(i),
            _ => None,
        }
    }

    /// Borrow the metric payload.
    pub fn as_metric(&self) -> Option<&MetricClaim> {
        match self {
            Self::Metric(m) => Some(m),
            _ => None,
        }
    }

    /// Borrow the supplier payload.
    pub fn as_supplier(&self) -> Option<&SupplierClaim> {
        match self {
            Self::Supplier(s) => Some(s),
            _ => None,
        }
    }

    /// Identity used to suppress duplicates from overlapping windows.
    pub(crate) fn identity(&self) -> String {
        let detail = match self {
            Self::Metric(m) => m.metric_type.to_lowercase(),
            Self::Supplier(s) => s.name.to_lowercase(),
            Self::LegislativeImpact(i) => {
                format!("{}|{}", i.target.to_lowercase(), i.impact_type.to_lowercase())
            }
        };
        format!(
            "{}|{}|{}",
            self.kind(),
            detail,
            self.exact_quote().unwrap_or_default()
        )
    }
}

/// A claim whose quote was found in its own chunk and which passed the
/// quality rules, tagged with where it came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedClaim {
    claim: Claim,
    source_document: String,
    chunk_index: usize,
    chunk_char_offset: usize,
}

impl VerifiedClaim {
    /// Tag an accepted claim with its originating chunk.
    ///
    /// Only the pipeline's verification stage calls this, after both
    /// the quote check and the quality rules have passed.
    pub(crate) fn new(claim: Claim, document_name: impl Into<String>, chunk: &Chunk) -> Self {
        Self {
            claim,
            source_document: document_name.into(),
            chunk_index: chunk.sequence_index,
            chunk_char_offset: chunk.char_offset_start,
        }
    }

    pub fn claim(&self) -> &Claim {
        &self.claim
    }

    /// Name of the document the claim was extracted from.
    pub fn source_document(&self) -> &str {
        &self.source_document
    }

    /// Sequence index of the originating chunk.
    pub fn chunk_index(&self) -> usize {
        self.chunk_index
    }

    /// Character offset of the originating chunk within its document.
    pub fn chunk_char_offset(&self) -> usize {
        self.chunk_char_offset
    }

    /// Total order used to make aggregation independent of input order.
    pub(crate) fn canonical_cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.source_document
            .cmp(&other.source_document)
            .then(self.chunk_index.cmp(&other.chunk_index))
            .then_with(|| self.claim.identity().cmp(&other.claim.identity()))
            .then_with(|| {
                let a = serde_json::to_string(&self.claim).unwrap_or_default();
                let b = serde_json::to_string(&other.claim).unwrap_or_default();
                a.cmp(&b)
            })
    }
}
