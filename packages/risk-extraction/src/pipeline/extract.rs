//! Extractor client - prompts the model for one chunk and parses its answer
//! into typed claims.
//!
//! The model is untrusted. Its response is searched for the first balanced
//! JSON object; each item in the schema's claim array is parsed on its own,
//! so an item that violates the schema drops only that item.

use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::error::{ExtractionError, Result};
use crate::pipeline::prompts::{format_user_prompt, max_tokens, system_prompt};
use crate::traits::extractor::{ExtractionRequest, StructuredExtractor};
use crate::types::chunk::Chunk;
use crate::types::claim::{
    Claim, Criticality, ImpactClaim, MetricClaim, SchemaKind, SupplierClaim, Timeframe,
};
use crate::types::document::SubjectContext;

// =============================================================================
// Raw model output
// =============================================================================

/// A metric item as the model returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RawMetric {
    #[serde(rename = "type")]
    pub metric_type: Option<String>,
    pub value: Option<f64>,
    pub unit: Option<String>,
    pub exact_quote: Option<String>,
}

/// A supplier item as the model returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RawSupplier {
    pub name: Option<String>,
    pub country: Option<String>,
    pub criticality: Option<String>,
    pub exact_quote: Option<String>,
}

/// A legislative impact item as the model returns it.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct RawImpact {
    pub target: Option<String>,
    pub supplier_country: Option<String>,
    pub impact_type: Option<String>,
    pub affected_geography: Option<String>,
    pub quantitative_value: Option<f64>,
    pub unit: Option<String>,
    pub severity: Option<f64>,
    pub exact_quote: Option<String>,
    pub timeframe: Option<String>,
    pub reasoning: Option<String>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct MetricResponse {
    #[allow(dead_code)]
    metrics: Vec<RawMetric>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct SupplierResponse {
    #[allow(dead_code)]
    suppliers: Vec<RawSupplier>,
}

#[derive(Debug, Deserialize, JsonSchema)]
struct ImpactResponse {
    #[allow(dead_code)]
    impacts: Vec<RawImpact>,
}

/// JSON Schema of the response object for a schema kind.
pub fn response_schema(kind: SchemaKind) -> Value {
    let schema = match kind {
        SchemaKind::Metric => schema_for!(MetricResponse),
        SchemaKind::Supplier => schema_for!(SupplierResponse),
        SchemaKind::LegislativeImpact => schema_for!(ImpactResponse),
    };
    serde_json::to_value(schema).unwrap_or_default()
}

/// Name of the response schema for a schema kind.
pub fn response_schema_name(kind: SchemaKind) -> &'static str {
    match kind {
        SchemaKind::Metric => "metric_extraction",
        SchemaKind::Supplier => "supplier_extraction",
        SchemaKind::LegislativeImpact => "legislative_impact_extraction",
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

// Quotes are trimmed here, so a verified quote is the exact text found in
// the chunk. Quote, target and impact type default to empty: their absence
// is reported by the verifier and quality filter, not as a schema violation.

impl TryFrom<RawMetric> for MetricClaim {
    type Error = String;

    fn try_from(raw: RawMetric) -> std::result::Result<Self, String> {
        let value = raw.value.ok_or("missing value")?;
        if !value.is_finite() {
            return Err(format!("non-finite value {}", value));
        }
        Ok(Self {
            metric_type: raw.metric_type.unwrap_or_default().trim().to_string(),
            value,
            unit: non_empty(raw.unit),
            exact_quote: raw.exact_quote.unwrap_or_default().trim().to_string(),
        })
    }
}

impl TryFrom<RawSupplier> for SupplierClaim {
    type Error = String;

    fn try_from(raw: RawSupplier) -> std::result::Result<Self, String> {
        let name = non_empty(raw.name).ok_or("missing name")?;
        Ok(Self {
            name,
            country: non_empty(raw.country),
            criticality: raw
                .criticality
                .as_deref()
                .and_then(Criticality::parse)
                .unwrap_or_default(),
            exact_quote: non_empty(raw.exact_quote),
        })
    }
}

impl TryFrom<RawImpact> for ImpactClaim {
    type Error = String;

    fn try_from(raw: RawImpact) -> std::result::Result<Self, String> {
        let severity = raw.severity.ok_or("missing severity")?;
        if !(0.0..=1.0).contains(&severity) {
            return Err(format!("severity {} outside [0, 1]", severity));
        }
        let timeframe = raw.timeframe.ok_or("missing timeframe")?;
        let timeframe =
            Timeframe::parse(&timeframe).ok_or_else(|| format!("unknown timeframe {:?}", timeframe))?;
        let affected_geography =
            non_empty(raw.affected_geography).ok_or("missing affected_geography")?;
        if let Some(value) = raw.quantitative_value {
            if !value.is_finite() {
                return Err(format!("non-finite quantitative_value {}", value));
            }
        }

        Ok(Self {
            target: raw.target.unwrap_or_default().trim().to_string(),
            supplier_country: non_empty(raw.supplier_country),
            impact_type: raw.impact_type.unwrap_or_default().trim().to_lowercase(),
            affected_geography,
            quantitative_value: raw.quantitative_value,
            unit: non_empty(raw.unit),
            severity,
            exact_quote: raw.exact_quote.unwrap_or_default().trim().to_string(),
            timeframe,
            reasoning: non_empty(raw.reasoning),
        })
    }
}

// =============================================================================
// JSON location
// =============================================================================

/// Locate the first balanced `{...}` span in free text.
///
/// Braces inside JSON strings (including escaped quotes) are not counted.
/// Returns `None` when no object opens or the first one never closes.
pub fn find_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, c) in text[start..].char_indices() {
        if in_string {
            match c {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

// =============================================================================
// Parsing
// =============================================================================

/// Claims parsed from one model response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedClaims {
    /// Items that parsed into a typed claim
    pub claims: Vec<Claim>,

    /// Items found in the claim array
    pub proposed: usize,

    /// Items dropped for violating the schema
    pub schema_rejected: usize,
}

/// Parse a raw model response into claims of one kind.
///
/// A response with no claim array yields no claims. A response with no
/// parseable JSON object, or whose claim array is not an array, is
/// [`ExtractionError::MalformedOutput`].
pub fn parse_claims(response: &str, kind: SchemaKind) -> Result<ParsedClaims> {
    let span = find_json_object(response)
        .ok_or_else(|| ExtractionError::malformed("no JSON object in response"))?;
    let value: Value = serde_json::from_str(span)
        .map_err(|e| ExtractionError::malformed(format!("invalid JSON object: {}", e)))?;

    let items = match value.get(kind.collection_key()) {
        None | Some(Value::Null) => return Ok(ParsedClaims::default()),
        Some(Value::Array(items)) => items,
        Some(_) => {
            return Err(ExtractionError::malformed(format!(
                "\"{}\" is not an array",
                kind.collection_key()
            )))
        }
    };

    let mut parsed = ParsedClaims {
        proposed: items.len(),
        ..Default::default()
    };

    for item in items {
        match parse_item(item.clone(), kind) {
            Ok(claim) => parsed.claims.push(claim),
            Err(reason) => {
                debug!(kind = %kind, reason = %reason, "Dropped claim violating schema");
                parsed.schema_rejected += 1;
            }
        }
    }

    Ok(parsed)
}

fn parse_item(item: Value, kind: SchemaKind) -> std::result::Result<Claim, String> {
    match kind {
        SchemaKind::Metric => {
            let raw: RawMetric = serde_json::from_value(item).map_err(|e| e.to_string())?;
            Ok(Claim::Metric(raw.try_into()?))
        }
        SchemaKind::Supplier => {
            let raw: RawSupplier = serde_json::from_value(item).map_err(|e| e.to_string())?;
            Ok(Claim::Supplier(raw.try_into()?))
        }
        SchemaKind::LegislativeImpact => {
            let raw: RawImpact = serde_json::from_value(item).map_err(|e| e.to_string())?;
            Ok(Claim::LegislativeImpact(raw.try_into()?))
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Wraps a [`StructuredExtractor`] with prompting and parsing.
pub struct ExtractorClient<E> {
    extractor: E,
    max_context_entities: usize,
}

impl<E: StructuredExtractor> ExtractorClient<E> {
    /// Create a new client.
    pub fn new(extractor: E) -> Self {
        Self {
            extractor,
            max_context_entities: 20,
        }
    }

    /// Cap the known entities included in each prompt.
    pub fn with_max_context_entities(mut self, max: usize) -> Self {
        self.max_context_entities = max;
        self
    }

    /// Build the request for one chunk.
    pub fn request(
        &self,
        chunk: &Chunk,
        kind: SchemaKind,
        context: &SubjectContext,
    ) -> ExtractionRequest {
        ExtractionRequest::new(
            system_prompt(kind),
            format_user_prompt(kind, &chunk.text, context, self.max_context_entities),
            response_schema_name(kind),
            response_schema(kind),
        )
        .with_max_tokens(max_tokens(kind))
    }

    /// Extract candidate claims from one chunk.
    ///
    /// Exactly one extractor call; failures are returned, never retried.
    pub async fn extract(
        &self,
        chunk: &Chunk,
        kind: SchemaKind,
        context: &SubjectContext,
    ) -> Result<ParsedClaims> {
        let request = self.request(chunk, kind, context);
        let response = self.extractor.extract_structured(&request).await?;
        parse_claims(&response, kind)
    }

    /// The wrapped extractor.
    pub fn extractor(&self) -> &E {
        &self.extractor
    }
}
