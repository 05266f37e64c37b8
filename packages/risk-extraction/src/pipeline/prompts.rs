//! LLM prompts for claim extraction.
//!
//! Each schema kind owns a system prompt; the user prompt carries the chunk
//! text plus the subject context. Prompts ask for verbatim quotes because
//! every quote is later checked against the chunk it came from.

use sha2::{Digest, Sha256};

use crate::types::claim::SchemaKind;
use crate::types::document::{KnownEntity, SubjectContext};

/// System prompt for quantitative metrics in filings.
pub const METRIC_PROMPT: &str = r#"Extract QUANTITATIVE metrics with EXACT quotes ONLY.

Rules:
1. Only extract metrics stated as numbers in the text
2. exact_quote MUST be copied verbatim from the text, at least one full sentence
3. Do not quote headings or section titles
4. If the text has no metrics, return an empty list

Output JSON:
{
    "metrics": [{
        "type": "supplier_concentration | geographic | customer | financial",
        "value": number,
        "unit": "percent | million | etc",
        "exact_quote": "COPY VERBATIM from text"
    }]
}"#;

/// System prompt for suppliers of the subject.
pub const SUPPLIER_PROMPT: &str = r#"Extract suppliers ONLY if explicitly mentioned in the text.

Rules:
1. Use the exact company name as written
2. Do not guess countries; omit the field if the text does not say
3. If you quote the text, copy it verbatim

Output JSON:
{
    "suppliers": [{
        "name": "Exact Company Name",
        "country": "Country",
        "criticality": "high | medium | low",
        "exact_quote": "optional, VERBATIM text naming the supplier"
    }]
}"#;

/// System prompt for legislative impacts on the subject or its suppliers.
pub const IMPACT_PROMPT: &str = r#"Extract ONLY DIRECT and SPECIFIC impacts on the company or its named suppliers.
REJECT vague, general, or speculative impacts.

CRITERIA FOR EXTRACTION:
- MUST directly mention the company, its suppliers, or specific industries/products
- MUST have a clear quantitative impact (tariff rates, tax amounts, subsidy values)
- MUST be specific legislation with clear consequences
- REJECT general policy statements without specific impacts

Output JSON:
{
    "impacts": [{
        "target": "company or specific supplier name",
        "supplier_country": "country if supplier",
        "impact_type": "tariff | regulation | tax | ban | subsidy",
        "affected_geography": "country/region mentioned in the bill",
        "quantitative_value": number (REQUIRED for tariffs/taxes/subsidies),
        "unit": "percent | dollars | etc",
        "severity": float 0.0-1.0,
        "exact_quote": "VERBATIM text from the bill showing the specific impact",
        "timeframe": "immediate | short-term | long-term",
        "reasoning": "specific explanation of HOW this directly affects the target"
    }]
}

REJECT impacts that are:
- General industry trends
- Vague policy statements
- Speculative future effects
- Without specific quantitative values for tariffs/taxes/subsidies"#;

/// User prompt template. `{label}` names the kind of text being analyzed.
pub const USER_PROMPT: &str = r#"{label}:
{chunk}

Company: {company}
Sector: {sector}
Industry: {industry}

Known Suppliers (for reference):
{entities}

{instruction}"#;

/// The system prompt for a schema kind.
pub fn system_prompt(kind: SchemaKind) -> &'static str {
    match kind {
        SchemaKind::Metric => METRIC_PROMPT,
        SchemaKind::Supplier => SUPPLIER_PROMPT,
        SchemaKind::LegislativeImpact => IMPACT_PROMPT,
    }
}

/// Response token budget for a schema kind.
pub fn max_tokens(kind: SchemaKind) -> u32 {
    match kind {
        SchemaKind::Metric => 600,
        SchemaKind::Supplier => 800,
        SchemaKind::LegislativeImpact => 1500,
    }
}

/// Format the user prompt for one chunk.
///
/// Known entities are capped at `max_entities`.
pub fn format_user_prompt(
    kind: SchemaKind,
    chunk_text: &str,
    context: &SubjectContext,
    max_entities: usize,
) -> String {
    let (label, instruction) = match kind {
        SchemaKind::Metric => ("Filing Text", "Extract quantitative metrics with exact quotes."),
        SchemaKind::Supplier => (
            "Supplier Information",
            "Extract suppliers explicitly named in the text.",
        ),
        SchemaKind::LegislativeImpact => (
            "Bill Text",
            "Analyze for DIRECT, SPECIFIC impacts only. Reject vague statements.",
        ),
    };

    USER_PROMPT
        .replace("{label}", label)
        .replace("{company}", &context.name)
        .replace("{sector}", context.sector.as_deref().unwrap_or("unknown"))
        .replace("{industry}", context.industry.as_deref().unwrap_or("unknown"))
        .replace(
            "{entities}",
            &format_entities(context.prompt_entities(max_entities)),
        )
        .replace("{instruction}", instruction)
        // Chunk last: document text may itself contain placeholder-like braces
        .replace("{chunk}", chunk_text)
}

fn format_entities(entities: &[KnownEntity]) -> String {
    serde_json::to_string_pretty(entities).unwrap_or_else(|_| "[]".to_string())
}

/// Hash of every prompt template.
///
/// Stamped on each record so results from different prompt versions can
/// be told apart.
pub fn prompt_fingerprint() -> String {
    let mut hasher = Sha256::new();
    for template in [METRIC_PROMPT, SUPPLIER_PROMPT, IMPACT_PROMPT, USER_PROMPT] {
        hasher.update(template.as_bytes());
        hasher.update([0u8]);
    }
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::claim::Criticality;

    fn context() -> SubjectContext {
        SubjectContext::new("Acme Corp")
            .with_sector("Technology")
            .with_entity(
                KnownEntity::new("TSMC")
                    .with_country("Taiwan")
                    .with_criticality(Criticality::High),
            )
    }

    #[test]
    fn test_prompt_fingerprint_is_consistent() {
        let hash1 = prompt_fingerprint();
        let hash2 = prompt_fingerprint();
        assert_eq!(hash1, hash2);
        assert_eq!(hash1.len(), 64); // SHA-256 hex
    }

    #[test]
    fn test_format_user_prompt_includes_context() {
        let prompt = format_user_prompt(
            SchemaKind::LegislativeImpact,
            "A duty of 25 percent shall apply.",
            &context(),
            20,
        );
        assert!(prompt.starts_with("Bill Text:\nA duty of 25 percent shall apply."));
        assert!(prompt.contains("Company: Acme Corp"));
        assert!(prompt.contains("Sector: Technology"));
        assert!(prompt.contains("Industry: unknown"));
        assert!(prompt.contains("\"TSMC\""));
        assert!(prompt.contains("\"high\""));
    }

    #[test]
    fn test_chunk_braces_left_alone() {
        let prompt = format_user_prompt(SchemaKind::Metric, "see {company} below", &context(), 20);
        assert!(prompt.contains("see {company} below"));
    }

    #[test]
    fn test_entities_capped() {
        let mut ctx = SubjectContext::new("Acme Corp");
        for i in 0..5 {
            ctx.add_entity(KnownEntity::new(format!("Supplier {}", i)));
        }
        let prompt = format_user_prompt(SchemaKind::LegislativeImpact, "text", &ctx, 2);
        assert!(prompt.contains("Supplier 1"));
        assert!(!prompt.contains("Supplier 2"));
    }

    #[test]
    fn test_each_kind_has_its_own_prompt() {
        assert!(system_prompt(SchemaKind::Metric).contains("\"metrics\""));
        assert!(system_prompt(SchemaKind::Supplier).contains("\"suppliers\""));
        assert!(system_prompt(SchemaKind::LegislativeImpact).contains("\"impacts\""));
    }
}
