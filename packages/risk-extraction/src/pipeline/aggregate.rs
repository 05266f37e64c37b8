//! Aggregator - a pure, deterministic scorer over verified claims.
//!
//! No model calls and no I/O. The same claim set produces the same score
//! regardless of the order the claims arrive in: claims are put into a
//! canonical order before any floating-point sum is taken.
//!
//! Scoring:
//! - Impacts are split into *direct* (target names the subject, or carries a
//!   direct marker) and *indirect* (every other impact with a concrete target).
//! - Each partition's magnitude is the mean effective severity; its sign comes
//!   from keyword counts over impact types. Ties and empty partitions score 0.
//! - The time factor is a ladder over all impact timeframes.

use indexmap::IndexSet;
use std::cmp::Ordering;

use crate::error::{ExtractionError, Result};
use crate::types::claim::{Claim, ImpactClaim, Timeframe, VerifiedClaim};
use crate::types::config::PipelineConfig;
use crate::types::document::SubjectContext;
use crate::types::record::{
    ImpactCitation, MetricCitation, Overview, RiskScore, SupplierCitation,
};

/// Keypoint used when no impact was found.
pub const NO_IMPACT_KEYPOINT: &str = "No significant law impacts identified";

/// An impact together with the claim that carries it.
type Impact<'a> = (&'a VerifiedClaim, &'a ImpactClaim);

/// Score a subject from its verified claims.
///
/// `laws_analyzed` is the number of legislative documents processed for the
/// subject; it only feeds the summary and overview.
///
/// Fails with [`ExtractionError::Aggregation`] if a claim breaks an
/// invariant the verification stage should have enforced.
pub fn aggregate(
    subject: &SubjectContext,
    laws_analyzed: usize,
    claims: &[VerifiedClaim],
    config: &PipelineConfig,
) -> Result<RiskScore> {
    let mut ordered: Vec<&VerifiedClaim> = claims.iter().collect();
    ordered.sort_by(|a, b| a.canonical_cmp(b));

    for claim in &ordered {
        check_invariants(claim, config)?;
    }

    let impacts: Vec<Impact<'_>> = ordered
        .iter()
        .filter_map(|&c| c.claim().as_impact().map(|i| (c, i)))
        .collect();

    let (direct, indirect): (Vec<Impact<'_>>, Vec<Impact<'_>>) = impacts
        .iter()
        .copied()
        .filter(|(_, i)| !i.target.trim().is_empty() && !config.is_vague_target(&i.target))
        .partition(|(_, i)| is_direct(&i.target, &subject.name, config));

    let direct_risk = round_to(partition_risk(&direct, config), 3);
    let indirect_risk = round_to(partition_risk(&indirect, config), 3);
    let time_factor = round_to(time_factor(impacts.iter().map(|(_, i)| i.timeframe)), 2);

    let summary = build_summary(laws_analyzed, &direct, &indirect, config);
    let keypoints = build_keypoints(&direct, &indirect, config);
    let overview = build_overview(laws_analyzed, &ordered, &direct, &indirect, config);

    Ok(RiskScore {
        direct_risk,
        indirect_risk,
        time_factor,
        summary,
        keypoints,
        overview,
    })
}

/// Re-check what verification and the quality filter guarantee.
fn check_invariants(claim: &VerifiedClaim, config: &PipelineConfig) -> Result<()> {
    let violation = |reason: String| ExtractionError::Aggregation {
        reason: format!(
            "{} (document {}, chunk {})",
            reason,
            claim.source_document(),
            claim.chunk_index()
        ),
    };

    match claim.claim() {
        Claim::LegislativeImpact(impact) => {
            if config.is_financial_impact(&impact.impact_type)
                && impact.quantitative_value.is_none()
            {
                return Err(violation(format!(
                    "{} impact without quantitative value",
                    impact.impact_type
                )));
            }
            if config.is_vague_target(&impact.target) {
                return Err(violation(format!("vague target \"{}\"", impact.target)));
            }
            if !(0.0..=1.0).contains(&impact.severity) {
                return Err(violation(format!("severity {} outside [0, 1]", impact.severity)));
            }
        }
        Claim::Supplier(supplier) if config.is_vague_target(&supplier.name) => {
            return Err(violation(format!("vague supplier \"{}\"", supplier.name)));
        }
        _ => {}
    }
    Ok(())
}

/// Whether an impact target is the subject itself.
pub fn is_direct(target: &str, subject_name: &str, config: &PipelineConfig) -> bool {
    let target = target.to_lowercase();
    let subject = subject_name.trim().to_lowercase();

    (!subject.is_empty() && target.contains(&subject))
        || config
            .direct_markers
            .iter()
            .any(|m| target.contains(&m.to_lowercase()))
}

/// Direction of an impact type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Positive,
    Negative,
    Neutral,
}

/// Classify an impact type by keyword.
///
/// Positive keywords take precedence, so "tax credit" is positive even
/// though it contains "tax".
pub fn direction(impact_type: &str, config: &PipelineConfig) -> Direction {
    let impact_type = impact_type.to_lowercase();
    let matches = |keywords: &[String]| {
        keywords
            .iter()
            .any(|k| impact_type.contains(&k.to_lowercase()))
    };

    if matches(&config.positive_keywords) {
        Direction::Positive
    } else if matches(&config.negative_keywords) {
        Direction::Negative
    } else {
        Direction::Neutral
    }
}

fn partition_risk(impacts: &[Impact<'_>], config: &PipelineConfig) -> f64 {
    if impacts.is_empty() {
        return 0.0;
    }

    let mean = impacts
        .iter()
        .map(|(_, i)| i.effective_severity())
        .sum::<f64>()
        / impacts.len() as f64;

    let (mut positive, mut negative) = (0usize, 0usize);
    for (_, impact) in impacts {
        match direction(&impact.impact_type, config) {
            Direction::Positive => positive += 1,
            Direction::Negative => negative += 1,
            Direction::Neutral => {}
        }
    }

    match negative.cmp(&positive) {
        Ordering::Greater => -mean,
        Ordering::Less => mean,
        Ordering::Equal => 0.0,
    }
}

/// Urgency ladder over impact timeframes.
///
/// 1.0 if anything is immediate; 0.9 if short-term outnumbers long-term;
/// 0.85 if there is any short-term impact; 0.75 otherwise.
pub fn time_factor(timeframes: impl IntoIterator<Item = Timeframe>) -> f64 {
    let (mut immediate, mut short_term, mut long_term) = (0usize, 0usize, 0usize);
    for timeframe in timeframes {
        match timeframe {
            Timeframe::Immediate => immediate += 1,
            Timeframe::ShortTerm => short_term += 1,
            Timeframe::LongTerm => long_term += 1,
        }
    }

    if immediate > 0 {
        1.0
    } else if short_term > long_term {
        0.9
    } else if short_term > 0 {
        0.85
    } else {
        0.75
    }
}

/// Round half away from zero, without producing `-0.0`.
fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    let rounded = (value * factor).round() / factor;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

// =============================================================================
// Text
// =============================================================================

fn summary_point(impact: &ImpactClaim) -> String {
    format!(
        "{}{} on {}",
        impact.value_fragment(),
        impact.impact_type,
        impact.target
    )
}

fn build_summary(
    laws_analyzed: usize,
    direct: &[Impact<'_>],
    indirect: &[Impact<'_>],
    config: &PipelineConfig,
) -> String {
    let points: Vec<String> = direct
        .iter()
        .chain(indirect)
        .take(config.summary_points)
        .map(|(_, i)| summary_point(i))
        .collect();

    let summary = if points.is_empty() {
        format!(
            "{} laws analyzed with no significant impact identified",
            laws_analyzed
        )
    } else {
        format!("{} laws analyzed. {}", laws_analyzed, points.join("; "))
    };

    truncate_chars(&summary, config.summary_max_chars)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((end, _)) => text[..end].to_string(),
        None => text.to_string(),
    }
}

fn build_keypoints(
    direct: &[Impact<'_>],
    indirect: &[Impact<'_>],
    config: &PipelineConfig,
) -> Vec<String> {
    let direct_points = direct
        .iter()
        .take(config.max_direct_keypoints)
        .map(|(claim, impact)| match impact.quantitative_value {
            Some(_) => format!(
                "{}{} - {}",
                impact.value_fragment(),
                impact.impact_type,
                claim.source_document()
            ),
            None => format!(
                "{} identified in {}",
                impact.impact_type,
                claim.source_document()
            ),
        });

    let indirect_points = indirect
        .iter()
        .take(config.max_indirect_keypoints)
        .map(|(_, impact)| {
            format!(
                "Supplier {} affected by {}",
                impact.target, impact.impact_type
            )
        });

    let keypoints: Vec<String> = direct_points
        .chain(indirect_points)
        .take(config.max_keypoints)
        .collect();

    if keypoints.is_empty() {
        vec![NO_IMPACT_KEYPOINT.to_string()]
    } else {
        keypoints
    }
}

// =============================================================================
// Overview
// =============================================================================

fn impact_citation((claim, impact): Impact<'_>) -> ImpactCitation {
    ImpactCitation {
        target: impact.target.clone(),
        supplier_country: impact.supplier_country.clone(),
        impact_type: impact.impact_type.clone(),
        affected_geography: impact.affected_geography.clone(),
        quantitative_value: impact.quantitative_value,
        unit: impact.unit.clone(),
        severity: impact.severity,
        timeframe: impact.timeframe,
        exact_quote: impact.exact_quote.clone(),
        reasoning: impact.reasoning.clone(),
        document: claim.source_document().to_string(),
        chunk_index: claim.chunk_index(),
        chunk_char_offset: claim.chunk_char_offset(),
    }
}

fn documents(impacts: &[Impact<'_>]) -> Vec<String> {
    impacts
        .iter()
        .map(|(c, _)| c.source_document().to_string())
        .collect::<IndexSet<_>>()
        .into_iter()
        .collect()
}

fn build_overview(
    laws_analyzed: usize,
    ordered: &[&VerifiedClaim],
    direct: &[Impact<'_>],
    indirect: &[Impact<'_>],
    config: &PipelineConfig,
) -> Overview {
    let metric_citations = ordered
        .iter()
        .filter_map(|c| c.claim().as_metric().map(|m| (c, m)))
        .take(config.top_n_citations)
        .map(|(c, m)| MetricCitation {
            metric: m.metric_type.clone(),
            value: m.value,
            unit: m.unit.clone(),
            exact_quote: m.exact_quote.clone(),
            document: c.source_document().to_string(),
            chunk_index: c.chunk_index(),
            chunk_char_offset: c.chunk_char_offset(),
        })
        .collect();

    let suppliers_identified = ordered
        .iter()
        .filter_map(|c| c.claim().as_supplier().map(|s| (c, s)))
        .map(|(c, s)| SupplierCitation {
            name: s.name.clone(),
            country: s.country.clone(),
            criticality: s.criticality,
            document: c.source_document().to_string(),
        })
        .collect();

    Overview {
        total_documents_analyzed: laws_analyzed,
        documents_with_direct_impact: documents(direct),
        documents_with_indirect_impact: documents(indirect),
        direct_impact_count: direct.len(),
        indirect_impact_count: indirect.len(),
        metric_citations,
        direct_impacts: direct.iter().copied().map(impact_citation).collect(),
        indirect_impacts: indirect.iter().copied().map(impact_citation).collect(),
        suppliers_identified,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::chunk::Chunk;
    use crate::types::claim::{Criticality, MetricClaim, SupplierClaim};
    use proptest::prelude::*;

    fn subject() -> SubjectContext {
        SubjectContext::new("Acme Corp")
    }

    fn impact(
        target: &str,
        impact_type: &str,
        severity: f64,
        value: Option<f64>,
        unit: Option<&str>,
        timeframe: Timeframe,
    ) -> ImpactClaim {
        ImpactClaim {
            target: target.to_string(),
            supplier_country: None,
            impact_type: impact_type.to_string(),
            affected_geography: "China".to_string(),
            quantitative_value: value,
            unit: unit.map(String::from),
            severity,
            exact_quote: format!("the {} shall apply to {} imports", impact_type, target),
            timeframe,
            reasoning: Some("named in the bill".to_string()),
        }
    }

    fn verified(claim: Claim, document: &str, index: usize) -> VerifiedClaim {
        let chunk = Chunk::new(document, index, index * 4800, "");
        VerifiedClaim::new(claim, document, &chunk)
    }

    fn verified_impact(impact: ImpactClaim, document: &str, index: usize) -> VerifiedClaim {
        verified(Claim::LegislativeImpact(impact), document, index)
    }

    #[test]
    fn test_empty_claims_are_neutral() {
        let score = aggregate(&subject(), 3, &[], &PipelineConfig::default()).unwrap();
        assert_eq!(score.direct_risk, 0.0);
        assert_eq!(score.indirect_risk, 0.0);
        assert_eq!(score.time_factor, 0.75);
        assert_eq!(
            score.summary,
            "3 laws analyzed with no significant impact identified"
        );
        assert_eq!(score.keypoints, vec![NO_IMPACT_KEYPOINT.to_string()]);
    }

    #[test]
    fn test_direct_tariff_scenario() {
        let claims = vec![verified_impact(
            impact("Acme Corp", "tariff", 0.5, Some(25.0), Some("percent"), Timeframe::Immediate),
            "hr-1234.txt",
            0,
        )];
        let score = aggregate(&subject(), 1, &claims, &PipelineConfig::default()).unwrap();

        assert_eq!(score.direct_risk, -0.625);
        assert_eq!(score.indirect_risk, 0.0);
        assert_eq!(score.time_factor, 1.0);
        assert_eq!(score.summary, "1 laws analyzed. 25percent tariff on Acme Corp");
        assert_eq!(score.keypoints, vec!["25percent tariff - hr-1234.txt".to_string()]);
        assert_eq!(score.overview.direct_impact_count, 1);
        assert_eq!(
            score.overview.documents_with_direct_impact,
            vec!["hr-1234.txt".to_string()]
        );
    }

    #[test]
    fn test_indirect_sign_tie_is_zero() {
        let claims = vec![
            verified_impact(
                impact("TSMC", "subsidy", 0.4, Some(10.0), None, Timeframe::LongTerm),
                "bill-a.txt",
                0,
            ),
            verified_impact(
                impact("Foxconn", "tariff", 0.6, Some(15.0), None, Timeframe::LongTerm),
                "bill-b.txt",
                0,
            ),
        ];
        let score = aggregate(&subject(), 2, &claims, &PipelineConfig::default()).unwrap();
        assert_eq!(score.indirect_risk, 0.0);
        assert_eq!(score.direct_risk, 0.0);
        assert_eq!(score.time_factor, 0.75);
        assert_eq!(
            score.keypoints,
            vec![
                "Supplier TSMC affected by subsidy".to_string(),
                "Supplier Foxconn affected by tariff".to_string(),
            ]
        );
    }

    #[test]
    fn test_positive_keyword_takes_precedence() {
        let config = PipelineConfig::default();
        assert_eq!(direction("tax credit", &config), Direction::Positive);
        assert_eq!(direction("Import Tariff", &config), Direction::Negative);
        assert_eq!(direction("regulation", &config), Direction::Neutral);
    }

    #[test]
    fn test_direct_markers() {
        let config = PipelineConfig::default();
        assert!(is_direct("Acme Corp subsidiaries", "acme corp", &config));
        assert!(is_direct("primary manufacturer", "Acme Corp", &config));
        assert!(!is_direct("TSMC", "Acme Corp", &config));
    }

    #[test]
    fn test_time_factor_ladder() {
        use Timeframe::*;
        assert_eq!(time_factor([LongTerm, Immediate]), 1.0);
        assert_eq!(time_factor([ShortTerm, ShortTerm, LongTerm]), 0.9);
        assert_eq!(time_factor([ShortTerm, LongTerm]), 0.85);
        assert_eq!(time_factor([LongTerm]), 0.75);
        assert_eq!(time_factor([]), 0.75);
    }

    #[test]
    fn test_summary_truncated_on_char_boundary() {
        let target = "Überwerk ".repeat(40);
        let claims = vec![verified_impact(
            impact(target.trim(), "ban", 0.3, None, None, Timeframe::ShortTerm),
            "bill.txt",
            0,
        )];
        let score = aggregate(&subject(), 1, &claims, &PipelineConfig::default()).unwrap();
        assert_eq!(score.summary.chars().count(), 200);
        assert!(score.summary.starts_with("1 laws analyzed. ban on Überwerk"));
    }

    #[test]
    fn test_keypoints_capped() {
        let mut claims = Vec::new();
        for i in 0..4 {
            claims.push(verified_impact(
                impact("Acme Corp", "ban", 0.5, None, None, Timeframe::ShortTerm),
                &format!("direct-{}.txt", i),
                0,
            ));
            claims.push(verified_impact(
                impact(&format!("Supplier {}", i), "ban", 0.5, None, None, Timeframe::ShortTerm),
                &format!("indirect-{}.txt", i),
                0,
            ));
        }
        let score = aggregate(&subject(), 8, &claims, &PipelineConfig::default()).unwrap();
        assert_eq!(score.keypoints.len(), 5);
        assert_eq!(score.keypoints[0], "ban identified in direct-0.txt");
        assert_eq!(score.keypoints[3], "Supplier Supplier 0 affected by ban");
        assert_eq!(score.overview.direct_impacts.len(), 4);
    }

    #[test]
    fn test_overview_citations() {
        let mut claims = Vec::new();
        for i in 0..20 {
            claims.push(verified(
                Claim::Metric(MetricClaim {
                    metric_type: "supplier_concentration".to_string(),
                    value: i as f64,
                    unit: Some("percent".to_string()),
                    exact_quote: format!("our top supplier accounted for {} percent", i),
                }),
                "10k.md",
                i,
            ));
        }
        claims.push(verified(
            Claim::Supplier(SupplierClaim {
                name: "TSMC".to_string(),
                country: Some("Taiwan".to_string()),
                criticality: Criticality::High,
                exact_quote: None,
            }),
            "suppliers.txt",
            0,
        ));

        let score = aggregate(&subject(), 0, &claims, &PipelineConfig::default()).unwrap();
        assert_eq!(score.overview.metric_citations.len(), 15);
        assert_eq!(score.overview.metric_citations[0].chunk_index, 0);
        assert_eq!(score.overview.suppliers_identified[0].name, "TSMC");
    }

    #[test]
    fn test_invariant_violation_is_fatal() {
        let claims = vec![verified_impact(
            impact("Acme Corp", "tariff", 0.5, None, None, Timeframe::Immediate),
            "bill.txt",
            2,
        )];
        let err = aggregate(&subject(), 1, &claims, &PipelineConfig::default()).unwrap_err();
        assert!(matches!(err, ExtractionError::Aggregation { .. }));
        assert!(err.to_string().contains("chunk 2"));

        let claims = vec![verified_impact(
            impact("various", "ban", 0.5, None, None, Timeframe::Immediate),
            "bill.txt",
            0,
        )];
        assert!(aggregate(&subject(), 1, &claims, &PipelineConfig::default()).is_err());
    }

    #[test]
    fn test_rounding_never_negative_zero() {
        assert_eq!(round_to(-0.0001, 3).to_bits(), 0.0f64.to_bits());
        assert_eq!(round_to(-0.6254, 3), -0.625);
        assert_eq!(round_to(0.854, 2), 0.85);
    }

    fn arb_impact() -> impl Strategy<Value = VerifiedClaim> {
        (
            prop::sample::select(vec!["Acme Corp", "TSMC", "Foxconn", "primary plant"]),
            prop::sample::select(vec!["tariff", "subsidy", "ban", "tax credit", "regulation"]),
            0.0f64..=1.0,
            proptest::option::of(-400.0f64..300.0),
            prop::sample::select(vec![Timeframe::Immediate, Timeframe::ShortTerm, Timeframe::LongTerm]),
            prop::sample::select(vec!["a.txt", "b.txt", "c.txt"]),
            0usize..4,
        )
            .prop_map(|(target, impact_type, severity, value, timeframe, doc, index)| {
                // financial impacts always carry a value once verified
                let value = match impact_type {
                    "tariff" | "subsidy" => Some(value.unwrap_or(10.0)),
                    _ => value,
                };
                verified_impact(
                    impact(target, impact_type, severity, value, Some("percent"), timeframe),
                    doc,
                    index,
                )
            })
    }

    proptest! {
        #[test]
        fn prop_aggregation_is_order_independent(
            (claims, shuffled) in prop::collection::vec(arb_impact(), 0..12)
                .prop_flat_map(|v| (Just(v.clone()), Just(v).prop_shuffle()))
        ) {
            let config = PipelineConfig::default();
            let a = aggregate(&subject(), 3, &claims, &config).unwrap();
            let b = aggregate(&subject(), 3, &shuffled, &config).unwrap();
            prop_assert_eq!(a.direct_risk.to_bits(), b.direct_risk.to_bits());
            prop_assert_eq!(a.indirect_risk.to_bits(), b.indirect_risk.to_bits());
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_factors_stay_in_range(claims in prop::collection::vec(arb_impact(), 0..12)) {
            let score = aggregate(&subject(), 3, &claims, &PipelineConfig::default()).unwrap();
            prop_assert!((-2.0..=2.0).contains(&score.direct_risk));
            prop_assert!((-2.0..=2.0).contains(&score.indirect_risk));
            prop_assert!((0.75..=1.0).contains(&score.time_factor));
            prop_assert!(score.summary.chars().count() <= 200);
            prop_assert!(score.keypoints.len() <= 5);
        }
    }
}
