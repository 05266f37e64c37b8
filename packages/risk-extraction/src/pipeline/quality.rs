//! Quality filter - domain rules applied to claims that passed quote
//! verification.

use std::fmt;

use crate::types::claim::Claim;
use crate::types::config::PipelineConfig;

/// Why a claim failed the quality rules.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QualityRejection {
    /// A financial impact with no quantitative value
    MissingQuantitativeValue { impact_type: String },

    /// The target is a placeholder, not a concrete entity
    VagueTarget { target: String },

    /// A required field is empty
    MissingField { field: &'static str },

    /// The quote is below the minimum length
    QuoteTooShort { length: usize, min: usize },
}

impl fmt::Display for QualityRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingQuantitativeValue { impact_type } => {
                write!(f, "{} impact without quantitative value", impact_type)
            }
            Self::VagueTarget { target } => write!(f, "vague target \"{}\"", target),
            Self::MissingField { field } => write!(f, "missing {}", field),
            Self::QuoteTooShort { length, min } => {
                write!(f, "quote of {} chars below minimum {}", length, min)
            }
        }
    }
}

/// Applies the quality rules.
#[derive(Debug, Clone)]
pub struct QualityFilter<'a> {
    config: &'a PipelineConfig,
}

impl<'a> QualityFilter<'a> {
    /// Create a filter over pipeline settings.
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Check a claim against the quality rules.
    pub fn check(&self, claim: &Claim) -> Result<(), QualityRejection> {
        match claim {
            Claim::LegislativeImpact(impact) => {
                if self.config.is_financial_impact(&impact.impact_type)
                    && impact.quantitative_value.is_none()
                {
                    return Err(QualityRejection::MissingQuantitativeValue {
                        impact_type: impact.impact_type.clone(),
                    });
                }
                self.check_target(&impact.target)?;
                require("impact_type", &impact.impact_type)?;
                self.check_quote(&impact.exact_quote)
            }
            Claim::Metric(metric) => {
                require("type", &metric.metric_type)?;
                self.check_quote(&metric.exact_quote)
            }
            Claim::Supplier(supplier) => {
                self.check_target(&supplier.name)?;
                match &supplier.exact_quote {
                    Some(quote) => self.check_quote(quote),
                    None => Ok(()),
                }
            }
        }
    }

    /// Whether a claim passes the quality rules.
    pub fn accept(&self, claim: &Claim) -> bool {
        self.check(claim).is_ok()
    }

    fn check_target(&self, target: &str) -> Result<(), QualityRejection> {
        require("target", target)?;
        if self.config.is_vague_target(target) {
            return Err(QualityRejection::VagueTarget {
                target: target.to_string(),
            });
        }
        Ok(())
    }

    fn check_quote(&self, quote: &str) -> Result<(), QualityRejection> {
        require("exact_quote", quote)?;
        let length = quote.chars().count();
        if length < self.config.quote_min_length {
            return Err(QualityRejection::QuoteTooShort {
                length,
                min: self.config.quote_min_length,
            });
        }
        Ok(())
    }
}

fn require(field: &'static str, value: &str) -> Result<(), QualityRejection> {
    if value.trim().is_empty() {
        return Err(QualityRejection::MissingField { field });
    }
    Ok(())
}
