//! Quote verification - every claimed fact must be quoted verbatim from the
//! chunk that produced it.
//!
//! Verification is strictly local: the quote is searched for in the
//! producing chunk only, never in the whole document or a neighbouring
//! window. A failed check is a silent, counted rejection.

use std::fmt;

use crate::types::claim::Claim;
use crate::types::config::PipelineConfig;

/// Why a quote failed verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteRejection {
    /// The claim kind needs a quote and none was given
    Empty,

    /// The quote does not occur in the chunk text
    NotInChunk,

    /// The quote is shorter than the minimum length
    TooShort { length: usize, min: usize },

    /// The quote starts like a heading ("Section 3 ...")
    StructuralEcho { marker: String },
}

impl fmt::Display for QuoteRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty quote"),
            Self::NotInChunk => write!(f, "quote not found in chunk"),
            Self::TooShort { length, min } => {
                write!(f, "quote of {} chars below minimum {}", length, min)
            }
            Self::StructuralEcho { marker } => write!(f, "quote starts with \"{}\"", marker),
        }
    }
}

/// Checks claim quotes against chunk text.
#[derive(Debug, Clone)]
pub struct QuoteVerifier {
    min_length: usize,
    structural_markers: Vec<String>,
}

impl Default for QuoteVerifier {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl QuoteVerifier {
    /// Create a verifier from pipeline settings.
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            min_length: config.quote_min_length,
            structural_markers: config
                .structural_markers
                .iter()
                .map(|m| m.to_lowercase())
                .collect(),
        }
    }

    /// Check a single quote against chunk text.
    ///
    /// Rules apply in order: empty, not a literal substring, shorter than
    /// the minimum (a quote of exactly the minimum passes), starts with a
    /// structural marker (case-insensitive).
    pub fn check_quote(&self, quote: &str, chunk_text: &str) -> Result<(), QuoteRejection> {
        if quote.is_empty() {
            return Err(QuoteRejection::Empty);
        }
        if !chunk_text.contains(quote) {
            return Err(QuoteRejection::NotInChunk);
        }

        let length = quote.chars().count();
        if length < self.min_length {
            return Err(QuoteRejection::TooShort {
                length,
                min: self.min_length,
            });
        }

        let lowered = quote.to_lowercase();
        if let Some(marker) = self
            .structural_markers
            .iter()
            .find(|m| lowered.starts_with(m.as_str()))
        {
            return Err(QuoteRejection::StructuralEcho {
                marker: marker.clone(),
            });
        }

        Ok(())
    }

    /// Check a claim's quote, if the claim needs or carries one.
    pub fn check(&self, claim: &Claim, chunk_text: &str) -> Result<(), QuoteRejection> {
        match claim.exact_quote() {
            Some(quote) => self.check_quote(quote, chunk_text),
            None if claim.requires_quote() => Err(QuoteRejection::Empty),
            None => Ok(()),
        }
    }

    /// Whether a claim passes verification against its chunk.
    pub fn verify(&self, claim: &Claim, chunk_text: &str) -> bool {
        self.check(claim, chunk_text).is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::claim::{Criticality, MetricClaim, SupplierClaim};

    const CHUNK: &str = "SECTION 301. IMPORT DUTIES.\n\
        (a) In general.--A duty of 25 percent ad valorem shall be imposed \
        on semiconductors imported from the People's Republic of China.";

    fn metric(quote: &str) -> Claim {
        Claim::Metric(MetricClaim {
            metric_type: "financial".to_string(),
            value: 25.0,
            unit: Some("percent".to_string()),
            exact_quote: quote.to_string(),
        })
    }

    #[test]
    fn test_verbatim_quote_accepted() {
        let verifier = QuoteVerifier::default();
        assert!(verifier.verify(&metric("A duty of 25 percent ad valorem shall be imposed"), CHUNK));
    }

    #[test]
    fn test_paraphrase_rejected() {
        let verifier = QuoteVerifier::default();
        assert_eq!(
            verifier.check(&metric("A 25 percent duty shall be imposed on chips"), CHUNK),
            Err(QuoteRejection::NotInChunk)
        );
    }

    #[test]
    fn test_empty_quote_rejected() {
        let verifier = QuoteVerifier::default();
        assert_eq!(verifier.check(&metric(""), CHUNK), Err(QuoteRejection::Empty));
    }

    #[test]
    fn test_length_boundary() {
        let verifier = QuoteVerifier::default();
        let chunk = "abcdefghijklmnopqrstuvwxyz";

        // exactly 20 chars passes
        assert!(verifier.check_quote("abcdefghijklmnopqrst", chunk).is_ok());
        assert_eq!(
            verifier.check_quote("abcdefghijklmnopqrs", chunk),
            Err(QuoteRejection::TooShort { length: 19, min: 20 })
        );
    }

    #[test]
    fn test_structural_echo_rejected() {
        let verifier = QuoteVerifier::default();
        assert!(matches!(
            verifier.check(&metric("SECTION 301. IMPORT DUTIES."), CHUNK),
            Err(QuoteRejection::StructuralEcho { .. })
        ));
    }

    #[test]
    fn test_quote_checked_against_own_chunk_only() {
        let verifier = QuoteVerifier::default();
        let quote = "A duty of 25 percent ad valorem shall be imposed";
        assert!(!verifier.verify(&metric(quote), "An unrelated neighbouring window of text."));
    }

    #[test]
    fn test_supplier_quote_optional_but_verified() {
        let verifier = QuoteVerifier::default();
        let mut supplier = SupplierClaim {
            name: "TSMC".to_string(),
            country: Some("Taiwan".to_string()),
            criticality: Criticality::High,
            exact_quote: None,
        };
        assert!(verifier.verify(&Claim::Supplier(supplier.clone()), CHUNK));

        supplier.exact_quote = Some("TSMC supplies all advanced wafers".to_string());
        assert!(!verifier.verify(&Claim::Supplier(supplier), CHUNK));
    }
}
