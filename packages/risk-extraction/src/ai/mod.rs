//! Extractor implementations.
//!
//! [`RateLimitedExtractor`] wraps any [`StructuredExtractor`](crate::traits::extractor::StructuredExtractor);
//! [`OpenAIExtractor`] is a reference implementation backed by the OpenAI
//! chat completions API (feature `openai`).

pub mod rate_limited;

#[cfg(feature = "openai")]
mod openai;

pub use rate_limited::RateLimitedExtractor;

#[cfg(feature = "openai")]
pub use openai::OpenAIExtractor;
