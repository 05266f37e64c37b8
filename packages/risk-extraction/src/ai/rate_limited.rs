//! Rate-limited extractor wrapper.
//!
//! Wraps any extractor with rate limiting using the governor crate. Every
//! model call waits for a permit, so concurrent chunk extraction stays
//! within the provider's quota.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;
use tracing::trace;

use crate::error::{ExtractionError, Result};
use crate::traits::extractor::{ExtractionRequest, StructuredExtractor};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// An extractor wrapper that enforces rate limits.
///
/// Clones share the same limiter.
pub struct RateLimitedExtractor<E> {
    inner: E,
    limiter: Arc<DefaultRateLimiter>,
}

impl<E: Clone> Clone for RateLimitedExtractor<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            limiter: Arc::clone(&self.limiter),
        }
    }
}

fn non_zero(value: u32, name: &str) -> Result<NonZeroU32> {
    NonZeroU32::new(value).ok_or_else(|| ExtractionError::config(format!("{} must be > 0", name)))
}

impl<E: StructuredExtractor> RateLimitedExtractor<E> {
    /// Allow at most `requests_per_second` calls per second.
    pub fn new(extractor: E, requests_per_second: u32) -> Result<Self> {
        let quota = Quota::per_second(non_zero(requests_per_second, "requests_per_second")?);
        Ok(Self::with_quota(extractor, quota))
    }

    /// Sustained rate plus a burst allowance.
    pub fn with_burst(extractor: E, requests_per_second: u32, burst: u32) -> Result<Self> {
        let quota = Quota::per_second(non_zero(requests_per_second, "requests_per_second")?)
            .allow_burst(non_zero(burst, "burst")?);
        Ok(Self::with_quota(extractor, quota))
    }

    /// Create with a custom quota.
    pub fn with_quota(extractor: E, quota: Quota) -> Self {
        Self {
            inner: extractor,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// The wrapped extractor.
    pub fn inner(&self) -> &E {
        &self.inner
    }
}

#[async_trait]
impl<E: StructuredExtractor> StructuredExtractor for RateLimitedExtractor<E> {
    async fn extract_structured(&self, request: &ExtractionRequest) -> Result<String> {
        self.limiter.until_ready().await;
        trace!(schema = %request.schema_name, "Rate limit permit acquired");
        self.inner.extract_structured(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockExtractor;
    use std::time::{Duration, Instant};

    fn request() -> ExtractionRequest {
        ExtractionRequest::new("system", "user", "schema", serde_json::json!({}))
    }

    #[test]
    fn test_zero_rate_rejected() {
        assert!(matches!(
            RateLimitedExtractor::new(MockExtractor::new(), 0),
            Err(ExtractionError::Config { .. })
        ));
        assert!(RateLimitedExtractor::with_burst(MockExtractor::new(), 5, 0).is_err());
    }

    #[tokio::test]
    async fn test_forwards_to_inner() {
        let mock = MockExtractor::new().with_default_response(r#"{"metrics": []}"#);
        let limited = RateLimitedExtractor::new(mock.clone(), 100).unwrap();

        let response = limited.extract_structured(&request()).await.unwrap();
        assert_eq!(response, r#"{"metrics": []}"#);
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn test_burst_then_wait() {
        let limited = RateLimitedExtractor::with_burst(MockExtractor::new(), 10, 2).unwrap();

        let start = Instant::now();
        for _ in 0..3 {
            limited.extract_structured(&request()).await.unwrap();
        }

        // Third call needs a replenished permit (100ms at 10/s).
        assert!(start.elapsed() >= Duration::from_millis(50));
    }
}
