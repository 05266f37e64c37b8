//! Record storage trait.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::record::RiskRecord;

/// Persists risk records, one per subject.
///
/// A save is a scoped write for one key: after it returns, the key holds
/// either the previous record or the new one, never a partial document.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Save (or replace) the record for a subject.
    async fn save_record(&self, key: &str, record: &RiskRecord) -> Result<()>;

    /// Load the record for a subject, if one was saved.
    async fn load_record(&self, key: &str) -> Result<Option<RiskRecord>>;
}
