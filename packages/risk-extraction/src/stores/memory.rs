//! In-memory record storage for testing and development.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::RwLock;

use crate::error::Result;
use crate::traits::store::RecordStore;
use crate::types::record::RiskRecord;

/// In-memory storage for risk records.
///
/// Useful for testing and development. Not suitable for production
/// as data is lost on restart.
#[derive(Default)]
pub struct MemoryRecordStore {
    records: RwLock<HashMap<String, RiskRecord>>,
    saves: RwLock<Vec<String>>,
}

impl MemoryRecordStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of stored records.
    pub fn record_count(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Keys in the order they were saved (repeats included).
    pub fn save_order(&self) -> Vec<String> {
        self.saves.read().unwrap().clone()
    }

    /// Clear all stored data.
    pub fn clear(&self) {
        self.records.write().unwrap().clear();
        self.saves.write().unwrap().clear();
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn save_record(&self, key: &str, record: &RiskRecord) -> Result<()> {
        self.records
            .write()
            .unwrap()
            .insert(key.to_string(), record.clone());
        self.saves.write().unwrap().push(key.to_string());
        Ok(())
    }

    async fn load_record(&self, key: &str) -> Result<Option<RiskRecord>> {
        Ok(self.records.read().unwrap().get(key).cloned())
    }
}
