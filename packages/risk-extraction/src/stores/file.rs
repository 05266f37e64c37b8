//! File-based record storage.
//!
//! Every write goes to a temporary file in the target directory and is then
//! renamed over the destination, so readers see either the old document or
//! the new one.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;
use uuid::Uuid;

use crate::error::{ExtractionError, Result};
use crate::traits::store::RecordStore;
use crate::types::record::RiskRecord;

fn storage_error(context: &str, path: &Path, err: std::io::Error) -> ExtractionError {
    ExtractionError::Storage(format!("{} {}: {}", context, path.display(), err).into())
}

/// Write `content` to `target` via a temporary sibling file and a rename.
async fn atomic_write(target: &Path, content: &[u8]) -> Result<()> {
    let parent = target
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    tokio::fs::create_dir_all(parent)
        .await
        .map_err(|e| storage_error("failed to create", parent, e))?;

    let file_name = target
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let temp_path = parent.join(format!(".{}.{}.tmp", file_name, Uuid::new_v4().simple()));

    let written = match write_temp(&temp_path, content).await {
        Ok(()) => tokio::fs::rename(&temp_path, target)
            .await
            .map_err(|e| storage_error("failed to replace", target, e)),
        Err(e) => Err(e),
    };
    if written.is_err() {
        let _ = tokio::fs::remove_file(&temp_path).await;
    }
    written?;

    debug!(path = %target.display(), bytes = content.len(), "Wrote file");
    Ok(())
}

async fn write_temp(path: &Path, content: &[u8]) -> Result<()> {
    let mut file = tokio::fs::File::create(path)
        .await
        .map_err(|e| storage_error("failed to create", path, e))?;
    file.write_all(content)
        .await
        .map_err(|e| storage_error("failed to write", path, e))?;
    file.sync_all()
        .await
        .map_err(|e| storage_error("failed to sync", path, e))
}

/// Stores each record as `<dir>/<key>.json`.
#[derive(Debug, Clone)]
pub struct FileRecordStore {
    dir: PathBuf,
}

impl FileRecordStore {
    /// Create a store rooted at `dir`. The directory is created on first save.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The directory records are written to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document for a key.
    ///
    /// Keys are subject ids; anything that could leave the directory is
    /// refused.
    pub fn path_for(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.contains(['/', '\\'])
            && !key.contains('\0');
        if !valid {
            return Err(ExtractionError::Storage(
                format!("invalid record key {:?}", key).into(),
            ));
        }
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl RecordStore for FileRecordStore {
    async fn save_record(&self, key: &str, record: &RiskRecord) -> Result<()> {
        let path = self.path_for(key)?;
        let json = serde_json::to_vec_pretty(record)?;
        atomic_write(&path, &json).await
    }

    async fn load_record(&self, key: &str) -> Result<Option<RiskRecord>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error("failed to read", &path, e)),
        }
    }
}

/// A JSON array holding every record of a batch run.
///
/// Rewritten in full after each subject, so an interrupted batch leaves a
/// valid array of the subjects finished so far.
#[derive(Debug, Clone)]
pub struct AggregateFile {
    path: PathBuf,
}

impl AggregateFile {
    /// Create an aggregate at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the file with `records`.
    pub async fn write(&self, records: &[RiskRecord]) -> Result<()> {
        let json = serde_json::to_vec_pretty(records)?;
        atomic_write(&self.path, &json).await
    }

    /// Read the records, or an empty list if the file does not exist.
    pub async fn read(&self) -> Result<Vec<RiskRecord>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(storage_error("failed to read", &self.path, e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::record::{Overview, RiskScore};
    use crate::types::stats::PipelineStats;

    fn record(subject_id: &str, direct_risk: f64) -> RiskRecord {
        RiskRecord::new(
            subject_id,
            RiskScore {
                direct_risk,
                indirect_risk: 0.0,
                time_factor: 0.75,
                summary: "0 laws analyzed with no significant impact identified".to_string(),
                keypoints: vec!["No significant law impacts identified".to_string()],
                overview: Overview::default(),
            },
            PipelineStats::default(),
            "fingerprint",
        )
    }

    #[tokio::test]
    async fn test_save_and_load_record() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path().join("records"));

        let saved = record("ACME", -0.625);
        store.save_record("ACME", &saved).await.unwrap();

        assert!(dir.path().join("records/ACME.json").exists());
        let loaded = store.load_record("ACME").await.unwrap().unwrap();
        assert_eq!(loaded, saved);
        assert!(store.load_record("OTHER").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_replaces_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path());

        store.save_record("ACME", &record("ACME", -0.5)).await.unwrap();
        store.save_record("ACME", &record("ACME", 0.25)).await.unwrap();

        let loaded = store.load_record("ACME").await.unwrap().unwrap();
        assert_eq!(loaded.direct_risk, 0.25);

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["ACME.json".to_string()]);
    }

    #[tokio::test]
    async fn test_concurrent_saves_do_not_collide() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path());

        let first = record("ACME", -0.5);
        let second = record("ACME", 0.25);
        let (a, b) = tokio::join!(
            store.save_record("ACME", &first),
            store.save_record("ACME", &second)
        );
        a.unwrap();
        b.unwrap();

        let loaded = store.load_record("ACME").await.unwrap().unwrap();
        assert!(loaded == first || loaded == second);

        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["ACME.json".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_replace_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        // A non-empty directory in the record's place cannot be renamed over.
        let blocker = dir.path().join("ACME.json");
        std::fs::create_dir(&blocker).unwrap();
        std::fs::write(blocker.join("keep"), b"x").unwrap();

        let store = FileRecordStore::new(dir.path());
        let result = store.save_record("ACME", &record("ACME", 0.0)).await;

        assert!(matches!(result, Err(ExtractionError::Storage(_))));
        let entries: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(entries, vec!["ACME.json".to_string()]);
    }

    #[tokio::test]
    async fn test_path_escape_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileRecordStore::new(dir.path());
        for key in ["../ACME", "a/b", "", ".hidden"] {
            assert!(matches!(
                store.save_record(key, &record("ACME", 0.0)).await,
                Err(ExtractionError::Storage(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_aggregate_rewritten_in_full() {
        let dir = tempfile::tempdir().unwrap();
        let aggregate = AggregateFile::new(dir.path().join("all_results.json"));

        assert!(aggregate.read().await.unwrap().is_empty());

        aggregate.write(&[record("A", 0.1)]).await.unwrap();
        aggregate
            .write(&[record("A", 0.1), record("B", -0.2)])
            .await
            .unwrap();

        let records = aggregate.read().await.unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].subject_id, "B");
    }
}
