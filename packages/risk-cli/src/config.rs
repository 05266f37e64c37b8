use anyhow::{Context, Result};
use dotenvy::dotenv;
use risk_extraction::security::ExtractorCredentials;
use risk_extraction::{PipelineConfig, Subject};
use std::env;
use std::path::Path;

/// CLI configuration loaded from environment variables
#[derive(Debug)]
pub struct Config {
    pub credentials: ExtractorCredentials,
    pub requests_per_second: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            credentials: ExtractorCredentials::from_env()
                .context("OPENAI_API_KEY must be set")?,
            requests_per_second: env::var("RISK_REQUESTS_PER_SECOND")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .context("RISK_REQUESTS_PER_SECOND must be a valid number")?,
        })
    }
}

/// Read a pipeline config file; missing fields take their defaults.
pub fn load_pipeline_config(path: Option<&Path>) -> Result<PipelineConfig> {
    let config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            serde_json::from_str(&json)
                .with_context(|| format!("Invalid pipeline config in {}", path.display()))?
        }
        None => PipelineConfig::default(),
    };
    config.validate()?;
    Ok(config)
}

/// Read a JSON array of subjects.
pub fn load_subjects(path: &Path) -> Result<Vec<Subject>> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("Invalid subjects in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_pipeline_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"max_chunk_chars": 3000, "chunk_concurrency": 4}"#).unwrap();

        let config = load_pipeline_config(Some(&path)).unwrap();
        assert_eq!(config.max_chunk_chars, 3000);
        assert_eq!(config.chunk_concurrency, 4);
        assert_eq!(config.overlap_chars, 200);
    }

    #[test]
    fn test_invalid_pipeline_config_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.json");
        std::fs::write(&path, r#"{"max_chunk_chars": 100, "overlap_chars": 100}"#).unwrap();

        assert!(load_pipeline_config(Some(&path)).is_err());
    }

    #[test]
    fn test_load_subjects() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("subjects.json");
        std::fs::write(
            &path,
            r#"[{
                "id": "ACME",
                "context": {"name": "Acme Corp", "sector": "Technology"},
                "documents": [{"name": "HR 1234", "source_ref": "bills/hr-1234.txt", "kind": "bill"}]
            }]"#,
        )
        .unwrap();

        let subjects = load_subjects(&path).unwrap();
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].documents[0].source_ref, "bills/hr-1234.txt");
    }
}
