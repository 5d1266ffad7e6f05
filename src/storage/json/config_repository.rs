use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use serde_json::Value;

use super::connection::JsonConnection;
use crate::domain::models::{Candidate, LegacyConfig};
use crate::error::{StorageError, StorageResult};
use crate::storage::traits::ConfigStorage;

/// File-backed repository for the deprecated single-role config record.
///
/// Kept for backward read compatibility only; the pre-candidates document
/// shape (a scalar `candidate_name`) is migrated to the `candidates` array
/// form on load so the oldest deployments still read cleanly.
#[derive(Clone)]
pub struct JsonConfigRepository {
    connection: Arc<JsonConnection>,
}

impl JsonConfigRepository {
    pub fn new(connection: Arc<JsonConnection>) -> Self {
        Self { connection }
    }
}

#[async_trait]
impl ConfigStorage for JsonConfigRepository {
    async fn load_config(&self) -> StorageResult<LegacyConfig> {
        let path = self.connection.config_path();
        let raw: Value = self.connection.read_document(&path, Value::Null)?;
        if raw.is_null() {
            return Ok(LegacyConfig::default());
        }

        let mut raw = raw;
        // Oldest format: single candidate_name scalar instead of candidates.
        if let Some(object) = raw.as_object_mut() {
            if object.contains_key("candidate_name") && !object.contains_key("candidates") {
                let name = object
                    .remove("candidate_name")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_default();
                let candidates = if name.is_empty() {
                    Vec::new()
                } else {
                    vec![Candidate {
                        id: "1".to_string(),
                        name,
                    }]
                };
                object.insert(
                    "candidates".to_string(),
                    serde_json::to_value(candidates).unwrap_or(Value::Array(Vec::new())),
                );
            }
        }

        serde_json::from_value(raw).map_err(|source| StorageError::MalformedDocument {
            path,
            source,
        })
    }

    async fn save_config(&self, config: &LegacyConfig) -> StorageResult<()> {
        let _guard = self.connection.lock_config();
        self.connection
            .write_document(&self.connection.config_path(), config)?;
        info!("saved legacy config");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup() -> (JsonConfigRepository, Arc<JsonConnection>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let connection = Arc::new(JsonConnection::new(temp_dir.path()).unwrap());
        let repo = JsonConfigRepository::new(connection.clone());
        (repo, connection, temp_dir)
    }

    #[tokio::test]
    async fn test_absent_file_yields_unconfigured_default() {
        let (repo, _conn, _tmp) = setup();
        let config = repo.load_config().await.unwrap();
        assert_eq!(config, LegacyConfig::default());
    }

    #[tokio::test]
    async fn test_save_then_load_round_trips() {
        let (repo, _conn, _tmp) = setup();
        let config = LegacyConfig {
            position: "Barista".to_string(),
            candidates: vec![Candidate {
                id: "1".to_string(),
                name: "Alice".to_string(),
            }],
            allowed_emails: vec!["v1@x.com".to_string()],
            is_configured: true,
        };
        repo.save_config(&config).await.unwrap();
        assert_eq!(repo.load_config().await.unwrap(), config);
    }

    #[tokio::test]
    async fn test_oldest_format_migrated_on_read() {
        let (repo, conn, _tmp) = setup();
        std::fs::write(
            conn.config_path(),
            r#"{
                "candidate_name": "Alice",
                "position": "Barista",
                "allowed_emails": ["v1@x.com"],
                "is_configured": true
            }"#,
        )
        .unwrap();

        let config = repo.load_config().await.unwrap();
        assert_eq!(config.candidates.len(), 1);
        assert_eq!(config.candidates[0].id, "1");
        assert_eq!(config.candidates[0].name, "Alice");
        assert!(config.is_configured);
    }

    #[tokio::test]
    async fn test_oldest_format_with_empty_name_migrates_to_no_candidates() {
        let (repo, conn, _tmp) = setup();
        std::fs::write(
            conn.config_path(),
            r#"{"candidate_name": "", "position": "", "allowed_emails": [], "is_configured": false}"#,
        )
        .unwrap();
        let config = repo.load_config().await.unwrap();
        assert!(config.candidates.is_empty());
    }
}
