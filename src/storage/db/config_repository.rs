use async_trait::async_trait;
use log::info;
use sqlx::Row;
use uuid::Uuid;

use super::connection::DbConnection;
use crate::domain::models::{Candidate, LegacyConfig};
use crate::error::StorageResult;
use crate::storage::traits::ConfigStorage;

/// Relational repository for the deprecated single-role config record
/// (single-row table, CHECK id = 1).
///
/// For readers that still consume the legacy shape, the first role's
/// candidates and voters are reflected into the returned record when any
/// role exists.
#[derive(Clone)]
pub struct DbConfigRepository {
    db: DbConnection,
}

impl DbConfigRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl ConfigStorage for DbConfigRepository {
    async fn load_config(&self) -> StorageResult<LegacyConfig> {
        let config_row = sqlx::query("SELECT position, is_configured FROM config WHERE id = 1")
            .fetch_optional(self.db.pool())
            .await?;
        let Some(config_row) = config_row else {
            return Ok(LegacyConfig::default());
        };
        let is_configured: bool = config_row.get("is_configured");

        let first_role =
            sqlx::query("SELECT id, position FROM roles ORDER BY created_at LIMIT 1")
                .fetch_optional(self.db.pool())
                .await?;
        if let Some(role_row) = first_role {
            let role_id: Uuid = role_row.get("id");
            let candidates = sqlx::query(
                "SELECT candidate_id, name FROM candidates WHERE role_id = $1 ORDER BY id",
            )
            .bind(role_id)
            .fetch_all(self.db.pool())
            .await?
            .iter()
            .map(|row| Candidate {
                id: row.get("candidate_id"),
                name: row.get("name"),
            })
            .collect();
            let allowed_emails =
                sqlx::query("SELECT email FROM allowed_voters WHERE role_id = $1 ORDER BY id")
                    .bind(role_id)
                    .fetch_all(self.db.pool())
                    .await?
                    .iter()
                    .map(|row| row.get("email"))
                    .collect();
            return Ok(LegacyConfig {
                position: role_row.get("position"),
                candidates,
                allowed_emails,
                is_configured,
            });
        }

        Ok(LegacyConfig {
            position: config_row
                .get::<Option<String>, _>("position")
                .unwrap_or_default(),
            candidates: Vec::new(),
            allowed_emails: Vec::new(),
            is_configured,
        })
    }

    async fn save_config(&self, config: &LegacyConfig) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO config (id, position, is_configured)
            VALUES (1, $1, $2)
            ON CONFLICT (id) DO UPDATE SET
                position = EXCLUDED.position,
                is_configured = EXCLUDED.is_configured
            "#,
        )
        .bind(&config.position)
        .bind(config.is_configured)
        .execute(self.db.pool())
        .await?;
        info!("saved legacy config");
        Ok(())
    }
}
