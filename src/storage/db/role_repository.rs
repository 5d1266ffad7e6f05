use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use super::connection::DbConnection;
use crate::domain::models::{Candidate, Role, RoleStatus, RolesDocument};
use crate::error::{StorageError, StorageResult};
use crate::storage::traits::RoleStorage;

/// Relational role repository over the roles / candidates / allowed_voters
/// tables.
#[derive(Clone)]
pub struct DbRoleRepository {
    db: DbConnection,
}

impl DbRoleRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn role_from_row(row: &PgRow) -> StorageResult<Role> {
        Ok(Role {
            id: row.get::<Uuid, _>("id").to_string(),
            position: row.get("position"),
            candidates: Vec::new(),
            allowed_emails: Vec::new(),
            status: RoleStatus::parse(row.get("status"))?,
            hiring_manager: row.get("hiring_manager"),
            allow_results_override: row.get("allow_results_override"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        })
    }

    async fn load_children(
        pool: &sqlx::PgPool,
        role: &mut Role,
        role_id: Uuid,
    ) -> StorageResult<()> {
        let candidate_rows = sqlx::query(
            "SELECT candidate_id, name FROM candidates WHERE role_id = $1 ORDER BY id",
        )
        .bind(role_id)
        .fetch_all(pool)
        .await?;
        role.candidates = candidate_rows
            .iter()
            .map(|row| Candidate {
                id: row.get("candidate_id"),
                name: row.get("name"),
            })
            .collect();

        let voter_rows =
            sqlx::query("SELECT email FROM allowed_voters WHERE role_id = $1 ORDER BY id")
                .bind(role_id)
                .fetch_all(pool)
                .await?;
        role.allowed_emails = voter_rows.iter().map(|row| row.get("email")).collect();
        Ok(())
    }

    async fn insert_children(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        role: &Role,
        role_id: Uuid,
    ) -> StorageResult<()> {
        for candidate in &role.candidates {
            sqlx::query(
                "INSERT INTO candidates (role_id, candidate_id, name) VALUES ($1, $2, $3)",
            )
            .bind(role_id)
            .bind(&candidate.id)
            .bind(&candidate.name)
            .execute(&mut **tx)
            .await?;
        }
        for email in &role.allowed_emails {
            sqlx::query("INSERT INTO allowed_voters (role_id, email) VALUES ($1, $2)")
                .bind(role_id)
                .bind(email)
                .execute(&mut **tx)
                .await?;
        }
        Ok(())
    }
}

pub(super) fn parse_role_id(role_id: &str) -> StorageResult<Uuid> {
    Uuid::parse_str(role_id)
        .map_err(|_| StorageError::Validation(format!("invalid role id: {role_id}")))
}

/// Map a foreign-key violation on `votes.role_id` to the deletion guard.
fn guard_on_fk_violation(err: sqlx::Error, role_id: &str) -> StorageError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.code().as_deref() == Some("23503") {
            return StorageError::RoleHasVotes(role_id.to_string());
        }
    }
    StorageError::Database(err)
}

#[async_trait]
impl RoleStorage for DbRoleRepository {
    async fn load_roles(&self) -> StorageResult<RolesDocument> {
        let rows = sqlx::query(
            r#"
            SELECT id, position, status, hiring_manager, allow_results_override,
                   created_at, updated_at
            FROM roles
            ORDER BY created_at
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        let mut roles = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut role = Self::role_from_row(row)?;
            let role_id = row.get::<Uuid, _>("id");
            Self::load_children(self.db.pool(), &mut role, role_id).await?;
            roles.push(role);
        }
        Ok(RolesDocument { roles })
    }

    async fn save_roles(&self, doc: &RolesDocument) -> StorageResult<()> {
        for role in &doc.roles {
            role.validate()?;
        }
        let mut tx = self.db.pool().begin().await?;
        // Full overwrite, mirroring the whole-document JSON semantics. The
        // RESTRICT constraint on votes still applies: replacing roles out
        // from under recorded votes is refused by the engine.
        sqlx::query("DELETE FROM roles")
            .execute(&mut *tx)
            .await?;
        for role in &doc.roles {
            let role_id = parse_role_id(&role.id)?;
            sqlx::query(
                r#"
                INSERT INTO roles (id, position, status, hiring_manager,
                                   allow_results_override, created_at, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
            )
            .bind(role_id)
            .bind(&role.position)
            .bind(role.status.as_str())
            .bind(&role.hiring_manager)
            .bind(role.allow_results_override)
            .bind(role.created_at)
            .bind(role.updated_at)
            .execute(&mut *tx)
            .await?;
            Self::insert_children(&mut tx, role, role_id).await?;
        }
        tx.commit().await?;
        info!("replaced roles document ({} roles)", doc.roles.len());
        Ok(())
    }

    async fn save_role(&self, role: &Role) -> StorageResult<Role> {
        role.validate()?;
        let role_id = parse_role_id(&role.id)?;
        let mut stored = role.clone();
        stored.updated_at = Some(Utc::now());

        // One transaction: upsert the role row, then fully replace its child
        // sets so they always match the submitted document.
        let mut tx = self.db.pool().begin().await?;
        let row = sqlx::query(
            r#"
            INSERT INTO roles (id, position, status, hiring_manager,
                               allow_results_override, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (id) DO UPDATE SET
                position = EXCLUDED.position,
                status = EXCLUDED.status,
                hiring_manager = EXCLUDED.hiring_manager,
                allow_results_override = EXCLUDED.allow_results_override,
                updated_at = EXCLUDED.updated_at
            RETURNING created_at
            "#,
        )
        .bind(role_id)
        .bind(&stored.position)
        .bind(stored.status.as_str())
        .bind(&stored.hiring_manager)
        .bind(stored.allow_results_override)
        .bind(stored.created_at)
        .bind(stored.updated_at)
        .fetch_one(&mut *tx)
        .await?;
        // An update keeps the original creation time.
        stored.created_at = row.get("created_at");

        sqlx::query("DELETE FROM candidates WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM allowed_voters WHERE role_id = $1")
            .bind(role_id)
            .execute(&mut *tx)
            .await?;
        Self::insert_children(&mut tx, &stored, role_id).await?;
        tx.commit().await?;

        info!("saved role {} ({})", stored.id, stored.position);
        Ok(stored)
    }

    async fn get_role_by_id(&self, role_id: &str) -> StorageResult<Option<Role>> {
        let id = parse_role_id(role_id)?;
        let row = sqlx::query(
            r#"
            SELECT id, position, status, hiring_manager, allow_results_override,
                   created_at, updated_at
            FROM roles
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.db.pool())
        .await?;

        match row {
            Some(row) => {
                let mut role = Self::role_from_row(&row)?;
                Self::load_children(self.db.pool(), &mut role, id).await?;
                Ok(Some(role))
            }
            None => Ok(None),
        }
    }

    async fn delete_role(&self, role_id: &str) -> StorageResult<bool> {
        let id = parse_role_id(role_id)?;
        let mut tx = self.db.pool().begin().await?;

        let exists = sqlx::query("SELECT 1 FROM roles WHERE id = $1")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .is_some();
        if !exists {
            return Ok(false);
        }

        // Check and delete observe one snapshot inside this transaction; the
        // RESTRICT constraint backstops a vote inserted concurrently.
        let has_votes: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM votes WHERE role_id = $1)")
                .bind(id)
                .fetch_one(&mut *tx)
                .await?;
        if has_votes {
            warn!("refusing to delete role {role_id}: votes exist");
            return Err(StorageError::RoleHasVotes(role_id.to_string()));
        }

        sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(|e| guard_on_fk_violation(e, role_id))?;
        tx.commit()
            .await
            .map_err(|e| guard_on_fk_violation(e, role_id))?;

        info!("deleted role {role_id}");
        Ok(true)
    }
}
