use std::time::Duration;

use log::info;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::error::{StorageError, StorageResult};

/// Bound on how long a request may wait for a pooled connection, so a stuck
/// database never blocks a request handler indefinitely.
const ACQUIRE_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_CONNECTIONS: u32 = 5;

/// DbConnection manages the PostgreSQL pool and schema lifecycle.
#[derive(Clone)]
pub struct DbConnection {
    pool: PgPool,
}

impl DbConnection {
    /// Connect to the database named by the connection string.
    ///
    /// Fails fast when the server is unreachable: once a connection string
    /// is supplied the process must run against the database or not at all,
    /// never silently fall back to file storage.
    pub async fn connect(url: &str) -> StorageResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .acquire_timeout(ACQUIRE_TIMEOUT)
            .connect(url)
            .await
            .map_err(|e| {
                StorageError::Configuration(format!("cannot connect to database: {e}"))
            })?;
        info!("connected to database");
        Ok(Self { pool })
    }

    /// Get the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Create all tables and constraints if absent, then apply the in-place
    /// column upgrades for schemas created by older releases. Idempotent;
    /// safe to call on every startup.
    pub async fn init_db(&self) -> StorageResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS roles (
                id UUID PRIMARY KEY,
                position VARCHAR(255) NOT NULL,
                status VARCHAR(50) NOT NULL DEFAULT 'active',
                created_at TIMESTAMPTZ NOT NULL DEFAULT now(),
                updated_at TIMESTAMPTZ
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS candidates (
                id SERIAL PRIMARY KEY,
                role_id UUID NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
                candidate_id VARCHAR(50) NOT NULL,
                name VARCHAR(255) NOT NULL,
                CONSTRAINT uq_role_candidate UNIQUE (role_id, candidate_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS allowed_voters (
                id SERIAL PRIMARY KEY,
                role_id UUID NOT NULL REFERENCES roles(id) ON DELETE CASCADE,
                email VARCHAR(255) NOT NULL,
                CONSTRAINT uq_role_email UNIQUE (role_id, email)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        // ON DELETE RESTRICT is the engine-level deletion guard: a role with
        // votes cannot be removed even if the application check races.
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS votes (
                id SERIAL PRIMARY KEY,
                voter VARCHAR(255) NOT NULL,
                candidate_id VARCHAR(50) NOT NULL,
                candidate_name VARCHAR(255),
                role_id UUID NOT NULL REFERENCES roles(id) ON DELETE RESTRICT,
                role_position VARCHAR(255),
                choice VARCHAR(50) NOT NULL,
                feedback TEXT,
                "timestamp" TIMESTAMPTZ NOT NULL DEFAULT now(),
                CONSTRAINT uq_voter_candidate_role UNIQUE (voter, candidate_id, role_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS config (
                id INTEGER PRIMARY KEY,
                position VARCHAR(255),
                is_configured BOOLEAN NOT NULL DEFAULT FALSE,
                CONSTRAINT single_row_check CHECK (id = 1)
            );
            "#,
        )
        .execute(&self.pool)
        .await?;

        // Columns added after the original schema shipped; upgrades existing
        // databases in place.
        sqlx::query("ALTER TABLE roles ADD COLUMN IF NOT EXISTS hiring_manager VARCHAR(255);")
            .execute(&self.pool)
            .await?;
        sqlx::query(
            "ALTER TABLE roles ADD COLUMN IF NOT EXISTS allow_results_override BOOLEAN NOT NULL DEFAULT FALSE;",
        )
        .execute(&self.pool)
        .await?;

        info!("database schema initialized");
        Ok(())
    }
}
