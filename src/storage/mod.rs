//! # Storage Module
//!
//! One uniform persistence contract with two interchangeable backends:
//! JSON documents on disk for local deployments, PostgreSQL when a
//! connection string is configured.
//!
//! [`Storage`] is the router: the backend is chosen exactly once at process
//! start (from `DATABASE_URL`), and every operation dispatches to that one
//! backend for the process lifetime. Callers depend on the traits in
//! [`traits`] and never branch on the backend themselves.

pub mod db;
pub mod json;
pub mod traits;

use std::sync::Arc;

use async_trait::async_trait;
use log::info;

use crate::domain::models::{LegacyConfig, Role, RolesDocument, Vote, VotesDocument};
use crate::error::StorageResult;

pub use db::{DbConfigRepository, DbConnection, DbRoleRepository, DbVoteRepository};
pub use json::{JsonConfigRepository, JsonConnection, JsonRoleRepository, JsonVoteRepository};
pub use traits::{ConfigStorage, RoleStorage, VoteStorage};

/// Environment variable carrying the PostgreSQL connection string. When it
/// is set the relational backend is mandatory; when it is absent the file
/// backend is used.
pub const DATABASE_URL_ENV: &str = "DATABASE_URL";

/// File-backed storage: the three repositories over one shared connection.
#[derive(Clone)]
pub struct JsonStorage {
    roles: JsonRoleRepository,
    votes: JsonVoteRepository,
    config: JsonConfigRepository,
}

impl JsonStorage {
    pub fn new(connection: Arc<JsonConnection>) -> Self {
        Self {
            roles: JsonRoleRepository::new(connection.clone()),
            votes: JsonVoteRepository::new(connection.clone()),
            config: JsonConfigRepository::new(connection),
        }
    }

    /// Open the file backend over the given data directory.
    pub fn open<P: AsRef<std::path::Path>>(base_directory: P) -> StorageResult<Self> {
        Ok(Self::new(Arc::new(JsonConnection::new(base_directory)?)))
    }

    pub fn roles(&self) -> &JsonRoleRepository {
        &self.roles
    }

    pub fn votes(&self) -> &JsonVoteRepository {
        &self.votes
    }

    pub fn config(&self) -> &JsonConfigRepository {
        &self.config
    }
}

/// Database-backed storage: the three repositories over one shared pool.
#[derive(Clone)]
pub struct DbStorage {
    connection: DbConnection,
    roles: DbRoleRepository,
    votes: DbVoteRepository,
    config: DbConfigRepository,
}

impl DbStorage {
    pub fn new(connection: DbConnection) -> Self {
        Self {
            roles: DbRoleRepository::new(connection.clone()),
            votes: DbVoteRepository::new(connection.clone()),
            config: DbConfigRepository::new(connection.clone()),
            connection,
        }
    }

    /// Connect to the database; fails fast when it is unreachable.
    pub async fn connect(url: &str) -> StorageResult<Self> {
        Ok(Self::new(DbConnection::connect(url).await?))
    }

    pub fn connection(&self) -> &DbConnection {
        &self.connection
    }

    pub fn roles(&self) -> &DbRoleRepository {
        &self.roles
    }

    pub fn votes(&self) -> &DbVoteRepository {
        &self.votes
    }

    pub fn config(&self) -> &DbConfigRepository {
        &self.config
    }
}

/// The storage router: exactly one backend per process lifetime.
pub enum Storage {
    Json(JsonStorage),
    Database(DbStorage),
}

impl Storage {
    /// Select the backend from the environment, once, at process start.
    ///
    /// A configured `DATABASE_URL` makes the relational backend mandatory;
    /// failure to connect is returned as an error rather than degrading to
    /// file storage, so a process never runs against the wrong backend.
    pub async fn from_env() -> StorageResult<Self> {
        match std::env::var(DATABASE_URL_ENV) {
            Ok(url) if !url.trim().is_empty() => {
                info!("using PostgreSQL database for storage");
                Ok(Storage::Database(DbStorage::connect(&url).await?))
            }
            _ => {
                info!("using JSON files for storage");
                Ok(Storage::Json(JsonStorage::new(Arc::new(
                    JsonConnection::new_default()?,
                ))))
            }
        }
    }

    /// Which backend this process is bound to.
    pub fn backend_name(&self) -> &'static str {
        match self {
            Storage::Json(_) => "json",
            Storage::Database(_) => "database",
        }
    }

    /// Create schema/constraints where the backend needs them. A no-op for
    /// the file backend (files come into existence lazily); idempotent
    /// schema creation for the database backend.
    pub async fn init_db(&self) -> StorageResult<()> {
        match self {
            Storage::Json(_) => Ok(()),
            Storage::Database(storage) => storage.connection().init_db().await,
        }
    }
}

#[async_trait]
impl RoleStorage for Storage {
    async fn load_roles(&self) -> StorageResult<RolesDocument> {
        match self {
            Storage::Json(s) => s.roles.load_roles().await,
            Storage::Database(s) => s.roles.load_roles().await,
        }
    }

    async fn save_roles(&self, doc: &RolesDocument) -> StorageResult<()> {
        match self {
            Storage::Json(s) => s.roles.save_roles(doc).await,
            Storage::Database(s) => s.roles.save_roles(doc).await,
        }
    }

    async fn save_role(&self, role: &Role) -> StorageResult<Role> {
        match self {
            Storage::Json(s) => s.roles.save_role(role).await,
            Storage::Database(s) => s.roles.save_role(role).await,
        }
    }

    async fn get_role_by_id(&self, role_id: &str) -> StorageResult<Option<Role>> {
        match self {
            Storage::Json(s) => s.roles.get_role_by_id(role_id).await,
            Storage::Database(s) => s.roles.get_role_by_id(role_id).await,
        }
    }

    async fn delete_role(&self, role_id: &str) -> StorageResult<bool> {
        match self {
            Storage::Json(s) => s.roles.delete_role(role_id).await,
            Storage::Database(s) => s.roles.delete_role(role_id).await,
        }
    }
}

#[async_trait]
impl VoteStorage for Storage {
    async fn load_votes(&self) -> StorageResult<VotesDocument> {
        match self {
            Storage::Json(s) => s.votes.load_votes().await,
            Storage::Database(s) => s.votes.load_votes().await,
        }
    }

    async fn save_votes(&self, doc: &VotesDocument) -> StorageResult<()> {
        match self {
            Storage::Json(s) => s.votes.save_votes(doc).await,
            Storage::Database(s) => s.votes.save_votes(doc).await,
        }
    }

    async fn save_vote(&self, vote: &Vote) -> StorageResult<()> {
        match self {
            Storage::Json(s) => s.votes.save_vote(vote).await,
            Storage::Database(s) => s.votes.save_vote(vote).await,
        }
    }
}

#[async_trait]
impl ConfigStorage for Storage {
    async fn load_config(&self) -> StorageResult<LegacyConfig> {
        match self {
            Storage::Json(s) => s.config.load_config().await,
            Storage::Database(s) => s.config.load_config().await,
        }
    }

    async fn save_config(&self, config: &LegacyConfig) -> StorageResult<()> {
        match self {
            Storage::Json(s) => s.config.save_config(config).await,
            Storage::Database(s) => s.config.save_config(config).await,
        }
    }
}
