//! # Storage Traits
//!
//! This module defines the storage abstraction traits that allow the two
//! persistence backends (JSON documents on disk, PostgreSQL) to be used
//! interchangeably by the rest of the system. Callers depend only on these
//! traits; [`super::Storage`] binds every call to exactly one backend,
//! chosen once at process start.

use async_trait::async_trait;

use crate::domain::models::{LegacyConfig, Role, RolesDocument, Vote, VotesDocument};
use crate::error::StorageResult;

/// Storage operations over roles and their candidate / allowed-voter sets.
#[async_trait]
pub trait RoleStorage: Send + Sync {
    /// Load the full roles document. An absent store yields an empty shell,
    /// never an error.
    async fn load_roles(&self) -> StorageResult<RolesDocument>;

    /// Replace the entire roles document.
    async fn save_roles(&self, doc: &RolesDocument) -> StorageResult<()>;

    /// Upsert a single role by id, replacing its candidate and allowed-voter
    /// sets with those on the given record. Returns the stored role.
    async fn save_role(&self, role: &Role) -> StorageResult<Role>;

    /// Retrieve a specific role by ID.
    async fn get_role_by_id(&self, role_id: &str) -> StorageResult<Option<Role>>;

    /// Delete a role by ID. Returns `false` when no such role exists and
    /// fails with [`crate::StorageError::RoleHasVotes`] when any vote still
    /// references the role.
    async fn delete_role(&self, role_id: &str) -> StorageResult<bool>;
}

/// Storage operations over votes.
#[async_trait]
pub trait VoteStorage: Send + Sync {
    /// Load the full votes document.
    async fn load_votes(&self) -> StorageResult<VotesDocument>;

    /// Replace the entire votes document.
    async fn save_votes(&self, doc: &VotesDocument) -> StorageResult<()>;

    /// Upsert a single vote on its natural key (voter, candidate, role).
    /// A resubmission overwrites choice, feedback, timestamp, and the
    /// denormalized name fields; it never produces a second record.
    async fn save_vote(&self, vote: &Vote) -> StorageResult<()>;
}

/// Storage operations over the deprecated single-role config record.
#[async_trait]
pub trait ConfigStorage: Send + Sync {
    /// Load the legacy configuration, defaulting to an unconfigured record.
    async fn load_config(&self) -> StorageResult<LegacyConfig>;

    /// Persist the legacy configuration.
    async fn save_config(&self, config: &LegacyConfig) -> StorageResult<()>;
}
