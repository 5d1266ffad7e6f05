use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use log::{info, warn};

use super::connection::JsonConnection;
use crate::domain::models::{Role, RolesDocument, VotesDocument};
use crate::error::{StorageError, StorageResult};
use crate::storage::traits::RoleStorage;

/// File-backed role repository over the whole `roles.json` document.
#[derive(Clone)]
pub struct JsonRoleRepository {
    connection: Arc<JsonConnection>,
}

impl JsonRoleRepository {
    pub fn new(connection: Arc<JsonConnection>) -> Self {
        Self { connection }
    }

    fn load(&self) -> StorageResult<RolesDocument> {
        self.connection
            .read_document(&self.connection.roles_path(), RolesDocument::default())
    }

    fn role_has_votes(&self, role_id: &str) -> StorageResult<bool> {
        let votes: VotesDocument = self
            .connection
            .read_document(&self.connection.votes_path(), VotesDocument::default())?;
        Ok(votes.votes.iter().any(|v| v.role_id == role_id))
    }
}

#[async_trait]
impl RoleStorage for JsonRoleRepository {
    async fn load_roles(&self) -> StorageResult<RolesDocument> {
        self.load()
    }

    async fn save_roles(&self, doc: &RolesDocument) -> StorageResult<()> {
        for role in &doc.roles {
            role.validate()?;
        }
        let _guard = self.connection.lock_roles();
        self.connection
            .write_document(&self.connection.roles_path(), doc)
    }

    async fn save_role(&self, role: &Role) -> StorageResult<Role> {
        role.validate()?;
        let mut stored = role.clone();
        stored.updated_at = Some(Utc::now());

        let _guard = self.connection.lock_roles();
        let mut doc = self.load()?;
        match doc.roles.iter_mut().find(|r| r.id == stored.id) {
            Some(existing) => {
                // Preserve the original creation time on upsert.
                stored.created_at = existing.created_at;
                *existing = stored.clone();
            }
            None => doc.roles.push(stored.clone()),
        }
        self.connection
            .write_document(&self.connection.roles_path(), &doc)?;
        info!("saved role {} ({})", stored.id, stored.position);
        Ok(stored)
    }

    async fn get_role_by_id(&self, role_id: &str) -> StorageResult<Option<Role>> {
        let doc = self.load()?;
        Ok(doc.roles.into_iter().find(|r| r.id == role_id))
    }

    async fn delete_role(&self, role_id: &str) -> StorageResult<bool> {
        let _guard = self.connection.lock_roles();
        if self.role_has_votes(role_id)? {
            warn!("refusing to delete role {role_id}: votes exist");
            return Err(StorageError::RoleHasVotes(role_id.to_string()));
        }
        let mut doc = self.load()?;
        let initial_len = doc.roles.len();
        doc.roles.retain(|r| r.id != role_id);
        if doc.roles.len() == initial_len {
            return Ok(false);
        }
        self.connection
            .write_document(&self.connection.roles_path(), &doc)?;
        info!("deleted role {role_id}");
        Ok(true)
    }
}
