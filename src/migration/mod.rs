//! # Migration
//!
//! One-shot transfer of the file store's contents into a freshly
//! initialized relational store: initialize the schema, copy every role and
//! vote through the relational upserts, verify row counts against the
//! source documents, then snapshot the original JSON files to timestamped
//! backups. The originals are never modified or deleted.
//!
//! Re-running against a non-empty target is safe: every write is an upsert,
//! so records with the same ids are overwritten rather than duplicated.

use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use log::{info, warn};

use crate::domain::models::RolesDocument;
use crate::error::{StorageError, StorageResult};
use crate::storage::json::connection::{ROLES_FILE, VOTES_FILE};
use crate::storage::traits::{RoleStorage, VoteStorage};
use crate::storage::{DbStorage, JsonConnection, JsonStorage};

/// Row counts observed after a completed migration, plus the backup files
/// written for the source documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    pub roles: usize,
    pub candidates: usize,
    pub allowed_voters: usize,
    pub votes: usize,
    pub backups: Vec<PathBuf>,
}

/// Counts parsed from a roles document: (roles, candidates, allowed voters).
pub fn document_counts(doc: &RolesDocument) -> (usize, usize, usize) {
    let candidates = doc.roles.iter().map(|r| r.candidates.len()).sum();
    let voters = doc.roles.iter().map(|r| r.allowed_emails.len()).sum();
    (doc.roles.len(), candidates, voters)
}

/// Copy `roles.json` and `votes.json` to timestamped backup siblings
/// (`roles.json.backup_YYYYMMDD_HHMMSS`). Files that do not exist are
/// skipped. The originals are left byte-identical.
pub fn backup_json_documents(connection: &JsonConnection) -> StorageResult<Vec<PathBuf>> {
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let mut backups = Vec::new();
    for name in [ROLES_FILE, VOTES_FILE] {
        let path = connection.base_directory().join(name);
        if !path.exists() {
            continue;
        }
        let backup_path = connection
            .base_directory()
            .join(format!("{name}.backup_{timestamp}"));
        fs::copy(&path, &backup_path)?;
        info!("created backup {}", backup_path.display());
        backups.push(backup_path);
    }
    Ok(backups)
}

/// The one-shot file-store → relational-store migrator.
pub struct Migrator {
    source_connection: Arc<JsonConnection>,
    source: JsonStorage,
    target: DbStorage,
}

impl Migrator {
    pub fn new(source_connection: Arc<JsonConnection>, target: DbStorage) -> Self {
        let source = JsonStorage::new(source_connection.clone());
        Self {
            source_connection,
            source,
            target,
        }
    }

    /// Run the migration end to end. Any write failure aborts the remaining
    /// steps; data already written stays (re-run to completion after fixing
    /// the cause). A verification mismatch is reported as an error and does
    /// not roll anything back.
    pub async fn run(&self) -> StorageResult<MigrationReport> {
        info!("initializing database schema");
        self.target.connection().init_db().await?;

        info!("reading source documents");
        let roles_doc = self.source.roles().load_roles().await?;
        let votes_doc = self.source.votes().load_votes().await?;
        let (source_roles, source_candidates, source_voters) = document_counts(&roles_doc);
        info!(
            "loaded {} roles ({} candidates, {} allowed voters) and {} votes",
            source_roles,
            source_candidates,
            source_voters,
            votes_doc.votes.len()
        );

        info!("migrating roles");
        for role in &roles_doc.roles {
            self.target.roles().save_role(role).await?;
        }

        info!("migrating votes");
        for vote in &votes_doc.votes {
            self.target.votes().save_vote(vote).await?;
        }

        info!("verifying migrated data");
        let migrated_roles = self.target.roles().load_roles().await?;
        let migrated_votes = self.target.votes().load_votes().await?;
        let (db_roles, db_candidates, db_voters) = document_counts(&migrated_roles);

        if db_roles != source_roles {
            return Err(StorageError::MigrationVerification(format!(
                "role count mismatch: source={source_roles}, database={db_roles}"
            )));
        }
        if db_candidates != source_candidates {
            return Err(StorageError::MigrationVerification(format!(
                "candidate count mismatch: source={source_candidates}, database={db_candidates}"
            )));
        }
        if db_voters != source_voters {
            return Err(StorageError::MigrationVerification(format!(
                "allowed voter count mismatch: source={source_voters}, database={db_voters}"
            )));
        }
        if migrated_votes.votes.len() != votes_doc.votes.len() {
            return Err(StorageError::MigrationVerification(format!(
                "vote count mismatch: source={}, database={}",
                votes_doc.votes.len(),
                migrated_votes.votes.len()
            )));
        }

        let backups = match backup_json_documents(&self.source_connection) {
            Ok(backups) => backups,
            Err(e) => {
                // The data is already migrated and verified; a failed backup
                // is reported but does not fail the migration.
                warn!("could not create backups: {e}");
                Vec::new()
            }
        };

        Ok(MigrationReport {
            roles: db_roles,
            candidates: db_candidates,
            allowed_voters: db_voters,
            votes: migrated_votes.votes.len(),
            backups,
        })
    }
}
