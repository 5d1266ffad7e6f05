use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// Maximum number of allowed voters per role.
pub const MAX_ALLOWED_VOTERS: usize = 5;

/// Lifecycle status of a role.
///
/// A role with recorded votes is never physically deleted; it can only be
/// moved to `Expired`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleStatus {
    Active,
    Fulfilled,
    Expired,
}

impl Default for RoleStatus {
    fn default() -> Self {
        RoleStatus::Active
    }
}

impl RoleStatus {
    /// Wire string as stored in both backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            RoleStatus::Active => "active",
            RoleStatus::Fulfilled => "fulfilled",
            RoleStatus::Expired => "expired",
        }
    }

    /// Parse the stored string, rejecting anything outside the known set.
    pub fn parse(value: &str) -> StorageResult<Self> {
        match value {
            "active" => Ok(RoleStatus::Active),
            "fulfilled" => Ok(RoleStatus::Fulfilled),
            "expired" => Ok(RoleStatus::Expired),
            other => Err(StorageError::Validation(format!(
                "unknown role status: {other}"
            ))),
        }
    }
}

/// A candidate being evaluated within a role. The `id` is role-scoped
/// (unique within its role), not globally unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub id: String,
    pub name: String,
}

/// Domain model for a voting role: one open position, its candidates, and
/// the set of voter emails permitted to vote on them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Role {
    pub id: String,
    pub position: String,
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub allowed_emails: Vec<String>,
    #[serde(default)]
    pub status: RoleStatus,
    #[serde(default)]
    pub hiring_manager: Option<String>,
    #[serde(default)]
    pub allow_results_override: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

impl Role {
    /// Create a new active role with a fresh id.
    pub fn new(position: impl Into<String>) -> Self {
        Role {
            id: Self::generate_id(),
            position: position.into(),
            candidates: Vec::new(),
            allowed_emails: Vec::new(),
            status: RoleStatus::Active,
            hiring_manager: None,
            allow_results_override: false,
            created_at: Utc::now(),
            updated_at: None,
        }
    }

    /// Generate a unique ID for a role.
    pub fn generate_id() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    /// Check the role's structural invariants.
    ///
    /// Rejects an empty position, more than [`MAX_ALLOWED_VOTERS`] voters,
    /// duplicate candidate ids, and duplicate voter emails (compared
    /// case-insensitively). No side effects.
    pub fn validate(&self) -> StorageResult<()> {
        if self.id.trim().is_empty() {
            return Err(StorageError::Validation("role id is required".into()));
        }
        if self.position.trim().is_empty() {
            return Err(StorageError::Validation(
                "role position is required".into(),
            ));
        }
        if self.allowed_emails.len() > MAX_ALLOWED_VOTERS {
            return Err(StorageError::Validation(format!(
                "at most {MAX_ALLOWED_VOTERS} allowed voters per role, got {}",
                self.allowed_emails.len()
            )));
        }
        for email in &self.allowed_emails {
            if !email.contains('@') {
                return Err(StorageError::Validation(format!(
                    "invalid voter email: {email}"
                )));
            }
        }
        let mut seen_candidates = Vec::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            if candidate.id.trim().is_empty() || candidate.name.trim().is_empty() {
                return Err(StorageError::Validation(
                    "candidate id and name are required".into(),
                ));
            }
            if seen_candidates.contains(&candidate.id.as_str()) {
                return Err(StorageError::Validation(format!(
                    "duplicate candidate id within role: {}",
                    candidate.id
                )));
            }
            seen_candidates.push(candidate.id.as_str());
        }
        let mut seen_emails: Vec<String> = Vec::with_capacity(self.allowed_emails.len());
        for email in &self.allowed_emails {
            let lowered = email.to_lowercase();
            if seen_emails.contains(&lowered) {
                return Err(StorageError::Validation(format!(
                    "duplicate voter email within role: {email}"
                )));
            }
            seen_emails.push(lowered);
        }
        Ok(())
    }

    /// Look up a candidate by its role-scoped id.
    pub fn candidate(&self, candidate_id: &str) -> Option<&Candidate> {
        self.candidates.iter().find(|c| c.id == candidate_id)
    }
}

/// The full roles document: the unit of whole-document reads and writes in
/// the file store, and the shape `load_roles` returns from both backends.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RolesDocument {
    #[serde(default)]
    pub roles: Vec<Role>,
}
