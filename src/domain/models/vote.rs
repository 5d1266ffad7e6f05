use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{StorageError, StorageResult};

/// The two possible ballot values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VoteChoice {
    Inclined,
    #[serde(rename = "Not Inclined")]
    NotInclined,
}

impl VoteChoice {
    /// Wire string as stored in both backends.
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteChoice::Inclined => "Inclined",
            VoteChoice::NotInclined => "Not Inclined",
        }
    }

    /// Parse the stored string, rejecting anything outside the known set.
    pub fn parse(value: &str) -> StorageResult<Self> {
        match value {
            "Inclined" => Ok(VoteChoice::Inclined),
            "Not Inclined" => Ok(VoteChoice::NotInclined),
            other => Err(StorageError::Validation(format!(
                "unknown vote choice: {other}"
            ))),
        }
    }
}

/// One voter's ballot for one candidate within one role.
///
/// The natural key is (voter, candidate_id, role_id); a second submission
/// for the same key updates the existing record in place. `candidate_name`
/// and `role_position` are denormalized at write time for fast result reads
/// and are intentionally never refreshed if the source role or candidate is
/// later renamed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: String,
    pub candidate_id: String,
    #[serde(default)]
    pub candidate_name: Option<String>,
    pub role_id: String,
    #[serde(default)]
    pub role_position: Option<String>,
    pub choice: VoteChoice,
    #[serde(default)]
    pub feedback: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Vote {
    /// Check the vote's structural invariants. No side effects.
    pub fn validate(&self) -> StorageResult<()> {
        if self.voter.trim().is_empty() {
            return Err(StorageError::Validation("voter email is required".into()));
        }
        if !self.voter.contains('@') {
            return Err(StorageError::Validation(format!(
                "invalid voter email: {}",
                self.voter
            )));
        }
        if self.candidate_id.trim().is_empty() {
            return Err(StorageError::Validation("candidate id is required".into()));
        }
        if self.role_id.trim().is_empty() {
            return Err(StorageError::Validation("role id is required".into()));
        }
        Ok(())
    }

    /// Copy of this vote with the voter email lowercased. Both backends
    /// persist the normalized form so the natural key is case-insensitive.
    pub fn normalized(&self) -> Vote {
        let mut vote = self.clone();
        vote.voter = vote.voter.trim().to_lowercase();
        vote
    }

    /// Whether this vote occupies the same (voter, candidate, role) slot as
    /// another, comparing voter emails case-insensitively.
    pub fn same_key(&self, other: &Vote) -> bool {
        self.voter.eq_ignore_ascii_case(&other.voter)
            && self.candidate_id == other.candidate_id
            && self.role_id == other.role_id
    }
}

/// The full votes document, mirroring [`super::role::RolesDocument`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VotesDocument {
    #[serde(default)]
    pub votes: Vec<Vote>,
}
