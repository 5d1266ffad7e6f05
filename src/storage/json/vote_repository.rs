use std::sync::Arc;

use async_trait::async_trait;
use log::info;

use super::connection::JsonConnection;
use crate::domain::models::{Vote, VotesDocument};
use crate::error::StorageResult;
use crate::storage::traits::VoteStorage;

/// File-backed vote repository over the whole `votes.json` document.
#[derive(Clone)]
pub struct JsonVoteRepository {
    connection: Arc<JsonConnection>,
}

impl JsonVoteRepository {
    pub fn new(connection: Arc<JsonConnection>) -> Self {
        Self { connection }
    }

    fn load(&self) -> StorageResult<VotesDocument> {
        self.connection
            .read_document(&self.connection.votes_path(), VotesDocument::default())
    }
}

#[async_trait]
impl VoteStorage for JsonVoteRepository {
    async fn load_votes(&self) -> StorageResult<VotesDocument> {
        self.load()
    }

    async fn save_votes(&self, doc: &VotesDocument) -> StorageResult<()> {
        for vote in &doc.votes {
            vote.validate()?;
        }
        let _guard = self.connection.lock_votes();
        self.connection
            .write_document(&self.connection.votes_path(), doc)
    }

    async fn save_vote(&self, vote: &Vote) -> StorageResult<()> {
        vote.validate()?;
        let stored = vote.normalized();

        let _guard = self.connection.lock_votes();
        let mut doc = self.load()?;
        match doc.votes.iter_mut().find(|v| v.same_key(&stored)) {
            Some(existing) => *existing = stored.clone(),
            None => doc.votes.push(stored.clone()),
        }
        self.connection
            .write_document(&self.connection.votes_path(), &doc)?;
        info!(
            "saved vote by {} on candidate {} in role {}",
            stored.voter, stored.candidate_id, stored.role_id
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::VoteChoice;
    use chrono::Utc;
    use tempfile::TempDir;

    fn setup() -> (JsonVoteRepository, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let connection = Arc::new(JsonConnection::new(temp_dir.path()).unwrap());
        (JsonVoteRepository::new(connection), temp_dir)
    }

    fn vote(voter: &str, candidate: &str, role: &str, choice: VoteChoice) -> Vote {
        Vote {
            voter: voter.to_string(),
            candidate_id: candidate.to_string(),
            candidate_name: None,
            role_id: role.to_string(),
            role_position: None,
            choice,
            feedback: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_second_submission_updates_in_place() {
        let (repo, _tmp) = setup();
        repo.save_vote(&vote("v1@x.com", "1", "r1", VoteChoice::Inclined))
            .await
            .unwrap();

        let mut revote = vote("v1@x.com", "1", "r1", VoteChoice::NotInclined);
        revote.feedback = Some("changed my mind".to_string());
        repo.save_vote(&revote).await.unwrap();

        let doc = repo.load_votes().await.unwrap();
        assert_eq!(doc.votes.len(), 1);
        assert_eq!(doc.votes[0].choice, VoteChoice::NotInclined);
        assert_eq!(doc.votes[0].feedback.as_deref(), Some("changed my mind"));
    }

    #[tokio::test]
    async fn test_voter_match_is_case_insensitive() {
        let (repo, _tmp) = setup();
        repo.save_vote(&vote("v1@x.com", "1", "r1", VoteChoice::Inclined))
            .await
            .unwrap();
        repo.save_vote(&vote("V1@X.COM", "1", "r1", VoteChoice::NotInclined))
            .await
            .unwrap();

        let doc = repo.load_votes().await.unwrap();
        assert_eq!(doc.votes.len(), 1);
        // Stored voter is the normalized form.
        assert_eq!(doc.votes[0].voter, "v1@x.com");
        assert_eq!(doc.votes[0].choice, VoteChoice::NotInclined);
    }

    #[tokio::test]
    async fn test_distinct_keys_produce_distinct_rows() {
        let (repo, _tmp) = setup();
        repo.save_vote(&vote("v1@x.com", "1", "r1", VoteChoice::Inclined))
            .await
            .unwrap();
        repo.save_vote(&vote("v2@x.com", "1", "r1", VoteChoice::Inclined))
            .await
            .unwrap();
        repo.save_vote(&vote("v1@x.com", "2", "r1", VoteChoice::Inclined))
            .await
            .unwrap();

        assert_eq!(repo.load_votes().await.unwrap().votes.len(), 3);
    }

    #[tokio::test]
    async fn test_blind_vote_scenario() {
        // v1 votes Inclined on C1, v2 Not Inclined on C1, v1 re-votes with
        // feedback "strong". Exactly two rows remain for (C1, R1).
        let (repo, _tmp) = setup();
        repo.save_vote(&vote("v1@x.com", "1", "r1", VoteChoice::Inclined))
            .await
            .unwrap();
        repo.save_vote(&vote("v2@x.com", "1", "r1", VoteChoice::NotInclined))
            .await
            .unwrap();
        let mut revote = vote("v1@x.com", "1", "r1", VoteChoice::Inclined);
        revote.feedback = Some("strong".to_string());
        repo.save_vote(&revote).await.unwrap();

        let doc = repo.load_votes().await.unwrap();
        let c1_votes: Vec<_> = doc
            .votes
            .iter()
            .filter(|v| v.candidate_id == "1" && v.role_id == "r1")
            .collect();
        assert_eq!(c1_votes.len(), 2);
        let v1 = c1_votes.iter().find(|v| v.voter == "v1@x.com").unwrap();
        assert_eq!(v1.feedback.as_deref(), Some("strong"));
        let v2 = c1_votes.iter().find(|v| v.voter == "v2@x.com").unwrap();
        assert_eq!(v2.choice, VoteChoice::NotInclined);
    }

    #[tokio::test]
    async fn test_invalid_vote_rejected() {
        let (repo, _tmp) = setup();
        let err = repo
            .save_vote(&vote("not-an-email", "1", "r1", VoteChoice::Inclined))
            .await
            .unwrap_err();
        assert!(matches!(err, crate::StorageError::Validation(_)));
        assert!(repo.load_votes().await.unwrap().votes.is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_upserts_for_same_key_leave_one_record() {
        let (repo, _tmp) = setup();
        let repo = Arc::new(repo);

        let mut handles = Vec::new();
        for i in 0..16 {
            let repo = repo.clone();
            handles.push(tokio::spawn(async move {
                let mut v = vote("v1@x.com", "1", "r1", VoteChoice::Inclined);
                v.feedback = Some(format!("submission {i}"));
                repo.save_vote(&v).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let doc = repo.load_votes().await.unwrap();
        assert_eq!(doc.votes.len(), 1, "no duplicate or lost records");
    }
}
