//! # Relational Storage
//!
//! The same storage contract as the JSON file backend, over PostgreSQL:
//! roles, candidates, allowed_voters, and votes tables joined by foreign
//! keys, plus the legacy single-row config table. Integrity lives in the
//! engine (unique constraints for the vote natural key and role-scoped
//! children, `ON DELETE RESTRICT` for the deletion guard) and every logical
//! operation runs in one transaction.

pub mod config_repository;
pub mod connection;
pub mod role_repository;
pub mod vote_repository;

pub use config_repository::DbConfigRepository;
pub use connection::DbConnection;
pub use role_repository::DbRoleRepository;
pub use vote_repository::DbVoteRepository;

// Live-database tests. They need a scratch PostgreSQL named by
// TEST_DATABASE_URL and are ignored by default; run them with
//   TEST_DATABASE_URL=postgres://... cargo test -- --ignored --test-threads=1
// (single-threaded because they share one database).
#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;
    use crate::domain::models::{Candidate, Role, Vote, VoteChoice};
    use crate::error::StorageError;
    use crate::storage::traits::{ConfigStorage, RoleStorage, VoteStorage};

    async fn setup() -> DbConnection {
        let url = std::env::var("TEST_DATABASE_URL")
            .expect("TEST_DATABASE_URL must be set for database tests");
        let db = DbConnection::connect(&url).await.expect("connect");
        db.init_db().await.expect("init_db");
        sqlx::query("TRUNCATE votes, candidates, allowed_voters, roles, config")
            .execute(db.pool())
            .await
            .expect("truncate");
        db
    }

    fn sample_role() -> Role {
        let mut role = Role::new("Barista");
        role.candidates = vec![
            Candidate {
                id: "1".to_string(),
                name: "Alice".to_string(),
            },
            Candidate {
                id: "2".to_string(),
                name: "Bob".to_string(),
            },
        ];
        role.allowed_emails = vec![
            "v1@x.com".to_string(),
            "v2@x.com".to_string(),
            "v3@x.com".to_string(),
        ];
        role
    }

    fn vote(voter: &str, candidate: &str, role: &Role, choice: VoteChoice) -> Vote {
        Vote {
            voter: voter.to_string(),
            candidate_id: candidate.to_string(),
            candidate_name: role.candidate(candidate).map(|c| c.name.clone()),
            role_id: role.id.clone(),
            role_position: Some(role.position.clone()),
            choice,
            feedback: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    #[ignore]
    async fn test_init_db_is_idempotent() {
        let db = setup().await;
        db.init_db().await.unwrap();
        db.init_db().await.unwrap();
    }

    #[tokio::test]
    #[ignore]
    async fn test_save_role_upserts_and_replaces_children() {
        let db = setup().await;
        let repo = DbRoleRepository::new(db);
        let mut role = sample_role();
        repo.save_role(&role).await.unwrap();

        // Same id again with one candidate dropped and a voter changed.
        role.candidates.pop();
        role.allowed_emails = vec!["v9@x.com".to_string()];
        repo.save_role(&role).await.unwrap();

        let doc = repo.load_roles().await.unwrap();
        assert_eq!(doc.roles.len(), 1);
        assert_eq!(doc.roles[0].candidates.len(), 1);
        assert_eq!(doc.roles[0].allowed_emails, vec!["v9@x.com".to_string()]);
        assert!(doc.roles[0].updated_at.is_some());
    }

    #[tokio::test]
    #[ignore]
    async fn test_vote_upsert_on_natural_key() {
        let db = setup().await;
        let roles = DbRoleRepository::new(db.clone());
        let votes = DbVoteRepository::new(db);
        let role = sample_role();
        roles.save_role(&role).await.unwrap();

        votes
            .save_vote(&vote("v1@x.com", "1", &role, VoteChoice::Inclined))
            .await
            .unwrap();
        let mut revote = vote("V1@X.COM", "1", &role, VoteChoice::Inclined);
        revote.feedback = Some("strong".to_string());
        votes.save_vote(&revote).await.unwrap();

        let doc = votes.load_votes().await.unwrap();
        assert_eq!(doc.votes.len(), 1);
        assert_eq!(doc.votes[0].voter, "v1@x.com");
        assert_eq!(doc.votes[0].feedback.as_deref(), Some("strong"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_blind_vote_scenario() {
        // R1 with candidates {C1: Alice, C2: Bob} and voters {v1,v2,v3};
        // v1 votes Inclined on C1, v2 Not Inclined on C1, v1 re-votes with
        // feedback "strong". Exactly two rows remain for (C1, R1).
        let db = setup().await;
        let roles = DbRoleRepository::new(db.clone());
        let votes = DbVoteRepository::new(db);
        let role = sample_role();
        roles.save_role(&role).await.unwrap();

        votes
            .save_vote(&vote("v1@x.com", "1", &role, VoteChoice::Inclined))
            .await
            .unwrap();
        votes
            .save_vote(&vote("v2@x.com", "1", &role, VoteChoice::NotInclined))
            .await
            .unwrap();
        let mut revote = vote("v1@x.com", "1", &role, VoteChoice::Inclined);
        revote.feedback = Some("strong".to_string());
        votes.save_vote(&revote).await.unwrap();

        let doc = votes.load_votes().await.unwrap();
        let c1_votes: Vec<_> = doc
            .votes
            .iter()
            .filter(|v| v.candidate_id == "1" && v.role_id == role.id)
            .collect();
        assert_eq!(c1_votes.len(), 2);
        let v1 = c1_votes.iter().find(|v| v.voter == "v1@x.com").unwrap();
        assert_eq!(v1.feedback.as_deref(), Some("strong"));
    }

    #[tokio::test]
    #[ignore]
    async fn test_concurrent_upserts_for_same_key_leave_one_record() {
        let db = setup().await;
        let roles = DbRoleRepository::new(db.clone());
        let votes = std::sync::Arc::new(DbVoteRepository::new(db));
        let role = sample_role();
        roles.save_role(&role).await.unwrap();

        let mut handles = Vec::new();
        for i in 0..16 {
            let votes = votes.clone();
            let role = role.clone();
            handles.push(tokio::spawn(async move {
                let mut v = Vote {
                    voter: "v1@x.com".to_string(),
                    candidate_id: "1".to_string(),
                    candidate_name: Some("Alice".to_string()),
                    role_id: role.id.clone(),
                    role_position: Some(role.position.clone()),
                    choice: VoteChoice::Inclined,
                    feedback: None,
                    timestamp: Utc::now(),
                };
                v.feedback = Some(format!("submission {i}"));
                votes.save_vote(&v).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let doc = votes.load_votes().await.unwrap();
        assert_eq!(doc.votes.len(), 1, "no duplicate or lost records");
    }

    #[tokio::test]
    #[ignore]
    async fn test_delete_role_guarded_by_votes() {
        let db = setup().await;
        let roles = DbRoleRepository::new(db.clone());
        let votes = DbVoteRepository::new(db);
        let role = sample_role();
        roles.save_role(&role).await.unwrap();
        votes
            .save_vote(&vote("v1@x.com", "1", &role, VoteChoice::Inclined))
            .await
            .unwrap();

        let err = roles.delete_role(&role.id).await.unwrap_err();
        assert!(matches!(err, StorageError::RoleHasVotes(_)));
        assert!(roles.get_role_by_id(&role.id).await.unwrap().is_some());
    }

    #[tokio::test]
    #[ignore]
    async fn test_delete_role_without_votes_succeeds() {
        let db = setup().await;
        let repo = DbRoleRepository::new(db);
        let role = sample_role();
        repo.save_role(&role).await.unwrap();

        assert!(repo.delete_role(&role.id).await.unwrap());
        assert!(repo.get_role_by_id(&role.id).await.unwrap().is_none());
        assert!(!repo.delete_role(&role.id).await.unwrap());
    }

    #[tokio::test]
    #[ignore]
    async fn test_legacy_config_reflects_first_role() {
        let db = setup().await;
        let roles = DbRoleRepository::new(db.clone());
        let config = DbConfigRepository::new(db);

        config
            .save_config(&crate::domain::models::LegacyConfig {
                position: "Barista".to_string(),
                candidates: Vec::new(),
                allowed_emails: Vec::new(),
                is_configured: true,
            })
            .await
            .unwrap();
        let role = sample_role();
        roles.save_role(&role).await.unwrap();

        let loaded = config.load_config().await.unwrap();
        assert!(loaded.is_configured);
        assert_eq!(loaded.position, role.position);
        assert_eq!(loaded.candidates.len(), 2);
        assert_eq!(loaded.allowed_emails.len(), 3);
    }
}
