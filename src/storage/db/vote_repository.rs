use async_trait::async_trait;
use log::info;
use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use super::connection::DbConnection;
use super::role_repository::parse_role_id;
use crate::domain::models::{Vote, VoteChoice, VotesDocument};
use crate::error::StorageResult;
use crate::storage::traits::VoteStorage;

/// Relational vote repository over the votes table.
#[derive(Clone)]
pub struct DbVoteRepository {
    db: DbConnection,
}

impl DbVoteRepository {
    pub fn new(db: DbConnection) -> Self {
        Self { db }
    }

    fn vote_from_row(row: &PgRow) -> StorageResult<Vote> {
        Ok(Vote {
            voter: row.get("voter"),
            candidate_id: row.get("candidate_id"),
            candidate_name: row.get("candidate_name"),
            role_id: row.get::<Uuid, _>("role_id").to_string(),
            role_position: row.get("role_position"),
            choice: VoteChoice::parse(row.get("choice"))?,
            feedback: row.get("feedback"),
            timestamp: row.get("timestamp"),
        })
    }
}

#[async_trait]
impl VoteStorage for DbVoteRepository {
    async fn load_votes(&self) -> StorageResult<VotesDocument> {
        let rows = sqlx::query(
            r#"
            SELECT voter, candidate_id, candidate_name, role_id, role_position,
                   choice, feedback, "timestamp"
            FROM votes
            ORDER BY id
            "#,
        )
        .fetch_all(self.db.pool())
        .await?;

        let mut votes = Vec::with_capacity(rows.len());
        for row in &rows {
            votes.push(Self::vote_from_row(row)?);
        }
        Ok(VotesDocument { votes })
    }

    async fn save_votes(&self, doc: &VotesDocument) -> StorageResult<()> {
        for vote in &doc.votes {
            vote.validate()?;
        }
        let mut tx = self.db.pool().begin().await?;
        sqlx::query("DELETE FROM votes").execute(&mut *tx).await?;
        for vote in &doc.votes {
            let stored = vote.normalized();
            sqlx::query(
                r#"
                INSERT INTO votes (voter, candidate_id, candidate_name, role_id,
                                   role_position, choice, feedback, "timestamp")
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(&stored.voter)
            .bind(&stored.candidate_id)
            .bind(&stored.candidate_name)
            .bind(parse_role_id(&stored.role_id)?)
            .bind(&stored.role_position)
            .bind(stored.choice.as_str())
            .bind(&stored.feedback)
            .bind(stored.timestamp)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        info!("replaced votes document ({} votes)", doc.votes.len());
        Ok(())
    }

    async fn save_vote(&self, vote: &Vote) -> StorageResult<()> {
        vote.validate()?;
        let stored = vote.normalized();

        // Single atomic upsert on the natural key; concurrent submissions
        // for the same (voter, candidate, role) serialize at the engine
        // instead of racing a select-then-insert.
        sqlx::query(
            r#"
            INSERT INTO votes (voter, candidate_id, candidate_name, role_id,
                               role_position, choice, feedback, "timestamp")
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (voter, candidate_id, role_id) DO UPDATE SET
                choice = EXCLUDED.choice,
                feedback = EXCLUDED.feedback,
                "timestamp" = EXCLUDED."timestamp",
                candidate_name = EXCLUDED.candidate_name,
                role_position = EXCLUDED.role_position
            "#,
        )
        .bind(&stored.voter)
        .bind(&stored.candidate_id)
        .bind(&stored.candidate_name)
        .bind(parse_role_id(&stored.role_id)?)
        .bind(&stored.role_position)
        .bind(stored.choice.as_str())
        .bind(&stored.feedback)
        .bind(stored.timestamp)
        .execute(self.db.pool())
        .await?;

        info!(
            "saved vote by {} on candidate {} in role {}",
            stored.voter, stored.candidate_id, stored.role_id
        );
        Ok(())
    }
}
