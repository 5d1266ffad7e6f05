pub mod config;
pub mod role;
pub mod vote;

pub use config::LegacyConfig;
pub use role::{Candidate, Role, RoleStatus, RolesDocument, MAX_ALLOWED_VOTERS};
pub use vote::{Vote, VoteChoice, VotesDocument};
