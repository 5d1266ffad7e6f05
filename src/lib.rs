//! # blindvote
//!
//! Storage layer for the blind interview voting system: anonymous
//! "Inclined / Not Inclined" votes per candidate, with results hidden until
//! every eligible voter for a role has voted.
//!
//! The crate exposes one backend-agnostic storage contract
//! ([`storage::RoleStorage`], [`storage::VoteStorage`],
//! [`storage::ConfigStorage`]) with two implementations:
//!
//! - a flat-file JSON store (`roles.json` / `votes.json`), and
//! - a PostgreSQL store over the same record shapes.
//!
//! [`storage::Storage`] selects exactly one backend at process start based
//! on `DATABASE_URL`, and [`migration::Migrator`] performs the one-time
//! transfer from files to the database.

pub mod domain;
pub mod error;
pub mod migration;
pub mod storage;

pub use error::{StorageError, StorageResult};
