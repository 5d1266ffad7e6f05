//! # JSON File Storage
//!
//! Durable storage over two whole JSON documents, `roles.json` holding
//! `{"roles": [...]}` and `votes.json` holding `{"votes": [...]}` (plus the
//! deprecated `config.json`). Every mutation is a read-modify-write of the
//! full document under a per-document lock, flushed with an atomic
//! temp-file-then-rename so no reader ever sees a partial write.
//!
//! This backend is single-writer-at-a-time by construction; the connection's
//! named locks serialize mutating calls within the process.

pub mod config_repository;
pub mod connection;
pub mod role_repository;
pub mod vote_repository;

pub use config_repository::JsonConfigRepository;
pub use connection::JsonConnection;
pub use role_repository::JsonRoleRepository;
pub use vote_repository::JsonVoteRepository;
