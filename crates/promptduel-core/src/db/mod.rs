//! Database layer for PromptDuel

mod connection;
mod duel_repository;
mod migrations;
mod turn_repository;
mod vote_store;

pub use connection::{Database, SyncConfig};
pub use duel_repository::{DuelRepository, DuelWithVotes, LibSqlDuelRepository};
pub use turn_repository::{LibSqlTurnRepository, TurnRepository};
pub use vote_store::LibSqlVoteStore;
