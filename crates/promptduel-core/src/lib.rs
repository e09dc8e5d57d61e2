//! promptduel-core - Core library for PromptDuel
//!
//! This crate contains the shared models, database layer, and derived-metric
//! logic used by the PromptDuel API server and CLI client.

pub mod db;
pub mod error;
pub mod models;
pub mod tally;
pub mod vote_guard;

pub use error::{Error, Result};
pub use models::{
    Duel, DuelId, DuelStatus, NewDuel, NewTurn, Side, Turn, TurnId, UpdateDuel, VoteAction,
    VoteCounter,
};
pub use tally::VoteTally;
