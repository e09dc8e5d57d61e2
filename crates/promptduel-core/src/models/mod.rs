//! Data models for PromptDuel

mod duel;
mod turn;
mod vote;

pub use duel::{Duel, DuelId, DuelStatus, NewDuel, UpdateDuel};
pub use turn::{NewTurn, Turn, TurnId};
pub use vote::{Side, VoteAction, VoteCounter};
