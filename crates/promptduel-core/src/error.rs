//! Error types for promptduel-core

use thiserror::Error;

/// Result type alias using promptduel-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in promptduel-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// Database error
    #[error("Database error: {0}")]
    Database(String),

    /// libSQL error
    #[error("libSQL error: {0}")]
    LibSql(#[from] libsql::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Duel or turn not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A vote was already recorded locally for this turn and side
    #[error("Vote already recorded for this turn and side")]
    AlreadyVoted,

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
