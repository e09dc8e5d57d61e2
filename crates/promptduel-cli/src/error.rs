use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] promptduel_core::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },
    #[error("Auth error: {0}")]
    Auth(String),
    #[error("Not logged in. Run `promptduel login` first.")]
    NotLoggedIn,
    #[error("Invalid {what}: {value}")]
    InvalidId { what: &'static str, value: String },
    #[error("Duel name cannot be empty")]
    EmptyDuelName,
    #[error("Turn input and both responses are required")]
    IncompleteTurn,
    #[error("Database initialization failed: {0}")]
    DatabaseInit(String),
}

impl CliError {
    pub fn invalid_duel_id(value: impl Into<String>) -> Self {
        Self::InvalidId {
            what: "duel id",
            value: value.into(),
        }
    }

    pub fn invalid_turn_id(value: impl Into<String>) -> Self {
        Self::InvalidId {
            what: "turn id",
            value: value.into(),
        }
    }
}
