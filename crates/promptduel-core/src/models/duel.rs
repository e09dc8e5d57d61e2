//! Duel model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::Error;

/// A unique identifier for a duel, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DuelId(Uuid);

impl DuelId {
    /// Create a new unique duel ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> String {
        self.0.to_string()
    }
}

impl Default for DuelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for DuelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for DuelId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Lifecycle state of a duel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuelStatus {
    #[default]
    Active,
    Draft,
    Concluded,
}

impl DuelStatus {
    /// Wire/storage name of this status
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Draft => "draft",
            Self::Concluded => "concluded",
        }
    }
}

impl fmt::Display for DuelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DuelStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "draft" => Ok(Self::Draft),
            "concluded" => Ok(Self::Concluded),
            other => Err(Error::InvalidInput(format!("Unknown duel status: {other}"))),
        }
    }
}

/// A comparison session between two named contenders
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Duel {
    /// Unique identifier
    pub id: DuelId,
    /// Owning user; immutable after creation
    pub owner_id: String,
    /// Display name of the duel
    pub name: String,
    /// Optional description (empty strings are stored as absent)
    pub description: Option<String>,
    /// Name of contender A
    pub contender_a_name: String,
    /// Name of contender B
    pub contender_b_name: String,
    /// Lifecycle state
    pub status: DuelStatus,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

/// Fields accepted when creating a duel; unset fields take defaults
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewDuel {
    pub name: String,
    pub description: Option<String>,
    pub contender_a_name: Option<String>,
    pub contender_b_name: Option<String>,
    pub status: Option<DuelStatus>,
}

/// Partial update for a duel; only provided fields change.
/// The owner is never updatable.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateDuel {
    pub name: Option<String>,
    pub description: Option<String>,
    pub contender_a_name: Option<String>,
    pub contender_b_name: Option<String>,
    pub status: Option<DuelStatus>,
}

impl Duel {
    /// Create a new duel owned by `owner_id`, applying defaults for
    /// unset contender names and status
    #[must_use]
    pub fn create(owner_id: impl Into<String>, input: NewDuel) -> Self {
        Self {
            id: DuelId::new(),
            owner_id: owner_id.into(),
            name: input.name,
            description: normalize_description(input.description),
            contender_a_name: input
                .contender_a_name
                .unwrap_or_else(|| "Prompt A".to_string()),
            contender_b_name: input
                .contender_b_name
                .unwrap_or_else(|| "Prompt B".to_string()),
            status: input.status.unwrap_or_default(),
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }

    /// Apply a partial update in place
    pub fn apply(&mut self, changes: UpdateDuel) {
        if let Some(name) = changes.name {
            self.name = name;
        }
        if let Some(description) = changes.description {
            self.description = normalize_description(Some(description));
        }
        if let Some(name) = changes.contender_a_name {
            self.contender_a_name = name;
        }
        if let Some(name) = changes.contender_b_name {
            self.contender_b_name = name;
        }
        if let Some(status) = changes.status {
            self.status = status;
        }
    }

    /// "Contender A vs Contender B" label used in listings
    #[must_use]
    pub fn matchup(&self) -> String {
        format!("{} vs {}", self.contender_a_name, self.contender_b_name)
    }
}

fn normalize_description(description: Option<String>) -> Option<String> {
    description.filter(|text| !text.trim().is_empty())
}
