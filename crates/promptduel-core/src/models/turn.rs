//! Turn model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::DuelId;

/// A unique identifier for a turn, using UUID v7 (time-sortable)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TurnId(Uuid);

impl TurnId {
    /// Create a new unique turn ID using UUID v7
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

impl Default for TurnId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TurnId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// One exchange within a duel: a user input plus both contender responses
/// and their raw vote counters
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    /// Unique identifier
    pub id: TurnId,
    /// Parent duel
    pub duel_id: DuelId,
    /// Position within the duel. Assigned as turn-count + 1 at creation and
    /// never renumbered on delete, so gaps are permitted.
    pub turn_order: i64,
    /// The shared user prompt for this exchange
    pub user_input: String,
    /// Contender A's response
    pub response_a: String,
    /// Contender B's response
    pub response_b: String,
    pub likes_a: i64,
    pub dislikes_a: i64,
    pub likes_b: i64,
    pub dislikes_b: i64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
}

/// Fields accepted when creating a turn; `turn_order` is assigned by the store
#[derive(Debug, Clone, Deserialize)]
pub struct NewTurn {
    pub duel_id: DuelId,
    pub user_input: String,
    pub response_a: String,
    pub response_b: String,
}

impl NewTurn {
    /// Check that all textual fields are present (whitespace-only counts as empty)
    #[must_use]
    pub fn is_complete(&self) -> bool {
        !self.user_input.trim().is_empty()
            && !self.response_a.trim().is_empty()
            && !self.response_b.trim().is_empty()
    }
}

impl Turn {
    /// Create a turn at the given position with zeroed vote counters
    #[must_use]
    pub fn create(input: NewTurn, turn_order: i64) -> Self {
        Self {
            id: TurnId::new(),
            duel_id: input.duel_id,
            turn_order,
            user_input: input.user_input,
            response_a: input.response_a,
            response_b: input.response_b,
            likes_a: 0,
            dislikes_a: 0,
            likes_b: 0,
            dislikes_b: 0,
            created_at: chrono::Utc::now().timestamp_millis(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_input() -> NewTurn {
        NewTurn {
            duel_id: DuelId::new(),
            user_input: "Explain recursion".to_string(),
            response_a: "Recursion is...".to_string(),
            response_b: "A function calling itself...".to_string(),
        }
    }

    #[test]
    fn test_turn_id_parse() {
        let id = TurnId::new();
        let parsed: TurnId = id.as_str().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_create_zeroes_counters() {
        let turn = Turn::create(sample_input(), 1);
        assert_eq!(turn.turn_order, 1);
        assert_eq!(turn.likes_a, 0);
        assert_eq!(turn.dislikes_a, 0);
        assert_eq!(turn.likes_b, 0);
        assert_eq!(turn.dislikes_b, 0);
        assert!(turn.created_at > 0);
    }

    #[test]
    fn test_is_complete() {
        let complete = sample_input();
        assert!(complete.is_complete());

        let mut blank = sample_input();
        blank.response_b = "  \n ".to_string();
        assert!(!blank.is_complete());
    }
}
