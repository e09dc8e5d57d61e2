//! Vote counter naming and decomposition

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// A contender side within a duel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    A,
    B,
}

impl Side {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "a",
            Self::B => "b",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Side {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "a" | "A" => Ok(Self::A),
            "b" | "B" => Ok(Self::B),
            other => Err(Error::InvalidInput(format!("Unknown side: {other}"))),
        }
    }
}

/// The verdict a voter can cast on one side of a turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteAction {
    Like,
    Dislike,
}

impl VoteAction {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Dislike => "dislike",
        }
    }
}

impl fmt::Display for VoteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for VoteAction {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "like" => Ok(Self::Like),
            "dislike" => Ok(Self::Dislike),
            other => Err(Error::InvalidInput(format!("Unknown vote action: {other}"))),
        }
    }
}

/// One of the four raw vote counters carried by a turn.
///
/// The wire names double as the fixed column names in storage; user input is
/// parsed into this enum and never interpolated into SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteCounter {
    LikesA,
    DislikesA,
    LikesB,
    DislikesB,
}

impl VoteCounter {
    /// Storage column / wire name
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::LikesA => "likes_a",
            Self::DislikesA => "dislikes_a",
            Self::LikesB => "likes_b",
            Self::DislikesB => "dislikes_b",
        }
    }

    /// The side this counter belongs to
    #[must_use]
    pub const fn side(self) -> Side {
        match self {
            Self::LikesA | Self::DislikesA => Side::A,
            Self::LikesB | Self::DislikesB => Side::B,
        }
    }

    /// The action this counter records
    #[must_use]
    pub const fn action(self) -> VoteAction {
        match self {
            Self::LikesA | Self::LikesB => VoteAction::Like,
            Self::DislikesA | Self::DislikesB => VoteAction::Dislike,
        }
    }

    /// Compose a counter from a side and an action
    #[must_use]
    pub const fn compose(side: Side, action: VoteAction) -> Self {
        match (side, action) {
            (Side::A, VoteAction::Like) => Self::LikesA,
            (Side::A, VoteAction::Dislike) => Self::DislikesA,
            (Side::B, VoteAction::Like) => Self::LikesB,
            (Side::B, VoteAction::Dislike) => Self::DislikesB,
        }
    }
}

impl fmt::Display for VoteCounter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.column())
    }
}

impl FromStr for VoteCounter {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "likes_a" => Ok(Self::LikesA),
            "dislikes_a" => Ok(Self::DislikesA),
            "likes_b" => Ok(Self::LikesB),
            "dislikes_b" => Ok(Self::DislikesB),
            other => Err(Error::InvalidInput(format!(
                "Unknown vote counter: {other}"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counter_wire_names_round_trip() {
        for counter in [
            VoteCounter::LikesA,
            VoteCounter::DislikesA,
            VoteCounter::LikesB,
            VoteCounter::DislikesB,
        ] {
            assert_eq!(counter.column().parse::<VoteCounter>().unwrap(), counter);
        }
        assert!("likes_c".parse::<VoteCounter>().is_err());
    }

    #[test]
    fn test_counter_decomposition() {
        assert_eq!(VoteCounter::LikesA.side(), Side::A);
        assert_eq!(VoteCounter::LikesA.action(), VoteAction::Like);
        assert_eq!(VoteCounter::DislikesB.side(), Side::B);
        assert_eq!(VoteCounter::DislikesB.action(), VoteAction::Dislike);
    }

    #[test]
    fn test_compose_inverts_decomposition() {
        for counter in [
            VoteCounter::LikesA,
            VoteCounter::DislikesA,
            VoteCounter::LikesB,
            VoteCounter::DislikesB,
        ] {
            assert_eq!(VoteCounter::compose(counter.side(), counter.action()), counter);
        }
    }
}
