//! Vote-tally aggregation
//!
//! Derives the display metrics for a duel (total votes, winner, win
//! percentage, and percentage delta) from the raw like counters of its turns.
//! Pure functions: malformed counts are coerced to zero, never an error.

use serde::{Deserialize, Serialize};

use crate::models::{Side, Turn};

/// Derived vote summary for a duel. Never persisted; recomputed on each read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteTally {
    /// Sum of like votes across both sides
    pub total_votes: u64,
    /// The strictly leading side, or `None` on a tie (including zero votes)
    pub winner: Option<Side>,
    /// The winner's rounded share of the vote, 0-100; 50 on a tie
    pub percentage: u8,
    /// Winner share minus loser share, 0-100; 0 on a tie
    pub delta: u8,
}

impl VoteTally {
    /// Tally a pair of per-side like counts.
    ///
    /// Both shares are rounded with the same half-up rule so the displayed
    /// pair stays consistent (33/67 rather than 33/66 or 34/67).
    #[must_use]
    pub fn from_counts(votes_a: i64, votes_b: i64) -> Self {
        let votes_a = clamp_count(votes_a);
        let votes_b = clamp_count(votes_b);
        let total = votes_a + votes_b;

        if total == 0 || votes_a == votes_b {
            return Self {
                total_votes: total,
                winner: None,
                percentage: 50,
                delta: 0,
            };
        }

        let pct_a = rounded_share(votes_a, total);
        let pct_b = rounded_share(votes_b, total);

        let (winner, percentage, delta) = if votes_a > votes_b {
            (Side::A, pct_a, pct_a - pct_b)
        } else {
            (Side::B, pct_b, pct_b - pct_a)
        };

        Self {
            total_votes: total,
            winner: Some(winner),
            percentage,
            delta,
        }
    }

    /// Tally a duel's turns by summing `likes_a`/`likes_b`.
    /// Dislike counters do not enter the win rate.
    #[must_use]
    pub fn from_turns(turns: &[Turn]) -> Self {
        let votes_a = turns
            .iter()
            .fold(0i64, |sum, turn| sum.saturating_add(turn.likes_a.max(0)));
        let votes_b = turns
            .iter()
            .fold(0i64, |sum, turn| sum.saturating_add(turn.likes_b.max(0)));
        Self::from_counts(votes_a, votes_b)
    }

    /// True when neither side leads
    #[must_use]
    pub const fn is_tie(&self) -> bool {
        self.winner.is_none()
    }
}

/// Integer share of `votes` out of `total`, as a half-up rounded percentage
fn rounded_share(votes: u64, total: u64) -> u8 {
    debug_assert!(total > 0 && votes <= total);
    #[allow(clippy::cast_possible_truncation)] // result is <= 100
    {
        ((200 * votes + total) / (2 * total)) as u8
    }
}

const fn clamp_count(count: i64) -> u64 {
    if count < 0 {
        0
    } else {
        count.unsigned_abs()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::models::NewTurn;
    use crate::models::{DuelId, Turn};

    fn turn_with_likes(duel_id: DuelId, likes_a: i64, likes_b: i64) -> Turn {
        let mut turn = Turn::create(
            NewTurn {
                duel_id,
                user_input: "q".to_string(),
                response_a: "a".to_string(),
                response_b: "b".to_string(),
            },
            1,
        );
        turn.likes_a = likes_a;
        turn.likes_b = likes_b;
        turn
    }

    #[test]
    fn test_no_turns_is_a_tie_at_fifty() {
        let tally = VoteTally::from_turns(&[]);
        assert_eq!(
            tally,
            VoteTally {
                total_votes: 0,
                winner: None,
                percentage: 50,
                delta: 0,
            }
        );
    }

    #[test]
    fn test_sums_likes_across_turns() {
        let duel_id = DuelId::new();
        let turns = vec![
            turn_with_likes(duel_id, 3, 1),
            turn_with_likes(duel_id, 0, 0),
        ];

        let tally = VoteTally::from_turns(&turns);
        assert_eq!(tally.total_votes, 4);
        assert_eq!(tally.winner, Some(Side::A));
        assert_eq!(tally.percentage, 75);
        assert_eq!(tally.delta, 50);
    }

    #[test]
    fn test_single_sided_vote_is_a_shutout() {
        let tally = VoteTally::from_counts(1, 0);
        assert_eq!(tally.winner, Some(Side::A));
        assert_eq!(tally.percentage, 100);
        assert_eq!(tally.delta, 100);
    }

    #[test]
    fn test_exact_tie_with_votes() {
        let tally = VoteTally::from_counts(7, 7);
        assert_eq!(tally.total_votes, 14);
        assert!(tally.is_tie());
        assert_eq!(tally.percentage, 50);
        assert_eq!(tally.delta, 0);
    }

    #[test]
    fn test_shared_rounding_keeps_shares_consistent() {
        // 1 vs 2 would give 33.3/66.7; both sides round with the same rule
        let tally = VoteTally::from_counts(1, 2);
        assert_eq!(tally.winner, Some(Side::B));
        assert_eq!(tally.percentage, 67);
        assert_eq!(tally.delta, 34);
    }

    #[test]
    fn test_negative_counts_are_coerced_to_zero() {
        let tally = VoteTally::from_counts(-5, 3);
        assert_eq!(tally.total_votes, 3);
        assert_eq!(tally.winner, Some(Side::B));
        assert_eq!(tally.percentage, 100);
    }

    #[test]
    fn test_invariants_hold_across_count_grid() {
        for votes_a in 0..40i64 {
            for votes_b in 0..40i64 {
                let tally = VoteTally::from_counts(votes_a, votes_b);
                assert!(tally.percentage <= 100);
                assert_eq!(tally.winner.is_none(), votes_a == votes_b);
                if let Some(winner) = tally.winner {
                    // Winner's share never drops below half
                    assert!(tally.percentage >= 50, "winner {winner:?} below 50%");
                }
            }
        }
    }
}
