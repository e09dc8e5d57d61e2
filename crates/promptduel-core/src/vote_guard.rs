//! Local vote guard
//!
//! Per-client duplicate-vote prevention. Each turn has a locally persisted
//! record of which side(s) this client already voted on; once a side is
//! voted there is no way back to unvoted and no unvote. The guard is
//! advisory only: it cannot stop another client, or this one after its
//! storage is cleared, from voting again, and the remote increment itself
//! carries no idempotency token.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::{Side, TurnId, VoteAction};

/// Locally recorded votes for one turn, keyed by side.
/// `None` means this client has not voted on that side yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalVoteRecord {
    pub a: Option<VoteAction>,
    pub b: Option<VoteAction>,
}

impl LocalVoteRecord {
    /// The recorded action for a side, if any
    #[must_use]
    pub const fn side(&self, side: Side) -> Option<VoteAction> {
        match side {
            Side::A => self.a,
            Side::B => self.b,
        }
    }

    /// True when this client has not voted on the given side
    #[must_use]
    pub const fn is_unvoted(&self, side: Side) -> bool {
        self.side(side).is_none()
    }

    /// Record an action for one side, leaving the other side untouched
    #[must_use]
    pub const fn with_vote(mut self, side: Side, action: VoteAction) -> Self {
        match side {
            Side::A => self.a = Some(action),
            Side::B => self.b = Some(action),
        }
        self
    }
}

/// Key-value persistence for per-turn vote records.
///
/// Injected into the guard rather than hidden behind a global so tests can
/// swap in [`MemoryVoteStore`]; the production store lives in the client's
/// local database.
#[allow(async_fn_in_trait)]
pub trait VoteStore {
    /// Load the record for a turn, if one was ever written
    async fn load(&self, turn_id: &TurnId) -> Result<Option<LocalVoteRecord>>;

    /// Persist the record for a turn, replacing any previous value
    async fn save(&self, turn_id: &TurnId, record: &LocalVoteRecord) -> Result<()>;
}

impl<S: VoteStore> VoteStore for &S {
    async fn load(&self, turn_id: &TurnId) -> Result<Option<LocalVoteRecord>> {
        (**self).load(turn_id).await
    }

    async fn save(&self, turn_id: &TurnId, record: &LocalVoteRecord) -> Result<()> {
        (**self).save(turn_id, record).await
    }
}

/// Gate between the voting UI and the remote increment call.
///
/// Callers must [`check`](Self::check) before issuing the remote increment
/// and [`record`](Self::record) only after it succeeds, so a failed call
/// leaves the side retryable.
pub struct VoteGuard<S: VoteStore> {
    store: S,
}

impl<S: VoteStore> VoteGuard<S> {
    pub const fn new(store: S) -> Self {
        Self { store }
    }

    /// Current local state for a turn; unvoted on both sides if never recorded
    pub async fn state(&self, turn_id: &TurnId) -> Result<LocalVoteRecord> {
        Ok(self.store.load(turn_id).await?.unwrap_or_default())
    }

    /// Errors with [`Error::AlreadyVoted`] unless the side is still unvoted
    pub async fn check(&self, turn_id: &TurnId, side: Side) -> Result<()> {
        if self.state(turn_id).await?.is_unvoted(side) {
            Ok(())
        } else {
            Err(Error::AlreadyVoted)
        }
    }

    /// Persist a successful vote, merging with any record for the other side.
    ///
    /// A side that already holds a vote keeps its first action: there is no
    /// transition out of a voted state, so a repeated record is a no-op.
    pub async fn record(
        &self,
        turn_id: &TurnId,
        side: Side,
        action: VoteAction,
    ) -> Result<LocalVoteRecord> {
        let current = self.state(turn_id).await?;
        if !current.is_unvoted(side) {
            return Ok(current);
        }
        let record = current.with_vote(side, action);
        self.store.save(turn_id, &record).await?;
        Ok(record)
    }
}

/// In-memory store for tests and ephemeral sessions
#[derive(Default)]
pub struct MemoryVoteStore {
    records: std::sync::Mutex<std::collections::HashMap<String, LocalVoteRecord>>,
}

impl MemoryVoteStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl VoteStore for MemoryVoteStore {
    async fn load(&self, turn_id: &TurnId) -> Result<Option<LocalVoteRecord>> {
        let records = self
            .records
            .lock()
            .map_err(|error| Error::Database(error.to_string()))?;
        Ok(records.get(&turn_id.as_str()).copied())
    }

    async fn save(&self, turn_id: &TurnId, record: &LocalVoteRecord) -> Result<()> {
        let mut records = self
            .records
            .lock()
            .map_err(|error| Error::Database(error.to_string()))?;
        records.insert(turn_id.as_str(), *record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unvoted_by_default() {
        let guard = VoteGuard::new(MemoryVoteStore::new());
        let turn_id = TurnId::new();

        let state = guard.state(&turn_id).await.unwrap();
        assert!(state.is_unvoted(Side::A));
        assert!(state.is_unvoted(Side::B));
        guard.check(&turn_id, Side::A).await.unwrap();
    }

    #[tokio::test]
    async fn test_recorded_vote_blocks_second_vote_on_same_side() {
        let guard = VoteGuard::new(MemoryVoteStore::new());
        let turn_id = TurnId::new();

        guard.check(&turn_id, Side::A).await.unwrap();
        guard
            .record(&turn_id, Side::A, VoteAction::Like)
            .await
            .unwrap();

        let state = guard.state(&turn_id).await.unwrap();
        assert_eq!(state.side(Side::A), Some(VoteAction::Like));

        // Same side is now inert, either action
        let err = guard.check(&turn_id, Side::A).await.unwrap_err();
        assert!(matches!(err, Error::AlreadyVoted));

        // Other side is unaffected
        guard.check(&turn_id, Side::B).await.unwrap();
    }

    #[tokio::test]
    async fn test_record_keeps_first_action_on_a_voted_side() {
        let guard = VoteGuard::new(MemoryVoteStore::new());
        let turn_id = TurnId::new();

        guard
            .record(&turn_id, Side::A, VoteAction::Like)
            .await
            .unwrap();
        let after = guard
            .record(&turn_id, Side::A, VoteAction::Dislike)
            .await
            .unwrap();

        assert_eq!(after.side(Side::A), Some(VoteAction::Like));
        assert_eq!(
            guard.state(&turn_id).await.unwrap().side(Side::A),
            Some(VoteAction::Like)
        );
    }

    #[tokio::test]
    async fn test_recording_one_side_keeps_the_other() {
        let guard = VoteGuard::new(MemoryVoteStore::new());
        let turn_id = TurnId::new();

        guard
            .record(&turn_id, Side::B, VoteAction::Dislike)
            .await
            .unwrap();
        guard
            .record(&turn_id, Side::A, VoteAction::Like)
            .await
            .unwrap();

        let state = guard.state(&turn_id).await.unwrap();
        assert_eq!(state.side(Side::A), Some(VoteAction::Like));
        assert_eq!(state.side(Side::B), Some(VoteAction::Dislike));
    }

    #[tokio::test]
    async fn test_state_survives_guard_reconstruction() {
        let store = MemoryVoteStore::new();
        let turn_id = TurnId::new();

        {
            let guard = VoteGuard::new(&store);
            guard
                .record(&turn_id, Side::A, VoteAction::Dislike)
                .await
                .unwrap();
        }

        // Simulated reload: a fresh guard over the same storage
        let guard = VoteGuard::new(&store);
        let state = guard.state(&turn_id).await.unwrap();
        assert_eq!(state.side(Side::A), Some(VoteAction::Dislike));
        assert!(matches!(
            guard.check(&turn_id, Side::A).await,
            Err(Error::AlreadyVoted)
        ));
    }

    #[tokio::test]
    async fn test_votes_are_scoped_per_turn() {
        let guard = VoteGuard::new(MemoryVoteStore::new());
        let first = TurnId::new();
        let second = TurnId::new();

        guard
            .record(&first, Side::A, VoteAction::Like)
            .await
            .unwrap();

        assert!(guard.state(&second).await.unwrap().is_unvoted(Side::A));
    }
}
