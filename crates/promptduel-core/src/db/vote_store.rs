//! Client-local vote record persistence

use libsql::Connection;

use crate::error::Result;
use crate::models::TurnId;
use crate::vote_guard::{LocalVoteRecord, VoteStore};

/// libSQL-backed [`VoteStore`], keyed by turn ID in the `local_votes` table.
///
/// Lives in the voting client's own database file; the records never reach
/// the shared backend.
pub struct LibSqlVoteStore<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlVoteStore<'a> {
    /// Create a new store with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }
}

impl VoteStore for LibSqlVoteStore<'_> {
    async fn load(&self, turn_id: &TurnId) -> Result<Option<LocalVoteRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT record FROM local_votes WHERE turn_id = ?",
                [turn_id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => {
                let raw: String = row.get(0)?;
                Ok(Some(serde_json::from_str(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, turn_id: &TurnId, record: &LocalVoteRecord) -> Result<()> {
        let raw = serde_json::to_string(record)?;
        self.conn
            .execute(
                "INSERT OR REPLACE INTO local_votes (turn_id, record) VALUES (?, ?)",
                [turn_id.as_str(), raw],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::{Side, VoteAction};
    use crate::vote_guard::VoteGuard;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_load_missing_record() {
        let db = setup().await;
        let store = LibSqlVoteStore::new(db.connection());

        let loaded = store.load(&TurnId::new()).await.unwrap();
        assert!(loaded.is_none());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_save_and_reload_record() {
        let db = setup().await;
        let store = LibSqlVoteStore::new(db.connection());
        let turn_id = TurnId::new();

        let record = LocalVoteRecord::default()
            .with_vote(Side::A, VoteAction::Like)
            .with_vote(Side::B, VoteAction::Dislike);
        store.save(&turn_id, &record).await.unwrap();

        let loaded = store.load(&turn_id).await.unwrap().unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_guard_state_survives_reopen_of_store() {
        let db = setup().await;
        let turn_id = TurnId::new();

        {
            let guard = VoteGuard::new(LibSqlVoteStore::new(db.connection()));
            guard
                .record(&turn_id, Side::A, VoteAction::Like)
                .await
                .unwrap();
        }

        // Fresh guard over the same database sees the recorded vote
        let guard = VoteGuard::new(LibSqlVoteStore::new(db.connection()));
        let state = guard.state(&turn_id).await.unwrap();
        assert_eq!(state.side(Side::A), Some(VoteAction::Like));
        assert!(guard.check(&turn_id, Side::A).await.is_err());
        assert!(guard.check(&turn_id, Side::B).await.is_ok());
    }
}
