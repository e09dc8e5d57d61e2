//! Turn repository implementation

use libsql::Connection;

use crate::error::{Error, Result};
use crate::models::{DuelId, NewTurn, Turn, TurnId, VoteCounter};

/// Trait for turn storage operations (async)
#[allow(async_fn_in_trait)]
pub trait TurnRepository {
    /// Create a turn at position turn-count + 1 within its duel
    async fn create(&self, input: NewTurn) -> Result<Turn>;

    /// Get a turn by ID
    async fn get(&self, id: &TurnId) -> Result<Option<Turn>>;

    /// List a duel's turns ordered by `turn_order` ascending
    async fn list_for_duel(&self, duel_id: &DuelId) -> Result<Vec<Turn>>;

    /// Delete a single turn. Remaining turns keep their positions.
    async fn delete(&self, id: &TurnId) -> Result<()>;

    /// Atomically bump one vote counter by one.
    ///
    /// There is no idempotency token: retrying a successful call counts the
    /// vote twice. Duplicate suppression is left to the client-side guard.
    async fn increment(&self, id: &TurnId, counter: VoteCounter) -> Result<()>;
}

/// libSQL implementation of `TurnRepository`
pub struct LibSqlTurnRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlTurnRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    async fn turn_count(&self, duel_id: &DuelId) -> Result<i64> {
        let mut rows = self
            .conn
            .query(
                "SELECT COUNT(*) FROM duel_turns WHERE duel_id = ?",
                [duel_id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(row.get(0)?),
            None => Ok(0),
        }
    }

    fn parse_turn(row: &libsql::Row) -> Result<Turn> {
        let id: String = row.get(0)?;
        let duel_id: String = row.get(1)?;
        Ok(Turn {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("Invalid turn ID in storage: {id}")))?,
            duel_id: duel_id
                .parse()
                .map_err(|_| Error::Database(format!("Invalid duel ID in storage: {duel_id}")))?,
            turn_order: row.get(2)?,
            user_input: row.get(3)?,
            response_a: row.get(4)?,
            response_b: row.get(5)?,
            likes_a: row.get(6)?,
            dislikes_a: row.get(7)?,
            likes_b: row.get(8)?,
            dislikes_b: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

const TURN_COLUMNS: &str = "id, duel_id, turn_order, user_input, response_a, response_b, \
     likes_a, dislikes_a, likes_b, dislikes_b, created_at";

impl TurnRepository for LibSqlTurnRepository<'_> {
    async fn create(&self, input: NewTurn) -> Result<Turn> {
        if !input.is_complete() {
            return Err(Error::InvalidInput(
                "Turn input and both responses are required".into(),
            ));
        }

        // Position = current count + 1. Two concurrent creators can observe
        // the same count and write duplicate positions; gaps after deletes
        // are expected and never compacted.
        let turn_order = self.turn_count(&input.duel_id).await? + 1;
        let turn = Turn::create(input, turn_order);

        self.conn
            .execute(
                "INSERT INTO duel_turns (id, duel_id, turn_order, user_input, response_a, response_b,
                                         likes_a, dislikes_a, likes_b, dislikes_b, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                libsql::params![
                    turn.id.as_str(),
                    turn.duel_id.as_str(),
                    turn.turn_order,
                    turn.user_input.clone(),
                    turn.response_a.clone(),
                    turn.response_b.clone(),
                    turn.likes_a,
                    turn.dislikes_a,
                    turn.likes_b,
                    turn.dislikes_b,
                    turn.created_at
                ],
            )
            .await?;

        Ok(turn)
    }

    async fn get(&self, id: &TurnId) -> Result<Option<Turn>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {TURN_COLUMNS} FROM duel_turns WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_turn(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_for_duel(&self, duel_id: &DuelId) -> Result<Vec<Turn>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {TURN_COLUMNS} FROM duel_turns
                     WHERE duel_id = ?
                     ORDER BY turn_order ASC"
                ),
                [duel_id.as_str()],
            )
            .await?;

        let mut turns = Vec::new();
        while let Some(row) = rows.next().await? {
            turns.push(Self::parse_turn(&row)?);
        }

        Ok(turns)
    }

    async fn delete(&self, id: &TurnId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM duel_turns WHERE id = ?", [id.as_str()])
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }

    async fn increment(&self, id: &TurnId, counter: VoteCounter) -> Result<()> {
        // Column name comes from the enum, never from caller input
        let column = counter.column();
        let rows = self
            .conn
            .execute(
                &format!("UPDATE duel_turns SET {column} = {column} + 1 WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }
}
