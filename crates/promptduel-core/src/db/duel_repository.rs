//! Duel repository implementation

use libsql::Connection;

use crate::error::{Error, Result};
use crate::models::{Duel, DuelId, NewDuel, UpdateDuel};
use crate::tally::VoteTally;

/// A duel together with its like counts summed across all turns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DuelWithVotes {
    pub duel: Duel,
    pub votes_a: i64,
    pub votes_b: i64,
}

impl DuelWithVotes {
    /// Derive the display tally for this duel
    #[must_use]
    pub fn tally(&self) -> VoteTally {
        VoteTally::from_counts(self.votes_a, self.votes_b)
    }
}

/// Trait for duel storage operations (async)
#[allow(async_fn_in_trait)]
pub trait DuelRepository {
    /// Create a new duel owned by `owner_id`
    async fn create(&self, owner_id: &str, input: NewDuel) -> Result<Duel>;

    /// Get a duel by ID
    async fn get(&self, id: &DuelId) -> Result<Option<Duel>>;

    /// List an owner's duels, newest first
    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Duel>>;

    /// List an owner's duels with their aggregated like counts, newest first
    async fn list_with_votes(&self, owner_id: &str) -> Result<Vec<DuelWithVotes>>;

    /// Apply a partial update. The owner column is never touched.
    async fn update(&self, id: &DuelId, changes: UpdateDuel) -> Result<Duel>;

    /// Delete a duel; its turns go with it
    async fn delete(&self, id: &DuelId) -> Result<()>;
}

/// libSQL implementation of `DuelRepository`
pub struct LibSqlDuelRepository<'a> {
    conn: &'a Connection,
}

impl<'a> LibSqlDuelRepository<'a> {
    /// Create a new repository with the given connection
    pub const fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    fn parse_duel(row: &libsql::Row) -> Result<Duel> {
        let id: String = row.get(0)?;
        let status: String = row.get(6)?;
        Ok(Duel {
            id: id
                .parse()
                .map_err(|_| Error::Database(format!("Invalid duel ID in storage: {id}")))?,
            owner_id: row.get(1)?,
            name: row.get(2)?,
            description: row.get(3)?,
            contender_a_name: row.get(4)?,
            contender_b_name: row.get(5)?,
            status: status.parse()?,
            created_at: row.get(7)?,
        })
    }
}

const DUEL_COLUMNS: &str =
    "id, owner_id, name, description, contender_a_name, contender_b_name, status, created_at";

impl DuelRepository for LibSqlDuelRepository<'_> {
    async fn create(&self, owner_id: &str, input: NewDuel) -> Result<Duel> {
        if input.name.trim().is_empty() {
            return Err(Error::InvalidInput("Duel name is required".into()));
        }

        let duel = Duel::create(owner_id, input);
        self.conn
            .execute(
                "INSERT INTO duels (id, owner_id, name, description, contender_a_name, contender_b_name, status, created_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
                libsql::params![
                    duel.id.as_str(),
                    duel.owner_id.clone(),
                    duel.name.clone(),
                    duel.description.clone(),
                    duel.contender_a_name.clone(),
                    duel.contender_b_name.clone(),
                    duel.status.as_str(),
                    duel.created_at
                ],
            )
            .await?;

        Ok(duel)
    }

    async fn get(&self, id: &DuelId) -> Result<Option<Duel>> {
        let mut rows = self
            .conn
            .query(
                &format!("SELECT {DUEL_COLUMNS} FROM duels WHERE id = ?"),
                [id.as_str()],
            )
            .await?;

        match rows.next().await? {
            Some(row) => Ok(Some(Self::parse_duel(&row)?)),
            None => Ok(None),
        }
    }

    async fn list_for_owner(&self, owner_id: &str) -> Result<Vec<Duel>> {
        let mut rows = self
            .conn
            .query(
                &format!(
                    "SELECT {DUEL_COLUMNS} FROM duels
                     WHERE owner_id = ?
                     ORDER BY created_at DESC"
                ),
                [owner_id],
            )
            .await?;

        let mut duels = Vec::new();
        while let Some(row) = rows.next().await? {
            duels.push(Self::parse_duel(&row)?);
        }

        Ok(duels)
    }

    async fn list_with_votes(&self, owner_id: &str) -> Result<Vec<DuelWithVotes>> {
        let mut rows = self
            .conn
            .query(
                "SELECT d.id, d.owner_id, d.name, d.description, d.contender_a_name,
                        d.contender_b_name, d.status, d.created_at,
                        COALESCE(SUM(t.likes_a), 0), COALESCE(SUM(t.likes_b), 0)
                 FROM duels d
                 LEFT JOIN duel_turns t ON t.duel_id = d.id
                 WHERE d.owner_id = ?
                 GROUP BY d.id
                 ORDER BY d.created_at DESC",
                [owner_id],
            )
            .await?;

        let mut duels = Vec::new();
        while let Some(row) = rows.next().await? {
            duels.push(DuelWithVotes {
                duel: Self::parse_duel(&row)?,
                votes_a: row.get(8)?,
                votes_b: row.get(9)?,
            });
        }

        Ok(duels)
    }

    async fn update(&self, id: &DuelId, changes: UpdateDuel) -> Result<Duel> {
        if changes
            .name
            .as_deref()
            .is_some_and(|name| name.trim().is_empty())
        {
            return Err(Error::InvalidInput("Duel name cannot be empty".into()));
        }

        let mut duel = self
            .get(id)
            .await?
            .ok_or_else(|| Error::NotFound(id.to_string()))?;
        duel.apply(changes);

        self.conn
            .execute(
                "UPDATE duels
                 SET name = ?, description = ?, contender_a_name = ?, contender_b_name = ?, status = ?
                 WHERE id = ?",
                libsql::params![
                    duel.name.clone(),
                    duel.description.clone(),
                    duel.contender_a_name.clone(),
                    duel.contender_b_name.clone(),
                    duel.status.as_str(),
                    duel.id.as_str()
                ],
            )
            .await?;

        Ok(duel)
    }

    async fn delete(&self, id: &DuelId) -> Result<()> {
        let rows = self
            .conn
            .execute("DELETE FROM duels WHERE id = ?", [id.as_str()])
            .await?;

        if rows == 0 {
            return Err(Error::NotFound(id.to_string()));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::Database;
    use crate::models::DuelStatus;

    async fn setup() -> Database {
        Database::open_in_memory().await.unwrap()
    }

    fn named(name: &str) -> NewDuel {
        NewDuel {
            name: name.to_string(),
            ..NewDuel::default()
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_and_get() {
        let db = setup().await;
        let repo = LibSqlDuelRepository::new(db.connection());

        let duel = repo.create("owner-1", named("Sonnet vs Haiku")).await.unwrap();
        assert_eq!(duel.name, "Sonnet vs Haiku");
        assert_eq!(duel.status, DuelStatus::Active);

        let fetched = repo.get(&duel.id).await.unwrap().unwrap();
        assert_eq!(fetched, duel);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_create_rejects_blank_name() {
        let db = setup().await;
        let repo = LibSqlDuelRepository::new(db.connection());

        let err = repo.create("owner-1", named("  ")).await.unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_is_scoped_to_owner_and_newest_first() {
        let db = setup().await;
        let repo = LibSqlDuelRepository::new(db.connection());

        repo.create("owner-1", named("First")).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        repo.create("owner-1", named("Second")).await.unwrap();
        repo.create("owner-2", named("Other owner")).await.unwrap();

        let duels = repo.list_for_owner("owner-1").await.unwrap();
        assert_eq!(duels.len(), 2);
        assert_eq!(duels[0].name, "Second");
        assert_eq!(duels[1].name, "First");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_partial_fields() {
        let db = setup().await;
        let repo = LibSqlDuelRepository::new(db.connection());

        let duel = repo.create("owner-1", named("Original")).await.unwrap();
        let updated = repo
            .update(
                &duel.id,
                UpdateDuel {
                    status: Some(DuelStatus::Concluded),
                    description: Some("Round one".to_string()),
                    ..UpdateDuel::default()
                },
            )
            .await
            .unwrap();

        assert_eq!(updated.name, "Original");
        assert_eq!(updated.status, DuelStatus::Concluded);
        assert_eq!(updated.description.as_deref(), Some("Round one"));
        assert_eq!(updated.owner_id, "owner-1");

        let fetched = repo.get(&duel.id).await.unwrap().unwrap();
        assert_eq!(fetched, updated);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_update_missing_duel_is_not_found() {
        let db = setup().await;
        let repo = LibSqlDuelRepository::new(db.connection());

        let err = repo
            .update(&DuelId::new(), UpdateDuel::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_delete() {
        let db = setup().await;
        let repo = LibSqlDuelRepository::new(db.connection());

        let duel = repo.create("owner-1", named("Short lived")).await.unwrap();
        repo.delete(&duel.id).await.unwrap();

        assert!(repo.get(&duel.id).await.unwrap().is_none());
        assert!(matches!(
            repo.delete(&duel.id).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_with_votes_defaults_to_zero() {
        let db = setup().await;
        let repo = LibSqlDuelRepository::new(db.connection());

        repo.create("owner-1", named("No turns yet")).await.unwrap();

        let listed = repo.list_with_votes("owner-1").await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].votes_a, 0);
        assert_eq!(listed[0].votes_b, 0);
        assert!(listed[0].tally().is_tie());
    }
}
