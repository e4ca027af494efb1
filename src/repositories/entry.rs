use async_trait::async_trait;
use deadpool_postgres::Pool;
use tokio_postgres::Row;

use crate::{
    error::Result,
    models::entry::{EntryId, EntrySummary, VaultEntry},
    models::user::UserId,
    repositories::traits::EntryRepository,
};

fn row_to_summary(row: &Row) -> Result<EntrySummary> {
    Ok(EntrySummary {
        id: EntryId(row.try_get("id")?),
        site: row.try_get("site")?,
        link: row.try_get("link")?,
        username: row.try_get("username")?,
        created_at: row.try_get("created_at")?,
    })
}

fn row_to_entry(row: &Row) -> Result<VaultEntry> {
    Ok(VaultEntry {
        id: EntryId(row.try_get("id")?),
        owner_id: UserId(row.try_get("owner_id")?),
        site: row.try_get("site")?,
        link: row.try_get("link")?,
        username: row.try_get("username")?,
        cipher: row.try_get("cipher")?,
        created_at: row.try_get("created_at")?,
    })
}

/// PostgreSQL-backed entry storage.
///
/// `seq` is a `BIGSERIAL`, so ordering by it descending is reverse insertion
/// order even when two entries share a `created_at`.
#[derive(Clone)]
pub struct PgEntryRepository {
    pool: Pool,
}

impl PgEntryRepository {
    /// Creates a repository over the given pool.
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl EntryRepository for PgEntryRepository {
    async fn insert(&self, entry: &VaultEntry) -> Result<()> {
        let client = self.pool.get().await?;
        client
            .execute(
                r#"
                INSERT INTO vault_entries (id, owner_id, site, link, username, cipher, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7)
                "#,
                &[
                    &entry.id.0,
                    &entry.owner_id.0,
                    &entry.site,
                    &entry.link,
                    &entry.username,
                    &entry.cipher,
                    &entry.created_at,
                ],
            )
            .await?;
        Ok(())
    }

    async fn list(&self, owner: UserId, limit: i64, offset: i64) -> Result<Vec<EntrySummary>> {
        let client = self.pool.get().await?;
        let rows = client
            .query(
                r#"
                SELECT id, site, link, username, created_at
                FROM vault_entries
                WHERE owner_id = $1
                ORDER BY seq DESC
                LIMIT $2 OFFSET $3
                "#,
                &[&owner.0, &limit, &offset],
            )
            .await?;
        rows.iter().map(row_to_summary).collect()
    }

    async fn count(&self, owner: UserId) -> Result<i64> {
        let client = self.pool.get().await?;
        let row = client
            .query_one(
                "SELECT COUNT(*) AS total FROM vault_entries WHERE owner_id = $1",
                &[&owner.0],
            )
            .await?;
        Ok(row.try_get("total")?)
    }

    async fn find(&self, owner: UserId, id: EntryId) -> Result<Option<VaultEntry>> {
        let client = self.pool.get().await?;
        let row = client
            .query_opt(
                r#"
                SELECT id, owner_id, site, link, username, cipher, created_at
                FROM vault_entries
                WHERE id = $1 AND owner_id = $2
                "#,
                &[&id.0, &owner.0],
            )
            .await?;
        row.map(|r| row_to_entry(&r)).transpose()
    }

    async fn delete(&self, owner: UserId, id: EntryId) -> Result<u64> {
        let client = self.pool.get().await?;
        let removed = client
            .execute(
                "DELETE FROM vault_entries WHERE id = $1 AND owner_id = $2",
                &[&id.0, &owner.0],
            )
            .await?;
        Ok(removed)
    }
}
