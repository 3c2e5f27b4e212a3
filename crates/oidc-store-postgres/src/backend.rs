//! [`ArtifactBackend`] implementation over PostgreSQL.

use std::sync::Arc;

use async_trait::async_trait;
use oidc_store::{Artifact, ArtifactBackend, StoreResult, TableConfig};
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_core::query_scalar::query_scalar;
use sqlx_postgres::PgPool;
use tracing::{debug, info, instrument};

use crate::config::PostgresConfig;
use crate::error::Result;
use crate::pool::create_pool;
use crate::schema::{ensure_schema, quote_table};

/// PostgreSQL-backed artifact storage.
///
/// Rows keep the full [`Artifact`] as JSONB in `record`. The `consumed`
/// column is authoritative for the consume mark so it can be set with a
/// single conditional `UPDATE`.
#[derive(Clone)]
pub struct PostgresBackend {
    pool: Arc<PgPool>,
    index_table: String,
}

impl PostgresBackend {
    /// Creates a backend from an existing pool.
    ///
    /// # Errors
    ///
    /// Returns an error if `index_table` is not a valid table name.
    pub fn new(pool: PgPool, index_table: impl Into<String>) -> Result<Self> {
        let index_table = index_table.into();
        quote_table(&index_table)?;
        Ok(Self {
            pool: Arc::new(pool),
            index_table,
        })
    }

    /// Connects using `config` and, if enabled, creates missing tables.
    ///
    /// # Errors
    ///
    /// Returns an error if the connection or the schema bootstrap fails.
    pub async fn connect(config: &PostgresConfig, tables: &TableConfig) -> Result<Self> {
        let pool = create_pool(config).await?;
        let backend = Self::new(pool, config.index_table.clone())?;
        if config.ensure_schema {
            backend.ensure_schema(tables).await?;
        }
        Ok(backend)
    }

    /// Returns a reference to the connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Returns the grant index table name.
    #[must_use]
    pub fn index_table(&self) -> &str {
        &self.index_table
    }

    /// Creates every artifact table and the grant index table.
    ///
    /// # Errors
    ///
    /// Returns an error if a table name is invalid or a statement fails.
    pub async fn ensure_schema(&self, tables: &TableConfig) -> Result<()> {
        ensure_schema(&self.pool, tables, &self.index_table).await
    }

    /// Deletes every row expired at `now` from every table in `tables`.
    ///
    /// Returns the number of deleted rows.
    ///
    /// # Errors
    ///
    /// Returns an error if a table name is invalid or a delete fails.
    #[instrument(skip(self, tables))]
    pub async fn cleanup_expired(&self, tables: &TableConfig, now: i64) -> Result<u64> {
        let mut total = 0;
        for (kind, table) in tables.iter() {
            let quoted = quote_table(table)?;
            let rows_affected = query(&format!(
                r#"
                DELETE FROM {quoted}
                WHERE expires_at IS NOT NULL AND expires_at <= $1
                "#
            ))
            .bind(now)
            .execute(&*self.pool)
            .await?
            .rows_affected();

            if rows_affected > 0 {
                debug!(kind = %kind, count = rows_affected, "Deleted expired artifacts");
            }
            total += rows_affected;
        }

        info!(count = total, "Cleaned up expired artifacts");
        Ok(total)
    }

    async fn get_row(&self, table: &str, id: &str) -> Result<Option<Artifact>> {
        let quoted = quote_table(table)?;
        let row: Option<(serde_json::Value, Option<i64>)> = query_as(&format!(
            r#"
            SELECT record, consumed
            FROM {quoted}
            WHERE id = $1
            "#
        ))
        .bind(id)
        .fetch_optional(&*self.pool)
        .await?;

        let Some((record, consumed)) = row else {
            return Ok(None);
        };
        let mut artifact: Artifact = serde_json::from_value(record)?;
        artifact.consumed = consumed;
        Ok(Some(artifact))
    }

    async fn put_row(&self, table: &str, artifact: &Artifact) -> Result<()> {
        let quoted = quote_table(table)?;
        let record = serde_json::to_value(artifact)?;

        query(&format!(
            r#"
            INSERT INTO {quoted} (id, record, expires_at, consumed, grant_id)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (id) DO UPDATE SET
                record = EXCLUDED.record,
                expires_at = EXCLUDED.expires_at,
                consumed = EXCLUDED.consumed,
                grant_id = EXCLUDED.grant_id
            "#
        ))
        .bind(&artifact.id)
        .bind(record)
        .bind(artifact.expires_at)
        .bind(artifact.consumed)
        .bind(artifact.grant_id.as_deref())
        .execute(&*self.pool)
        .await?;

        Ok(())
    }

    async fn consume_row(&self, table: &str, id: &str, consumed_at: i64) -> Result<bool> {
        let quoted = quote_table(table)?;
        let rows_affected = query(&format!(
            r#"
            UPDATE {quoted}
            SET consumed = COALESCE(consumed, $2)
            WHERE id = $1
            "#
        ))
        .bind(id)
        .bind(consumed_at)
        .execute(&*self.pool)
        .await?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    async fn delete_row(&self, table: &str, id: &str) -> Result<()> {
        let quoted = quote_table(table)?;
        query(&format!("DELETE FROM {quoted} WHERE id = $1"))
            .bind(id)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }

    async fn members(&self, grant_key: &str) -> Result<Vec<String>> {
        let quoted = quote_table(&self.index_table)?;
        let members = query_scalar::<_, String>(&format!(
            r#"
            SELECT member_key
            FROM {quoted}
            WHERE grant_key = $1
            ORDER BY seq
            "#
        ))
        .bind(grant_key)
        .fetch_all(&*self.pool)
        .await?;
        Ok(members)
    }

    async fn replace_members(&self, grant_key: &str, members: Vec<String>) -> Result<()> {
        let quoted = quote_table(&self.index_table)?;
        let mut tx = self.pool.begin().await?;

        query(&format!("DELETE FROM {quoted} WHERE grant_key = $1"))
            .bind(grant_key)
            .execute(&mut *tx)
            .await?;

        let insert = format!(
            "INSERT INTO {quoted} (grant_key, member_key) VALUES ($1, $2) ON CONFLICT DO NOTHING"
        );
        for member in members {
            query(&insert)
                .bind(grant_key)
                .bind(member)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn append_member(&self, grant_key: &str, member: &str) -> Result<()> {
        let quoted = quote_table(&self.index_table)?;
        query(&format!(
            r#"
            INSERT INTO {quoted} (grant_key, member_key)
            VALUES ($1, $2)
            ON CONFLICT (grant_key, member_key) DO NOTHING
            "#
        ))
        .bind(grant_key)
        .bind(member)
        .execute(&*self.pool)
        .await?;
        Ok(())
    }

    async fn delete_members(&self, grant_key: &str) -> Result<()> {
        let quoted = quote_table(&self.index_table)?;
        query(&format!("DELETE FROM {quoted} WHERE grant_key = $1"))
            .bind(grant_key)
            .execute(&*self.pool)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl ArtifactBackend for PostgresBackend {
    #[instrument(skip(self))]
    async fn get(&self, table: &str, id: &str) -> StoreResult<Option<Artifact>> {
        Ok(self.get_row(table, id).await?)
    }

    #[instrument(skip(self, artifact), fields(id = %artifact.id))]
    async fn put(&self, table: &str, artifact: &Artifact) -> StoreResult<()> {
        Ok(self.put_row(table, artifact).await?)
    }

    #[instrument(skip(self))]
    async fn mark_consumed(&self, table: &str, id: &str, consumed_at: i64) -> StoreResult<bool> {
        Ok(self.consume_row(table, id, consumed_at).await?)
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: &str, id: &str) -> StoreResult<()> {
        Ok(self.delete_row(table, id).await?)
    }

    #[instrument(skip(self))]
    async fn index_members(&self, grant_key: &str) -> StoreResult<Vec<String>> {
        Ok(self.members(grant_key).await?)
    }

    #[instrument(skip(self, members), fields(count = members.len()))]
    async fn replace_index(&self, grant_key: &str, members: Vec<String>) -> StoreResult<()> {
        Ok(self.replace_members(grant_key, members).await?)
    }

    #[instrument(skip(self))]
    async fn append_index_member(&self, grant_key: &str, member: &str) -> StoreResult<()> {
        Ok(self.append_member(grant_key, member).await?)
    }

    #[instrument(skip(self))]
    async fn delete_index(&self, grant_key: &str) -> StoreResult<()> {
        Ok(self.delete_members(grant_key).await?)
    }
}

impl std::fmt::Debug for PostgresBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresBackend")
            .field("index_table", &self.index_table)
            .finish_non_exhaustive()
    }
}
