//! Schema management for the PostgreSQL artifact backend.
//!
//! Every artifact kind gets its own table:
//!
//! ```sql
//! CREATE TABLE "oidc_access_tokens" (
//!     id         TEXT PRIMARY KEY,
//!     record     JSONB NOT NULL,
//!     expires_at BIGINT,
//!     consumed   BIGINT,
//!     grant_id   TEXT
//! );
//! ```
//!
//! The grant index is one table keyed by `(grant_key, member_key)`, so an
//! append is a single `INSERT ... ON CONFLICT DO NOTHING`.
//!
//! Table names come from configuration and are interpolated into SQL, so
//! they are restricted to plain identifiers, optionally schema-qualified.

use oidc_store::TableConfig;
use sqlx_core::query::query;
use sqlx_postgres::PgPool;
use tracing::{info, instrument};

use crate::error::{PostgresError, Result};

const MAX_IDENTIFIER_LEN: usize = 63;

/// Validates `name` and returns it double-quoted for use in SQL.
///
/// Accepts `table` or `schema.table`, where each part starts with a letter
/// or underscore and continues with letters, digits or underscores.
///
/// # Errors
///
/// Returns [`PostgresError::InvalidIdentifier`] for anything else.
pub fn quote_table(name: &str) -> Result<String> {
    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|part| is_plain_identifier(part)) {
        return Err(PostgresError::invalid_identifier(name));
    }

    Ok(parts
        .iter()
        .map(|part| format!("\"{part}\""))
        .collect::<Vec<_>>()
        .join("."))
}

fn is_plain_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    part.len() <= MAX_IDENTIFIER_LEN
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Derives an index name from a table name, e.g. `idx_oidc_access_tokens_expires_at`.
fn index_name(table: &str, column: &str) -> String {
    let base = table.replace('.', "_");
    let name = format!("idx_{base}_{column}");
    name.chars().take(MAX_IDENTIFIER_LEN).collect()
}

/// Creates every artifact table in `tables` and the grant index table.
///
/// Idempotent; existing tables are left untouched.
///
/// # Errors
///
/// Returns an error if a table name is invalid or a statement fails.
#[instrument(skip(pool, tables))]
pub async fn ensure_schema(pool: &PgPool, tables: &TableConfig, index_table: &str) -> Result<()> {
    for (kind, table) in tables.iter() {
        create_artifact_table(pool, table).await?;
        info!(kind = %kind, table = %table, "Artifact table ready");
    }
    create_index_table(pool, index_table).await?;
    info!(table = %index_table, "Grant index table ready");
    Ok(())
}

async fn create_artifact_table(pool: &PgPool, table: &str) -> Result<()> {
    let quoted = quote_table(table)?;

    query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {quoted} (
            id TEXT PRIMARY KEY,
            record JSONB NOT NULL,
            expires_at BIGINT,
            consumed BIGINT,
            grant_id TEXT
        )
        "#
    ))
    .execute(pool)
    .await?;

    // Index on expires_at for cleanup
    query(&format!(
        r#"CREATE INDEX IF NOT EXISTS "{}" ON {quoted} (expires_at)"#,
        index_name(table, "expires_at")
    ))
    .execute(pool)
    .await?;

    query(&format!(
        r#"CREATE INDEX IF NOT EXISTS "{}" ON {quoted} (grant_id)"#,
        index_name(table, "grant_id")
    ))
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_index_table(pool: &PgPool, table: &str) -> Result<()> {
    let quoted = quote_table(table)?;

    query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {quoted} (
            grant_key TEXT NOT NULL,
            member_key TEXT NOT NULL,
            seq BIGSERIAL,
            PRIMARY KEY (grant_key, member_key)
        )
        "#
    ))
    .execute(pool)
    .await?;

    Ok(())
}
