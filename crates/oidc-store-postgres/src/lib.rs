//! PostgreSQL artifact backend for `oidc-store`.
//!
//! Provides persistent storage for every artifact kind of the identity
//! provider, one table per kind, plus the grant index table used by
//! cascading revocation.
//!
//! Grant index appends are `INSERT ... ON CONFLICT DO NOTHING` on a composite
//! primary key, so concurrent upserts under one grant never lose a member.
//! Consume is a single `UPDATE ... SET consumed = COALESCE(consumed, $2)`.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use oidc_store::{StoreFactory, SystemClock, TableConfig};
//! use oidc_store_postgres::{PostgresBackend, PostgresConfig};
//!
//! let tables = TableConfig::from_env()?;
//! let config = PostgresConfig::new("postgres://localhost/oidc");
//! let backend = PostgresBackend::connect(&config, &tables).await?;
//!
//! let factory = StoreFactory::new(Arc::new(backend), Arc::new(SystemClock), tables)?;
//! ```

mod backend;
pub mod config;
pub mod error;
pub mod pool;
pub mod schema;

pub use backend::PostgresBackend;
pub use config::{DEFAULT_INDEX_TABLE, PostgresConfig};
pub use error::{PostgresError, Result};
pub use pool::{create_pool, mask_password};
pub use schema::{ensure_schema, quote_table};
pub use sqlx_postgres::PgPool;
