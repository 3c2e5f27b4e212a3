//! Backing store port.
//!
//! Every artifact store talks to its backing tables through
//! [`ArtifactBackend`]. The backend is created once at startup and handed to
//! the [`StoreFactory`](crate::StoreFactory), so tests can swap in an
//! in-memory implementation.
//!
//! # Implementations
//!
//! Implementations are provided in separate crates:
//!
//! - `oidc-store-memory` - in-memory backend for local runs and tests
//! - `oidc-store-postgres` - PostgreSQL backend

use std::sync::Arc;

use async_trait::async_trait;

use crate::StoreResult;
use crate::artifact::Artifact;

/// Storage operations over per-kind artifact tables and the grant index.
///
/// Implementations must not retry internally; failures surface to the
/// caller as [`StoreError::Backend`](crate::StoreError::Backend).
#[async_trait]
pub trait ArtifactBackend: Send + Sync {
    /// Loads the row `id` from `table`, expired or not.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails or the row cannot be decoded.
    async fn get(&self, table: &str, id: &str) -> StoreResult<Option<Artifact>>;

    /// Writes `artifact` into `table`, fully replacing any row with the same id.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn put(&self, table: &str, artifact: &Artifact) -> StoreResult<()>;

    /// Sets `consumed` on row `id` unless it is already set.
    ///
    /// Returns `false` when the row does not exist. An already consumed row
    /// keeps its original timestamp and reports `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn mark_consumed(&self, table: &str, id: &str, consumed_at: i64) -> StoreResult<bool>;

    /// Removes row `id` from `table`. Removing a missing row succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn delete(&self, table: &str, id: &str) -> StoreResult<()>;

    /// Returns the members of a grant index entry in insertion order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn index_members(&self, grant_key: &str) -> StoreResult<Vec<String>>;

    /// Overwrites a grant index entry with `members`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn replace_index(&self, grant_key: &str, members: Vec<String>) -> StoreResult<()>;

    /// Adds `member` to a grant index entry, creating the entry if needed.
    ///
    /// The default implementation reads the entry, appends and writes it
    /// back. Two concurrent appends to the same entry can both read the old
    /// list, and the second write then drops the first member. Backends with
    /// an atomic set-append primitive must override this method.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn append_index_member(&self, grant_key: &str, member: &str) -> StoreResult<()> {
        let mut members = self.index_members(grant_key).await?;
        if members.iter().any(|existing| existing == member) {
            return Ok(());
        }
        members.push(member.to_string());
        self.replace_index(grant_key, members).await
    }

    /// Removes a grant index entry. Removing a missing entry succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn delete_index(&self, grant_key: &str) -> StoreResult<()>;
}

/// Type alias for a shareable backend instance.
pub type DynBackend = Arc<dyn ArtifactBackend>;
