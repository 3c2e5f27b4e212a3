//! Per-kind artifact stores.
//!
//! The identity provider talks to one [`ArtifactStore`] per artifact kind.
//! Recognized kinds get a [`KindStore`] bound to the kind's backing table.
//! Unrecognized kind names get a [`RejectingStore`], which answers lookups
//! with "absent" and refuses every mutation.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::{debug, instrument};

use crate::artifact::Artifact;
use crate::backend::DynBackend;
use crate::clock::Clock;
use crate::error::{StoreError, StoreResult};
use crate::grant::GrantIndex;
use crate::kind::ArtifactKind;

/// CRUD surface the identity provider uses for one artifact kind.
#[async_trait]
pub trait ArtifactStore: Send + Sync {
    /// The kind name this store was requested for.
    fn kind_name(&self) -> &str;

    /// Creates or fully replaces artifact `id`.
    ///
    /// With a non-zero `ttl_secs` the artifact expires `ttl_secs` seconds
    /// from now; otherwise it never expires via TTL.
    ///
    /// # Errors
    ///
    /// Returns an error if the grant index or the row write fails.
    async fn upsert(
        &self,
        id: &str,
        payload: Map<String, Value>,
        ttl_secs: Option<u64>,
    ) -> StoreResult<()>;

    /// Returns artifact `id`, or `None` if it is missing or expired.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn find(&self, id: &str) -> StoreResult<Option<Artifact>>;

    /// Marks artifact `id` as consumed at the current time.
    ///
    /// Consuming an already consumed artifact succeeds and keeps the first
    /// timestamp.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if the artifact is missing or expired.
    async fn consume(&self, id: &str) -> StoreResult<()>;

    /// Deletes artifact `id`. Deleting a missing artifact succeeds.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    async fn destroy(&self, id: &str) -> StoreResult<()>;
}

/// Type alias for a shareable store instance.
pub type DynStore = Arc<dyn ArtifactStore>;

// ============================================================================
// Kind store
// ============================================================================

/// Store for one recognized kind, backed by the kind's table.
pub struct KindStore {
    kind: ArtifactKind,
    table: String,
    backend: DynBackend,
    clock: Arc<dyn Clock>,
    index: GrantIndex,
}

impl KindStore {
    /// Creates a store for `kind` over `table`.
    #[must_use]
    pub fn new(
        kind: ArtifactKind,
        table: impl Into<String>,
        backend: DynBackend,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let index = GrantIndex::new(backend.clone());
        Self {
            kind,
            table: table.into(),
            backend,
            clock,
            index,
        }
    }

    /// Returns the kind served by this store.
    #[must_use]
    pub fn kind(&self) -> ArtifactKind {
        self.kind
    }

    /// Returns the backing table name.
    #[must_use]
    pub fn table(&self) -> &str {
        &self.table
    }
}

#[async_trait]
impl ArtifactStore for KindStore {
    fn kind_name(&self) -> &str {
        self.kind.as_str()
    }

    #[instrument(skip(self, payload), fields(kind = %self.kind, table = %self.table))]
    async fn upsert(
        &self,
        id: &str,
        payload: Map<String, Value>,
        ttl_secs: Option<u64>,
    ) -> StoreResult<()> {
        let artifact = Artifact::new(self.kind, id, payload, self.clock.now(), ttl_secs);

        // Every stored row must already be reachable from its grant.
        if let Some(grant_id) = &artifact.grant_id {
            self.index.record(grant_id, &artifact.storage_key()).await?;
        }

        self.backend.put(&self.table, &artifact).await?;
        debug!(expires_at = ?artifact.expires_at, "Stored artifact");
        Ok(())
    }

    #[instrument(skip(self), fields(kind = %self.kind, table = %self.table))]
    async fn find(&self, id: &str) -> StoreResult<Option<Artifact>> {
        let now = self.clock.now();
        let found = self.backend.get(&self.table, id).await?;
        Ok(found.filter(|artifact| !artifact.is_expired(now)))
    }

    #[instrument(skip(self), fields(kind = %self.kind, table = %self.table))]
    async fn consume(&self, id: &str) -> StoreResult<()> {
        let now = self.clock.now();

        match self.backend.get(&self.table, id).await? {
            Some(artifact) if !artifact.is_expired(now) => {}
            _ => return Err(StoreError::not_found(self.kind.as_str(), id)),
        }

        if self.backend.mark_consumed(&self.table, id, now).await? {
            debug!(consumed = now, "Consumed artifact");
            Ok(())
        } else {
            Err(StoreError::not_found(self.kind.as_str(), id))
        }
    }

    #[instrument(skip(self), fields(kind = %self.kind, table = %self.table))]
    async fn destroy(&self, id: &str) -> StoreResult<()> {
        self.backend.delete(&self.table, id).await?;
        debug!("Destroyed artifact");
        Ok(())
    }
}

// ============================================================================
// Rejecting store
// ============================================================================

/// Store returned for kind names outside the recognized set.
///
/// Lookups resolve to absent so the identity provider can look up unknown
/// kinds safely; mutations fail with [`StoreError::UnsupportedKind`].
#[derive(Debug, Clone)]
pub struct RejectingStore {
    name: String,
}

impl RejectingStore {
    /// Creates a rejecting store for the kind `name`.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

#[async_trait]
impl ArtifactStore for RejectingStore {
    fn kind_name(&self) -> &str {
        &self.name
    }

    async fn upsert(
        &self,
        _id: &str,
        _payload: Map<String, Value>,
        _ttl_secs: Option<u64>,
    ) -> StoreResult<()> {
        Err(StoreError::unsupported_kind(&self.name))
    }

    async fn find(&self, _id: &str) -> StoreResult<Option<Artifact>> {
        Ok(None)
    }

    async fn consume(&self, _id: &str) -> StoreResult<()> {
        Err(StoreError::unsupported_kind(&self.name))
    }

    async fn destroy(&self, _id: &str) -> StoreResult<()> {
        Err(StoreError::unsupported_kind(&self.name))
    }
}
