//! Grant index.
//!
//! Maps a grant identifier to the storage keys of every artifact issued
//! under it, across kinds. Entries have no TTL and may point at rows that
//! have since expired or been destroyed; readers must tolerate that.

use tracing::{debug, instrument, warn};

use crate::StoreResult;
use crate::backend::DynBackend;
use crate::key::{StorageKey, grant_key};

/// Secondary index from grant id to member artifact keys.
#[derive(Clone)]
pub struct GrantIndex {
    backend: DynBackend,
}

impl GrantIndex {
    /// Creates an index over `backend`.
    #[must_use]
    pub fn new(backend: DynBackend) -> Self {
        Self { backend }
    }

    /// Adds `key` to the entry of `grant_id`.
    ///
    /// Atomic only if the backend overrides
    /// [`ArtifactBackend::append_index_member`](crate::ArtifactBackend::append_index_member).
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self), fields(key = %key))]
    pub async fn record(&self, grant_id: &str, key: &StorageKey) -> StoreResult<()> {
        self.backend
            .append_index_member(&grant_key(grant_id), &key.encode())
            .await?;
        debug!("Recorded grant member");
        Ok(())
    }

    /// Returns the decoded members of `grant_id`.
    ///
    /// Members whose key cannot be decoded are dropped with a warning.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn members(&self, grant_id: &str) -> StoreResult<Vec<StorageKey>> {
        let raw = self.backend.index_members(&grant_key(grant_id)).await?;
        let members = raw
            .iter()
            .filter_map(|member| {
                let decoded = StorageKey::decode(member);
                if decoded.is_none() {
                    warn!(member = %member, "Ignoring undecodable grant member");
                }
                decoded
            })
            .collect();
        Ok(members)
    }

    /// Rewrites the entry of `grant_id` to hold only `keep`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self, keep), fields(kept = keep.len()))]
    pub async fn retain(&self, grant_id: &str, keep: &[StorageKey]) -> StoreResult<()> {
        let members = keep.iter().map(StorageKey::encode).collect();
        self.backend.replace_index(&grant_key(grant_id), members).await
    }

    /// Drops the entry of `grant_id`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend call fails.
    #[instrument(skip(self))]
    pub async fn clear(&self, grant_id: &str) -> StoreResult<()> {
        self.backend.delete_index(&grant_key(grant_id)).await
    }
}
