//! Cascading grant revocation.
//!
//! Revoking a grant deletes every token and code issued under it, across
//! kinds. Members are read once from the [`GrantIndex`], grouped by kind and
//! deleted concurrently: kinds run in parallel, and deletes within a kind run
//! in parallel too. The revocation completes only when every delete has
//! completed.
//!
//! Failures are not retried and successful deletes are not rolled back. A
//! revocation with failed deletes reports [`StoreError::PartialRevocation`]
//! and keeps the grant's index entry, so the same grant can be revoked again.
//! Members of kinds that revocation never deletes stay in the entry.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use futures_util::future::join_all;
use serde::Serialize;
use tracing::{error, info, instrument, warn};

use crate::backend::DynBackend;
use crate::config::TableConfig;
use crate::error::{StoreError, StoreResult};
use crate::grant::GrantIndex;
use crate::key::StorageKey;
use crate::kind::ArtifactKind;

/// Entry point the identity provider calls when a grant is revoked.
#[async_trait]
pub trait GrantRevoker: Send + Sync {
    /// Deletes every artifact issued under `grant_id`.
    ///
    /// Revoking an unknown grant succeeds with an empty report.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::PartialRevocation`] if any delete failed, or a
    /// backend error if the grant index cannot be read.
    async fn revoke(&self, grant_id: &str) -> StoreResult<RevocationReport>;
}

/// Outcome of a successful revocation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RevocationReport {
    /// The revoked grant.
    pub grant_id: String,
    /// Number of delete calls that succeeded.
    ///
    /// Deleting a missing row succeeds, so members whose row had already
    /// expired or been destroyed are counted too. This is not the number of
    /// rows removed.
    pub deleted: usize,
    /// Index members skipped because their kind is not revocable. They remain
    /// in the grant's index entry.
    pub skipped: usize,
    /// Successful delete calls per kind.
    pub by_kind: BTreeMap<ArtifactKind, usize>,
}

impl RevocationReport {
    /// Returns `true` if no delete call was issued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deleted == 0
    }
}

/// Revokes grants against the per-kind tables of one backend.
#[derive(Clone)]
pub struct RevocationCoordinator {
    backend: DynBackend,
    index: GrantIndex,
    tables: Arc<TableConfig>,
}

impl RevocationCoordinator {
    /// Creates a coordinator over `backend` using `tables` to locate each kind.
    #[must_use]
    pub fn new(backend: DynBackend, tables: Arc<TableConfig>) -> Self {
        let index = GrantIndex::new(backend.clone());
        Self {
            backend,
            index,
            tables,
        }
    }

    /// Deletes every member of one kind, returning the keys that failed.
    async fn delete_kind(&self, kind: ArtifactKind, ids: Vec<String>) -> (usize, Vec<String>) {
        let Some(table) = self.tables.table(kind) else {
            error!(kind = %kind, "No table configured for revocable kind");
            let keys = ids
                .into_iter()
                .map(|id| StorageKey::new(kind, id).encode())
                .collect();
            return (0, keys);
        };

        let results = join_all(ids.into_iter().map(|id| async move {
            let outcome = self.backend.delete(table, &id).await;
            (id, outcome)
        }))
        .await;

        let mut deleted = 0;
        let mut failed = Vec::new();
        for (id, outcome) in results {
            match outcome {
                Ok(()) => deleted += 1,
                Err(e) => {
                    let key = StorageKey::new(kind, id).encode();
                    warn!(key = %key, error = %e, "Failed to delete grant member");
                    failed.push(key);
                }
            }
        }
        (deleted, failed)
    }
}

#[async_trait]
impl GrantRevoker for RevocationCoordinator {
    #[instrument(skip(self))]
    async fn revoke(&self, grant_id: &str) -> StoreResult<RevocationReport> {
        let members = self.index.members(grant_id).await?;

        let mut report = RevocationReport {
            grant_id: grant_id.to_string(),
            ..RevocationReport::default()
        };

        let mut by_kind: BTreeMap<ArtifactKind, Vec<String>> = BTreeMap::new();
        let mut kept = Vec::new();
        for member in members {
            if member.kind().is_revocable() {
                by_kind
                    .entry(member.kind())
                    .or_default()
                    .push(member.id().to_string());
            } else {
                warn!(key = %member, "Skipping grant member of non-revocable kind");
                kept.push(member);
            }
        }
        report.skipped = kept.len();

        let attempted: usize = by_kind.values().map(Vec::len).sum();
        let outcomes = join_all(
            by_kind
                .into_iter()
                .map(|(kind, ids)| async move { (kind, self.delete_kind(kind, ids).await) }),
        )
        .await;

        let mut failed_keys = Vec::new();
        for (kind, (deleted, failed)) in outcomes {
            if deleted > 0 {
                report.by_kind.insert(kind, deleted);
            }
            report.deleted += deleted;
            failed_keys.extend(failed);
        }

        if !failed_keys.is_empty() {
            error!(
                failed = failed_keys.len(),
                attempted, "Grant revocation left artifacts behind"
            );
            return Err(StoreError::PartialRevocation {
                grant_id: grant_id.to_string(),
                failed: failed_keys.len(),
                attempted,
                failed_keys,
            });
        }

        if kept.is_empty() {
            self.index.clear(grant_id).await?;
        } else {
            self.index.retain(grant_id, &kept).await?;
        }
        info!(deleted = report.deleted, skipped = report.skipped, "Revoked grant");
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArtifactBackend;
    use crate::artifact::Artifact;
    use crate::testing::MapBackend;
    use serde_json::{Map, Value, json};

    fn tables() -> Arc<TableConfig> {
        Arc::new(TableConfig::with_prefix("t_"))
    }

    async fn seed(backend: &MapBackend, tables: &TableConfig, kind: ArtifactKind, id: &str, grant: &str) {
        let payload: Map<String, Value> = json!({"grantId": grant}).as_object().cloned().unwrap();
        let artifact = Artifact::new(kind, id, payload, 1_000, Some(3_600));
        backend
            .put(tables.table(kind).unwrap(), &artifact)
            .await
            .unwrap();
        backend
            .append_index_member(&format!("grant:{grant}"), &artifact.storage_key().encode())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_revoke_deletes_members_across_kinds() {
        let backend = Arc::new(MapBackend::new());
        let tables = tables();
        seed(&backend, &tables, ArtifactKind::AccessToken, "a1", "G1").await;
        seed(&backend, &tables, ArtifactKind::AccessToken, "a2", "G1").await;
        seed(&backend, &tables, ArtifactKind::RefreshToken, "r1", "G1").await;
        seed(&backend, &tables, ArtifactKind::AuthorizationCode, "c1", "G2").await;

        let coordinator = RevocationCoordinator::new(backend.clone(), tables.clone());
        let report = coordinator.revoke("G1").await.unwrap();

        assert_eq!(report.deleted, 3);
        assert_eq!(report.by_kind.get(&ArtifactKind::AccessToken), Some(&2));
        assert_eq!(report.by_kind.get(&ArtifactKind::RefreshToken), Some(&1));
        assert_eq!(backend.row_count(), 1);
        assert!(backend.index_members("grant:G1").await.unwrap().is_empty());
        assert_eq!(backend.index_members("grant:G2").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_revoke_unknown_grant_is_empty() {
        let coordinator = RevocationCoordinator::new(Arc::new(MapBackend::new()), tables());
        let report = coordinator.revoke("nobody").await.unwrap();
        assert!(report.is_empty());
        assert_eq!(report.grant_id, "nobody");
    }

    #[tokio::test]
    async fn test_revoke_tolerates_stale_members() {
        let backend = Arc::new(MapBackend::new());
        backend
            .append_index_member("grant:G1", "AccessToken:already-gone")
            .await
            .unwrap();

        let coordinator = RevocationCoordinator::new(backend, tables());
        let report = coordinator.revoke("G1").await.unwrap();
        assert_eq!(report.deleted, 1);
    }

    #[tokio::test]
    async fn test_revoke_skips_non_revocable_kinds() {
        let backend = Arc::new(MapBackend::new());
        let tables = tables();
        seed(&backend, &tables, ArtifactKind::Session, "s1", "G1").await;
        seed(&backend, &tables, ArtifactKind::AccessToken, "a1", "G1").await;

        let coordinator = RevocationCoordinator::new(backend.clone(), tables);
        let report = coordinator.revoke("G1").await.unwrap();

        assert_eq!(report.deleted, 1);
        assert_eq!(report.skipped, 1);
        assert_eq!(backend.row_count(), 1);
        assert_eq!(
            backend.index_members("grant:G1").await.unwrap(),
            vec!["Session:s1".to_string()]
        );
    }

    #[tokio::test]
    async fn test_revoke_deletes_registration_and_initial_access_tokens() {
        let backend = Arc::new(MapBackend::new());
        let tables = tables();
        seed(&backend, &tables, ArtifactKind::RegistrationAccessToken, "rat", "G1").await;
        seed(&backend, &tables, ArtifactKind::InitialAccessToken, "iat", "G1").await;

        let coordinator = RevocationCoordinator::new(backend.clone(), tables);
        let report = coordinator.revoke("G1").await.unwrap();

        assert_eq!(report.deleted, 2);
        assert_eq!(report.skipped, 0);
        assert_eq!(backend.row_count(), 0);
        assert!(backend.index_members("grant:G1").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partial_failure_is_aggregated_and_keeps_index() {
        let backend = Arc::new(MapBackend::new());
        let tables = tables();
        seed(&backend, &tables, ArtifactKind::AccessToken, "a1", "G1").await;
        seed(&backend, &tables, ArtifactKind::RefreshToken, "r1", "G1").await;
        seed(&backend, &tables, ArtifactKind::ClientCredentials, "cc1", "G1").await;
        backend.fail_delete(tables.table(ArtifactKind::RefreshToken).unwrap(), "r1");

        let coordinator = RevocationCoordinator::new(backend.clone(), tables);
        let err = coordinator.revoke("G1").await.unwrap_err();

        match err {
            StoreError::PartialRevocation {
                failed,
                attempted,
                failed_keys,
                ..
            } => {
                assert_eq!(failed, 1);
                assert_eq!(attempted, 3);
                assert_eq!(failed_keys, vec!["RefreshToken:r1".to_string()]);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(backend.row_count(), 1);
        assert_eq!(backend.index_members("grant:G1").await.unwrap().len(), 3);
    }
}
