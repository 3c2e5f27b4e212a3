//! Kind dispatcher.
//!
//! [`StoreFactory`] is built once at startup. It resolves the backing table
//! of every recognized kind up front, so a missing table aborts
//! initialization instead of failing the first request of that kind.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{info, warn};

use crate::backend::DynBackend;
use crate::clock::{Clock, SystemClock};
use crate::config::TableConfig;
use crate::error::StoreResult;
use crate::grant::GrantIndex;
use crate::kind::ArtifactKind;
use crate::revocation::RevocationCoordinator;
use crate::store::{DynStore, KindStore, RejectingStore};

/// Hands out artifact stores by kind name.
#[derive(Clone)]
pub struct StoreFactory {
    backend: DynBackend,
    tables: Arc<TableConfig>,
    stores: BTreeMap<ArtifactKind, DynStore>,
}

impl StoreFactory {
    /// Creates a factory over `backend`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any recognized kind has no table.
    pub fn new(
        backend: DynBackend,
        clock: Arc<dyn Clock>,
        tables: TableConfig,
    ) -> StoreResult<Self> {
        tables.validate()?;

        let mut stores: BTreeMap<ArtifactKind, DynStore> = BTreeMap::new();
        for (kind, table) in tables.iter() {
            let store = KindStore::new(kind, table, backend.clone(), clock.clone());
            stores.insert(kind, Arc::new(store));
        }

        info!(kinds = stores.len(), "Artifact stores initialized");
        Ok(Self {
            backend,
            tables: Arc::new(tables),
            stores,
        })
    }

    /// Creates a factory using the system clock and table names from the
    /// environment.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if any table variable is missing.
    pub fn from_env(backend: DynBackend) -> StoreResult<Self> {
        Self::new(backend, Arc::new(SystemClock), TableConfig::from_env()?)
    }

    /// Returns the store for kind `name`.
    ///
    /// Unrecognized names get a rejecting store.
    #[must_use]
    pub fn for_kind(&self, name: &str) -> DynStore {
        match name.parse::<ArtifactKind>() {
            Ok(kind) => self.store(kind),
            Err(_) => {
                warn!(kind = %name, "Unrecognized artifact kind, using rejecting store");
                Arc::new(RejectingStore::new(name))
            }
        }
    }

    /// Returns the store for `kind`.
    #[must_use]
    pub fn store(&self, kind: ArtifactKind) -> DynStore {
        match self.stores.get(&kind) {
            Some(store) => store.clone(),
            None => Arc::new(RejectingStore::new(kind.as_str())),
        }
    }

    /// Returns the revocation coordinator bound to the same backend and tables.
    #[must_use]
    pub fn revocation(&self) -> Arc<RevocationCoordinator> {
        Arc::new(RevocationCoordinator::new(
            self.backend.clone(),
            self.tables.clone(),
        ))
    }

    /// Returns the grant index over the same backend.
    #[must_use]
    pub fn grant_index(&self) -> GrantIndex {
        GrantIndex::new(self.backend.clone())
    }

    /// Returns the resolved table configuration.
    #[must_use]
    pub fn tables(&self) -> &TableConfig {
        &self.tables
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::revocation::GrantRevoker;
    use crate::testing::MapBackend;
    use serde_json::{Map, Value, json};

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn factory() -> StoreFactory {
        StoreFactory::new(
            Arc::new(MapBackend::new()),
            Arc::new(ManualClock::new(1_000)),
            TableConfig::with_prefix("oidc_"),
        )
        .unwrap()
    }

    #[test]
    fn test_missing_table_fails_construction() {
        let tables = TableConfig::with_prefix("oidc_");
        let mut partial = TableConfig::new();
        for (kind, table) in tables.iter() {
            if kind != ArtifactKind::Session {
                partial = partial.with_table(kind, table);
            }
        }

        let err = StoreFactory::new(
            Arc::new(MapBackend::new()),
            Arc::new(ManualClock::new(0)),
            partial,
        )
        .err()
        .unwrap();
        assert!(err.is_configuration());
        assert!(err.to_string().contains("SESSIONS_TABLE_NAME"));
    }

    #[tokio::test]
    async fn test_for_kind_dispatches_known_kinds() {
        let factory = factory();
        let store = factory.for_kind("AccessToken");
        assert_eq!(store.kind_name(), "AccessToken");

        store.upsert("a1", Map::new(), Some(60)).await.unwrap();
        assert!(factory.store(ArtifactKind::AccessToken).find("a1").await.unwrap().is_some());
        assert!(factory.for_kind("RefreshToken").find("a1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_for_kind_rejects_unknown_kind() {
        let store = factory().for_kind("PushedAuthorizationRequest");
        assert_eq!(store.kind_name(), "PushedAuthorizationRequest");
        assert!(store.find("x").await.unwrap().is_none());
        assert!(store.destroy("x").await.unwrap_err().is_unsupported_kind());
    }

    #[tokio::test]
    async fn test_revocation_shares_backend() {
        let factory = factory();
        factory
            .for_kind("AccessToken")
            .upsert("a1", payload(json!({"grantId": "G1"})), Some(60))
            .await
            .unwrap();
        factory
            .for_kind("Session")
            .upsert("s1", payload(json!({"account": "u1"})), None)
            .await
            .unwrap();

        let report = factory.revocation().revoke("G1").await.unwrap();
        assert_eq!(report.deleted, 1);
        assert!(factory.for_kind("AccessToken").find("a1").await.unwrap().is_none());
        assert!(factory.for_kind("Session").find("s1").await.unwrap().is_some());
    }

    #[test]
    fn test_table_lookup() {
        let factory = factory();
        assert_eq!(
            factory.tables().table(ArtifactKind::RefreshToken),
            Some("oidc_refresh_tokens")
        );
    }
}
