use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use oidc_store::{Clock, DynBackend, StoreError, StoreFactory, SystemClock, TableConfig};
use oidc_store_memory::MemoryBackend;
use oidc_store_postgres::PostgresBackend;
use tracing::{debug, info};

use crate::cli::BackendKind;
use crate::config::CliConfig;

pub enum BackendHandle {
    Memory(Arc<MemoryBackend>),
    Postgres(Arc<PostgresBackend>),
}

impl BackendHandle {
    fn as_dyn(&self) -> DynBackend {
        match self {
            Self::Memory(backend) => backend.clone(),
            Self::Postgres(backend) => backend.clone(),
        }
    }
}

/// Everything a command needs: the store factory and the concrete backend
/// for maintenance operations.
pub struct Context {
    pub factory: StoreFactory,
    pub backend: BackendHandle,
    pub clock: Arc<dyn Clock>,
    snapshot: Option<PathBuf>,
}

impl Context {
    pub async fn build(config: &CliConfig, kind: BackendKind) -> Result<Self> {
        let tables = config.resolve_tables()?;

        let mut snapshot = None;
        let backend = match kind {
            BackendKind::Memory if config.memory.persist => {
                let path = config.memory.path.clone();
                let backend = MemoryBackend::load(&path)?;
                snapshot = Some(path);
                BackendHandle::Memory(Arc::new(backend))
            }
            BackendKind::Memory => BackendHandle::Memory(Arc::new(MemoryBackend::new())),
            BackendKind::Postgres => {
                let backend = PostgresBackend::connect(&config.postgres, &tables)
                    .await
                    .map_err(StoreError::from)?;
                BackendHandle::Postgres(Arc::new(backend))
            }
        };
        info!(backend = ?kind, "Backend ready");

        let mut ctx = Self::with_backend(backend, tables)?;
        ctx.snapshot = snapshot;
        Ok(ctx)
    }

    pub fn with_backend(backend: BackendHandle, tables: TableConfig) -> Result<Self, StoreError> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let factory = StoreFactory::new(backend.as_dyn(), clock.clone(), tables)?;
        Ok(Self {
            factory,
            backend,
            clock,
            snapshot: None,
        })
    }

    pub fn tables(&self) -> &TableConfig {
        self.factory.tables()
    }

    /// Writes the memory backend back to its snapshot file, if it has one.
    pub fn persist(&self) -> Result<(), StoreError> {
        if let (BackendHandle::Memory(backend), Some(path)) = (&self.backend, &self.snapshot) {
            backend.save(path)?;
            debug!(path = %path.display(), "Memory backend saved");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use oidc_store::{ArtifactKind, GrantRevoker};
    use serde_json::{Map, Value, json};

    use super::*;

    fn payload(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    fn memory_config(path: PathBuf) -> CliConfig {
        let mut config = CliConfig::default();
        config.tables.prefix = Some("cli_".to_string());
        config.memory.path = path;
        config
    }

    #[tokio::test]
    async fn test_memory_backend_keeps_artifacts_between_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config = memory_config(dir.path().join("store.json"));

        let first = Context::build(&config, BackendKind::Memory).await.unwrap();
        first
            .factory
            .for_kind("RefreshToken")
            .upsert("r1", payload(json!({"grantId": "G1"})), None)
            .await
            .unwrap();
        first.persist().unwrap();

        let second = Context::build(&config, BackendKind::Memory).await.unwrap();
        let found = second.factory.for_kind("RefreshToken").find("r1").await.unwrap();
        assert!(found.is_some());
        assert_eq!(
            second.tables().table(ArtifactKind::RefreshToken),
            Some("cli_refresh_tokens")
        );

        let report = second.factory.revocation().revoke("G1").await.unwrap();
        assert_eq!(report.deleted, 1);
    }

    #[tokio::test]
    async fn test_memory_backend_without_persistence_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let mut config = memory_config(path.clone());
        config.memory.persist = false;

        let ctx = Context::build(&config, BackendKind::Memory).await.unwrap();
        ctx.factory
            .for_kind("AccessToken")
            .upsert("a1", payload(json!({})), Some(60))
            .await
            .unwrap();
        ctx.persist().unwrap();

        assert!(!path.exists());
    }
}
