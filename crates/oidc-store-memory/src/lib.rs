//! In-memory artifact backend for `oidc-store`.
//!
//! Rows and grant index entries live in papaya lock-free maps. Index appends
//! and consume marks are single atomic map updates, so concurrent upserts
//! under one grant never lose a member.
//!
//! Expired rows stay in memory until [`MemoryBackend::purge_expired`] runs;
//! readers filter them out regardless.
//!
//! A backend can be written to a JSON file with [`MemoryBackend::save`] and
//! restored with [`MemoryBackend::load`], so short-lived processes such as
//! the CLI keep their artifacts between runs. Saving is a full rewrite; two
//! processes sharing one file overwrite each other's changes.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use oidc_store::{StoreFactory, SystemClock, TableConfig};
//! use oidc_store_memory::MemoryBackend;
//!
//! let factory = StoreFactory::new(
//!     Arc::new(MemoryBackend::new()),
//!     Arc::new(SystemClock),
//!     TableConfig::with_prefix("oidc_"),
//! )?;
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use oidc_store::{Artifact, ArtifactBackend, StoreError, StoreResult};
use papaya::HashMap as PapayaHashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

fn row_key(table: &str, id: &str) -> String {
    format!("{table}/{id}")
}

/// Serializable copy of every row and grant index entry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Rows keyed by `{table}/{id}`.
    pub rows: BTreeMap<String, Artifact>,
    /// Grant index entries keyed by grant key.
    pub index: BTreeMap<String, Vec<String>>,
}

/// Artifact backend keeping everything in process memory.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    rows: PapayaHashMap<String, Artifact>,
    index: PapayaHashMap<String, Vec<String>>,
}

impl MemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Physically removes every row expired at `now`.
    ///
    /// Returns the number of removed rows. Grant index entries are kept.
    #[instrument(skip(self))]
    pub fn purge_expired(&self, now: i64) -> u64 {
        let purged = AtomicU64::new(0);
        self.rows.pin().retain(|_, artifact| {
            let keep = !artifact.is_expired(now);
            if !keep {
                purged.fetch_add(1, Ordering::Relaxed);
            }
            keep
        });

        let purged = purged.into_inner();
        debug!(purged, "Purged expired rows");
        purged
    }

    /// Copies the current contents.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        let rows = self
            .rows
            .pin()
            .iter()
            .map(|(key, artifact)| (key.clone(), artifact.clone()))
            .collect();
        let index = self
            .index
            .pin()
            .iter()
            .map(|(key, members)| (key.clone(), members.clone()))
            .collect();
        Snapshot { rows, index }
    }

    /// Creates a backend holding the contents of `snapshot`.
    #[must_use]
    pub fn from_snapshot(snapshot: Snapshot) -> Self {
        let backend = Self::new();
        {
            let rows = backend.rows.pin();
            for (key, artifact) in snapshot.rows {
                rows.insert(key, artifact);
            }
        }
        {
            let index = backend.index.pin();
            for (key, members) in snapshot.index {
                index.insert(key, members);
            }
        }
        backend
    }

    /// Restores a backend saved at `path`. A missing file yields an empty
    /// backend.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the file cannot be read, or a serialization
    /// error if it is not a snapshot.
    #[instrument]
    pub fn load(path: &Path) -> StoreResult<Self> {
        let content = match fs::read(path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No snapshot yet, starting empty");
                return Ok(Self::new());
            }
            Err(e) => {
                return Err(StoreError::backend(format!(
                    "cannot read {}: {e}",
                    path.display()
                )));
            }
        };
        let snapshot: Snapshot = serde_json::from_slice(&content)?;
        info!(rows = snapshot.rows.len(), "Loaded snapshot");
        Ok(Self::from_snapshot(snapshot))
    }

    /// Writes the current contents to `path`, creating parent directories.
    ///
    /// The snapshot is written to a sibling temporary file first and renamed
    /// over `path`, so readers never see a half-written file.
    ///
    /// # Errors
    ///
    /// Returns a backend error if the file cannot be written.
    #[instrument(skip(self))]
    pub fn save(&self, path: &Path) -> StoreResult<()> {
        let io_error =
            |e: std::io::Error| StoreError::backend(format!("cannot write {}: {e}", path.display()));

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }
        let snapshot = self.snapshot();
        let content = serde_json::to_vec_pretty(&snapshot)?;

        let mut staging = path.as_os_str().to_owned();
        staging.push(".tmp");
        fs::write(&staging, content).map_err(io_error)?;
        fs::rename(&staging, path).map_err(io_error)?;
        debug!(rows = snapshot.rows.len(), "Saved snapshot");
        Ok(())
    }

    /// Number of stored rows, expired ones included.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.rows.pin().len()
    }

    /// Number of grant index entries.
    #[must_use]
    pub fn index_len(&self) -> usize {
        self.index.pin().len()
    }
}

#[async_trait]
impl ArtifactBackend for MemoryBackend {
    async fn get(&self, table: &str, id: &str) -> StoreResult<Option<Artifact>> {
        let guard = self.rows.pin();
        Ok(guard.get(&row_key(table, id)).cloned())
    }

    async fn put(&self, table: &str, artifact: &Artifact) -> StoreResult<()> {
        let guard = self.rows.pin();
        guard.insert(row_key(table, &artifact.id), artifact.clone());
        Ok(())
    }

    async fn mark_consumed(&self, table: &str, id: &str, consumed_at: i64) -> StoreResult<bool> {
        let guard = self.rows.pin();
        let updated = guard.update(row_key(table, id), |artifact| {
            let mut artifact = artifact.clone();
            artifact.consumed.get_or_insert(consumed_at);
            artifact
        });
        Ok(updated.is_some())
    }

    async fn delete(&self, table: &str, id: &str) -> StoreResult<()> {
        let guard = self.rows.pin();
        guard.remove(&row_key(table, id));
        Ok(())
    }

    async fn index_members(&self, grant_key: &str) -> StoreResult<Vec<String>> {
        let guard = self.index.pin();
        Ok(guard.get(grant_key).cloned().unwrap_or_default())
    }

    async fn replace_index(&self, grant_key: &str, members: Vec<String>) -> StoreResult<()> {
        let guard = self.index.pin();
        guard.insert(grant_key.to_string(), members);
        Ok(())
    }

    async fn append_index_member(&self, grant_key: &str, member: &str) -> StoreResult<()> {
        let guard = self.index.pin();
        guard.update_or_insert_with(
            grant_key.to_string(),
            |members| {
                let mut members = members.clone();
                if !members.iter().any(|existing| existing == member) {
                    members.push(member.to_string());
                }
                members
            },
            || vec![member.to_string()],
        );
        Ok(())
    }

    async fn delete_index(&self, grant_key: &str) -> StoreResult<()> {
        let guard = self.index.pin();
        guard.remove(grant_key);
        Ok(())
    }
}
