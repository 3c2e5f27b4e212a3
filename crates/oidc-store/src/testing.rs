//! In-crate test backends.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::artifact::Artifact;
use crate::backend::ArtifactBackend;
use crate::error::{StoreError, StoreResult};

/// Mutex-guarded map backend with failure injection.
#[derive(Default)]
pub(crate) struct MapBackend {
    rows: Mutex<HashMap<(String, String), Artifact>>,
    index: Mutex<HashMap<String, Vec<String>>>,
    failing_deletes: Mutex<HashSet<(String, String)>>,
    fail_puts: AtomicBool,
}

impl MapBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub(crate) fn fail_delete(&self, table: &str, id: &str) {
        self.failing_deletes
            .lock()
            .unwrap()
            .insert((table.to_string(), id.to_string()));
    }

    pub(crate) fn row_count(&self) -> usize {
        self.rows.lock().unwrap().len()
    }
}

#[async_trait]
impl ArtifactBackend for MapBackend {
    async fn get(&self, table: &str, id: &str) -> StoreResult<Option<Artifact>> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.get(&(table.to_string(), id.to_string())).cloned())
    }

    async fn put(&self, table: &str, artifact: &Artifact) -> StoreResult<()> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(StoreError::backend("injected put failure"));
        }
        self.rows
            .lock()
            .unwrap()
            .insert((table.to_string(), artifact.id.clone()), artifact.clone());
        Ok(())
    }

    async fn mark_consumed(&self, table: &str, id: &str, consumed_at: i64) -> StoreResult<bool> {
        let mut rows = self.rows.lock().unwrap();
        match rows.get_mut(&(table.to_string(), id.to_string())) {
            Some(artifact) => {
                artifact.consumed.get_or_insert(consumed_at);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, table: &str, id: &str) -> StoreResult<()> {
        let key = (table.to_string(), id.to_string());
        if self.failing_deletes.lock().unwrap().contains(&key) {
            return Err(StoreError::backend(format!("injected delete failure: {id}")));
        }
        self.rows.lock().unwrap().remove(&key);
        Ok(())
    }

    async fn index_members(&self, grant_key: &str) -> StoreResult<Vec<String>> {
        let index = self.index.lock().unwrap();
        Ok(index.get(grant_key).cloned().unwrap_or_default())
    }

    async fn replace_index(&self, grant_key: &str, members: Vec<String>) -> StoreResult<()> {
        self.index
            .lock()
            .unwrap()
            .insert(grant_key.to_string(), members);
        Ok(())
    }

    async fn append_index_member(&self, grant_key: &str, member: &str) -> StoreResult<()> {
        let mut index = self.index.lock().unwrap();
        let members = index.entry(grant_key.to_string()).or_default();
        if !members.iter().any(|existing| existing == member) {
            members.push(member.to_string());
        }
        Ok(())
    }

    async fn delete_index(&self, grant_key: &str) -> StoreResult<()> {
        self.index.lock().unwrap().remove(grant_key);
        Ok(())
    }
}

/// Backend that keeps the trait's read-modify-write append and suspends
/// between reading an index entry and returning it.
#[derive(Default)]
pub(crate) struct NaiveBackend {
    inner: MapBackend,
}

impl NaiveBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ArtifactBackend for NaiveBackend {
    async fn get(&self, table: &str, id: &str) -> StoreResult<Option<Artifact>> {
        self.inner.get(table, id).await
    }

    async fn put(&self, table: &str, artifact: &Artifact) -> StoreResult<()> {
        self.inner.put(table, artifact).await
    }

    async fn mark_consumed(&self, table: &str, id: &str, consumed_at: i64) -> StoreResult<bool> {
        self.inner.mark_consumed(table, id, consumed_at).await
    }

    async fn delete(&self, table: &str, id: &str) -> StoreResult<()> {
        self.inner.delete(table, id).await
    }

    async fn index_members(&self, grant_key: &str) -> StoreResult<Vec<String>> {
        let members = self.inner.index_members(grant_key).await?;
        tokio::task::yield_now().await;
        Ok(members)
    }

    async fn replace_index(&self, grant_key: &str, members: Vec<String>) -> StoreResult<()> {
        self.inner.replace_index(grant_key, members).await
    }

    async fn delete_index(&self, grant_key: &str) -> StoreResult<()> {
        self.inner.delete_index(grant_key).await
    }
}
