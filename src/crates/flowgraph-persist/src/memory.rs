//! In-memory snapshot storage for development and testing
//!
//! [`InMemorySnapshotStore`] keeps snapshots in an `Arc<RwLock<HashMap>>`. Cloning
//! the store shares the underlying map, so a test can hand one clone to the engine
//! and inspect the other.
//!
//! Data is lost when the process exits. Use
//! [`FileSnapshotStore`](crate::FileSnapshotStore) or
//! [`SqliteSnapshotStore`](crate::SqliteSnapshotStore) when a suspended run must
//! survive a restart.

use crate::{
    error::Result,
    snapshot::InterruptSnapshot,
    traits::{validate_workflow_id, SnapshotStore},
};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Thread-safe in-memory snapshot storage
type SnapshotStorage = Arc<RwLock<HashMap<String, InterruptSnapshot>>>;

/// In-memory snapshot store
///
/// # Example
///
/// ```rust
/// use flowgraph_persist::{InMemorySnapshotStore, InterruptSnapshot, SnapshotStore};
/// use serde_json::Value;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = InMemorySnapshotStore::new();
///     let snapshot = InterruptSnapshot::new("wf-1", "review", Value::Null);
///
///     store.save("wf-1", &snapshot).await?;
///     assert!(store.exists("wf-1").await?);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct InMemorySnapshotStore {
    storage: SnapshotStorage,
}

impl InMemorySnapshotStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self {
            storage: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Number of stored snapshots
    pub async fn len(&self) -> usize {
        self.storage.read().await.len()
    }

    /// Whether the store holds no snapshots
    pub async fn is_empty(&self) -> bool {
        self.storage.read().await.is_empty()
    }

    /// Clear all snapshots (useful for testing)
    pub async fn clear(&self) {
        self.storage.write().await.clear();
    }
}

impl Default for InMemorySnapshotStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn save(&self, workflow_id: &str, snapshot: &InterruptSnapshot) -> Result<()> {
        validate_workflow_id(workflow_id)?;
        self.storage
            .write()
            .await
            .insert(workflow_id.to_string(), snapshot.clone());
        Ok(())
    }

    async fn load(&self, workflow_id: &str) -> Result<Option<InterruptSnapshot>> {
        Ok(self.storage.read().await.get(workflow_id).cloned())
    }

    async fn delete(&self, workflow_id: &str) -> Result<()> {
        self.storage.write().await.remove(workflow_id);
        Ok(())
    }

    async fn exists(&self, workflow_id: &str) -> Result<bool> {
        Ok(self.storage.read().await.contains_key(workflow_id))
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let mut ids: Vec<String> = self.storage.read().await.keys().cloned().collect();
        ids.sort();
        Ok(ids)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistError;
    use serde_json::json;

    #[tokio::test]
    async fn test_save_and_load_snapshot() {
        let store = InMemorySnapshotStore::new();
        let snapshot = InterruptSnapshot::new("wf-1", "review", json!({"type": "Start"}));

        store.save("wf-1", &snapshot).await.unwrap();

        let loaded = store.load("wf-1").await.unwrap();
        assert_eq!(loaded, Some(snapshot));
    }

    #[tokio::test]
    async fn test_load_unknown_is_none() {
        let store = InMemorySnapshotStore::new();
        assert!(store.load("missing").await.unwrap().is_none());
        assert!(!store.exists("missing").await.unwrap());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let store = InMemorySnapshotStore::new();
        let first = InterruptSnapshot::new("wf-1", "a", json!(1));
        let second = InterruptSnapshot::new("wf-1", "b", json!(2));

        store.save("wf-1", &first).await.unwrap();
        store.save("wf-1", &second).await.unwrap();

        assert_eq!(store.len().await, 1);
        assert_eq!(store.load("wf-1").await.unwrap().unwrap().node, "b");
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemorySnapshotStore::new();
        let snapshot = InterruptSnapshot::new("wf-1", "review", json!(null));

        store.save("wf-1", &snapshot).await.unwrap();
        store.delete("wf-1").await.unwrap();
        assert!(store.is_empty().await);

        // deleting again is fine
        store.delete("wf-1").await.unwrap();
    }

    #[tokio::test]
    async fn test_list_ids_sorted_and_shared_between_clones() {
        let store = InMemorySnapshotStore::new();
        let view = store.clone();

        for id in ["wf-c", "wf-a", "wf-b"] {
            let snapshot = InterruptSnapshot::new(id, "node", json!(null));
            store.save(id, &snapshot).await.unwrap();
        }

        assert_eq!(view.list_ids().await.unwrap(), vec!["wf-a", "wf-b", "wf-c"]);

        view.clear().await;
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn test_empty_id_rejected() {
        let store = InMemorySnapshotStore::new();
        let snapshot = InterruptSnapshot::new("", "node", json!(null));
        let result = store.save("", &snapshot).await;
        assert!(matches!(result, Err(PersistError::Invalid(_))));
    }
}
