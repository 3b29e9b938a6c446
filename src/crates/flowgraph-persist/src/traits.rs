//! Extensible snapshot storage trait for custom backend implementations
//!
//! This module defines **[`SnapshotStore`]**, the persistence port the execution
//! engine talks to when a run suspends or resumes. The engine never knows which
//! backend it is using; it only calls `save` when a node interrupts, `load` when the
//! caller wakes a workflow up, and `delete` once a resumed run completes.
//!
//! # Contract
//!
//! - One snapshot per workflow identifier. `save` overwrites.
//! - `load` of an unknown identifier is `Ok(None)`, never an error. The engine turns
//!   that into its own "snapshot not found" failure.
//! - `delete` of an unknown identifier succeeds.
//! - No retries. A backend that wants retry semantics implements them itself.
//! - At most one in-flight execution per identifier is assumed. Nothing here locks.
//!
//! # Backends
//!
//! | Backend | Type | Notes |
//! |---------|------|-------|
//! | In-process map | [`InMemorySnapshotStore`](crate::InMemorySnapshotStore) | Tests, short-lived processes |
//! | File per id | [`FileSnapshotStore`](crate::FileSnapshotStore) | Single writer, one JSON blob per workflow |
//! | SQLite | [`SqliteSnapshotStore`](crate::SqliteSnapshotStore) | `workflow_snapshots` table, feature `sqlite` |
//!
//! # Implementing a Backend
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use flowgraph_persist::{InterruptSnapshot, Result, SnapshotStore};
//!
//! struct RedisSnapshotStore {
//!     client: redis::Client,
//! }
//!
//! #[async_trait]
//! impl SnapshotStore for RedisSnapshotStore {
//!     async fn save(&self, workflow_id: &str, snapshot: &InterruptSnapshot) -> Result<()> {
//!         let mut conn = self.client.get_async_connection().await?;
//!         let value = serde_json::to_vec(snapshot)?;
//!         conn.set(format!("snapshot:{workflow_id}"), value).await?;
//!         Ok(())
//!     }
//!
//!     // load, delete, list_ids ...
//! }
//! ```

use crate::error::Result;
use crate::snapshot::InterruptSnapshot;
use async_trait::async_trait;

/// Persistence port for suspended execution snapshots
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Persist `snapshot` under `workflow_id`, replacing any previous one
    async fn save(&self, workflow_id: &str, snapshot: &InterruptSnapshot) -> Result<()>;

    /// Fetch the snapshot stored under `workflow_id`, if any
    async fn load(&self, workflow_id: &str) -> Result<Option<InterruptSnapshot>>;

    /// Remove the snapshot stored under `workflow_id`
    ///
    /// Deleting an identifier that has no snapshot is not an error.
    async fn delete(&self, workflow_id: &str) -> Result<()>;

    /// Whether a snapshot exists for `workflow_id`
    async fn exists(&self, workflow_id: &str) -> Result<bool> {
        Ok(self.load(workflow_id).await?.is_some())
    }

    /// Identifiers of every stored snapshot, sorted
    async fn list_ids(&self) -> Result<Vec<String>>;
}

/// Reject identifiers no backend can key by
pub(crate) fn validate_workflow_id(workflow_id: &str) -> Result<()> {
    if workflow_id.is_empty() {
        return Err(crate::error::PersistError::invalid(
            "workflow_id must not be empty",
        ));
    }
    Ok(())
}
