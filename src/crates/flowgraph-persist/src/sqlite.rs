//! SQLite snapshot storage
//!
//! Snapshots live in a single table keyed by workflow identifier:
//!
//! ```sql
//! CREATE TABLE workflow_snapshots (
//!     workflow_id TEXT PRIMARY KEY,
//!     data        BLOB NOT NULL,
//!     created_at  INTEGER NOT NULL,
//!     updated_at  INTEGER NOT NULL
//! );
//! ```
//!
//! Saving an existing identifier replaces `data` and bumps `updated_at` while keeping
//! the original `created_at`.

use crate::{
    error::Result,
    serializer::{JsonSerializer, SerializerProtocol},
    snapshot::InterruptSnapshot,
    traits::{validate_workflow_id, SnapshotStore},
};
use async_trait::async_trait;
use chrono::Utc;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use sqlx::Row;
use std::str::FromStr;
use tracing::{debug, info};

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS workflow_snapshots (
    workflow_id TEXT PRIMARY KEY,
    data BLOB NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
)";

/// Snapshot store backed by an SQLite connection pool
#[derive(Debug, Clone)]
pub struct SqliteSnapshotStore<S = JsonSerializer> {
    pool: SqlitePool,
    serializer: S,
}

impl SqliteSnapshotStore<JsonSerializer> {
    /// Connect to `url` (e.g. `sqlite:snapshots.db` or `sqlite::memory:`) and create the table
    pub async fn connect(url: &str) -> Result<Self> {
        Self::connect_with(url, 5).await
    }

    /// Connect with an explicit pool size
    ///
    /// A missing database file is created. In-memory databases are per-connection, so
    /// `sqlite::memory:` should use a pool of one.
    pub async fn connect_with(url: &str, max_connections: u32) -> Result<Self> {
        debug!(url, max_connections, "Connecting to snapshot database");

        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect_with(options)
            .await?;

        info!(url, "Snapshot database connection established");

        let store = Self::from_pool(pool);
        store.init_schema().await?;
        Ok(store)
    }

    /// Wrap an existing pool. Call [`init_schema`](Self::init_schema) before use.
    pub fn from_pool(pool: SqlitePool) -> Self {
        Self::with_serializer(pool, JsonSerializer::new())
    }
}

impl<S: SerializerProtocol> SqliteSnapshotStore<S> {
    /// Wrap an existing pool with a custom serializer
    pub fn with_serializer(pool: SqlitePool, serializer: S) -> Self {
        Self { pool, serializer }
    }

    /// Create the snapshot table if it does not exist
    pub async fn init_schema(&self) -> Result<()> {
        sqlx::query(CREATE_TABLE).execute(&self.pool).await?;
        Ok(())
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// `(created_at, updated_at)` unix timestamps for `workflow_id`
    pub async fn timestamps(&self, workflow_id: &str) -> Result<Option<(i64, i64)>> {
        let row = sqlx::query(
            "SELECT created_at, updated_at FROM workflow_snapshots WHERE workflow_id = ?",
        )
        .bind(workflow_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => Ok(Some((row.try_get("created_at")?, row.try_get("updated_at")?))),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<S: SerializerProtocol> SnapshotStore for SqliteSnapshotStore<S> {
    async fn save(&self, workflow_id: &str, snapshot: &InterruptSnapshot) -> Result<()> {
        validate_workflow_id(workflow_id)?;

        let data = self.serializer.dumps(snapshot)?;
        let now = Utc::now().timestamp();

        sqlx::query(
            "INSERT INTO workflow_snapshots (workflow_id, data, created_at, updated_at)
             VALUES (?, ?, ?, ?)
             ON CONFLICT(workflow_id) DO UPDATE SET
                 data = excluded.data,
                 updated_at = excluded.updated_at",
        )
        .bind(workflow_id)
        .bind(&data)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        debug!(workflow_id, bytes = data.len(), "Saved snapshot");
        Ok(())
    }

    async fn load(&self, workflow_id: &str) -> Result<Option<InterruptSnapshot>> {
        validate_workflow_id(workflow_id)?;

        let row = sqlx::query("SELECT data FROM workflow_snapshots WHERE workflow_id = ?")
            .bind(workflow_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let data: Vec<u8> = row.try_get("data")?;
                Ok(Some(self.serializer.loads(&data)?))
            }
            None => Ok(None),
        }
    }

    async fn delete(&self, workflow_id: &str) -> Result<()> {
        validate_workflow_id(workflow_id)?;

        sqlx::query("DELETE FROM workflow_snapshots WHERE workflow_id = ?")
            .bind(workflow_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn exists(&self, workflow_id: &str) -> Result<bool> {
        validate_workflow_id(workflow_id)?;

        let row = sqlx::query("SELECT 1 FROM workflow_snapshots WHERE workflow_id = ?")
            .bind(workflow_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.is_some())
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT workflow_id FROM workflow_snapshots ORDER BY workflow_id")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| row.try_get::<String, _>("workflow_id").map_err(Into::into))
            .collect()
    }
}
