//! # flowgraph-persist - Snapshot Persistence for Suspended Workflows
//!
//! When a node inside a flowgraph workflow asks for human input, the engine
//! serializes the whole execution into an [`InterruptSnapshot`] and hands it to a
//! [`SnapshotStore`]. A later `wakeup` loads the snapshot back, feeds the caller's
//! answer to the interrupted node and carries on where the run stopped.
//!
//! ```text
//! ┌──────────────┐  save(id, snapshot)   ┌──────────────────────┐
//! │   Workflow   │ ────────────────────► │    SnapshotStore     │
//! │    engine    │ ◄──────────────────── │  memory / file / sql │
//! └──────────────┘  load(id) / delete    └──────────────────────┘
//! ```
//!
//! This crate knows nothing about graphs, nodes or event types. Events and state are
//! carried as `serde_json::Value`, so any backend works with any workflow.
//!
//! ## Backends
//!
//! - [`InMemorySnapshotStore`] - shared `HashMap`, lost on exit
//! - [`FileSnapshotStore`] - one JSON file per workflow identifier
//! - [`SqliteSnapshotStore`] - `workflow_snapshots` table via `sqlx` (feature `sqlite`, on by default)
//!
//! [`StoreConfig`] picks one from configuration:
//!
//! ```rust,no_run
//! use flowgraph_persist::StoreConfig;
//! use std::path::PathBuf;
//!
//! # async fn example() -> flowgraph_persist::Result<()> {
//! let config = StoreConfig::File {
//!     directory: PathBuf::from("./snapshots"),
//!     pretty: false,
//! };
//! let store = config.open().await?;
//! println!("{:?}", store.list_ids().await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Backends
//!
//! Implement [`SnapshotStore`] for your type. See the [`traits`] module for the
//! contract every backend must honour.

pub mod config;
pub mod error;
pub mod file;
pub mod memory;
pub mod serializer;
pub mod snapshot;
#[cfg(feature = "sqlite")]
pub mod sqlite;
pub mod traits;

pub use config::StoreConfig;
pub use error::{PersistError, Result};
pub use file::FileSnapshotStore;
pub use memory::InMemorySnapshotStore;
pub use serializer::{JsonSerializer, SerializerProtocol};
pub use snapshot::InterruptSnapshot;
#[cfg(feature = "sqlite")]
pub use sqlite::SqliteSnapshotStore;
pub use traits::SnapshotStore;
