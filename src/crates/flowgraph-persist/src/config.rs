//! Backend selection from configuration
//!
//! ```toml
//! [persistence]
//! backend = "file"
//! directory = "/var/lib/flowgraph/snapshots"
//! pretty = true
//! ```

use crate::{
    error::{PersistError, Result},
    file::FileSnapshotStore,
    memory::InMemorySnapshotStore,
    serializer::JsonSerializer,
    traits::SnapshotStore,
};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

fn default_max_connections() -> u32 {
    5
}

/// Which snapshot backend to open, and where
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "backend", rename_all = "snake_case")]
pub enum StoreConfig {
    /// Process-local map
    #[default]
    Memory,

    /// One file per workflow in `directory`
    File {
        directory: PathBuf,
        #[serde(default)]
        pretty: bool,
    },

    /// SQLite database at `url`
    Sqlite {
        url: String,
        #[serde(default = "default_max_connections")]
        max_connections: u32,
    },
}

impl StoreConfig {
    /// Short backend name, as written in configuration
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File { .. } => "file",
            Self::Sqlite { .. } => "sqlite",
        }
    }

    /// Open the configured backend
    pub async fn open(&self) -> Result<Arc<dyn SnapshotStore>> {
        match self {
            Self::Memory => Ok(Arc::new(InMemorySnapshotStore::new())),
            Self::File { directory, pretty } => {
                let serializer = if *pretty {
                    JsonSerializer::pretty()
                } else {
                    JsonSerializer::new()
                };
                let store = FileSnapshotStore::with_serializer(directory.clone(), serializer).await?;
                Ok(Arc::new(store))
            }
            #[cfg(feature = "sqlite")]
            Self::Sqlite {
                url,
                max_connections,
            } => {
                let store =
                    crate::sqlite::SqliteSnapshotStore::connect_with(url, *max_connections).await?;
                Ok(Arc::new(store))
            }
            #[cfg(not(feature = "sqlite"))]
            Self::Sqlite { .. } => Err(PersistError::storage(
                "sqlite backend requested but the `sqlite` feature is disabled",
            )),
        }
    }

    /// Check the configuration without opening anything
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Memory => Ok(()),
            Self::File { directory, .. } if directory.as_os_str().is_empty() => Err(
                PersistError::invalid("file backend requires a non-empty directory"),
            ),
            Self::File { .. } => Ok(()),
            Self::Sqlite { url, .. } if url.is_empty() => {
                Err(PersistError::invalid("sqlite backend requires a url"))
            }
            Self::Sqlite {
                max_connections: 0, ..
            } => Err(PersistError::invalid("max_connections must be at least 1")),
            Self::Sqlite { .. } => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::InterruptSnapshot;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct Wrapper {
        persistence: StoreConfig,
    }

    #[test]
    fn test_parse_backends_from_toml() {
        let memory: Wrapper = toml::from_str("[persistence]\nbackend = \"memory\"\n").unwrap();
        assert_eq!(memory.persistence, StoreConfig::Memory);

        let file: Wrapper =
            toml::from_str("[persistence]\nbackend = \"file\"\ndirectory = \"/tmp/snaps\"\n")
                .unwrap();
        assert_eq!(
            file.persistence,
            StoreConfig::File {
                directory: PathBuf::from("/tmp/snaps"),
                pretty: false
            }
        );

        let sqlite: Wrapper =
            toml::from_str("[persistence]\nbackend = \"sqlite\"\nurl = \"sqlite::memory:\"\n")
                .unwrap();
        assert_eq!(sqlite.persistence.backend_name(), "sqlite");
        assert!(matches!(
            sqlite.persistence,
            StoreConfig::Sqlite {
                max_connections: 5,
                ..
            }
        ));
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let result: std::result::Result<Wrapper, _> =
            toml::from_str("[persistence]\nbackend = \"redis\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_validate() {
        assert!(StoreConfig::Memory.validate().is_ok());
        assert!(StoreConfig::File {
            directory: PathBuf::new(),
            pretty: false
        }
        .validate()
        .is_err());
        assert!(StoreConfig::Sqlite {
            url: "sqlite::memory:".to_string(),
            max_connections: 0
        }
        .validate()
        .is_err());
    }

    #[tokio::test]
    async fn test_open_file_backend() {
        let dir = tempfile::tempdir().unwrap();
        let config = StoreConfig::File {
            directory: dir.path().join("nested"),
            pretty: true,
        };

        let store = config.open().await.unwrap();
        store
            .save("wf", &InterruptSnapshot::new("wf", "n", json!(null)))
            .await
            .unwrap();

        assert!(dir.path().join("nested").join("wf.json").exists());
    }

    #[tokio::test]
    async fn test_open_memory_backend() {
        let store = StoreConfig::default().open().await.unwrap();
        assert!(store.list_ids().await.unwrap().is_empty());
    }
}
