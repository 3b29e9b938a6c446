//! File-per-workflow snapshot storage
//!
//! Each workflow identifier maps to exactly one file in a caller-chosen directory.
//! The filename is derived from the identifier so that any identifier, including
//! ones containing path separators, stays inside the directory:
//!
//! ```text
//! "order-42"       -> order-42.json
//! "team/alice#1"   -> team_2falice_231.json
//! ```
//!
//! ASCII letters, digits, `-` and `.` are kept; every other byte becomes `_` followed by
//! two lowercase hex digits. The mapping is injective, so [`SnapshotStore::list_ids`]
//! can recover the identifiers from the directory listing.
//!
//! Stems longer than 200 bytes would exceed common filename limits. Those keep a
//! 135-byte prefix followed by `~` and the SHA-256 of the full identifier. `~` never
//! appears in an escaped stem, and `list_ids` reads the identifier of such a file
//! back from the snapshot it holds.
//!
//! Writes go to a `.tmp` sibling first and are renamed into place, so a reader never
//! observes a half-written snapshot. The store assumes a single writer per directory.

use crate::{
    error::{PersistError, Result},
    serializer::{JsonSerializer, SerializerProtocol},
    snapshot::InterruptSnapshot,
    traits::{validate_workflow_id, SnapshotStore},
};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

const SNAPSHOT_EXTENSION: &str = ".json";
const TEMP_EXTENSION: &str = ".tmp";
const MAX_STEM_LEN: usize = 200;
const HASH_MARKER: char = '~';
// prefix + marker + 64 hex digits fits in MAX_STEM_LEN
const HASHED_PREFIX_LEN: usize = MAX_STEM_LEN - 65;

/// Snapshot store writing one serialized blob per workflow identifier
#[derive(Debug, Clone)]
pub struct FileSnapshotStore<S = JsonSerializer> {
    directory: PathBuf,
    serializer: S,
}

impl FileSnapshotStore<JsonSerializer> {
    /// Open (and create if needed) a store rooted at `directory`
    pub async fn open(directory: impl Into<PathBuf>) -> Result<Self> {
        Self::with_serializer(directory, JsonSerializer::new()).await
    }
}

impl<S: SerializerProtocol> FileSnapshotStore<S> {
    /// Open a store with a custom serializer
    pub async fn with_serializer(directory: impl Into<PathBuf>, serializer: S) -> Result<Self> {
        let directory = directory.into();
        fs::create_dir_all(&directory).await?;
        debug!(directory = %directory.display(), "Opened file snapshot store");
        Ok(Self {
            directory,
            serializer,
        })
    }

    /// Directory the snapshots live in
    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Full path of the snapshot file for `workflow_id`
    pub fn path_for(&self, workflow_id: &str) -> PathBuf {
        self.directory
            .join(format!("{}{}", encode_file_stem(workflow_id), SNAPSHOT_EXTENSION))
    }

    /// Identifier stored in a file whose name carries a hash
    async fn read_hashed_id(&self, path: &Path, stem: &str) -> Result<String> {
        let snapshot: InterruptSnapshot = self.serializer.loads(&fs::read(path).await?)?;
        if encode_file_stem(&snapshot.workflow_id) != stem {
            return Err(PersistError::invalid(format!(
                "'{}' holds snapshot of '{}'",
                stem, snapshot.workflow_id
            )));
        }
        Ok(snapshot.workflow_id)
    }
}

#[async_trait]
impl<S: SerializerProtocol> SnapshotStore for FileSnapshotStore<S> {
    async fn save(&self, workflow_id: &str, snapshot: &InterruptSnapshot) -> Result<()> {
        validate_workflow_id(workflow_id)?;

        let bytes = self.serializer.dumps(snapshot)?;
        let path = self.path_for(workflow_id);
        let temp = path.with_extension(format!("json{}", TEMP_EXTENSION));

        fs::write(&temp, &bytes).await?;
        fs::rename(&temp, &path).await?;

        debug!(workflow_id, path = %path.display(), bytes = bytes.len(), "Saved snapshot");
        Ok(())
    }

    async fn load(&self, workflow_id: &str) -> Result<Option<InterruptSnapshot>> {
        validate_workflow_id(workflow_id)?;

        match fs::read(self.path_for(workflow_id)).await {
            Ok(bytes) => Ok(Some(self.serializer.loads(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete(&self, workflow_id: &str) -> Result<()> {
        validate_workflow_id(workflow_id)?;

        match fs::remove_file(self.path_for(workflow_id)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn exists(&self, workflow_id: &str) -> Result<bool> {
        validate_workflow_id(workflow_id)?;
        Ok(fs::try_exists(self.path_for(workflow_id)).await?)
    }

    async fn list_ids(&self) -> Result<Vec<String>> {
        let mut ids = Vec::new();
        let mut entries = fs::read_dir(&self.directory).await?;

        while let Some(entry) = entries.next_entry().await? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(stem) = name.strip_suffix(SNAPSHOT_EXTENSION) else { continue };
            let decoded = if stem.contains(HASH_MARKER) {
                self.read_hashed_id(&entry.path(), stem).await
            } else {
                decode_file_stem(stem)
            };
            match decoded {
                Ok(id) => ids.push(id),
                Err(e) => debug!(file = name, error = %e, "Skipping foreign file"),
            }
        }

        ids.sort();
        Ok(ids)
    }
}

/// Map a workflow identifier to a filesystem-safe file stem
pub(crate) fn encode_file_stem(workflow_id: &str) -> String {
    let mut stem = String::with_capacity(workflow_id.len());
    for byte in workflow_id.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'-' || byte == b'.' {
            stem.push(byte as char);
        } else {
            stem.push_str(&format!("_{:02x}", byte));
        }
    }

    if stem.len() > MAX_STEM_LEN {
        let digest = Sha256::digest(workflow_id.as_bytes());
        // escaped stems are pure ASCII, so any byte offset is a char boundary
        stem.truncate(HASHED_PREFIX_LEN);
        stem.push(HASH_MARKER);
        stem.push_str(&format!("{:x}", digest));
    }
    stem
}

/// Inverse of [`encode_file_stem`]
pub(crate) fn decode_file_stem(stem: &str) -> Result<String> {
    let bytes = stem.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'_' {
            let hex = stem
                .get(i + 1..i + 3)
                .ok_or_else(|| PersistError::invalid(format!("truncated escape in '{}'", stem)))?;
            let byte = u8::from_str_radix(hex, 16)
                .map_err(|_| PersistError::invalid(format!("bad escape in '{}'", stem)))?;
            out.push(byte);
            i += 3;
        } else {
            out.push(bytes[i]);
            i += 1;
        }
    }

    String::from_utf8(out).map_err(|_| PersistError::invalid(format!("non UTF-8 id in '{}'", stem)))
}
