//! Serialization protocol for snapshots
//!
//! Backends that store opaque blobs (the file and SQLite stores) go through a
//! [`SerializerProtocol`] so the on-disk encoding can be swapped without touching
//! the backend.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Protocol for serializing and deserializing snapshot data
///
/// Snapshots carry arbitrary `serde_json::Value` payloads, so implementations must
/// use a self-describing format.
pub trait SerializerProtocol: Send + Sync {
    /// Serialize a value to bytes
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>>;

    /// Deserialize a value from bytes
    fn loads<T: for<'de> Deserialize<'de>>(&self, data: &[u8]) -> Result<T>;
}

/// JSON-based serializer (default)
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSerializer {
    pretty: bool,
}

impl JsonSerializer {
    /// Compact JSON output
    pub fn new() -> Self {
        Self { pretty: false }
    }

    /// Indented JSON output, easier to inspect in snapshot files
    pub fn pretty() -> Self {
        Self { pretty: true }
    }

    /// Whether output is indented
    pub fn is_pretty(&self) -> bool {
        self.pretty
    }
}

impl SerializerProtocol for JsonSerializer {
    fn dumps<T: Serialize>(&self, value: &T) -> Result<Vec<u8>> {
        if self.pretty {
            Ok(serde_json::to_vec_pretty(value)?)
        } else {
            Ok(serde_json::to_vec(value)?)
        }
    }

    fn loads<T: for<'de> Deserialize<'de>>(&self, data: &[u8]) -> Result<T> {
        Ok(serde_json::from_slice(data)?)
    }
}
