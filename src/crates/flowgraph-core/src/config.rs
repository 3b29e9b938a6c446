//! Engine configuration
//!
//! Configuration is TOML. Every section and every field has a default, so an empty
//! file is a valid configuration:
//!
//! ```toml
//! [engine]
//! max_iterations = 10000
//! delete_snapshot_on_completion = true
//!
//! [stream]
//! capacity = 100
//! backpressure = "block"     # or "drop_newest"
//! send_timeout_ms = 250
//!
//! [persistence]
//! backend = "sqlite"
//! url = "sqlite:snapshots.db"
//!
//! [logging]
//! level = "info"
//! format = "compact"         # or "pretty"
//! colored = true
//! timestamps = true
//! ```

use crate::error::{Result, WorkflowError};
use crate::stream::BackpressurePolicy;
use flowgraph_persist::StoreConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tokio::fs;
use tracing::debug;

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Execution loop settings
    #[serde(default)]
    pub engine: ExecutionConfig,

    /// Event stream settings
    #[serde(default)]
    pub stream: StreamConfig,

    /// Snapshot backend
    #[serde(default)]
    pub persistence: StoreConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EngineConfig {
    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text)
            .map_err(|e| WorkflowError::configuration(format!("Invalid TOML: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).await?;
        debug!(path = %path.display(), "Loaded engine configuration");
        Self::from_toml_str(&text).map_err(|e| match e {
            WorkflowError::Configuration(msg) => {
                WorkflowError::configuration(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    /// Serialize back to TOML
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| WorkflowError::configuration(format!("Failed to serialize: {}", e)))
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if self.engine.max_iterations == Some(0) {
            return Err(WorkflowError::configuration(
                "engine.max_iterations must be greater than zero",
            ));
        }
        if self.stream.capacity == 0 {
            return Err(WorkflowError::configuration(
                "stream.capacity must be greater than zero",
            ));
        }
        if !matches!(self.logging.format.as_str(), "compact" | "pretty") {
            return Err(WorkflowError::configuration(format!(
                "logging.format must be \"compact\" or \"pretty\", got \"{}\"",
                self.logging.format
            )));
        }
        self.persistence
            .validate()
            .map_err(|e| WorkflowError::configuration(format!("persistence: {}", e)))?;
        Ok(())
    }
}

/// Execution loop settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutionConfig {
    /// Upper bound on node dispatches per run; unbounded when absent
    pub max_iterations: Option<usize>,

    /// Remove the snapshot once a resumed run completes
    pub delete_snapshot_on_completion: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_iterations: None,
            delete_snapshot_on_completion: true,
        }
    }
}

/// How the stream sink reacts to a full channel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackpressureMode {
    #[default]
    Block,
    DropNewest,
}

/// Event stream settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Channel capacity; also the number of events replayed to a late reader
    pub capacity: usize,

    /// Full-channel behaviour
    pub backpressure: BackpressureMode,

    /// With `block`, give up on an event after this many milliseconds
    pub send_timeout_ms: Option<u64>,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            backpressure: BackpressureMode::Block,
            send_timeout_ms: None,
        }
    }
}

impl StreamConfig {
    /// Sink policy described by this configuration
    pub fn policy(&self) -> BackpressurePolicy {
        match self.backpressure {
            BackpressureMode::Block => BackpressurePolicy::Block {
                timeout: self.send_timeout_ms.map(Duration::from_millis),
            },
            BackpressureMode::DropNewest => BackpressurePolicy::DropNewest,
        }
    }
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error", or a full filter directive
    pub level: String,

    /// Log format: "compact", "pretty"
    pub format: String,

    /// Enable colored output
    pub colored: bool,

    /// Show timestamps
    pub timestamps: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
            colored: true,
            timestamps: true,
        }
    }
}
