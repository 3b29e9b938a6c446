//! Snapshot of a suspended workflow execution
//!
//! An [`InterruptSnapshot`] is everything the engine needs to re-enter a run at the
//! node that asked to pause: the shared state, the event that node was processing,
//! the checkpointed sub-results it recorded so far, the feedback it already received
//! and the events still waiting in the queue behind it.
//!
//! Events and state are stored as `serde_json::Value` so this crate stays
//! independent of the caller's event enumeration; the engine converts on the way in
//! and out.
//!
//! ```text
//! InterruptSnapshot
//! ├── workflow_id     "order-42"
//! ├── node            "review"
//! ├── event           {"type": "Custom", "data": {...}}
//! ├── state           {"user": "ada", "draft": "..."}
//! ├── checkpoints     {"fetch_profile": {...}}
//! ├── resume_values   [true]            feedback already supplied
//! ├── payload         {"question": ...} what the node surfaced
//! ├── pending         [ ... ]           queued events behind the node
//! └── dispatched      3
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Serialized execution state of one suspended run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptSnapshot {
    /// Snapshot format version
    pub version: u32,

    /// Workflow identifier the snapshot is keyed by
    pub workflow_id: String,

    /// Name of the node that was interrupted
    pub node: String,

    /// Event the interrupted node was processing
    pub event: Value,

    /// Shared workflow state at the moment of interruption
    pub state: HashMap<String, Value>,

    /// Checkpointed sub-results of the interrupted invocation, by label
    #[serde(default)]
    pub checkpoints: HashMap<String, Value>,

    /// Feedback values already supplied to this invocation, oldest first
    #[serde(default)]
    pub resume_values: Vec<Value>,

    /// Payload the node surfaced when it interrupted
    #[serde(default)]
    pub payload: Value,

    /// Events queued behind the interrupted one, in dispatch order
    #[serde(default)]
    pub pending: Vec<Value>,

    /// Number of events dispatched to nodes before suspension
    #[serde(default)]
    pub dispatched: usize,

    /// When this snapshot was taken
    pub created_at: DateTime<Utc>,
}

impl InterruptSnapshot {
    /// Current snapshot format version
    pub const CURRENT_VERSION: u32 = 1;

    /// Create a snapshot for `node` processing `event`
    pub fn new(workflow_id: impl Into<String>, node: impl Into<String>, event: Value) -> Self {
        Self {
            version: Self::CURRENT_VERSION,
            workflow_id: workflow_id.into(),
            node: node.into(),
            event,
            state: HashMap::new(),
            checkpoints: HashMap::new(),
            resume_values: Vec::new(),
            payload: Value::Null,
            pending: Vec::new(),
            dispatched: 0,
            created_at: Utc::now(),
        }
    }

    /// Set the workflow state
    pub fn with_state(mut self, state: HashMap<String, Value>) -> Self {
        self.state = state;
        self
    }

    /// Set the checkpoint entries
    pub fn with_checkpoints(mut self, checkpoints: HashMap<String, Value>) -> Self {
        self.checkpoints = checkpoints;
        self
    }

    /// Set the feedback already supplied
    pub fn with_resume_values(mut self, resume_values: Vec<Value>) -> Self {
        self.resume_values = resume_values;
        self
    }

    /// Set the interrupt payload
    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }

    /// Set the queued events
    pub fn with_pending(mut self, pending: Vec<Value>) -> Self {
        self.pending = pending;
        self
    }

    /// Set the dispatch counter
    pub fn with_dispatched(mut self, dispatched: usize) -> Self {
        self.dispatched = dispatched;
        self
    }

    /// Whether this snapshot was written by a compatible format version
    pub fn is_supported(&self) -> bool {
        self.version <= Self::CURRENT_VERSION
    }
}
