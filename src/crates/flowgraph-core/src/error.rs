//! Error types for graph construction and workflow execution
//!
//! Every failure a workflow can hit is a variant of [`WorkflowError`]. Errors are
//! grouped by *when* they can happen, which tells the caller what to fix:
//!
//! ```text
//! WorkflowError
//! ├── construction (GraphBuilder::build)
//! │   ├── DuplicateNode
//! │   ├── ReservedEventType
//! │   ├── NoStartConsumer / MultipleStartConsumers
//! │   ├── DuplicateConsumer
//! │   └── UnreachableProducedType
//! ├── routing (during a run)
//! │   ├── UndeclaredEvent
//! │   └── NoConsumer
//! ├── DeadEnd                 queue drained without Stop
//! ├── MaxIterationsExceeded   configured dispatch cap hit
//! ├── SnapshotNotFound / SnapshotMismatch   wakeup problems
//! ├── NodeExecution           a node returned an error
//! └── Persistence / Serialization / Configuration / Io / Join
//! ```
//!
//! Suspension is **not** an error. A node that interrupts makes `start` or `wakeup`
//! return [`RunOutcome::Suspended`](crate::RunOutcome::Suspended).
//!
//! # Matching Errors
//!
//! ```rust
//! use flowgraph_core::WorkflowError;
//!
//! fn describe(err: &WorkflowError) -> String {
//!     match err {
//!         WorkflowError::NodeExecution { node, source } => {
//!             format!("node {node} failed: {source}")
//!         }
//!         WorkflowError::SnapshotNotFound { workflow_id } => {
//!             format!("nothing to resume for {workflow_id}")
//!         }
//!         e if e.is_construction_error() => format!("fix the graph: {e}"),
//!         e => format!("run failed: {e}"),
//!     }
//! }
//! ```

use flowgraph_persist::PersistError;
use thiserror::Error;

/// Error type node routines and checkpoint closures return
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Convenience result type using [`WorkflowError`]
pub type Result<T> = std::result::Result<T, WorkflowError>;

/// All errors raised while building or running a workflow
#[derive(Error, Debug)]
pub enum WorkflowError {
    /// Two registered nodes share a name
    #[error("Node '{node}' is registered more than once")]
    DuplicateNode {
        /// The repeated name
        node: String,
    },

    /// Two nodes claim the same consumed event type
    ///
    /// `first` and `second` are in sorted order, so the error does not depend on
    /// registration order.
    #[error("Event type '{event_type}' is consumed by both '{first}' and '{second}'")]
    DuplicateConsumer {
        /// Contested event type
        event_type: String,
        /// Lexicographically smaller node name
        first: String,
        /// Lexicographically larger node name
        second: String,
    },

    /// A node declares it produces a type no node consumes
    #[error("Node '{node}' produces '{event_type}' but no node consumes it")]
    UnreachableProducedType {
        /// Producing node
        node: String,
        /// Orphaned event type
        event_type: String,
    },

    /// No node consumes `Start`
    #[error("No node consumes the Start event")]
    NoStartConsumer,

    /// More than one node consumes `Start`
    #[error("Start event is consumed by multiple nodes: {}", nodes.join(", "))]
    MultipleStartConsumers {
        /// All Start consumers, sorted
        nodes: Vec<String>,
    },

    /// A node consumes `Stop` or produces `Start`
    ///
    /// Also raised during a run when a node emits a custom payload whose type is one
    /// of the reserved tags.
    #[error("Node '{node}' misuses reserved event type '{event_type}'")]
    ReservedEventType {
        /// Offending node
        node: String,
        /// The reserved tag
        event_type: String,
    },

    /// A node emitted an event type it did not declare
    #[error("Node '{node}' emitted undeclared event type '{event_type}'")]
    UndeclaredEvent {
        /// Emitting node
        node: String,
        /// Emitted type
        event_type: String,
    },

    /// No node consumes a dequeued event type
    #[error("No node consumes event type '{event_type}'")]
    NoConsumer {
        /// Unroutable event type
        event_type: String,
    },

    /// The pending queue drained before any node produced `Stop`
    #[error("Workflow reached a dead end: no pending events and no Stop")]
    DeadEnd,

    /// The configured dispatch cap was reached
    #[error("Workflow exceeded the maximum of {limit} node dispatches")]
    MaxIterationsExceeded {
        /// Configured cap
        limit: usize,
    },

    /// `wakeup` found no snapshot for the identifier
    #[error("No suspended execution found for workflow '{workflow_id}'")]
    SnapshotNotFound {
        /// Requested identifier
        workflow_id: String,
    },

    /// The snapshot does not fit the current graph
    #[error("Snapshot for workflow '{workflow_id}' does not match the graph: {reason}")]
    SnapshotMismatch {
        /// Snapshot identifier
        workflow_id: String,
        /// What did not line up
        reason: String,
    },

    /// Snapshot storage failed
    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistError),

    /// A node routine returned an error
    #[error("Node '{node}' execution failed: {source}")]
    NodeExecution {
        /// Failing node
        node: String,
        /// Error the routine returned
        #[source]
        source: BoxError,
    },

    /// Event or state conversion failed
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid engine configuration
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// I/O error while loading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A spawned streaming run panicked or was cancelled
    #[error("Background run failed: {0}")]
    Join(String),
}

impl WorkflowError {
    /// Create a node execution error
    pub fn node_execution(node: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::NodeExecution {
            node: node.into(),
            source: source.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Create a snapshot mismatch error
    pub fn snapshot_mismatch(workflow_id: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::SnapshotMismatch {
            workflow_id: workflow_id.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is raised by [`GraphBuilder::build`](crate::GraphBuilder::build)
    pub fn is_construction_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateNode { .. }
                | Self::DuplicateConsumer { .. }
                | Self::UnreachableProducedType { .. }
                | Self::NoStartConsumer
                | Self::MultipleStartConsumers { .. }
                | Self::ReservedEventType { .. }
        )
    }

    /// Whether this error comes from routing an event during a run
    pub fn is_routing_error(&self) -> bool {
        matches!(self, Self::UndeclaredEvent { .. } | Self::NoConsumer { .. })
    }
}
