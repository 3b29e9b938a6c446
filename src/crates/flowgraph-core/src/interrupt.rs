//! Human-in-the-loop suspension
//!
//! A node pauses the workflow by calling
//! [`NodeContext::interrupt`](crate::NodeContext::interrupt) and propagating the
//! returned [`Interrupted`] with `?`. The engine notices the recorded request,
//! persists the execution and hands the caller a [`Suspension`] describing what the
//! node is waiting for.
//!
//! ```text
//!   start()                        wakeup(id, feedback)
//!      │                                  │
//!      ▼                                  ▼
//!  ┌────────┐   interrupt(p)?   ┌────────────────┐   interrupt(p) == Ok(feedback)
//!  │  node  │ ────────────────► │ InterruptSnapshot│ ─────────────────► node re-runs
//!  └────────┘   Err(Interrupted)└────────────────┘   from the top
//!      │
//!      ▼
//!  RunOutcome::Suspended(Suspension { workflow_id, node, payload })
//! ```
//!
//! Resumption re-invokes the **same node with the same event from the top**. The
//! i-th `interrupt` call of an invocation returns the i-th feedback value supplied so
//! far, so a node may pause several times before it finishes. Work done before an
//! interrupt that must not repeat belongs inside
//! [`NodeContext::checkpoint`](crate::NodeContext::checkpoint).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Returned by [`NodeContext::interrupt`](crate::NodeContext::interrupt) when no
/// feedback is available yet
///
/// Propagate it out of the node with `?`. Swallowing it and returning `Ok` discards
/// the request.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("node '{node}' is waiting for feedback")]
pub struct Interrupted {
    /// Node that requested the interrupt
    pub node: String,
}

/// A pending interrupt recorded during one node invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterruptRequest {
    /// Value surfaced to the caller
    pub payload: Value,
    /// Position of this interrupt among the invocation's interrupt points
    pub index: usize,
}

/// Why and where a run was suspended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suspension {
    /// Identifier to pass to [`Workflow::wakeup`](crate::Workflow::wakeup)
    pub workflow_id: String,
    /// Node waiting for feedback
    pub node: String,
    /// Payload the node passed to `interrupt`
    pub payload: Value,
}

/// Interrupt bookkeeping for the node invocation in flight
///
/// Feedback values and the interrupt request live here. Both `interrupt` and
/// `consume_interrupt_feedback` read feedback through one shared cursor.
#[derive(Debug, Clone, Default)]
pub(crate) struct InterruptState {
    feedback: Vec<Value>,
    cursor: usize,
    request: Option<InterruptRequest>,
}

impl InterruptState {
    /// Resumed invocation that has already received `feedback`
    pub(crate) fn with_feedback(feedback: Vec<Value>) -> Self {
        Self {
            feedback,
            cursor: 0,
            request: None,
        }
    }

    /// Next unconsumed feedback value, advancing the cursor
    pub(crate) fn next_feedback(&mut self) -> Option<Value> {
        let value = self.feedback.get(self.cursor).cloned()?;
        self.cursor += 1;
        Some(value)
    }

    /// Record an interrupt at the current cursor
    pub(crate) fn request(&mut self, payload: Value) {
        self.request = Some(InterruptRequest {
            payload,
            index: self.cursor,
        });
    }

    pub(crate) fn is_resuming(&self) -> bool {
        !self.feedback.is_empty()
    }

    pub(crate) fn pending(&self) -> Option<&InterruptRequest> {
        self.request.as_ref()
    }

    pub(crate) fn take_request(&mut self) -> Option<InterruptRequest> {
        self.request.take()
    }

    pub(crate) fn into_feedback(self) -> Vec<Value> {
        self.feedback
    }
}
