//! Per-invocation context handed to nodes
//!
//! [`NodeContext`] is the node's only window into the running workflow:
//!
//! | Capability | Method |
//! |------------|--------|
//! | Shared state | [`state`](NodeContext::state), [`state_mut`](NodeContext::state_mut) |
//! | Pause for a human | [`interrupt`](NodeContext::interrupt), [`interrupt_if`](NodeContext::interrupt_if), [`interrupt_when`](NodeContext::interrupt_when) |
//! | Read resume feedback | [`consume_interrupt_feedback`](NodeContext::consume_interrupt_feedback), [`is_resuming`](NodeContext::is_resuming) |
//! | Memoise work across resume | [`checkpoint`](NodeContext::checkpoint), [`has_checkpoint`](NodeContext::has_checkpoint) |
//! | Identity | [`node_name`](NodeContext::node_name), [`workflow_id`](NodeContext::workflow_id) |
//!
//! # Example
//!
//! ```rust,ignore
//! async fn invoke(&self, event: Event<Doc>, ctx: &mut NodeContext<'_>) -> NodeResult<Doc> {
//!     let draft: String = ctx
//!         .checkpoint("draft", || async { Ok(write_draft().await?) })
//!         .await?;
//!
//!     let verdict = ctx.interrupt(json!({ "review": draft }))?;
//!     ctx.state_mut().set("verdict", verdict);
//!     Ok(Event::stop(json!("reviewed")).into())
//! }
//! ```

use crate::checkpoint::CheckpointStore;
use crate::error::BoxError;
use crate::interrupt::{InterruptState, Interrupted};
use crate::state::WorkflowState;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use tracing::debug;

/// Mutable bookkeeping of the node invocation in flight
///
/// Survives suspension inside the snapshot and is dropped once the node returns
/// output.
#[derive(Debug, Clone, Default)]
pub(crate) struct Invocation {
    pub(crate) checkpoints: CheckpointStore,
    pub(crate) interrupts: InterruptState,
}

impl Invocation {
    pub(crate) fn resumed(checkpoints: CheckpointStore, feedback: Vec<Value>) -> Self {
        Self {
            checkpoints,
            interrupts: InterruptState::with_feedback(feedback),
        }
    }
}

/// Context passed to [`Node::invoke`](crate::Node::invoke)
pub struct NodeContext<'a> {
    workflow_id: &'a str,
    node_name: &'a str,
    state: &'a mut WorkflowState,
    invocation: &'a mut Invocation,
}

impl<'a> NodeContext<'a> {
    pub(crate) fn new(
        workflow_id: &'a str,
        node_name: &'a str,
        state: &'a mut WorkflowState,
        invocation: &'a mut Invocation,
    ) -> Self {
        Self {
            workflow_id,
            node_name,
            state,
            invocation,
        }
    }

    /// Identifier of the running workflow
    pub fn workflow_id(&self) -> &str {
        self.workflow_id
    }

    /// Name of the node being invoked
    pub fn node_name(&self) -> &str {
        self.node_name
    }

    /// Shared workflow state
    pub fn state(&self) -> &WorkflowState {
        &*self.state
    }

    /// Shared workflow state, writable
    pub fn state_mut(&mut self) -> &mut WorkflowState {
        &mut *self.state
    }

    /// Pause the workflow until the caller supplies feedback
    ///
    /// On a fresh invocation this records `payload` and returns `Err(Interrupted)`,
    /// which the node must propagate with `?`. After
    /// [`Workflow::wakeup`](crate::Workflow::wakeup) the same call returns the
    /// feedback instead. The i-th interrupt point of an invocation consumes the i-th
    /// feedback value.
    pub fn interrupt(&mut self, payload: impl Into<Value>) -> Result<Value, Interrupted> {
        if let Some(feedback) = self.invocation.interrupts.next_feedback() {
            debug!(node = self.node_name, "Interrupt satisfied by feedback");
            return Ok(feedback);
        }

        self.invocation.interrupts.request(payload.into());
        debug!(node = self.node_name, "Interrupt requested");
        Err(Interrupted {
            node: self.node_name.to_string(),
        })
    }

    /// Interrupt only when `condition` holds, otherwise `Ok(None)`
    ///
    /// The condition must evaluate the same way when the node re-runs after resume.
    pub fn interrupt_if(
        &mut self,
        condition: bool,
        payload: impl Into<Value>,
    ) -> Result<Option<Value>, Interrupted> {
        if !condition {
            return Ok(None);
        }
        self.interrupt(payload).map(Some)
    }

    /// Interrupt only when `predicate` holds for the current state
    pub fn interrupt_when<P>(
        &mut self,
        predicate: P,
        payload: impl Into<Value>,
    ) -> Result<Option<Value>, Interrupted>
    where
        P: FnOnce(&WorkflowState) -> bool,
    {
        let condition = predicate(&*self.state);
        self.interrupt_if(condition, payload)
    }

    /// Next unconsumed feedback value, without suspending
    ///
    /// `None` on a fresh invocation or once every supplied value has been read.
    pub fn consume_interrupt_feedback(&mut self) -> Option<Value> {
        self.invocation.interrupts.next_feedback()
    }

    /// Whether this invocation is a resume after suspension
    pub fn is_resuming(&self) -> bool {
        self.invocation.interrupts.is_resuming()
    }

    /// Run `compute` once per invocation and memoise its result under `label`
    ///
    /// If `label` already holds a result (from earlier in this invocation or from
    /// before a suspension), that result is deserialized and returned and `compute`
    /// is not called.
    pub async fn checkpoint<T, F, Fut>(&mut self, label: &str, compute: F) -> Result<T, BoxError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, BoxError>>,
    {
        if let Some(stored) = self.invocation.checkpoints.get(label) {
            debug!(node = self.node_name, label, "Checkpoint hit");
            return Ok(serde_json::from_value(stored.clone())?);
        }

        let value = compute().await?;
        self.invocation
            .checkpoints
            .insert(label, serde_json::to_value(&value)?);
        debug!(node = self.node_name, label, "Checkpoint recorded");
        Ok(value)
    }

    /// Whether `label` already holds a result in this invocation
    pub fn has_checkpoint(&self, label: &str) -> bool {
        self.invocation.checkpoints.contains(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_interrupt_without_feedback_records_request() {
        let mut state = WorkflowState::new();
        let mut invocation = Invocation::default();
        let mut ctx = NodeContext::new("wf", "review", &mut state, &mut invocation);

        assert!(!ctx.is_resuming());
        let err = ctx.interrupt(json!({"q": "ok?"})).unwrap_err();
        assert_eq!(err.node, "review");

        let request = invocation.interrupts.pending().cloned().unwrap();
        assert_eq!(request.payload, json!({"q": "ok?"}));
        assert_eq!(request.index, 0);
    }

    #[test]
    fn test_interrupts_map_to_feedback_in_order() {
        let mut state = WorkflowState::new();
        let mut invocation = Invocation::resumed(CheckpointStore::new(), vec![json!("a")]);
        let mut ctx = NodeContext::new("wf", "review", &mut state, &mut invocation);

        assert!(ctx.is_resuming());
        assert_eq!(ctx.interrupt("first").unwrap(), json!("a"));
        assert!(ctx.interrupt("second").is_err());
        assert_eq!(invocation.interrupts.pending().map(|r| r.index), Some(1));
    }

    #[test]
    fn test_conditional_interrupts() {
        let mut state = WorkflowState::new();
        state.set("risk", 0.9);
        let mut invocation = Invocation::default();
        let mut ctx = NodeContext::new("wf", "gate", &mut state, &mut invocation);

        assert_eq!(ctx.interrupt_if(false, "skip"), Ok(None));
        let risky = |s: &WorkflowState| s.get("risk").and_then(Value::as_f64) > Some(0.5);
        assert!(ctx.interrupt_when(risky, "check").is_err());
    }

    #[test]
    fn test_consume_feedback_is_single_pass() {
        let mut state = WorkflowState::new();
        let mut invocation = Invocation::resumed(CheckpointStore::new(), vec![json!(true)]);
        let mut ctx = NodeContext::new("wf", "n", &mut state, &mut invocation);

        assert_eq!(ctx.consume_interrupt_feedback(), Some(json!(true)));
        assert_eq!(ctx.consume_interrupt_feedback(), None);
    }

    #[tokio::test]
    async fn test_checkpoint_runs_compute_once() {
        let calls = AtomicUsize::new(0);
        let mut state = WorkflowState::new();
        let mut invocation = Invocation::default();
        let mut ctx = NodeContext::new("wf", "n", &mut state, &mut invocation);

        for _ in 0..3 {
            let value: u32 = ctx
                .checkpoint("expensive", || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(42)
                })
                .await
                .unwrap();
            assert_eq!(value, 42);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(ctx.has_checkpoint("expensive"));
        assert!(!ctx.has_checkpoint("other"));
    }

    #[tokio::test]
    async fn test_checkpoint_restored_from_snapshot() {
        let mut state = WorkflowState::new();
        let restored = CheckpointStore::from(std::collections::HashMap::from([(
            "fetch".to_string(),
            json!("cached"),
        )]));
        let mut invocation = Invocation::resumed(restored, vec![json!(1)]);
        let mut ctx = NodeContext::new("wf", "n", &mut state, &mut invocation);

        let value: String = ctx
            .checkpoint("fetch", || async { Err::<String, BoxError>("must not run".into()) })
            .await
            .unwrap();
        assert_eq!(value, "cached");
    }

    #[tokio::test]
    async fn test_checkpoint_error_is_not_stored() {
        let mut state = WorkflowState::new();
        let mut invocation = Invocation::default();
        let mut ctx = NodeContext::new("wf", "n", &mut state, &mut invocation);

        let result: Result<u32, BoxError> = ctx
            .checkpoint("flaky", || async { Err("boom".into()) })
            .await;
        assert!(result.is_err());
        assert!(!ctx.has_checkpoint("flaky"));
    }
}
