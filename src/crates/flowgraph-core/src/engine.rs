//! Sequential execution engine
//!
//! A [`Workflow`] owns a validated [`Graph`] and a [`SnapshotStore`]. Each run walks
//! the graph one event at a time:
//!
//! ```text
//!            ┌──────────────────────────────────────────────────────────┐
//!  start ──► │ queue: [Start]                                           │
//!            │                                                          │
//!            │ loop:                                                    │
//!            │   pop front ── empty ─────────────────► Err(DeadEnd)     │
//!            │      │                                                   │
//!            │      ├─ cap reached ──────────► Err(MaxIterationsExceeded)│
//!            │      ▼                                                   │
//!            │   resolve consumer ── none ───────────► Err(NoConsumer)  │
//!            │      ▼                                                   │
//!            │   node.invoke(event, ctx)                                │
//!            │      ├─ interrupted ─► save snapshot ─► Suspended        │
//!            │      ├─ Err(e) ──────────────────► Err(NodeExecution)    │
//!            │      └─ Ok(events) ─► check declared ─► stream ─► push   │
//!            │                                 └─ Stop ──► Completed    │
//!            └──────────────────────────────────────────────────────────┘
//! ```
//!
//! There is no parallelism: the next event is only dequeued once the previous
//! node has returned. Loops are allowed and unbounded unless
//! [`ExecutionConfig::max_iterations`] is set.
//!
//! # Suspension and Resumption
//!
//! When a node interrupts, the engine persists an
//! [`InterruptSnapshot`] containing the state, the in-flight event, that
//! invocation's checkpoints and feedback, and **the rest of the pending queue**.
//! [`Workflow::wakeup`] loads it, appends the new feedback and re-invokes the same
//! node with the same event. The queue behind it resumes in its original order.
//!
//! # Example
//!
//! ```rust
//! use flowgraph_core::{Event, EventType, FnNode, Graph, NamedEvent, RunOutcome, Workflow, WorkflowState};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> flowgraph_core::Result<()> {
//! let graph = Graph::builder()
//!     .register(
//!         FnNode::<NamedEvent>::new("approve")
//!             .consumes(EventType::START)
//!             .produces(EventType::STOP)
//!             .handler(|_event, ctx| {
//!                 Box::pin(async move {
//!                     let answer = ctx.interrupt(json!({"question": "ship it?"}))?;
//!                     Ok(Event::stop(answer).into())
//!                 })
//!             }),
//!     )
//!     .build()?;
//!
//! let workflow = Workflow::new(graph);
//!
//! let RunOutcome::Suspended(suspension) = workflow.start(WorkflowState::new()).await? else {
//!     unreachable!()
//! };
//! assert_eq!(suspension.node, "approve");
//!
//! let outcome = workflow.wakeup(&suspension.workflow_id, json!("yes")).await?;
//! assert_eq!(outcome.into_completion().map(|c| c.result), Some(json!("yes")));
//! # Ok(())
//! # }
//! ```

use crate::config::{EngineConfig, ExecutionConfig, StreamConfig};
use crate::context::{Invocation, NodeContext};
use crate::error::{Result, WorkflowError};
use crate::event::{Event, Payload};
use crate::interrupt::{InterruptRequest, Interrupted, Suspension};
use crate::router::Graph;
use crate::state::WorkflowState;
use crate::stream::{empty_stream, event_channel, EventSink, EventStream};
use flowgraph_persist::{InMemorySnapshotStore, InterruptSnapshot, SnapshotStore};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Lifecycle of one run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionStatus {
    Running,
    Suspended,
    Completed,
    Failed,
}

/// A run that produced `Stop`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Completion {
    pub workflow_id: String,
    /// State after the last node ran
    pub state: WorkflowState,
    /// Payload of the `Stop` event
    pub result: Value,
}

/// How a successful `start` or `wakeup` ended
#[derive(Debug, Clone, PartialEq)]
pub enum RunOutcome {
    Completed(Completion),
    Suspended(Suspension),
}

impl RunOutcome {
    pub fn status(&self) -> ExecutionStatus {
        match self {
            Self::Completed(_) => ExecutionStatus::Completed,
            Self::Suspended(_) => ExecutionStatus::Suspended,
        }
    }

    pub fn workflow_id(&self) -> &str {
        match self {
            Self::Completed(c) => &c.workflow_id,
            Self::Suspended(s) => &s.workflow_id,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_suspended(&self) -> bool {
        matches!(self, Self::Suspended(_))
    }

    pub fn into_completion(self) -> Option<Completion> {
        match self {
            Self::Completed(c) => Some(c),
            Self::Suspended(_) => None,
        }
    }

    pub fn into_suspension(self) -> Option<Suspension> {
        match self {
            Self::Suspended(s) => Some(s),
            Self::Completed(_) => None,
        }
    }
}

/// Invocation restored from a snapshot, re-run before the queue is touched
struct InFlight<E> {
    event: Event<E>,
    invocation: Invocation,
}

/// Live state of one run
struct ExecutionHandle<E> {
    workflow_id: String,
    state: WorkflowState,
    queue: VecDeque<Event<E>>,
    status: ExecutionStatus,
    dispatched: usize,
    in_flight: Option<InFlight<E>>,
    resumed: bool,
}

impl<E: Payload> ExecutionHandle<E> {
    fn fresh(workflow_id: String, state: WorkflowState) -> Self {
        Self {
            workflow_id,
            state,
            queue: VecDeque::from([Event::Start]),
            status: ExecutionStatus::Running,
            dispatched: 0,
            in_flight: None,
            resumed: false,
        }
    }
}

/// A runnable workflow: graph, snapshot store and engine settings
pub struct Workflow<E: Payload> {
    graph: Arc<Graph<E>>,
    store: Arc<dyn SnapshotStore>,
    execution: ExecutionConfig,
    stream: StreamConfig,
}

impl<E: Payload> Clone for Workflow<E> {
    fn clone(&self) -> Self {
        Self {
            graph: Arc::clone(&self.graph),
            store: Arc::clone(&self.store),
            execution: self.execution.clone(),
            stream: self.stream.clone(),
        }
    }
}

impl<E: Payload> fmt::Debug for Workflow<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Workflow")
            .field("graph", &self.graph)
            .field("execution", &self.execution)
            .field("stream", &self.stream)
            .finish_non_exhaustive()
    }
}

impl<E: Payload> Workflow<E> {
    /// Workflow with an in-memory snapshot store and default settings
    pub fn new(graph: Graph<E>) -> Self {
        Self {
            graph: Arc::new(graph),
            store: Arc::new(InMemorySnapshotStore::new()),
            execution: ExecutionConfig::default(),
            stream: StreamConfig::default(),
        }
    }

    /// Workflow configured from `config`, opening its persistence backend
    pub async fn from_config(graph: Graph<E>, config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let store = config.persistence.open().await?;
        info!(
            backend = config.persistence.backend_name(),
            "Opened snapshot store"
        );
        Ok(Self::new(graph)
            .with_shared_store(store)
            .with_execution_config(config.engine.clone())
            .with_stream_config(config.stream.clone()))
    }

    /// Use `store` for snapshots
    pub fn with_store(self, store: impl SnapshotStore + 'static) -> Self {
        self.with_shared_store(Arc::new(store))
    }

    /// Use an already shared store for snapshots
    pub fn with_shared_store(mut self, store: Arc<dyn SnapshotStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_execution_config(mut self, execution: ExecutionConfig) -> Self {
        self.execution = execution;
        self
    }

    pub fn with_stream_config(mut self, stream: StreamConfig) -> Self {
        self.stream = stream;
        self
    }

    /// Cap the number of node dispatches per run
    pub fn with_max_iterations(mut self, limit: usize) -> Self {
        self.execution.max_iterations = Some(limit);
        self
    }

    pub fn graph(&self) -> &Graph<E> {
        &self.graph
    }

    pub fn store(&self) -> &Arc<dyn SnapshotStore> {
        &self.store
    }

    /// Run from `Start` under a freshly generated identifier
    pub async fn start(&self, initial: impl Into<WorkflowState>) -> Result<RunOutcome> {
        self.start_with_id(Uuid::new_v4().to_string(), initial)
            .await
    }

    /// Run from `Start` under `workflow_id`
    pub async fn start_with_id(
        &self,
        workflow_id: impl Into<String>,
        initial: impl Into<WorkflowState>,
    ) -> Result<RunOutcome> {
        let handle = self.fresh_handle(workflow_id.into(), initial.into())?;
        self.drive(handle, EventSink::disabled()).await
    }

    /// Resume the suspended run `workflow_id`, answering its pending interrupt with `feedback`
    pub async fn wakeup(&self, workflow_id: &str, feedback: impl Into<Value>) -> Result<RunOutcome> {
        let handle = self.restore(workflow_id, feedback.into()).await?;
        self.drive(handle, EventSink::disabled()).await
    }

    /// Spawn a run from `Start` and stream its events
    pub fn start_streaming(&self, initial: impl Into<WorkflowState>) -> RunHandle<E> {
        self.start_streaming_with_id(Uuid::new_v4().to_string(), initial)
    }

    /// Spawn a run from `Start` under `workflow_id` and stream its events
    pub fn start_streaming_with_id(
        &self,
        workflow_id: impl Into<String>,
        initial: impl Into<WorkflowState>,
    ) -> RunHandle<E> {
        let workflow_id = workflow_id.into();
        let initial = initial.into();
        let (sink, events) = event_channel(self.stream.capacity, self.stream.policy());
        let workflow = self.clone();
        let id = workflow_id.clone();

        let task = tokio::spawn(async move {
            let handle = workflow.fresh_handle(id, initial)?;
            workflow.drive(handle, sink).await
        });

        RunHandle::new(workflow_id, events, task)
    }

    /// Spawn a resume of `workflow_id` and stream its events
    pub fn wakeup_streaming(
        &self,
        workflow_id: impl Into<String>,
        feedback: impl Into<Value>,
    ) -> RunHandle<E> {
        let workflow_id = workflow_id.into();
        let feedback = feedback.into();
        let (sink, events) = event_channel(self.stream.capacity, self.stream.policy());
        let workflow = self.clone();
        let id = workflow_id.clone();

        let task = tokio::spawn(async move {
            let handle = workflow.restore(&id, feedback).await?;
            workflow.drive(handle, sink).await
        });

        RunHandle::new(workflow_id, events, task)
    }

    fn fresh_handle(&self, workflow_id: String, state: WorkflowState) -> Result<ExecutionHandle<E>> {
        if workflow_id.is_empty() {
            return Err(WorkflowError::configuration("workflow id must not be empty"));
        }
        Ok(ExecutionHandle::fresh(workflow_id, state))
    }

    /// Rebuild a handle from the stored snapshot
    async fn restore(&self, workflow_id: &str, feedback: Value) -> Result<ExecutionHandle<E>> {
        let snapshot = self
            .store
            .load(workflow_id)
            .await?
            .ok_or_else(|| WorkflowError::SnapshotNotFound {
                workflow_id: workflow_id.to_string(),
            })?;

        if !snapshot.is_supported() {
            return Err(WorkflowError::snapshot_mismatch(
                workflow_id,
                format!("unsupported snapshot version {}", snapshot.version),
            ));
        }
        if snapshot.workflow_id != workflow_id {
            return Err(WorkflowError::snapshot_mismatch(
                workflow_id,
                format!("snapshot belongs to '{}'", snapshot.workflow_id),
            ));
        }

        let event: Event<E> = serde_json::from_value(snapshot.event).map_err(|e| {
            WorkflowError::snapshot_mismatch(workflow_id, format!("interrupted event: {}", e))
        })?;

        let event_type = event.event_type();
        match self.graph.resolve(&event_type) {
            None => {
                return Err(WorkflowError::snapshot_mismatch(
                    workflow_id,
                    format!("no node consumes '{}'", event_type),
                ))
            }
            Some(node) if node.name() != snapshot.node => {
                return Err(WorkflowError::snapshot_mismatch(
                    workflow_id,
                    format!(
                        "'{}' is now consumed by '{}', not '{}'",
                        event_type,
                        node.name(),
                        snapshot.node
                    ),
                ))
            }
            Some(_) => {}
        }

        let queue = snapshot
            .pending
            .into_iter()
            .map(|value| {
                serde_json::from_value(value).map_err(|e| {
                    WorkflowError::snapshot_mismatch(workflow_id, format!("pending event: {}", e))
                })
            })
            .collect::<Result<VecDeque<Event<E>>>>()?;

        let mut resume_values = snapshot.resume_values;
        resume_values.push(feedback);

        info!(
            workflow_id,
            node = %snapshot.node,
            feedback = resume_values.len(),
            pending = queue.len(),
            "Resuming workflow"
        );

        Ok(ExecutionHandle {
            workflow_id: workflow_id.to_string(),
            state: snapshot.state.into(),
            queue,
            status: ExecutionStatus::Running,
            dispatched: snapshot.dispatched,
            in_flight: Some(InFlight {
                event,
                invocation: Invocation::resumed(snapshot.checkpoints.into(), resume_values),
            }),
            resumed: true,
        })
    }

    /// Run `handle` to completion, suspension or failure
    #[tracing::instrument(
        name = "workflow",
        skip_all,
        fields(workflow_id = %handle.workflow_id, resumed = handle.resumed)
    )]
    async fn drive(&self, mut handle: ExecutionHandle<E>, mut sink: EventSink<E>) -> Result<RunOutcome> {
        let result = self.run_loop(&mut handle, &mut sink).await;
        if let Err(e) = &result {
            handle.status = ExecutionStatus::Failed;
            error!(error = %e, dispatched = handle.dispatched, "Workflow failed");
        }
        debug!(
            status = ?handle.status,
            dispatched = handle.dispatched,
            dropped_events = sink.dropped(),
            "Run finished"
        );
        result
    }

    async fn run_loop(
        &self,
        handle: &mut ExecutionHandle<E>,
        sink: &mut EventSink<E>,
    ) -> Result<RunOutcome> {
        loop {
            let (event, mut invocation) = match handle.in_flight.take() {
                Some(in_flight) => (in_flight.event, in_flight.invocation),
                None => {
                    let Some(event) = handle.queue.pop_front() else {
                        return Err(WorkflowError::DeadEnd);
                    };
                    if let Event::Stop { result } = event {
                        return self.complete(handle, result).await;
                    }
                    if let Some(limit) = self.execution.max_iterations {
                        if handle.dispatched >= limit {
                            return Err(WorkflowError::MaxIterationsExceeded { limit });
                        }
                    }
                    handle.dispatched += 1;
                    (event, Invocation::default())
                }
            };

            let event_type = event.event_type();
            let index = self
                .graph
                .route(&event_type)
                .ok_or_else(|| WorkflowError::NoConsumer {
                    event_type: event_type.to_string(),
                })?;
            let node = self.graph.node(index);
            let node_name = node.name();

            debug!(
                node = node_name,
                event_type = %event_type,
                dispatched = handle.dispatched,
                resuming = invocation.interrupts.is_resuming(),
                "Dispatching event"
            );

            let result = {
                let mut ctx = NodeContext::new(
                    &handle.workflow_id,
                    node_name,
                    &mut handle.state,
                    &mut invocation,
                );
                node.invoke(event.clone(), &mut ctx).await
            };

            let output = match result {
                Ok(output) => output,
                Err(source) => {
                    if let Some(request) = invocation.interrupts.take_request() {
                        if source.downcast_ref::<Interrupted>().is_none() {
                            debug!(node = node_name, error = %source, "Node failed after requesting an interrupt");
                        }
                        return self
                            .suspend(handle, event, node_name, invocation, request)
                            .await;
                    }
                    return Err(WorkflowError::NodeExecution {
                        node: node_name.to_string(),
                        source,
                    });
                }
            };

            if invocation.interrupts.take_request().is_some() {
                warn!(node = node_name, "Node returned normally after an interrupt; request discarded");
            }

            for produced in &output.events {
                let produced_type = produced.event_type();
                if let Event::Custom(_) = produced {
                    if produced_type.is_reserved() {
                        return Err(WorkflowError::ReservedEventType {
                            node: node_name.to_string(),
                            event_type: produced_type.to_string(),
                        });
                    }
                }
                if !self.graph.declares(index, &produced_type) {
                    return Err(WorkflowError::UndeclaredEvent {
                        node: node_name.to_string(),
                        event_type: produced_type.to_string(),
                    });
                }
            }

            for produced in output.events {
                sink.emit(&produced).await;
                // the first Stop produced ends the run; later siblings are never queued
                if let Event::Stop { result } = produced {
                    return self.complete(handle, result).await;
                }
                handle.queue.push_back(produced);
            }
        }
    }

    async fn suspend(
        &self,
        handle: &mut ExecutionHandle<E>,
        event: Event<E>,
        node_name: &str,
        invocation: Invocation,
        request: InterruptRequest,
    ) -> Result<RunOutcome> {
        let pending = handle
            .queue
            .iter()
            .map(serde_json::to_value)
            .collect::<serde_json::Result<Vec<Value>>>()?;

        let snapshot = InterruptSnapshot::new(
            handle.workflow_id.as_str(),
            node_name,
            serde_json::to_value(&event)?,
        )
        .with_state(handle.state.as_map().clone())
        .with_checkpoints(invocation.checkpoints.into_inner())
        .with_resume_values(invocation.interrupts.into_feedback())
        .with_payload(request.payload.clone())
        .with_pending(pending)
        .with_dispatched(handle.dispatched);

        self.store.save(&handle.workflow_id, &snapshot).await?;
        handle.status = ExecutionStatus::Suspended;

        info!(
            node = node_name,
            interrupt = request.index,
            pending = snapshot.pending.len(),
            "Workflow suspended"
        );

        Ok(RunOutcome::Suspended(Suspension {
            workflow_id: handle.workflow_id.clone(),
            node: node_name.to_string(),
            payload: request.payload,
        }))
    }

    async fn complete(&self, handle: &mut ExecutionHandle<E>, result: Value) -> Result<RunOutcome> {
        let discarded = handle.queue.len();
        handle.queue.clear();

        if handle.resumed && self.execution.delete_snapshot_on_completion {
            self.store.delete(&handle.workflow_id).await?;
        }
        handle.status = ExecutionStatus::Completed;

        info!(
            dispatched = handle.dispatched,
            discarded, "Workflow completed"
        );

        Ok(RunOutcome::Completed(Completion {
            workflow_id: handle.workflow_id.clone(),
            state: std::mem::take(&mut handle.state),
            result,
        }))
    }
}

/// A run executing on the tokio runtime
///
/// Take the event stream with [`stream_events`](Self::stream_events) before
/// awaiting [`outcome`](Self::outcome). Awaiting the outcome first drops the
/// stream. With the default `block` policy, a run that emits more events than the
/// stream capacity waits for the reader, so drain the stream concurrently when a
/// run can outgrow the buffer.
pub struct RunHandle<E: Payload> {
    workflow_id: String,
    events: Option<EventStream<E>>,
    task: JoinHandle<Result<RunOutcome>>,
}

impl<E: Payload> RunHandle<E> {
    fn new(workflow_id: String, events: EventStream<E>, task: JoinHandle<Result<RunOutcome>>) -> Self {
        Self {
            workflow_id,
            events: Some(events),
            task,
        }
    }

    pub fn workflow_id(&self) -> &str {
        &self.workflow_id
    }

    /// The run's event stream; later calls return an empty stream
    pub fn stream_events(&mut self) -> EventStream<E> {
        self.events.take().unwrap_or_else(empty_stream)
    }

    /// Whether the run has finished
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait for the run to end
    pub async fn outcome(self) -> Result<RunOutcome> {
        let Self { events, task, .. } = self;
        drop(events);
        task.await
            .map_err(|e| WorkflowError::Join(e.to_string()))?
    }
}

impl<E: Payload> fmt::Debug for RunHandle<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunHandle")
            .field("workflow_id", &self.workflow_id)
            .field("stream_taken", &self.events.is_none())
            .field("finished", &self.task.is_finished())
            .finish()
    }
}
