//! # flowgraph-core - Event-Routed Workflows with Human-in-the-Loop
//!
//! Build workflows out of nodes that talk to each other through typed events. Each
//! node declares which event types it consumes and which it produces; the graph
//! checks those declarations when it is built, and the engine then dispatches
//! events one at a time in FIFO order until a `Stop` event ends the run.
//!
//! ## Overview
//!
//! - **Typed events** - a user payload enum plus the reserved `Start` and `Stop`
//! - **Build-time validation** - one consumer per type, exactly one `Start` consumer,
//!   every produced type has a consumer
//! - **Shared state** - a JSON key-value [`WorkflowState`] visible to every node
//! - **Interrupt and resume** - nodes pause for outside feedback; the run is
//!   snapshotted and resumed later with [`Workflow::wakeup`]
//! - **Checkpoints** - memoise expensive work inside a node so a resumed
//!   invocation does not repeat it
//! - **Pluggable persistence** - memory, file and SQLite snapshot stores from
//!   [`flowgraph_persist`]
//! - **Event streams** - watch every emitted event while the run progresses
//!
//! ## Core Concepts
//!
//! ### 1. Events and Nodes
//!
//! ```text
//!   Start ──► [intake] ──Order──► [price] ──Priced──► [approve] ──Stop
//!                                                         │
//!                                                    interrupt()
//! ```
//!
//! Each arrow is an event type. A type has exactly one consumer, so routing is a
//! single map lookup. Nodes implement [`Node`] directly or are built from closures
//! with [`FnNode`].
//!
//! ### 2. Execution
//!
//! [`Workflow`] runs a [`Graph`]. A run starts with `Start` in its queue and ends
//! as soon as a node produces `Stop`. Events still queued at that point never run. A run
//! whose queue empties without `Stop` fails with [`WorkflowError::DeadEnd`].
//!
//! ### 3. Human-in-the-Loop
//!
//! [`NodeContext::interrupt`] returns feedback when the invocation is being
//! resumed and [`Interrupted`] otherwise. Propagating it with `?` suspends the
//! run: the engine saves an [`InterruptSnapshot`] and returns
//! [`RunOutcome::Suspended`]. Calling `wakeup` with the same workflow id re-runs
//! the interrupted node from the top, with the new feedback available.
//!
//! ## Quick Start
//!
//! ```rust
//! use flowgraph_core::{Event, EventType, FnNode, Graph, NamedEvent, NodeOutput, Workflow, WorkflowState};
//! use serde_json::json;
//!
//! # #[tokio::main]
//! # async fn main() -> flowgraph_core::Result<()> {
//! let graph = Graph::builder()
//!     .register(
//!         FnNode::<NamedEvent>::new("greet")
//!             .consumes(EventType::START)
//!             .produces("Greeted")
//!             .handler(|_event, ctx| {
//!                 Box::pin(async move {
//!                     ctx.state_mut().set("greeting", "hello");
//!                     Ok(NodeOutput::emit(NamedEvent::new("Greeted", json!(null))))
//!                 })
//!             }),
//!     )
//!     .register(
//!         FnNode::<NamedEvent>::new("finish")
//!             .consumes("Greeted")
//!             .produces(EventType::STOP)
//!             .handler(|_event, ctx| {
//!                 Box::pin(async move {
//!                     let greeting = ctx.state().get("greeting").cloned();
//!                     Ok(Event::stop(greeting.unwrap_or_default()).into())
//!                 })
//!             }),
//!     )
//!     .build()?;
//!
//! let outcome = Workflow::new(graph).start(WorkflowState::new()).await?;
//! assert_eq!(outcome.into_completion().map(|c| c.result), Some(json!("hello")));
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`event`] | [`Event`], [`EventType`], [`Payload`] |
//! | [`node`] | [`Node`], [`NodeOutput`], [`FnNode`] |
//! | [`router`] | [`GraphBuilder`] validation and the [`Graph`] routing table |
//! | [`engine`] | [`Workflow`], [`RunHandle`], [`RunOutcome`] |
//! | [`context`] | [`NodeContext`] |
//! | [`state`] | [`WorkflowState`] |
//! | [`interrupt`] | [`Interrupted`], [`Suspension`] |
//! | [`checkpoint`] | [`CheckpointStore`] |
//! | [`stream`] | [`EventSink`], [`EventStream`], [`BackpressurePolicy`] |
//! | [`config`] | [`EngineConfig`] and its sections |
//! | [`telemetry`] | [`init_tracing`] |

pub mod checkpoint;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod event;
pub mod interrupt;
pub mod node;
pub mod router;
pub mod state;
pub mod stream;
pub mod telemetry;

pub use checkpoint::CheckpointStore;
pub use config::{BackpressureMode, EngineConfig, ExecutionConfig, LoggingConfig, StreamConfig};
pub use context::NodeContext;
pub use engine::{Completion, ExecutionStatus, RunHandle, RunOutcome, Workflow};
pub use error::{BoxError, Result, WorkflowError};
pub use event::{Event, EventType, NamedEvent, Payload};
pub use interrupt::{InterruptRequest, Interrupted, Suspension};
pub use node::{FnNode, Node, NodeOutput, NodeResult};
pub use router::{Graph, GraphBuilder};
pub use state::WorkflowState;
pub use stream::{event_channel, BackpressurePolicy, EventSink, EventStream};
pub use telemetry::{env_filter, init_tracing};

pub use flowgraph_persist;
pub use flowgraph_persist::{
    FileSnapshotStore, InMemorySnapshotStore, InterruptSnapshot, SnapshotStore, StoreConfig,
};
#[cfg(feature = "sqlite")]
pub use flowgraph_persist::SqliteSnapshotStore;

// Re-export commonly used external types
pub use async_trait::async_trait;
pub use futures::future::BoxFuture;
