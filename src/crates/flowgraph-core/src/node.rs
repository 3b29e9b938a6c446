//! Nodes: units of work bound to the event types they consume and produce
//!
//! A node declares up front which event types it **consumes** (the router sends
//! those to it) and which it may **produce** (the router checks that something
//! consumes each of them). At runtime the engine calls [`Node::invoke`] with one
//! event and a [`NodeContext`], and enqueues whatever events the node returns.
//!
//! ```text
//!            ┌──────────────────────────┐
//!  consumes  │           Node           │  produces
//!  ────────► │ invoke(event, &mut ctx)  │ ─────────►
//!  [First]   │   -> NodeOutput { .. }   │  [Second, Stop]
//!            └──────────────────────────┘
//! ```
//!
//! Emitting a type the node did not declare fails the run with
//! [`WorkflowError::UndeclaredEvent`](crate::WorkflowError::UndeclaredEvent).
//!
//! # Implementing a Node
//!
//! ```rust
//! use async_trait::async_trait;
//! use flowgraph_core::{Event, EventType, NamedEvent, Node, NodeContext, NodeResult};
//! use serde_json::json;
//!
//! struct Greeter;
//!
//! #[async_trait]
//! impl Node<NamedEvent> for Greeter {
//!     fn name(&self) -> &str {
//!         "greeter"
//!     }
//!
//!     fn consumes(&self) -> Vec<EventType> {
//!         vec![EventType::START]
//!     }
//!
//!     fn produces(&self) -> Vec<EventType> {
//!         vec![EventType::STOP]
//!     }
//!
//!     async fn invoke(
//!         &self,
//!         _event: Event<NamedEvent>,
//!         ctx: &mut NodeContext<'_>,
//!     ) -> NodeResult<NamedEvent> {
//!         ctx.state_mut().set("greeting", "hello");
//!         Ok(Event::stop(json!("done")).into())
//!     }
//! }
//! ```
//!
//! For small nodes, [`FnNode`] wraps an async closure instead.

use crate::context::NodeContext;
use crate::error::BoxError;
use crate::event::{Event, EventType, Payload};
use async_trait::async_trait;
use futures::future::BoxFuture;
use std::fmt;
use std::sync::Arc;

/// Result of one node invocation
pub type NodeResult<E> = Result<NodeOutput<E>, BoxError>;

/// A unit of work in a workflow graph
#[async_trait]
pub trait Node<E: Payload>: Send + Sync {
    /// Unique name within the graph
    fn name(&self) -> &str;

    /// Event types routed to this node
    fn consumes(&self) -> Vec<EventType>;

    /// Every event type this node may emit
    fn produces(&self) -> Vec<EventType>;

    /// Handle one event
    async fn invoke(&self, event: Event<E>, ctx: &mut NodeContext<'_>) -> NodeResult<E>;
}

/// Events a node emitted, in emission order
#[derive(Debug, Clone, PartialEq)]
pub struct NodeOutput<E> {
    pub events: Vec<Event<E>>,
}

impl<E: Payload> NodeOutput<E> {
    /// No events: the branch ends here
    pub fn none() -> Self {
        Self { events: Vec::new() }
    }

    /// A single event
    pub fn emit(event: impl Into<Event<E>>) -> Self {
        Self {
            events: vec![event.into()],
        }
    }

    /// Several events, enqueued in iteration order
    pub fn emit_all<I>(events: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Event<E>>,
    {
        Self {
            events: events.into_iter().map(Into::into).collect(),
        }
    }

    /// Append another event
    pub fn and(mut self, event: impl Into<Event<E>>) -> Self {
        self.events.push(event.into());
        self
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl<E: Payload> Default for NodeOutput<E> {
    fn default() -> Self {
        Self::none()
    }
}

impl<E: Payload> From<Event<E>> for NodeOutput<E> {
    fn from(event: Event<E>) -> Self {
        Self::emit(event)
    }
}

impl<E: Payload> From<Vec<Event<E>>> for NodeOutput<E> {
    fn from(events: Vec<Event<E>>) -> Self {
        Self { events }
    }
}

type Handler<E> = dyn for<'c, 'a> Fn(Event<E>, &'c mut NodeContext<'a>) -> BoxFuture<'c, NodeResult<E>>
    + Send
    + Sync;

/// Node built from an async closure
///
/// ```rust
/// use flowgraph_core::{Event, FnNode, NamedEvent, NodeOutput};
/// use serde_json::json;
///
/// let node = FnNode::<NamedEvent>::new("count")
///     .consumes("Tick")
///     .produces("Tick")
///     .produces(flowgraph_core::EventType::STOP)
///     .handler(|event, ctx| {
///         Box::pin(async move {
///             let n = ctx.state().get("n").and_then(|v| v.as_u64()).unwrap_or(0);
///             ctx.state_mut().set("n", n + 1);
///             if n >= 3 {
///                 Ok(Event::stop(json!(n)).into())
///             } else {
///                 Ok(NodeOutput::emit(event))
///             }
///         })
///     });
/// ```
///
/// Without a handler the node accepts its events and emits nothing.
pub struct FnNode<E: Payload> {
    name: String,
    consumes: Vec<EventType>,
    produces: Vec<EventType>,
    handler: Option<Arc<Handler<E>>>,
}

impl<E: Payload> FnNode<E> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            consumes: Vec::new(),
            produces: Vec::new(),
            handler: None,
        }
    }

    /// Add a consumed event type
    pub fn consumes(mut self, event_type: impl Into<EventType>) -> Self {
        self.consumes.push(event_type.into());
        self
    }

    /// Add a produced event type
    pub fn produces(mut self, event_type: impl Into<EventType>) -> Self {
        self.produces.push(event_type.into());
        self
    }

    /// Set the routine run for every consumed event
    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: for<'c, 'a> Fn(Event<E>, &'c mut NodeContext<'a>) -> BoxFuture<'c, NodeResult<E>>
            + Send
            + Sync
            + 'static,
    {
        let handler: Arc<Handler<E>> = Arc::new(handler);
        self.handler = Some(handler);
        self
    }
}

impl<E: Payload> fmt::Debug for FnNode<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnNode")
            .field("name", &self.name)
            .field("consumes", &self.consumes)
            .field("produces", &self.produces)
            .field("has_handler", &self.handler.is_some())
            .finish()
    }
}

#[async_trait]
impl<E: Payload> Node<E> for FnNode<E> {
    fn name(&self) -> &str {
        &self.name
    }

    fn consumes(&self) -> Vec<EventType> {
        self.consumes.clone()
    }

    fn produces(&self) -> Vec<EventType> {
        self.produces.clone()
    }

    async fn invoke(&self, event: Event<E>, ctx: &mut NodeContext<'_>) -> NodeResult<E> {
        match &self.handler {
            Some(handler) => handler(event, ctx).await,
            None => Ok(NodeOutput::none()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Invocation;
    use crate::event::NamedEvent;
    use crate::state::WorkflowState;
    use serde_json::json;

    #[test]
    fn test_output_builders() {
        let out: NodeOutput<NamedEvent> = NodeOutput::emit(NamedEvent::new("A", json!(1)))
            .and(Event::stop(json!("done")));
        assert_eq!(out.len(), 2);
        assert!(out.events[1].is_stop());

        let out: NodeOutput<NamedEvent> =
            NodeOutput::emit_all(["x", "y"].map(|n| NamedEvent::new(n, json!(null))));
        let types: Vec<String> = out.events.iter().map(|e| e.event_type().to_string()).collect();
        assert_eq!(types, vec!["x", "y"]);

        assert!(NodeOutput::<NamedEvent>::none().is_empty());
    }

    #[tokio::test]
    async fn test_fn_node_handler_mutates_state() {
        let node = FnNode::<NamedEvent>::new("inc")
            .consumes(EventType::START)
            .produces(EventType::STOP)
            .handler(|_event, ctx| {
                Box::pin(async move {
                    ctx.state_mut().set("seen", true);
                    Ok(Event::stop(json!(ctx.node_name())).into())
                })
            });

        assert_eq!(node.name(), "inc");
        assert_eq!(Node::consumes(&node), vec![EventType::START]);

        let mut state = WorkflowState::new();
        let mut invocation = Invocation::default();
        let mut ctx = NodeContext::new("wf", "inc", &mut state, &mut invocation);
        let out = node.invoke(Event::Start, &mut ctx).await.unwrap();

        assert_eq!(out.events, vec![Event::stop(json!("inc"))]);
        assert_eq!(state.get("seen"), Some(&json!(true)));
    }

    #[tokio::test]
    async fn test_fn_node_without_handler_emits_nothing() {
        let node = FnNode::<NamedEvent>::new("sink").consumes("Done");
        let mut state = WorkflowState::new();
        let mut invocation = Invocation::default();
        let mut ctx = NodeContext::new("wf", "sink", &mut state, &mut invocation);

        let out = node
            .invoke(Event::Custom(NamedEvent::new("Done", json!(null))), &mut ctx)
            .await
            .unwrap();
        assert!(out.is_empty());
    }
}
