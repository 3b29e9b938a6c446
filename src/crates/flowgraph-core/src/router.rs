//! Graph construction and build-time validation
//!
//! There is no edge list. Nodes are registered with a [`GraphBuilder`], and the
//! routing table is derived from what each node consumes:
//!
//! ```text
//!   registered nodes                         routing table
//!   ┌──────────────────────────────┐         ┌─────────────┬───────┐
//!   │ A  consumes [Start]  -> First│         │ __start__   │  A    │
//!   │ B  consumes [First]  -> Second│  ───►  │ First       │  B    │
//!   │ C  consumes [Second] -> Stop │         │ Second      │  C    │
//!   └──────────────────────────────┘         └─────────────┴───────┘
//! ```
//!
//! [`GraphBuilder::build`] rejects every structural problem before a run can start.
//! Checks run in a fixed order and the first failure is returned:
//!
//! 1. [`DuplicateNode`](WorkflowError::DuplicateNode) - two nodes share a name
//! 2. [`ReservedEventType`](WorkflowError::ReservedEventType) - a node consumes `Stop` or produces `Start`
//! 3. [`NoStartConsumer`](WorkflowError::NoStartConsumer) / [`MultipleStartConsumers`](WorkflowError::MultipleStartConsumers)
//! 4. [`DuplicateConsumer`](WorkflowError::DuplicateConsumer) - one type, two consumers
//! 5. [`UnreachableProducedType`](WorkflowError::UnreachableProducedType) - a produced type nobody consumes (`Stop` exempt)
//!
//! A node whose consumed types nobody produces is legal but can never run; `build`
//! logs a warning for it.
//!
//! A node consuming its own output is a loop, and loops are allowed.

use crate::error::{Result, WorkflowError};
use crate::event::{EventType, Payload};
use crate::node::Node;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Collects nodes before validation
pub struct GraphBuilder<E: Payload> {
    nodes: Vec<Arc<dyn Node<E>>>,
}

impl<E: Payload> GraphBuilder<E> {
    pub fn new() -> Self {
        Self { nodes: Vec::new() }
    }

    /// Register a node
    pub fn register(mut self, node: impl Node<E> + 'static) -> Self {
        self.nodes.push(Arc::new(node));
        self
    }

    /// Register an already shared node
    pub fn register_shared(mut self, node: Arc<dyn Node<E>>) -> Self {
        self.nodes.push(node);
        self
    }

    /// Register a node through a mutable reference
    pub fn add(&mut self, node: impl Node<E> + 'static) -> &mut Self {
        self.nodes.push(Arc::new(node));
        self
    }

    /// Validate the registered nodes and derive the routing table
    pub fn build(self) -> Result<Graph<E>> {
        let nodes = self.nodes;

        let mut names = HashSet::new();
        for node in &nodes {
            if !names.insert(node.name().to_string()) {
                return Err(WorkflowError::DuplicateNode {
                    node: node.name().to_string(),
                });
            }
        }

        let consumes: Vec<Vec<EventType>> = nodes.iter().map(|n| n.consumes()).collect();
        let produces: Vec<HashSet<EventType>> = nodes
            .iter()
            .map(|n| n.produces().into_iter().collect())
            .collect();

        for (index, node) in nodes.iter().enumerate() {
            if consumes[index].contains(&EventType::STOP) {
                return Err(reserved(node.name(), &EventType::STOP));
            }
            if produces[index].contains(&EventType::START) {
                return Err(reserved(node.name(), &EventType::START));
            }
        }

        // event type -> indices of every node consuming it
        let mut consumers: BTreeMap<EventType, Vec<usize>> = BTreeMap::new();
        for (index, types) in consumes.iter().enumerate() {
            for event_type in types {
                let entry = consumers.entry(event_type.clone()).or_default();
                if !entry.contains(&index) {
                    entry.push(index);
                }
            }
        }

        match consumers.get(&EventType::START).map(Vec::as_slice) {
            None | Some([]) => return Err(WorkflowError::NoStartConsumer),
            Some([_]) => {}
            Some(many) => {
                let mut names: Vec<String> =
                    many.iter().map(|&i| nodes[i].name().to_string()).collect();
                names.sort();
                return Err(WorkflowError::MultipleStartConsumers { nodes: names });
            }
        }

        for (event_type, indices) in &consumers {
            if indices.len() > 1 {
                let mut names: Vec<&str> = indices.iter().map(|&i| nodes[i].name()).collect();
                names.sort_unstable();
                return Err(WorkflowError::DuplicateConsumer {
                    event_type: event_type.to_string(),
                    first: names[0].to_string(),
                    second: names[1].to_string(),
                });
            }
        }

        for (index, node) in nodes.iter().enumerate() {
            let mut declared: Vec<&EventType> = produces[index].iter().collect();
            declared.sort();
            for event_type in declared {
                if *event_type != EventType::STOP && !consumers.contains_key(event_type) {
                    return Err(WorkflowError::UnreachableProducedType {
                        node: node.name().to_string(),
                        event_type: event_type.to_string(),
                    });
                }
            }
        }

        let routes: HashMap<EventType, usize> = consumers
            .into_iter()
            .map(|(event_type, indices)| (event_type, indices[0]))
            .collect();

        let produced: HashSet<&EventType> = produces.iter().flatten().collect();
        for (index, node) in nodes.iter().enumerate() {
            let reachable = consumes[index]
                .iter()
                .any(|t| *t == EventType::START || produced.contains(t));
            if !reachable {
                warn!(node = node.name(), "Node consumes no event type that any node produces");
            }
        }

        debug!(nodes = nodes.len(), routes = routes.len(), "Graph built");

        Ok(Graph {
            nodes,
            routes,
            produces,
        })
    }
}

impl<E: Payload> Default for GraphBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn reserved(node: &str, event_type: &EventType) -> WorkflowError {
    WorkflowError::ReservedEventType {
        node: node.to_string(),
        event_type: event_type.to_string(),
    }
}

/// Validated, immutable routing table
pub struct Graph<E: Payload> {
    nodes: Vec<Arc<dyn Node<E>>>,
    routes: HashMap<EventType, usize>,
    produces: Vec<HashSet<EventType>>,
}

impl<E: Payload> Graph<E> {
    /// Start registering nodes
    pub fn builder() -> GraphBuilder<E> {
        GraphBuilder::new()
    }

    /// The unique node consuming `event_type`
    pub fn resolve(&self, event_type: &EventType) -> Option<&dyn Node<E>> {
        self.route(event_type).map(|index| self.nodes[index].as_ref())
    }

    /// Names of all nodes, in registration order
    pub fn node_names(&self) -> Vec<&str> {
        self.nodes.iter().map(|n| n.name()).collect()
    }

    /// Every routed event type, sorted
    pub fn event_types(&self) -> Vec<&EventType> {
        let mut types: Vec<&EventType> = self.routes.keys().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub(crate) fn route(&self, event_type: &EventType) -> Option<usize> {
        self.routes.get(event_type).copied()
    }

    pub(crate) fn node(&self, index: usize) -> &Arc<dyn Node<E>> {
        &self.nodes[index]
    }

    /// Whether the node at `index` declared it may produce `event_type`
    pub(crate) fn declares(&self, index: usize, event_type: &EventType) -> bool {
        self.produces[index].contains(event_type)
    }
}

impl<E: Payload> fmt::Debug for Graph<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let routes: BTreeMap<&str, &str> = self
            .routes
            .iter()
            .map(|(t, &i)| (t.as_str(), self.nodes[i].name()))
            .collect();
        f.debug_struct("Graph")
            .field("nodes", &self.node_names())
            .field("routes", &routes)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::NamedEvent;
    use crate::node::FnNode;

    fn node(name: &str) -> FnNode<NamedEvent> {
        FnNode::new(name)
    }

    fn linear() -> GraphBuilder<NamedEvent> {
        Graph::builder()
            .register(node("a").consumes(EventType::START).produces("First"))
            .register(node("b").consumes("First").produces("Second"))
            .register(node("c").consumes("Second").produces(EventType::STOP))
    }

    #[test]
    fn test_linear_graph_builds() {
        let graph = linear().build().unwrap();

        assert_eq!(graph.node_names(), vec!["a", "b", "c"]);
        assert_eq!(graph.resolve(&EventType::START).map(|n| n.name()), Some("a"));
        assert_eq!(graph.resolve(&"Second".into()).map(|n| n.name()), Some("c"));
        assert!(graph.resolve(&"Third".into()).is_none());
        assert_eq!(graph.event_types().len(), 3);
    }

    #[test]
    fn test_self_loop_is_legal() {
        let graph = Graph::builder()
            .register(node("start").consumes(EventType::START).produces("Tick"))
            .register(
                node("loop")
                    .consumes("Tick")
                    .produces("Tick")
                    .produces(EventType::STOP),
            )
            .build();
        assert!(graph.is_ok());
    }

    #[test]
    fn test_duplicate_node_name() {
        let err = linear().register(node("a").consumes("Other")).build().unwrap_err();
        assert!(matches!(err, WorkflowError::DuplicateNode { node } if node == "a"));
    }

    #[test]
    fn test_duplicate_consumer_independent_of_order() {
        for (x, y) in [("zeta", "alpha"), ("alpha", "zeta")] {
            let err = Graph::builder()
                .register(node("s").consumes(EventType::START).produces("X"))
                .register(node(x).consumes("X"))
                .register(node(y).consumes("X"))
                .build()
                .unwrap_err();

            match err {
                WorkflowError::DuplicateConsumer {
                    event_type,
                    first,
                    second,
                } => {
                    assert_eq!(event_type, "X");
                    assert_eq!(first, "alpha");
                    assert_eq!(second, "zeta");
                }
                other => panic!("unexpected error: {other}"),
            }
        }
    }

    #[test]
    fn test_unreachable_produced_type() {
        let err = Graph::builder()
            .register(node("a").consumes(EventType::START).produces("First"))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::UnreachableProducedType { node, event_type }
                if node == "a" && event_type == "First"
        ));
    }

    #[test]
    fn test_start_consumer_count() {
        let err = Graph::<NamedEvent>::builder()
            .register(node("a").consumes("X"))
            .build()
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NoStartConsumer));

        let err = Graph::<NamedEvent>::builder()
            .register(node("b").consumes(EventType::START))
            .register(node("a").consumes(EventType::START))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::MultipleStartConsumers { nodes } if nodes == vec!["a", "b"]
        ));
    }

    #[test]
    fn test_reserved_types() {
        let err = Graph::<NamedEvent>::builder()
            .register(node("a").consumes(EventType::START))
            .register(node("b").consumes(EventType::STOP))
            .build()
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ReservedEventType { node, .. } if node == "b"));

        let err = Graph::<NamedEvent>::builder()
            .register(node("a").consumes(EventType::START).produces(EventType::START))
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            WorkflowError::ReservedEventType { event_type, .. } if event_type == "__start__"
        ));
    }

    #[test]
    fn test_reserved_check_precedes_start_check() {
        // No Start consumer either, but the reserved type is reported first
        let err = Graph::<NamedEvent>::builder()
            .register(node("a").consumes(EventType::STOP))
            .build()
            .unwrap_err();
        assert!(matches!(err, WorkflowError::ReservedEventType { .. }));
    }

    #[test]
    fn test_unreachable_node_only_warns() {
        let graph = Graph::<NamedEvent>::builder()
            .register(node("a").consumes(EventType::START).produces(EventType::STOP))
            .register(node("orphan").consumes("Never"))
            .build()
            .unwrap();
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_mutable_builder() {
        let mut builder = GraphBuilder::<NamedEvent>::new();
        builder.add(node("a").consumes(EventType::START));
        let graph = builder.build().unwrap();
        assert!(!graph.declares(0, &EventType::STOP));
        assert_eq!(graph.route(&EventType::START), Some(0));
    }
}
