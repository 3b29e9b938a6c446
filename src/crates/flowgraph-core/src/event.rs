//! Typed events flowing between nodes
//!
//! Nodes never call each other. A node *emits* events, and the engine routes each
//! event to the single node that consumes its [`EventType`]. That tag is the only
//! thing routing looks at.
//!
//! ```text
//! Event<E>
//! ├── Start            __start__   enqueued by the engine, never by nodes
//! ├── Stop { result }  __stop__    consuming it ends the run
//! └── Custom(E)        e.event_type()
//! ```
//!
//! `E` is the caller's own event enumeration. Implement [`Payload`] for it:
//!
//! ```rust
//! use flowgraph_core::{EventType, Payload};
//! use serde::{Deserialize, Serialize};
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! enum Order {
//!     Received { id: u64 },
//!     Approved { id: u64 },
//! }
//!
//! impl Payload for Order {
//!     fn event_type(&self) -> EventType {
//!         match self {
//!             Order::Received { .. } => EventType::new("Received"),
//!             Order::Approved { .. } => EventType::new("Approved"),
//!         }
//!     }
//! }
//! ```
//!
//! Graphs whose event set is only known at runtime can use [`NamedEvent`] instead.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::fmt;

/// Routing discriminant of an event
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventType(Cow<'static, str>);

impl EventType {
    /// Reserved tag of [`Event::Start`]
    pub const START: EventType = EventType(Cow::Borrowed("__start__"));

    /// Reserved tag of [`Event::Stop`]
    pub const STOP: EventType = EventType(Cow::Borrowed("__stop__"));

    /// Create a tag
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    /// Tag as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this is `Start` or `Stop`
    pub fn is_reserved(&self) -> bool {
        *self == Self::START || *self == Self::STOP
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&'static str> for EventType {
    fn from(name: &'static str) -> Self {
        Self(Cow::Borrowed(name))
    }
}

impl From<String> for EventType {
    fn from(name: String) -> Self {
        Self(Cow::Owned(name))
    }
}

/// Caller-defined event payload
pub trait Payload: Clone + fmt::Debug + Send + Sync + Serialize + DeserializeOwned + 'static {
    /// Tag used to route this payload
    fn event_type(&self) -> EventType;
}

/// An event flowing through a workflow
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event<E> {
    /// Begins every run; consumed by the graph's single Start node
    Start,

    /// Ends the run with `result`
    Stop {
        /// Final value reported in [`Completion::result`](crate::Completion::result)
        result: Value,
    },

    /// Application event
    Custom(E),
}

impl<E: Payload> Event<E> {
    /// Stop with a result
    pub fn stop(result: impl Into<Value>) -> Self {
        Self::Stop {
            result: result.into(),
        }
    }

    /// Routing tag of this event
    pub fn event_type(&self) -> EventType {
        match self {
            Self::Start => EventType::START,
            Self::Stop { .. } => EventType::STOP,
            Self::Custom(payload) => payload.event_type(),
        }
    }

    /// Borrow the application payload, if any
    pub fn payload(&self) -> Option<&E> {
        match self {
            Self::Custom(payload) => Some(payload),
            _ => None,
        }
    }

    /// Take the application payload, if any
    pub fn into_payload(self) -> Option<E> {
        match self {
            Self::Custom(payload) => Some(payload),
            _ => None,
        }
    }

    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop { .. })
    }
}

impl<E: Payload> From<E> for Event<E> {
    fn from(payload: E) -> Self {
        Self::Custom(payload)
    }
}

/// Dynamic payload routed by its `name`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedEvent {
    pub name: String,
    #[serde(default)]
    pub data: Value,
}

impl NamedEvent {
    pub fn new(name: impl Into<String>, data: Value) -> Self {
        Self {
            name: name.into(),
            data,
        }
    }
}

impl Payload for NamedEvent {
    fn event_type(&self) -> EventType {
        EventType::from(self.name.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    enum Msg {
        Ping(u32),
        Pong,
    }

    impl Payload for Msg {
        fn event_type(&self) -> EventType {
            match self {
                Msg::Ping(_) => EventType::new("Ping"),
                Msg::Pong => EventType::new("Pong"),
            }
        }
    }

    #[test]
    fn test_event_type_resolution() {
        assert_eq!(Event::<Msg>::Start.event_type(), EventType::START);
        assert_eq!(Event::<Msg>::stop(json!(1)).event_type(), EventType::STOP);
        assert_eq!(Event::Custom(Msg::Ping(3)).event_type(), EventType::new("Ping"));
        assert_eq!(Event::from(Msg::Pong).event_type().as_str(), "Pong");
    }

    #[test]
    fn test_reserved_tags() {
        assert!(EventType::START.is_reserved());
        assert!(EventType::STOP.is_reserved());
        assert!(!EventType::new("Ping").is_reserved());
        assert_eq!(EventType::START.to_string(), "__start__");
    }

    #[test]
    fn test_event_json_shape() {
        let value = serde_json::to_value(Event::Custom(Msg::Ping(7))).unwrap();
        assert_eq!(value, json!({"type": "Custom", "data": {"Ping": 7}}));

        let value = serde_json::to_value(Event::<Msg>::Start).unwrap();
        assert_eq!(value, json!({"type": "Start"}));

        let back: Event<Msg> =
            serde_json::from_value(json!({"type": "Stop", "data": {"result": "done"}})).unwrap();
        assert_eq!(back, Event::stop("done"));
    }

    #[test]
    fn test_named_event_routes_by_name() {
        let event = Event::Custom(NamedEvent::new("Review", json!({"doc": 1})));
        assert_eq!(event.event_type(), EventType::new("Review"));
        assert_eq!(event.payload().map(|p| p.data.clone()), Some(json!({"doc": 1})));
    }
}
