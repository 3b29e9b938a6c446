//! Shared mutable state of one workflow execution
//!
//! A [`WorkflowState`] is a map from string keys to JSON values. The engine owns it
//! for the duration of a run and lends it to each node through
//! [`NodeContext::state_mut`](crate::NodeContext::state_mut), one invocation at a
//! time. Writes are visible to every later node. There is no versioning and no
//! reducer: the last write to a key wins.
//!
//! The state is part of every [`InterruptSnapshot`](flowgraph_persist::InterruptSnapshot),
//! so anything stored here survives suspension. Values must therefore be JSON.
//!
//! ```rust
//! use flowgraph_core::WorkflowState;
//! use serde_json::json;
//!
//! let mut state = WorkflowState::new();
//! state.set("attempts", 2);
//! state.set("user", json!({"name": "ada"}));
//!
//! let attempts: u32 = state.get_as("attempts").unwrap().unwrap();
//! assert_eq!(attempts, 2);
//! assert_eq!(state.get("user").unwrap()["name"], "ada");
//! ```

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Key-value store shared by all nodes of one execution
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkflowState {
    values: HashMap<String, Value>,
}

impl WorkflowState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw value stored under `key`
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Value under `key` converted to `T`
    ///
    /// `Ok(None)` when the key is absent, `Err` when the stored value does not fit `T`.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> serde_json::Result<Option<T>> {
        self.values
            .get(key)
            .map(|value| serde_json::from_value(value.clone()))
            .transpose()
    }

    /// Mutable access to the value under `key`
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.values.get_mut(key)
    }

    /// Store `value` under `key`, replacing what was there
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.values.insert(key.into(), value.into());
    }

    /// Store `value` and return the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.values.insert(key.into(), value)
    }

    /// Serialize `value` and store it under `key`
    pub fn set_serialized<T: Serialize>(
        &mut self,
        key: impl Into<String>,
        value: &T,
    ) -> serde_json::Result<()> {
        self.values.insert(key.into(), serde_json::to_value(value)?);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.values.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.values.iter()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Consume the state and return the underlying map
    pub fn into_inner(self) -> HashMap<String, Value> {
        self.values
    }

    /// Borrow the underlying map
    pub fn as_map(&self) -> &HashMap<String, Value> {
        &self.values
    }
}

impl From<HashMap<String, Value>> for WorkflowState {
    fn from(values: HashMap<String, Value>) -> Self {
        Self { values }
    }
}

impl<K: Into<String>> FromIterator<(K, Value)> for WorkflowState {
    fn from_iter<I: IntoIterator<Item = (K, Value)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }
}

impl IntoIterator for WorkflowState {
    type Item = (String, Value);
    type IntoIter = std::collections::hash_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}
