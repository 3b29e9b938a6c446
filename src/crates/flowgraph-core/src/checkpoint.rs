//! Memoised sub-results of one node invocation
//!
//! A resumed node runs again from its first line. Anything it did before the
//! interrupt (an HTTP call, a database write, a slow computation) would run twice
//! unless it is wrapped in [`NodeContext::checkpoint`](crate::NodeContext::checkpoint):
//!
//! ```rust,ignore
//! let profile: Profile = ctx
//!     .checkpoint("fetch_profile", || async { fetch_profile(id).await })
//!     .await?;
//! let approved = ctx.interrupt(json!({"profile": profile}))?;
//! ```
//!
//! The first call for a label runs the closure and stores its JSON result. Later
//! calls in the same logical invocation, including after suspend and resume, return
//! the stored value without running the closure.
//!
//! Labels are scoped to one invocation and dropped once the node returns output.
//! Reusing a label for a different computation inside one invocation returns the
//! first result.

use serde_json::Value;
use std::collections::HashMap;

/// Label to stored result map for the in-flight invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckpointStore {
    entries: HashMap<String, Value>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored result for `label`
    pub fn get(&self, label: &str) -> Option<&Value> {
        self.entries.get(label)
    }

    /// Record the result for `label`
    pub fn insert(&mut self, label: impl Into<String>, value: Value) {
        self.entries.insert(label.into(), value);
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(label)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn into_inner(self) -> HashMap<String, Value> {
        self.entries
    }
}

impl From<HashMap<String, Value>> for CheckpointStore {
    fn from(entries: HashMap<String, Value>) -> Self {
        Self { entries }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_insert_and_get() {
        let mut store = CheckpointStore::new();
        assert!(store.is_empty());

        store.insert("fetch", json!({"id": 1}));
        assert!(store.contains("fetch"));
        assert_eq!(store.get("fetch"), Some(&json!({"id": 1})));
        assert_eq!(store.len(), 1);

        store.clear();
        assert!(store.get("fetch").is_none());
    }

    #[test]
    fn test_restore_from_map() {
        let map = HashMap::from([("a".to_string(), json!(1))]);
        let store = CheckpointStore::from(map.clone());
        assert_eq!(store.into_inner(), map);
    }
}
