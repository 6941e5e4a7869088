//! Shared form state of the launch wizard.
//!
//! [`FormState`] is the single owner of every field value, error and touch
//! flag across all steps. Steps never talk to each other; they read and
//! write through this object. [`VisitedSet`] records which steps the user has
//! navigated away from, which decides when errors become visible.

use std::collections::{BTreeSet, HashSet};

use indexmap::IndexMap;
use serde_json::Value;
use tracing::debug;

use crate::steps::StepId;

static NULL: Value = Value::Null;

/// Flat map of field values keyed by field name (`inventory`,
/// `credential_passwords.ssh_password`, `survey_region`, ...).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FormState {
    values: IndexMap<String, Value>,
    errors: IndexMap<String, String>,
    touched: HashSet<String>,
}

impl FormState {
    pub fn new(values: IndexMap<String, Value>) -> Self {
        Self {
            values,
            ..Self::default()
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// The value of `key`, or `Null` when the field was never set.
    pub fn value(&self, key: &str) -> &Value {
        self.values.get(key).unwrap_or(&NULL)
    }

    /// String value of `key`; anything that is not a string reads as empty.
    pub fn text(&self, key: &str) -> &str {
        self.value(key).as_str().unwrap_or_default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    pub fn set_error(&mut self, key: impl Into<String>, message: impl Into<String>) {
        self.errors.insert(key.into(), message.into());
    }

    pub fn clear_error(&mut self, key: &str) {
        self.errors.shift_remove(key);
    }

    pub fn error(&self, key: &str) -> Option<&str> {
        self.errors.get(key).map(String::as_str)
    }

    pub fn errors(&self) -> &IndexMap<String, String> {
        &self.errors
    }

    pub fn touch(&mut self, key: impl Into<String>) {
        self.touched.insert(key.into());
    }

    pub fn is_touched(&self, key: &str) -> bool {
        self.touched.contains(key)
    }

    pub fn values(&self) -> &IndexMap<String, Value> {
        &self.values
    }

    /// Re-seed the form from freshly computed initial values.
    ///
    /// Values already present win over the new defaults, so edits in
    /// progress survive when the active step set changes. Errors are
    /// cleared; touch flags are kept.
    pub fn reset_with(&mut self, initial_values: IndexMap<String, Value>) {
        let mut merged = initial_values;
        for (key, value) in self.values.drain(..) {
            merged.insert(key, value);
        }
        debug!(field_count = merged.len(), "form state reset");
        self.values = merged;
        self.errors.clear();
    }
}

/// Steps the user has navigated away from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisitedSet(BTreeSet<StepId>);

impl VisitedSet {
    pub fn insert(&mut self, step: StepId) -> bool {
        self.0.insert(step)
    }

    pub fn contains(&self, step: StepId) -> bool {
        self.0.contains(&step)
    }

    pub fn clear(&mut self) {
        self.0.clear();
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = StepId> + '_ {
        self.0.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn reset_prefers_existing_values_and_keeps_initial_order() {
        let mut form = FormState::new(IndexMap::from([
            ("limit".to_string(), json!("db")),
            ("old_field".to_string(), json!(1)),
        ]));
        form.set_error("limit", "bad");
        form.touch("limit");

        form.reset_with(IndexMap::from([
            ("inventory".to_string(), json!({"id": 1})),
            ("limit".to_string(), json!("")),
        ]));

        let keys: Vec<&str> = form.values().keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["inventory", "limit", "old_field"]);
        assert_eq!(form.text("limit"), "db");
        assert!(form.errors().is_empty());
        assert!(form.is_touched("limit"));
    }

    #[test]
    fn missing_values_read_as_null_and_empty_text() {
        let form = FormState::default();
        assert_eq!(form.value("nope"), &Value::Null);
        assert_eq!(form.text("nope"), "");
        assert!(form.get("nope").is_none());
    }

    #[test]
    fn visited_set_is_ordered_by_step() {
        let mut visited = VisitedSet::default();
        assert!(visited.insert(StepId::Survey));
        assert!(visited.insert(StepId::Inventory));
        assert!(!visited.insert(StepId::Inventory));
        assert_eq!(visited.iter().collect::<Vec<_>>(), vec![StepId::Inventory, StepId::Survey]);
    }
}
