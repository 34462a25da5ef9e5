//! Staged edits over a wrapped model.

use crate::error::Result;
use crate::model::Model;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Collects edits to the direct fields of a model and applies them at once.
///
/// Staged values are invisible to the model until [`commit`](Self::commit),
/// which merges them through [`Model::update`] and therefore validates the
/// changed fields.
#[derive(Debug)]
pub struct Transaction {
    model: Model,
    original: Map<String, Value>,
    staged: Map<String, Value>,
    dirty: BTreeMap<String, bool>,
}

fn snapshot(model: &Model) -> Map<String, Value> {
    match model.to_value() {
        Value::Object(map) => map,
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => Map::new(),
    }
}

impl Transaction {
    pub fn new(model: &Model) -> Self {
        Self {
            model: model.clone(),
            original: snapshot(model),
            staged: Map::new(),
            dirty: BTreeMap::new(),
        }
    }

    pub fn model(&self) -> &Model {
        &self.model
    }

    /// The staged value of a field, or the model's value.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.staged
            .get(field)
            .cloned()
            .or_else(|| self.model.get(field))
    }

    /// Stage a field value. Scalars are compared with the original value to
    /// track dirtiness.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) {
        let value = value.into();
        let original = self.original.get(field);
        let scalar = |v: &Value| !v.is_object() && !v.is_array();

        if original.map_or(true, scalar) && scalar(&value) {
            self.dirty.insert(field.to_string(), original != Some(&value));
        }
        self.staged.insert(field.to_string(), value);
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty.values().any(|dirty| *dirty)
    }

    pub fn dirty_fields(&self) -> Vec<&str> {
        self.dirty
            .iter()
            .filter(|(_, dirty)| **dirty)
            .map(|(field, _)| field.as_str())
            .collect()
    }

    /// Apply the staged values to the model.
    pub async fn commit(&mut self) -> Result<()> {
        let staged = std::mem::take(&mut self.staged);
        if !staged.is_empty() {
            self.model.update(Value::Object(staged)).await?;
        }
        self.original = snapshot(&self.model);
        self.dirty.clear();
        Ok(())
    }

    /// Discard the staged values.
    pub fn rollback(&mut self) {
        self.staged.clear();
        self.dirty.clear();
    }
}
