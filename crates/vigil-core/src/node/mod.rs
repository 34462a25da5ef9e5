//! Validatable nodes: the shadow graph mirroring a wrapped model.
//!
//! A [`ValueNode`] tracks the validation state of a leaf field, an
//! [`ObjectNode`] the aggregated state of an object or array together with
//! its mirror map of child nodes. Parent links are weak; a node is owned by
//! its parent's mirror map (and, for object nodes, by the model it shadows).

mod object;
mod value;

pub use object::ObjectNode;
pub use value::ValueNode;

use crate::error::Result;
use crate::result::{FieldResult, Status, ValidationResult};
use crate::server::ServerResponse;
use serde::Serialize;
use std::sync::Arc;

/// Mutable validation state carried by every node.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NodeState {
    /// `None` means the node has not been validated yet
    pub status: Option<Status>,
    pub text: Option<String>,
    pub group: Option<String>,
}

impl NodeState {
    pub fn success() -> Self {
        Self {
            status: Some(Status::Success),
            text: None,
            group: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.as_ref().map_or(true, Status::is_success)
    }

    pub fn is_error(&self) -> bool {
        matches!(self.status, Some(Status::Error))
    }

    pub fn is_warning(&self) -> bool {
        matches!(self.status, Some(Status::Warning))
    }

    /// Convert into a field result for `path`.
    pub fn to_result(&self, path: &str) -> FieldResult {
        FieldResult {
            path: Some(path.to_string()),
            status: self.status.clone(),
            text: self.text.clone(),
            group: self.group.clone(),
        }
    }
}

impl From<&FieldResult> for NodeState {
    fn from(result: &FieldResult) -> Self {
        if result.is_success() {
            return Self::success();
        }
        Self {
            status: result.status.clone(),
            text: result.text.clone(),
            group: result.group.clone(),
        }
    }
}

/// Either kind of validatable node.
#[derive(Debug, Clone)]
pub enum Validatable {
    Value(Arc<ValueNode>),
    Object(Arc<ObjectNode>),
}

impl Validatable {
    pub fn field(&self) -> Option<String> {
        match self {
            Validatable::Value(node) => Some(node.field().to_string()),
            Validatable::Object(node) => node.field(),
        }
    }

    pub fn path(&self) -> String {
        match self {
            Validatable::Value(node) => node.path(),
            Validatable::Object(node) => node.path(),
        }
    }

    pub fn state(&self) -> NodeState {
        match self {
            Validatable::Value(node) => node.state(),
            Validatable::Object(node) => node.state(),
        }
    }

    pub fn status(&self) -> Option<Status> {
        self.state().status
    }

    /// Whether the node and all its descendants are free of errors and warnings.
    pub fn is_success(&self) -> bool {
        match self {
            Validatable::Value(node) => node.is_success(),
            Validatable::Object(node) => node.is_success(),
        }
    }

    /// Whether the node or any descendant reports an error or warning.
    pub(crate) fn is_failing(&self) -> bool {
        match self {
            Validatable::Value(node) => {
                let state = node.state();
                state.is_error() || state.is_warning()
            }
            Validatable::Object(node) => !node.is_success(),
        }
    }

    pub async fn validate(&self) -> Result<ValidationResult> {
        match self {
            Validatable::Value(node) => node.validate().await,
            Validatable::Object(node) => node.validate().await,
        }
    }

    pub fn clear(&self) {
        match self {
            Validatable::Value(node) => node.clear(),
            Validatable::Object(node) => node.clear(),
        }
    }

    /// Apply a server validation response. Returns whether the node is now successful.
    pub fn apply(&self, response: &ServerResponse) -> bool {
        match self {
            Validatable::Value(node) => node.apply(response),
            Validatable::Object(node) => node.apply(response),
        }
    }

    pub fn as_value(&self) -> Option<&Arc<ValueNode>> {
        match self {
            Validatable::Value(node) => Some(node),
            Validatable::Object(_) => None,
        }
    }

    pub fn as_object(&self) -> Option<&Arc<ObjectNode>> {
        match self {
            Validatable::Object(node) => Some(node),
            Validatable::Value(_) => None,
        }
    }

    pub fn into_value(self) -> Option<Arc<ValueNode>> {
        match self {
            Validatable::Value(node) => Some(node),
            Validatable::Object(_) => None,
        }
    }

    pub fn into_object(self) -> Option<Arc<ObjectNode>> {
        match self {
            Validatable::Object(node) => Some(node),
            Validatable::Value(_) => None,
        }
    }
}
