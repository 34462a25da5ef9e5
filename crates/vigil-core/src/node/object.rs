use super::{NodeState, Validatable, ValueNode};
use crate::error::{Error, Result};
use crate::model::{Model, WeakModel};
use crate::path;
use crate::result::{Status, ValidationResult};
use crate::server::ServerResponse;
use crate::session::{SessionRef, ValidationSession};
use crate::sync::{read, write};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

/// Aggregated validation state of an object or array, with its mirror map.
///
/// The mirror map holds one [`Validatable`] per materialized field. Children
/// appear lazily, the first time a field is read or written through the
/// owning [`Model`].
pub struct ObjectNode {
    field: RwLock<Option<String>>,
    parent: RwLock<Weak<ObjectNode>>,
    session: SessionRef,
    model: WeakModel,
    children: RwLock<BTreeMap<String, Validatable>>,
}

impl ObjectNode {
    pub(crate) fn new(field: Option<String>, session: SessionRef, model: WeakModel) -> Arc<Self> {
        Arc::new(Self {
            field: RwLock::new(field),
            parent: RwLock::new(Weak::new()),
            session,
            model,
            children: RwLock::new(BTreeMap::new()),
        })
    }

    /// Field name within the parent; `None` for a root.
    pub fn field(&self) -> Option<String> {
        read(&self.field).clone()
    }

    pub(crate) fn rename(&self, field: &str) {
        *write(&self.field) = Some(field.to_string());
    }

    /// Dotted path from the root model. The root's path is empty.
    pub fn path(&self) -> String {
        let field = self.field().unwrap_or_default();
        match self.parent() {
            Some(parent) => path::join(&parent.path(), &field),
            None => field,
        }
    }

    pub fn parent(&self) -> Option<Arc<ObjectNode>> {
        read(&self.parent).upgrade()
    }

    pub(crate) fn set_parent(&self, parent: &Arc<ObjectNode>) {
        *write(&self.parent) = Arc::downgrade(parent);
    }

    pub(crate) fn detach(&self) {
        *write(&self.parent) = Weak::new();
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    /// Walk the parent links up to the root node.
    pub fn root(self: &Arc<Self>) -> Arc<ObjectNode> {
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current
    }

    /// The session, resolved through the parent chain first.
    pub fn session(&self) -> Option<ValidationSession> {
        self.parent()
            .and_then(|parent| parent.session())
            .or_else(|| self.session.upgrade())
    }

    /// The model this node shadows.
    pub fn model(&self) -> Option<Model> {
        self.model.upgrade()
    }

    pub fn child(&self, field: &str) -> Option<Validatable> {
        read(&self.children).get(field).cloned()
    }

    /// Snapshot of the mirror map.
    pub fn children(&self) -> Vec<(String, Validatable)> {
        read(&self.children)
            .iter()
            .map(|(name, child)| (name.clone(), child.clone()))
            .collect()
    }

    pub fn value_child(&self, field: &str) -> Option<Arc<ValueNode>> {
        self.child(field)?.into_value()
    }

    pub fn object_child(&self, field: &str) -> Option<Arc<ObjectNode>> {
        self.child(field)?.into_object()
    }

    /// Get the value node for `field`, creating it when the mirror map has none.
    pub(crate) fn ensure_value_child(
        self: &Arc<Self>,
        field: &str,
        required: impl FnOnce() -> bool,
    ) -> Arc<ValueNode> {
        let (node, previous) = {
            let mut children = write(&self.children);
            if let Some(Validatable::Value(existing)) = children.get(field) {
                return existing.clone();
            }
            let node = ValueNode::new(field, self, required());
            let previous = children.insert(field.to_string(), Validatable::Value(node.clone()));
            (node, previous)
        };

        if let Some(previous) = previous {
            self.retire(&previous);
        }
        node
    }

    /// Link a child object node, detaching whatever it replaces.
    pub(crate) fn link_object(self: &Arc<Self>, field: &str, child: &Arc<ObjectNode>) {
        child.set_parent(self);
        let previous = write(&self.children).insert(field.to_string(), Validatable::Object(child.clone()));
        match previous {
            Some(Validatable::Object(previous)) if Arc::ptr_eq(&previous, child) => {}
            Some(previous) => self.retire(&previous),
            None => {}
        }
    }

    /// Drop a replaced child's recorded results, then cut it loose.
    ///
    /// The child must still point at this node so that its path resolves.
    pub(crate) fn retire(&self, previous: &Validatable) {
        if let Some(session) = self.session() {
            session.forget(&previous.path());
        }
        match previous {
            Validatable::Value(node) => node.detach(),
            Validatable::Object(node) => node.detach(),
        }
    }

    /// State derived from the descendants: the worst status among the
    /// validated children, or unset while nothing has been validated.
    pub fn state(&self) -> NodeState {
        let status = self
            .children()
            .iter()
            .filter_map(|(_, child)| child.status())
            .reduce(Status::worse);
        NodeState {
            status,
            ..NodeState::default()
        }
    }

    pub fn status(&self) -> Option<Status> {
        self.state().status
    }

    /// Successful when no descendant reports an error or warning.
    pub fn is_success(&self) -> bool {
        self.children().iter().all(|(_, child)| !child.is_failing())
    }

    pub async fn validate(self: &Arc<Self>) -> Result<ValidationResult> {
        let session = self.session().ok_or_else(|| Error::NoSession(self.path()))?;
        session.validate_object(self).await
    }

    /// Reset this node and all its descendants.
    pub fn clear(&self) {
        for (_, child) in self.children() {
            child.clear();
        }
        if let Some(session) = self.session() {
            session.notify(&self.path(), &NodeState::default());
        }
    }

    /// Apply a server response to every field of this subtree.
    ///
    /// The subtree is materialized first so that fields never read so far
    /// still receive their messages. Returns whether every child is successful.
    pub fn apply(&self, response: &ServerResponse) -> bool {
        if let Some(model) = self.model() {
            model.materialize();
        }

        let mut success = true;
        for (_, child) in self.children() {
            success &= child.apply(response);
        }

        if let Some(session) = self.session() {
            session.notify(&self.path(), &self.state());
        }

        success
    }

    /// Merge a plain value into the shadowed model, validating changed leaves.
    pub async fn update_value(&self, value: Value) -> Result<()> {
        let model = self.model().ok_or_else(|| Error::Detached(self.path()))?;
        model.update(value).await
    }

    /// JSON view of the state of this subtree.
    pub fn to_json(&self) -> Value {
        let mut fields = Map::new();
        for (name, child) in self.children() {
            let value = match child {
                Validatable::Value(node) => serde_json::to_value(node.state()).unwrap_or(Value::Null),
                Validatable::Object(node) => node.to_json(),
            };
            fields.insert(name, value);
        }

        json!({
            "path": self.path(),
            "state": serde_json::to_value(self.state()).unwrap_or(Value::Null),
            "fields": fields,
        })
    }
}

impl fmt::Debug for ObjectNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectNode")
            .field("path", &self.path())
            .field("state", &self.state())
            .field("children", &read(&self.children).keys().collect::<Vec<_>>())
            .finish()
    }
}
