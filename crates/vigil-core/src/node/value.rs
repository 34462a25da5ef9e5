use super::{NodeState, ObjectNode};
use crate::error::{Error, Result};
use crate::model::Model;
use crate::path;
use crate::result::{FieldResult, Status, ValidationResult};
use crate::server::ServerResponse;
use crate::session::ValidationSession;
use crate::sync::{read, write};
use serde_json::Value;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

/// Validation state of a single leaf field.
pub struct ValueNode {
    field: String,
    required: bool,
    parent: RwLock<Weak<ObjectNode>>,
    state: RwLock<NodeState>,
    generation: AtomicU64,
}

impl ValueNode {
    pub(crate) fn new(field: impl Into<String>, parent: &Arc<ObjectNode>, required: bool) -> Arc<Self> {
        Arc::new(Self {
            field: field.into(),
            required,
            parent: RwLock::new(Arc::downgrade(parent)),
            state: RwLock::new(NodeState::default()),
            generation: AtomicU64::new(0),
        })
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// Dotted path from the root model. A detached node reports its bare field name.
    pub fn path(&self) -> String {
        match self.parent() {
            Some(parent) => path::join(&parent.path(), &self.field),
            None => self.field.clone(),
        }
    }

    /// Whether any validator of this field is annotated as required.
    pub fn required(&self) -> bool {
        self.required
    }

    pub fn parent(&self) -> Option<Arc<ObjectNode>> {
        read(&self.parent).upgrade()
    }

    pub(crate) fn detach(&self) {
        *write(&self.parent) = Weak::new();
    }

    pub fn state(&self) -> NodeState {
        read(&self.state).clone()
    }

    pub fn status(&self) -> Option<Status> {
        read(&self.state).status.clone()
    }

    pub fn text(&self) -> Option<String> {
        read(&self.state).text.clone()
    }

    pub fn group(&self) -> Option<String> {
        read(&self.state).group.clone()
    }

    pub fn is_success(&self) -> bool {
        read(&self.state).is_success()
    }

    pub fn field_result(&self) -> FieldResult {
        read(&self.state).to_result(&self.path())
    }

    pub(crate) fn set_state(&self, state: NodeState) {
        *write(&self.state) = state;
    }

    /// Start a validation run and get its generation ticket.
    pub(crate) fn begin(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub(crate) fn is_latest(&self, ticket: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == ticket
    }

    pub fn session(&self) -> Option<ValidationSession> {
        self.parent()?.session()
    }

    /// The model holding this field.
    pub fn model(&self) -> Option<Model> {
        self.parent()?.model()
    }

    /// The root model of the graph this field belongs to.
    pub fn root_model(&self) -> Option<Model> {
        self.parent()?.root().model()
    }

    /// Current field value, read without materializing anything.
    pub fn value(&self) -> Option<Value> {
        self.model()?.raw(&self.field)
    }

    /// Assign a new value through the owning model, validating it if the trigger policy allows.
    pub async fn set_value(&self, value: impl Into<Value>) -> Result<ValidationResult> {
        let model = self.model().ok_or_else(|| Error::Detached(self.path()))?;
        model.assign(&self.field, value.into()).await
    }

    /// Validate this field explicitly.
    pub async fn validate(self: &Arc<Self>) -> Result<ValidationResult> {
        let session = self.session().ok_or_else(|| Error::NoSession(self.path()))?;
        session.validate_explicitly(self).await
    }

    /// Reset the validation state and drop the field from the session results.
    pub fn clear(&self) {
        self.set_state(NodeState::default());
        if let Some(session) = self.session() {
            let path = self.path();
            session.forget(&path);
            session.notify(&path, &NodeState::default());
        }
    }

    /// Take the state from a server response. Returns whether the field is now successful.
    pub fn apply(&self, response: &ServerResponse) -> bool {
        let path = self.path();
        let state = response
            .message(&path)
            .map(NodeState::from)
            .unwrap_or_else(NodeState::success);
        let success = state.is_success();

        self.set_state(state.clone());
        if let Some(session) = self.session() {
            session.publish(&path, &state);
        }

        success
    }
}

impl fmt::Debug for ValueNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueNode")
            .field("path", &self.path())
            .field("required", &self.required)
            .field("state", &self.state())
            .finish()
    }
}
