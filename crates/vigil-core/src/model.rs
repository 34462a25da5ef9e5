//! Wrapped data models.
//!
//! A [`Model`] owns a JSON object or array and shadows it with an
//! [`ObjectNode`]. Reads through [`Model::field`] materialize lazily: nested
//! objects are wrapped and leaves get a [`ValueNode`] the first time they are
//! touched. Writes through [`Model::set`] keep the shadow graph in sync and
//! trigger validation according to the session's trigger policy.

use crate::error::{Error, Result};
use crate::node::{ObjectNode, Validatable, ValueNode};
use crate::path;
use crate::result::ValidationResult;
use crate::session::ValidationSession;
use crate::sync::{read, write};
use futures_util::future::BoxFuture;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, RwLock, Weak};

/// Reserved field name under which a model exposes its validatable node.
pub const VALIDATABLE_ACCESSOR: &str = "$validatable";

/// A computed field. Functions are never materialized or validated.
pub type ModelFn = Arc<dyn Fn(&Model) -> Value + Send + Sync>;

/// What a field read returns.
#[derive(Clone)]
pub enum Field {
    Value(Value),
    Object(Model),
    Function(ModelFn),
}

impl Field {
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Field::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn into_object(self) -> Option<Model> {
        match self {
            Field::Object(model) => Some(model),
            _ => None,
        }
    }
}

impl fmt::Debug for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Field::Value(value) => f.debug_tuple("Value").field(value).finish(),
            Field::Object(model) => f.debug_tuple("Object").field(model).finish(),
            Field::Function(_) => f.write_str("Function"),
        }
    }
}

/// Input accepted by [`Model::wrap`].
pub enum Wrappable {
    Raw(Value),
    Wrapped(Model),
}

impl From<Value> for Wrappable {
    fn from(value: Value) -> Self {
        Wrappable::Raw(value)
    }
}

impl From<Model> for Wrappable {
    fn from(model: Model) -> Self {
        Wrappable::Wrapped(model)
    }
}

impl From<&Model> for Wrappable {
    fn from(model: &Model) -> Self {
        Wrappable::Wrapped(model.clone())
    }
}

enum Slot {
    Raw(Value),
    Wrapped(Model),
    Function(ModelFn),
}

impl Slot {
    fn to_value(&self) -> Option<Value> {
        match self {
            Slot::Raw(value) => Some(value.clone()),
            Slot::Wrapped(model) => Some(model.to_value()),
            Slot::Function(_) => None,
        }
    }
}

enum Slots {
    Object(BTreeMap<String, Slot>),
    Array(Vec<Slot>),
}

impl Slots {
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(map) => Ok(Slots::Object(
                map.into_iter().map(|(k, v)| (k, Slot::Raw(v))).collect(),
            )),
            Value::Array(items) => Ok(Slots::Array(items.into_iter().map(Slot::Raw).collect())),
            other => Err(not_composite(&other)),
        }
    }

    fn get(&self, key: &str) -> Option<&Slot> {
        match self {
            Slots::Object(map) => map.get(key),
            Slots::Array(items) => key.parse::<usize>().ok().and_then(|i| items.get(i)),
        }
    }

    /// Array keys must be an existing index or the next one.
    fn check_key(&self, key: &str) -> Result<()> {
        match self {
            Slots::Array(items) => array_index(key, items.len()).map(|_| ()),
            Slots::Object(_) => Ok(()),
        }
    }

    fn insert(&mut self, key: &str, slot: Slot) -> Result<()> {
        match self {
            Slots::Object(map) => {
                map.insert(key.to_string(), slot);
            }
            Slots::Array(items) => {
                let index = array_index(key, items.len())?;
                if index == items.len() {
                    items.push(slot);
                } else {
                    items[index] = slot;
                }
            }
        }
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        match self {
            Slots::Object(map) => map.keys().cloned().collect(),
            Slots::Array(items) => (0..items.len()).map(|i| i.to_string()).collect(),
        }
    }

    fn to_value(&self) -> Value {
        match self {
            Slots::Object(map) => Value::Object(
                map.iter()
                    .filter_map(|(k, slot)| slot.to_value().map(|v| (k.clone(), v)))
                    .collect::<Map<_, _>>(),
            ),
            Slots::Array(items) => Value::Array(
                items
                    .iter()
                    .map(|slot| slot.to_value().unwrap_or(Value::Null))
                    .collect(),
            ),
        }
    }
}

fn array_index(key: &str, len: usize) -> Result<usize> {
    match key.parse::<usize>() {
        Ok(index) if index <= len => Ok(index),
        _ => Err(Error::InvalidPath(key.to_string())),
    }
}

fn is_composite(value: &Value) -> bool {
    value.is_object() || value.is_array()
}

fn not_composite(value: &Value) -> Error {
    match value {
        Value::Bool(_) => Error::NotComposite("boolean"),
        Value::Number(_) => Error::NotComposite("number"),
        Value::String(_) => Error::NotComposite("string"),
        _ => Error::NullModel,
    }
}

pub(crate) struct ModelInner {
    node: Arc<ObjectNode>,
    session: ValidationSession,
    slots: RwLock<Slots>,
}

/// A wrapped object or array.
///
/// Cloning is cheap and yields a handle to the same model; use
/// [`Model::ptr_eq`] to compare identity.
#[derive(Clone)]
pub struct Model {
    inner: Arc<ModelInner>,
}

#[derive(Clone, Default)]
pub(crate) struct WeakModel(Weak<ModelInner>);

impl WeakModel {
    pub(crate) fn upgrade(&self) -> Option<Model> {
        self.0.upgrade().map(|inner| Model { inner })
    }
}

impl Model {
    /// Wrap a value for validation.
    ///
    /// Wrapping an existing model of the same session returns it unchanged,
    /// one bound to another session is rejected. Otherwise the direct
    /// leaves of the value are assigned once through the write path while the
    /// session is initializing; nested objects stay unwrapped until read.
    pub async fn wrap(value: impl Into<Wrappable>, session: &ValidationSession) -> Result<Model> {
        let value = match value.into() {
            Wrappable::Wrapped(model) if model.session().ptr_eq(session) => return Ok(model),
            Wrappable::Wrapped(_) => return Err(Error::SessionMismatch),
            Wrappable::Raw(value) => value,
        };
        let model = Self::create(None, value, session)?;

        let _initializing = session.initializing();
        for key in model.keys() {
            if session.is_excluded(&key) {
                continue;
            }
            if let Some(value) = model.leaf(&key) {
                model.assign(&key, value).await?;
            }
        }

        tracing::debug!(fields = model.keys().len(), "model wrapped");
        Ok(model)
    }

    fn create(field: Option<String>, value: Value, session: &ValidationSession) -> Result<Model> {
        let slots = Slots::from_value(value)?;
        let session_ref = session.downgrade();
        let inner = Arc::new_cyclic(|weak| ModelInner {
            node: ObjectNode::new(field, session_ref, WeakModel(weak.clone())),
            session: session.clone(),
            slots: RwLock::new(slots),
        });
        Ok(Model { inner })
    }

    /// The validatable node shadowing this model.
    pub fn node(&self) -> &Arc<ObjectNode> {
        &self.inner.node
    }

    pub fn session(&self) -> &ValidationSession {
        &self.inner.session
    }

    pub fn path(&self) -> String {
        self.inner.node.path()
    }

    pub fn ptr_eq(&self, other: &Model) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn is_array(&self) -> bool {
        matches!(*read(&self.inner.slots), Slots::Array(_))
    }

    pub fn keys(&self) -> Vec<String> {
        read(&self.inner.slots).keys()
    }

    fn is_excluded(&self, field: &str) -> bool {
        field == VALIDATABLE_ACCESSOR || self.inner.session.is_excluded(field)
    }

    /// Read a field, materializing it.
    ///
    /// Nested objects are wrapped and linked on first read. Leaves, and
    /// fields that do not exist yet, get a value node. Excluded fields and
    /// functions are returned as they are.
    pub fn field(&self, name: &str) -> Option<Field> {
        if self.is_excluded(name) {
            return self.stored(name);
        }

        {
            let slots = read(&self.inner.slots);
            match slots.get(name) {
                Some(Slot::Raw(value)) if is_composite(value) => {}
                Some(Slot::Raw(value)) => {
                    let value = value.clone();
                    drop(slots);
                    self.ensure_value_node(name);
                    return Some(Field::Value(value));
                }
                Some(Slot::Wrapped(model)) => return Some(Field::Object(model.clone())),
                Some(Slot::Function(f)) => return Some(Field::Function(f.clone())),
                None => {
                    let addressable = slots.check_key(name).is_ok();
                    drop(slots);
                    if addressable {
                        self.ensure_value_node(name);
                    }
                    return None;
                }
            }
        }

        let mut slots = write(&self.inner.slots);
        let raw = match slots.get(name) {
            Some(Slot::Raw(value)) if is_composite(value) => value.clone(),
            Some(Slot::Wrapped(model)) => return Some(Field::Object(model.clone())),
            _ => return None,
        };
        let child = Self::create(Some(name.to_string()), raw, &self.inner.session).ok()?;
        self.inner.node.link_object(name, child.node());
        slots.insert(name, Slot::Wrapped(child.clone())).ok()?;
        Some(Field::Object(child))
    }

    fn stored(&self, name: &str) -> Option<Field> {
        if name == VALIDATABLE_ACCESSOR {
            return None;
        }
        match read(&self.inner.slots).get(name)? {
            Slot::Raw(value) => Some(Field::Value(value.clone())),
            Slot::Wrapped(model) => Some(Field::Object(model.clone())),
            Slot::Function(f) => Some(Field::Function(f.clone())),
        }
    }

    /// Raw stored value of a direct field, without materializing anything.
    pub(crate) fn raw(&self, name: &str) -> Option<Value> {
        read(&self.inner.slots).get(name)?.to_value()
    }

    fn leaf(&self, name: &str) -> Option<Value> {
        match read(&self.inner.slots).get(name)? {
            Slot::Raw(value) if !is_composite(value) => Some(value.clone()),
            _ => None,
        }
    }

    fn ensure_value_node(&self, name: &str) -> Arc<ValueNode> {
        let node = &self.inner.node;
        let rule_set = self.inner.session.rule_set();
        let path = path::join(&node.path(), name);
        node.ensure_value_child(name, || rule_set.is_required(&path, name))
    }

    /// Store a value in a direct field and keep the mirror map in sync.
    ///
    /// Returns the value node of the field when the stored value is a leaf.
    fn store(&self, name: &str, value: Value) -> Result<Option<Arc<ValueNode>>> {
        if name == VALIDATABLE_ACCESSOR {
            return Err(Error::ReadOnly(name.to_string()));
        }
        if self.is_excluded(name) {
            write(&self.inner.slots).insert(name, Slot::Raw(value))?;
            return Ok(None);
        }

        let mut slots = write(&self.inner.slots);
        slots.check_key(name)?;

        if is_composite(&value) {
            let child = Self::create(Some(name.to_string()), value, &self.inner.session)?;
            self.inner.node.link_object(name, child.node());
            slots.insert(name, Slot::Wrapped(child))?;
            return Ok(None);
        }

        slots.insert(name, Slot::Raw(value))?;
        drop(slots);

        // A replaced object node is retired when the value node takes its place.
        Ok(Some(self.ensure_value_node(name)))
    }

    /// Write a direct field and validate it when it holds a leaf.
    pub(crate) async fn assign(&self, name: &str, value: Value) -> Result<ValidationResult> {
        match self.store(name, value)? {
            Some(node) => self.inner.session.validate_field(&node, None).await,
            None => Ok(ValidationResult::success()),
        }
    }

    /// Assign a value at a dotted path.
    ///
    /// The field is validated when the session's trigger policy allows it;
    /// otherwise the returned result is neutral.
    pub async fn set(&self, path: &str, value: impl Into<Value>) -> Result<ValidationResult> {
        let (target, field) = self.parent_of(path)?;
        target.assign(field, value.into()).await
    }

    /// Place an already wrapped model at a dotted path.
    pub fn attach(&self, path: &str, model: &Model) -> Result<()> {
        if !model.session().ptr_eq(self.session()) {
            return Err(Error::SessionMismatch);
        }
        let (target, field) = self.parent_of(path)?;
        if target.is_excluded(field) {
            return Err(Error::ReadOnly(field.to_string()));
        }

        let mut slots = write(&target.inner.slots);
        slots.check_key(field)?;
        model.node().rename(field);
        target.inner.node.link_object(field, model.node());
        slots.insert(field, Slot::Wrapped(model.clone()))
    }

    /// Store a computed field.
    pub fn set_fn(
        &self,
        name: &str,
        f: impl Fn(&Model) -> Value + Send + Sync + 'static,
    ) -> Result<()> {
        if name == VALIDATABLE_ACCESSOR {
            return Err(Error::ReadOnly(name.to_string()));
        }
        write(&self.inner.slots).insert(name, Slot::Function(Arc::new(f)))
    }

    /// Evaluate a computed field.
    pub fn call(&self, name: &str) -> Option<Value> {
        match self.stored(name)? {
            Field::Function(f) => Some(f(self)),
            _ => None,
        }
    }

    fn parent_of<'p>(&self, path: &'p str) -> Result<(Model, &'p str)> {
        match path::split_last(path) {
            (Some(parent), field) => {
                let target = self
                    .object(parent)
                    .ok_or_else(|| Error::InvalidPath(parent.to_string()))?;
                Ok((target, field))
            }
            (None, "") => Err(Error::InvalidPath(path.to_string())),
            (None, field) => Ok((self.clone(), field)),
        }
    }

    /// Snapshot of the value at a dotted path; an empty path yields the whole model.
    ///
    /// Reading materializes the visited fields. Functions yield `None`.
    pub fn get(&self, path: &str) -> Option<Value> {
        if path.is_empty() {
            return Some(self.to_value());
        }
        let (target, field) = self.parent_of(path).ok()?;
        match target.field(field)? {
            Field::Value(value) => Some(value),
            Field::Object(model) => Some(model.to_value()),
            Field::Function(_) => None,
        }
    }

    /// Convenience for string fields.
    pub fn get_str(&self, path: &str) -> Option<String> {
        self.get(path)?.as_str().map(str::to_string)
    }

    /// The nested model at a dotted path.
    pub fn object(&self, path: &str) -> Option<Model> {
        path::segments(path).try_fold(self.clone(), |current, segment| {
            current.field(segment)?.into_object()
        })
    }

    /// The validatable node at a dotted path; an empty path yields this model's node.
    pub fn validatable(&self, path: &str) -> Option<Validatable> {
        if path.is_empty() {
            return Some(Validatable::Object(self.inner.node.clone()));
        }
        let (target, field) = self.parent_of(path).ok()?;
        target.field(field);
        target.inner.node.child(field)
    }

    pub fn value_node(&self, path: &str) -> Option<Arc<ValueNode>> {
        self.validatable(path)?.into_value()
    }

    /// Materialize every direct field.
    pub fn materialize(&self) {
        for key in self.keys() {
            if !self.is_excluded(&key) {
                self.field(&key);
            }
        }
    }

    /// Plain JSON snapshot. Computed fields are left out.
    pub fn to_value(&self) -> Value {
        read(&self.inner.slots).to_value()
    }

    /// Merge a plain value into this model.
    ///
    /// Nested objects of the same kind are updated in place, everything else
    /// is assigned through the write path. Fields missing from `value` are kept.
    pub fn update(&self, value: Value) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            let entries: Vec<(String, Value)> = match value {
                Value::Object(map) => map.into_iter().collect(),
                Value::Array(items) => items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), v))
                    .collect(),
                other => return Err(not_composite(&other)),
            };

            for (key, entry) in entries {
                if is_composite(&entry) && !self.is_excluded(&key) {
                    if let Some(Field::Object(child)) = self.field(&key) {
                        if child.is_array() == entry.is_array() {
                            child.update(entry).await?;
                            continue;
                        }
                    }
                }
                self.assign(&key, entry).await?;
            }
            Ok(())
        })
    }

    /// Validate the whole model explicitly.
    pub async fn validate(&self) -> Result<ValidationResult> {
        self.inner.session.validate_object(&self.inner.node).await
    }

    pub fn is_valid(&self) -> bool {
        self.inner.node.is_success()
    }

    /// Reset the validation state of the whole model.
    pub fn clear(&self) {
        self.inner.node.clear();
    }
}

impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Model")
            .field("path", &self.path())
            .field("value", &self.to_value())
            .finish()
    }
}
