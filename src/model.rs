use std::{
    cell::{Cell, RefCell},
    fmt,
    hash::{Hash, Hasher},
    rc::Rc,
};

use indexmap::IndexMap;
use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::{
    event::{change_event, EventBus, Observable},
    value::attributes_from_json,
    Attributes, IntoAttribute, Result, ValidationError, Value,
};

#[cfg(test)]
mod tests;

thread_local! {
    static NEXT_CLIENT_ID: Cell<u64> = const { Cell::new(1) };
}

/// Identifier assigned to every model when it is created, unique within the thread.
#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[display("c{0}")]
pub struct ClientId(u64);

impl ClientId {
    fn next() -> Self {
        NEXT_CLIENT_ID.with(|id| Self(id.replace(id.get() + 1)))
    }
}

/// Payload of the events emitted by a [`Model`].
#[derive(Debug, Clone)]
pub enum ModelEvent {
    /// Emitted as `"change:<key>"`. `None` means the attribute is absent.
    ChangeAttr {
        model: Model,
        key: String,
        value: Option<Value>,
        previous: Option<Value>,
    },
    /// Emitted as `"change"` once per call that changed at least one attribute.
    Change { model: Model, changed: Vec<String> },
}
impl ModelEvent {
    pub fn model(&self) -> &Model {
        match self {
            ModelEvent::ChangeAttr { model, .. } | ModelEvent::Change { model, .. } => model,
        }
    }
}

/// Key-value attribute store that emits change events.
///
/// Cloning a `Model` yields another handle to the same attributes.
/// Equality is identity.
#[derive(Clone)]
pub struct Model(Rc<ModelNode>);

struct ModelNode {
    cid: ClientId,
    attrs: RefCell<Attributes>,
    previous: RefCell<IndexMap<String, Option<Value>>>,
    events: EventBus<ModelEvent>,
}

impl Model {
    pub fn new(attrs: Attributes) -> Self {
        Self(Rc::new(ModelNode {
            cid: ClientId::next(),
            attrs: RefCell::new(attrs),
            previous: RefCell::new(IndexMap::new()),
            events: EventBus::new(),
        }))
    }

    /// Creates a model whose absent attributes are filled from `defaults`.
    ///
    /// Explicit attributes win over defaults. An explicit attribute whose kind differs from its
    /// default (other than `null`) is rejected.
    pub fn with_defaults(attrs: Attributes, defaults: &Attributes) -> Result<Self, ValidationError> {
        let mut attrs = attrs;
        for (key, default) in defaults {
            match attrs.get(key) {
                Some(value) if !value.is_compatible_with(default) => {
                    return Err(ValidationError {
                        key: key.clone(),
                        expected: default.kind(),
                        found: value.kind(),
                    });
                }
                Some(_) => {}
                None => {
                    attrs.insert(key.clone(), default.clone());
                }
            }
        }
        Ok(Self::new(attrs))
    }

    pub fn builder() -> ModelBuilder {
        ModelBuilder::default()
    }

    /// Creates a model from a JSON object.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        Ok(Self::new(attributes_from_json(json)?))
    }

    pub fn cid(&self) -> ClientId {
        self.0.cid
    }
    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.0, &other.0)
    }

    /// Returns the current value, or `None` if the attribute is absent.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.0.attrs.borrow().get(key).cloned()
    }
    pub fn has(&self, key: &str) -> bool {
        self.0.attrs.borrow().get(key).is_some_and(|v| !v.is_null())
    }
    pub fn len(&self) -> usize {
        self.0.attrs.borrow().len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn keys(&self) -> Vec<String> {
        self.0.attrs.borrow().keys().cloned().collect()
    }
    pub fn attributes(&self) -> Attributes {
        self.0.attrs.borrow().clone()
    }

    /// Returns every attribute in insertion order.
    pub fn to_pairs(&self) -> Vec<(String, Value)> {
        self.0
            .attrs
            .borrow()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
    pub fn to_json(&self) -> serde_json::Value {
        crate::value::attributes_to_json(&self.0.attrs.borrow())
    }

    /// Sets one attribute. Returns `true` if the value changed.
    ///
    /// Setting `None` removes the attribute, so `m.set(k, m.get(k))` never changes anything.
    pub fn set(&self, key: impl Into<String>, value: impl IntoAttribute) -> bool {
        !self.set_many([(key.into(), value)]).is_empty()
    }

    /// Merges several attributes at once.
    ///
    /// After merging, emits `"change:<key>"` for each key whose value differs from the value it
    /// had before the call, then a single `"change"`. Returns the changed keys.
    pub fn set_many<K, V>(&self, attrs: impl IntoIterator<Item = (K, V)>) -> Vec<String>
    where
        K: Into<String>,
        V: IntoAttribute,
    {
        let mut changes = Changes::default();
        {
            let mut current = self.0.attrs.borrow_mut();
            for (key, value) in attrs {
                let key = key.into();
                let value = value.into_attribute();
                let old = match &value {
                    Some(value) => current.insert(key.clone(), value.clone()),
                    None => current.shift_remove(&key),
                };
                changes.record(key, value, old);
            }
        }
        self.commit(changes)
    }

    /// Removes an attribute. Returns `false` if it was absent.
    pub fn unset(&self, key: &str) -> bool {
        let old = self.0.attrs.borrow_mut().shift_remove(key);
        let Some(old) = old else {
            return false;
        };
        let mut changes = Changes::default();
        changes.record(key.to_string(), None, Some(old));
        !self.commit(changes).is_empty()
    }

    /// Removes every attribute, emitting one `"change"` for the whole call.
    pub fn clear(&self) -> Vec<String> {
        let old = std::mem::take(&mut *self.0.attrs.borrow_mut());
        let mut changes = Changes::default();
        for (key, value) in old {
            changes.record(key, None, Some(value));
        }
        self.commit(changes)
    }

    /// Returns the value `key` had before the most recent change, or its current value if the
    /// most recent change did not touch it.
    ///
    /// Inside a change handler this describes the call being dispatched. Once a call returns, it
    /// describes that call even if its handlers changed the model again.
    pub fn previous(&self, key: &str) -> Option<Value> {
        match self.0.previous.borrow().get(key) {
            Some(previous) => previous.clone(),
            None => self.get(key),
        }
    }

    /// Keys changed by the most recent call that changed anything, with the same nesting rule as
    /// [`previous`](Self::previous).
    pub fn changed_keys(&self) -> Vec<String> {
        self.0.previous.borrow().keys().cloned().collect()
    }

    fn commit(&self, changes: Changes) -> Vec<String> {
        let changes = changes.finish();
        if changes.is_empty() {
            return Vec::new();
        }
        let previous: IndexMap<String, Option<Value>> = changes
            .iter()
            .map(|c| (c.key.clone(), c.previous.clone()))
            .collect();
        *self.0.previous.borrow_mut() = previous.clone();
        let changed: Vec<String> = changes.iter().map(|c| c.key.clone()).collect();
        for c in changes {
            let name = change_event(&c.key);
            self.0.events.emit(
                &name,
                &ModelEvent::ChangeAttr {
                    model: self.clone(),
                    key: c.key,
                    value: c.value,
                    previous: c.previous,
                },
            );
        }
        self.0.events.emit(
            "change",
            &ModelEvent::Change {
                model: self.clone(),
                changed: changed.clone(),
            },
        );
        *self.0.previous.borrow_mut() = previous;
        changed
    }
}

impl Observable for Model {
    type Event = ModelEvent;
    fn events(&self) -> &EventBus<ModelEvent> {
        &self.0.events
    }
}

impl PartialEq for Model {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}
impl Eq for Model {}
impl Hash for Model {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.cid.hash(state)
    }
}
impl Default for Model {
    fn default() -> Self {
        Self::new(Attributes::new())
    }
}
impl From<Attributes> for Model {
    fn from(attrs: Attributes) -> Self {
        Self::new(attrs)
    }
}
impl fmt::Debug for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Model({}) ", self.0.cid)?;
        match self.0.attrs.try_borrow() {
            Ok(attrs) => f.debug_map().entries(attrs.iter()).finish(),
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}
impl Serialize for Model {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        match self.0.attrs.try_borrow() {
            Ok(attrs) => Attributes::serialize(&attrs, serializer),
            Err(_) => Err(serde::ser::Error::custom("borrowed")),
        }
    }
}
impl<'de> Deserialize<'de> for Model {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Model, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        Attributes::deserialize(deserializer).map(Model::new)
    }
}

/// Options for building a [`Model`].
#[derive(Default, Debug, Clone)]
pub struct ModelBuilder {
    attrs: Attributes,
    defaults: Attributes,
}
impl ModelBuilder {
    pub fn attributes(mut self, attrs: Attributes) -> Self {
        self.attrs.extend(attrs);
        self
    }
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }
    pub fn defaults(mut self, defaults: Attributes) -> Self {
        self.defaults.extend(defaults);
        self
    }
    pub fn default_value(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.defaults.insert(key.into(), value.into());
        self
    }
    pub fn build(self) -> Result<Model, ValidationError> {
        Model::with_defaults(self.attrs, &self.defaults)
    }
}

struct Change {
    key: String,
    value: Option<Value>,
    previous: Option<Value>,
}

#[derive(Default)]
struct Changes(IndexMap<String, Change>);

impl Changes {
    fn record(&mut self, key: String, value: Option<Value>, previous: Option<Value>) {
        match self.0.get_mut(&key) {
            Some(change) => change.value = value,
            None => {
                self.0.insert(
                    key.clone(),
                    Change {
                        key,
                        value,
                        previous,
                    },
                );
            }
        }
    }
    fn finish(self) -> Vec<Change> {
        self.0
            .into_values()
            .filter(|c| c.value != c.previous)
            .collect()
    }
}
