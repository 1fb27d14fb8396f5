use std::{
    cell::RefCell,
    fmt,
    rc::{Rc, Weak},
};

use serde::{Serialize, Serializer};

use crate::{
    event::{EventBus, Observable, ALL},
    model::{ClientId, ModelEvent},
    Attributes, Model, Subscription, Value,
};


/// Payload of the events emitted by a [`Collection`].
#[derive(Debug, Clone)]
pub enum CollectionEvent {
    /// Emitted as `"add"` when a model becomes a member at `index`.
    Add { model: Model, index: usize },
    /// Emitted as `"remove"` when a model leaves the collection from `index`.
    Remove { model: Model, index: usize },
    /// Emitted as `"reset"` after the whole membership was replaced.
    Reset { previous: Vec<Model> },
    /// A member's event, re-emitted under the same name (`"change"`, `"change:<key>"`, ...).
    Member { model: Model, event: ModelEvent },
}
impl CollectionEvent {
    pub fn model(&self) -> Option<&Model> {
        match self {
            CollectionEvent::Add { model, .. }
            | CollectionEvent::Remove { model, .. }
            | CollectionEvent::Member { model, .. } => Some(model),
            CollectionEvent::Reset { .. } => None,
        }
    }
}

/// Ordered set of models, keyed by identity.
///
/// Member change events are relayed as the collection's own events, so observers of the
/// collection see every member mutation without subscribing to each model.
/// Cloning a `Collection` yields another handle to the same membership.
#[derive(Clone, Default)]
pub struct Collection(Rc<CollectionNode>);

#[derive(Default)]
struct CollectionNode {
    members: RefCell<Vec<Member>>,
    events: EventBus<CollectionEvent>,
}

struct Member {
    model: Model,
    _relay: Subscription,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a collection holding `models` in order. Duplicates are skipped.
    pub fn from_models(models: impl IntoIterator<Item = Model>) -> Self {
        let this = Self::new();
        {
            let mut members = this.0.members.borrow_mut();
            for model in models {
                if !members.iter().any(|m| m.model == model) {
                    members.push(this.0.member(model));
                }
            }
        }
        this
    }

    pub fn len(&self) -> usize {
        self.0.members.borrow().len()
    }
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
    pub fn contains(&self, model: &Model) -> bool {
        self.index_of(model).is_some()
    }
    pub fn index_of(&self, model: &Model) -> Option<usize> {
        self.0
            .members
            .borrow()
            .iter()
            .position(|m| &m.model == model)
    }
    pub fn at(&self, index: usize) -> Option<Model> {
        self.0.members.borrow().get(index).map(|m| m.model.clone())
    }
    pub fn get(&self, cid: ClientId) -> Option<Model> {
        self.0
            .members
            .borrow()
            .iter()
            .find(|m| m.model.cid() == cid)
            .map(|m| m.model.clone())
    }
    pub fn models(&self) -> Vec<Model> {
        self.0
            .members
            .borrow()
            .iter()
            .map(|m| m.model.clone())
            .collect()
    }

    /// Appends `model` unless it is already a member.
    ///
    /// Returns `false`, without emitting `"add"`, for a model that is already a member.
    pub fn add(&self, model: &Model) -> bool {
        self.insert(usize::MAX, model)
    }

    /// Inserts `model` at `index` (clamped to the length) unless it is already a member.
    pub fn insert(&self, index: usize, model: &Model) -> bool {
        let index = {
            let mut members = self.0.members.borrow_mut();
            if members.iter().any(|m| &m.model == model) {
                return false;
            }
            let index = index.min(members.len());
            members.insert(index, self.0.member(model.clone()));
            index
        };
        tracing::debug!(cid = %model.cid(), index, "collection add");
        self.0.events.emit(
            "add",
            &CollectionEvent::Add {
                model: model.clone(),
                index,
            },
        );
        true
    }

    /// Removes `model` and stops relaying its events.
    ///
    /// Returns the index it occupied, or `None` if it was not a member.
    pub fn remove(&self, model: &Model) -> Option<usize> {
        let (index, member) = {
            let mut members = self.0.members.borrow_mut();
            let index = members.iter().position(|m| &m.model == model)?;
            (index, members.remove(index))
        };
        drop(member);
        tracing::debug!(cid = %model.cid(), index, "collection remove");
        self.0.events.emit(
            "remove",
            &CollectionEvent::Remove {
                model: model.clone(),
                index,
            },
        );
        Some(index)
    }

    /// Replaces the whole membership, emitting a single `"reset"` instead of `"add"`/`"remove"`.
    pub fn reset(&self, models: impl IntoIterator<Item = Model>) {
        let mut members = Vec::new();
        for model in models {
            if !members.iter().any(|m: &Member| m.model == model) {
                members.push(self.0.member(model));
            }
        }
        let previous = std::mem::replace(&mut *self.0.members.borrow_mut(), members);
        let previous: Vec<Model> = previous.into_iter().map(|m| m.model).collect();
        tracing::debug!(len = self.len(), "collection reset");
        self.0
            .events
            .emit("reset", &CollectionEvent::Reset { previous });
    }

    /// Iterates `(model, key, value)` for every attribute of every member, in collection order
    /// then attribute order.
    ///
    /// The iterator works on the membership at the time of the call; each call starts over.
    pub fn pairs(&self) -> impl Iterator<Item = (Model, String, Value)> {
        self.models().into_iter().flat_map(|model| {
            model
                .to_pairs()
                .into_iter()
                .map(move |(key, value)| (model.clone(), key, value))
        })
    }

    /// Values of `key` for each member, `None` where the member lacks it.
    pub fn pluck(&self, key: &str) -> Vec<Option<Value>> {
        self.0
            .members
            .borrow()
            .iter()
            .map(|m| m.model.get(key))
            .collect()
    }

    /// Members whose attributes contain every entry of `attrs`.
    pub fn filter_where(&self, attrs: &Attributes) -> Vec<Model> {
        self.0
            .members
            .borrow()
            .iter()
            .filter(|m| matches_attrs(&m.model, attrs))
            .map(|m| m.model.clone())
            .collect()
    }

    /// First member whose attributes contain every entry of `attrs`.
    pub fn find_where(&self, attrs: &Attributes) -> Option<Model> {
        self.0
            .members
            .borrow()
            .iter()
            .find(|m| matches_attrs(&m.model, attrs))
            .map(|m| m.model.clone())
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::Value::Array(
            self.0
                .members
                .borrow()
                .iter()
                .map(|m| m.model.to_json())
                .collect(),
        )
    }
}

impl CollectionNode {
    fn member(self: &Rc<Self>, model: Model) -> Member {
        let this = Rc::downgrade(self);
        let relay = model.events().subscribe_all(move |name, e| relay(&this, name, e));
        Member {
            model,
            _relay: relay,
        }
    }
}

fn relay(this: &Weak<CollectionNode>, name: &str, e: &ModelEvent) {
    if name == ALL {
        return;
    }
    if let Some(this) = this.upgrade() {
        this.events.emit(
            name,
            &CollectionEvent::Member {
                model: e.model().clone(),
                event: e.clone(),
            },
        );
    }
}

fn matches_attrs(model: &Model, attrs: &Attributes) -> bool {
    attrs
        .iter()
        .all(|(key, value)| model.get(key).as_ref() == Some(value))
}

impl Observable for Collection {
    type Event = CollectionEvent;
    fn events(&self) -> &EventBus<CollectionEvent> {
        &self.0.events
    }
}

impl PartialEq for Collection {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for Collection {}

impl FromIterator<Model> for Collection {
    fn from_iter<I: IntoIterator<Item = Model>>(iter: I) -> Self {
        Self::from_models(iter)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0.members.try_borrow() {
            Ok(members) => f.debug_list().entries(members.iter().map(|m| &m.model)).finish(),
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}

impl Serialize for Collection {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.0.members.try_borrow() {
            Ok(members) => serializer.collect_seq(members.iter().map(|m| &m.model)),
            Err(_) => Err(serde::ser::Error::custom("borrowed")),
        }
    }
}
