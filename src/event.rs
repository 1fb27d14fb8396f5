use std::{
    cell::RefCell,
    collections::HashMap,
    rc::Rc,
};

use derive_ex::derive_ex;
use slabmap::SlabMap;

use crate::Subscription;


/// Name under which catch-all listeners are registered.
///
/// Listeners for `"all"` run after the named listeners of every emitted event.
pub const ALL: &str = "all";

pub type Handler<A> = Rc<dyn Fn(&A)>;
pub type AllHandler<A> = Rc<dyn Fn(&str, &A)>;

/// Identifies one registration made with [`EventBus::on`].
///
/// Removing an id twice, or an id whose slot has since been reused, does nothing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ListenerId {
    key: usize,
    seq: u64,
}

/// Synchronous named-event dispatcher.
///
/// Listeners of a name fire in registration order. `emit` works on a snapshot taken when it
/// starts, so listeners added or removed by a running listener only affect later emits.
#[derive_ex(Clone, bound())]
pub struct EventBus<A: 'static>(Rc<RefCell<BusData<A>>>);

impl<A: 'static> EventBus<A> {
    pub fn new() -> Self {
        Self(Rc::new(RefCell::new(BusData {
            listeners: SlabMap::new(),
            names: HashMap::new(),
            next_seq: 0,
        })))
    }

    pub fn on(&self, name: &str, f: impl Fn(&A) + 'static) -> ListenerId {
        self.on_handler(name, Rc::new(f))
    }

    /// Registers a shared handler so it can later be removed with [`off_handler`](Self::off_handler).
    pub fn on_handler(&self, name: &str, handler: Handler<A>) -> ListenerId {
        self.0
            .borrow_mut()
            .insert(name, Callback::Named(handler), false)
    }

    /// Registers a listener that is removed right before its first call.
    pub fn once(&self, name: &str, f: impl Fn(&A) + 'static) -> ListenerId {
        self.0
            .borrow_mut()
            .insert(name, Callback::Named(Rc::new(f)), true)
    }

    /// Registers a catch-all listener that receives the name of every emitted event.
    pub fn on_all(&self, f: impl Fn(&str, &A) + 'static) -> ListenerId {
        self.0
            .borrow_mut()
            .insert(ALL, Callback::All(Rc::new(f)), false)
    }

    /// Like [`on`](Self::on), but the listener lives only as long as the returned [`Subscription`].
    pub fn subscribe(&self, name: &str, f: impl Fn(&A) + 'static) -> Subscription {
        let id = self.on(name, f);
        self.to_subscription(id)
    }

    /// Like [`on_all`](Self::on_all), but the listener lives only as long as the returned [`Subscription`].
    pub fn subscribe_all(&self, f: impl Fn(&str, &A) + 'static) -> Subscription {
        let id = self.on_all(f);
        self.to_subscription(id)
    }

    fn to_subscription(&self, id: ListenerId) -> Subscription {
        Subscription::from_weak_fn(Rc::downgrade(&self.0), move |data: Rc<RefCell<BusData<A>>>| {
            data.borrow_mut().remove(id);
        })
    }

    /// Removes a listener. Returns `false` if it was already removed.
    pub fn off(&self, id: ListenerId) -> bool {
        self.0.borrow_mut().remove(id)
    }

    /// Removes every registration of `handler` under `name`.
    ///
    /// Returns `false` if `handler` was not registered.
    pub fn off_handler(&self, name: &str, handler: &Handler<A>) -> bool {
        let mut data = self.0.borrow_mut();
        let keys: Vec<usize> = data
            .keys(name)
            .filter(|&key| match data.listeners.get(key).map(|l| &l.callback) {
                Some(Callback::Named(h)) => std::ptr::addr_eq(Rc::as_ptr(h), Rc::as_ptr(handler)),
                _ => false,
            })
            .collect();
        for &key in &keys {
            data.remove_key(key);
        }
        !keys.is_empty()
    }

    /// Removes the listeners of `name`, or all listeners if `name` is `None`.
    pub fn off_all(&self, name: Option<&str>) {
        let mut data = self.0.borrow_mut();
        match name {
            Some(name) => {
                if let Some(keys) = data.names.remove(name) {
                    for key in keys {
                        data.listeners.remove(key);
                    }
                }
            }
            None => {
                data.listeners = SlabMap::new();
                data.names.clear();
            }
        }
    }

    pub fn listener_count(&self, name: &str) -> usize {
        self.0.borrow().names.get(name).map_or(0, |keys| keys.len())
    }
    pub fn has_listeners(&self, name: &str) -> bool {
        self.listener_count(name) != 0 || self.listener_count(ALL) != 0
    }

    /// Invokes the listeners of `name`, then the catch-all listeners.
    pub fn emit(&self, name: &str, args: &A) {
        let callbacks = self.0.borrow_mut().snapshot(name);
        tracing::trace!(event = name, listeners = callbacks.len(), "emit");
        for callback in callbacks {
            match callback {
                Callback::Named(f) => f(args),
                Callback::All(f) => f(name, args),
            }
        }
    }
}
impl<A: 'static> Default for EventBus<A> {
    fn default() -> Self {
        Self::new()
    }
}
impl<A: 'static> std::fmt::Debug for EventBus<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0.try_borrow() {
            Ok(data) => f
                .debug_map()
                .entries(data.names.iter().map(|(name, keys)| (name, keys.len())))
                .finish(),
            Err(_) => write!(f, "<borrowed>"),
        }
    }
}

/// Returns the name of the event emitted when attribute `key` changes.
pub fn change_event(key: &str) -> String {
    format!("change:{key}")
}

#[derive_ex(Clone, bound())]
enum Callback<A: 'static> {
    Named(Handler<A>),
    All(AllHandler<A>),
}

struct Listener<A: 'static> {
    name: String,
    seq: u64,
    once: bool,
    callback: Callback<A>,
}

struct BusData<A: 'static> {
    listeners: SlabMap<Listener<A>>,
    names: HashMap<String, Vec<usize>>,
    next_seq: u64,
}
impl<A: 'static> BusData<A> {
    fn insert(&mut self, name: &str, callback: Callback<A>, once: bool) -> ListenerId {
        let seq = self.next_seq;
        self.next_seq += 1;
        let key = self.listeners.insert(Listener {
            name: name.to_string(),
            seq,
            once,
            callback,
        });
        self.names.entry(name.to_string()).or_default().push(key);
        ListenerId { key, seq }
    }
    fn keys<'a>(&'a self, name: &str) -> impl Iterator<Item = usize> + 'a {
        self.names.get(name).into_iter().flatten().copied()
    }
    fn remove(&mut self, id: ListenerId) -> bool {
        match self.listeners.get(id.key) {
            Some(l) if l.seq == id.seq => {
                self.remove_key(id.key);
                true
            }
            _ => false,
        }
    }
    fn remove_key(&mut self, key: usize) {
        let Some(listener) = self.listeners.remove(key) else {
            return;
        };
        if let Some(keys) = self.names.get_mut(&listener.name) {
            keys.retain(|&k| k != key);
            if keys.is_empty() {
                self.names.remove(&listener.name);
            }
        }
    }
    fn snapshot(&mut self, name: &str) -> Vec<Callback<A>> {
        let mut keys: Vec<usize> = Vec::new();
        if name != ALL {
            keys.extend(self.keys(name));
        }
        keys.extend(self.keys(ALL));
        let mut callbacks = Vec::with_capacity(keys.len());
        for key in keys {
            let Some(listener) = self.listeners.get(key) else {
                continue;
            };
            callbacks.push(listener.callback.clone());
            if listener.once {
                self.remove_key(key);
            }
        }
        callbacks
    }
}

/// Entities that own an [`EventBus`] and expose it through delegating methods.
pub trait Observable {
    type Event: 'static;

    fn events(&self) -> &EventBus<Self::Event>;

    fn on(&self, name: &str, f: impl Fn(&Self::Event) + 'static) -> ListenerId {
        self.events().on(name, f)
    }
    fn once(&self, name: &str, f: impl Fn(&Self::Event) + 'static) -> ListenerId {
        self.events().once(name, f)
    }
    fn off(&self, id: ListenerId) -> bool {
        self.events().off(id)
    }
    fn subscribe(&self, name: &str, f: impl Fn(&Self::Event) + 'static) -> Subscription {
        self.events().subscribe(name, f)
    }
    fn emit(&self, name: &str, args: &Self::Event) {
        self.events().emit(name, args)
    }
}
