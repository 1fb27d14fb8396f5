use std::{
    cell::{Cell, RefCell},
    fmt,
    rc::{Rc, Weak},
    str::FromStr,
};

use parse_display::Display;

use crate::{
    event::{EventBus, Observable},
    Error,
};


/// Minimal DOM-like element: a node in a tree that accepts named event listeners.
///
/// Cloning yields another handle to the same node. Equality is identity.
#[derive(Clone)]
pub struct Element(Rc<ElementNode>);

struct ElementNode {
    tag: String,
    id: RefCell<Option<String>>,
    classes: RefCell<Vec<String>>,
    html: RefCell<String>,
    parent: RefCell<Weak<ElementNode>>,
    children: RefCell<Vec<Element>>,
    listeners: EventBus<DomEvent>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self(Rc::new(ElementNode {
            tag: tag.to_ascii_lowercase(),
            id: RefCell::new(None),
            classes: RefCell::new(Vec::new()),
            html: RefCell::new(String::new()),
            parent: RefCell::new(Weak::new()),
            children: RefCell::new(Vec::new()),
            listeners: EventBus::new(),
        }))
    }
    pub fn with_id(self, id: &str) -> Self {
        self.set_id(Some(id));
        self
    }
    pub fn with_class(self, class: &str) -> Self {
        self.add_class(class);
        self
    }

    pub fn ptr_eq(this: &Self, other: &Self) -> bool {
        Rc::ptr_eq(&this.0, &other.0)
    }

    pub fn tag(&self) -> &str {
        &self.0.tag
    }
    pub fn id(&self) -> Option<String> {
        self.0.id.borrow().clone()
    }
    pub fn set_id(&self, id: Option<&str>) {
        *self.0.id.borrow_mut() = id.map(str::to_string);
    }
    pub fn has_class(&self, class: &str) -> bool {
        self.0.classes.borrow().iter().any(|c| c == class)
    }
    pub fn add_class(&self, class: &str) {
        if !self.has_class(class) {
            self.0.classes.borrow_mut().push(class.to_string());
        }
    }
    pub fn remove_class(&self, class: &str) {
        self.0.classes.borrow_mut().retain(|c| c != class);
    }
    pub fn classes(&self) -> Vec<String> {
        self.0.classes.borrow().clone()
    }

    pub fn html(&self) -> String {
        self.0.html.borrow().clone()
    }
    pub fn set_html(&self, html: impl Into<String>) {
        *self.0.html.borrow_mut() = html.into();
    }

    pub fn parent(&self) -> Option<Element> {
        self.0.parent.borrow().upgrade().map(Element)
    }
    pub fn children(&self) -> Vec<Element> {
        self.0.children.borrow().clone()
    }

    /// Moves `child` under this element, detaching it from its previous parent.
    pub fn append_child(&self, child: &Element) {
        child.detach();
        *child.0.parent.borrow_mut() = Rc::downgrade(&self.0);
        self.0.children.borrow_mut().push(child.clone());
    }

    /// Removes this element from its parent. Returns `false` if it had none.
    pub fn detach(&self) -> bool {
        let Some(parent) = self.parent() else {
            return false;
        };
        parent
            .0
            .children
            .borrow_mut()
            .retain(|c| !Element::ptr_eq(c, self));
        *self.0.parent.borrow_mut() = Weak::new();
        true
    }

    /// Returns `true` if `other` is this element or one of its descendants.
    pub fn contains(&self, other: &Element) -> bool {
        other.ancestors_and_self().any(|e| Element::ptr_eq(&e, self))
    }

    /// This element followed by its ancestors, innermost first.
    pub fn ancestors_and_self(&self) -> impl Iterator<Item = Element> {
        std::iter::successors(Some(self.clone()), Element::parent)
    }

    pub fn matches(&self, selector: &Selector) -> bool {
        match selector {
            Selector::Class(class) => self.has_class(class),
            Selector::Id(id) => self.0.id.borrow().as_deref() == Some(id.as_str()),
            Selector::Tag(tag) => self.0.tag.eq_ignore_ascii_case(tag),
        }
    }

    /// Dispatches an event of `kind` to this element's listeners, then bubbles it up through
    /// its ancestors until a listener stops propagation.
    pub fn trigger(&self, kind: &str) {
        let stopped = Rc::new(Cell::new(false));
        let kind: Rc<str> = kind.into();
        tracing::trace!(kind = &*kind, target = %self, "trigger");
        for current in self.ancestors_and_self() {
            let e = DomEvent {
                kind: kind.clone(),
                target: self.clone(),
                current_target: current.clone(),
                stopped: stopped.clone(),
            };
            current.0.listeners.emit(&kind, &e);
            if stopped.get() {
                break;
            }
        }
    }
}

impl Observable for Element {
    type Event = DomEvent;
    fn events(&self) -> &EventBus<DomEvent> {
        &self.0.listeners
    }
}

impl Default for Element {
    fn default() -> Self {
        Self::new("div")
    }
}
impl PartialEq for Element {
    fn eq(&self, other: &Self) -> bool {
        Self::ptr_eq(self, other)
    }
}
impl Eq for Element {}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<{}", self.0.tag)?;
        if let Some(id) = &*self.0.id.borrow() {
            write!(f, " id=\"{id}\"")?;
        }
        let classes = self.0.classes.borrow();
        if !classes.is_empty() {
            write!(f, " class=\"{}\"", classes.join(" "))?;
        }
        write!(f, ">")
    }
}
impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Event delivered to element listeners.
#[derive(Clone)]
pub struct DomEvent {
    kind: Rc<str>,
    target: Element,
    current_target: Element,
    stopped: Rc<Cell<bool>>,
}
impl DomEvent {
    pub fn kind(&self) -> &str {
        &self.kind
    }
    /// The element the event was triggered on.
    pub fn target(&self) -> &Element {
        &self.target
    }
    /// The element whose listener is running, or the element matched by a delegated selector.
    pub fn current_target(&self) -> &Element {
        &self.current_target
    }
    pub fn stop_propagation(&self) {
        self.stopped.set(true);
    }
    pub fn is_propagation_stopped(&self) -> bool {
        self.stopped.get()
    }
    pub(crate) fn with_current_target(&self, current_target: Element) -> Self {
        Self {
            current_target,
            ..self.clone()
        }
    }
}
impl fmt::Debug for DomEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DomEvent")
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("current_target", &self.current_target)
            .finish()
    }
}

/// Simple selector: `.class`, `#id` or a tag name.
#[derive(Display, Debug, Clone, PartialEq, Eq, Hash)]
pub enum Selector {
    #[display(".{0}")]
    Class(String),
    #[display("#{0}")]
    Id(String),
    #[display("{0}")]
    Tag(String),
}

impl FromStr for Selector {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || Error::InvalidDescriptor {
            text: s.to_string(),
        };
        let s = s.trim();
        let (make, name): (fn(String) -> Selector, &str) = if let Some(name) = s.strip_prefix('.')
        {
            (Selector::Class, name)
        } else if let Some(name) = s.strip_prefix('#') {
            (Selector::Id, name)
        } else {
            (Selector::Tag, s)
        };
        if name.is_empty() || !name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_') {
            return Err(invalid());
        }
        Ok(make(name.to_string()))
    }
}
