use std::{
    cell::RefCell,
    collections::HashMap,
    fmt,
    rc::{Rc, Weak},
    str::FromStr,
};

use crate::{
    dom::{DomEvent, Element, Selector},
    event::{EventBus, Observable},
    Collection, Error, Model, Result, Subscription,
};


pub type ViewHandler = Rc<dyn Fn(&View, &DomEvent)>;
pub type RenderFn = Rc<dyn Fn(&View)>;

/// Turns a model's JSON representation into markup.
pub type TemplateFn = Rc<dyn Fn(&serde_json::Value) -> String>;

/// Event name with an optional delegation selector, written `"click"` or `"click .dog"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EventDescriptor {
    pub event: String,
    pub selector: Option<Selector>,
}

impl FromStr for EventDescriptor {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        let text = s.trim();
        let (event, selector) = match text.split_once(char::is_whitespace) {
            Some((event, selector)) => (event, Some(selector.parse::<Selector>()?)),
            None => (text, None),
        };
        if event.is_empty() {
            return Err(Error::InvalidDescriptor {
                text: s.to_string(),
            });
        }
        Ok(Self {
            event: event.to_string(),
            selector,
        })
    }
}
impl fmt::Display for EventDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.selector {
            Some(selector) => write!(f, "{} {selector}", self.event),
            None => write!(f, "{}", self.event),
        }
    }
}

/// Payload of the events emitted by a [`View`].
#[derive(Debug, Clone)]
pub enum ViewEvent {
    /// Emitted as `"render"` after [`View::render`].
    Render,
    /// Emitted as `"element"` after [`View::set_element`] swapped the bound element.
    Element { previous: Element },
    /// Emitted as `"remove"` after [`View::remove`].
    Remove,
}

/// Binds a fixed set of declared event handlers to a swappable element.
///
/// At any time exactly the handlers declared for the currently bound element are attached.
/// Cloning yields another handle to the same view.
#[derive(Clone)]
pub struct View(Rc<ViewNode>);

struct ViewNode {
    el: RefCell<Element>,
    bindings: Vec<(EventDescriptor, ViewHandler)>,
    delegations: RefCell<Vec<Subscription>>,
    listening: RefCell<Vec<Subscription>>,
    model: Option<Model>,
    collection: Option<Collection>,
    template: Option<TemplateFn>,
    render: Option<RenderFn>,
    events: EventBus<ViewEvent>,
}

impl View {
    pub fn builder() -> ViewBuilder {
        ViewBuilder::default()
    }

    /// The currently bound element.
    pub fn el(&self) -> Element {
        self.0.el.borrow().clone()
    }
    pub fn model(&self) -> Option<&Model> {
        self.0.model.as_ref()
    }
    pub fn collection(&self) -> Option<&Collection> {
        self.0.collection.as_ref()
    }
    pub fn descriptors(&self) -> impl Iterator<Item = &EventDescriptor> {
        self.0.bindings.iter().map(|(d, _)| d)
    }

    /// Rebinds the view to `el`.
    ///
    /// All declared handlers are detached from the previous element before any is attached to
    /// `el`, so after the call events on the previous element reach no handler of this view.
    pub fn set_element(&self, el: Element) {
        self.undelegate_events();
        let previous = self.0.el.replace(el);
        self.delegate_events();
        tracing::debug!(from = %previous, to = %self.el(), "view set_element");
        self.0.events.emit("element", &ViewEvent::Element { previous });
    }

    /// Attaches every declared handler to the bound element, replacing earlier attachments.
    pub fn delegate_events(&self) {
        self.undelegate_events();
        let el = self.el();
        let delegations: Vec<Subscription> = self
            .0
            .bindings
            .iter()
            .map(|(descriptor, handler)| self.0.delegate(&el, descriptor, handler))
            .collect();
        *self.0.delegations.borrow_mut() = delegations;
    }

    /// Detaches every declared handler from the bound element.
    pub fn undelegate_events(&self) {
        let delegations = std::mem::take(&mut *self.0.delegations.borrow_mut());
        drop(delegations);
    }

    /// Number of handlers currently attached to the bound element.
    pub fn delegation_count(&self) -> usize {
        self.0.delegations.borrow().len()
    }

    /// Runs the render function, or fills the element from the template and model, then
    /// emits `"render"`.
    pub fn render(&self) -> &Self {
        if let Some(render) = &self.0.render {
            render(self);
        } else if let (Some(template), Some(model)) = (&self.0.template, &self.0.model) {
            self.el().set_html(template(&model.to_json()));
        }
        self.0.events.emit("render", &ViewEvent::Render);
        self
    }

    /// Calls `f` with this view whenever `target` emits `name`, until the view stops listening.
    pub fn listen_to<O: Observable>(
        &self,
        target: &O,
        name: &str,
        f: impl Fn(&View, &O::Event) + 'static,
    ) {
        let this = Rc::downgrade(&self.0);
        let s = target.subscribe(name, move |e| {
            if let Some(this) = this.upgrade() {
                f(&View(this), e)
            }
        });
        self.0.listening.borrow_mut().push(s);
    }

    /// Releases every listener registered with [`listen_to`](Self::listen_to).
    pub fn stop_listening(&self) {
        let listening = std::mem::take(&mut *self.0.listening.borrow_mut());
        drop(listening);
    }

    /// Detaches the view from its element and the element from its parent, and stops listening.
    pub fn remove(&self) {
        self.undelegate_events();
        self.stop_listening();
        self.el().detach();
        tracing::debug!(el = %self.el(), "view remove");
        self.0.events.emit("remove", &ViewEvent::Remove);
    }
}

impl ViewNode {
    fn delegate(
        self: &Rc<Self>,
        el: &Element,
        descriptor: &EventDescriptor,
        handler: &ViewHandler,
    ) -> Subscription {
        let this: Weak<Self> = Rc::downgrade(self);
        let selector = descriptor.selector.clone();
        let handler = handler.clone();
        el.subscribe(&descriptor.event, move |e| {
            let Some(this) = this.upgrade() else {
                return;
            };
            let view = View(this);
            match &selector {
                None => handler(&view, e),
                Some(selector) => {
                    if let Some(matched) = delegate_target(e, selector) {
                        handler(&view, &e.with_current_target(matched))
                    }
                }
            }
        })
    }
}

/// Innermost element from the event target up to, but excluding, the listening element that
/// matches `selector`.
fn delegate_target(e: &DomEvent, selector: &Selector) -> Option<Element> {
    e.target()
        .ancestors_and_self()
        .take_while(|el| el != e.current_target())
        .find(|el| el.matches(selector))
}

impl Observable for View {
    type Event = ViewEvent;
    fn events(&self) -> &EventBus<ViewEvent> {
        &self.0.events
    }
}

impl PartialEq for View {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
impl Eq for View {}

impl fmt::Debug for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("el", &*self.0.el.borrow())
            .field(
                "events",
                &self.0.bindings.iter().map(|(d, _)| d.to_string()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Options for building a [`View`].
///
/// Event descriptors refer to handlers by name; [`build`](Self::build) fails if a name was not
/// registered with [`handler`](Self::handler).
#[derive(Default)]
pub struct ViewBuilder {
    el: Option<Element>,
    model: Option<Model>,
    collection: Option<Collection>,
    handlers: HashMap<String, ViewHandler>,
    events: Vec<(String, EventTarget)>,
    template: Option<TemplateFn>,
    render: Option<RenderFn>,
}

enum EventTarget {
    Named(String),
    Inline(ViewHandler),
}

impl ViewBuilder {
    pub fn element(mut self, el: Element) -> Self {
        self.el = Some(el);
        self
    }
    pub fn model(mut self, model: Model) -> Self {
        self.model = Some(model);
        self
    }
    pub fn collection(mut self, collection: Collection) -> Self {
        self.collection = Some(collection);
        self
    }

    /// Registers a named handler that event descriptors can refer to.
    pub fn handler(mut self, name: &str, f: impl Fn(&View, &DomEvent) + 'static) -> Self {
        self.handlers.insert(name.to_string(), Rc::new(f));
        self
    }

    /// Declares that `descriptor` (`"click"`, `"click .dog"`, ...) runs the handler named `handler`.
    pub fn event(mut self, descriptor: &str, handler: &str) -> Self {
        self.events
            .push((descriptor.to_string(), EventTarget::Named(handler.to_string())));
        self
    }

    /// Declares that `descriptor` runs `f`.
    pub fn event_fn(mut self, descriptor: &str, f: impl Fn(&View, &DomEvent) + 'static) -> Self {
        self.events
            .push((descriptor.to_string(), EventTarget::Inline(Rc::new(f))));
        self
    }

    pub fn template(mut self, f: impl Fn(&serde_json::Value) -> String + 'static) -> Self {
        self.template = Some(Rc::new(f));
        self
    }
    pub fn render(mut self, f: impl Fn(&View) + 'static) -> Self {
        self.render = Some(Rc::new(f));
        self
    }

    /// Creates the view bound to the given element, or to a new `<div>`, and attaches its
    /// handlers.
    pub fn build(self) -> Result<View> {
        let mut bindings = Vec::with_capacity(self.events.len());
        for (text, target) in self.events {
            let descriptor: EventDescriptor = text.parse()?;
            let handler = match target {
                EventTarget::Inline(f) => f,
                EventTarget::Named(name) => match self.handlers.get(&name) {
                    Some(f) => f.clone(),
                    None => {
                        return Err(Error::UnknownHandler {
                            descriptor: text,
                            handler: name,
                        });
                    }
                },
            };
            bindings.push((descriptor, handler));
        }
        let view = View(Rc::new(ViewNode {
            el: RefCell::new(self.el.unwrap_or_default()),
            bindings,
            delegations: RefCell::new(Vec::new()),
            listening: RefCell::new(Vec::new()),
            model: self.model,
            collection: self.collection,
            template: self.template,
            render: self.render,
            events: EventBus::new(),
        }));
        view.delegate_events();
        Ok(view)
    }
}
