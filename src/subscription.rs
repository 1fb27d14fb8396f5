use std::rc::{Rc, Weak};

#[cfg(test)]
mod tests;

/// Keeps a listener registered until it is dropped.
///
/// Returned by [`EventBus::subscribe`](crate::EventBus::subscribe) and used internally to hold
/// relayed model events, delegated element events and view listeners.
#[must_use]
pub struct Subscription(Option<Box<dyn FnOnce()>>);

impl Subscription {
    pub fn from_fn(f: impl FnOnce() + 'static) -> Self {
        Subscription(Some(Box::new(f)))
    }

    /// Calls `unsubscribe` on drop, but only if `this` is still alive.
    pub fn from_weak_fn<T: 'static>(this: Weak<T>, unsubscribe: impl FnOnce(Rc<T>) + 'static) -> Self {
        Self::from_fn(move || {
            if let Some(this) = this.upgrade() {
                unsubscribe(this)
            }
        })
    }
}
impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.0.take() {
            f()
        }
    }
}
impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Subscription")
    }
}
