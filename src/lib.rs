//! Observable models, collections and element-bound views.
//!
//! - [`Model`]: key-value attributes that emit `"change:<key>"` and `"change"` events.
//! - [`Collection`]: ordered set of models that relays the events of its members.
//! - [`View`]: declared event handlers bound to a swappable [`dom::Element`].
//!
//! Every entity owns an [`EventBus`] and exposes it through [`Observable`].
//! Everything is single-threaded and dispatch is synchronous.
//!
//! # Tracing
//!
//! Emits, membership changes and rebinding are reported through [`tracing`].
//! No subscriber is installed by this crate.

mod collection;
pub mod dom;
mod error;
pub mod event;
mod model;
mod subscription;
mod value;
mod view;

pub use collection::*;
pub use error::*;
pub use event::{EventBus, ListenerId, Observable};
pub use model::*;
pub use subscription::*;
pub use value::*;
pub use view::*;

#[cfg(doctest)]
mod tests_readme;
