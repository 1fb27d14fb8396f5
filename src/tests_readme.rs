// #![include_doc("../README.md", start)]
//! # vertebra
//!
//! `vertebra` provides observable models, collections and element-bound views, the building blocks of a
//! model/view UI layer.
//!
//! ## Features
//!
//! - Single-threaded, synchronous event dispatch
//! - `Model`: key-value attributes with defaults and per-key change events
//! - `Collection`: ordered set of models that relays member events
//! - `View`: declared event handlers bound to a swappable element
//!
//! ### Models and collections
//!
//! ```rust
//! use vertebra::{attrs, Collection, Model, Observable};
//!
//! let people = Collection::new();
//! people.on("change:gid", |e| println!("changed: {:?}", e.model()));
//!
//! let tom = Model::new(attrs! { "name" => "Tom", "gid" => 5, "can" => "do" });
//! people.add(&tom);
//!
//! tom.set("gid", 6); // prints "changed: ..."
//! assert_eq!(people.pairs().count(), 3);
//! ```
//!
//! Setting an attribute to the value it already has emits nothing. Setting several attributes in one call
//! emits one `"change:<key>"` per changed key and a single `"change"`.
//!
//! ### Views
//!
//! ```rust
//! use vertebra::{dom::Element, View};
//!
//! let button1 = Element::new("button");
//! let button2 = Element::new("button").with_class("dog");
//!
//! let view = View::builder()
//!     .element(button1.clone())
//!     .event_fn("click", |view, e| println!("{}", &view.el() == e.target()))
//!     .build()
//!     .unwrap();
//!
//! view.set_element(button2.clone());
//!
//! button1.trigger("click"); // prints nothing
//! button2.trigger("click"); // prints "true"
//! ```
//!
//! ## License
//!
//! This project is dual licensed under Apache-2.0/MIT.
//!
//! ## Contribution
//!
//! Unless you explicitly state otherwise, any contribution intentionally submitted for inclusion in the work by you, as defined in the Apache-2.0 license, shall be dual licensed as above, without any additional terms or conditions.
// #![include_doc("../README.md", end)]
