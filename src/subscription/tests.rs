use crate::{attrs, dom::Element, event::ALL, Collection, EventBus, Model, Observable, View};
use assert_call::{call, CallRecorder};

#[test]
fn bus_listener_lives_while_subscribed() {
    let mut cr = CallRecorder::new();
    let bus = EventBus::<u32>::new();
    let s = bus.subscribe("tick", |n| call!("tick {n}"));
    bus.emit("tick", &1);
    cr.verify("tick 1");

    drop(s);
    bus.emit("tick", &2);
    cr.verify(());
    assert_eq!(bus.listener_count("tick"), 0);
}

#[test]
fn subscription_outlives_bus() {
    let mut cr = CallRecorder::new();
    let bus = EventBus::<u32>::new();
    let s = bus.subscribe("tick", |_| call!("tick"));
    drop(bus);
    drop(s);
    cr.verify(());
}

#[test]
fn relay_released_when_member_leaves() {
    let tom = Model::new(attrs! { "name" => "Tom" });
    let c = Collection::new();
    c.add(&tom);
    assert_eq!(tom.events().listener_count(ALL), 1);

    c.remove(&tom);
    assert_eq!(tom.events().listener_count(ALL), 0);
}

#[test]
fn relay_released_when_collection_dropped() {
    let tom = Model::new(attrs! { "name" => "Tom" });
    let c = Collection::from_models([tom.clone()]);
    drop(c);
    assert_eq!(tom.events().listener_count(ALL), 0);
}

#[test]
fn delegation_released_when_view_dropped() {
    let el = Element::new("button");
    let view = View::builder()
        .element(el.clone())
        .event_fn("click", |_, _| {})
        .event_fn("keyup", |_, _| {})
        .build()
        .unwrap();
    assert_eq!(el.events().listener_count("click"), 1);
    assert_eq!(el.events().listener_count("keyup"), 1);

    drop(view);
    assert_eq!(el.events().listener_count("click"), 0);
    assert_eq!(el.events().listener_count("keyup"), 0);
}

#[test]
fn listen_to_released_by_stop_listening() {
    let mut cr = CallRecorder::new();
    let model = Model::default();
    let view = View::builder().build().unwrap();
    view.listen_to(&model, "change", |_, _| call!("change"));
    assert_eq!(model.events().listener_count("change"), 1);

    view.stop_listening();
    assert_eq!(model.events().listener_count("change"), 0);
    model.set("a", 1);
    cr.verify(());
}
