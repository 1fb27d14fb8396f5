use assert_call::{call, CallRecorder};
use rstest::rstest;
use vertebra::{attrs, dom::Element, Collection, Model, ModelEvent, Observable, Value, View};

fn people() -> [Model; 3] {
    [
        Model::new(attrs! { "name" => "Tom", "gid" => 5, "can" => "do" }),
        Model::new(attrs! { "name" => "Rob", "gid" => 10, "can" => "dont" }),
        Model::new(attrs! { "name" => "Tim", "gid" => 10, "can" => "do" }),
    ]
}

fn record(model: &Model) {
    model.events().on_all(|name, e| match e {
        ModelEvent::ChangeAttr {
            value, previous, ..
        } => call!("{name} {previous:?} -> {value:?}"),
        ModelEvent::Change { changed, .. } => call!("{name} {}", changed.join(",")),
    });
}

#[rstest]
#[case(Some(Value::from("Tom")))]
#[case(Some(Value::from(5)))]
#[case(Some(Value::Null))]
#[case(Some(Value::from(attrs! { "a" => 1 })))]
#[case(None)]
fn set_same_value_emits_nothing(#[case] value: Option<Value>) {
    let mut cr = CallRecorder::new();
    let model = Model::new(attrs! { "other" => 1 });
    if let Some(value) = value {
        model.set("k", value);
    }
    let before = model.to_pairs();
    record(&model);
    let current = model.get("k");
    assert!(!model.set("k", current));
    cr.verify(());
    assert_eq!(model.to_pairs(), before);
}

#[test]
fn atomic_set_emits_one_change() {
    let mut cr = CallRecorder::new();
    let model = Model::new(attrs! { "a" => 1, "b" => 2 });
    record(&model);
    model.set_many(attrs! { "a" => 1, "b" => 3, "c" => true });
    cr.verify([
        "change:b Some(Number(2.0)) -> Some(Number(3.0))",
        "change:c None -> Some(Bool(true))",
        "change b,c",
    ]);
}

#[test]
fn add_twice_keeps_one_member() {
    let mut cr = CallRecorder::new();
    let [tom, ..] = people();
    let c = Collection::new();
    c.on("add", |e| call!("add {}", e.model().unwrap().get("name").unwrap()));
    assert!(c.add(&tom));
    assert!(!c.add(&tom));
    cr.verify("add Tom");
    assert_eq!(c.len(), 1);
}

#[test]
fn member_change_is_relayed() {
    let mut cr = CallRecorder::new();
    let [tom, rob, _] = people();
    let c = Collection::from_models([tom.clone(), rob]);
    let tom0 = tom.clone();
    c.on("change", move |e| call!("change {}", e.model() == Some(&tom0)));
    tom.set("x", 1);
    cr.verify("change true");
}

#[rstest]
fn remove_then_restore_keeps_pairs(#[values(0, 1, 2)] which: usize) {
    let people = people();
    let c = Collection::from_models(people.clone());
    let before: Vec<_> = c.pairs().collect();

    let index = c.remove(&people[which]).unwrap();
    assert_eq!(index, which);
    assert_eq!(c.pairs().count(), 6);
    assert!(c.insert(index, &people[which]));

    assert_eq!(c.pairs().collect::<Vec<_>>(), before);
}

#[test]
fn remove_last_then_add_keeps_pairs() {
    let people = people();
    let c = Collection::from_models(people.clone());
    let before: Vec<_> = c.pairs().collect();
    c.remove(&people[2]);
    c.add(&people[2]);
    assert_eq!(c.pairs().collect::<Vec<_>>(), before);
}

#[test]
fn set_element_rebinds_click() {
    let mut cr = CallRecorder::new();
    let a = Element::new("button");
    let b = Element::new("button").with_class("dog");
    let view = View::builder()
        .element(a.clone())
        .event_fn("click", |view, e| call!("click {}", &view.el() == e.target()))
        .build()
        .unwrap();

    view.set_element(b.clone());
    a.trigger("click");
    cr.verify(());
    b.trigger("click");
    cr.verify("click true");
}

#[test]
fn rebind_to_ancestor_still_sees_bubbled_events() {
    let mut cr = CallRecorder::new();
    let a = Element::new("button");
    let b = Element::new("div");
    b.append_child(&a);
    let view = View::builder()
        .element(a.clone())
        .event_fn("click", |view, e| {
            call!(
                "click target_is_el={} current_is_el={}",
                &view.el() == e.target(),
                &view.el() == e.current_target()
            )
        })
        .build()
        .unwrap();

    view.set_element(b.clone());
    assert_eq!(a.events().listener_count("click"), 0);
    a.trigger("click");
    cr.verify("click target_is_el=false current_is_el=true");
    b.trigger("click");
    cr.verify("click target_is_el=true current_is_el=true");
}

#[test]
fn pairs_of_three_people() {
    let people = people();
    assert_eq!(
        people[0].to_pairs(),
        vec![
            ("name".to_string(), Value::from("Tom")),
            ("gid".to_string(), Value::from(5)),
            ("can".to_string(), Value::from("do")),
        ]
    );

    let c = Collection::new();
    for p in &people {
        c.add(p);
    }
    assert_eq!(c.len(), 3);
    let pairs: Vec<_> = c.pairs().map(|(m, k, v)| (m.cid(), k, v)).collect();
    assert_eq!(pairs.len(), 9);
    for p in &people {
        for (k, v) in p.to_pairs() {
            assert!(pairs.contains(&(p.cid(), k, v)));
        }
    }
    assert_eq!(c.pairs().count(), 9);
}

#[test]
fn set_overrides_default() {
    let mut cr = CallRecorder::new();
    let model = Model::with_defaults(attrs! {}, &attrs! { "name" => "Ben" }).unwrap();
    assert_eq!(model.get("name"), Some(Value::from("Ben")));
    record(&model);
    model.set("name", "Jack");
    assert_eq!(model.get("name"), Some(Value::from("Jack")));
    cr.verify([
        r#"change:name Some(String("Ben")) -> Some(String("Jack"))"#,
        "change name",
    ]);
}
