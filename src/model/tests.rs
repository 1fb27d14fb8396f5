use super::*;
use crate::{attrs, ValueKind};
use assert_call::{call, CallRecorder};

fn record_changes(m: &Model) {
    m.events().on_all(|name, e| match e {
        ModelEvent::ChangeAttr {
            value, previous, ..
        } => call!("{name} {previous:?} -> {value:?}"),
        ModelEvent::Change { changed, .. } => call!("{name} {changed:?}"),
    });
}

#[test]
fn get_absent_is_none() {
    let m = Model::default();
    assert_eq!(m.get("x"), None);
    assert!(!m.has("x"));
}

#[test]
fn to_pairs_keeps_order() {
    let m = Model::new(attrs! { "name" => "Tom", "gid" => 5, "can" => "do" });
    assert_eq!(
        m.to_pairs(),
        vec![
            ("name".to_string(), Value::from("Tom")),
            ("gid".to_string(), Value::from(5)),
            ("can".to_string(), Value::from("do")),
        ]
    );
}

#[test]
fn set_same_value_is_noop() {
    let mut cr = CallRecorder::new();
    let m = Model::new(attrs! { "x" => 1 });
    record_changes(&m);
    assert!(!m.set("x", m.get("x")));
    cr.verify(());
}

#[test]
fn set_absent_key_to_its_value_is_noop() {
    let mut cr = CallRecorder::new();
    let m = Model::new(attrs! { "x" => 1 });
    record_changes(&m);
    assert!(!m.set("missing", m.get("missing")));
    cr.verify(());
    assert!(!m.has("missing"));
    assert_eq!(m.keys(), ["x"]);
}

#[test]
fn set_none_removes_attribute() {
    let mut cr = CallRecorder::new();
    let m = Model::new(attrs! { "x" => 1, "y" => 2 });
    record_changes(&m);
    assert!(m.set("x", None::<Value>));
    cr.verify([
        "change:x Some(Number(1.0)) -> None",
        r#"change ["x"]"#,
    ]);
    assert_eq!(m.keys(), ["y"]);
}

#[test]
fn set_null_is_a_value() {
    let m = Model::default();
    assert!(m.set("x", Value::Null));
    assert_eq!(m.get("x"), Some(Value::Null));
    assert!(!m.set("x", Value::Null));
}

#[test]
fn set_emits_key_then_change() {
    let mut cr = CallRecorder::new();
    let m = Model::new(attrs! { "x" => 1 });
    record_changes(&m);
    assert!(m.set("x", 2));
    cr.verify([
        "change:x Some(Number(1.0)) -> Some(Number(2.0))",
        r#"change ["x"]"#,
    ]);
}

#[test]
fn set_many_emits_one_change() {
    let mut cr = CallRecorder::new();
    let m = Model::new(attrs! { "a" => 1, "b" => 2 });
    record_changes(&m);
    let changed = m.set_many([("a", Value::from(1)), ("b", Value::from(3)), ("c", Value::from(4))]);
    assert_eq!(changed, ["b", "c"]);
    cr.verify([
        "change:b Some(Number(2.0)) -> Some(Number(3.0))",
        "change:c None -> Some(Number(4.0))",
        r#"change ["b", "c"]"#,
    ]);
}

#[test]
fn set_many_compares_with_value_before_call() {
    let mut cr = CallRecorder::new();
    let m = Model::new(attrs! { "a" => 1 });
    record_changes(&m);
    let changed = m.set_many([("a", 2), ("a", 1)]);
    assert!(changed.is_empty());
    cr.verify(());
    assert_eq!(m.get("a"), Some(Value::from(1)));
}

#[test]
fn change_handlers_see_merged_state() {
    let mut cr = CallRecorder::new();
    let m = Model::default();
    m.on("change:a", |e| {
        let m = e.model();
        call!("a={:?} b={:?}", m.get("a"), m.get("b"));
    });
    m.set_many([("a", 1), ("b", 2)]);
    cr.verify("a=Some(Number(1.0)) b=Some(Number(2.0))");
}

#[test]
fn nested_set_from_handler() {
    let mut cr = CallRecorder::new();
    let m = Model::default();
    m.on("change:a", |e| {
        e.model().set("b", 1);
    });
    m.on("change", |e| {
        if let ModelEvent::Change { changed, .. } = e {
            call!("{changed:?}");
        }
    });
    m.set("a", 1);
    cr.verify([r#"["b"]"#, r#"["a"]"#]);
    assert_eq!(m.get("b"), Some(Value::from(1)));
    assert_eq!(m.changed_keys(), ["a"]);
    assert_eq!(m.previous("a"), None);
}

#[test]
fn nested_set_sees_inner_changes_while_dispatching() {
    let mut cr = CallRecorder::new();
    let m = Model::default();
    m.on("change:a", |e| {
        let m = e.model();
        m.set("b", 1);
        call!("inner {:?}", m.changed_keys());
    });
    m.set("a", 1);
    cr.verify(r#"inner ["b"]"#);
    assert_eq!(m.changed_keys(), ["a"]);
}

#[test]
fn defaults_fill_missing_keys() {
    let m = Model::with_defaults(attrs! { "age" => 3 }, &attrs! { "name" => "Ben" }).unwrap();
    assert_eq!(m.get("name"), Some(Value::from("Ben")));
    assert_eq!(m.keys(), ["age", "name"]);
}

#[test]
fn explicit_wins_over_default() {
    let m = Model::builder()
        .default_value("name", "Ben")
        .attribute("name", "Jack")
        .build()
        .unwrap();
    assert_eq!(m.get("name"), Some(Value::from("Jack")));
}

#[test]
fn set_over_default() {
    let mut cr = CallRecorder::new();
    let m = Model::with_defaults(attrs! {}, &attrs! { "name" => "Ben" }).unwrap();
    m.on("change:name", |e| {
        if let ModelEvent::ChangeAttr {
            value, previous, ..
        } = e
        {
            call!("{} -> {}", previous.clone().unwrap(), value.clone().unwrap());
        }
    });
    m.set_many(attrs! { "name" => "Jack" });
    cr.verify("Ben -> Jack");
    assert_eq!(m.get("name"), Some(Value::from("Jack")));
}

#[test]
fn conflicting_default_is_rejected() {
    let e = Model::with_defaults(attrs! { "name" => 5 }, &attrs! { "name" => "Ben" }).unwrap_err();
    assert_eq!(e.key, "name");
    assert_eq!(e.expected, ValueKind::String);
    assert_eq!(e.found, ValueKind::Number);
    assert_eq!(
        e.to_string(),
        "attribute `name` must be string to match its default, found number"
    );
}

#[test]
fn null_matches_any_default() {
    let m = Model::with_defaults(attrs! { "name" => Value::Null }, &attrs! { "name" => "Ben" })
        .unwrap();
    assert_eq!(m.get("name"), Some(Value::Null));
}

#[test]
fn unset_emits_removal() {
    let mut cr = CallRecorder::new();
    let m = Model::new(attrs! { "a" => 1, "b" => 2 });
    record_changes(&m);
    assert!(m.unset("a"));
    cr.verify(["change:a Some(Number(1.0)) -> None", r#"change ["a"]"#]);
    assert!(!m.unset("a"));
    cr.verify(());
    assert_eq!(m.keys(), ["b"]);
}

#[test]
fn clear_emits_one_change() {
    let mut cr = CallRecorder::new();
    let m = Model::new(attrs! { "a" => 1, "b" => 2 });
    m.on("change", |_| call!("change"));
    assert_eq!(m.clear(), ["a", "b"]);
    cr.verify("change");
    assert!(m.is_empty());
    assert!(m.clear().is_empty());
    cr.verify(());
}

#[test]
fn previous_and_changed_keys() {
    let m = Model::new(attrs! { "a" => 1, "b" => 2 });
    m.set("a", 10);
    assert_eq!(m.previous("a"), Some(Value::from(1)));
    assert_eq!(m.previous("b"), Some(Value::from(2)));
    assert_eq!(m.changed_keys(), ["a"]);
}

#[test]
fn client_ids_are_unique() {
    let a = Model::default();
    let b = Model::default();
    assert_ne!(a.cid(), b.cid());
    assert!(a.cid().to_string().starts_with('c'));
}

#[test]
fn equality_is_identity() {
    let a = Model::new(attrs! { "x" => 1 });
    let b = Model::new(attrs! { "x" => 1 });
    assert_ne!(a, b);
    assert_eq!(a, a.clone());
}

#[test]
fn json() {
    let m = Model::from_json(serde_json::json!({ "name": "Tom", "gid": 5 })).unwrap();
    assert_eq!(m.to_json(), serde_json::json!({ "name": "Tom", "gid": 5 }));
    assert_eq!(serde_json::to_string(&m).unwrap(), r#"{"name":"Tom","gid":5}"#);
    let back: Model = serde_json::from_str(r#"{"can":"do"}"#).unwrap();
    assert_eq!(back.get("can"), Some(Value::from("do")));
}

#[test]
fn dropping_subscription_stops_events() {
    let mut cr = CallRecorder::new();
    let m = Model::default();
    let s = m.subscribe("change", |_| call!("change"));
    m.set("a", 1);
    cr.verify("change");
    drop(s);
    m.set("a", 2);
    cr.verify(());
}
