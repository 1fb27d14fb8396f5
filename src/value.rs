use std::{fmt, rc::Rc};

use indexmap::IndexMap;
use parse_display::Display;
use serde::{Deserialize, Serialize};

use crate::{Error, Result};


/// Attribute mapping in insertion order.
pub type Attributes = IndexMap<String, Value>;

/// Builds [`Attributes`] from `key => value` pairs.
///
/// ```
/// let attrs = vertebra::attrs! { "name" => "Tom", "gid" => 5 };
/// assert_eq!(attrs["gid"], vertebra::Value::from(5));
/// ```
#[macro_export]
macro_rules! attrs {
    () => {
        $crate::Attributes::new()
    };
    ($($key:expr => $value:expr),+ $(,)?) => {{
        let mut attrs = $crate::Attributes::new();
        $(
            attrs.insert(::std::string::String::from($key), $crate::Value::from($value));
        )+
        attrs
    }};
}

/// JSON-like attribute value.
///
/// Scalars compare by value. Maps compare by identity: two separately built maps with the
/// same content are different values, a clone of a `Value::Map` is the same value.
#[derive(Clone, Debug, Default)]
pub enum Value {
    #[default]
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Map(Rc<Attributes>),
}

#[derive(Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[display(style = "snake_case")]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Map,
}

impl Value {
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Bool,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Map(_) => ValueKind::Map,
        }
    }
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }
    pub fn as_map(&self) -> Option<&Attributes> {
        match self {
            Value::Map(m) => Some(m),
            _ => None,
        }
    }

    /// Returns `true` if a value of this kind can replace a default of `other`'s kind.
    pub(crate) fn is_compatible_with(&self, other: &Value) -> bool {
        self.is_null() || other.is_null() || self.kind() == other.kind()
    }

    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Number(n) => number_to_json(*n),
            Value::String(s) => serde_json::Value::String(s.clone()),
            Value::Map(m) => attributes_to_json(m),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b || (a.is_nan() && b.is_nan()),
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Number(n) => write!(f, "{n}"),
            Value::String(s) => write!(f, "{s}"),
            Value::Map(m) => write!(f, "{}", attributes_to_json(m)),
        }
    }
}

fn number_to_json(n: f64) -> serde_json::Value {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        serde_json::Value::from(n as i64)
    } else {
        serde_json::Number::from_f64(n).map_or(serde_json::Value::Null, serde_json::Value::Number)
    }
}

pub fn attributes_to_json(attrs: &Attributes) -> serde_json::Value {
    serde_json::Value::Object(
        attrs
            .iter()
            .map(|(key, value)| (key.clone(), value.to_json()))
            .collect(),
    )
}

/// Converts a JSON object into attributes, keeping its key order.
pub fn attributes_from_json(json: serde_json::Value) -> Result<Attributes> {
    match Value::from(json) {
        Value::Map(m) => Ok(Rc::unwrap_or_clone(m)),
        value => Err(Error::NotAnObject {
            found: value.kind(),
        }),
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => n.as_f64().map_or(Value::Null, Value::Number),
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => Value::Map(Rc::new(
                items
                    .into_iter()
                    .enumerate()
                    .map(|(i, v)| (i.to_string(), Value::from(v)))
                    .collect(),
            )),
            serde_json::Value::Object(entries) => Value::Map(Rc::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k, Value::from(v)))
                    .collect(),
            )),
        }
    }
}

impl Serialize for Value {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::ser::Serializer,
    {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Number(n) => number_to_json(*n).serialize(serializer),
            Value::String(s) => serializer.serialize_str(s),
            Value::Map(m) => m.as_ref().serialize(serializer),
        }
    }
}
impl<'de> Deserialize<'de> for Value {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Value, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}
impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}
impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}
impl From<Attributes> for Value {
    fn from(value: Attributes) -> Self {
        Value::Map(Rc::new(value))
    }
}
impl From<Rc<Attributes>> for Value {
    fn from(value: Rc<Attributes>) -> Self {
        Value::Map(value)
    }
}
impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Null, Into::into)
    }
}
macro_rules! impl_from_number {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Value {
                fn from(value: $t) -> Self {
                    Value::Number(value as f64)
                }
            }
        )*
    };
}
impl_from_number!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64);

/// Value passed to [`Model::set`](crate::Model::set). `None` stands for an absent attribute.
pub trait IntoAttribute {
    fn into_attribute(self) -> Option<Value>;
}
impl<T: Into<Value>> IntoAttribute for Option<T> {
    fn into_attribute(self) -> Option<Value> {
        self.map(Into::into)
    }
}
macro_rules! impl_into_attribute {
    ($($t:ty),*) => {
        $(
            impl IntoAttribute for $t {
                fn into_attribute(self) -> Option<Value> {
                    Some(self.into())
                }
            }
        )*
    };
}
impl_into_attribute!(Value, bool, &str, String, Attributes, Rc<Attributes>);
impl_into_attribute!(i8, i16, i32, i64, u8, u16, u32, u64, usize, isize, f32, f64);
